//! Sign-in commands.

use serde_json::json;

use medusa_storefront_client::Storefront;
use medusa_storefront_client::medusa::auth::RegisterInput;
use medusa_storefront_client::session::MergeReport;
use medusa_storefront_core::Email;

use super::AuthAction;
use crate::error::CliError;
use crate::output;

fn parse_email(raw: &str) -> Result<Email, CliError> {
    Email::parse(raw).map_err(|e| CliError::Invalid(e.to_string()))
}

/// Merged and refused basket lines, for output.
#[must_use]
pub fn merge_summary(report: &MergeReport) -> serde_json::Value {
    let failed: Vec<_> = report
        .failed
        .iter()
        .map(|(line, message)| json!({ "line": line, "message": message }))
        .collect();
    json!({
        "merged": report.merged,
        "failed": failed,
        "saved": report.persisted,
    })
}

/// Run an `auth` subcommand.
///
/// # Errors
///
/// Returns an error if the backend rejects the request. `logout` never fails.
pub async fn run(storefront: &Storefront, action: AuthAction) -> Result<(), CliError> {
    match action {
        AuthAction::Login { email, password } => {
            let email = parse_email(&email)?;
            let (customer, report) = storefront.login(email.as_str(), &password).await?;
            tracing::info!(customer_id = %customer.id, "Signed in");
            output::print(&json!({
                "customer": customer,
                "basket_item_count": storefront.basket().item_count(),
                "merge": merge_summary(&report),
            }))
        }
        AuthAction::Register {
            email,
            password,
            first_name,
            last_name,
        } => {
            let input = RegisterInput {
                email: parse_email(&email)?,
                password,
                first_name,
                last_name,
                phone: None,
            };
            let (customer, report) = storefront.register(&input).await?;
            tracing::info!(customer_id = %customer.id, "Account created");
            output::print(&json!({
                "customer": customer,
                "merge": merge_summary(&report),
            }))
        }
        AuthAction::Logout => {
            storefront.logout().await;
            output::print(&json!({ "signed_in": false }))
        }
        AuthAction::Whoami => {
            let customer = storefront.auth().initialize().await?;
            output::print(&json!({
                "customer": customer,
                "name": customer.display_name(),
            }))
        }
        AuthAction::ForgotPassword { email } => {
            let email = parse_email(&email)?;
            storefront
                .client()
                .request_password_reset(email.as_str())
                .await?;
            output::print(&json!({ "sent": true }))
        }
    }
}
