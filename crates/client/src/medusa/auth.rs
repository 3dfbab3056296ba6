//! Customer authentication and profile endpoints.
//!
//! Login and registration persist the returned bearer token through the
//! client, so every later request is authenticated. Logout always drops the
//! local token, whatever the backend says.

use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::instrument;

use medusa_storefront_core::Email;

use super::types::Customer;
use super::{MedusaClient, MedusaError};

/// Registration form data.
#[derive(Clone, Serialize)]
pub struct RegisterInput {
    pub email: Email,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl std::fmt::Debug for RegisterInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisterInput")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("phone", &self.phone)
            .finish()
    }
}

/// Profile fields a customer may change.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UpdateCustomerInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accepts_marketing: Option<bool>,
}

/// Response to login and registration.
#[derive(Clone, Deserialize)]
pub struct AuthResponse {
    /// Bearer token; absent when the backend relies on a session cookie.
    #[serde(default, alias = "access_token")]
    pub token: Option<String>,
    /// Customer, when the backend embeds it.
    #[serde(default)]
    pub customer: Option<Customer>,
}

impl std::fmt::Debug for AuthResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthResponse")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("customer", &self.customer)
            .finish()
    }
}

#[derive(Deserialize)]
struct CustomerEnvelope {
    customer: Customer,
}

impl MedusaClient {
    fn accept_auth(&self, response: &AuthResponse) -> Result<(), MedusaError> {
        if let Some(token) = &response.token {
            self.set_token(token)?;
        }
        Ok(())
    }

    /// Create an account and sign in.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the registration or the token
    /// cannot be persisted.
    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn register(&self, input: &RegisterInput) -> Result<AuthResponse, MedusaError> {
        let response: AuthResponse = self.post("/store/auth/register", input).await?;
        self.accept_auth(&response)?;
        Ok(response)
    }

    /// Sign in with email and password.
    ///
    /// # Errors
    ///
    /// Returns an error if the credentials are rejected or the token cannot
    /// be persisted.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, MedusaError> {
        let response: AuthResponse = self
            .post(
                "/store/auth/login",
                &json!({ "email": email, "password": password }),
            )
            .await?;
        self.accept_auth(&response)?;
        Ok(response)
    }

    /// Sign out. The local token is cleared before the backend result is
    /// returned, so a failed call still leaves the client signed out.
    ///
    /// # Errors
    ///
    /// Returns the backend error, if any, after the token has been cleared.
    #[instrument(skip(self))]
    pub async fn logout(&self) -> Result<(), MedusaError> {
        let result = self.post_empty::<IgnoredAny>("/store/auth/logout").await;
        self.clear_token()?;
        result.map(|_| ())
    }

    /// Send a password reset email.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the request.
    #[instrument(skip(self))]
    pub async fn request_password_reset(&self, email: &str) -> Result<(), MedusaError> {
        let _: IgnoredAny = self
            .post(
                "/store/auth/password-reset/request",
                &json!({ "email": email }),
            )
            .await?;
        Ok(())
    }

    /// Set a new password using the token from a reset email.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is invalid or expired.
    #[instrument(skip(self, token, password))]
    pub async fn reset_password(&self, token: &str, password: &str) -> Result<(), MedusaError> {
        let _: IgnoredAny = self
            .post(
                "/store/auth/password-reset/confirm",
                &json!({ "token": token, "password": password }),
            )
            .await?;
        Ok(())
    }

    /// Confirm an email address using the token from a verification email.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is invalid or expired.
    #[instrument(skip(self, token))]
    pub async fn verify_email(&self, token: &str) -> Result<(), MedusaError> {
        let _: IgnoredAny = self
            .post("/store/auth/verify-email", &json!({ "token": token }))
            .await?;
        Ok(())
    }

    /// Fetch the signed-in customer.
    ///
    /// # Errors
    ///
    /// Returns an error if no customer is signed in or the request fails.
    #[instrument(skip(self))]
    pub async fn get_customer(&self) -> Result<Customer, MedusaError> {
        let envelope: CustomerEnvelope = self.get("/store/customers/me").await?;
        Ok(envelope.customer)
    }

    /// Update the signed-in customer's profile.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the update.
    #[instrument(skip(self))]
    pub async fn update_customer(
        &self,
        input: &UpdateCustomerInput,
    ) -> Result<Customer, MedusaError> {
        let envelope: CustomerEnvelope = self.patch("/store/customers/me", input).await?;
        Ok(envelope.customer)
    }

    /// Change the signed-in customer's password.
    ///
    /// # Errors
    ///
    /// Returns an error if the old password is wrong or the new one is rejected.
    #[instrument(skip_all)]
    pub async fn change_password(
        &self,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), MedusaError> {
        let _: IgnoredAny = self
            .post(
                "/store/customers/me/password",
                &json!({ "old_password": old_password, "new_password": new_password }),
            )
            .await?;
        Ok(())
    }
}
