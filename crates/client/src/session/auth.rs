//! Signed-in customer state.
//!
//! The session moves from [`AuthState::Loading`] to either
//! [`AuthState::Authenticated`] or [`AuthState::Unauthenticated`]. Being
//! signed in is derived from the state alone; there is no separate flag
//! that could disagree with it.

use std::sync::{PoisonError, RwLock};

use tracing::instrument;

use crate::error::{LoadError, clear_sentry_user, messages, report, set_sentry_user};
use crate::medusa::auth::{AuthResponse, RegisterInput, UpdateCustomerInput};
use crate::medusa::{Customer, MedusaClient, MedusaError};

/// Where the customer session stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    /// Not yet resolved.
    Loading,
    /// A customer is signed in.
    Authenticated(Customer),
    /// Nobody is signed in.
    Unauthenticated,
}

/// Holds the one in-memory copy of the current customer.
pub struct AuthSession {
    client: MedusaClient,
    state: RwLock<AuthState>,
    error: RwLock<Option<&'static str>>,
}

impl std::fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSession")
            .field("state", &self.state())
            .field("error", &self.error())
            .finish_non_exhaustive()
    }
}

impl AuthSession {
    /// New session in the loading state.
    #[must_use]
    pub const fn new(client: MedusaClient) -> Self {
        Self {
            client,
            state: RwLock::new(AuthState::Loading),
            error: RwLock::new(None),
        }
    }

    // =========================================================================
    // Snapshot
    // =========================================================================

    /// Current state.
    #[must_use]
    pub fn state(&self) -> AuthState {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The signed-in customer.
    #[must_use]
    pub fn customer(&self) -> Option<Customer> {
        match &*self.state.read().unwrap_or_else(PoisonError::into_inner) {
            AuthState::Authenticated(customer) => Some(customer.clone()),
            AuthState::Loading | AuthState::Unauthenticated => None,
        }
    }

    /// Whether a customer is signed in.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        matches!(
            *self.state.read().unwrap_or_else(PoisonError::into_inner),
            AuthState::Authenticated(_)
        )
    }

    /// Whether the session is still resolving.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        matches!(
            *self.state.read().unwrap_or_else(PoisonError::into_inner),
            AuthState::Loading
        )
    }

    /// User-facing message from the last failed action.
    #[must_use]
    pub fn error(&self) -> Option<&'static str> {
        *self.error.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Dismiss the error message.
    pub fn clear_error(&self) {
        self.set_error(None);
    }

    fn set_error(&self, message: Option<&'static str>) {
        *self.error.write().unwrap_or_else(PoisonError::into_inner) = message;
    }

    fn set_state(&self, state: AuthState) {
        match &state {
            AuthState::Authenticated(customer) => {
                set_sentry_user(&customer.id, Some(&customer.email));
            }
            AuthState::Unauthenticated => clear_sentry_user(),
            AuthState::Loading => {}
        }
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = state;
    }

    // =========================================================================
    // Loaders
    // =========================================================================

    /// Resolve the session from the stored token.
    ///
    /// Any failure collapses the state to [`AuthState::Unauthenticated`]
    /// without setting an error message.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::NoIdentity`] when no token is stored, or
    /// [`LoadError::Backend`] when the customer could not be fetched.
    #[instrument(skip(self))]
    pub async fn initialize(&self) -> Result<Customer, LoadError> {
        if !self.client.has_token() {
            self.set_state(AuthState::Unauthenticated);
            return Err(LoadError::NoIdentity("auth token"));
        }
        self.refresh().await
    }

    /// Re-fetch the signed-in customer.
    ///
    /// # Errors
    ///
    /// See [`AuthSession::initialize`].
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> Result<Customer, LoadError> {
        match self.client.get_customer().await {
            Ok(customer) => {
                self.set_state(AuthState::Authenticated(customer.clone()));
                Ok(customer)
            }
            Err(e) => {
                tracing::info!(error = %e, "Could not restore customer session");
                self.set_state(AuthState::Unauthenticated);
                Err(LoadError::Backend(e))
            }
        }
    }

    // =========================================================================
    // Actions
    // =========================================================================

    /// Sign in.
    ///
    /// # Errors
    ///
    /// Returns the backend error after setting the generic
    /// [`messages::INVALID_CREDENTIALS`] message.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<Customer, MedusaError> {
        self.clear_error();
        let result = match self.client.login(email, password).await {
            Ok(response) => self.resolve_customer(response).await,
            Err(e) => Err(e),
        };
        self.finish_sign_in(result, "Login failed", messages::INVALID_CREDENTIALS)
    }

    /// Create an account and sign in.
    ///
    /// # Errors
    ///
    /// Returns the backend error after setting the generic
    /// [`messages::REGISTRATION_FAILED`] message.
    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn register(&self, input: &RegisterInput) -> Result<Customer, MedusaError> {
        self.clear_error();
        let result = match self.client.register(input).await {
            Ok(response) => self.resolve_customer(response).await,
            Err(e) => Err(e),
        };
        self.finish_sign_in(result, "Registration failed", messages::REGISTRATION_FAILED)
    }

    /// Prefer the customer embedded in the auth response; fetch it otherwise.
    async fn resolve_customer(&self, response: AuthResponse) -> Result<Customer, MedusaError> {
        match response.customer {
            Some(customer) => Ok(customer),
            None => self.client.get_customer().await,
        }
    }

    fn finish_sign_in(
        &self,
        result: Result<Customer, MedusaError>,
        log_message: &'static str,
        user_message: &'static str,
    ) -> Result<Customer, MedusaError> {
        match result {
            Ok(customer) => {
                tracing::info!(customer_id = %customer.id, "Customer signed in");
                self.set_state(AuthState::Authenticated(customer.clone()));
                Ok(customer)
            }
            Err(e) => {
                tracing::warn!(error = %e, "{log_message}");
                report(&e);
                self.set_error(Some(user_message));
                self.set_state(AuthState::Unauthenticated);
                Err(e)
            }
        }
    }

    /// Sign out. Local state is always cleared; a failed backend call is
    /// only logged.
    #[instrument(skip(self))]
    pub async fn logout(&self) {
        if let Err(e) = self.client.logout().await {
            tracing::warn!(error = %e, "Backend logout failed");
        }
        self.clear_error();
        self.set_state(AuthState::Unauthenticated);
    }

    /// Update the customer's profile.
    ///
    /// # Errors
    ///
    /// Returns the backend error after setting
    /// [`messages::PROFILE_UPDATE_FAILED`]; the previous customer is kept.
    #[instrument(skip(self))]
    pub async fn update_profile(
        &self,
        input: &UpdateCustomerInput,
    ) -> Result<Customer, MedusaError> {
        match self.client.update_customer(input).await {
            Ok(customer) => {
                self.clear_error();
                self.set_state(AuthState::Authenticated(customer.clone()));
                Ok(customer)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Profile update failed");
                report(&e);
                self.set_error(Some(messages::PROFILE_UPDATE_FAILED));
                Err(e)
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::medusa::tests::test_client;

    fn customer_json() -> serde_json::Value {
        json!({"id": "cus_1", "email": "jane@example.com", "first_name": "Jane"})
    }

    #[tokio::test]
    async fn test_initialize_without_token() {
        let server = MockServer::start().await;
        let (client, _) = test_client(&server);
        let session = AuthSession::new(client);
        assert!(session.is_loading());

        let err = session.initialize().await.unwrap_err();
        assert!(err.is_no_identity());
        assert_eq!(session.state(), AuthState::Unauthenticated);
        assert!(session.error().is_none());
    }

    #[tokio::test]
    async fn test_initialize_collapses_on_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/store/customers/me"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let (client, _) = test_client(&server);
        client.set_token("tok_1").unwrap();
        let session = AuthSession::new(client);

        assert!(matches!(
            session.initialize().await,
            Err(LoadError::Backend(_))
        ));
        assert!(!session.is_authenticated());
        assert!(session.customer().is_none());
        assert!(session.error().is_none());
    }

    #[tokio::test]
    async fn test_login_refetches_when_customer_missing() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/store/auth/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "tok_1"})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/store/customers/me"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"customer": customer_json()})))
            .expect(1)
            .mount(&server)
            .await;

        let (client, _) = test_client(&server);
        let session = AuthSession::new(client);

        let customer = session.login("jane@example.com", "pw").await.unwrap();
        assert_eq!(customer.display_name(), "Jane");
        assert_eq!(session.customer(), Some(customer));
    }

    #[tokio::test]
    async fn test_login_failure_sets_generic_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/store/auth/login"))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(json!({"message": "Customer jane@example.com has no password"})),
            )
            .mount(&server)
            .await;

        let (client, _) = test_client(&server);
        let session = AuthSession::new(client);

        let err = session.login("jane@example.com", "pw").await.unwrap_err();
        assert!(err.is_unauthorized());
        assert_eq!(session.error(), Some(messages::INVALID_CREDENTIALS));
        assert!(!session.is_authenticated());

        session.clear_error();
        assert!(session.error().is_none());
    }

    #[tokio::test]
    async fn test_logout_clears_even_when_backend_fails() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/store/auth/login"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"token": "tok_1", "customer": customer_json()})),
            )
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/store/auth/logout"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let (client, _) = test_client(&server);
        let session = AuthSession::new(client.clone());
        session.login("jane@example.com", "pw").await.unwrap();
        assert!(session.is_authenticated());

        session.logout().await;
        assert!(!session.is_authenticated());
        assert!(session.customer().is_none());
        assert!(!client.has_token());
    }

    #[tokio::test]
    async fn test_update_profile_failure_keeps_customer() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/store/customers/me"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"customer": customer_json()})))
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .and(path("/store/customers/me"))
            .respond_with(ResponseTemplate::new(422).set_body_json(json!({"message": "Invalid phone"})))
            .mount(&server)
            .await;

        let (client, _) = test_client(&server);
        client.set_token("tok_1").unwrap();
        let session = AuthSession::new(client);
        session.initialize().await.unwrap();

        let input = UpdateCustomerInput {
            phone: Some("not a phone".to_string()),
            ..UpdateCustomerInput::default()
        };
        assert!(session.update_profile(&input).await.is_err());
        assert_eq!(session.error(), Some(messages::PROFILE_UPDATE_FAILED));
        assert!(session.is_authenticated());
    }
}
