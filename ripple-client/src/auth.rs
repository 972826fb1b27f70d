use anyhow::{Context, Result};
use ripple_types::{LoginRequest, RegisterRequest, User};
use std::sync::Arc;

use crate::api::{ApiClient, ApiError};
use crate::session::Session;

/// Owns the authentication lifecycle for a client instance.
///
/// Wires the API client's fatal-error hook to session teardown, so an
/// irrecoverable auth failure anywhere in the app tears the session
/// down exactly once, while the failing caller still gets its error for
/// local handling.
pub struct AuthFlow {
    client: ApiClient,
    session: Arc<Session>,
}

impl AuthFlow {
    /// Wraps an API client, injecting the fatal-auth hook.
    pub fn new(client: ApiClient) -> Self {
        let session = Arc::new(Session::new());
        let hook_session = Arc::clone(&session);
        let client = client.with_fatal_hook(Arc::new(move |error| {
            log::warn!("fatal auth error, tearing down session: {}", error);
            hook_session.clear();
        }));

        Self { client, session }
    }

    /// Checks whether the cookie jar still carries a usable session by
    /// asking the server for the current user.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(user))` if a valid session exists
    /// - `Ok(None)` if there is no session or it could not be renewed
    /// - `Err(_)` on a network-level failure
    pub async fn restore(&self) -> Result<Option<User>> {
        match self.client.me().await {
            Ok(user) => {
                log::info!("restored session for user: {}", user.username);
                self.session.establish(user.clone());
                Ok(Some(user))
            }
            Err(ApiError::Server { status, .. }) if status == 401 || status == 403 => {
                log::debug!("no restorable session");
                self.session.clear();
                Ok(None)
            }
            Err(error) => Err(error).context("Failed to validate existing session"),
        }
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<User> {
        let request = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let user = self.client.login(&request).await.context("Login failed")?;
        self.session.establish(user.clone());
        Ok(user)
    }

    pub async fn register(&self, email: &str, username: &str, password: &str) -> Result<User> {
        let request = RegisterRequest {
            email: email.to_string(),
            username: username.to_string(),
            password: password.to_string(),
        };
        let user = self
            .client
            .register(&request)
            .await
            .context("Registration failed")?;
        self.session.establish(user.clone());
        Ok(user)
    }

    /// Logs out server-side and clears local session state. The local
    /// side is cleared even if the server call fails.
    pub async fn logout(&self) -> Result<()> {
        let result = self.client.logout().await;
        self.session.clear();
        result.context("Logout request failed")
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn session(&self) -> Arc<Session> {
        Arc::clone(&self.session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{HttpRequest, HttpResponse, Transport};
    use async_trait::async_trait;

    struct CannedTransport {
        status: u16,
        body: Vec<u8>,
    }

    #[async_trait]
    impl Transport for CannedTransport {
        async fn send(&self, _request: HttpRequest) -> crate::api::ApiResult<HttpResponse> {
            Ok(HttpResponse::new(self.status, self.body.clone()))
        }
    }

    fn user_envelope() -> Vec<u8> {
        serde_json::json!({
            "success": true,
            "data": {"id": "u1", "username": "ada"}
        })
        .to_string()
        .into_bytes()
    }

    #[tokio::test]
    async fn test_login_establishes_session() {
        let transport = Arc::new(CannedTransport {
            status: 200,
            body: user_envelope(),
        });
        let flow = AuthFlow::new(ApiClient::new("http://api.test", transport));

        let user = flow.login("ada@example.com", "hunter2").await.unwrap();
        assert_eq!(user.id, "u1");
        assert!(flow.session().is_authenticated());
    }

    #[tokio::test]
    async fn test_restore_without_session_is_none() {
        let transport = Arc::new(CannedTransport {
            status: 401,
            body: serde_json::json!({"code": "AUTH_REQUIRED", "message": "no session"})
                .to_string()
                .into_bytes(),
        });
        let flow = AuthFlow::new(ApiClient::new("http://api.test", transport));

        // /auth/me suppresses nothing, but the canned 401 refresh also
        // fails classified, so restore resolves to "no session".
        let restored = flow.restore().await.unwrap();
        assert!(restored.is_none());
        assert!(!flow.session().is_authenticated());
    }

    #[tokio::test]
    async fn test_logout_clears_session_even_on_server_error() {
        let transport = Arc::new(CannedTransport {
            status: 200,
            body: user_envelope(),
        });
        let flow = AuthFlow::new(ApiClient::new("http://api.test", transport));
        flow.login("ada@example.com", "hunter2").await.unwrap();

        let failing = Arc::new(CannedTransport {
            status: 500,
            body: serde_json::json!({"code": "INTERNAL", "message": "oops"})
                .to_string()
                .into_bytes(),
        });
        let failing_flow = AuthFlow::new(ApiClient::new("http://api.test", failing));
        failing_flow.session().establish(flow.session().current_user().unwrap());

        assert!(failing_flow.logout().await.is_err());
        assert!(!failing_flow.session().is_authenticated());
    }
}
