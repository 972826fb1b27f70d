use ripple_types::User;
use std::sync::{Mutex, PoisonError};

/// In-memory session state.
///
/// The server keeps the access/refresh tokens in HTTP cookies, which
/// live in the transport's cookie jar; this side holds only the
/// "authenticated" flag and the cached profile of the signed-in user.
/// Established on login/registration/restore, renewed transparently by
/// the request wrapper, cleared on logout or a fatal auth error.
#[derive(Debug, Default)]
pub struct Session {
    inner: Mutex<SessionInner>,
}

#[derive(Debug, Default)]
struct SessionInner {
    authenticated: bool,
    user: Option<User>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SessionInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Marks the session live and caches the signed-in user.
    pub fn establish(&self, user: User) {
        let mut inner = self.lock();
        log::info!("session established for user: {}", user.username);
        inner.authenticated = true;
        inner.user = Some(user);
    }

    /// Tears the session down (logout or irrecoverable auth failure).
    pub fn clear(&self) {
        let mut inner = self.lock();
        if inner.authenticated {
            log::info!("session cleared");
        }
        inner.authenticated = false;
        inner.user = None;
    }

    pub fn is_authenticated(&self) -> bool {
        self.lock().authenticated
    }

    pub fn current_user(&self) -> Option<User> {
        self.lock().user.clone()
    }

    pub fn current_user_id(&self) -> Option<String> {
        self.lock().user.as_ref().map(|u| u.id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: &str) -> User {
        User {
            id: id.to_string(),
            username: format!("user-{}", id),
            display_name: None,
            avatar_url: None,
            bio: None,
        }
    }

    #[test]
    fn test_establish_and_clear() {
        let session = Session::new();
        assert!(!session.is_authenticated());
        assert!(session.current_user().is_none());

        session.establish(user("u1"));
        assert!(session.is_authenticated());
        assert_eq!(session.current_user_id().as_deref(), Some("u1"));

        session.clear();
        assert!(!session.is_authenticated());
        assert!(session.current_user().is_none());
    }

    #[test]
    fn test_establish_replaces_previous_user() {
        let session = Session::new();
        session.establish(user("u1"));
        session.establish(user("u2"));
        assert_eq!(session.current_user_id().as_deref(), Some("u2"));
    }
}
