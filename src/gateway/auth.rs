//! Sources of the bearer token used for order lookups.
//!
//! The reconciler asks for a token on every check, so a re-login performed
//! by the host between two triggers is picked up without restarting anything.

use std::sync::RwLock;

use crate::types::AuthToken;

/// Provides the current bearer token, if the user is logged in.
pub trait AuthTokens: Send + Sync {
    fn current_token(&self) -> Option<AuthToken>;
}

/// A token that can be replaced at runtime (login, refresh, logout).
#[derive(Debug, Default)]
pub struct SharedToken {
    token: RwLock<Option<AuthToken>>,
}

impl SharedToken {
    /// Creates a holder with no token (logged out).
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a holder that starts logged in.
    pub fn with_token(token: AuthToken) -> Self {
        SharedToken {
            token: RwLock::new(Some(token)),
        }
    }

    /// Replaces the token after a login or refresh.
    pub fn set(&self, token: AuthToken) {
        *self.token.write().unwrap_or_else(|e| e.into_inner()) = Some(token);
    }

    /// Forgets the token after a logout.
    pub fn clear(&self) {
        *self.token.write().unwrap_or_else(|e| e.into_inner()) = None;
    }
}

impl AuthTokens for SharedToken {
    fn current_token(&self) -> Option<AuthToken> {
        self.token.read().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_token_tracks_login_state() {
        let tokens = SharedToken::new();
        assert!(tokens.current_token().is_none());

        tokens.set(AuthToken::new("t1"));
        assert_eq!(tokens.current_token(), Some(AuthToken::new("t1")));

        tokens.set(AuthToken::new("t2"));
        assert_eq!(tokens.current_token(), Some(AuthToken::new("t2")));

        tokens.clear();
        assert!(tokens.current_token().is_none());
    }
}
