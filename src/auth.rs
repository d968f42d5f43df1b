//! Interfaces to the authentication collaborators. Session handling lives outside this crate.

use std::fmt;

/// Decides whether a mutating request carries a valid CSRF token.
pub trait CsrfValidator: Send + Sync + fmt::Debug {
    fn validate(&self, token: Option<&str>) -> bool;
}

/// Compares the request token against one shared secret (`ADMIN_CSRF_TOKEN`).
#[derive(Clone)]
pub struct SharedSecretCsrf {
    secret: String,
}

impl SharedSecretCsrf {
    pub fn new(secret: impl Into<String>) -> Self {
        SharedSecretCsrf { secret: secret.into() }
    }

    pub fn from_env() -> Option<Self> {
        std::env::var("ADMIN_CSRF_TOKEN")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .map(SharedSecretCsrf::new)
    }
}

impl fmt::Debug for SharedSecretCsrf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedSecretCsrf").finish_non_exhaustive()
    }
}

impl CsrfValidator for SharedSecretCsrf {
    fn validate(&self, token: Option<&str>) -> bool {
        let Some(token) = token else { return false };
        let (a, b) = (token.as_bytes(), self.secret.as_bytes());
        a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
    }
}

/// Accepts every request. For deployments where an upstream proxy already enforces CSRF.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoCsrf;

impl CsrfValidator for NoCsrf {
    fn validate(&self, _token: Option<&str>) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_secret_requires_exact_token() {
        let csrf = SharedSecretCsrf::new("s3cret");
        assert!(csrf.validate(Some("s3cret")));
        assert!(!csrf.validate(Some("s3cre")));
        assert!(!csrf.validate(Some("s3cret!")));
        assert!(!csrf.validate(None));
        assert!(NoCsrf.validate(None));
        assert!(!format!("{:?}", csrf).contains("s3cret"));
    }
}
