//! Credential checks for write endpoints.
//!
//! Handlers never compare credentials themselves; they go through an
//! [`Authenticator`] so the shared-secret scheme can be swapped for a stronger
//! one without touching the routes.

use subtle::ConstantTimeEq;

/// Header carrying the upload credential.
pub const UPLOAD_SECRET_HEADER: &str = "x-upload-secret";

/// Decides whether a presented credential authorises a write.
pub trait Authenticator: Send + Sync {
    /// Returns `true` if `credential` grants write access.
    fn verify(&self, credential: &str) -> bool;
}

/// Accepts exactly one shared secret.
///
/// With no secret configured every credential is rejected, so writes stay
/// closed until an operator sets `UPLOAD_SECRET`.
pub struct SharedSecretAuthenticator {
    secret: Option<String>,
}

impl SharedSecretAuthenticator {
    /// Create an authenticator for the given secret.
    pub fn new(secret: Option<String>) -> Self {
        Self {
            secret: secret.filter(|s| !s.is_empty()),
        }
    }

    /// Whether a secret is configured at all.
    pub fn is_configured(&self) -> bool {
        self.secret.is_some()
    }
}

impl Authenticator for SharedSecretAuthenticator {
    fn verify(&self, credential: &str) -> bool {
        let Some(secret) = &self.secret else {
            return false;
        };
        // Length differences short-circuit inside ct_eq; contents are compared in constant time.
        secret.as_bytes().ct_eq(credential.as_bytes()).into()
    }
}

impl std::fmt::Debug for SharedSecretAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedSecretAuthenticator")
            .field("configured", &self.is_configured())
            .finish()
    }
}
