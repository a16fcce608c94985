pub mod claims;
pub mod error;
pub mod introspection;
pub mod pipeline;
pub mod template;
pub mod username;

use std::fmt;

pub use claims::ClaimSet;
pub use error::Error;
pub use introspection::{IntrospectionClient, Introspector};
pub use pipeline::Authenticator;

/// Outcome of one authentication attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Decision {
    /// Access granted. Carries the username applied to the connection, if any.
    Allow(Option<String>),
    /// Access explicitly refused.
    Deny,
    /// No opinion: the broker should ask its next authentication mechanism.
    Defer,
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Decision::Allow(Some(username)) => write!(f, "allow username={username}"),
            Decision::Allow(None) => f.write_str("allow"),
            Decision::Deny => f.write_str("deny"),
            Decision::Defer => f.write_str("defer"),
        }
    }
}

/// Credentials presented by a connecting client. The bearer token travels in the
/// password field.
#[derive(Clone)]
pub struct AuthenticationRequest {
    pub client_id: String,
    pub username: Option<String>,
    pub secret: Option<String>,
}

impl AuthenticationRequest {
    pub fn new(
        client_id: impl Into<String>,
        username: Option<String>,
        secret: Option<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            username,
            secret,
        }
    }
}

impl fmt::Debug for AuthenticationRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthenticationRequest")
            .field("client_id", &self.client_id)
            .field("username", &self.username)
            .field("secret", &self.secret.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Connection state owned by the broker.
pub trait ConnectionHost: Send + Sync {
    /// Replaces the username of the connecting client before access is granted.
    fn set_username(&self, client_id: &str, username: &str);
}
