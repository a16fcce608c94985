#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]

//! Authentication decisions for message-broker connections carrying an OAuth2 bearer
//! token in their password field.
//!
//! Each attempt is checked against an RFC 7662 token introspection endpoint and the
//! connecting username is reconciled with the returned claims. The result is an
//! [`auth::Decision`]: allow (optionally with a new username), deny, or defer to the
//! broker's next authentication mechanism.

pub mod auth;
pub mod configuration;
pub mod metrics_provider;
pub mod secret;

pub use auth::{AuthenticationRequest, Authenticator, ConnectionHost, Decision};
pub use configuration::Configuration;
