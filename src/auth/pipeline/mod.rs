
use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use super::introspection::{IntrospectionClient, Introspector};
use super::username::UsernamePolicy;
use super::{AuthenticationRequest, ConnectionHost, Decision, Error};
use crate::configuration::{Configuration, FailureAction};
use crate::metrics_provider::AUTH_DECISIONS;

/// Turns one connection attempt into a decision.
///
/// The steps run in a fixed order and the first failure ends the attempt:
/// 1. username pre-check, then presence of a token,
/// 2. token introspection,
/// 3. `active` must be the boolean `true`,
/// 4. username check against the claims,
/// 5. username replacement.
///
/// Each failure is resolved through the failure action configured for its category.
/// Nothing is kept between attempts.
pub struct Authenticator {
    introspector: Arc<dyn Introspector>,
    usernames: UsernamePolicy,
    username_validation_error: FailureAction,
    username_replacement_error: FailureAction,
    token_verification_error: FailureAction,
}

impl Authenticator {
    pub fn new(config: &Configuration) -> Result<Self, Error> {
        let introspector = Arc::new(IntrospectionClient::new(config)?);
        Ok(Self::with_introspector(config, introspector))
    }

    pub fn with_introspector(config: &Configuration, introspector: Arc<dyn Introspector>) -> Self {
        Self {
            introspector,
            usernames: UsernamePolicy::new(config),
            username_validation_error: config.username_validation_error,
            username_replacement_error: config.username_replacement_error,
            token_verification_error: config.token_verification_error,
        }
    }

    #[instrument(skip(self, request, host), fields(client_id = %request.client_id))]
    pub async fn authenticate(
        &self,
        request: &AuthenticationRequest,
        host: &dyn ConnectionHost,
    ) -> Decision {
        debug!(
            "Starting client authentication (username: {}, password: {})",
            request.username.as_deref().unwrap_or("<none>"),
            if request.secret.is_some() {
                "<present>"
            } else {
                "<none>"
            }
        );

        match self.evaluate(request).await {
            Ok(username) => {
                if let Some(username) = &username {
                    debug!("Setting client username to '{username}'");
                    host.set_username(&request.client_id, username);
                }
                info!("Authentication successful");
                AUTH_DECISIONS.with_label_values(&["allow", "success"]).inc();
                Decision::Allow(username)
            }
            Err(error) => {
                let action = self.failure_action(&error);
                let decision = action.decision();
                match action {
                    FailureAction::Deny => warn!("Authentication denied: {error}"),
                    FailureAction::Defer => info!("Authentication deferred: {error}"),
                }
                let label = action.to_string();
                AUTH_DECISIONS
                    .with_label_values(&[label.as_str(), error.reason()])
                    .inc();
                decision
            }
        }
    }

    async fn evaluate(&self, request: &AuthenticationRequest) -> Result<Option<String>, Error> {
        let username = request.username.as_deref();

        self.usernames.validate_before_introspection(username)?;

        let Some(token) = request.secret.as_deref() else {
            return Err(Error::Config(
                "empty password field, no token to validate".to_string(),
            ));
        };

        let claims = self.introspector.introspect(token).await?;

        if !claims.is_active() {
            return Err(Error::TokenInactive);
        }

        self.usernames.validate_after_introspection(username, &claims)?;

        self.usernames.compute_replacement(&claims)
    }

    fn failure_action(&self, error: &Error) -> FailureAction {
        match error {
            Error::UsernameMismatch(_) => self.username_validation_error,
            Error::Replacement(_) => self.username_replacement_error,
            Error::Config(_) | Error::Transport(_) | Error::Response(_) | Error::TokenInactive => {
                self.token_verification_error
            }
        }
    }
}
