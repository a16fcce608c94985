use argh::FromArgs;
use oauth2_introspection_auth::auth::{AuthenticationRequest, Authenticator, ConnectionHost};
use oauth2_introspection_auth::configuration::Configuration;
use oauth2_introspection_auth::metrics_provider::METRICS_PROVIDER;
use tracing::{error, info};

use crate::command::Error;

#[derive(FromArgs, PartialEq, Debug)]
#[argh(
    subcommand,
    name = "authenticate",
    description = "Run one authentication attempt against the introspection endpoint"
)]
pub struct Options {
    #[argh(option)]
    /// client identifier of the simulated connection
    client_id: String,

    #[argh(option)]
    /// username presented by the simulated connection
    username: Option<String>,

    #[argh(option)]
    /// bearer token presented as password; prompted for when omitted
    token: Option<String>,

    #[argh(switch)]
    /// simulate a connection without a password field
    no_token: bool,

    #[argh(switch)]
    /// print the collected metrics after the decision
    metrics: bool,
}

/// Reports username changes instead of applying them to a live connection.
struct DryRunHost;

impl ConnectionHost for DryRunHost {
    fn set_username(&self, client_id: &str, username: &str) {
        info!("Username of client '{client_id}' would be set to '{username}'");
    }
}

pub struct Command {
    authenticator: Authenticator,
    request: AuthenticationRequest,
    print_metrics: bool,
}

impl Command {
    pub fn new(options: Options, config: &Configuration) -> Result<Self, Error> {
        let authenticator = Authenticator::new(config)?;

        let token = match (options.no_token, options.token) {
            (true, _) => None,
            (false, Some(token)) => Some(token),
            (false, None) => Some(rpassword::prompt_password("Token: ")?),
        };

        let request = AuthenticationRequest::new(options.client_id, options.username, token);

        Ok(Self {
            authenticator,
            request,
            print_metrics: options.metrics,
        })
    }

    pub async fn run(&self) {
        let decision = self
            .authenticator
            .authenticate(&self.request, &DryRunHost)
            .await;
        println!("{decision}");

        if self.print_metrics {
            match METRICS_PROVIDER.gather() {
                Ok((_, body)) => println!("{}", String::from_utf8_lossy(&body)),
                Err(e) => error!("Failed to gather metrics: {e}"),
            }
        }
    }
}
