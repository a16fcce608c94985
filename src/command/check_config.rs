use argh::FromArgs;
use oauth2_introspection_auth::configuration::Configuration;
use tracing::info;

#[derive(FromArgs, PartialEq, Debug)]
#[argh(
    subcommand,
    name = "check-config",
    description = "Load and validate the configuration, then log the resolved options"
)]
pub struct Options {}

pub struct Command<'a> {
    config: &'a Configuration,
}

impl<'a> Command<'a> {
    pub fn new(config: &'a Configuration) -> Self {
        Self { config }
    }

    pub fn run(&self) {
        self.config.log_summary();
        info!("Configuration is valid");
        println!("configuration OK");
    }
}
