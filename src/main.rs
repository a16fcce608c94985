#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]

use argh::FromArgs;
use oauth2_introspection_auth::configuration::Configuration;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{layer::SubscriberExt, EnvFilter};

use crate::command::{authenticate, check_config};

mod command;

fn set_tracing() {
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().json())
        .try_init();
}

#[derive(FromArgs, PartialEq, Debug)]
/// OAuth2 token introspection authentication for message-broker connections
struct GlobalArguments {
    #[argh(option, short = 'c', default = "String::from(\"config.toml\")")]
    /// the path to the configuration file, defaults to `config.toml`
    config: String,

    #[argh(subcommand)]
    subcommand: SubCommand,
}

#[derive(FromArgs, PartialEq, Debug)]
#[argh(subcommand)]
enum SubCommand {
    Authenticate(authenticate::Options),
    CheckConfig(check_config::Options),
}

fn main() -> Result<(), command::Error> {
    let cli_args: GlobalArguments = argh::from_env();

    set_tracing();

    let config = Configuration::load(&cli_args.config)?;

    match cli_args.subcommand {
        SubCommand::CheckConfig(_) => {
            check_config::Command::new(&config).run();
            Ok(())
        }
        SubCommand::Authenticate(options) => {
            let command = authenticate::Command::new(options, &config)?;

            tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()?
                .block_on(command.run());
            Ok(())
        }
    }
}
