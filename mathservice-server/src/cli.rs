use std::net::IpAddr;
use std::path::PathBuf;

use anyhow::Result;
use argh::FromArgs;

use crate::config::Config;
use crate::{healthcheck, observability, web};

/// Math service: adds two numbers over HTTP after a fixed simulated delay.
#[derive(Debug, FromArgs)]
struct Args {
    /// path to the YAML configuration file
    #[argh(option, short = 'c')]
    config: Option<PathBuf>,

    #[argh(subcommand)]
    command: Command,
}

impl Args {
    /// Loads the configuration and applies the overrides given on the command line.
    ///
    /// Command line flags take precedence over every other configuration source.
    fn load_config(&self) -> Result<Config> {
        let mut config = Config::load(self.config.as_deref())?;

        match &self.command {
            Command::Run(run) => {
                if let Some(host) = run.host {
                    config.host = host;
                }
                if let Some(port) = run.port {
                    config.port = port;
                }
            }
            Command::Healthcheck(check) => {
                if let Some(port) = check.port {
                    config.port = port;
                }
            }
            Command::Version(_) => {}
        }

        Ok(config)
    }
}

#[derive(Debug, FromArgs)]
#[argh(subcommand)]
enum Command {
    Run(RunCommand),
    Healthcheck(HealthcheckCommand),
    Version(VersionCommand),
}

/// serve additions until the process is signalled
#[derive(Debug, FromArgs)]
#[argh(subcommand, name = "run")]
struct RunCommand {
    /// interface to bind to, e.g. `127.0.0.1`
    #[argh(option)]
    host: Option<IpAddr>,

    /// port to listen on
    #[argh(option, short = 'p')]
    port: Option<u16>,
}

/// check that a math service answers on the configured port
///
/// Exits with a non-zero status if the service is unreachable or unhealthy. This is used for
/// container healthchecks.
#[derive(Debug, FromArgs)]
#[argh(subcommand, name = "healthcheck")]
struct HealthcheckCommand {
    /// port of the service to check
    #[argh(option, short = 'p')]
    port: Option<u16>,
}

/// print the math service version
#[derive(Debug, FromArgs)]
#[argh(subcommand, name = "version")]
struct VersionCommand {}

/// Parses the command line, then runs the selected command on a fresh runtime.
pub fn execute() -> Result<()> {
    let args: Args = argh::from_env();

    // Printing the version needs neither configuration nor a runtime.
    if let Command::Version(VersionCommand {}) = args.command {
        println!("mathservice {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let config = args.load_config()?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .thread_name("main-rt")
        .enable_all()
        .build()?;
    let _runtime_guard = runtime.enter();

    observability::init_tracing(&config);
    tracing::debug!(?config, "Loaded configuration");

    runtime.block_on(async move {
        match args.command {
            Command::Run(_) => web::server(config).await,
            Command::Healthcheck(_) => healthcheck::healthcheck(config).await,
            Command::Version(_) => Ok(()),
        }
    })
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use super::*;

    fn parse(args: &[&str]) -> Args {
        Args::from_args(&["mathservice"], args).unwrap()
    }

    #[test]
    fn run_flags_override_environment() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("PORT", "8001");
            jail.set_env("MATH__HOST", "10.0.0.1");

            let args = parse(&["run", "--host", "127.0.0.1", "--port", "9000"]);
            let config = args.load_config().unwrap();
            assert_eq!(config.host, IpAddr::V4(Ipv4Addr::LOCALHOST));
            assert_eq!(config.port, 9000);

            Ok(())
        });
    }

    #[test]
    fn run_without_flags() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("PORT", "8001");

            let config = parse(&["run"]).load_config().unwrap();
            assert_eq!(config.port, 8001);

            Ok(())
        });
    }

    #[test]
    fn healthcheck_port() {
        figment::Jail::expect_with(|_jail| {
            let config = parse(&["healthcheck", "-p", "9100"]).load_config().unwrap();
            assert_eq!(config.port, 9100);

            Ok(())
        });
    }

    #[test]
    fn config_file_flag() {
        let args = parse(&["-c", "mathservice.yml", "version"]);
        assert_eq!(args.config, Some(PathBuf::from("mathservice.yml")));
        assert!(matches!(args.command, Command::Version(_)));
    }

    #[test]
    fn invalid_port() {
        assert!(Args::from_args(&["mathservice"], &["run", "--port", "70000"]).is_err());
    }
}
