use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};

use webby::config::{Cli, Config, APP_NAME, APP_VERSION, DEFAULT_PORT};
use webby::server::Server;

// $ WEBBY_ROOT=./site webby --port 9090
fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // Help and version are printed through the error path too.
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    if let Err(e) = webby::logger::init(cli.debug) {
        eprintln!("{e:#}");
        return ExitCode::FAILURE;
    }

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let config = Config::load(cli)?;

    info!("Starting {APP_NAME} v{APP_VERSION}");
    if config.port == DEFAULT_PORT {
        info!("Using default port: {}", config.port);
    }

    let mut server = Server::bind(config)?;
    server.shutdown_handle()?.register_signals()?;

    info!(
        "Server now listening for incoming connections on port: {}",
        server.local_addr()?.port()
    );

    server.run()
}
