// SPDX-License-Identifier: Apache-2.0
// Copyright RouterSim Authors

#![deny(clippy::all, clippy::pedantic)]

use std::process::ExitCode;

use args::{CmdArgs, Parser};
use config::RouterConfig;
use routing::{RouterCore, RouterError, RouterParams};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn init_logging(filter: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();
}

fn load_config(cmdargs: &CmdArgs) -> Result<RouterConfig, RouterError> {
    let mut config = match cmdargs.config_path() {
        Some(path) => RouterConfig::from_yaml_file(path)?,
        None => RouterConfig::default(),
    };
    if let Some(hostname) = cmdargs.hostname() {
        config.hostname.clone_from(hostname);
    }
    Ok(config)
}

fn run(cmdargs: &CmdArgs) -> Result<(), RouterError> {
    let config = load_config(cmdargs)?;
    info!("Starting router-sim '{}'", config.hostname);

    let core = RouterCore::new(RouterParams::from_config(config))?;
    core.start()?;

    let (stop_tx, stop_rx) = kanal::bounded::<()>(1);
    ctrlc::set_handler(move || {
        let _ = stop_tx.send(());
    })
    .map_err(|e| RouterError::Daemon {
        daemon: "router-sim".to_owned(),
        reason: format!("failed to install signal handler: {e}"),
    })?;

    let _ = stop_rx.recv();
    info!("Shutdown requested");
    core.stop()
}

fn main() -> ExitCode {
    let cmdargs = CmdArgs::parse();
    init_logging(cmdargs.tracing());
    match run(&cmdargs) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("router-sim failed: {e}");
            ExitCode::FAILURE
        }
    }
}
