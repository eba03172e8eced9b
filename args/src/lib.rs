// SPDX-License-Identifier: Apache-2.0
// Copyright RouterSim Authors

//! Command line arguments of the router simulator.

pub use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "router-sim")]
#[command(about = "Multi-protocol routing control-plane simulator", long_about = None)]
pub struct CmdArgs {
    /// Path to the YAML configuration file.
    #[arg(long, short = 'c', value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override the hostname from the configuration file.
    #[arg(long, value_name = "NAME")]
    hostname: Option<String>,

    /// Tracing filter, e.g. `info` or `routersim_routing=debug`.
    #[arg(long, value_name = "FILTER", default_value = "info")]
    tracing: String,
}

impl CmdArgs {
    #[must_use]
    pub fn config_path(&self) -> Option<&PathBuf> {
        self.config.as_ref()
    }

    #[must_use]
    pub fn hostname(&self) -> Option<&String> {
        self.hostname.as_ref()
    }

    #[must_use]
    pub fn tracing(&self) -> &str {
        &self.tracing
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_full_command_line() {
        let args = CmdArgs::parse_from([
            "router-sim",
            "--config",
            "/etc/router-sim.yaml",
            "--hostname",
            "r1",
            "--tracing",
            "debug",
        ]);
        assert_eq!(
            args.config_path(),
            Some(&PathBuf::from("/etc/router-sim.yaml"))
        );
        assert_eq!(args.hostname(), Some(&"r1".to_owned()));
        assert_eq!(args.tracing(), "debug");
    }

    #[test]
    fn defaults() {
        let args = CmdArgs::parse_from(["router-sim"]);
        assert!(args.config_path().is_none());
        assert_eq!(args.tracing(), "info");
    }
}
