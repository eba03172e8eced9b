// SPDX-License-Identifier: Apache-2.0
// Copyright RouterSim Authors

//! Config renderer: global preamble (zebra-style file)

use crate::frr::renderer::builder::{ConfigBuilder, MARKER, Render};
use config::RouterConfig;

const FRR_VERSION: &str = "8.1";

impl Render for RouterConfig {
    type Context = ();
    type Output = ConfigBuilder;

    fn render(&self, (): &Self::Context) -> Self::Output {
        let mut cfg = ConfigBuilder::new();
        cfg += format!("frr version {FRR_VERSION}");
        cfg += "frr defaults traditional";
        cfg += format!("hostname {}", self.hostname);
        cfg += "log syslog informational";
        if let Some(password) = self.bridge.password.as_ref() {
            cfg += format!("password {password}");
        }
        cfg += MARKER;
        cfg += "line vty";
        cfg += MARKER;
        cfg
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preamble_carries_hostname_and_password() {
        let mut rc = RouterConfig {
            hostname: "edge-1".to_owned(),
            ..RouterConfig::default()
        };
        rc.bridge.password = Some("zebra".to_owned());
        let rendered = rc.render(&()).to_string();
        assert!(rendered.starts_with("frr version 8.1\nfrr defaults traditional\n"));
        assert!(rendered.contains("hostname edge-1"));
        assert!(rendered.contains("password zebra"));
        assert!(rendered.contains("line vty"));
    }
}
