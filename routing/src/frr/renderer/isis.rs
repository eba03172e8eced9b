// SPDX-License-Identifier: Apache-2.0
// Copyright RouterSim Authors

//! Config renderer: IS-IS

use crate::frr::renderer::builder::{ConfigBuilder, MARKER, Render};
use config::routing::IsisConfig;

impl Render for IsisConfig {
    type Context = ();
    type Output = ConfigBuilder;

    fn render(&self, (): &Self::Context) -> Self::Output {
        let mut cfg = ConfigBuilder::new();
        cfg += MARKER;
        cfg += format!("router isis {}", self.tag);
        if let Some(net) = &self.net {
            cfg += format!(" net {net}");
        }
        cfg += format!(" is-type {}", self.level);
        cfg += "exit";

        for iface in &self.interfaces {
            cfg += format!("interface {iface}");
            cfg += format!(" ip router isis {}", self.tag);
            cfg += format!(" isis csnp-interval {}", (self.csnp_interval_ms / 1_000).max(1));
            cfg += "exit";
        }
        cfg += MARKER;
        cfg
    }
}
