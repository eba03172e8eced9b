// SPDX-License-Identifier: Apache-2.0
// Copyright RouterSim Authors

//! Config renderer: BGP

use crate::frr::renderer::builder::{ConfigBuilder, MARKER, Render};
use config::routing::BgpConfig;

fn ms_to_secs(ms: u64) -> u64 {
    (ms / 1_000).max(1)
}

impl Render for BgpConfig {
    type Context = ();
    type Output = ConfigBuilder;

    fn render(&self, (): &Self::Context) -> Self::Output {
        let mut cfg = ConfigBuilder::new();
        cfg += MARKER;
        cfg += format!("router bgp {}", self.local_as);
        if let Some(router_id) = &self.router_id {
            cfg += format!(" bgp router-id {router_id}");
        }
        if self.graceful_restart {
            cfg += " bgp graceful-restart";
        }
        cfg += format!(
            " timers bgp {} {}",
            ms_to_secs(self.keepalive_interval_ms),
            ms_to_secs(self.hold_time_ms)
        );
        cfg += "exit";
        cfg += MARKER;
        cfg
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn bgp_stanza() {
        let bgp = BgpConfig::new(65001, Ipv4Addr::new(10, 0, 0, 1))
            .set_graceful_restart(true)
            .set_timers(30_000, 90_000);
        let rendered = bgp.render(&()).to_string();
        assert!(rendered.contains("router bgp 65001"));
        assert!(rendered.contains(" bgp router-id 10.0.0.1"));
        assert!(rendered.contains(" bgp graceful-restart"));
        assert!(rendered.contains(" timers bgp 30 90"));
    }

    #[test]
    fn sub_second_timers_round_up() {
        let bgp = BgpConfig::new(65001, Ipv4Addr::new(10, 0, 0, 1)).set_timers(100, 300);
        assert!(bgp.render(&()).to_string().contains(" timers bgp 1 1"));
    }
}
