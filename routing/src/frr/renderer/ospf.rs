// SPDX-License-Identifier: Apache-2.0
// Copyright RouterSim Authors

//! Config renderer: OSPF

use crate::frr::renderer::builder::{ConfigBuilder, MARKER, Render};
use config::routing::OspfConfig;

impl Render for OspfConfig {
    type Context = ();
    type Output = ConfigBuilder;

    fn render(&self, (): &Self::Context) -> Self::Output {
        let mut cfg = ConfigBuilder::new();
        cfg += MARKER;
        cfg += "router ospf".to_owned();
        if let Some(router_id) = &self.router_id {
            cfg += format!(" ospf router-id {router_id}");
        }
        cfg += " timers throttle spf 10 100 5000";
        cfg += "exit";

        /* per-interface area binding */
        for iface in &self.interfaces {
            cfg += format!("interface {iface}");
            cfg += format!(" ip ospf area {}", self.area);
            cfg += "exit";
        }
        cfg += MARKER;
        cfg
    }
}
