// SPDX-License-Identifier: Apache-2.0
// Copyright RouterSim Authors

//! Routing protocol identifiers

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// The closed set of routing protocols the engine can run.
#[derive(
    Copy,
    Clone,
    Debug,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Hash,
    Display,
    EnumIter,
    EnumString,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Bgp,
    Ospf,
    Isis,
}

impl Protocol {
    /// Name of the control-plane suite daemon implementing this protocol.
    #[must_use]
    pub fn daemon(&self) -> &'static str {
        match self {
            Protocol::Bgp => "bgpd",
            Protocol::Ospf => "ospfd",
            Protocol::Isis => "isisd",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn protocol_names() {
        assert_eq!(Protocol::Bgp.to_string(), "bgp");
        assert_eq!(Protocol::from_str("isis").unwrap(), Protocol::Isis);
        assert_eq!(Protocol::Ospf.daemon(), "ospfd");
    }
}
