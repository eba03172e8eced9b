// SPDX-License-Identifier: Apache-2.0
// Copyright RouterSim Authors

//! Suite output parsing.
//!
//! The suite's textual output is not fully structured; each line is scanned
//! for fixed marker substrings and the first address or prefix token on the
//! line. Lines matching no marker are ignored and only counted.

use ipnet::IpNet;
use std::net::IpAddr;
use std::str::FromStr;

use config::Protocol;

#[allow(unused)]
use tracing::{debug, error, info};

/// One structured observation extracted from suite output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SuiteEvent {
    NeighborUp { address: IpAddr },
    NeighborDown { address: IpAddr },
    RouteAdded { prefix: IpNet },
    RouteRemoved { prefix: IpNet },
}

/// Result of scanning one blob of output: the recognized events plus the
/// count of lines that matched no marker.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ParsedOutput {
    pub events: Vec<SuiteEvent>,
    pub ignored: u64,
}

fn first_prefix(line: &str) -> Option<IpNet> {
    line.split_whitespace()
        .find_map(|tok| IpNet::from_str(tok.trim_matches(|c: char| !c.is_ascii_hexdigit() && c != '.' && c != ':' && c != '/')).ok())
}

fn first_address(line: &str) -> Option<IpAddr> {
    line.split_whitespace()
        .find_map(|tok| IpAddr::from_str(tok.trim_matches(|c: char| !c.is_ascii_hexdigit() && c != '.' && c != ':')).ok())
}

/// Scan suite output for the fixed per-event markers.
#[must_use]
pub fn parse_output(protocol: Protocol, output: &str) -> ParsedOutput {
    let mut parsed = ParsedOutput::default();
    for line in output.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let lower = line.to_ascii_lowercase();
        let event = if lower.contains("neighbor up") {
            first_address(line).map(|address| SuiteEvent::NeighborUp { address })
        } else if lower.contains("neighbor down") {
            first_address(line).map(|address| SuiteEvent::NeighborDown { address })
        } else if lower.contains("route added") {
            first_prefix(line).map(|prefix| SuiteEvent::RouteAdded { prefix })
        } else if lower.contains("route removed") {
            first_prefix(line).map(|prefix| SuiteEvent::RouteRemoved { prefix })
        } else {
            None
        };
        match event {
            Some(event) => parsed.events.push(event),
            None => {
                parsed.ignored += 1;
                debug!("{protocol}: ignoring suite output line: {line}");
            }
        }
    }
    parsed
}
