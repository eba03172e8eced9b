// SPDX-License-Identifier: Apache-2.0
// Copyright RouterSim Authors

//! Integration with the external FRR routing suite: configuration
//! rendering, command transports, daemon supervision and the bridge that
//! ties them together.

pub mod bridge;
pub mod daemon;
pub mod parser;
pub mod renderer;
pub mod transport;
