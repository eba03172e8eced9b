// SPDX-License-Identifier: Apache-2.0
// Copyright RouterSim Authors

//! Config renderers. Each protocol config type implements [`Render`] to
//! produce its FRR stanza; [`builder::ConfigBuilder`] accumulates lines.

pub mod bgp;
pub mod builder;
pub mod global;
pub mod isis;
pub mod ospf;
