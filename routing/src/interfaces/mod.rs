// SPDX-License-Identifier: Apache-2.0
// Copyright RouterSim Authors

//! Interface model and table

pub mod iftable;
pub mod interface;
