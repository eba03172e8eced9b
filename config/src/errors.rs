// SPDX-License-Identifier: Apache-2.0
// Copyright RouterSim Authors

//! Configuration errors

use crate::protocol::Protocol;

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{protocol}: missing required parameter '{parameter}'")]
    MissingParameter {
        protocol: Protocol,
        parameter: &'static str,
    },

    #[error("{protocol}: invalid value for '{parameter}': {reason}")]
    InvalidParameter {
        protocol: Protocol,
        parameter: &'static str,
        reason: String,
    },

    #[error("invalid interface '{name}': {reason}")]
    InvalidInterface { name: String, reason: String },

    #[error("failed to read '{path}': {reason}")]
    ReadFailure { path: String, reason: String },

    #[error("failed to parse configuration: {0}")]
    ParseFailure(String),
}

pub type ConfigResult<T = ()> = Result<T, ConfigError>;
