// SPDX-License-Identifier: Apache-2.0
// Copyright RouterSim Authors

//! Config renderer: basic utils

use std::fmt::Display;
use std::ops::{Add, AddAssign};

/// Section separator in rendered configs.
pub const MARKER: &str = "!";

/// An ordered accumulator of configuration lines.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConfigBuilder {
    lines: Vec<String>,
}

impl ConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    #[must_use]
    pub fn lines(&self) -> &[String] {
        &self.lines
    }
}

impl AddAssign<String> for ConfigBuilder {
    fn add_assign(&mut self, line: String) {
        self.lines.push(line);
    }
}

impl AddAssign<&str> for ConfigBuilder {
    fn add_assign(&mut self, line: &str) {
        self.lines.push(line.to_owned());
    }
}

impl AddAssign<ConfigBuilder> for ConfigBuilder {
    fn add_assign(&mut self, other: ConfigBuilder) {
        self.lines.extend(other.lines);
    }
}

impl Add<ConfigBuilder> for ConfigBuilder {
    type Output = ConfigBuilder;
    fn add(mut self, other: ConfigBuilder) -> Self::Output {
        self += other;
        self
    }
}

impl Display for ConfigBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for line in &self.lines {
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}

/// Anything that can render itself as (part of) an FRR configuration.
pub trait Render {
    type Context;
    type Output;
    fn render(&self, ctx: &Self::Context) -> Self::Output;
}
