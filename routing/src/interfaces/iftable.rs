// SPDX-License-Identifier: Apache-2.0
// Copyright RouterSim Authors

//! A table of interfaces keyed by name

use crate::errors::RouterError;
use crate::interfaces::interface::Interface;
use ahash::RandomState;
use config::InterfaceConfig;
use std::collections::HashMap;

#[allow(unused)]
use tracing::{debug, error, info};

/// A table of [`Interface`] objects keyed by name. All interfaces live here.
#[derive(Clone, Default)]
pub struct IfTable {
    by_name: HashMap<String, Interface, RandomState>,
}

impl IfTable {
    #[must_use]
    pub fn new() -> Self {
        Self {
            by_name: HashMap::with_hasher(RandomState::with_seed(0)),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn values(&self) -> impl Iterator<Item = &Interface> {
        self.by_name.values()
    }

    /// Add an [`Interface`] to the table. Adding a duplicate name
    /// overwrites the old entry (last-write-wins) so a reloaded
    /// configuration can replace interfaces without removing them first.
    pub(crate) fn add_interface(&mut self, config: &InterfaceConfig) -> Result<(), RouterError> {
        config.validate()?;
        let iface = Interface::new(config);
        if self
            .by_name
            .insert(config.name.clone(), iface)
            .is_some()
        {
            debug!("Replaced interface '{}' in the interface table", config.name);
        } else {
            debug!("Added new interface '{}' to the interface table", config.name);
        }
        Ok(())
    }

    /// Remove an interface from the table.
    pub(crate) fn del_interface(&mut self, name: &str) -> Result<Interface, RouterError> {
        let Some(iface) = self.by_name.remove(name) else {
            error!("Failed to remove interface '{name}': not found");
            return Err(RouterError::NoSuchInterface(name.to_owned()));
        };
        debug!("Deleted interface '{}'", iface.name);
        Ok(iface)
    }

    #[must_use]
    pub fn get_interface(&self, name: &str) -> Option<&Interface> {
        self.by_name.get(name)
    }

    pub(crate) fn set_iface_enabled(&mut self, name: &str, enabled: bool) -> Result<(), RouterError> {
        self.by_name
            .get_mut(name)
            .ok_or_else(|| RouterError::NoSuchInterface(name.to_owned()))?
            .set_enabled(enabled);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::IpAddr;
    use std::str::FromStr;

    fn cfg(name: &str, addr: &str) -> InterfaceConfig {
        InterfaceConfig::new(name, IpAddr::from_str(addr).unwrap(), 24)
    }

    #[test]
    fn duplicate_add_is_last_write_wins() {
        let mut table = IfTable::new();
        table.add_interface(&cfg("eth0", "192.0.2.1")).unwrap();
        table.add_interface(&cfg("eth0", "198.51.100.1")).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(
            table.get_interface("eth0").unwrap().address,
            IpAddr::from_str("198.51.100.1").unwrap()
        );
    }

    #[test]
    fn removal_of_unknown_name_fails() {
        let mut table = IfTable::new();
        table.add_interface(&cfg("eth0", "192.0.2.1")).unwrap();
        assert!(matches!(
            table.del_interface("eth7"),
            Err(RouterError::NoSuchInterface(_))
        ));
        assert!(table.del_interface("eth0").is_ok());
        assert!(table.is_empty());
    }
}
