//! Library-wide queries: version and driver discovery

use crate::error::{LorconError, LorconResult};
use crate::native::{DriverInfo, LorconBackend};
use crate::validation::validate_interface_name;
use serde::{Deserialize, Serialize};
use std::fmt;

/// liborcon2 version, encoded by the library as `YYYYMMRR`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LibraryVersion {
    pub raw: i32,
}

impl LibraryVersion {
    pub fn year(&self) -> i32 {
        self.raw / 10_000
    }

    pub fn month(&self) -> i32 {
        (self.raw / 100) % 100
    }

    pub fn release(&self) -> i32 {
        self.raw % 100
    }
}

impl fmt::Display for LibraryVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

/// Version of the loaded library
pub fn library_version(backend: &dyn LorconBackend) -> LibraryVersion {
    LibraryVersion { raw: backend.version() }
}

/// Every driver the library was built with, possibly none
pub fn list_drivers(backend: &dyn LorconBackend) -> Vec<DriverInfo> {
    backend.list_drivers()
}

/// Look a driver up by name
pub fn find_driver(backend: &dyn LorconBackend, name: &str) -> LorconResult<DriverInfo> {
    backend
        .find_driver(name)
        .ok_or_else(|| LorconError::NotFound(format!("Driver '{}' not found", name)))
}

/// Best-guess driver for an interface
pub fn auto_driver(backend: &dyn LorconBackend, interface: &str) -> LorconResult<DriverInfo> {
    validate_interface_name(interface)?;
    backend
        .auto_driver(interface)
        .ok_or_else(|| LorconError::NotFound(format!("No driver detected for {}", interface)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::native::MockLorconBackend;
    use mockall::predicate::eq;

    #[test]
    fn test_version_fields() {
        let version = LibraryVersion { raw: 20_091_101 };
        assert_eq!(version.year(), 2009);
        assert_eq!(version.month(), 11);
        assert_eq!(version.release(), 1);
        assert_eq!(version.to_string(), "20091101");
    }

    #[test]
    fn test_library_version_passthrough() {
        let mut backend = MockLorconBackend::new();
        backend.expect_version().times(1).return_const(20_130_501);
        assert_eq!(library_version(&backend).raw, 20_130_501);
    }

    #[test]
    fn test_list_drivers_empty() {
        let mut backend = MockLorconBackend::new();
        backend.expect_list_drivers().returning(Vec::new);
        assert!(list_drivers(&backend).is_empty());
    }

    #[test]
    fn test_find_driver() {
        let mut backend = MockLorconBackend::new();
        backend
            .expect_find_driver()
            .with(eq("mac80211"))
            .returning(|name| Some(DriverInfo::new(name, "Linux mac80211 VAP creation")));
        backend
            .expect_find_driver()
            .with(eq("nonexistent_driver_xyz"))
            .returning(|_| None);

        assert_eq!(find_driver(&backend, "mac80211").unwrap().name, "mac80211");
        assert!(matches!(
            find_driver(&backend, "nonexistent_driver_xyz"),
            Err(LorconError::NotFound(_))
        ));
    }

    #[test]
    fn test_auto_driver() {
        let mut backend = MockLorconBackend::new();
        backend
            .expect_auto_driver()
            .with(eq("wlan0"))
            .returning(|_| Some(DriverInfo::new("mac80211", "Linux mac80211 VAP creation")));
        backend.expect_auto_driver().with(eq("eth0")).returning(|_| None);

        assert_eq!(auto_driver(&backend, "wlan0").unwrap().name, "mac80211");
        assert!(matches!(auto_driver(&backend, "eth0"), Err(LorconError::NotFound(_))));
        assert!(matches!(auto_driver(&backend, ""), Err(LorconError::InvalidArgument(_))));
    }
}
