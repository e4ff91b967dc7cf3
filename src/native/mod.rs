//! Boundary with liborcon2
//!
//! [`LorconBackend`] covers the library-wide calls and [`NativeHandle`] one
//! `lorcon_t`. Both speak in raw status integers (`>= 0` success, `< 0`
//! failure); turning those into [`crate::LorconError`]s is left to the
//! caller. Two implementations exist: [`LorconLibrary`] loads the real
//! shared object, [`SimulatedLorcon`] stands in for it in tests.

#[cfg(feature = "native")]
pub mod ffi;
pub mod sim;

use serde::{Deserialize, Serialize};

#[cfg(feature = "native")]
pub use ffi::LorconLibrary;
pub use sim::{SimulatedLorcon, SimulatedLorconBuilder};

/// A driver known to liborcon2
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverInfo {
    /// Short name, e.g. `mac80211`
    pub name: String,
    /// Human readable description
    pub details: String,
}

impl DriverInfo {
    pub fn new(name: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            details: details.into(),
        }
    }
}

/// Library-wide entry points
#[cfg_attr(test, mockall::automock)]
pub trait LorconBackend: Send + Sync {
    /// `lorcon_get_version`, formatted `YYYYMMRR`
    fn version(&self) -> i32;

    /// `lorcon_list_drivers`; an empty list is not an error
    fn list_drivers(&self) -> Vec<DriverInfo>;

    /// `lorcon_find_driver`
    fn find_driver(&self, name: &str) -> Option<DriverInfo>;

    /// `lorcon_auto_driver`
    fn auto_driver(&self, interface: &str) -> Option<DriverInfo>;

    /// `lorcon_create` for `interface` using the driver called `driver`
    fn create(&self, interface: &str, driver: &str) -> Option<Box<dyn NativeHandle>>;
}

/// One native capture/injection handle.
///
/// Dropping the handle releases it (`lorcon_close` when opened, then
/// `lorcon_free`).
#[cfg_attr(test, mockall::automock)]
pub trait NativeHandle: Send {
    fn open_inject(&mut self) -> i32;
    fn open_monitor(&mut self) -> i32;
    fn open_injmon(&mut self) -> i32;
    fn close(&mut self);

    /// `lorcon_get_error`
    fn last_error(&self) -> String;
    /// `lorcon_get_capiface`
    fn capture_interface(&self) -> Option<String>;

    /// Returns bytes sent or a negative status
    fn send_bytes(&mut self, frame: &[u8]) -> i32;

    fn set_timeout(&mut self, ms: i32);
    fn timeout(&self) -> i32;

    fn set_vap(&mut self, vap: &str);
    fn vap(&self) -> Option<String>;

    fn driver_name(&self) -> Option<String>;

    fn set_channel(&mut self, channel: i32) -> i32;
    /// Current channel or a negative status
    fn channel(&self) -> i32;

    fn hwmac(&self) -> Result<[u8; 6], i32>;
    fn set_hwmac(&mut self, mac: &[u8; 6]) -> i32;
}
