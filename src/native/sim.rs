//! In-process stand-in for liborcon2
//!
//! Behaves like a small set of drivers and radios so contexts can be driven
//! without hardware: one claim per interface, a fixed channel plan, a frame
//! size limit, drivers with or without injection. Transmitted frames are
//! recorded and live handles counted.

use super::{DriverInfo, LorconBackend, NativeHandle};
use crate::error::{LORCON_EGENERIC, LORCON_ENOTSUPP};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::trace;

/// Version reported when none is configured
pub const DEFAULT_SIM_VERSION: i32 = 20_091_101;

/// Largest 802.11 MPDU
pub const DEFAULT_MAX_FRAME_LEN: usize = 2346;

/// Channels accepted when no plan is configured
pub const DEFAULT_CHANNELS: &[i32] = &[
    1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14,
    36, 40, 44, 48, 52, 56, 60, 64, 149, 153, 157, 161, 165,
];

const DEFAULT_HWMAC: [u8; 6] = [0x02, 0x00, 0x00, 0x00, 0x00, 0x01];

/// A simulated driver and what it can do
#[derive(Debug, Clone)]
pub struct SimDriver {
    pub info: DriverInfo,
    pub injection: bool,
}

impl SimDriver {
    pub fn new(name: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            info: DriverInfo::new(name, details),
            injection: true,
        }
    }

    pub fn injection(mut self, supported: bool) -> Self {
        self.injection = supported;
        self
    }
}

/// A frame accepted by a simulated handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentFrame {
    pub interface: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Default)]
struct SimState {
    claimed: HashSet<String>,
    live_handles: usize,
    sent: Vec<SentFrame>,
}

#[derive(Debug)]
struct SimInner {
    version: i32,
    drivers: Vec<SimDriver>,
    interfaces: HashMap<String, String>,
    channels: Vec<i32>,
    max_frame_len: usize,
    hwmac: [u8; 6],
    state: Mutex<SimState>,
}

impl SimInner {
    fn state(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn driver(&self, name: &str) -> Option<&SimDriver> {
        self.drivers.iter().find(|d| d.info.name == name)
    }
}

/// Simulated liborcon2
#[derive(Debug, Clone)]
pub struct SimulatedLorcon {
    inner: Arc<SimInner>,
}

/// Builder for [`SimulatedLorcon`]
#[derive(Debug, Clone)]
pub struct SimulatedLorconBuilder {
    version: i32,
    drivers: Vec<SimDriver>,
    interfaces: HashMap<String, String>,
    channels: Vec<i32>,
    max_frame_len: usize,
    hwmac: [u8; 6],
}

impl Default for SimulatedLorconBuilder {
    fn default() -> Self {
        Self {
            version: DEFAULT_SIM_VERSION,
            drivers: Vec::new(),
            interfaces: HashMap::new(),
            channels: DEFAULT_CHANNELS.to_vec(),
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
            hwmac: DEFAULT_HWMAC,
        }
    }
}

impl SimulatedLorconBuilder {
    pub fn version(mut self, version: i32) -> Self {
        self.version = version;
        self
    }

    /// Register a fully capable driver
    pub fn driver(self, name: impl Into<String>, details: impl Into<String>) -> Self {
        self.with_driver(SimDriver::new(name, details))
    }

    pub fn with_driver(mut self, driver: SimDriver) -> Self {
        self.drivers.push(driver);
        self
    }

    /// Make `interface` exist, bound to `driver` for auto-detection
    pub fn interface(mut self, interface: impl Into<String>, driver: impl Into<String>) -> Self {
        self.interfaces.insert(interface.into(), driver.into());
        self
    }

    pub fn channels<I: IntoIterator<Item = i32>>(mut self, channels: I) -> Self {
        self.channels = channels.into_iter().collect();
        self
    }

    pub fn max_frame_len(mut self, len: usize) -> Self {
        self.max_frame_len = len;
        self
    }

    pub fn hwmac(mut self, mac: [u8; 6]) -> Self {
        self.hwmac = mac;
        self
    }

    pub fn build(self) -> SimulatedLorcon {
        SimulatedLorcon {
            inner: Arc::new(SimInner {
                version: self.version,
                drivers: self.drivers,
                interfaces: self.interfaces,
                channels: self.channels,
                max_frame_len: self.max_frame_len,
                hwmac: self.hwmac,
                state: Mutex::new(SimState::default()),
            }),
        }
    }
}

impl SimulatedLorcon {
    pub fn builder() -> SimulatedLorconBuilder {
        SimulatedLorconBuilder::default()
    }

    /// A `mac80211` driver with `interface` bound to it
    pub fn mac80211(interface: impl Into<String>) -> Self {
        Self::builder()
            .driver("mac80211", "Linux mac80211 VAP creation")
            .interface(interface, "mac80211")
            .build()
    }

    /// Every frame accepted so far, oldest first
    pub fn sent_frames(&self) -> Vec<SentFrame> {
        self.inner.state().sent.clone()
    }

    /// Handles created and not yet dropped
    pub fn live_handles(&self) -> usize {
        self.inner.state().live_handles
    }

    /// Whether an open handle currently holds `interface`
    pub fn is_claimed(&self, interface: &str) -> bool {
        self.inner.state().claimed.contains(interface)
    }
}

impl LorconBackend for SimulatedLorcon {
    fn version(&self) -> i32 {
        self.inner.version
    }

    fn list_drivers(&self) -> Vec<DriverInfo> {
        self.inner.drivers.iter().map(|d| d.info.clone()).collect()
    }

    fn find_driver(&self, name: &str) -> Option<DriverInfo> {
        self.inner.driver(name).map(|d| d.info.clone())
    }

    fn auto_driver(&self, interface: &str) -> Option<DriverInfo> {
        let driver = self.inner.interfaces.get(interface)?;
        self.find_driver(driver)
    }

    fn create(&self, interface: &str, driver: &str) -> Option<Box<dyn NativeHandle>> {
        let driver = self.inner.driver(driver)?.clone();
        self.inner.state().live_handles += 1;
        trace!("Simulated handle created for {}", interface);

        Some(Box::new(SimHandle {
            inner: Arc::clone(&self.inner),
            interface: interface.to_string(),
            driver,
            opened: false,
            timeout: 0,
            vap: None,
            channel: 1,
            hwmac: self.inner.hwmac,
            error: String::new(),
        }))
    }
}

struct SimHandle {
    inner: Arc<SimInner>,
    interface: String,
    driver: SimDriver,
    opened: bool,
    timeout: i32,
    vap: Option<String>,
    channel: i32,
    hwmac: [u8; 6],
    error: String,
}

impl SimHandle {
    fn fail(&mut self, status: i32, message: impl Into<String>) -> i32 {
        self.error = message.into();
        status
    }

    fn enter(&mut self, inject: bool) -> i32 {
        if !self.inner.interfaces.contains_key(&self.interface) {
            let message = format!("{}: no such device", self.interface);
            return self.fail(LORCON_EGENERIC, message);
        }
        if inject && !self.driver.injection {
            let message = format!("{} does not support injection", self.driver.info.name);
            return self.fail(LORCON_ENOTSUPP, message);
        }

        let mut state = self.inner.state();
        if !state.claimed.insert(self.interface.clone()) {
            drop(state);
            let message = format!("{}: device or resource busy", self.interface);
            return self.fail(LORCON_EGENERIC, message);
        }
        drop(state);

        self.opened = true;
        0
    }
}

impl NativeHandle for SimHandle {
    fn open_inject(&mut self) -> i32 {
        self.enter(true)
    }

    fn open_monitor(&mut self) -> i32 {
        self.enter(false)
    }

    fn open_injmon(&mut self) -> i32 {
        self.enter(true)
    }

    fn close(&mut self) {
        if self.opened {
            self.inner.state().claimed.remove(&self.interface);
            self.opened = false;
        }
    }

    fn last_error(&self) -> String {
        self.error.clone()
    }

    fn capture_interface(&self) -> Option<String> {
        Some(self.vap().unwrap_or_else(|| self.interface.clone()))
    }

    fn send_bytes(&mut self, frame: &[u8]) -> i32 {
        if !self.opened {
            return self.fail(LORCON_EGENERIC, "context not opened");
        }
        if frame.len() > self.inner.max_frame_len {
            let message = format!(
                "frame of {} bytes exceeds maximum {}",
                frame.len(),
                self.inner.max_frame_len
            );
            return self.fail(LORCON_EGENERIC, message);
        }

        self.inner.state().sent.push(SentFrame {
            interface: self.interface.clone(),
            bytes: frame.to_vec(),
        });
        frame.len() as i32
    }

    fn set_timeout(&mut self, ms: i32) {
        self.timeout = ms;
    }

    fn timeout(&self) -> i32 {
        self.timeout
    }

    fn set_vap(&mut self, vap: &str) {
        // liborcon2 copies the name whatever the driver
        self.vap = Some(vap.to_string());
    }

    fn vap(&self) -> Option<String> {
        self.vap.clone().filter(|vap| !vap.is_empty())
    }

    fn driver_name(&self) -> Option<String> {
        Some(self.driver.info.name.clone())
    }

    fn set_channel(&mut self, channel: i32) -> i32 {
        if !self.opened {
            return self.fail(LORCON_EGENERIC, "context not opened");
        }
        if !self.inner.channels.contains(&channel) {
            let message = format!("invalid channel {}", channel);
            return self.fail(LORCON_EGENERIC, message);
        }
        self.channel = channel;
        0
    }

    fn channel(&self) -> i32 {
        self.channel
    }

    fn hwmac(&self) -> Result<[u8; 6], i32> {
        Ok(self.hwmac)
    }

    fn set_hwmac(&mut self, mac: &[u8; 6]) -> i32 {
        self.hwmac = *mac;
        0
    }
}

impl Drop for SimHandle {
    fn drop(&mut self) {
        self.close();
        let mut state = self.inner.state();
        state.live_handles = state.live_handles.saturating_sub(1);
    }
}
