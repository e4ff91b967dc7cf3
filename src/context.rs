//! Capture/injection context
//!
//! A [`Context`] is bound to one interface name at construction and holds
//! at most one native handle. The handle is acquired by one of the `open*`
//! calls and released by [`Context::close`] or when the context is dropped.

use crate::config::LorconConfig;
use crate::error::{map_native, LorconError, LorconResult, NativeCode, NativeOp};
use crate::native::{LorconBackend, NativeHandle};
use crate::validation::{validate_interface_name, validate_timeout, validate_vap_name, MacAddr};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Receive timeout applied to new handles when none was configured
pub const DEFAULT_TIMEOUT_MS: i64 = 100;

/// Operating mode of a context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    /// No native handle held
    Closed,
    /// Passive capture
    Monitor,
    /// Frame transmission
    Injection,
    /// Capture and transmission
    MonitorInjection,
}

impl Mode {
    pub fn is_open(&self) -> bool {
        !matches!(self, Mode::Closed)
    }

    pub fn can_inject(&self) -> bool {
        matches!(self, Mode::Injection | Mode::MonitorInjection)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Closed => write!(f, "closed"),
            Mode::Monitor => write!(f, "monitor"),
            Mode::Injection => write!(f, "injection"),
            Mode::MonitorInjection => write!(f, "monitor+injection"),
        }
    }
}

/// Builder for [`Context`]
pub struct ContextBuilder {
    backend: Arc<dyn LorconBackend>,
    interface: String,
    driver: Option<String>,
    timeout_ms: Option<i64>,
    vap: Option<String>,
}

impl ContextBuilder {
    /// Use this driver instead of auto-detecting one
    pub fn driver(mut self, name: impl Into<String>) -> Self {
        self.driver = Some(name.into());
        self
    }

    /// Receive timeout in milliseconds
    pub fn timeout(mut self, ms: i64) -> Self {
        self.timeout_ms = Some(ms);
        self
    }

    /// Virtual interface created by the driver when the context opens
    pub fn vap(mut self, name: impl Into<String>) -> Self {
        self.vap = Some(name.into());
        self
    }

    /// Take driver and timeout defaults from a configuration
    pub fn config(mut self, config: &LorconConfig) -> Self {
        if self.driver.is_none() {
            self.driver = config.defaults.driver.clone();
        }
        if self.timeout_ms.is_none() {
            self.timeout_ms = Some(config.defaults.timeout_ms);
        }
        self
    }

    pub fn build(self) -> LorconResult<Context> {
        validate_interface_name(&self.interface)?;
        let timeout_ms = match self.timeout_ms {
            Some(ms) => {
                validate_timeout(ms)?;
                Some(ms)
            }
            None => None,
        };
        if let Some(vap) = &self.vap {
            validate_vap_name(vap)?;
        }

        Ok(Context {
            backend: self.backend,
            interface: self.interface,
            driver: self.driver,
            handle: None,
            mode: Mode::Closed,
            channel: None,
            timeout_ms,
            vap: self.vap,
        })
    }
}

/// One interface, at most one open native handle
pub struct Context {
    backend: Arc<dyn LorconBackend>,
    interface: String,
    driver: Option<String>,
    handle: Option<Box<dyn NativeHandle>>,
    mode: Mode,
    channel: Option<i32>,
    timeout_ms: Option<i64>,
    vap: Option<String>,
}

impl Context {
    /// Bind a context to `interface`. No hardware is touched.
    pub fn new(backend: Arc<dyn LorconBackend>, interface: impl Into<String>) -> LorconResult<Self> {
        Self::builder(backend, interface).build()
    }

    pub fn builder(backend: Arc<dyn LorconBackend>, interface: impl Into<String>) -> ContextBuilder {
        ContextBuilder {
            backend,
            interface: interface.into(),
            driver: None,
            timeout_ms: None,
            vap: None,
        }
    }

    pub fn interface(&self) -> &str {
        &self.interface
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn is_open(&self) -> bool {
        self.handle.is_some()
    }

    pub fn open_injection(&mut self) -> LorconResult<()> {
        self.open(Mode::Injection)
    }

    pub fn open_monitor(&mut self) -> LorconResult<()> {
        self.open(Mode::Monitor)
    }

    pub fn open_injection_monitor(&mut self) -> LorconResult<()> {
        self.open(Mode::MonitorInjection)
    }

    /// Acquire a native handle in `mode`.
    ///
    /// On failure nothing stays acquired: a handle created along the way is
    /// dropped, and thereby released, before the error is returned.
    pub fn open(&mut self, mode: Mode) -> LorconResult<()> {
        let enter: fn(&mut Box<dyn NativeHandle>) -> i32 = match mode {
            Mode::Injection => |handle| handle.open_inject(),
            Mode::Monitor => |handle| handle.open_monitor(),
            Mode::MonitorInjection => |handle| handle.open_injmon(),
            Mode::Closed => {
                return Err(LorconError::InvalidArgument(
                    "Cannot open a context in closed mode".to_string(),
                ))
            }
        };
        if self.handle.is_some() {
            return Err(LorconError::AlreadyOpen {
                interface: self.interface.clone(),
                mode: self.mode,
            });
        }
        if self.interface.contains('\0') {
            return Err(LorconError::InvalidArgument(format!(
                "Interface name '{}' contains a NUL byte",
                self.interface.escape_debug()
            )));
        }

        let driver = match &self.driver {
            Some(name) => self
                .backend
                .find_driver(name)
                .ok_or_else(|| LorconError::NotFound(format!("Driver '{}' not found", name)))?,
            None => self.backend.auto_driver(&self.interface).ok_or_else(|| LorconError::Device {
                interface: self.interface.clone(),
                code: NativeCode::Generic,
                message: "unable to detect a driver for this interface".to_string(),
            })?,
        };

        let mut handle = self
            .backend
            .create(&self.interface, &driver.name)
            .ok_or_else(|| {
                map_native(
                    NativeOp::Create,
                    &self.interface,
                    NativeCode::Generic,
                    format!("unable to create context with driver {}", driver.name),
                )
            })?;
        debug!("Created handle for {} with driver {}", self.interface, driver.name);

        let timeout = validate_timeout(self.timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS))?;
        handle.set_timeout(timeout);

        if let Some(vap) = &self.vap {
            handle.set_vap(vap);
        }

        let status = enter(&mut handle);
        if let Some(code) = NativeCode::from_status(status) {
            let message = handle.last_error();
            debug!("Opening {} in {} mode failed: {}", self.interface, mode, message);
            return Err(map_native(NativeOp::Open, &self.interface, code, message));
        }

        debug!("Opened {} in {} mode", self.interface, mode);
        self.handle = Some(handle);
        self.mode = mode;
        Ok(())
    }

    /// Release the handle if one is held. Safe to call any number of times.
    pub fn close(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            handle.close();
            debug!("Closed {}", self.interface);
        }
        self.mode = Mode::Closed;
        self.channel = None;
    }

    fn handle(&self) -> LorconResult<&dyn NativeHandle> {
        self.handle.as_deref().ok_or_else(|| LorconError::NotOpen {
            interface: self.interface.clone(),
        })
    }

    fn handle_mut(&mut self) -> LorconResult<&mut Box<dyn NativeHandle>> {
        let interface = &self.interface;
        self.handle.as_mut().ok_or_else(|| LorconError::NotOpen {
            interface: interface.clone(),
        })
    }

    fn native_error(&self, op: NativeOp, status: i32) -> LorconError {
        let code = NativeCode::from_status(status).unwrap_or(NativeCode::Generic);
        let message = self.handle.as_ref().map(|h| h.last_error()).unwrap_or_default();
        debug!("{:?} on {} failed: {} ({})", op, self.interface, message, code);
        map_native(op, &self.interface, code, message)
    }

    /// Transmit `frame` verbatim, returning the bytes the driver accepted
    pub fn send_bytes(&mut self, frame: &[u8]) -> LorconResult<usize> {
        let mode = self.mode;
        let handle = self.handle_mut()?;
        if !mode.can_inject() {
            return Err(LorconError::IncompatibleMode {
                operation: "send_bytes",
                mode,
            });
        }

        let status = handle.send_bytes(frame);
        if status < 0 {
            return Err(self.native_error(NativeOp::Send { len: frame.len() }, status));
        }
        Ok(status as usize)
    }

    pub fn set_channel(&mut self, channel: i32) -> LorconResult<()> {
        let status = self.handle_mut()?.set_channel(channel);
        if status < 0 {
            return Err(self.native_error(NativeOp::SetChannel { channel }, status));
        }
        self.channel = Some(channel);
        Ok(())
    }

    /// Channel the radio is tuned to, as reported by the driver
    pub fn channel(&self) -> LorconResult<i32> {
        let status = self.handle()?.channel();
        if status < 0 {
            return Err(self.native_error(NativeOp::GetChannel, status));
        }
        Ok(status)
    }

    /// Last channel successfully set through this context
    pub fn configured_channel(&self) -> Option<i32> {
        self.channel
    }

    /// Receive timeout in milliseconds. Allowed while closed; applied on open.
    ///
    /// liborcon2 stores the timeout as a C `int`, so values above `i32::MAX`
    /// are rejected with `InvalidArgument` just like negative ones.
    pub fn set_timeout(&mut self, ms: i64) -> LorconResult<()> {
        let native = validate_timeout(ms)?;
        if let Some(handle) = self.handle.as_mut() {
            handle.set_timeout(native);
        }
        self.timeout_ms = Some(ms);
        Ok(())
    }

    /// Receive timeout in milliseconds.
    ///
    /// Read from the driver while open; while closed, the value that will be
    /// applied on the next open (`None` means the 100 ms default).
    pub fn timeout(&self) -> LorconResult<Option<i64>> {
        let handle = match &self.handle {
            Some(handle) => handle,
            None => return Ok(self.timeout_ms),
        };

        let status = handle.timeout();
        if status < 0 {
            return Err(self.native_error(NativeOp::GetTimeout, status));
        }
        Ok(Some(i64::from(status)))
    }

    /// Set the virtual interface name.
    ///
    /// The name is read back from the handle; a handle that did not keep it
    /// is reported as a device error. liborcon2 itself stores any name, so
    /// drivers without VAP support only fail once they try to use it.
    pub fn set_virtual_access_point(&mut self, name: &str) -> LorconResult<()> {
        validate_vap_name(name)?;
        let handle = self.handle_mut()?;
        handle.set_vap(name);

        if handle.vap().as_deref() != Some(name) {
            let driver = handle.driver_name().unwrap_or_default();
            return Err(map_native(
                NativeOp::SetVap,
                &self.interface,
                NativeCode::NotSupported,
                format!("driver {} does not support virtual interfaces", driver),
            ));
        }

        self.vap = Some(name.to_string());
        Ok(())
    }

    pub fn virtual_access_point(&self) -> Option<String> {
        match &self.handle {
            Some(handle) => handle
                .vap()
                .filter(|vap| !vap.is_empty())
                .or_else(|| self.vap.clone()),
            None => self.vap.clone(),
        }
    }

    pub fn driver_name(&self) -> LorconResult<String> {
        self.handle()?.driver_name().ok_or_else(|| LorconError::Device {
            interface: self.interface.clone(),
            code: NativeCode::Generic,
            message: "driver name unavailable".to_string(),
        })
    }

    /// Interface frames are actually captured on (may be a VAP)
    pub fn capture_interface(&self) -> LorconResult<String> {
        let handle = self.handle()?;
        Ok(handle.capture_interface().unwrap_or_else(|| self.interface.clone()))
    }

    /// Most recent error string from the native layer
    pub fn last_error(&self) -> Option<String> {
        let message = self.handle.as_ref()?.last_error();
        if message.is_empty() {
            None
        } else {
            Some(message)
        }
    }

    pub fn hardware_address(&self) -> LorconResult<MacAddr> {
        match self.handle()?.hwmac() {
            Ok(octets) => Ok(MacAddr(octets)),
            Err(status) => Err(self.native_error(NativeOp::HardwareAddress, status)),
        }
    }

    pub fn set_hardware_address(&mut self, mac: MacAddr) -> LorconResult<()> {
        let status = self.handle_mut()?.set_hwmac(&mac.octets());
        if status < 0 {
            return Err(self.native_error(NativeOp::HardwareAddress, status));
        }
        Ok(())
    }
}

impl Drop for Context {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("interface", &self.interface)
            .field("driver", &self.driver)
            .field("mode", &self.mode)
            .field("channel", &self.channel)
            .field("timeout_ms", &self.timeout_ms)
            .field("vap", &self.vap)
            .finish()
    }
}
