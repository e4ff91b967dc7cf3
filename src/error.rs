//! Error types for lorcon2

use std::fmt;
use std::io;
use thiserror::Error;

use crate::context::Mode;

/// `LORCON_EGENERIC`
pub const LORCON_EGENERIC: i32 = -1;
/// `LORCON_ENOTSUPP`
pub const LORCON_ENOTSUPP: i32 = -255;

/// Classification of a negative status returned by liborcon2
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeCode {
    /// `LORCON_EGENERIC`
    Generic,
    /// `LORCON_ENOTSUPP`
    NotSupported,
    /// Any other negative value
    Other(i32),
}

impl NativeCode {
    /// Classify a raw status. Returns `None` for success values (`>= 0`).
    pub fn from_status(status: i32) -> Option<Self> {
        match status {
            s if s >= 0 => None,
            LORCON_EGENERIC => Some(NativeCode::Generic),
            LORCON_ENOTSUPP => Some(NativeCode::NotSupported),
            other => Some(NativeCode::Other(other)),
        }
    }

    /// The raw status value
    pub fn raw(&self) -> i32 {
        match self {
            NativeCode::Generic => LORCON_EGENERIC,
            NativeCode::NotSupported => LORCON_ENOTSUPP,
            NativeCode::Other(code) => *code,
        }
    }
}

impl fmt::Display for NativeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NativeCode::Generic => write!(f, "LORCON_EGENERIC"),
            NativeCode::NotSupported => write!(f, "LORCON_ENOTSUPP"),
            NativeCode::Other(code) => write!(f, "status {}", code),
        }
    }
}

/// Native call sites whose failures are translated by [`map_native`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeOp {
    /// `lorcon_create`
    Create,
    /// `lorcon_open_inject` / `lorcon_open_monitor` / `lorcon_open_injmon`
    Open,
    /// `lorcon_send_bytes`
    Send { len: usize },
    /// `lorcon_set_channel`
    SetChannel { channel: i32 },
    /// `lorcon_get_channel`
    GetChannel,
    /// `lorcon_get_timeout`
    GetTimeout,
    /// `lorcon_set_vap`
    SetVap,
    /// `lorcon_get_hwmac` / `lorcon_set_hwmac`
    HardwareAddress,
}

#[derive(Debug, Error)]
pub enum LorconError {
    /// Malformed caller input
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Operation needs an open handle
    #[error("Context for {interface} is not open")]
    NotOpen { interface: String },

    /// Open requested while a handle is already held
    #[error("Context for {interface} is already open in {mode} mode")]
    AlreadyOpen { interface: String, mode: Mode },

    /// Hardware or driver level failure
    #[error("Device error on {interface} ({code}): {message}")]
    Device {
        interface: String,
        code: NativeCode,
        message: String,
    },

    /// Channel rejected by the driver
    #[error("Channel {channel} rejected ({code}): {message}")]
    Channel {
        channel: i32,
        code: NativeCode,
        message: String,
    },

    /// Frame transmission failed
    #[error("Failed to send {len} bytes ({code}): {message}")]
    Transmit {
        len: usize,
        code: NativeCode,
        message: String,
    },

    /// Driver lookup found nothing
    #[error("Not found: {0}")]
    NotFound(String),

    /// Handle is open, but not in a mode the operation needs
    #[error("{operation} is not available in {mode} mode")]
    IncompatibleMode { operation: &'static str, mode: Mode },

    /// Shared library missing or incomplete
    #[error("Library error: {0}")]
    Library(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl LorconError {
    /// Raw native status carried by this error, if it came from liborcon2
    pub fn native_code(&self) -> Option<NativeCode> {
        match self {
            LorconError::Device { code, .. }
            | LorconError::Channel { code, .. }
            | LorconError::Transmit { code, .. } => Some(*code),
            _ => None,
        }
    }
}

/// Translate a failed native call into the error taxonomy.
///
/// This is the only place raw status values become [`LorconError`]s.
pub fn map_native(op: NativeOp, interface: &str, code: NativeCode, message: String) -> LorconError {
    match op {
        NativeOp::Create
        | NativeOp::Open
        | NativeOp::GetChannel
        | NativeOp::GetTimeout
        | NativeOp::SetVap
        | NativeOp::HardwareAddress => LorconError::Device {
            interface: interface.to_string(),
            code,
            message,
        },
        NativeOp::SetChannel { channel } => LorconError::Channel {
            channel,
            code,
            message,
        },
        NativeOp::Send { len } => LorconError::Transmit { len, code, message },
    }
}

pub type LorconResult<T> = Result<T, LorconError>;
