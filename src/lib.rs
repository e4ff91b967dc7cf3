//! lorcon2 - bindings to the LORCON2 packet injection library
//!
//! Safe access to liborcon2 from Rust:
//! - Driver discovery (list, lookup by name, auto-detection per interface)
//! - Contexts bound to one wireless interface, opened in monitor,
//!   injection or monitor+injection mode
//! - Channel, receive timeout, VAP and hardware address control
//! - Raw 802.11 frame transmission
//!
//! liborcon2 is loaded at runtime; a simulated backend stands in for it in
//! tests and dry runs.

pub mod error;
pub mod validation;
pub mod config;
pub mod native;
pub mod drivers;
pub mod context;

// Re-export commonly used types
pub use error::{LorconError, LorconResult, NativeCode};
pub use config::LorconConfig;
pub use context::{Context, ContextBuilder, Mode};
pub use drivers::{auto_driver, find_driver, library_version, list_drivers, LibraryVersion};
pub use native::{DriverInfo, LorconBackend, NativeHandle, SimulatedLorcon};
pub use validation::MacAddr;

#[cfg(feature = "native")]
pub use native::LorconLibrary;
