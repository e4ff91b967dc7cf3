//! Input validation
//!
//! Checks applied before arguments cross into liborcon2

use crate::error::{LorconError, LorconResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Maximum length kept from a native error string
const MAX_ERROR_MESSAGE_LEN: usize = 500;

/// Validate interface name
///
/// Any non-empty name is accepted here; names the C side cannot carry
/// (interior NUL) are rejected when the handle is created.
pub fn validate_interface_name(name: &str) -> LorconResult<()> {
    if name.is_empty() {
        return Err(LorconError::InvalidArgument(
            "Interface name cannot be empty".to_string()
        ));
    }
    Ok(())
}

/// Validate a virtual access point name
pub fn validate_vap_name(name: &str) -> LorconResult<()> {
    if name.is_empty() {
        return Err(LorconError::InvalidArgument(
            "VAP name cannot be empty".to_string()
        ));
    }

    if name.contains('\0') {
        return Err(LorconError::InvalidArgument(
            format!("VAP name '{}' contains a NUL byte", name.escape_debug())
        ));
    }

    Ok(())
}

/// Validate a receive timeout in milliseconds, returning the value liborcon2 takes
pub fn validate_timeout(ms: i64) -> LorconResult<i32> {
    if ms < 0 {
        return Err(LorconError::InvalidArgument(
            format!("Timeout cannot be negative: {}", ms)
        ));
    }

    i32::try_from(ms).map_err(|_| LorconError::InvalidArgument(
        format!("Timeout {} exceeds maximum {}", ms, i32::MAX)
    ))
}

/// Hardware (MAC) address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MacAddr(pub [u8; 6]);

impl MacAddr {
    pub fn octets(&self) -> [u8; 6] {
        self.0
    }
}

impl From<[u8; 6]> for MacAddr {
    fn from(octets: [u8; 6]) -> Self {
        MacAddr(octets)
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}", a, b, c, d, e, g)
    }
}

impl FromStr for MacAddr {
    type Err = LorconError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        validate_mac_address(s)?;

        let mut octets = [0u8; 6];
        for (slot, part) in octets.iter_mut().zip(s.split(':')) {
            *slot = u8::from_str_radix(part, 16)
                .map_err(|_| LorconError::InvalidArgument(
                    format!("Invalid hex digit in MAC address: {}", part)
                ))?;
        }
        Ok(MacAddr(octets))
    }
}

/// Validate MAC address format
///
/// Accepts standard MAC format: XX:XX:XX:XX:XX:XX (hex digits)
pub fn validate_mac_address(mac: &str) -> LorconResult<()> {
    if mac.len() != 17 {
        return Err(LorconError::InvalidArgument(
            "MAC address must be in format XX:XX:XX:XX:XX:XX".to_string()
        ));
    }

    let parts: Vec<&str> = mac.split(':').collect();
    if parts.len() != 6 {
        return Err(LorconError::InvalidArgument(
            "MAC address must have 6 octets separated by colons".to_string()
        ));
    }

    for part in parts {
        if part.len() != 2 {
            return Err(LorconError::InvalidArgument(
                "Each MAC address octet must be 2 hex digits".to_string()
            ));
        }

        if !part.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(LorconError::InvalidArgument(
                format!("Invalid hex digit in MAC address: {}", part)
            ));
        }
    }

    Ok(())
}

/// Clean up an error string read back from liborcon2
pub fn sanitize_native_message(raw: &str) -> String {
    let mut sanitized: String = raw
        .trim()
        .chars()
        .filter(|c| !c.is_control() || *c == '\t')
        .collect();

    if sanitized.len() > MAX_ERROR_MESSAGE_LEN {
        let mut cut = MAX_ERROR_MESSAGE_LEN;
        while !sanitized.is_char_boundary(cut) {
            cut -= 1;
        }
        sanitized.truncate(cut);
        sanitized.push_str("... (truncated)");
    }

    sanitized
}
