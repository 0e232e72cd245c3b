//! Device connectivity as reported by the biomonitor server.

use std::fmt;

/// Message shown before the first status poll completes.
pub const CHECKING_MESSAGE: &str = "Checking for connection";

/// Message shown when the status query itself fails.
pub const UNREACHABLE_MESSAGE: &str = "Unable to reach the biomonitor server";

/// Opaque identifier of a device, usually the serial port it sits on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct DeviceDescriptor(pub String);

impl DeviceDescriptor {
    pub fn new(port: impl Into<String>) -> Self {
        Self(port.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DeviceDescriptor {
    fn from(port: &str) -> Self {
        Self::new(port)
    }
}

/// Connectivity state of the biomonitor board.
///
/// The console replaces this as a whole on every poll; it is never merged
/// field by field.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct DeviceStatus {
    /// Whether the board is connected and usable.
    #[cfg_attr(feature = "serde", serde(default))]
    pub is_connected: bool,

    /// Human-readable status, e.g. "One device available on USB."
    #[cfg_attr(feature = "serde", serde(default))]
    pub status_message: String,

    /// Devices the server can see, in the order it reported them.
    #[cfg_attr(feature = "serde", serde(default))]
    pub available_devices: Vec<DeviceDescriptor>,

    /// The device the console is attached to, if any.
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub device_port: Option<DeviceDescriptor>,
}

impl DeviceStatus {
    /// Status held before the first poll has returned.
    pub fn checking() -> Self {
        Self {
            is_connected: false,
            status_message: CHECKING_MESSAGE.to_string(),
            available_devices: Vec::new(),
            device_port: None,
        }
    }

    /// Fixed fallback used when the status query fails.
    pub fn unreachable() -> Self {
        Self {
            is_connected: false,
            status_message: UNREACHABLE_MESSAGE.to_string(),
            available_devices: Vec::new(),
            device_port: None,
        }
    }

    /// The only available device, when there is exactly one.
    pub fn sole_device(&self) -> Option<&DeviceDescriptor> {
        match self.available_devices.as_slice() {
            [device] => Some(device),
            _ => None,
        }
    }
}
