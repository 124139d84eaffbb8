//! Device metadata and identity derivation.
//!
//! Backends describe what they enumerated with a [`DeviceMeta`] and turn it into
//! a [`DeviceId`] via [`DeviceMeta::identity`].
//!
//! # Conventions
//! - `path` is the bus/topology path of the physical port (for udev, the devpath
//!   of the parent `usb_device`). It is hashed with CRC-32 into the upper half of
//!   the identity, so two identical pads on different ports get different ids
//!   and a pad replugged into the same port gets the same one.
//! - `vid`/`pid` fill the lower half.
//!
//! ## Persistence notes
//! The CRC-32 is the standard reflected `0xEDB88320` polynomial, so identities are
//! byte-stable across runs and stored assignment strings keep resolving after a
//! restart. Two devices whose paths hash to the same value are indistinguishable.

use crate::device::DeviceId;
use crc::{Crc, CRC_32_ISO_HDLC};
use serde::{Deserialize, Serialize};

const PATH_CRC: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

/// Best-effort description of an enumerated device.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceMeta {
    /// Bus/topology path of the port the device is plugged into.
    pub path: String,

    /// USB Vendor ID (VID).
    pub vid: u16,

    /// USB Product ID (PID).
    pub pid: u16,

    /// Human-readable product name, if the OS reported one.
    pub product_string: Option<String>,

    /// Serial number, if present. Not part of the identity.
    pub serial_number: Option<String>,
}

impl DeviceMeta {
    pub fn new(path: impl Into<String>, vid: u16, pid: u16) -> Self {
        Self {
            path: path.into(),
            vid,
            pid,
            ..Self::default()
        }
    }

    /// Pack `crc32(path)`, `vid` and `pid` into a [`DeviceId`].
    pub fn identity(&self) -> DeviceId {
        DeviceId::from_parts(path_hash(&self.path), self.vid, self.pid)
    }
}

/// CRC-32 of a topology path.
pub fn path_hash(path: &str) -> u32 {
    PATH_CRC.checksum(path.as_bytes())
}

/// Parse a vendor/product id as sysfs reports it (`"045e"`).
pub fn parse_hex_u16(text: &str) -> Option<u16> {
    let text = text.trim();
    let text = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .unwrap_or(text);
    u16::from_str_radix(text, 16).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_hash_is_standard_crc32() {
        // Well-known check value of CRC-32/ISO-HDLC.
        assert_eq!(path_hash("123456789"), 0xcbf4_3926);
        assert_eq!(path_hash(""), 0);
    }

    #[test]
    fn identity_packs_hash_vid_and_pid() {
        let meta = DeviceMeta::new("/devices/pci0000:00/usb1/1-2", 0x045e, 0x028e);
        let id = meta.identity();
        assert_eq!(id.path_id(), path_hash("/devices/pci0000:00/usb1/1-2"));
        assert_eq!(id.vendor_id(), 0x045e);
        assert_eq!(id.product_id(), 0x028e);
    }

    #[test]
    fn same_model_on_different_ports_differs() {
        let a = DeviceMeta::new("usb1/1-1", 0x054c, 0x09cc).identity();
        let b = DeviceMeta::new("usb1/1-2", 0x054c, 0x09cc).identity();
        assert_ne!(a, b);
        assert_eq!(a, DeviceMeta::new("usb1/1-1", 0x054c, 0x09cc).identity());
    }

    #[test]
    fn parses_sysfs_style_ids() {
        assert_eq!(parse_hex_u16("045e"), Some(0x045e));
        assert_eq!(parse_hex_u16("0x028E\n"), Some(0x028e));
        assert_eq!(parse_hex_u16("zz"), None);
    }
}
