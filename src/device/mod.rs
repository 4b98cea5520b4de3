//! Display collaborator interface.
//!
//! The run loop talks to displays only through [`FrameDevice`]: capability
//! check, upload, select and the two cosmetic calls. Connections come from a
//! [`DeviceConnector`] so the transport can be swapped.
//!
//! [`DirectoryDevice`] is the bundled implementation. It mirrors a display's
//! art store on the local filesystem, one directory per device address,
//! which is enough to stage images for a sync agent or to exercise the run
//! loop end to end.

mod directory;

pub use directory::{DeviceState, DirectoryConnector, DirectoryDevice};

use crate::Result;
use crate::models::{EncodingHint, MatteOption, PhotoFilter};

/// Operations the run loop needs from a display.
pub trait FrameDevice {
    /// Address the device was connected with.
    fn address(&self) -> &str;

    /// Returns whether the device has an art mode at all.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Device`] if the device cannot be queried.
    fn capability_supported(&self) -> Result<bool>;

    /// Uploads image bytes and returns the handle the device assigned.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Device`] if the transfer fails or no handle is
    /// returned.
    fn upload(&self, bytes: &[u8], encoding: &EncodingHint, matte: MatteOption) -> Result<String>;

    /// Makes an uploaded image current, optionally showing it immediately.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Device`] if the handle is unknown.
    fn select_image(&self, handle: &str, show: bool) -> Result<()>;

    /// Applies a photo filter to an uploaded image.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Device`] on failure.
    fn set_photo_filter(&self, handle: &str, filter: PhotoFilter) -> Result<()>;

    /// Changes the matte of an uploaded image.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Device`] on failure.
    fn change_matte(&self, handle: &str, matte: MatteOption) -> Result<()>;
}

/// Opens device connections by address.
pub trait DeviceConnector {
    /// Connects to the device at `address`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Device`] if the device is unreachable.
    fn connect(&self, address: &str) -> Result<Box<dyn FrameDevice>>;
}

/// Splits a comma-separated address list, dropping blanks and duplicates.
#[must_use]
pub fn parse_addresses(raw: &str) -> Vec<String> {
    let mut addresses: Vec<String> = Vec::new();
    for address in raw.split(',').map(str::trim).filter(|a| !a.is_empty()) {
        if !addresses.iter().any(|a| a == address) {
            addresses.push(address.to_string());
        }
    }
    addresses
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("10.0.0.5" => vec!["10.0.0.5".to_string()]; "single")]
    #[test_case("10.0.0.5, 10.0.0.6" => vec!["10.0.0.5".to_string(), "10.0.0.6".to_string()]; "two")]
    #[test_case("10.0.0.5,,10.0.0.5," => vec!["10.0.0.5".to_string()]; "blanks and duplicates")]
    #[test_case(" , " => Vec::<String>::new(); "empty")]
    fn test_parse_addresses(raw: &str) -> Vec<String> {
        parse_addresses(raw)
    }
}
