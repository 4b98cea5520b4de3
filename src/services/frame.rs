//! Per-device run loop.

use super::acquisition::{Acquisition, AcquisitionService, SharedImage};
use crate::device::{DeviceConnector, FrameDevice};
use crate::models::{MatteOption, PhotoFilter};
use crate::{Error, Result};
use std::fmt;

/// Options shared by every device of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Resolve one image and reuse it for every device.
    pub same_image: bool,
    /// Photo filter to apply after upload or reuse.
    pub photo_filter: Option<PhotoFilter>,
    /// Matte to apply after upload or reuse.
    pub matte: Option<MatteOption>,
}

/// What happened on one device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceOutcome {
    /// A new image was uploaded and selected.
    Uploaded {
        /// Handle assigned by the device.
        handle: String,
    },
    /// A previously uploaded image was selected again.
    Reused {
        /// Handle from the ledger.
        handle: String,
    },
    /// The device does not support art mode.
    Skipped,
    /// Acquisition or a device call failed.
    Failed {
        /// Error message.
        error: String,
    },
}

impl fmt::Display for DeviceOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uploaded { handle } => write!(f, "uploaded {handle}"),
            Self::Reused { handle } => write!(f, "reused {handle}"),
            Self::Skipped => f.write_str("skipped (no art mode)"),
            Self::Failed { error } => write!(f, "failed: {error}"),
        }
    }
}

/// Result of a run, one report per device in the order given.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// `(address, outcome)` per device.
    pub devices: Vec<(String, DeviceOutcome)>,
}

impl RunSummary {
    fn count(&self, pred: impl Fn(&DeviceOutcome) -> bool) -> usize {
        self.devices.iter().filter(|(_, o)| pred(o)).count()
    }

    /// Devices that received a new upload.
    #[must_use]
    pub fn uploaded(&self) -> usize {
        self.count(|o| matches!(o, DeviceOutcome::Uploaded { .. }))
    }

    /// Devices that reused a ledger handle.
    #[must_use]
    pub fn reused(&self) -> usize {
        self.count(|o| matches!(o, DeviceOutcome::Reused { .. }))
    }

    /// Devices without art mode.
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, DeviceOutcome::Skipped))
    }

    /// Devices that failed.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, DeviceOutcome::Failed { .. }))
    }

    /// Returns the outcome for `address`.
    #[must_use]
    pub fn outcome(&self, address: &str) -> Option<&DeviceOutcome> {
        self.devices
            .iter()
            .find(|(a, _)| a == address)
            .map(|(_, o)| o)
    }
}

/// Drives acquisition and upload across the target devices.
pub struct FrameService<'a> {
    acquisition: AcquisitionService,
    connector: &'a dyn DeviceConnector,
}

impl<'a> FrameService<'a> {
    /// Creates the run driver.
    #[must_use]
    pub fn new(acquisition: AcquisitionService, connector: &'a dyn DeviceConnector) -> Self {
        Self {
            acquisition,
            connector,
        }
    }

    /// The acquisition service (and through it the ledger).
    #[must_use]
    pub const fn acquisition(&self) -> &AcquisitionService {
        &self.acquisition
    }

    /// Processes every device in order.
    ///
    /// Per-device failures are logged and reported in the summary; they never
    /// stop the remaining devices.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if `devices` is empty.
    pub fn run(
        &mut self,
        devices: &[String],
        selector: Option<&str>,
        options: &RunOptions,
    ) -> Result<RunSummary> {
        if devices.is_empty() {
            return Err(Error::InvalidInput(
                "no target devices specified".to_string(),
            ));
        }
        let multi_device = devices.len() > 1;
        tracing::info!(
            source = %self.acquisition.source(),
            devices = devices.len(),
            same_image = options.same_image,
            "Starting run"
        );

        let mut shared = None;
        if options.same_image {
            match self.acquisition.locate_shared(selector) {
                Ok(image) => shared = Some(image),
                Err(e) => {
                    tracing::error!(error = %e, "Shared image could not be resolved");
                    let error = e.to_string();
                    return Ok(RunSummary {
                        devices: devices
                            .iter()
                            .map(|d| (d.clone(), DeviceOutcome::Failed { error: error.clone() }))
                            .collect(),
                    });
                },
            }
        }

        let mut summary = RunSummary::default();
        for address in devices {
            let scope = multi_device.then_some(address.as_str());
            let outcome = match self.process(address, scope, selector, shared.as_mut(), options) {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::error!(device = %address, error = %e, "Device failed");
                    DeviceOutcome::Failed {
                        error: e.to_string(),
                    }
                },
            };
            tracing::info!(device = %address, outcome = %outcome, "Device done");
            summary.devices.push((address.clone(), outcome));
        }
        Ok(summary)
    }

    fn process(
        &mut self,
        address: &str,
        scope: Option<&str>,
        selector: Option<&str>,
        shared: Option<&mut SharedImage>,
        options: &RunOptions,
    ) -> Result<DeviceOutcome> {
        let device = self.connector.connect(address)?;
        if !device.capability_supported()? {
            tracing::warn!(device = %address, "Device does not support art mode");
            return Ok(DeviceOutcome::Skipped);
        }

        let acquisition = match shared {
            Some(shared) => self.acquisition.acquire_shared(shared, scope)?,
            None => self.acquisition.acquire(selector, scope)?,
        };

        match acquisition {
            Acquisition::Cached {
                handle,
                display_url,
            } => {
                tracing::info!(device = %address, handle = %handle, url = %display_url, "Selecting existing image");
                apply_cosmetics(device.as_ref(), &handle, options);
                device.select_image(&handle, true)?;
                Ok(DeviceOutcome::Reused { handle })
            },
            Acquisition::Fresh(image) => {
                tracing::info!(device = %address, url = %image.display_url, "Uploading image");
                let handle = device.upload(
                    &image.normalized.bytes,
                    &image.normalized.encoding(),
                    MatteOption::None,
                )?;
                if handle.is_empty() {
                    return Err(Error::Device {
                        device: address.to_string(),
                        cause: "no handle returned from upload".to_string(),
                    });
                }
                if let Err(e) = self.acquisition.record_upload(&image, &handle, scope) {
                    tracing::error!(device = %address, handle = %handle, error = %e, "Upload not recorded");
                }
                apply_cosmetics(device.as_ref(), &handle, options);
                device.select_image(&handle, true)?;
                Ok(DeviceOutcome::Uploaded { handle })
            },
        }
    }
}

/// Applies filter and matte independently; failures are only logged.
fn apply_cosmetics(device: &dyn FrameDevice, handle: &str, options: &RunOptions) {
    if let Some(filter) = options.photo_filter {
        if let Err(e) = device.set_photo_filter(handle, filter) {
            tracing::warn!(device = %device.address(), filter = %filter, error = %e, "Photo filter not applied");
        }
    }
    if let Some(matte) = options.matte {
        if let Err(e) = device.change_matte(handle, matte) {
            tracing::warn!(device = %device.address(), matte = %matte, error = %e, "Matte not applied");
        }
    }
}
