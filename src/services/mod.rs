//! Business logic services.
//!
//! [`AcquisitionService`] decides per device whether an image must be
//! fetched; [`FrameService`] walks the device list and talks to each display.

mod acquisition;
mod frame;

pub use acquisition::{Acquisition, AcquisitionService, PreparedImage, SharedImage};
pub use frame::{DeviceOutcome, FrameService, RunOptions, RunSummary};
