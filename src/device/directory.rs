//! Filesystem-backed display.
//!
//! Layout under the connector root:
//!
//! ```text
//! <root>/<address>/MY_F0001.jpg
//! <root>/<address>/state.json
//! ```

use super::{DeviceConnector, FrameDevice};
use crate::models::{EncodingHint, MatteOption, PhotoFilter};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

const HANDLE_PREFIX: &str = "MY_F";
const STATE_FILE: &str = "state.json";

/// Selection and cosmetic state of a [`DirectoryDevice`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceState {
    /// Currently selected handle.
    pub selected: Option<String>,
    /// Whether the selected image is being shown.
    pub shown: bool,
    /// Photo filter per handle.
    #[serde(default)]
    pub photo_filters: BTreeMap<String, String>,
    /// Matte per handle.
    #[serde(default)]
    pub mattes: BTreeMap<String, String>,
}

/// A display mirrored into a local directory.
#[derive(Debug, Clone)]
pub struct DirectoryDevice {
    address: String,
    dir: PathBuf,
    art_mode: bool,
}

impl DirectoryDevice {
    /// Opens (creating if needed) the store for `address` under `root`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Device`] if the address is not a safe directory name
    /// or the directory cannot be created.
    pub fn open(root: &Path, address: &str) -> Result<Self> {
        if !is_safe_address(address) {
            return Err(Error::Device {
                device: address.to_string(),
                cause: "address is not usable as a directory name".to_string(),
            });
        }
        let dir = root.join(address);
        fs::create_dir_all(&dir).map_err(|e| Error::Device {
            device: address.to_string(),
            cause: format!("cannot create {}: {e}", dir.display()),
        })?;

        Ok(Self {
            address: address.to_string(),
            dir,
            art_mode: true,
        })
    }

    /// Marks the device as lacking art mode.
    #[must_use]
    pub const fn without_art_mode(mut self) -> Self {
        self.art_mode = false;
        self
    }

    /// Directory holding this device's images.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Reads the persisted selection/cosmetic state.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Device`] if the state file is unreadable.
    pub fn state(&self) -> Result<DeviceState> {
        let path = self.dir.join(STATE_FILE);
        if !path.exists() {
            return Ok(DeviceState::default());
        }
        let raw = fs::read_to_string(&path).map_err(|e| self.error(format!("read state: {e}")))?;
        serde_json::from_str(&raw).map_err(|e| self.error(format!("parse state: {e}")))
    }

    /// Lists the handles currently stored, in order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Device`] if the directory cannot be listed.
    pub fn handles(&self) -> Result<Vec<String>> {
        let entries = fs::read_dir(&self.dir).map_err(|e| self.error(format!("list: {e}")))?;
        let mut handles: Vec<String> = entries
            .filter_map(std::result::Result::ok)
            .filter_map(|e| {
                let path = e.path();
                let stem = path.file_stem()?.to_str()?;
                stem.starts_with(HANDLE_PREFIX).then(|| stem.to_string())
            })
            .collect();
        handles.sort();
        Ok(handles)
    }

    fn error(&self, cause: String) -> Error {
        Error::Device {
            device: self.address.clone(),
            cause,
        }
    }

    fn save_state(&self, state: &DeviceState) -> Result<()> {
        let json = serde_json::to_string_pretty(state)
            .map_err(|e| self.error(format!("serialize state: {e}")))?;
        fs::write(self.dir.join(STATE_FILE), json)
            .map_err(|e| self.error(format!("write state: {e}")))
    }

    fn update_state(&self, f: impl FnOnce(&mut DeviceState)) -> Result<()> {
        let mut state = self.state()?;
        f(&mut state);
        self.save_state(&state)
    }

    fn next_handle(&self) -> Result<String> {
        let next = self
            .handles()?
            .iter()
            .filter_map(|h| h.strip_prefix(HANDLE_PREFIX)?.parse::<u32>().ok())
            .max()
            .map_or(1, |n| n + 1);
        Ok(format!("{HANDLE_PREFIX}{next:04}"))
    }

    fn require_handle(&self, handle: &str) -> Result<()> {
        if self.handles()?.iter().any(|h| h == handle) {
            Ok(())
        } else {
            Err(self.error(format!("unknown image handle {handle}")))
        }
    }
}

impl FrameDevice for DirectoryDevice {
    fn address(&self) -> &str {
        &self.address
    }

    fn capability_supported(&self) -> Result<bool> {
        Ok(self.art_mode)
    }

    fn upload(&self, bytes: &[u8], encoding: &EncodingHint, matte: MatteOption) -> Result<String> {
        if bytes.is_empty() {
            return Err(self.error("refusing to upload an empty image".to_string()));
        }
        let handle = self.next_handle()?;
        let path = self.dir.join(format!("{handle}.{}", encoding.extension()));
        fs::write(&path, bytes).map_err(|e| self.error(format!("write {}: {e}", path.display())))?;
        self.update_state(|state| {
            state.mattes.insert(handle.clone(), matte.token());
        })?;

        tracing::debug!(device = %self.address, handle = %handle, bytes = bytes.len(), "Stored upload");
        Ok(handle)
    }

    fn select_image(&self, handle: &str, show: bool) -> Result<()> {
        self.require_handle(handle)?;
        self.update_state(|state| {
            state.selected = Some(handle.to_string());
            state.shown = show;
        })
    }

    fn set_photo_filter(&self, handle: &str, filter: PhotoFilter) -> Result<()> {
        self.require_handle(handle)?;
        self.update_state(|state| {
            state
                .photo_filters
                .insert(handle.to_string(), filter.as_str().to_string());
        })
    }

    fn change_matte(&self, handle: &str, matte: MatteOption) -> Result<()> {
        self.require_handle(handle)?;
        self.update_state(|state| {
            state.mattes.insert(handle.to_string(), matte.token());
        })
    }
}

/// Connector that opens [`DirectoryDevice`]s under one root.
#[derive(Debug, Clone)]
pub struct DirectoryConnector {
    root: PathBuf,
    without_art_mode: HashSet<String>,
}

impl DirectoryConnector {
    /// Creates a connector rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            without_art_mode: HashSet::new(),
        }
    }

    /// Makes the device at `address` report no art mode.
    #[must_use]
    pub fn without_art_mode(mut self, address: impl Into<String>) -> Self {
        self.without_art_mode.insert(address.into());
        self
    }

    /// Opens the concrete device for `address`.
    ///
    /// # Errors
    ///
    /// See [`DirectoryDevice::open`].
    pub fn open(&self, address: &str) -> Result<DirectoryDevice> {
        let device = DirectoryDevice::open(&self.root, address)?;
        Ok(if self.without_art_mode.contains(address) {
            device.without_art_mode()
        } else {
            device
        })
    }
}

impl DeviceConnector for DirectoryConnector {
    fn connect(&self, address: &str) -> Result<Box<dyn FrameDevice>> {
        Ok(Box::new(self.open(address)?))
    }
}

/// Only alphanumerics, dots, dashes, underscores and colons.
fn is_safe_address(address: &str) -> bool {
    !address.is_empty()
        && address != "."
        && address != ".."
        && address
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | ':'))
}
