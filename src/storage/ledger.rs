//! Upload ledger.
//!
//! A JSON array of records, one per successful upload:
//!
//! ```json
//! [{"file": "https://bing.npanuhin.me/US/en/2023-05-01.jpg",
//!   "remote_filename": "MY_F0003", "tv_ip": null, "source": "bing_wallpaper"}]
//! ```
//!
//! `aliases` is written only when the image had more than one name and is
//! optional on read. The file is loaded once, kept in memory and rewritten
//! in full after every insert.

use crate::models::{ImageIdentifier, SourceName};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// One recorded upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Primary identifier of the uploaded image.
    #[serde(rename = "file")]
    pub identifier: String,
    /// Handle the device assigned to the upload.
    #[serde(rename = "remote_filename")]
    pub remote_handle: String,
    /// Device address, recorded only for multi-device runs.
    #[serde(rename = "tv_ip", default)]
    pub device_scope: Option<String>,
    /// Source the image came from.
    pub source: SourceName,
    /// Other names of the same image (display URL, slug, canonical page).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
}

impl LedgerEntry {
    /// Builds an entry from an image identity.
    ///
    /// The stored identifiers are the identifier's candidates plus the
    /// display URL.
    #[must_use]
    pub fn new(
        source: SourceName,
        identifier: &ImageIdentifier,
        display_url: &str,
        remote_handle: impl Into<String>,
        device_scope: Option<&str>,
    ) -> Self {
        let identifier = identifier.clone().with_alias(display_url);
        Self {
            identifier: identifier.primary().to_string(),
            remote_handle: remote_handle.into(),
            device_scope: device_scope.map(str::to_string),
            source,
            aliases: identifier.aliases().to_vec(),
        }
    }

    /// Iterates over every stored identifier.
    pub fn stored_identifiers(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.identifier.as_str()).chain(self.aliases.iter().map(String::as_str))
    }

    fn in_scope(&self, scope: Option<&str>) -> bool {
        match (scope, self.device_scope.as_deref()) {
            (None, _) | (_, None) => true,
            (Some(query), Some(stored)) => query == stored,
        }
    }

    fn overlaps(&self, candidates: &HashSet<&str>) -> bool {
        self.stored_identifiers().any(|id| candidates.contains(id))
    }
}

/// In-memory ledger snapshot backed by a JSON file.
#[derive(Debug, Default)]
pub struct Ledger {
    path: Option<PathBuf>,
    entries: Vec<LedgerEntry>,
}

impl Ledger {
    /// Loads the ledger at `path`; a missing file yields an empty ledger.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Ledger`] if the file exists but cannot be read or is
    /// not a valid ledger.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No ledger yet, starting empty");
            return Ok(Self {
                path: Some(path),
                entries: Vec::new(),
            });
        }

        let contents = fs::read_to_string(&path).map_err(|e| Error::Ledger {
            operation: "read".to_string(),
            cause: format!("{}: {e}", path.display()),
        })?;
        let entries: Vec<LedgerEntry> = if contents.trim().is_empty() {
            Vec::new()
        } else {
            serde_json::from_str(&contents).map_err(|e| Error::Ledger {
                operation: "parse".to_string(),
                cause: format!("{}: {e}", path.display()),
            })?
        };

        tracing::debug!(path = %path.display(), entries = entries.len(), "Loaded ledger");
        Ok(Self {
            path: Some(path),
            entries,
        })
    }

    /// Creates a ledger that is never written to disk.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Returns the backing file, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Returns all entries in insertion order.
    #[must_use]
    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Finds the handle of a previous upload of the same image.
    ///
    /// An entry matches when its source equals `source`, any stored
    /// identifier equals any candidate and, if `scope` is given, the entry is
    /// either unscoped or recorded for that same device. Callers pass a
    /// scope only for runs that target more than one device. The first
    /// matching entry wins.
    pub fn lookup<'c>(
        &self,
        source: SourceName,
        candidates: impl IntoIterator<Item = &'c str>,
        scope: Option<&str>,
    ) -> Option<&str> {
        let candidates: HashSet<&str> = candidates.into_iter().collect();
        self.entries
            .iter()
            .find(|e| e.source == source && e.in_scope(scope) && e.overlaps(&candidates))
            .map(|e| e.remote_handle.as_str())
    }

    /// Appends an entry and rewrites the backing file.
    ///
    /// An entry whose identifiers overlap an existing entry of the same
    /// source and device scope is not appended again.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Ledger`] if the file cannot be rewritten. The entry
    /// stays in memory in that case.
    pub fn insert(&mut self, entry: LedgerEntry) -> Result<()> {
        let candidates: HashSet<&str> = entry.stored_identifiers().collect();
        let duplicate = self.entries.iter().any(|e| {
            e.source == entry.source
                && e.device_scope == entry.device_scope
                && e.overlaps(&candidates)
        });
        if duplicate {
            tracing::debug!(
                identifier = %entry.identifier,
                source = %entry.source,
                "Image already recorded for this device scope"
            );
            return Ok(());
        }

        tracing::debug!(
            identifier = %entry.identifier,
            handle = %entry.remote_handle,
            device = entry.device_scope.as_deref().unwrap_or("-"),
            "Recording upload"
        );
        self.entries.push(entry);
        self.persist()
    }

    /// Rewrites the whole file through a sibling temp file.
    fn persist(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let write_error = |e: std::io::Error| Error::Ledger {
            operation: "write".to_string(),
            cause: format!("{}: {e}", path.display()),
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(write_error)?;
        }
        let json = serde_json::to_string_pretty(&self.entries).map_err(|e| Error::Ledger {
            operation: "serialize".to_string(),
            cause: e.to_string(),
        })?;

        let mut tmp = path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        fs::write(&tmp, json).map_err(write_error)?;
        fs::rename(&tmp, path).map_err(write_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn entry(id: &str, display: &str, handle: &str, scope: Option<&str>) -> LedgerEntry {
        LedgerEntry::new(
            SourceName::BingWallpaper,
            &ImageIdentifier::new(id),
            display,
            handle,
            scope,
        )
    }

    #[test]
    fn test_alias_union() {
        let mut ledger = Ledger::in_memory();
        ledger.insert(entry("A", "B", "MY_F1", None)).unwrap();

        assert_eq!(
            ledger.lookup(SourceName::BingWallpaper, ["B"], None),
            Some("MY_F1")
        );
        assert_eq!(
            ledger.lookup(SourceName::BingWallpaper, ["A"], None),
            Some("MY_F1")
        );
        assert_eq!(ledger.lookup(SourceName::BingWallpaper, ["C"], None), None);
    }

    #[test]
    fn test_source_must_match() {
        let mut ledger = Ledger::in_memory();
        ledger.insert(entry("A", "A", "MY_F1", None)).unwrap();
        assert_eq!(ledger.lookup(SourceName::LocalImage, ["A"], None), None);
    }

    #[test]
    fn test_scope_isolation() {
        let mut ledger = Ledger::in_memory();
        ledger
            .insert(entry("scoped", "scoped", "MY_F1", Some("10.0.0.5")))
            .unwrap();
        ledger
            .insert(entry("unscoped", "unscoped", "MY_F2", None))
            .unwrap();

        let source = SourceName::BingWallpaper;
        assert_eq!(ledger.lookup(source, ["scoped"], Some("10.0.0.5")), Some("MY_F1"));
        assert_eq!(ledger.lookup(source, ["scoped"], Some("10.0.0.6")), None);
        // Single-device runs never compare scope.
        assert_eq!(ledger.lookup(source, ["scoped"], None), Some("MY_F1"));
        assert_eq!(ledger.lookup(source, ["unscoped"], Some("10.0.0.6")), Some("MY_F2"));
    }

    #[test]
    fn test_duplicate_in_same_scope_not_appended() {
        let mut ledger = Ledger::in_memory();
        ledger.insert(entry("A", "B", "MY_F1", Some("d1"))).unwrap();
        ledger.insert(entry("B", "B", "MY_F9", Some("d1"))).unwrap();
        ledger.insert(entry("A", "B", "MY_F2", Some("d2"))).unwrap();
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let ledger = Ledger::load(dir.path().join("uploaded_files.json")).unwrap();
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_reads_legacy_format() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("uploaded_files.json");
        fs::write(
            &path,
            r#"[{"file": "C:/pics/a.jpg", "remote_filename": "MY_F0001", "tv_ip": null, "source": "local_image"},
                {"file": "https://x/1.jpg", "remote_filename": "MY_F0002", "tv_ip": "10.0.0.5", "source": "bing_wallpaper"}]"#,
        )
        .unwrap();

        let ledger = Ledger::load(&path).unwrap();
        assert_eq!(ledger.len(), 2);
        assert_eq!(
            ledger.lookup(SourceName::LocalImage, ["C:/pics/a.jpg"], None),
            Some("MY_F0001")
        );
        assert_eq!(ledger.entries()[1].device_scope.as_deref(), Some("10.0.0.5"));
        assert!(ledger.entries()[0].aliases.is_empty());
    }

    #[test]
    fn test_insert_rewrites_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state").join("ledger.json");

        let mut ledger = Ledger::load(&path).unwrap();
        ledger
            .insert(entry("https://x/1.jpg", "https://x/1.jpg", "MY_F1", None))
            .unwrap();
        ledger
            .insert(entry("id-2", "https://x/2", "MY_F2", Some("10.0.0.6")))
            .unwrap();

        let reloaded = Ledger::load(&path).unwrap();
        assert_eq!(reloaded.entries(), ledger.entries());
        assert!(!path.with_extension("json.tmp").exists());

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"remote_filename\": \"MY_F2\""));
        assert!(raw.contains("\"tv_ip\": null"));
    }

    #[test]
    fn test_corrupt_file_is_ledger_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ledger.json");
        fs::write(&path, "{not json").unwrap();
        assert!(matches!(Ledger::load(&path), Err(Error::Ledger { .. })));
    }
}
