//! Bing wallpaper archive.
//!
//! 4K archive images are served at `<base>/YYYY-MM-DD.jpg`. Without a
//! selector a date between the archive epoch and today is drawn uniformly.
//! The identity is the URL itself, so locating needs no network access.

use super::ImageResolver;
use crate::config::BingConfig;
use crate::http::HttpFetch;
use crate::models::{EncodingHint, ImageIdentifier, ImageLocation, ResolvedImage, SourceName};
use crate::{Error, Result};
use chrono::{Local, NaiveDate};
use std::sync::Arc;

/// Draws a uniformly random date in `[epoch, today]`.
///
/// If `today` is before `epoch` the epoch itself is returned.
#[must_use]
pub fn random_date(epoch: NaiveDate, today: NaiveDate) -> NaiveDate {
    let span = (today - epoch).num_days().max(0);
    let offset = rand::random_range(0..=span);
    epoch + chrono::Days::new(offset.unsigned_abs())
}

/// Resolver for the Bing wallpaper archive.
pub struct BingWallpaperSource {
    fetcher: Arc<dyn HttpFetch>,
    base_url: String,
    epoch: NaiveDate,
}

impl BingWallpaperSource {
    /// Creates a resolver from config.
    #[must_use]
    pub fn new(fetcher: Arc<dyn HttpFetch>, config: &BingConfig) -> Self {
        Self {
            fetcher,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            epoch: config.epoch,
        }
    }

    /// Returns the image URL for a date.
    #[must_use]
    pub fn url_for(&self, date: NaiveDate) -> String {
        format!("{}/{}.jpg", self.base_url, date.format("%Y-%m-%d"))
    }

    fn pick_date(&self, selector: Option<&str>) -> Result<NaiveDate> {
        let today = Local::now().date_naive();
        let Some(raw) = selector else {
            return Ok(random_date(self.epoch, today));
        };

        let date = NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|e| {
            Error::Resolution {
                subject: raw.to_string(),
                cause: format!("expected a YYYY-MM-DD date: {e}"),
            }
        })?;
        if date < self.epoch || date > today {
            return Err(Error::Resolution {
                subject: raw.to_string(),
                cause: format!("archive covers {} to {today}", self.epoch),
            });
        }
        Ok(date)
    }
}

impl ImageResolver for BingWallpaperSource {
    fn source(&self) -> SourceName {
        SourceName::BingWallpaper
    }

    fn locate(&self, selector: Option<&str>) -> Result<ImageLocation> {
        let date = self.pick_date(selector)?;
        let url = self.url_for(date);
        tracing::debug!(date = %date, url = %url, "Picked Bing wallpaper");

        Ok(ImageLocation {
            source: SourceName::BingWallpaper,
            identifier: ImageIdentifier::new(url.clone()),
            locator: url.clone(),
            display_url: url,
            deferred: false,
        })
    }

    fn fetch(&self, location: &ImageLocation) -> Result<ResolvedImage> {
        let response = self.fetcher.get(&location.locator, &[])?;
        if response.body.is_empty() {
            return Err(Error::Fetch {
                url: location.locator.clone(),
                cause: "empty body".to_string(),
            });
        }

        Ok(ResolvedImage {
            bytes: response.body,
            encoding: EncodingHint::Jpeg,
            identifier: location.identifier.clone(),
            display_url: location.display_url.clone(),
            source: SourceName::BingWallpaper,
        })
    }
}
