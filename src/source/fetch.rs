// sheetsync/src/source/fetch.rs
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use crate::errors::Result;

pub const SPREADSHEET_BASE_URL: &str = "https://docs.google.com/spreadsheets/d/";

/// Builds the CSV export URL for a published Google spreadsheet.
pub fn export_url(spreadsheet_id: &str) -> String {
    format!("{}{}/export?format=csv", SPREADSHEET_BASE_URL, spreadsheet_id)
}

/// File-backed cache for the fetched document: one path, one expiry.
/// A cache file younger than the TTL is served without a network call.
pub struct FileCache {
    path: PathBuf,
    ttl: Duration,
}

impl FileCache {
    pub fn new(path: PathBuf, ttl_secs: u64) -> Self {
        FileCache {
            path,
            ttl: Duration::from_secs(ttl_secs),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the cached body if the file exists and is still fresh.
    pub fn read_fresh(&self) -> Result<Option<String>> {
        let metadata = match fs::metadata(&self.path) {
            Ok(m) => m,
            Err(_) => return Ok(None),
        };
        let modified = metadata.modified()?;
        let age = SystemTime::now()
            .duration_since(modified)
            .unwrap_or(Duration::ZERO);
        if age < self.ttl {
            Ok(Some(fs::read_to_string(&self.path)?))
        } else {
            Ok(None)
        }
    }

    pub fn write(&self, body: &str) -> Result<()> {
        fs::write(&self.path, body)?;
        Ok(())
    }
}

/// Downloads the published spreadsheet as CSV, through the file cache.
pub struct SheetFetcher {
    client: reqwest::Client,
}

impl SheetFetcher {
    pub fn new() -> Self {
        SheetFetcher {
            client: reqwest::Client::new(),
        }
    }

    pub async fn fetch_csv(&self, spreadsheet_id: &str, cache: &FileCache) -> Result<String> {
        if let Some(body) = cache.read_fresh()? {
            println!("📄 Using cached spreadsheet: {}", cache.path().display());
            return Ok(body);
        }

        let url = export_url(spreadsheet_id);
        println!("⬇️ Downloading spreadsheet from {} ...", url);
        let response = self.client.get(&url).send().await?.error_for_status()?;
        let body = response.text().await?;
        cache.write(&body)?;
        Ok(body)
    }
}

impl Default for SheetFetcher {
    fn default() -> Self {
        Self::new()
    }
}
