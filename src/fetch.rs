//! Resolving named data files to local paths, downloading them when needed.
//!
//! Files live flat inside a data directory. A file that is already there is
//! used as-is (after a checksum check when one is registered), otherwise it
//! is downloaded from `base_url` joined with the file name.

use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use sha2::{Digest, Sha256};

use crate::error::{Result, ShiftError};

pub const DEFAULT_BASE_URL: &str = "https://raw.githubusercontent.com/nipraxis/nipraxis-data/0.5/";
pub const DEFAULT_DATA_DIR: &str = "data";

const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(300);

/// A file that can be fetched by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataFile {
    pub name: &'static str,
    pub description: &'static str,
    /// Expected SHA-256 of the file contents, hex encoded.
    pub sha256: Option<&'static str>,
}

static REGISTRY: &[DataFile] = &[DataFile {
    name: "ds108_sub001_t1r1.nii",
    description: "OpenFMRI ds108 subject 1, task 1 run 1 functional series",
    sha256: None,
}];

pub fn registered_files() -> &'static [DataFile] {
    REGISTRY
}

pub fn lookup(name: &str) -> Result<&'static DataFile> {
    REGISTRY
        .iter()
        .find(|f| f.name == name)
        .ok_or_else(|| ShiftError::UnknownDataFile(name.to_string()))
}

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub data_dir: PathBuf,
    pub base_url: String,
    /// Download again even if the file is already present.
    pub force: bool,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            base_url: DEFAULT_BASE_URL.to_string(),
            force: false,
        }
    }
}

pub struct DataFetcher {
    config: FetchConfig,
}

impl DataFetcher {
    pub fn new(config: FetchConfig) -> Self {
        Self { config }
    }

    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    /// Returns the local path of a registered data file, downloading it first
    /// if it is not in the data directory yet.
    pub fn fetch_file(&self, name: &str) -> Result<PathBuf> {
        let file = lookup(name)?;
        let path = self.config.data_dir.join(file.name);

        if path.exists() && !self.config.force {
            if let Some(expected) = file.sha256 {
                verify(file.name, &fs::read(&path)?, expected)?;
            }
            info!("Using cached {}", path.display());
            return Ok(path);
        }

        fs::create_dir_all(&self.config.data_dir)?;
        let url = self.url_for(file.name);
        info!("Downloading {} from {}", file.name, url);
        let data = download_with_progress(&url)?;

        match file.sha256 {
            Some(expected) => {
                verify(file.name, &data, expected)?;
                info!("Hash verified for {}", file.name);
            }
            None => warn!("No checksum registered for {}, not verified", file.name),
        }

        write_atomically(&path, &data)?;
        info!("Saved {}", path.display());
        Ok(path)
    }

    fn url_for(&self, name: &str) -> String {
        let base = self.config.base_url.trim_end_matches('/');
        format!("{base}/{name}")
    }
}

/// Writes `data` next to `path` and renames it into place, so an interrupted
/// download never looks like a cached file. The partial file is removed
/// again when any step fails.
fn write_atomically(path: &Path, data: &[u8]) -> Result<()> {
    let partial = path.with_extension("part");
    let written = fs::File::create(&partial)
        .and_then(|mut out| {
            out.write_all(data)?;
            out.sync_all()
        })
        .and_then(|_| fs::rename(&partial, path));
    if let Err(err) = written {
        fs::remove_file(&partial).ok();
        return Err(err.into());
    }
    Ok(())
}

fn verify(name: &str, data: &[u8], expected: &str) -> Result<()> {
    let actual = hex::encode(Sha256::digest(data));
    if !actual.eq_ignore_ascii_case(expected) {
        return Err(ShiftError::ChecksumMismatch {
            name: name.to_string(),
            expected: expected.to_string(),
            actual,
        });
    }
    Ok(())
}

fn download_with_progress(url: &str) -> Result<Vec<u8>> {
    let download_err = |source: reqwest::Error| ShiftError::Download {
        url: url.to_string(),
        source,
    };
    let client = reqwest::blocking::Client::builder()
        .timeout(DOWNLOAD_TIMEOUT)
        .build()
        .map_err(download_err)?;
    let mut response = client
        .get(url)
        .send()
        .and_then(|r| r.error_for_status())
        .map_err(download_err)?;

    let total_size = response.content_length().unwrap_or(0);
    let pb = ProgressBar::new(total_size);
    if let Ok(style) = ProgressStyle::default_bar().template(
        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})",
    ) {
        pb.set_style(style.progress_chars("#>-"));
    }

    let mut data = Vec::with_capacity(total_size as usize);
    let mut buffer = [0u8; 8192];
    loop {
        let bytes_read = response.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        data.extend_from_slice(&buffer[..bytes_read]);
        pb.inc(bytes_read as u64);
    }
    pb.finish_with_message("Download complete");
    Ok(data)
}
