//! Download client for the Kenneth French data library.

use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use zip::ZipArchive;

use crate::error::{DataError, Result};
use crate::source::{FactorTableSource, Frequency};

/// Public FTP mirror of the data library.
pub const FRENCH_LIBRARY_BASE_URL: &str =
    "https://mba.tuck.dartmouth.edu/pages/faculty/ken.french/ftp";

const USER_AGENT: &str = concat!("ff5/", env!("CARGO_PKG_VERSION"));

/// Dataset file stem for the five-factor (2x3) data at `frequency`.
pub const fn dataset_name(frequency: Frequency) -> &'static str {
    match frequency {
        Frequency::Daily => "F-F_Research_Data_5_Factors_2x3_daily",
        Frequency::Monthly => "F-F_Research_Data_5_Factors_2x3",
    }
}

/// Settings for [`FrenchLibraryClient`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrenchLibraryConfig {
    /// Base URL the dataset archives live under
    pub base_url: String,
    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for FrenchLibraryConfig {
    fn default() -> Self {
        Self {
            base_url: FRENCH_LIBRARY_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Fetches the zipped five-factor CSV files over HTTP.
#[derive(Debug, Clone)]
pub struct FrenchLibraryClient {
    client: reqwest::Client,
    base_url: String,
}

impl FrenchLibraryClient {
    /// Create a client with the default configuration.
    pub fn new() -> Result<Self> {
        Self::with_config(FrenchLibraryConfig::default())
    }

    /// Create a client with an explicit configuration.
    pub fn with_config(config: FrenchLibraryConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.timeout)
            .build()
            .map_err(DataError::Network)?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// URL of the zipped dataset at `frequency`.
    pub fn dataset_url(&self, frequency: Frequency) -> String {
        format!("{}/{}_CSV.zip", self.base_url, dataset_name(frequency))
    }

    /// Download and unpack the dataset at `frequency`.
    pub async fn download(&self, frequency: Frequency) -> Result<String> {
        let url = self.dataset_url(frequency);
        debug!(%url, "downloading factor dataset");

        let response = self.client.get(&url).send().await.map_err(DataError::Network)?;

        if !response.status().is_success() {
            return Err(DataError::Http {
                status: response.status().as_u16(),
                url,
            });
        }

        let bytes = response.bytes().await.map_err(DataError::Network)?;
        let text = extract_csv(&bytes)?;
        info!(%frequency, bytes = bytes.len(), "downloaded factor dataset");
        Ok(text)
    }
}

impl FactorTableSource for FrenchLibraryClient {
    fn dataset_id(&self, frequency: Frequency) -> String {
        format!("french:{}", dataset_name(frequency))
    }

    async fn fetch_factor_csv(&self, frequency: Frequency) -> Result<String> {
        self.download(frequency).await
    }
}

/// A factor file already on disk, either the CSV itself or the zip archive.
#[derive(Debug, Clone)]
pub struct FactorFile {
    path: PathBuf,
}

impl FactorFile {
    /// Wrap a path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The wrapped path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the CSV text, unpacking a zip archive when needed.
    pub fn read(&self) -> Result<String> {
        let bytes = std::fs::read(&self.path)?;
        let is_zip = self
            .path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("zip"));
        if is_zip { extract_csv(&bytes) } else { Ok(String::from_utf8_lossy(&bytes).into_owned()) }
    }
}

impl FactorTableSource for FactorFile {
    fn dataset_id(&self, frequency: Frequency) -> String {
        format!("file:{}:{frequency}", self.path.display())
    }

    async fn fetch_factor_csv(&self, _frequency: Frequency) -> Result<String> {
        self.read()
    }
}

/// Text of the first `.csv` entry in a zip archive.
pub fn extract_csv(bytes: &[u8]) -> Result<String> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        if !entry.name().to_ascii_lowercase().ends_with(".csv") {
            continue;
        }
        let mut raw = Vec::new();
        entry.read_to_end(&mut raw)?;
        // The library's files are plain ASCII; tolerate stray Latin-1 bytes.
        return Ok(String::from_utf8_lossy(&raw).into_owned());
    }
    Err(DataError::Schema("archive contains no CSV file".to_string()))
}
