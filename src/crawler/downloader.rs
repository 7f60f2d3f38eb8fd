//! Product image download
//!
//! Images are saved under the catalog's image directory. File names come
//! from a SHA-256 of the image URL, so a rerun finds files already on disk
//! and never fetches them twice.

use reqwest::Client;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

/// Extension used when the image URL path has none
const DEFAULT_EXTENSION: &str = "jpg";

/// Hex digits of the URL digest kept in the file name
const NAME_DIGITS: usize = 16;

/// Why an image could not be saved
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("invalid image URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {0}")]
    Status(u16),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// File name an image URL is saved under
///
/// ```
/// use catalog_scraper::crawler::image_file_name;
/// use url::Url;
///
/// let url = Url::parse("https://cdn.example.com/products/1/banjo.JPG?c=2").unwrap();
/// let name = image_file_name(&url);
/// assert!(name.ends_with(".jpg"));
/// assert_eq!(name.len(), 16 + 4);
/// ```
pub fn image_file_name(image_url: &Url) -> String {
    let digest = hex::encode(Sha256::digest(image_url.as_str().as_bytes()));
    let extension = Path::new(image_url.path())
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty() && e.len() <= 5 && e.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(str::to_ascii_lowercase)
        .unwrap_or_else(|| DEFAULT_EXTENSION.to_string());

    format!("{}.{}", &digest[..NAME_DIGITS], extension)
}

/// Saves product images with the crawl's HTTP client
pub struct ImageDownloader {
    client: Client,
    directory: PathBuf,
    per_product: usize,
}

impl ImageDownloader {
    pub fn new(client: Client, directory: PathBuf, per_product: usize) -> Self {
        Self {
            client,
            directory,
            per_product,
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Most images saved for one product
    pub fn per_product(&self) -> usize {
        self.per_product
    }

    /// Where an image URL is saved
    pub fn local_path(&self, image_url: &str) -> Result<PathBuf, DownloadError> {
        let url = Url::parse(image_url)?;
        Ok(self.directory.join(image_file_name(&url)))
    }

    /// Fetches one image and writes it to `path`
    ///
    /// The body goes to a `.part` sibling first and is renamed into place, so
    /// an interrupted download never leaves a truncated image under the final
    /// name.
    pub async fn save(&self, image_url: &str, path: &Path) -> Result<(), DownloadError> {
        let url = Url::parse(image_url)?;
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::Status(status.as_u16()));
        }

        let bytes = response.bytes().await?;

        tokio::fs::create_dir_all(&self.directory).await?;
        let partial = path.with_extension("part");
        tokio::fs::write(&partial, &bytes).await?;
        tokio::fs::rename(&partial, path).await?;

        tracing::debug!("Saved {} ({} bytes)", path.display(), bytes.len());
        Ok(())
    }
}
