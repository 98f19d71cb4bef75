//! On-disk asset store keyed by source URL.
//!
//! A cached file short-circuits the network entirely, so repeated runs over
//! the same cache directory fetch nothing. The store is append-only and not
//! locked; concurrent runs sharing one directory may race.

use crate::error::{ArchiveError, AssetError};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::Client;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

#[derive(Debug, Clone)]
pub struct Asset {
    pub source_url: Url,
    pub local_path: PathBuf,
    pub bytes: Vec<u8>,
    pub mime_hint: &'static str,
}

impl Asset {
    pub fn data_uri(&self, mime: &str) -> String {
        data_uri(mime, &self.bytes)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }
}

pub fn data_uri(mime: &str, bytes: &[u8]) -> String {
    format!("data:{mime};base64,{}", STANDARD.encode(bytes))
}

/// Turns a raw reference into an absolute http(s) URL. Quotes and surrounding
/// whitespace are stripped; protocol-relative references become `https:`.
pub fn normalize_reference(raw: &str) -> Result<Url, AssetError> {
    let cleaned = raw.trim().trim_matches(|c: char| c == '"' || c == '\'').trim();
    let absolute = match cleaned.strip_prefix("//") {
        Some(rest) => format!("https://{rest}"),
        None => cleaned.to_string(),
    };
    let url = Url::parse(&absolute).map_err(|e| AssetError::MalformedReference {
        reference: raw.to_string(),
        reason: e.to_string(),
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(AssetError::MalformedReference {
            reference: raw.to_string(),
            reason: format!("unsupported scheme `{other}`"),
        }),
    }
}

fn mime_hint(url: &Url) -> &'static str {
    let ext = url
        .path()
        .rsplit('/')
        .next()
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "woff2" => "font/woff2",
        "woff" => "font/woff",
        "ttf" => "font/ttf",
        "otf" => "font/otf",
        "css" => "text/css",
        "js" => "text/javascript",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        _ => "application/octet-stream",
    }
}

/// Cache file name for `url`: a digest of the full URL, so distinct query
/// strings never share a file, followed by a readable path basename.
pub fn cache_file_name(url: &Url) -> String {
    let digest = Sha256::digest(url.as_str().as_bytes());
    let short: String = digest.iter().take(8).map(|b| format!("{b:02x}")).collect();
    let base = url
        .path_segments()
        .and_then(|s| s.last())
        .filter(|s| !s.is_empty())
        .unwrap_or("asset");
    let base: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("{short}-{base}")
}

#[derive(Debug)]
pub struct AssetCache {
    dir: PathBuf,
    client: Client,
    fetches: AtomicUsize,
}

impl AssetCache {
    /// Opens (creating if absent) the cache directory.
    pub fn new(dir: impl Into<PathBuf>, timeout: Option<Duration>) -> Result<Self, ArchiveError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|source| ArchiveError::CacheDir {
            path: dir.clone(),
            source,
        })?;
        let mut builder = Client::builder().user_agent(BROWSER_USER_AGENT);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(ArchiveError::HttpClient)?;
        Ok(Self {
            dir,
            client,
            fetches: AtomicUsize::new(0),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Network fetches performed by this instance.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::Relaxed)
    }

    pub fn cache_path(&self, url: &Url) -> PathBuf {
        self.dir.join(cache_file_name(url))
    }

    pub async fn resolve(&self, reference: &str) -> Result<Asset, AssetError> {
        let url = normalize_reference(reference)?;
        self.resolve_url(&url).await
    }

    pub async fn resolve_text(&self, reference: &str) -> Result<String, AssetError> {
        Ok(self.resolve(reference).await?.text())
    }

    pub async fn resolve_url(&self, url: &Url) -> Result<Asset, AssetError> {
        let local_path = self.cache_path(url);
        let bytes = match tokio::fs::read(&local_path).await {
            Ok(bytes) => {
                debug!(url = %url, path = %local_path.display(), "asset cache hit");
                bytes
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let bytes = self.fetch(url).await?;
                self.store(&local_path, &bytes).await?;
                bytes
            }
            Err(source) => {
                return Err(AssetError::Io {
                    path: local_path,
                    source,
                })
            }
        };
        Ok(Asset {
            source_url: url.clone(),
            local_path,
            bytes,
            mime_hint: mime_hint(url),
        })
    }

    async fn fetch(&self, url: &Url) -> Result<Vec<u8>, AssetError> {
        info!(url = %url, "fetching asset");
        self.fetches.fetch_add(1, Ordering::Relaxed);
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|source| AssetError::Http {
                url: url.to_string(),
                source,
            })?;
        let status = response.status();
        if !status.is_success() {
            return Err(AssetError::Fetch {
                url: url.to_string(),
                status,
            });
        }
        let body = response.bytes().await.map_err(|source| AssetError::Http {
            url: url.to_string(),
            source,
        })?;
        Ok(body.to_vec())
    }

    /// Writes through a sibling temp file; an entry is either complete or absent.
    async fn store(&self, path: &Path, bytes: &[u8]) -> Result<(), AssetError> {
        let mut partial = path.as_os_str().to_owned();
        partial.push(".part");
        let partial = PathBuf::from(partial);
        tokio::fs::write(&partial, bytes)
            .await
            .map_err(|source| AssetError::Io {
                path: partial.clone(),
                source,
            })?;
        tokio::fs::rename(&partial, path)
            .await
            .map_err(|source| AssetError::Io {
                path: path.to_path_buf(),
                source,
            })
    }
}
