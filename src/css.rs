//! Stylesheet `url(...)` inlining.

use crate::cache::{normalize_reference, AssetCache};
use crate::error::AssetError;
use futures_util::future::join_all;
use lazy_static::lazy_static;
use regex::{Captures, Regex};
use std::collections::{HashMap, HashSet};
use tracing::warn;
use url::Url;

lazy_static! {
    static ref CSS_URL: Regex = Regex::new(r"url\(([^)]+)\)").expect("css url pattern");
}

/// Every stylesheet this pipeline inlines serves fonts.
pub const FONT_MIME: &str = "font/woff2";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InlinedCss {
    pub css: String,
    /// Distinct URLs replaced by data URIs.
    pub embedded: usize,
    /// Distinct references left pointing at their remote source.
    pub failures: usize,
}

/// Distinct references of a stylesheet in first-occurrence order.
#[derive(Debug, Default)]
pub struct References {
    pub urls: Vec<Url>,
    pub malformed: Vec<AssetError>,
}

fn is_embedded(raw: &str) -> bool {
    raw.trim()
        .trim_start_matches(|c: char| c == '"' || c == '\'')
        .trim_start()
        .to_ascii_lowercase()
        .starts_with("data:")
}

pub fn references(css: &str) -> References {
    let mut refs = References::default();
    let mut seen_urls = HashSet::new();
    let mut seen_bad = HashSet::new();
    for cap in CSS_URL.captures_iter(css) {
        let raw = &cap[1];
        if is_embedded(raw) {
            continue;
        }
        match normalize_reference(raw) {
            Ok(url) => {
                if seen_urls.insert(url.as_str().to_string()) {
                    refs.urls.push(url);
                }
            }
            Err(e) => {
                if seen_bad.insert(raw.to_string()) {
                    refs.malformed.push(e);
                }
            }
        }
    }
    refs
}

/// Replaces each `url(...)` whose normalized URL has an entry in
/// `replacements`; anything else is kept byte for byte.
pub fn rewrite(css: &str, replacements: &HashMap<String, String>) -> String {
    CSS_URL
        .replace_all(css, |cap: &Captures| {
            normalize_reference(&cap[1])
                .ok()
                .and_then(|url| replacements.get(url.as_str()))
                .map(|data| format!("url('{data}')"))
                .unwrap_or_else(|| cap[0].to_string())
        })
        .into_owned()
}

pub struct CssAssetInliner<'a> {
    cache: &'a AssetCache,
}

impl<'a> CssAssetInliner<'a> {
    pub fn new(cache: &'a AssetCache) -> Self {
        Self { cache }
    }

    /// Resolves every distinct reference concurrently, then rewrites the
    /// stylesheet. Failed references stay remote and are reported.
    pub async fn inline(&self, css: &str) -> InlinedCss {
        let refs = references(css);
        let mut failures = refs.malformed.len();
        for e in &refs.malformed {
            warn!("{e}");
        }

        let results = join_all(refs.urls.iter().map(|url| async move {
            (url, self.cache.resolve_url(url).await)
        }))
        .await;

        let mut replacements = HashMap::new();
        for (url, result) in results {
            match result {
                Ok(asset) => {
                    replacements.insert(url.as_str().to_string(), asset.data_uri(FONT_MIME));
                }
                Err(e) => {
                    warn!("failed to download asset: {e}");
                    failures += 1;
                }
            }
        }

        InlinedCss {
            css: rewrite(css, &replacements),
            embedded: replacements.len(),
            failures,
        }
    }
}
