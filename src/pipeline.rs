//! End-to-end compile: guards, asset stages, turn normalization, output.

use crate::assemble::{assemble, ArchiveShell, StyleBundle};
use crate::cache::{data_uri, AssetCache};
use crate::config::ArchiveConfig;
use crate::css::{CssAssetInliner, FONT_MIME};
use crate::dom::parse_to_dom;
use crate::error::ArchiveError;
use crate::extract::extract;
use crate::normalize::normalize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const SVG_MIME: &str = "image/svg+xml";
const SCRIPT_MIME: &str = "text/javascript";
const MONO_FONT_FAMILY: &str = "Google Sans Mono";

pub const FAVICON_FILE: &str = "favicon.svg";
pub const SPARKLE_FILE: &str = "sparkle.svg";
const BUILTIN_FAVICON: &str = include_str!("../static/favicon.svg");
const BUILTIN_SPARKLE: &str = include_str!("../static/sparkle.svg");

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompileReport {
    pub turns: usize,
    /// Network fetches; zero when every asset came from the cache.
    pub fetches: usize,
    pub warnings: usize,
}

/// Absolute form of `path`, following symlinks where the path (or at least its
/// parent) exists.
fn resolved(path: &Path) -> PathBuf {
    if let Ok(p) = path.canonicalize() {
        return p;
    }
    let abs = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    if let (Some(parent), Some(name)) = (abs.parent(), abs.file_name()) {
        if let Ok(parent) = parent.canonicalize() {
            return parent.join(name);
        }
    }
    abs
}

pub fn ensure_distinct_paths(input: &Path, output: &Path) -> Result<(), ArchiveError> {
    if resolved(input) == resolved(output) {
        return Err(ArchiveError::OutputCollision {
            path: output.to_path_buf(),
        });
    }
    Ok(())
}

fn read_input(path: &Path) -> Result<String, ArchiveError> {
    fs::read_to_string(path).map_err(|source| ArchiveError::InputMissing {
        path: path.to_path_buf(),
        source,
    })
}

/// Parses the transcript and renders every turn in document order.
pub fn render_turns(transcript: &str) -> Vec<String> {
    let dom = parse_to_dom(transcript);
    extract(&dom).map(|turn| normalize(&turn)).collect()
}

fn local_font_face(bytes: &[u8]) -> String {
    format!(
        "@font-face {{\n  font-family: '{MONO_FONT_FAMILY}';\n  font-style: normal;\n  font-weight: 400 700;\n  font-display: swap;\n  src: url('{}') format('woff2');\n}}",
        data_uri(FONT_MIME, bytes)
    )
}

struct Stages<'a> {
    cache: &'a AssetCache,
    inliner: CssAssetInliner<'a>,
    warnings: usize,
}

impl<'a> Stages<'a> {
    fn new(cache: &'a AssetCache) -> Self {
        Self {
            cache,
            inliner: CssAssetInliner::new(cache),
            warnings: 0,
        }
    }

    /// Fetches a remote stylesheet and inlines what it references. A stylesheet
    /// that cannot be fetched leaves its slot empty.
    async fn stylesheet(&mut self, what: &str, url: &str) -> String {
        info!(url, "resolving {what} stylesheet");
        let css = match self.cache.resolve_text(url).await {
            Ok(css) => css,
            Err(e) => {
                warn!("skipping {what} stylesheet: {e}");
                self.warnings += 1;
                return String::new();
            }
        };
        let inlined = self.inliner.inline(&css).await;
        debug!(
            embedded = inlined.embedded,
            failures = inlined.failures,
            "{what} stylesheet inlined"
        );
        self.warnings += inlined.failures;
        inlined.css
    }

    fn local_mono_font(&mut self, path: &Path) -> String {
        info!(path = %path.display(), "embedding local monospace font");
        match fs::read(path) {
            Ok(bytes) => local_font_face(&bytes),
            Err(e) => {
                warn!("cannot read monospace font {}: {e}", path.display());
                self.warnings += 1;
                String::new()
            }
        }
    }

    /// Seeds `name` into the cache directory if absent, then embeds whatever is
    /// there so users can swap in their own artwork.
    fn decorative_svg(&mut self, name: &str, builtin: &str) -> String {
        let path = self.cache.dir().join(name);
        if !path.exists() {
            if let Err(e) = fs::write(&path, builtin) {
                warn!("cannot seed {}: {e}", path.display());
                self.warnings += 1;
            }
        }
        match fs::read(&path) {
            Ok(bytes) => data_uri(SVG_MIME, &bytes),
            Err(e) => {
                warn!("cannot read {}, using built-in: {e}", path.display());
                self.warnings += 1;
                data_uri(SVG_MIME, builtin.as_bytes())
            }
        }
    }

    async fn math_script(&mut self, url: &str) -> Option<String> {
        info!(url, "resolving math script");
        match self.cache.resolve(url).await {
            Ok(asset) => Some(asset.data_uri(SCRIPT_MIME)),
            Err(e) => {
                warn!("math rendering disabled: {e}");
                self.warnings += 1;
                None
            }
        }
    }
}

fn write_output(path: &Path, document: &str) -> Result<(), ArchiveError> {
    let write_err = |source| ArchiveError::OutputWrite {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(write_err)?;
    }
    fs::write(path, document).map_err(write_err)
}

/// Compiles the transcript named by `config` into a single archive file.
///
/// Fatal errors are returned before the output is touched; asset failures
/// only degrade the result and are counted in the report.
pub async fn compile(config: &ArchiveConfig) -> Result<CompileReport, ArchiveError> {
    ensure_distinct_paths(&config.input, &config.output)?;
    let transcript = read_input(&config.input)?;
    let user_css = read_input(&config.stylesheet)?;
    let user_script = read_input(&config.script)?;

    let cache = AssetCache::new(&config.assets_dir, config.fetch_timeout)?;
    let mut stages = Stages::new(&cache);
    let res = &config.resources;

    let fonts = stages.stylesheet("font", &res.font_css).await;
    let mono_fonts = match &config.mono_font {
        Some(path) => stages.local_mono_font(path),
        None => stages.stylesheet("monospace font", &res.mono_font_css).await,
    };
    let icons = stages.stylesheet("icon", &res.icon_css).await;
    let favicon_data_uri = stages.decorative_svg(FAVICON_FILE, BUILTIN_FAVICON);
    let sparkle_data_uri = stages.decorative_svg(SPARKLE_FILE, BUILTIN_SPARKLE);
    let math_script_data_uri = stages.math_script(&res.math_script).await;
    let mut warnings = stages.warnings;

    info!(path = %config.input.display(), "normalizing conversation");
    let turns = render_turns(&transcript);
    if turns.is_empty() {
        warn!("no conversation turns found in {}", config.input.display());
        warnings += 1;
    }

    let shell = ArchiveShell {
        title: config.title.clone(),
        favicon_data_uri,
        styles: StyleBundle {
            fonts,
            mono_fonts,
            icons,
            user: user_css,
        },
        math_script_data_uri,
        sparkle_data_uri,
        user_script,
    };
    let document = assemble(&shell, &turns);
    write_output(&config.output, &document)?;
    info!(path = %config.output.display(), "archive written");

    Ok(CompileReport {
        turns: turns.len(),
        fetches: cache.fetch_count(),
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_file_through_different_spellings_collides() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("t.html");
        fs::write(&input, "<html></html>").unwrap();
        let dotted = dir.path().join(".").join("t.html");
        assert!(matches!(
            ensure_distinct_paths(&input, &dotted),
            Err(ArchiveError::OutputCollision { .. })
        ));
        assert!(ensure_distinct_paths(&input, &dir.path().join("out.html")).is_ok());
    }

    #[test]
    fn collision_detected_before_output_exists() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.html");
        assert!(ensure_distinct_paths(&missing, &missing).is_err());
    }

    #[test]
    fn renders_turns_in_document_order() {
        let html = r#"<body>
            <user-query><div class="query-content">one</div></user-query>
            <model-response><div class="markdown-content"><p>two</p></div></model-response>
            <user-query><div class="query-content">three</div></user-query>
        </body>"#;
        let turns = render_turns(html);
        assert_eq!(turns.len(), 3);
        assert!(turns[0].contains("message-row user") && turns[0].contains("one"));
        assert!(turns[1].contains("message-row model") && turns[1].contains("two"));
        assert!(turns[2].contains("three"));
    }

    #[test]
    fn local_font_face_embeds_woff2() {
        let css = local_font_face(b"abc");
        assert!(css.contains("font-family: 'Google Sans Mono'"));
        assert!(css.contains("font-weight: 400 700"));
        assert!(css.contains("url('data:font/woff2;base64,YWJj') format('woff2')"));
    }

    #[test]
    fn decorative_svg_prefers_user_copy() {
        let dir = tempfile::tempdir().unwrap();
        let cache = AssetCache::new(dir.path(), None).unwrap();
        fs::write(dir.path().join(SPARKLE_FILE), "<svg/>").unwrap();
        let mut stages = Stages::new(&cache);

        let sparkle = stages.decorative_svg(SPARKLE_FILE, BUILTIN_SPARKLE);
        assert_eq!(sparkle, data_uri(SVG_MIME, b"<svg/>"));

        let favicon = stages.decorative_svg(FAVICON_FILE, BUILTIN_FAVICON);
        assert_eq!(favicon, data_uri(SVG_MIME, BUILTIN_FAVICON.as_bytes()));
        assert!(dir.path().join(FAVICON_FILE).exists());
        assert_eq!(stages.warnings, 0);
    }
}
