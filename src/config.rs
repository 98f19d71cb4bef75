use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_TITLE: &str = "Gemini Archive";
pub const DEFAULT_INPUT: &str = "transcript.html";
pub const DEFAULT_OUTPUT: &str = "archives/archive.html";
pub const DEFAULT_STYLESHEET: &str = "static/injectme.css";
pub const DEFAULT_SCRIPT: &str = "static/injectme.js";
pub const DEFAULT_ASSETS_DIR: &str = "assets";

/// Remote stylesheets and scripts embedded into every archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteResources {
    pub font_css: String,
    pub mono_font_css: String,
    pub icon_css: String,
    pub math_script: String,
}

impl Default for RemoteResources {
    fn default() -> Self {
        Self {
            font_css: "https://fonts.googleapis.com/css2?family=Google+Sans+Flex:opsz,wght@8..144,100..1000&display=swap"
                .to_string(),
            mono_font_css: "https://fonts.googleapis.com/css2?family=Google+Sans+Mono:wght@400;500;700&display=swap"
                .to_string(),
            icon_css: "https://fonts.googleapis.com/icon?family=Material+Icons".to_string(),
            math_script: "https://cdn.jsdelivr.net/npm/mathjax@4/tex-mml-chtml.js".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ArchiveConfig {
    pub title: String,
    pub input: PathBuf,
    pub output: PathBuf,
    /// Local woff2 used instead of the remote monospace stylesheet.
    pub mono_font: Option<PathBuf>,
    pub stylesheet: PathBuf,
    pub script: PathBuf,
    pub assets_dir: PathBuf,
    pub fetch_timeout: Option<Duration>,
    pub resources: RemoteResources,
}

impl ArchiveConfig {
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            ..Self::default()
        }
    }
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            input: PathBuf::from(DEFAULT_INPUT),
            output: PathBuf::from(DEFAULT_OUTPUT),
            mono_font: None,
            stylesheet: PathBuf::from(DEFAULT_STYLESHEET),
            script: PathBuf::from(DEFAULT_SCRIPT),
            assets_dir: PathBuf::from(DEFAULT_ASSETS_DIR),
            fetch_timeout: None,
            resources: RemoteResources::default(),
        }
    }
}
