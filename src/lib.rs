//! Compiles a scraped chat transcript into one self-contained HTML archive.
//!
//! Remote fonts, icons and the math script are fetched once into an on-disk
//! cache and embedded as data URIs; each conversation turn is rebuilt into a
//! small, framework-free markup shape.

pub mod assemble;
pub mod cache;
pub mod code;
pub mod config;
pub mod css;
pub mod dom;
pub mod error;
pub mod escape;
pub mod extract;
pub mod math;
pub mod normalize;
pub mod pipeline;

pub use assemble::{assemble, ArchiveShell, StyleBundle};
pub use cache::{Asset, AssetCache};
pub use code::{language_label, CodeBlock};
pub use config::{ArchiveConfig, RemoteResources};
pub use css::{CssAssetInliner, InlinedCss};
pub use error::{ArchiveError, AssetError};
pub use extract::{extract, ConversationTurn};
pub use math::{MathKind, MathSegment};
pub use normalize::normalize;
pub use pipeline::{compile, render_turns, CompileReport};
