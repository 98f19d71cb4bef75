use crate::dom::{attr_value, matches_any, Matcher};
use markup5ever_rcdom::Handle;

/// Attribute carrying the raw TeX source of a rendered formula.
pub const RAW_MATH_ATTR: &str = "data-math";

const INLINE_MATH: &[Matcher] = &[Matcher::TagWithClass("span", "math-inline")];
const BLOCK_MATH: &[Matcher] = &[
    Matcher::TagWithClass("div", "math-block"),
    Matcher::Class("math-display"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MathKind {
    Inline,
    Block,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MathSegment {
    pub kind: MathKind,
    pub raw_tex: String,
}

impl MathSegment {
    /// Recognizes a rendered formula element. Elements without a non-empty
    /// raw TeX attribute are left to the caller untouched.
    pub fn detect(node: &Handle) -> Option<Self> {
        let kind = if matches_any(INLINE_MATH, node) {
            MathKind::Inline
        } else if matches_any(BLOCK_MATH, node) {
            MathKind::Block
        } else {
            return None;
        };
        let raw_tex = attr_value(node, RAW_MATH_ATTR).filter(|t| !t.is_empty())?;
        Some(Self { kind, raw_tex })
    }

    /// Delimited TeX source, unescaped.
    pub fn render(&self) -> String {
        match self.kind {
            MathKind::Inline => format!("\\({}\\)", self.raw_tex),
            MathKind::Block => format!("$${}$$", self.raw_tex),
        }
    }
}
