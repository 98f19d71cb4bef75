use crate::dom::OutNode;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref LANGUAGE_CLASS: Regex = Regex::new(r"language-(\w+)").expect("language class pattern");
}

pub const DEFAULT_LABEL: &str = "Code";

/// A reconstructed fenced block: display label plus the code's inner markup.
#[derive(Debug, Clone, PartialEq)]
pub struct CodeBlock {
    pub language_label: String,
    pub code: Vec<OutNode>,
}

/// Maps a raw language hint to its display label.
pub fn language_label(hint: Option<&str>) -> String {
    let Some(hint) = hint.map(str::trim).filter(|h| !h.is_empty()) else {
        return DEFAULT_LABEL.to_string();
    };
    match hint.to_ascii_lowercase().as_str() {
        "c" | "cpp" => "C".to_string(),
        "python" => "Python".to_string(),
        _ => {
            let mut chars = hint.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => DEFAULT_LABEL.to_string(),
            }
        }
    }
}

/// Label for a `class="language-X"` attribute value.
pub fn label_from_class(class: Option<&str>) -> String {
    let hint = class
        .and_then(|c| LANGUAGE_CLASS.captures(c))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str());
    language_label(hint)
}

impl CodeBlock {
    pub fn into_node(self) -> OutNode {
        let header = OutNode::element(
            "div",
            &[("class", "code-header")],
            vec![
                OutNode::element("span", &[("class", "lang-label")], vec![OutNode::text(self.language_label)]),
                OutNode::element(
                    "button",
                    &[("class", "copy-btn")],
                    vec![OutNode::element(
                        "span",
                        &[("class", "material-icons")],
                        vec![OutNode::text("content_copy")],
                    )],
                ),
            ],
        );
        let body = OutNode::element("pre", &[], vec![OutNode::element("code", &[], self.code)]);
        OutNode::element("div", &[("class", "code-wrapper")], vec![header, body])
    }
}
