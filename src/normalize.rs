//! Rewrites each extracted turn into the archive's uniform markup.
//!
//! Model turns go through a single [`Cleaner`] pass that applies the rule
//! tables below: framework attributes are dropped by prefix, chrome elements
//! are removed, math elements become delimited TeX text and fenced code is
//! rebuilt as a `code-wrapper` block. User turns are flattened to plain text.

use crate::code::{label_from_class, language_label, CodeBlock};
use crate::dom::{
    attr_value, attrs_of, elem_tag_lower, find_descendant, matches_any, serialize_nodes, text_content,
    Matcher, OutNode,
};
use crate::escape::escape_html;
use crate::extract::{ConversationTurn, ModelTurn, UserTurn, THOUGHT_CONTENT};
use crate::math::MathSegment;
use lazy_static::lazy_static;
use markup5ever_rcdom::{Handle, NodeData};
use regex::Regex;
use std::rc::Rc;
use tracing::debug;

lazy_static! {
    static ref EXCESS_NEWLINES: Regex = Regex::new(r"\n{3,}").expect("newline run pattern");
}

/// Attribute name prefixes injected by the chat frontend's framework.
const FRAMEWORK_ATTR_PREFIXES: &[&str] = &["_ng", "ng-", "js"];

/// Elements removed with their whole subtree. Controls are regenerated by
/// the output templates.
const DROPPED_ELEMENTS: &[Matcher] = &[
    Matcher::Tag("button"),
    Matcher::Tag("mat-icon"),
    Matcher::Tag("message-actions"),
    Matcher::Tag("freemium-rag-disclaimer"),
    Matcher::Tag("sensitive-memories-banner"),
    Matcher::Tag("hallucination-disclaimer"),
    Matcher::TagWithClass("div", "table-footer"),
    Matcher::Class("response-footer"),
    Matcher::Class("response-container-footer"),
    Matcher::Class("restart-chat-button-scroll-placeholder"),
    Matcher::TagWithClass("div", "code-block-decoration"),
    Matcher::Tag("script"),
    Matcher::Tag("style"),
    Matcher::Tag("noscript"),
    Matcher::Tag("iframe"),
    Matcher::Tag("template"),
];

const CODE_CONTAINER: Matcher = Matcher::Tag("code-block");
const CODE_DECORATION: Matcher = Matcher::Class("code-block-decoration");

/// Block-level tags that start a new line when a user turn is flattened.
const LINE_BREAKING_TAGS: &[&str] = &["br", "div", "p"];

fn is_framework_attr(name: &str) -> bool {
    FRAMEWORK_ATTR_PREFIXES.iter().any(|p| name.starts_with(p))
}

fn is_tag(node: &Handle, tag: &str) -> bool {
    elem_tag_lower(node).as_deref() == Some(tag)
}

struct Cleaner<'a> {
    skip: Option<&'a Handle>,
}

impl Cleaner<'_> {
    fn children(&self, node: &Handle) -> Vec<OutNode> {
        let mut out = Vec::new();
        for c in node.children.borrow().iter() {
            out.extend(self.node(c));
        }
        out
    }

    fn node(&self, node: &Handle) -> Vec<OutNode> {
        match &node.data {
            NodeData::Text { contents } => vec![OutNode::Text(contents.borrow().to_string())],
            NodeData::Element { .. } => self.element(node),
            NodeData::Document => self.children(node),
            NodeData::Comment { .. } | NodeData::Doctype { .. } | NodeData::ProcessingInstruction { .. } => {
                Vec::new()
            }
        }
    }

    fn element(&self, node: &Handle) -> Vec<OutNode> {
        if self.skip.is_some_and(|s| Rc::ptr_eq(s, node)) {
            return Vec::new();
        }
        if let Some(seg) = MathSegment::detect(node) {
            return vec![OutNode::Text(seg.render())];
        }
        if matches_any(DROPPED_ELEMENTS, node) {
            return Vec::new();
        }
        if CODE_CONTAINER.matches(node) {
            return self.code_container(node).into_iter().collect();
        }

        let tag = elem_tag_lower(node).unwrap_or_default();
        if tag == "pre" {
            return vec![self.code_block(node, None).into_node()];
        }

        let attrs = attrs_of(node)
            .into_iter()
            .filter(|(k, _)| !is_framework_attr(k))
            .collect();
        vec![OutNode::Element {
            tag,
            attrs,
            children: self.children(node),
        }]
    }

    /// A recognized fence container becomes a code wrapper, or nothing when it
    /// holds no `<pre>`.
    fn code_container(&self, node: &Handle) -> Option<OutNode> {
        let label = find_descendant(node, &|n: &Handle| {
            CODE_DECORATION.matches(n) && find_descendant(n, &|s: &Handle| is_tag(s, "span")).is_some()
        })
        .and_then(|dec| find_descendant(&dec, &|s: &Handle| is_tag(s, "span")))
        .map(|span| text_content(&span).trim().to_string())
        .filter(|l| !l.is_empty());

        let pre = find_descendant(node, &|n: &Handle| is_tag(n, "pre"))?;
        Some(self.code_block(&pre, label).into_node())
    }

    fn code_block(&self, pre: &Handle, label: Option<String>) -> CodeBlock {
        let code = find_descendant(pre, &|n: &Handle| is_tag(n, "code"));
        let language_label = match label {
            Some(l) => language_label(Some(&l)),
            None => {
                let class = code
                    .as_ref()
                    .and_then(|c| attr_value(c, "class"))
                    .filter(|c| c.contains("language-"))
                    .or_else(|| attr_value(pre, "class"));
                label_from_class(class.as_deref())
            }
        };
        let code = match &code {
            Some(c) => self.children(c),
            None => self.children(pre),
        };
        CodeBlock { language_label, code }
    }
}

fn flatten_text(scope: &Handle) -> String {
    fn walk(node: &Handle, out: &mut String, is_scope: bool) {
        match &node.data {
            NodeData::Text { contents } => out.push_str(&contents.borrow()),
            NodeData::Element { .. } => {
                if !is_scope {
                    if let Some(seg) = MathSegment::detect(node) {
                        out.push_str(&seg.render());
                        return;
                    }
                    if matches_any(DROPPED_ELEMENTS, node) {
                        return;
                    }
                    if elem_tag_lower(node).is_some_and(|t| LINE_BREAKING_TAGS.contains(&t.as_str())) {
                        out.push('\n');
                    }
                }
                for c in node.children.borrow().iter() {
                    walk(c, out, false);
                }
            }
            NodeData::Document => {
                for c in node.children.borrow().iter() {
                    walk(c, out, false);
                }
            }
            _ => {}
        }
    }

    let mut out = String::new();
    walk(scope, &mut out, true);
    EXCESS_NEWLINES.replace_all(out.trim(), "\n\n").into_owned()
}

pub fn normalize_user(turn: &UserTurn) -> String {
    let text = flatten_text(&turn.content);
    format!(
        r#"<div class="message-row user"><div class="user-bubble expanded"><div class="bubble-content">{}</div><div class="bubble-controls"><button class="toggle-btn" title="Toggle Expand"><span class="material-icons">unfold_less</span></button><button class="user-copy-btn" title="Copy"><span class="material-icons">content_copy</span></button></div></div></div>"#,
        escape_html(&text)
    )
}

/// Inner markup of the thinking section, or `None` when it has no content.
fn thought_markup(thought: &Handle) -> Option<String> {
    let scope = THOUGHT_CONTENT.locate_or_self(thought);
    let html = serialize_nodes(&Cleaner { skip: None }.children(&scope));
    if html.trim().is_empty() {
        None
    } else {
        Some(html)
    }
}

pub fn normalize_model(turn: &ModelTurn) -> String {
    let thought = turn
        .thought
        .as_ref()
        .and_then(thought_markup)
        .map(|html| {
            format!(
                r#"<div class="thought-block collapsed"><div class="thought-header"><span class="material-icons icon">auto_awesome</span><span class="label">Show thinking</span><span class="material-icons toggle">expand_more</span></div><div class="thought-content">{html}</div></div>"#
            )
        })
        .unwrap_or_default();

    let cleaner = Cleaner {
        skip: turn.thought.as_ref(),
    };
    let body = serialize_nodes(&cleaner.children(&turn.body));
    format!(
        r#"<div class="message-row model"><div class="message-body">{thought}<div class="markdown-body">{body}</div></div></div>"#
    )
}

pub fn normalize(turn: &ConversationTurn) -> String {
    match turn {
        ConversationTurn::User(u) => {
            debug!("normalizing user turn");
            normalize_user(u)
        }
        ConversationTurn::Model(m) => {
            debug!(has_thought = m.thought.is_some(), "normalizing model turn");
            normalize_model(m)
        }
    }
}
