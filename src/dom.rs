//! Helpers over the `markup5ever_rcdom` tree: parsing, element predicates,
//! ordered element location and the owned output tree the normalizer emits.

use crate::escape::{esc_attr, esc_text};
use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use markup5ever_rcdom::{Handle, NodeData, RcDom};
use std::rc::Rc;

pub fn parse_to_dom(input: &str) -> RcDom {
    parse_document(RcDom::default(), Default::default()).one(input)
}

pub fn elem_tag_lower(h: &Handle) -> Option<String> {
    match &h.data {
        NodeData::Element { name, .. } => Some(name.local.to_string().to_ascii_lowercase()),
        _ => None,
    }
}

pub fn attrs_of(h: &Handle) -> Vec<(String, String)> {
    match &h.data {
        NodeData::Element { attrs, .. } => attrs
            .borrow()
            .iter()
            .map(|a| (a.name.local.to_string(), a.value.to_string()))
            .collect(),
        _ => Vec::new(),
    }
}

pub fn attr_value(h: &Handle, name: &str) -> Option<String> {
    match &h.data {
        NodeData::Element { attrs, .. } => attrs
            .borrow()
            .iter()
            .find(|a| a.name.local.as_ref().eq_ignore_ascii_case(name))
            .map(|a| a.value.to_string()),
        _ => None,
    }
}

pub fn has_class(h: &Handle, class: &str) -> bool {
    attr_value(h, "class")
        .map(|c| c.split_whitespace().any(|x| x == class))
        .unwrap_or(false)
}

/// Concatenated text of every descendant text node.
pub fn text_content(h: &Handle) -> String {
    fn walk(node: &Handle, out: &mut String) {
        if let NodeData::Text { contents } = &node.data {
            out.push_str(&contents.borrow());
        }
        for c in node.children.borrow().iter() {
            walk(c, out);
        }
    }
    let mut out = String::new();
    walk(h, &mut out);
    out
}

/// First descendant of `scope` (in document order, `scope` excluded) for which
/// `pred` holds.
pub fn find_descendant<F>(scope: &Handle, pred: &F) -> Option<Handle>
where
    F: Fn(&Handle) -> bool,
{
    find_descendant_skipping(scope, pred, None)
}

/// Like [`find_descendant`], but never enters the `skip` subtree.
pub fn find_descendant_skipping<F>(scope: &Handle, pred: &F, skip: Option<&Handle>) -> Option<Handle>
where
    F: Fn(&Handle) -> bool,
{
    for c in scope.children.borrow().iter() {
        if skip.is_some_and(|s| Rc::ptr_eq(s, c)) {
            continue;
        }
        if pred(c) {
            return Some(c.clone());
        }
        if let Some(x) = find_descendant_skipping(c, pred, skip) {
            return Some(x);
        }
    }
    None
}

#[cfg(test)]
pub(crate) fn find_body(dom: &RcDom) -> Option<Handle> {
    fn find_elem(node: &Handle, name: &str) -> Option<Handle> {
        if let NodeData::Element { name: q, .. } = &node.data {
            if q.local.to_string().eq_ignore_ascii_case(name) {
                return Some(node.clone());
            }
        }
        for c in node.children.borrow().iter() {
            if let Some(x) = find_elem(c, name) {
                return Some(x);
            }
        }
        None
    }
    find_elem(&dom.document, "body")
}

/// A structural predicate over one element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Matcher {
    Tag(&'static str),
    Class(&'static str),
    TagWithClass(&'static str, &'static str),
}

impl Matcher {
    pub fn matches(&self, node: &Handle) -> bool {
        let Some(tag) = elem_tag_lower(node) else {
            return false;
        };
        match *self {
            Matcher::Tag(t) => tag == t,
            Matcher::Class(c) => has_class(node, c),
            Matcher::TagWithClass(t, c) => tag == t && has_class(node, c),
        }
    }
}

pub fn matches_any(rules: &[Matcher], node: &Handle) -> bool {
    rules.iter().any(|m| m.matches(node))
}

/// Ordered fallback list of matchers. The first matcher that finds any
/// descendant wins, regardless of where later matchers would have matched.
#[derive(Debug, Clone, Copy)]
pub struct Locator {
    matchers: &'static [Matcher],
}

impl Locator {
    pub const fn new(matchers: &'static [Matcher]) -> Self {
        Self { matchers }
    }

    pub fn locate(&self, scope: &Handle) -> Option<Handle> {
        self.locate_skipping(scope, None)
    }

    pub fn locate_skipping(&self, scope: &Handle, skip: Option<&Handle>) -> Option<Handle> {
        self.matchers
            .iter()
            .find_map(|m| find_descendant_skipping(scope, &|n: &Handle| m.matches(n), skip))
    }

    pub fn locate_or_self(&self, scope: &Handle) -> Handle {
        self.locate(scope).unwrap_or_else(|| scope.clone())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum OutNode {
    Element {
        tag: String,
        attrs: Vec<(String, String)>,
        children: Vec<OutNode>,
    },
    Text(String),
}

impl OutNode {
    pub fn element(tag: &str, attrs: &[(&str, &str)], children: Vec<OutNode>) -> Self {
        OutNode::Element {
            tag: tag.to_string(),
            attrs: attrs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            children,
        }
    }

    pub fn text(s: impl Into<String>) -> Self {
        OutNode::Text(s.into())
    }
}

fn is_void(tag: &str) -> bool {
    matches!(
        tag.to_ascii_lowercase().as_str(),
        "area" | "br" | "col" | "embed" | "hr" | "img" | "input" | "link" | "meta" | "source" | "track" | "wbr"
    )
}

fn serialize_node(out: &mut String, n: &OutNode) {
    match n {
        OutNode::Text(t) => out.push_str(&esc_text(t)),
        OutNode::Element { tag, attrs, children } => {
            out.push('<');
            out.push_str(tag);
            for (k, v) in attrs {
                out.push(' ');
                out.push_str(k);
                out.push_str("=\"");
                out.push_str(&esc_attr(v));
                out.push('"');
            }
            if is_void(tag) {
                out.push_str("/>");
                return;
            }
            out.push('>');
            for c in children {
                serialize_node(out, c);
            }
            out.push_str("</");
            out.push_str(tag);
            out.push('>');
        }
    }
}

pub fn serialize_nodes(nodes: &[OutNode]) -> String {
    let mut out = String::new();
    for n in nodes {
        serialize_node(&mut out, n);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONTENT: Locator = Locator::new(&[Matcher::Class("first"), Matcher::Class("second")]);

    #[test]
    fn locator_prefers_earlier_matcher_over_document_order() {
        let dom = parse_to_dom(r#"<div id="root"><p class="second">b</p><p class="first">a</p></div>"#);
        let body = find_body(&dom).unwrap();
        let found = CONTENT.locate(&body).unwrap();
        assert_eq!(text_content(&found), "a");
    }

    #[test]
    fn locator_falls_back_to_scope() {
        let dom = parse_to_dom("<div>plain</div>");
        let body = find_body(&dom).unwrap();
        let found = CONTENT.locate_or_self(&body);
        assert!(std::rc::Rc::ptr_eq(&found, &body));
    }

    #[test]
    fn matcher_checks_whole_class_tokens() {
        let dom = parse_to_dom(r#"<span class="math-inline-ish x">1</span>"#);
        let body = find_body(&dom).unwrap();
        let span = find_descendant(&body, &|n: &Handle| elem_tag_lower(n).as_deref() == Some("span")).unwrap();
        assert!(!Matcher::Class("math-inline").matches(&span));
        assert!(Matcher::TagWithClass("span", "x").matches(&span));
    }

    #[test]
    fn attribute_lookup_ignores_name_case() {
        let dom = parse_to_dom(r#"<div data-math="x^2" class="a b">1</div>"#);
        let body = find_body(&dom).unwrap();
        let div = find_descendant(&body, &|n: &Handle| elem_tag_lower(n).as_deref() == Some("div")).unwrap();
        assert_eq!(attr_value(&div, "DATA-MATH").as_deref(), Some("x^2"));
        assert_eq!(attr_value(&div, "class").as_deref(), Some("a b"));
        assert_eq!(attr_value(&div, "id"), None);
        assert!(has_class(&div, "b"));
    }

    #[test]
    fn serializes_void_and_escapes() {
        let nodes = vec![OutNode::element(
            "p",
            &[("title", "a\"b")],
            vec![OutNode::text("1 < 2"), OutNode::element("br", &[], Vec::new())],
        )];
        assert_eq!(serialize_nodes(&nodes), r#"<p title="a&quot;b">1 &lt; 2<br/></p>"#);
    }
}
