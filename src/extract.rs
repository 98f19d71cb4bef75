//! Conversation turn discovery over the raw transcript document.

use crate::dom::{elem_tag_lower, Locator, Matcher};
use markup5ever_rcdom::{Handle, RcDom};

pub const USER_TURN_TAG: &str = "user-query";
pub const MODEL_TURN_TAG: &str = "model-response";

pub const USER_CONTENT: Locator = Locator::new(&[
    Matcher::Class("query-content"),
    Matcher::Class("user-query-text"),
    Matcher::Class("ry3kXd"),
]);

pub const MODEL_THOUGHTS: Locator = Locator::new(&[
    Matcher::Tag("model-thoughts"),
    Matcher::Class("model-thoughts"),
    Matcher::Class("thought-process"),
]);

pub const THOUGHT_CONTENT: Locator = Locator::new(&[
    Matcher::Class("thoughts-content"),
    Matcher::Class("content"),
]);

pub const MODEL_CONTENT: Locator = Locator::new(&[
    Matcher::Class("model-response-text"),
    Matcher::Class("markdown-content"),
    Matcher::Class("message-content"),
]);

#[derive(Debug, Clone)]
pub struct UserTurn {
    pub fragment: Handle,
    /// Most specific content element, or the turn root.
    pub content: Handle,
}

#[derive(Debug, Clone)]
pub struct ModelTurn {
    pub fragment: Handle,
    pub thought: Option<Handle>,
    /// Primary answer element, or the turn root.
    pub body: Handle,
}

#[derive(Debug, Clone)]
pub enum ConversationTurn {
    User(UserTurn),
    Model(ModelTurn),
}

impl ConversationTurn {
    fn from_element(node: &Handle) -> Option<Self> {
        match elem_tag_lower(node)?.as_str() {
            USER_TURN_TAG => Some(ConversationTurn::User(UserTurn {
                fragment: node.clone(),
                content: USER_CONTENT.locate_or_self(node),
            })),
            MODEL_TURN_TAG => {
                let thought = MODEL_THOUGHTS.locate(node);
                let body = MODEL_CONTENT
                    .locate_skipping(node, thought.as_ref())
                    .unwrap_or_else(|| node.clone());
                Some(ConversationTurn::Model(ModelTurn {
                    fragment: node.clone(),
                    thought,
                    body,
                }))
            }
            _ => None,
        }
    }
}

/// One-shot, document-ordered walk yielding every turn element. A turn's own
/// subtree is not searched for further turns.
pub struct Turns {
    stack: Vec<Handle>,
}

impl Iterator for Turns {
    type Item = ConversationTurn;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(node) = self.stack.pop() {
            if let Some(turn) = ConversationTurn::from_element(&node) {
                return Some(turn);
            }
            self.stack.extend(node.children.borrow().iter().rev().cloned());
        }
        None
    }
}

pub fn extract(dom: &RcDom) -> Turns {
    Turns {
        stack: vec![dom.document.clone()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{parse_to_dom, text_content};

    fn kinds(html: &str) -> Vec<String> {
        let dom = parse_to_dom(html);
        extract(&dom)
            .map(|t| match t {
                ConversationTurn::User(u) => format!("U:{}", text_content(&u.content).trim()),
                ConversationTurn::Model(m) => format!("M:{}", text_content(&m.body).trim()),
            })
            .collect()
    }

    #[test]
    fn keeps_document_order_for_any_interleaving() {
        let html = r#"
            <div><user-query>one</user-query></div>
            <model-response>two</model-response>
            <model-response>three</model-response>
            <section><div><user-query>four</user-query></div></section>
            <model-response>five</model-response>"#;
        assert_eq!(kinds(html), vec!["U:one", "M:two", "M:three", "U:four", "M:five"]);
    }

    #[test]
    fn empty_document_yields_nothing() {
        assert!(kinds("<p>no turns here</p>").is_empty());
    }

    #[test]
    fn locates_content_and_thoughts() {
        let html = r#"<model-response>
            <model-thoughts><div class="message-content">thinking</div></model-thoughts>
            <div class="markdown-content">answer</div>
        </model-response>"#;
        let dom = parse_to_dom(html);
        let turn = extract(&dom).next().unwrap();
        let ConversationTurn::Model(m) = turn else {
            panic!("expected model turn");
        };
        assert!(m.thought.is_some());
        assert_eq!(text_content(&m.body).trim(), "answer");
    }

    #[test]
    fn user_content_falls_back_to_root() {
        let dom = parse_to_dom("<user-query><span>hi</span></user-query>");
        let Some(ConversationTurn::User(u)) = extract(&dom).next() else {
            panic!("expected user turn");
        };
        assert!(std::rc::Rc::ptr_eq(&u.content, &u.fragment));
    }
}
