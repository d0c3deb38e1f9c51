//! Strict accessors over a parsed HTML tree.
//!
//! Every accessor looks at direct children only and fails with
//! [`AppError::Structure`] instead of returning an empty value. The portal
//! nests its markup at fixed depths, so a deep search would hide layout
//! drift that should stop extraction at the exact node where it happened.

use scraper::{ElementRef, Node};

use crate::error::{AppError, Result};

/// Direct child elements of `node`, in document order.
pub fn child_elements<'a>(node: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> {
    node.children().filter_map(ElementRef::wrap)
}

/// Direct child elements of `node` with the given tag name.
pub fn children_by_tag<'a>(
    node: ElementRef<'a>,
    tag: &'a str,
) -> impl Iterator<Item = ElementRef<'a>> {
    child_elements(node).filter(move |el| el.value().name() == tag)
}

/// First direct child element with the given tag name.
pub fn child_by_tag<'a>(node: ElementRef<'a>, tag: &str) -> Result<ElementRef<'a>> {
    child_elements(node)
        .find(|el| el.value().name() == tag)
        .ok_or_else(|| {
            AppError::structure(format!(
                "missing tag <{tag}> under <{}>",
                node.value().name()
            ))
        })
}

/// First direct child element whose `id` attribute matches.
pub fn child_by_id<'a>(node: ElementRef<'a>, id: &str) -> Result<ElementRef<'a>> {
    child_elements(node)
        .find(|el| el.value().id() == Some(id))
        .ok_or_else(|| {
            AppError::structure(format!(
                "missing element #{id} under <{}>",
                node.value().name()
            ))
        })
}

/// Pre-order search for the first `tag` element carrying `id`, starting at `root`.
pub fn find_by_id<'a>(root: ElementRef<'a>, tag: &str, id: &str) -> Option<ElementRef<'a>> {
    root.descendants()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == tag && el.value().id() == Some(id))
}

/// Required attribute value.
pub fn required_attr<'a>(node: ElementRef<'a>, name: &str) -> Result<&'a str> {
    node.value().attr(name).ok_or_else(|| {
        AppError::structure(format!(
            "missing attribute {name:?} on <{}>",
            node.value().name()
        ))
    })
}

/// Text of a node whose only child is a single text node.
pub fn required_text(node: ElementRef<'_>) -> Result<String> {
    let mut children = node.children();
    let tag = node.value().name();

    let only = match (children.next(), children.next()) {
        (Some(only), None) => only,
        (None, _) => {
            return Err(AppError::structure(format!("<{tag}> has no text")));
        }
        (Some(_), Some(_)) => {
            return Err(AppError::structure(format!(
                "<{tag}> has more than one child, expected plain text"
            )));
        }
    };

    match only.value() {
        Node::Text(text) => Ok(text.to_string()),
        other => Err(AppError::structure(format!(
            "<{tag}> holds {} instead of text",
            describe(other)
        ))),
    }
}

/// Concatenated text of a node made of text nodes and `<br>` elements.
///
/// Each `<br>` becomes `\n`; any other child kind is an error.
pub fn mixed_text(node: ElementRef<'_>) -> Result<String> {
    let mut out = String::new();
    for child in node.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(el) if el.name() == "br" => out.push('\n'),
            other => {
                return Err(AppError::structure(format!(
                    "unexpected {} inside <{}>",
                    describe(other),
                    node.value().name()
                )));
            }
        }
    }
    Ok(out)
}

pub(crate) fn describe(node: &Node) -> String {
    match node {
        Node::Text(_) => "text".to_string(),
        Node::Element(el) => format!("<{}>", el.name()),
        Node::Comment(_) => "comment".to_string(),
        _ => "non-element node".to_string(),
    }
}
