//! Node collection along each axis.
//!
//! Every function returns nodes in axis order: document order for forward
//! axes, nearest-first for reverse axes. Predicates count positions in that
//! order.

use crate::ast::Axis;
use crate::node::{DocumentNode, NodeType};

pub fn collect<'a, N: DocumentNode<'a>>(axis: Axis, node: N) -> Vec<N> {
    match axis {
        Axis::Child => node.children().collect(),
        Axis::Attribute => node.attributes().collect(),
        Axis::Descendant => descendants(node),
        Axis::DescendantOrSelf => {
            let mut nodes = vec![node];
            nodes.extend(descendants(node));
            nodes
        }
        Axis::Parent => node.parent().into_iter().collect(),
        Axis::Ancestor => ancestors(node),
        Axis::AncestorOrSelf => {
            let mut nodes = vec![node];
            nodes.extend(ancestors(node));
            nodes
        }
        Axis::SelfAxis => vec![node],
        Axis::FollowingSibling => following_siblings(node),
        Axis::PrecedingSibling => preceding_siblings(node),
        Axis::Following => following(node),
        Axis::Preceding => preceding(node),
    }
}

fn push_descendants<'a, N: DocumentNode<'a>>(node: N, out: &mut Vec<N>) {
    for child in node.children() {
        out.push(child);
        push_descendants(child, out);
    }
}

pub fn descendants<'a, N: DocumentNode<'a>>(node: N) -> Vec<N> {
    let mut out = Vec::new();
    push_descendants(node, &mut out);
    out
}

pub fn ancestors<'a, N: DocumentNode<'a>>(node: N) -> Vec<N> {
    let mut out = Vec::new();
    let mut current = node.parent();
    while let Some(p) = current {
        out.push(p);
        current = p.parent();
    }
    out
}

fn is_attribute<'a, N: DocumentNode<'a>>(node: N) -> bool {
    node.node_type() == NodeType::Attribute
}

pub fn following_siblings<'a, N: DocumentNode<'a>>(node: N) -> Vec<N> {
    match node.parent() {
        Some(parent) if !is_attribute(node) => {
            parent.children().skip_while(|s| *s != node).skip(1).collect()
        }
        _ => vec![],
    }
}

pub fn preceding_siblings<'a, N: DocumentNode<'a>>(node: N) -> Vec<N> {
    match node.parent() {
        Some(parent) if !is_attribute(node) => {
            let mut siblings: Vec<N> = parent.children().take_while(|s| *s != node).collect();
            siblings.reverse();
            siblings
        }
        _ => vec![],
    }
}

pub fn following<'a, N: DocumentNode<'a>>(node: N) -> Vec<N> {
    let mut out = Vec::new();
    // An attribute is followed by the content of its owner element.
    let mut current = if is_attribute(node) {
        let owner = node.parent();
        if let Some(owner) = owner {
            push_descendants(owner, &mut out);
        }
        owner
    } else {
        Some(node)
    };
    while let Some(c) = current {
        for sibling in following_siblings(c) {
            out.push(sibling);
            push_descendants(sibling, &mut out);
        }
        current = c.parent();
    }
    out
}

pub fn preceding<'a, N: DocumentNode<'a>>(node: N) -> Vec<N> {
    let start = if is_attribute(node) {
        node.parent()
    } else {
        Some(node)
    };
    let mut out = Vec::new();
    let mut current = start;
    while let Some(c) = current {
        for sibling in preceding_siblings(c) {
            let mut subtree = vec![sibling];
            push_descendants(sibling, &mut subtree);
            out.extend(subtree.into_iter().rev());
        }
        current = c.parent();
    }
    out
}
