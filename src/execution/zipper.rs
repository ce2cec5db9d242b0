//! Zippers over the persistent result tree
//!
//! A [`NodeZipper`] focuses one node and remembers the way up to the root as
//! `(parent, child index)` breadcrumbs. Replacing the focused node and
//! rebuilding only copies the ancestors; every other subtree is shared with
//! the previous tree.
//!
//! A [`NodeMultiZipper`] holds many zippers into the same root, so that a
//! whole frontier of replacements is applied with one bottom-up rebuild.

use indexmap::IndexMap;
use std::sync::Arc;

use super::{ExecutionResultNode, NodeRef};

/// One step up from a focused node
#[derive(Debug, Clone)]
pub struct Breadcrumb {
    /// The parent node
    pub node: NodeRef,
    /// Position of the focused child among the parent's children
    pub index: usize,
}

/// A focused node plus its ancestor chain, immediate parent first
#[derive(Debug, Clone)]
pub struct NodeZipper {
    current: NodeRef,
    breadcrumbs: Vec<Breadcrumb>,
}

impl NodeZipper {
    pub fn new(current: NodeRef, breadcrumbs: Vec<Breadcrumb>) -> Self {
        Self {
            current,
            breadcrumbs,
        }
    }

    pub fn current(&self) -> &NodeRef {
        &self.current
    }

    pub fn breadcrumbs(&self) -> &[Breadcrumb] {
        &self.breadcrumbs
    }

    /// The same position holding another node
    pub fn with_new_node(&self, node: NodeRef) -> NodeZipper {
        NodeZipper {
            current: node,
            breadcrumbs: self.breadcrumbs.clone(),
        }
    }

    /// The root the breadcrumbs lead to
    pub fn root(&self) -> &NodeRef {
        self.breadcrumbs
            .last()
            .map(|crumb| &crumb.node)
            .unwrap_or(&self.current)
    }

    /// Child indices from the root down to the focused node
    pub fn index_path(&self) -> Vec<usize> {
        self.breadcrumbs.iter().rev().map(|crumb| crumb.index).collect()
    }

    /// Rebuild the root with the focused node in place
    pub fn to_root_node(&self) -> NodeRef {
        let mut node = self.current.clone();
        for crumb in &self.breadcrumbs {
            let mut children = crumb.node.children().to_vec();
            children[crumb.index] = node;
            node = Arc::new(crumb.node.with_new_children(children));
        }
        node
    }

    fn parent_position(&self) -> Vec<usize> {
        let mut path = self.index_path();
        path.pop();
        path
    }
}

/// Zippers that share one root
///
/// No zipper may focus a descendant of another zipper's node.
#[derive(Debug, Clone)]
pub struct NodeMultiZipper {
    common_root: NodeRef,
    zippers: Vec<NodeZipper>,
}

impl NodeMultiZipper {
    /// # Panics
    ///
    /// When a zipper does not lead to `common_root`.
    pub fn new(common_root: NodeRef, zippers: Vec<NodeZipper>) -> Self {
        for zipper in &zippers {
            assert!(
                Arc::ptr_eq(zipper.root(), &common_root),
                "all zippers of a multi zipper must share the same root"
            );
        }
        Self {
            common_root,
            zippers,
        }
    }

    /// Zippers on every node matching `predicate`, in depth-first order
    ///
    /// Matching nodes are not searched further.
    pub fn focus<P>(root: &NodeRef, predicate: P) -> Self
    where
        P: Fn(&ExecutionResultNode) -> bool,
    {
        let mut zippers = Vec::new();
        let mut trail = Vec::new();
        collect_matching(root, &predicate, &mut trail, &mut zippers);
        Self {
            common_root: root.clone(),
            zippers,
        }
    }

    pub fn zippers(&self) -> &[NodeZipper] {
        &self.zippers
    }

    pub fn common_root(&self) -> &NodeRef {
        &self.common_root
    }

    pub fn len(&self) -> usize {
        self.zippers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zippers.is_empty()
    }

    /// Replace the focused nodes, one new node per zipper in zipper order
    ///
    /// # Panics
    ///
    /// When the number of nodes differs from the number of zippers.
    pub fn with_replaced_zippers(&self, nodes: Vec<NodeRef>) -> NodeMultiZipper {
        assert_eq!(
            nodes.len(),
            self.zippers.len(),
            "one replacement node is needed per zipper"
        );
        NodeMultiZipper {
            common_root: self.common_root.clone(),
            zippers: self
                .zippers
                .iter()
                .zip(nodes)
                .map(|(zipper, node)| zipper.with_new_node(node))
                .collect(),
        }
    }

    /// Rebuild the root with every focused node in place
    ///
    /// Works bottom-up: the deepest zippers are grouped by parent, each
    /// parent is rebuilt once and becomes a zipper one level higher.
    pub fn to_root_node(&self) -> NodeRef {
        if self.zippers.is_empty() {
            return self.common_root.clone();
        }

        let mut current = self.zippers.clone();
        loop {
            let depth = current
                .iter()
                .map(|zipper| zipper.breadcrumbs.len())
                .max()
                .unwrap_or(0);
            if depth == 0 {
                debug_assert_eq!(current.len(), 1, "nested zippers at the root");
                return current.swap_remove(0).current;
            }

            let (deepest, mut rest): (Vec<_>, Vec<_>) = current
                .into_iter()
                .partition(|zipper| zipper.breadcrumbs.len() == depth);

            let mut by_parent: IndexMap<Vec<usize>, Vec<NodeZipper>> = IndexMap::new();
            for zipper in deepest {
                by_parent
                    .entry(zipper.parent_position())
                    .or_default()
                    .push(zipper);
            }

            for (_, siblings) in by_parent {
                let parent_crumb = &siblings[0].breadcrumbs[0];
                let mut children = parent_crumb.node.children().to_vec();
                for sibling in &siblings {
                    children[sibling.breadcrumbs[0].index] = sibling.current.clone();
                }
                let new_parent = Arc::new(parent_crumb.node.with_new_children(children));
                rest.push(NodeZipper {
                    current: new_parent,
                    breadcrumbs: siblings[0].breadcrumbs[1..].to_vec(),
                });
            }
            current = rest;
        }
    }
}

fn collect_matching<P>(
    node: &NodeRef,
    predicate: &P,
    trail: &mut Vec<Breadcrumb>,
    zippers: &mut Vec<NodeZipper>,
) where
    P: Fn(&ExecutionResultNode) -> bool,
{
    if predicate(node.as_ref()) {
        zippers.push(NodeZipper::new(
            node.clone(),
            trail.iter().rev().cloned().collect(),
        ));
        return;
    }
    for (index, child) in node.children().iter().enumerate() {
        trail.push(Breadcrumb {
            node: node.clone(),
            index,
        });
        collect_matching(child, predicate, trail, zippers);
        trail.pop();
    }
}
