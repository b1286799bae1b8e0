//! Builds the asset forest from the backend's flat parent-pointer records.

use crate::core::asset::{AssetNode, AssetRecord};
use crate::core::valuation::total_value;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Ordered root-level nodes for one user.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Forest {
    pub roots: Vec<AssetNode>,
}

impl Forest {
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    pub fn node_count(&self) -> usize {
        self.iter().count()
    }

    /// Depth-first, pre-order walk over every node with its depth.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &AssetNode)> {
        let mut stack: Vec<(usize, &AssetNode)> = self.roots.iter().rev().map(|n| (0, n)).collect();
        std::iter::from_fn(move || {
            let (depth, node) = stack.pop()?;
            stack.extend(node.children.iter().rev().map(|c| (depth + 1, c)));
            Some((depth, node))
        })
    }

    pub fn find(&self, id: &str) -> Option<&AssetNode> {
        find_node(&self.roots, id)
    }

    pub fn parent_of(&self, id: &str) -> Option<&AssetNode> {
        find_parent(&self.roots, id)
    }

    pub fn total_value(&self) -> f64 {
        self.roots.iter().map(total_value).sum()
    }
}

/// Builds the forest, silently dropping records unreachable from a root.
pub fn build_tree(records: &[AssetRecord]) -> Forest {
    build_tree_with_orphans(records).0
}

/// Builds the forest and also returns the records no root reaches, either
/// because their parent does not exist or because they sit on a cycle.
pub fn build_tree_with_orphans(records: &[AssetRecord]) -> (Forest, Vec<AssetRecord>) {
    let mut roots: Vec<&AssetRecord> = Vec::new();
    let mut by_parent: HashMap<&str, Vec<&AssetRecord>> = HashMap::new();

    for record in records {
        match record.parent_id.as_deref().filter(|p| !p.is_empty()) {
            None => roots.push(record),
            Some(parent) => by_parent.entry(parent).or_default().push(record),
        }
    }

    let mut visited: HashSet<&str> = HashSet::new();
    let mut nodes: Vec<AssetNode> = roots
        .iter()
        .map(|r| build_node(r, &by_parent, &mut visited))
        .collect();
    sort_level(&mut nodes);

    let orphans: Vec<AssetRecord> = records
        .iter()
        .filter(|r| !visited.contains(r.id.as_str()))
        .cloned()
        .collect();
    if !orphans.is_empty() {
        debug!(count = orphans.len(), "Dropped records unreachable from any root");
    }

    (Forest { roots: nodes }, orphans)
}

fn build_node<'a>(
    record: &'a AssetRecord,
    by_parent: &HashMap<&str, Vec<&'a AssetRecord>>,
    visited: &mut HashSet<&'a str>,
) -> AssetNode {
    visited.insert(record.id.as_str());
    let mut node = AssetNode::from(record);

    if let Some(children) = by_parent.get(record.id.as_str()) {
        let mut built: Vec<AssetNode> = Vec::with_capacity(children.len());
        for child in children {
            // A record already placed elsewhere means duplicate ids; skip to keep recursion finite.
            if visited.contains(child.id.as_str()) {
                continue;
            }
            built.push(build_node(child, by_parent, visited));
        }
        sort_level(&mut built);
        node.children = built;
    }

    node
}

/// Groups first, then descending subtree total. Stable for ties.
fn sort_level(nodes: &mut [AssetNode]) {
    nodes.sort_by(|a, b| match (a.is_group(), b.is_group()) {
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        _ => total_value(b).total_cmp(&total_value(a)),
    });
}

pub fn find_node<'a>(nodes: &'a [AssetNode], id: &str) -> Option<&'a AssetNode> {
    for node in nodes {
        if node.id == id {
            return Some(node);
        }
        if let Some(found) = find_node(&node.children, id) {
            return Some(found);
        }
    }
    None
}

fn find_parent<'a>(nodes: &'a [AssetNode], id: &str) -> Option<&'a AssetNode> {
    for node in nodes {
        if node.children.iter().any(|c| c.id == id) {
            return Some(node);
        }
        if let Some(found) = find_parent(&node.children, id) {
            return Some(found);
        }
    }
    None
}

/// Id of the node's parent; `None` for roots and unknown ids.
pub fn find_parent_id(forest: &Forest, id: &str) -> Option<String> {
    forest.parent_of(id).map(|p| p.id.clone())
}

/// True when `id` is `node` itself or any of its descendants.
pub fn is_in_subtree(node: &AssetNode, id: &str) -> bool {
    node.id == id || node.children.iter().any(|c| is_in_subtree(c, id))
}
