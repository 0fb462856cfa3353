//! Document tree
//!
//! Nodes live in an arena keyed by id. Each node owns the ordered list of
//! its children's ids and its property set; the parent link is a plain id,
//! never an owner. Nodes can exist outside the rooted tree (freshly created,
//! or detached by a removal); only the rooted tree is persisted.
//!
//! Mutation is `pub(crate)`: it goes through
//! [`Presentation`](crate::presentation::Presentation), which announces every
//! change.

use crate::error::{Error, Result};
use crate::ids::NodeId;
use crate::property::{Property, PropertySet};
use std::collections::HashMap;

/// One node of the document tree
#[derive(Clone, Debug)]
pub struct TreeNode {
    id: NodeId,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    properties: PropertySet,
}

impl TreeNode {
    fn new(id: NodeId) -> Self {
        Self {
            id,
            parent: None,
            children: Vec::new(),
            properties: PropertySet::new(),
        }
    }

    pub fn id(&self) -> &NodeId {
        &self.id
    }

    pub fn parent(&self) -> Option<&NodeId> {
        self.parent.as_ref()
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    pub fn child(&self, index: usize) -> Option<&NodeId> {
        self.children.get(index)
    }

    pub fn index_of(&self, child: &NodeId) -> Option<usize> {
        self.children.iter().position(|c| c == child)
    }

    pub fn properties(&self) -> &PropertySet {
        &self.properties
    }

    pub(crate) fn properties_mut(&mut self) -> &mut PropertySet {
        &mut self.properties
    }
}

/// Depth-first, pre-order traversal callbacks
///
/// `pre_visit` decides whether the node's children are visited. `post_visit`
/// runs after all children of a node whose `pre_visit` returned true.
pub trait TreeVisitor {
    fn pre_visit(&mut self, node: &TreeNode) -> bool;

    fn post_visit(&mut self, _node: &TreeNode) {}
}

impl<F: FnMut(&TreeNode) -> bool> TreeVisitor for F {
    fn pre_visit(&mut self, node: &TreeNode) -> bool {
        self(node)
    }
}

/// A node and its descendants, taken out of the arena
#[derive(Clone, Debug)]
pub struct DetachedSubtree {
    root: NodeId,
    nodes: Vec<TreeNode>,
}

impl DetachedSubtree {
    pub fn root(&self) -> &NodeId {
        &self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &TreeNode> {
        self.nodes.iter()
    }
}

#[derive(Clone, Debug, Default)]
pub struct Tree {
    nodes: HashMap<NodeId, TreeNode>,
    root: Option<NodeId>,
}

impl Tree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn root(&self) -> Option<&NodeId> {
        self.root.as_ref()
    }

    pub fn get(&self, id: &NodeId) -> Option<&TreeNode> {
        self.nodes.get(id)
    }

    pub(crate) fn get_mut(&mut self, id: &NodeId) -> Option<&mut TreeNode> {
        self.nodes.get_mut(id)
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Node holding this exact property instance
    pub fn owner_of(&self, property: &dyn Property) -> Option<&NodeId> {
        self.nodes
            .values()
            .find(|node| node.properties.holds(property))
            .map(|node| &node.id)
    }

    /// Number of nodes in the arena, attached or not
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) fn node(&self, id: &NodeId) -> Result<&TreeNode> {
        self.nodes
            .get(id)
            .ok_or_else(|| Error::not_found(format!("node {}", id)))
    }

    pub(crate) fn node_mut(&mut self, id: &NodeId) -> Result<&mut TreeNode> {
        self.nodes
            .get_mut(id)
            .ok_or_else(|| Error::not_found(format!("node {}", id)))
    }

    /// Add a detached node under a fresh id
    pub(crate) fn create_node(&mut self) -> NodeId {
        let id = NodeId::generate();
        self.nodes.insert(id.clone(), TreeNode::new(id.clone()));
        id
    }

    /// Add a detached node under a given id
    pub(crate) fn create_node_with_id(&mut self, id: NodeId) -> Result<()> {
        if self.nodes.contains_key(&id) {
            return Err(Error::structural(format!("duplicate node id {}", id)));
        }
        self.nodes.insert(id.clone(), TreeNode::new(id));
        Ok(())
    }

    /// Make a detached node the root; a tree has one root for life
    pub(crate) fn set_root(&mut self, id: &NodeId) -> Result<()> {
        if let Some(root) = &self.root {
            return Err(Error::AlreadyInitialized(format!("tree already has root {}", root)));
        }
        if self.node(id)?.parent.is_some() {
            return Err(Error::structural(format!("node {} already has a parent", id)));
        }
        self.root = Some(id.clone());
        Ok(())
    }

    /// Whether `ancestor` is `node` or one of its ancestors
    pub fn is_ancestor_or_self(&self, ancestor: &NodeId, node: &NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.nodes.get(id).and_then(|n| n.parent.as_ref());
        }
        false
    }

    /// Whether a node is reachable from the root
    pub fn is_attached(&self, id: &NodeId) -> bool {
        match &self.root {
            Some(root) => self.contains(id) && self.is_ancestor_or_self(root, id),
            None => false,
        }
    }

    /// Insert a parentless node as child `index` of `parent`
    pub(crate) fn insert(&mut self, child: &NodeId, parent: &NodeId, index: usize) -> Result<()> {
        let child_node = self.node(child)?;
        let parent_node = self.node(parent)?;
        if let Some(existing) = &child_node.parent {
            return Err(Error::structural(format!(
                "node {} already has parent {}",
                child, existing
            )));
        }
        if self.root.as_ref() == Some(child) {
            return Err(Error::structural(format!("the root {} cannot be inserted", child)));
        }
        if index > parent_node.children.len() {
            return Err(Error::structural(format!(
                "child index {} out of range 0..={}",
                index,
                parent_node.children.len()
            )));
        }
        if self.is_ancestor_or_self(child, parent) {
            return Err(Error::structural(format!(
                "inserting {} under {} would create a cycle",
                child, parent
            )));
        }
        self.node_mut(parent)?.children.insert(index, child.clone());
        self.node_mut(child)?.parent = Some(parent.clone());
        Ok(())
    }

    /// Detach a node from its parent; returns the former parent and index
    pub(crate) fn remove(&mut self, child: &NodeId) -> Result<(NodeId, usize)> {
        let parent = self
            .node(child)?
            .parent
            .clone()
            .ok_or_else(|| Error::structural(format!("node {} has no parent", child)))?;
        let parent_node = self.node_mut(&parent)?;
        let index = parent_node
            .index_of(child)
            .ok_or_else(|| Error::structural(format!("node {} missing from its parent", child)))?;
        parent_node.children.remove(index);
        self.node_mut(child)?.parent = None;
        Ok((parent, index))
    }

    /// Move a node under a new parent; returns the former parent and index
    ///
    /// Everything is checked before anything changes, so a failed move leaves
    /// the tree untouched.
    pub(crate) fn move_to(
        &mut self,
        child: &NodeId,
        new_parent: &NodeId,
        index: usize,
    ) -> Result<(NodeId, usize)> {
        let old_parent = self
            .node(child)?
            .parent
            .clone()
            .ok_or_else(|| Error::structural(format!("node {} has no parent", child)))?;
        let target_len = self.node(new_parent)?.children.len();
        let limit = if &old_parent == new_parent {
            target_len - 1
        } else {
            target_len
        };
        if index > limit {
            return Err(Error::structural(format!(
                "child index {} out of range 0..={}",
                index, limit
            )));
        }
        if self.is_ancestor_or_self(child, new_parent) {
            return Err(Error::structural(format!(
                "moving {} under {} would create a cycle",
                child, new_parent
            )));
        }
        let previous = self.remove(child)?;
        self.insert(child, new_parent, index)?;
        Ok(previous)
    }

    /// Ids of a node and its descendants, pre-order
    pub fn subtree_ids(&self, id: &NodeId) -> Vec<NodeId> {
        let mut ids = Vec::new();
        let mut stack = vec![id.clone()];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes.get(&current) {
                stack.extend(node.children.iter().rev().cloned());
                ids.push(current);
            }
        }
        ids
    }

    /// Take a parentless node and its descendants out of the arena
    pub(crate) fn take_subtree(&mut self, id: &NodeId) -> Result<DetachedSubtree> {
        let node = self.node(id)?;
        if node.parent.is_some() || self.root.as_ref() == Some(id) {
            return Err(Error::structural(format!("node {} is still attached", id)));
        }
        let nodes = self
            .subtree_ids(id)
            .iter()
            .filter_map(|n| self.nodes.remove(n))
            .collect();
        Ok(DetachedSubtree {
            root: id.clone(),
            nodes,
        })
    }

    /// Put a subtree taken by `take_subtree` back, detached
    pub(crate) fn restore_subtree(&mut self, subtree: DetachedSubtree) -> Result<NodeId> {
        if let Some(clash) = subtree.nodes.iter().find(|n| self.nodes.contains_key(&n.id)) {
            return Err(Error::structural(format!("duplicate node id {}", clash.id)));
        }
        for node in subtree.nodes {
            self.nodes.insert(node.id.clone(), node);
        }
        Ok(subtree.root)
    }

    /// Walk the rooted tree
    pub fn accept(&self, visitor: &mut dyn TreeVisitor) {
        if let Some(root) = &self.root {
            self.accept_from(root, visitor);
        }
    }

    /// Walk the subtree below `id`
    pub fn accept_from(&self, id: &NodeId, visitor: &mut dyn TreeVisitor) {
        let Some(node) = self.nodes.get(id) else {
            return;
        };
        if visitor.pre_visit(node) {
            for child in &node.children {
                self.accept_from(child, visitor);
            }
            visitor.post_visit(node);
        }
    }

    /// Every node in the arena, attached or not, sorted by id
    pub fn all_ids(&self) -> Vec<NodeId> {
        let mut ids: Vec<NodeId> = self.nodes.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Rooted-tree nodes, pre-order
    pub fn iter(&self) -> impl Iterator<Item = &TreeNode> {
        let ids = self.root.as_ref().map(|r| self.subtree_ids(r)).unwrap_or_default();
        ids.into_iter().filter_map(move |id| self.nodes.get(&id))
    }

    fn same_subtree(&self, id: &NodeId, other: &Tree) -> bool {
        match (self.nodes.get(id), other.nodes.get(id)) {
            (Some(a), Some(b)) => {
                a.children == b.children
                    && a.properties == b.properties
                    && a.children.iter().all(|c| self.same_subtree(c, other))
            }
            _ => false,
        }
    }
}

/// Rooted trees compare by ids, shape and properties; detached nodes are ignored
impl PartialEq for Tree {
    fn eq(&self, other: &Self) -> bool {
        match (&self.root, &other.root) {
            (None, None) => true,
            (Some(a), Some(b)) => a == b && self.same_subtree(a, other),
            _ => false,
        }
    }
}
