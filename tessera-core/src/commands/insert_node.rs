//! Insert node command
//!
//! Inserts either a brand new node or an existing detached one.

use crate::command::Command;
use crate::error::Result;
use crate::ids::NodeId;
use crate::presentation::Presentation;
use crate::tree::DetachedSubtree;

/// Command that inserts a node as child `index` of `parent`
pub struct InsertNodeCommand {
    node: NodeId,
    parent: NodeId,
    index: usize,
    /// Whether the command created the node and so owns it while undone
    creates: bool,
    /// The node's subtree while the insertion is undone
    stash: Option<DetachedSubtree>,
}

impl InsertNodeCommand {
    /// Create a fresh node and insert it
    ///
    /// The node id is allocated up front so redo recreates the same node.
    pub fn new(parent: NodeId, index: usize) -> Self {
        Self {
            node: NodeId::generate(),
            parent,
            index,
            creates: true,
            stash: None,
        }
    }

    /// Insert a node that already exists in the presentation, detached
    ///
    /// Undo detaches it again but leaves it in the presentation.
    pub fn existing(node: NodeId, parent: NodeId, index: usize) -> Self {
        Self {
            node,
            parent,
            index,
            creates: false,
            stash: None,
        }
    }

    /// Id of the inserted node
    pub fn node(&self) -> &NodeId {
        &self.node
    }
}

impl Command for InsertNodeCommand {
    fn apply(&mut self, presentation: &mut Presentation) -> Result<()> {
        if self.creates {
            match self.stash.take() {
                Some(subtree) => {
                    presentation.tree_mut().restore_subtree(subtree)?;
                }
                None => presentation.tree_mut().create_node_with_id(self.node.clone())?,
            }
        }
        if let Err(e) = presentation.insert_node(&self.node, &self.parent, self.index) {
            if self.creates {
                self.stash = Some(presentation.tree_mut().take_subtree(&self.node)?);
            }
            return Err(e);
        }
        Ok(())
    }

    fn invert(&mut self, presentation: &mut Presentation) -> Result<()> {
        presentation.remove_node(&self.node)?;
        if self.creates {
            self.stash = Some(presentation.tree_mut().take_subtree(&self.node)?);
        }
        Ok(())
    }

    fn description(&self) -> String {
        "Insert node".to_string()
    }
}
