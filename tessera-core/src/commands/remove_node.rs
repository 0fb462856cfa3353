//! Remove node command
//!
//! Detaches a node with its whole subtree. While the removal is in the undo
//! history the command keeps the subtree, so media bound below it stay
//! referenced and their data survive orphan sweeps.

use crate::command::Command;
use crate::error::{Error, Result};
use crate::ids::NodeId;
use crate::presentation::Presentation;
use crate::tree::DetachedSubtree;

/// Command that removes a node and its descendants from the tree
pub struct RemoveNodeCommand {
    node: NodeId,
    /// Former parent and index, set once applied
    position: Option<(NodeId, usize)>,
    stash: Option<DetachedSubtree>,
}

impl RemoveNodeCommand {
    pub fn new(node: NodeId) -> Self {
        Self {
            node,
            position: None,
            stash: None,
        }
    }
}

impl Command for RemoveNodeCommand {
    fn apply(&mut self, presentation: &mut Presentation) -> Result<()> {
        let position = presentation.remove_node(&self.node)?;
        match presentation.tree_mut().take_subtree(&self.node) {
            Ok(subtree) => {
                self.stash = Some(subtree);
                self.position = Some(position);
                Ok(())
            }
            Err(e) => {
                presentation.insert_node(&self.node, &position.0, position.1)?;
                Err(e)
            }
        }
    }

    fn invert(&mut self, presentation: &mut Presentation) -> Result<()> {
        let (parent, index) = self
            .position
            .clone()
            .ok_or_else(|| Error::structural("remove node command was never applied"))?;
        let subtree = self
            .stash
            .take()
            .ok_or_else(|| Error::structural("remove node command holds no subtree"))?;
        presentation.tree_mut().restore_subtree(subtree)?;
        presentation.insert_node(&self.node, &parent, index)
    }

    fn description(&self) -> String {
        "Remove node".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{Channel, ChannelKind};
    use crate::media::Media;

    #[test]
    fn test_remove_and_restore_subtree() {
        let dir = tempfile::tempdir().unwrap();
        let mut p = Presentation::new("Test", dir.path().join("data"));
        let root = p.create_root().unwrap();
        let first = p.create_node();
        let second = p.create_node();
        let grandchild = p.create_node();
        p.append_node(&first, &root).unwrap();
        p.append_node(&second, &root).unwrap();
        p.append_node(&grandchild, &first).unwrap();
        let text = p.add_channel(Channel::new("Text", ChannelKind::Text)).unwrap();
        p.set_media(&grandchild, &text, Some(Media::text("leaf"))).unwrap();
        let before = p.tree().clone();

        let mut command = RemoveNodeCommand::new(first.clone());
        command.apply(&mut p).unwrap();
        assert_eq!(p.node(&root).unwrap().children(), &[second.clone()]);
        assert!(!p.tree().contains(&grandchild));

        command.invert(&mut p).unwrap();
        assert_eq!(p.tree(), &before);
        assert_eq!(p.get_media(&grandchild, &text).unwrap(), Some(&Media::text("leaf")));
    }

    #[test]
    fn test_root_cannot_be_removed() {
        let dir = tempfile::tempdir().unwrap();
        let mut p = Presentation::new("Test", dir.path().join("data"));
        let root = p.create_root().unwrap();
        let mut command = RemoveNodeCommand::new(root);
        assert!(matches!(command.apply(&mut p), Err(Error::Structural(_))));
    }
}
