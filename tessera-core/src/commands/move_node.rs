//! Move node command

use crate::command::Command;
use crate::error::{Error, Result};
use crate::ids::NodeId;
use crate::presentation::Presentation;

/// Command that moves a node under a new parent
///
/// `index` is the position among the new parent's children after the node
/// left its old place.
pub struct MoveNodeCommand {
    node: NodeId,
    new_parent: NodeId,
    index: usize,
    previous: Option<(NodeId, usize)>,
}

impl MoveNodeCommand {
    pub fn new(node: NodeId, new_parent: NodeId, index: usize) -> Self {
        Self {
            node,
            new_parent,
            index,
            previous: None,
        }
    }
}

impl Command for MoveNodeCommand {
    fn apply(&mut self, presentation: &mut Presentation) -> Result<()> {
        self.previous = Some(presentation.move_node(&self.node, &self.new_parent, self.index)?);
        Ok(())
    }

    fn invert(&mut self, presentation: &mut Presentation) -> Result<()> {
        let (parent, index) = self
            .previous
            .clone()
            .ok_or_else(|| Error::structural("move node command was never applied"))?;
        presentation.move_node(&self.node, &parent, index)?;
        Ok(())
    }

    fn description(&self) -> String {
        "Move node".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn children(p: &Presentation, id: &NodeId) -> Vec<NodeId> {
        p.node(id).unwrap().children().to_vec()
    }

    #[test]
    fn test_move_between_parents() {
        let dir = tempfile::tempdir().unwrap();
        let mut p = Presentation::new("Test", dir.path().join("data"));
        let root = p.create_root().unwrap();
        let a = p.create_node();
        let b = p.create_node();
        let c = p.create_node();
        p.append_node(&a, &root).unwrap();
        p.append_node(&b, &root).unwrap();
        p.append_node(&c, &a).unwrap();

        let mut command = MoveNodeCommand::new(c.clone(), b.clone(), 0);
        command.apply(&mut p).unwrap();
        assert!(children(&p, &a).is_empty());
        assert_eq!(children(&p, &b), vec![c.clone()]);

        command.invert(&mut p).unwrap();
        assert_eq!(children(&p, &a), vec![c]);
        assert!(children(&p, &b).is_empty());
    }

    #[test]
    fn test_reorder_within_parent() {
        let dir = tempfile::tempdir().unwrap();
        let mut p = Presentation::new("Test", dir.path().join("data"));
        let root = p.create_root().unwrap();
        let ids: Vec<NodeId> = (0..3).map(|_| p.create_node()).collect();
        for id in &ids {
            p.append_node(id, &root).unwrap();
        }

        let mut command = MoveNodeCommand::new(ids[0].clone(), root.clone(), 2);
        command.apply(&mut p).unwrap();
        assert_eq!(children(&p, &root), vec![ids[1].clone(), ids[2].clone(), ids[0].clone()]);

        command.invert(&mut p).unwrap();
        assert_eq!(children(&p, &root), ids);
    }

    #[test]
    fn test_move_under_own_descendant_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut p = Presentation::new("Test", dir.path().join("data"));
        let root = p.create_root().unwrap();
        let a = p.create_node();
        let b = p.create_node();
        p.append_node(&a, &root).unwrap();
        p.append_node(&b, &a).unwrap();

        let mut command = MoveNodeCommand::new(a.clone(), b, 0);
        assert!(matches!(command.apply(&mut p), Err(Error::Structural(_))));
        assert_eq!(children(&p, &root), vec![a]);
    }
}
