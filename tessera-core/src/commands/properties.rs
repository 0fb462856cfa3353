//! Property commands
//!
//! Attach or detach a whole property of a node. Both commands keep a copy of
//! what they displaced, so undo puts back exactly the previous property.

use crate::command::Command;
use crate::error::{Error, Result};
use crate::factory::QualifiedName;
use crate::ids::NodeId;
use crate::presentation::Presentation;
use crate::property::Property;

/// Command that sets a property, replacing any of the same kind
pub struct SetPropertyCommand {
    node: NodeId,
    property: Box<dyn Property>,
    previous: Option<Box<dyn Property>>,
}

impl SetPropertyCommand {
    pub fn new(node: NodeId, property: Box<dyn Property>) -> Self {
        Self {
            node,
            property,
            previous: None,
        }
    }
}

impl Command for SetPropertyCommand {
    fn apply(&mut self, presentation: &mut Presentation) -> Result<()> {
        self.previous = presentation.set_property(&self.node, self.property.clone_box())?;
        Ok(())
    }

    fn invert(&mut self, presentation: &mut Presentation) -> Result<()> {
        match &self.previous {
            Some(previous) => {
                presentation.set_property(&self.node, previous.clone_box())?;
            }
            None => {
                presentation.remove_property(&self.node, &self.property.qualified_name())?;
            }
        }
        self.previous = None;
        Ok(())
    }

    fn description(&self) -> String {
        format!("Set {} property", self.property.qualified_name().local_name())
    }
}

/// Command that removes the property of one kind from a node
pub struct RemovePropertyCommand {
    node: NodeId,
    kind: QualifiedName,
    removed: Option<Box<dyn Property>>,
}

impl RemovePropertyCommand {
    pub fn new(node: NodeId, kind: QualifiedName) -> Self {
        Self {
            node,
            kind,
            removed: None,
        }
    }
}

impl Command for RemovePropertyCommand {
    fn apply(&mut self, presentation: &mut Presentation) -> Result<()> {
        self.removed = Some(presentation.remove_property(&self.node, &self.kind)?);
        Ok(())
    }

    fn invert(&mut self, presentation: &mut Presentation) -> Result<()> {
        let removed = self
            .removed
            .as_ref()
            .ok_or_else(|| Error::structural("remove property command was never applied"))?;
        presentation.set_property(&self.node, removed.clone_box())?;
        self.removed = None;
        Ok(())
    }

    fn description(&self) -> String {
        format!("Remove {} property", self.kind.local_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::XmlProperty;

    fn setup() -> (tempfile::TempDir, Presentation, NodeId) {
        let dir = tempfile::tempdir().unwrap();
        let mut p = Presentation::new("Test", dir.path().join("data"));
        let root = p.create_root().unwrap();
        (dir, p, root)
    }

    fn heading(level: &str) -> Box<dyn Property> {
        let mut xml = XmlProperty::new("h1");
        xml.set_attribute("level", level);
        Box::new(xml)
    }

    #[test]
    fn test_set_property_replaces_and_restores() {
        let (_dir, mut p, root) = setup();
        p.set_property(&root, heading("1")).unwrap();

        let mut command = SetPropertyCommand::new(root.clone(), heading("2"));
        command.apply(&mut p).unwrap();
        let xml = p.node(&root).unwrap().properties().get_as::<XmlProperty>().unwrap();
        assert_eq!(xml.attribute("level"), Some("2"));
        assert_eq!(p.node(&root).unwrap().properties().len(), 1);

        command.invert(&mut p).unwrap();
        let xml = p.node(&root).unwrap().properties().get_as::<XmlProperty>().unwrap();
        assert_eq!(xml.attribute("level"), Some("1"));
    }

    #[test]
    fn test_set_new_property_is_removed_on_undo() {
        let (_dir, mut p, root) = setup();
        let mut command = SetPropertyCommand::new(root.clone(), heading("1"));
        command.apply(&mut p).unwrap();
        command.invert(&mut p).unwrap();
        assert!(p.node(&root).unwrap().properties().is_empty());
        assert_eq!(command.description(), "Set XmlProperty property");
    }

    #[test]
    fn test_remove_property() {
        let (_dir, mut p, root) = setup();
        p.set_property(&root, heading("3")).unwrap();
        let kind = QualifiedName::core("XmlProperty");

        let mut command = RemovePropertyCommand::new(root.clone(), kind.clone());
        command.apply(&mut p).unwrap();
        assert!(!p.node(&root).unwrap().properties().contains(&kind));

        command.invert(&mut p).unwrap();
        assert!(p.node(&root).unwrap().properties().contains(&kind));

        let mut missing = RemovePropertyCommand::new(root, QualifiedName::core("ChannelsProperty"));
        assert!(matches!(missing.apply(&mut p), Err(Error::NotFound(_))));
    }
}
