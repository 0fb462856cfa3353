//! Node properties
//!
//! A property is a typed facet of a tree node. The set of kinds is open:
//! the core defines [`ChannelsProperty`](crate::channels_property::ChannelsProperty)
//! and [`XmlProperty`], and extensions add their own by implementing
//! [`Property`] and registering a constructor with the factory registry.
//!
//! A node holds at most one property per kind; the kind is the property's
//! qualified name.

use crate::channel::ChannelsManager;
use crate::error::{Error, Result};
use crate::factory::{FactoryRegistry, QualifiedName};
use crate::ids::ChannelId;
use crate::media::Media;
use crate::media_data::MediaDataManager;
use crate::serialization::record::Record;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;

/// A typed facet attachable to a tree node
pub trait Property: Any + Send + Sync + fmt::Debug {
    /// Kind discriminant, also the interchange tag
    fn qualified_name(&self) -> QualifiedName;

    /// Serialize to an interchange record
    fn write_record(&self) -> Result<Record>;

    fn clone_box(&self) -> Box<dyn Property>;

    /// Value equality against another property of any kind
    fn eq_property(&self, other: &dyn Property) -> bool;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Resolve cross references left by `from_record`
    ///
    /// Called once all entities of the document are registered. Properties
    /// without references keep the default.
    fn link(&mut self, _links: &mut LinkContext<'_>) -> Result<()> {
        Ok(())
    }
}

impl Clone for Box<dyn Property> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

impl PartialEq for dyn Property {
    fn eq(&self, other: &dyn Property) -> bool {
        self.eq_property(other)
    }
}

/// Phase-two lookup tables handed to [`Property::link`]
pub struct LinkContext<'a> {
    pub(crate) registry: &'a FactoryRegistry,
    pub(crate) channels: &'a ChannelsManager,
    pub(crate) media_data: &'a MediaDataManager,
    pub(crate) strict: bool,
    pub(crate) warnings: &'a mut Vec<String>,
}

impl LinkContext<'_> {
    /// Record a dangling reference; fatal in strict mode
    pub fn dangling(&mut self, what: String) -> Result<()> {
        if self.strict {
            return Err(Error::NotFound(what));
        }
        log::warn!("Dropping dangling reference: {}", what);
        self.warnings.push(format!("dropped dangling reference: {}", what));
        Ok(())
    }

    /// Whether a channel id resolves
    pub fn has_channel(&self, id: &ChannelId) -> bool {
        self.channels.contains(id)
    }

    /// Build and link the media described by `record`
    ///
    /// `Ok(None)` means the media was skipped, either as an unknown optional
    /// kind or as a dangling reference under lenient loading.
    pub fn media(&mut self, record: &Record) -> Result<Option<Media>> {
        let unlinked = match self.registry.media.construct(record)? {
            Some(unlinked) => unlinked,
            None => {
                let name = record.qualified_name()?;
                if !record.is_optional() && self.strict {
                    return Err(Error::unsupported(&name));
                }
                log::warn!("Skipping media of unknown kind {}", name);
                self.warnings.push(format!("skipped media of unknown kind {}", name));
                return Ok(None);
            }
        };
        match unlinked.link(self.media_data) {
            Ok(media) => Ok(Some(media)),
            Err(Error::NotFound(what)) => self.dangling(what).map(|_| None),
            Err(other) => Err(other),
        }
    }
}

/// The properties of one node, at most one per kind
#[derive(Clone, Debug, Default)]
pub struct PropertySet {
    properties: Vec<Box<dyn Property>>,
}

impl PropertySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, kind: &QualifiedName) -> Option<&dyn Property> {
        self.properties
            .iter()
            .find(|p| &p.qualified_name() == kind)
            .map(|p| &**p)
    }

    /// The property of concrete type `T`, if present
    pub fn get_as<T: Property>(&self) -> Option<&T> {
        self.properties.iter().find_map(|p| p.as_any().downcast_ref::<T>())
    }

    pub(crate) fn get_as_mut<T: Property>(&mut self) -> Option<&mut T> {
        self.properties
            .iter_mut()
            .find_map(|p| p.as_any_mut().downcast_mut::<T>())
    }

    pub fn contains(&self, kind: &QualifiedName) -> bool {
        self.get(kind).is_some()
    }

    /// Add a property, replacing and returning any of the same kind
    pub(crate) fn set(&mut self, property: Box<dyn Property>) -> Option<Box<dyn Property>> {
        let kind = property.qualified_name();
        match self.properties.iter_mut().find(|p| p.qualified_name() == kind) {
            Some(slot) => Some(std::mem::replace(slot, property)),
            None => {
                self.properties.push(property);
                None
            }
        }
    }

    pub(crate) fn remove(&mut self, kind: &QualifiedName) -> Option<Box<dyn Property>> {
        let index = self.properties.iter().position(|p| &p.qualified_name() == kind)?;
        Some(self.properties.remove(index))
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Property> {
        self.properties.iter().map(|p| &**p)
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Box<dyn Property>> {
        self.properties.iter_mut()
    }

    /// Whether this exact property instance is held here
    pub fn holds(&self, property: &dyn Property) -> bool {
        let target = (property as *const dyn Property).cast::<()>();
        self.properties
            .iter()
            .any(|p| std::ptr::eq((&**p as *const dyn Property).cast::<()>(), target))
    }

    pub fn kinds(&self) -> Vec<QualifiedName> {
        self.properties.iter().map(|p| p.qualified_name()).collect()
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

impl PartialEq for PropertySet {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self.iter().all(|p| {
                other
                    .get(&p.qualified_name())
                    .map(|q| p.eq_property(q))
                    .unwrap_or(false)
            })
    }
}

/// One attribute of an [`XmlProperty`]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct XmlAttribute {
    pub name: String,
    pub value: String,
}

/// Markup element a node maps to when exported as XML
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct XmlProperty {
    local_name: String,
    namespace_uri: Option<String>,
    attributes: Vec<XmlAttribute>,
}

impl XmlProperty {
    pub fn new(local_name: impl Into<String>) -> Self {
        Self {
            local_name: local_name.into(),
            namespace_uri: None,
            attributes: Vec::new(),
        }
    }

    pub fn with_namespace(mut self, namespace_uri: impl Into<String>) -> Self {
        self.namespace_uri = Some(namespace_uri.into());
        self
    }

    pub fn local_name(&self) -> &str {
        &self.local_name
    }

    pub fn namespace_uri(&self) -> Option<&str> {
        self.namespace_uri.as_deref()
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    pub fn attributes(&self) -> &[XmlAttribute] {
        &self.attributes
    }

    /// Set an attribute, keeping its position if it already exists
    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) -> Option<String> {
        let name = name.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|a| a.name == name) {
            Some(existing) => Some(std::mem::replace(&mut existing.value, value)),
            None => {
                self.attributes.push(XmlAttribute { name, value });
                None
            }
        }
    }

    pub fn remove_attribute(&mut self, name: &str) -> Option<String> {
        let index = self.attributes.iter().position(|a| a.name == name)?;
        Some(self.attributes.remove(index).value)
    }

    pub(crate) fn from_record(record: &Record) -> Result<Self> {
        Ok(Self {
            local_name: record.str("localName")?.to_string(),
            namespace_uri: record.opt("namespaceUri")?,
            attributes: record.opt("attributes")?.unwrap_or_default(),
        })
    }
}

impl Property for XmlProperty {
    fn qualified_name(&self) -> QualifiedName {
        QualifiedName::core("XmlProperty")
    }

    fn write_record(&self) -> Result<Record> {
        let mut record = Record::new(&self.qualified_name());
        record.set("localName", &self.local_name)?;
        if let Some(ns) = &self.namespace_uri {
            record.set("namespaceUri", ns)?;
        }
        record.set("attributes", &self.attributes)?;
        Ok(record)
    }

    fn clone_box(&self) -> Box<dyn Property> {
        Box::new(self.clone())
    }

    fn eq_property(&self, other: &dyn Property) -> bool {
        other.as_any().downcast_ref::<Self>() == Some(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channels_property::ChannelsProperty;

    #[test]
    fn test_one_property_per_kind() {
        let mut set = PropertySet::new();
        assert!(set.set(Box::new(XmlProperty::new("p"))).is_none());
        assert!(set.set(Box::new(ChannelsProperty::new())).is_none());

        let previous = set.set(Box::new(XmlProperty::new("h1"))).unwrap();
        assert_eq!(
            previous.as_any().downcast_ref::<XmlProperty>().unwrap().local_name(),
            "p"
        );
        assert_eq!(set.len(), 2);
        assert_eq!(set.get_as::<XmlProperty>().unwrap().local_name(), "h1");
    }

    #[test]
    fn test_remove_and_kinds() {
        let mut set = PropertySet::new();
        set.set(Box::new(XmlProperty::new("p")));
        assert_eq!(set.kinds(), vec![QualifiedName::core("XmlProperty")]);
        assert!(set.remove(&QualifiedName::core("XmlProperty")).is_some());
        assert!(set.remove(&QualifiedName::core("XmlProperty")).is_none());
        assert!(set.is_empty());
    }

    #[test]
    fn test_xml_attributes_keep_order() {
        let mut xml = XmlProperty::new("img").with_namespace("http://www.w3.org/1999/xhtml");
        xml.set_attribute("src", "a.png");
        xml.set_attribute("alt", "cover");
        assert_eq!(xml.set_attribute("src", "b.png"), Some("a.png".to_string()));

        let names: Vec<_> = xml.attributes().iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["src", "alt"]);

        let record = xml.write_record().unwrap();
        assert_eq!(XmlProperty::from_record(&record).unwrap(), xml);
    }

    #[test]
    fn test_property_set_equality_ignores_order() {
        let mut a = PropertySet::new();
        a.set(Box::new(XmlProperty::new("p")));
        a.set(Box::new(ChannelsProperty::new()));
        let mut b = PropertySet::new();
        b.set(Box::new(ChannelsProperty::new()));
        b.set(Box::new(XmlProperty::new("p")));
        assert_eq!(a, b);

        b.set(Box::new(XmlProperty::new("div")));
        assert_ne!(a, b);
    }
}
