//! Factory registry for construction by qualified name
//!
//! Each persistable entity kind has a [`Factory`] mapping a
//! [`QualifiedName`] (namespace + local name) to a constructor. The reader
//! dispatches every record it meets through the matching factory; names
//! nobody registered resolve to `None`, so documents carrying unknown
//! optional entities still load.
//!
//! Extension modules register their own kinds on a [`FactoryRegistry`]
//! before loading:
//!
//! ```
//! use tessera_core::factory::{FactoryRegistry, QualifiedName};
//! use tessera_core::property::XmlProperty;
//!
//! let mut registry = FactoryRegistry::default();
//! registry
//!     .properties
//!     .register(QualifiedName::new("Heading", "urn:acme"), |_record| {
//!         Ok(Box::new(XmlProperty::new("h1")))
//!     })
//!     .unwrap();
//! assert!(registry.properties.resolve("Heading", "urn:acme").is_some());
//! assert!(registry.properties.resolve("UnknownThing", "urn:unknown").is_none());
//! ```

use crate::channel::{Channel, ChannelKind};
use crate::channels_property::ChannelsProperty;
use crate::error::{Error, Result};
use crate::media::UnlinkedMedia;
use crate::media_data::MediaData;
use crate::metadata::MetadataEntry;
use crate::property::{Property, XmlProperty};
use crate::serialization::record::Record;
use crate::serialization::DataProviderDraft;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Namespace of every built-in entity kind
pub const CORE_NAMESPACE: &str = "urn:tessera:core";

/// Namespace + local name identifying a concrete entity kind
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QualifiedName {
    namespace: String,
    local_name: String,
}

impl QualifiedName {
    pub fn new(local_name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            local_name: local_name.into(),
        }
    }

    /// Name in the core namespace
    pub fn core(local_name: impl Into<String>) -> Self {
        Self::new(local_name, CORE_NAMESPACE)
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn local_name(&self) -> &str {
        &self.local_name
    }

    pub fn is_core(&self) -> bool {
        self.namespace == CORE_NAMESPACE
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}}}{}", self.namespace, self.local_name)
    }
}

/// Constructor registered for one qualified name
pub type Constructor<T> = Arc<dyn Fn(&Record) -> Result<T> + Send + Sync>;

/// Qualified-name dispatch table for one entity kind
pub struct Factory<T> {
    kind: &'static str,
    constructors: HashMap<QualifiedName, Constructor<T>>,
}

impl<T> Factory<T> {
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            constructors: HashMap::new(),
        }
    }

    /// Entity kind this factory builds, for messages
    pub fn kind(&self) -> &'static str {
        self.kind
    }

    /// Register a constructor; each name may be registered once
    pub fn register<F>(&mut self, name: QualifiedName, constructor: F) -> Result<()>
    where
        F: Fn(&Record) -> Result<T> + Send + Sync + 'static,
    {
        if self.constructors.contains_key(&name) {
            return Err(Error::AlreadyInitialized(format!(
                "{} constructor for {} is already registered",
                self.kind, name
            )));
        }
        self.insert(name, constructor);
        Ok(())
    }

    fn insert<F>(&mut self, name: QualifiedName, constructor: F)
    where
        F: Fn(&Record) -> Result<T> + Send + Sync + 'static,
    {
        self.constructors.insert(name, Arc::new(constructor));
    }

    /// Look up the constructor for a name; unknown names give `None`
    pub fn resolve(&self, local_name: &str, namespace: &str) -> Option<Constructor<T>> {
        self.resolve_name(&QualifiedName::new(local_name, namespace))
    }

    pub fn resolve_name(&self, name: &QualifiedName) -> Option<Constructor<T>> {
        self.constructors.get(name).cloned()
    }

    pub fn is_registered(&self, name: &QualifiedName) -> bool {
        self.constructors.contains_key(name)
    }

    /// Build an entity from its record; `Ok(None)` if its kind is unknown
    pub fn construct(&self, record: &Record) -> Result<Option<T>> {
        let name = record.qualified_name()?;
        match self.resolve_name(&name) {
            Some(constructor) => constructor(record).map(Some),
            None => Ok(None),
        }
    }

    /// Build a default entity from its tag alone
    pub fn create(&self, name: &QualifiedName) -> Result<Option<T>> {
        match self.resolve_name(name) {
            Some(constructor) => constructor(&Record::new(name)).map(Some),
            None => Ok(None),
        }
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<QualifiedName> {
        let mut names: Vec<_> = self.constructors.keys().cloned().collect();
        names.sort();
        names
    }
}

impl<T> fmt::Debug for Factory<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Factory")
            .field("kind", &self.kind)
            .field("names", &self.names())
            .finish()
    }
}

/// One factory per persistable entity kind
#[derive(Debug)]
pub struct FactoryRegistry {
    pub properties: Factory<Box<dyn Property>>,
    pub media: Factory<UnlinkedMedia>,
    pub media_data: Factory<MediaData>,
    pub data_providers: Factory<DataProviderDraft>,
    pub channels: Factory<Channel>,
    pub metadata: Factory<MetadataEntry>,
}

impl FactoryRegistry {
    /// Registry with no kinds at all
    pub fn empty() -> Self {
        Self {
            properties: Factory::new("property"),
            media: Factory::new("media"),
            media_data: Factory::new("media data"),
            data_providers: Factory::new("data provider"),
            channels: Factory::new("channel"),
            metadata: Factory::new("metadata"),
        }
    }

    /// Registry knowing every built-in kind
    pub fn with_core_kinds() -> Self {
        let mut registry = Self::empty();
        registry.insert_core_kinds();
        registry
    }

    fn insert_core_kinds(&mut self) {
        self.properties.insert(QualifiedName::core("ChannelsProperty"), |record| {
            Ok(Box::new(ChannelsProperty::from_record(record)?) as Box<dyn Property>)
        });
        self.properties.insert(QualifiedName::core("XmlProperty"), |record| {
            Ok(Box::new(XmlProperty::from_record(record)?) as Box<dyn Property>)
        });

        for name in ["AudioMedia", "VideoMedia", "TextMedia", "ImageMedia"] {
            self.media.insert(QualifiedName::core(name), move |record| {
                UnlinkedMedia::from_record(name, record)
            });
        }

        for name in ["AudioMediaData", "VideoMediaData", "ImageMediaData", "BinaryMediaData"] {
            self.media_data.insert(QualifiedName::core(name), move |record| {
                crate::serialization::reader::media_data_from_record(name, record)
            });
        }

        self.data_providers
            .insert(QualifiedName::core("FileDataProvider"), DataProviderDraft::from_record);

        for kind in ChannelKind::ALL {
            self.channels
                .insert(kind.qualified_name(), move |record| Channel::from_record(kind, record));
        }

        self.metadata
            .insert(QualifiedName::core("Metadata"), MetadataEntry::from_record);
    }

    /// Which entity kind a qualified name belongs to, if any
    pub fn kind_of(&self, local_name: &str, namespace: &str) -> Option<&'static str> {
        let name = QualifiedName::new(local_name, namespace);
        [
            (self.properties.is_registered(&name), self.properties.kind()),
            (self.media.is_registered(&name), self.media.kind()),
            (self.media_data.is_registered(&name), self.media_data.kind()),
            (self.data_providers.is_registered(&name), self.data_providers.kind()),
            (self.channels.is_registered(&name), self.channels.kind()),
            (self.metadata.is_registered(&name), self.metadata.kind()),
        ]
        .into_iter()
        .find(|(registered, _)| *registered)
        .map(|(_, kind)| kind)
    }
}

impl Default for FactoryRegistry {
    fn default() -> Self {
        Self::with_core_kinds()
    }
}
