//! Presentation: one document instance
//!
//! A [`Presentation`] owns the document tree, the channels, the media data
//! and data providers, the metadata table and the undo history. Reads are
//! public; every mutation goes through a method here so that it is
//! validated, announced on the presentation's [`NotificationBus`], and
//! followed by an orphan sweep where references may have been dropped.
//!
//! Undoable edits wrap these mutators in [`Command`]s (see
//! [`crate::commands`]) and run through [`Presentation::execute`].
//!
//! ## Orphan sweeps
//!
//! A media data nothing refers to, and the data providers no media data
//! uses, are collected by [`Presentation::collect_orphans`]. Every public
//! mutator sweeps before it changes anything, and mutations that drop media
//! internally sweep again on their own. Inside a deferred scope
//! ([`Presentation::batch`], command execution, document load) sweeping is
//! postponed until the outermost scope closes.
//!
//! Media handed back to the caller (the previous media of `set_media`, a
//! replaced property) still count as live until dropped; their data is
//! collected by the next mutation.

use crate::channel::{Channel, ChannelsManager};
use crate::channels_property::ChannelsProperty;
use crate::command::{Command, UndoRedoManager};
use crate::data_provider::DataProviderManager;
use crate::error::{Error, Result};
use crate::factory::{FactoryRegistry, QualifiedName};
use crate::ids::{ChannelId, DataProviderId, MediaDataId, MetadataId, NodeId, PresentationId};
use crate::media::Media;
use crate::media_data::{MediaData, MediaDataManager, MediaDataRef};
use crate::metadata::{MetadataEntry, MetadataTable};
use crate::notification::{Change, NotificationBus};
use crate::progress::ProgressNotifier;
use crate::property::{LinkContext, Property};
use crate::tree::{Tree, TreeNode};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// What one orphan sweep removed
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OrphanReport {
    pub media_data: Vec<MediaDataId>,
    pub data_providers: Vec<DataProviderId>,
}

impl OrphanReport {
    pub fn is_empty(&self) -> bool {
        self.media_data.is_empty() && self.data_providers.is_empty()
    }
}

/// A removed channel together with the mappings it took along
#[derive(Clone, Debug)]
pub struct RemovedChannel {
    index: usize,
    channel: Channel,
    mappings: Vec<(NodeId, Media)>,
}

impl RemovedChannel {
    pub fn channel(&self) -> &Channel {
        &self.channel
    }

    /// Former position in the channel list
    pub fn index(&self) -> usize {
        self.index
    }

    /// Node bindings cleared by the removal
    pub fn mappings(&self) -> &[(NodeId, Media)] {
        &self.mappings
    }
}

#[derive(Debug)]
pub struct Presentation {
    id: PresentationId,
    name: String,
    tree: Tree,
    channels: ChannelsManager,
    media_data: MediaDataManager,
    data_providers: DataProviderManager,
    metadata: MetadataTable,
    history: UndoRedoManager,
    bus: NotificationBus,
    dirty: Arc<AtomicBool>,
}

impl Presentation {
    /// Create an empty presentation storing payload files under `data_dir`
    pub fn new(name: impl Into<String>, data_dir: impl Into<PathBuf>) -> Self {
        Self::with_id(PresentationId::generate(), name, data_dir)
    }

    pub fn with_id(id: PresentationId, name: impl Into<String>, data_dir: impl Into<PathBuf>) -> Self {
        let bus = NotificationBus::for_presentation(id.clone());
        let dirty = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&dirty);
        bus.subscribe_changed(move |_| flag.store(true, Ordering::Relaxed));
        Self {
            id,
            name: name.into(),
            tree: Tree::new(),
            channels: ChannelsManager::new(),
            media_data: MediaDataManager::new(),
            data_providers: DataProviderManager::new(data_dir),
            metadata: MetadataTable::new(),
            history: UndoRedoManager::new(),
            bus,
            dirty,
        }
    }

    // === READ ACCESS ===

    pub fn id(&self) -> &PresentationId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn root(&self) -> Option<&NodeId> {
        self.tree.root()
    }

    pub fn node(&self, id: &NodeId) -> Option<&TreeNode> {
        self.tree.get(id)
    }

    pub fn channels(&self) -> &ChannelsManager {
        &self.channels
    }

    pub fn media_data(&self) -> &MediaDataManager {
        &self.media_data
    }

    pub fn data_providers(&self) -> &DataProviderManager {
        &self.data_providers
    }

    pub fn data_dir(&self) -> &Path {
        self.data_providers.data_dir()
    }

    pub fn metadata(&self) -> &MetadataTable {
        &self.metadata
    }

    pub fn history(&self) -> &UndoRedoManager {
        &self.history
    }

    /// History settings (depth limit, clearing)
    pub fn history_mut(&mut self) -> &mut UndoRedoManager {
        &mut self.history
    }

    pub fn bus(&self) -> &NotificationBus {
        &self.bus
    }

    /// Whether anything changed since the presentation was created, loaded or saved
    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Relaxed)
    }

    pub(crate) fn mark_clean(&self) {
        self.dirty.store(false, Ordering::Relaxed);
    }

    /// Close the deferred scope a document load opened
    ///
    /// Unreferenced media data and providers leave the tables, but provider
    /// files stay on disk: the document may merely declare them. Returns
    /// what was dropped and the paths of the dropped providers' files.
    pub(crate) fn finish_load(&mut self) -> (OrphanReport, Vec<PathBuf>) {
        self.data_providers.exit_deferred();
        let media_data: Vec<MediaDataId> = self
            .media_data
            .collect_unreferenced()
            .into_iter()
            .map(|data| data.id().clone())
            .collect();
        let referenced = self.media_data.referenced_providers();
        let dropped = self.data_providers.forget_unreferenced(&referenced);
        let paths = dropped
            .iter()
            .map(|provider| self.data_providers.data_dir().join(provider.file_name()))
            .collect();
        let report = OrphanReport {
            media_data,
            data_providers: dropped.iter().map(|provider| provider.id().clone()).collect(),
        };
        self.mark_clean();
        (report, paths)
    }

    pub fn property(&self, node: &NodeId, kind: &QualifiedName) -> Result<Option<&dyn Property>> {
        Ok(self.tree.node(node)?.properties().get(kind))
    }

    /// Media bound to `channel` on `node`
    ///
    /// `NotFound` if the node or channel is unknown; `Ok(None)` if nothing
    /// is bound.
    pub fn get_media(&self, node: &NodeId, channel: &ChannelId) -> Result<Option<&Media>> {
        let node = self.tree.node(node)?;
        if !self.channels.contains(channel) {
            return Err(Error::not_found(format!("channel {}", channel)));
        }
        Ok(node
            .properties()
            .get_as::<ChannelsProperty>()
            .and_then(|p| p.get_media(channel)))
    }

    /// [`get_media`](Self::get_media) by channel name
    pub fn get_media_by_name(&self, node: &NodeId, channel_name: &str) -> Result<Option<&Media>> {
        let channel = self
            .channels
            .by_name(channel_name)
            .ok_or_else(|| Error::not_found(format!("channel named {:?}", channel_name)))?;
        self.get_media(node, channel.id())
    }

    /// Take a counted reference to a media data of this presentation
    pub fn reference(&self, id: &MediaDataId) -> Result<MediaDataRef> {
        self.media_data.reference(id)
    }

    // === INTERNAL ACCESS (commands, serialization) ===

    pub(crate) fn tree_mut(&mut self) -> &mut Tree {
        &mut self.tree
    }

    pub(crate) fn channels_mut(&mut self) -> &mut ChannelsManager {
        &mut self.channels
    }

    pub(crate) fn media_data_mut(&mut self) -> &mut MediaDataManager {
        &mut self.media_data
    }

    pub(crate) fn data_providers_mut(&mut self) -> &mut DataProviderManager {
        &mut self.data_providers
    }

    pub(crate) fn metadata_mut(&mut self) -> &mut MetadataTable {
        &mut self.metadata
    }

    /// Resolve the references every property left pending at construction
    pub(crate) fn link_properties(
        &mut self,
        registry: &FactoryRegistry,
        strict: bool,
        warnings: &mut Vec<String>,
    ) -> Result<()> {
        let mut links = LinkContext {
            registry,
            channels: &self.channels,
            media_data: &self.media_data,
            strict,
            warnings,
        };
        for id in self.tree.all_ids() {
            if let Some(node) = self.tree.get_mut(&id) {
                for property in node.properties_mut().iter_mut() {
                    property.link(&mut links)?;
                }
            }
        }
        Ok(())
    }

    // === TREE ===

    /// Create a detached node
    pub fn create_node(&mut self) -> NodeId {
        self.tree.create_node()
    }

    /// Create a node and make it the root
    pub fn create_root(&mut self) -> Result<NodeId> {
        if let Some(root) = self.tree.root() {
            return Err(Error::AlreadyInitialized(format!(
                "presentation {} already has root {}",
                self.id, root
            )));
        }
        let id = self.tree.create_node();
        self.set_root(&id)?;
        Ok(id)
    }

    /// Make a detached node the root; a presentation gets one root for life
    pub fn set_root(&mut self, id: &NodeId) -> Result<()> {
        self.sweep_if_idle();
        self.tree.set_root(id)?;
        self.bus.emit(Change::RootSet { node: id.clone() });
        Ok(())
    }

    pub fn insert_node(&mut self, child: &NodeId, parent: &NodeId, index: usize) -> Result<()> {
        self.sweep_if_idle();
        self.tree.insert(child, parent, index)?;
        self.bus.emit(Change::NodeInserted {
            node: child.clone(),
            parent: parent.clone(),
            index,
        });
        Ok(())
    }

    /// Insert as the last child; returns the index used
    pub fn append_node(&mut self, child: &NodeId, parent: &NodeId) -> Result<usize> {
        let index = self.tree.node(parent)?.child_count();
        self.insert_node(child, parent, index)?;
        Ok(index)
    }

    /// Detach a node (with its subtree) from its parent
    ///
    /// The node stays available for re-insertion; see
    /// [`discard_node`](Self::discard_node) to drop it for good.
    pub fn remove_node(&mut self, child: &NodeId) -> Result<(NodeId, usize)> {
        self.sweep_if_idle();
        let (parent, index) = self.tree.remove(child)?;
        self.bus.emit(Change::NodeRemoved {
            node: child.clone(),
            parent: parent.clone(),
            index,
        });
        Ok((parent, index))
    }

    /// Move a node; returns its former parent and index
    pub fn move_node(&mut self, child: &NodeId, new_parent: &NodeId, index: usize) -> Result<(NodeId, usize)> {
        self.sweep_if_idle();
        let (old_parent, old_index) = self.tree.move_to(child, new_parent, index)?;
        self.bus.emit(Change::NodeRemoved {
            node: child.clone(),
            parent: old_parent.clone(),
            index: old_index,
        });
        self.bus.emit(Change::NodeInserted {
            node: child.clone(),
            parent: new_parent.clone(),
            index,
        });
        Ok((old_parent, old_index))
    }

    /// Destroy a detached node and its descendants
    pub fn discard_node(&mut self, id: &NodeId) -> Result<()> {
        let subtree = self.tree.take_subtree(id)?;
        log::debug!("Discarded {} detached node(s) under {}", subtree.len(), id);
        drop(subtree);
        self.sweep_if_idle();
        Ok(())
    }

    // === PROPERTIES ===

    /// Attach a property, replacing and returning any of the same kind
    pub fn set_property(
        &mut self,
        node: &NodeId,
        property: Box<dyn Property>,
    ) -> Result<Option<Box<dyn Property>>> {
        self.sweep_if_idle();
        self.tree.node(node)?;
        if let Some(channels) = property.as_any().downcast_ref::<ChannelsProperty>() {
            for (channel, media) in channels.iter() {
                self.check_media(channel, media)?;
            }
        }
        let kind = property.qualified_name();
        let previous = self.tree.node_mut(node)?.properties_mut().set(property);
        self.bus.emit(Change::PropertySet {
            node: node.clone(),
            kind,
        });
        Ok(previous)
    }

    /// Detach the property of `kind`; `NotFound` if the node has none
    pub fn remove_property(&mut self, node: &NodeId, kind: &QualifiedName) -> Result<Box<dyn Property>> {
        self.sweep_if_idle();
        let removed = self
            .tree
            .node_mut(node)?
            .properties_mut()
            .remove(kind)
            .ok_or_else(|| Error::not_found(format!("{} property on node {}", kind, node)))?;
        self.bus.emit(Change::PropertyRemoved {
            node: node.clone(),
            kind: kind.clone(),
        });
        Ok(removed)
    }

    fn check_media(&self, channel: &ChannelId, media: &Media) -> Result<()> {
        let target = self
            .channels
            .get(channel)
            .ok_or_else(|| Error::not_found(format!("channel {}", channel)))?;
        if !target.kind().accepts(media.kind()) {
            return Err(Error::structural(format!(
                "channel {:?} cannot carry {:?} media",
                target.name(),
                media.kind()
            )));
        }
        if let Some(data) = media.media_data() {
            if !self.media_data.owns(data) {
                return Err(Error::structural(format!(
                    "media data {} does not belong to presentation {}",
                    data.id(),
                    self.id
                )));
            }
        }
        Ok(())
    }

    /// Bind media to a channel of a node, or unbind with `None`
    ///
    /// Replaces any existing binding and returns it. Announces one
    /// `MediaMapped` change carrying both the new and the previous media.
    /// A node without a channels property gets one.
    pub fn set_media(
        &mut self,
        node: &NodeId,
        channel: &ChannelId,
        media: Option<Media>,
    ) -> Result<Option<Media>> {
        self.sweep_if_idle();
        self.tree.node(node)?;
        match &media {
            Some(media) => self.check_media(channel, media)?,
            None if !self.channels.contains(channel) => {
                return Err(Error::not_found(format!("channel {}", channel)));
            }
            None => {}
        }

        let properties = self.tree.node_mut(node)?.properties_mut();
        let created = properties.get_as::<ChannelsProperty>().is_none();
        if created {
            if media.is_none() {
                return Ok(None);
            }
            properties.set(Box::new(ChannelsProperty::new()));
        }
        let previous = properties
            .get_as_mut::<ChannelsProperty>()
            .map(|p| p.set_media(channel.clone(), media.clone()))
            .ok_or_else(|| Error::not_found(format!("channels property on node {}", node)))?;

        if created {
            self.bus.emit(Change::PropertySet {
                node: node.clone(),
                kind: ChannelsProperty::kind(),
            });
        }
        if media.is_some() || previous.is_some() {
            self.bus.emit(Change::MediaMapped {
                node: node.clone(),
                channel: channel.clone(),
                media,
                previous: previous.clone(),
            });
        }
        Ok(previous)
    }

    // === CHANNELS ===

    pub fn add_channel(&mut self, channel: Channel) -> Result<ChannelId> {
        self.sweep_if_idle();
        let id = channel.id().clone();
        self.channels.add_channel(channel)?;
        self.bus.emit(Change::ChannelAdded { channel: id.clone() });
        Ok(id)
    }

    pub fn rename_channel(&mut self, id: &ChannelId, name: &str) -> Result<String> {
        self.sweep_if_idle();
        let previous = self.channels.rename_channel(id, name)?;
        self.bus.emit(Change::ChannelRenamed {
            channel: id.clone(),
            name: name.to_string(),
            previous: previous.clone(),
        });
        Ok(previous)
    }

    /// Remove a channel after clearing its bindings on every node
    pub fn remove_channel(&mut self, id: &ChannelId) -> Result<RemovedChannel> {
        self.sweep_if_idle();
        if !self.channels.contains(id) {
            return Err(Error::not_found(format!("channel {}", id)));
        }
        let mut mappings = Vec::new();
        for node in self.tree.all_ids() {
            let cleared = self
                .tree
                .get_mut(&node)
                .and_then(|n| n.properties_mut().get_as_mut::<ChannelsProperty>())
                .and_then(|p| p.set_media(id.clone(), None));
            if let Some(previous) = cleared {
                self.bus.emit(Change::MediaMapped {
                    node: node.clone(),
                    channel: id.clone(),
                    media: None,
                    previous: Some(previous.clone()),
                });
                mappings.push((node, previous));
            }
        }
        let (index, channel) = self.channels.remove_channel(id)?;
        self.bus.emit(Change::ChannelRemoved { channel: id.clone() });
        Ok(RemovedChannel {
            index,
            channel,
            mappings,
        })
    }

    /// Undo a `remove_channel`
    pub(crate) fn restore_channel(&mut self, removed: RemovedChannel) -> Result<()> {
        let id = removed.channel.id().clone();
        self.channels.insert_channel(removed.index, removed.channel)?;
        self.bus.emit(Change::ChannelAdded { channel: id.clone() });
        for (node, media) in removed.mappings {
            self.set_media(&node, &id, Some(media))?;
        }
        Ok(())
    }

    // === METADATA ===

    pub fn add_metadata(&mut self, entry: MetadataEntry) -> Result<MetadataId> {
        self.sweep_if_idle();
        let id = entry.id().clone();
        self.metadata.push(entry)?;
        self.bus.emit(Change::MetadataAdded { id: id.clone() });
        Ok(id)
    }

    pub(crate) fn insert_metadata(&mut self, index: usize, entry: MetadataEntry) -> Result<()> {
        let id = entry.id().clone();
        self.metadata.insert(index, entry)?;
        self.bus.emit(Change::MetadataAdded { id });
        Ok(())
    }

    pub fn remove_metadata(&mut self, id: &MetadataId) -> Result<(usize, MetadataEntry)> {
        self.sweep_if_idle();
        let removed = self.metadata.remove(id)?;
        self.bus.emit(Change::MetadataRemoved { id: id.clone() });
        Ok(removed)
    }

    /// Replace an entry's content, returning the previous content
    pub fn set_metadata_content(&mut self, id: &MetadataId, content: &str) -> Result<String> {
        self.sweep_if_idle();
        let previous = self.metadata.set_content(id, content)?;
        self.bus.emit(Change::MetadataChanged {
            id: id.clone(),
            previous: previous.clone(),
        });
        Ok(previous)
    }

    // === MEDIA DATA & PROVIDERS ===

    /// Allocate a data provider; its file appears on first write
    ///
    /// A provider that no media data uses is collected by the next sweep, so
    /// bind it with [`add_media_data`](Self::add_media_data) before making
    /// other edits, or build everything inside [`batch`](Self::batch).
    pub fn create_data_provider(&mut self, mime_type: &str) -> DataProviderId {
        self.sweep_if_idle();
        let id = self.data_providers.create_data_provider(mime_type);
        self.bus.emit(Change::DataProviderAdded { id: id.clone() });
        id
    }

    pub fn create_data_provider_with_id(&mut self, id: DataProviderId, mime_type: &str) -> Result<DataProviderId> {
        self.sweep_if_idle();
        let id = self.data_providers.create_data_provider_with_id(id, mime_type)?;
        self.bus.emit(Change::DataProviderAdded { id: id.clone() });
        Ok(id)
    }

    /// Copy an external file into a new data provider
    pub fn import_file(
        &mut self,
        source: &Path,
        mime_type: Option<&str>,
        progress: &mut ProgressNotifier,
    ) -> Result<DataProviderId> {
        self.sweep_if_idle();
        let id = self.data_providers.import_file(source, mime_type, progress)?;
        self.bus.emit(Change::DataProviderAdded { id: id.clone() });
        Ok(id)
    }

    /// Replace a provider's bytes
    pub fn write_data(&mut self, id: &DataProviderId, bytes: &[u8]) -> Result<()> {
        self.data_providers.write_all(id, bytes)
    }

    /// Append to a provider through a scoped writer
    pub fn append_data<R>(&mut self, id: &DataProviderId, f: impl FnOnce(&mut dyn Write) -> Result<R>) -> Result<R> {
        self.data_providers.with_appender(id, f)
    }

    /// Register a media data and take the first reference to it
    ///
    /// Every provider it names must already be managed here. Dropping the
    /// returned ref without binding it leaves the media data unreferenced.
    pub fn add_media_data(&mut self, data: MediaData) -> Result<MediaDataRef> {
        if let Some(missing) = data.providers().iter().find(|p| !self.data_providers.contains(p)) {
            return Err(Error::not_found(format!(
                "data provider {} used by media data {}",
                missing,
                data.id()
            )));
        }
        let id = data.id().clone();
        self.media_data.add_media_data(data)?;
        self.bus.emit(Change::MediaDataAdded { id: id.clone() });
        self.media_data.reference(&id)
    }

    /// Collect unreferenced media data and unused data providers
    ///
    /// Does nothing inside a deferred scope.
    pub fn collect_orphans(&mut self) -> Result<OrphanReport> {
        if self.data_providers.is_deferred() {
            return Ok(OrphanReport::default());
        }
        let media_data: Vec<MediaDataId> = self
            .media_data
            .collect_unreferenced()
            .into_iter()
            .map(|data| data.id().clone())
            .collect();
        let referenced = self.media_data.referenced_providers();
        let data_providers = self.data_providers.remove_unreferenced(&referenced)?;

        for id in &media_data {
            self.bus.emit(Change::MediaDataRemoved { id: id.clone() });
        }
        for id in &data_providers {
            self.bus.emit(Change::DataProviderRemoved { id: id.clone() });
        }
        let report = OrphanReport {
            media_data,
            data_providers,
        };
        if !report.is_empty() {
            log::info!(
                "Collected {} media data and {} data provider(s) from presentation {}",
                report.media_data.len(),
                report.data_providers.len(),
                self.id
            );
        }
        Ok(report)
    }

    fn sweep_if_idle(&mut self) {
        if let Err(e) = self.collect_orphans() {
            log::warn!("Orphan sweep in presentation {} failed: {}", self.id, e);
        }
    }

    // === DEFERRED SCOPES ===

    /// Postpone orphan sweeps until the matching `exit_deferred`
    pub fn enter_deferred(&mut self) {
        self.data_providers.enter_deferred();
    }

    /// Close a deferred scope; closing the outermost one sweeps
    pub fn exit_deferred(&mut self) -> Result<OrphanReport> {
        if self.data_providers.exit_deferred() {
            self.collect_orphans()
        } else {
            Ok(OrphanReport::default())
        }
    }

    pub fn is_deferred(&self) -> bool {
        self.data_providers.is_deferred()
    }

    /// Run `f` in a deferred scope, sweeping once afterwards
    pub fn batch<R>(&mut self, f: impl FnOnce(&mut Self) -> Result<R>) -> Result<R> {
        self.enter_deferred();
        let outcome = f(self);
        let swept = self.exit_deferred();
        let value = outcome?;
        swept?;
        Ok(value)
    }

    fn run_deferred(&mut self, f: impl FnOnce(&mut Self) -> Result<()>) -> Result<()> {
        self.enter_deferred();
        let outcome = f(self);
        if let Err(e) = self.exit_deferred() {
            log::warn!("Orphan sweep in presentation {} failed: {}", self.id, e);
        }
        outcome
    }

    // === UNDO / REDO ===

    /// Apply a command and record it for undo
    ///
    /// On failure the command is dropped and the history is unchanged.
    pub fn execute(&mut self, mut command: Box<dyn Command>) -> Result<()> {
        self.history.begin()?;
        let outcome = self.run_deferred(|p| command.apply(p));
        self.history.end();
        outcome?;
        log::debug!("Executed {:?}", command.description());
        self.history.push_executed(command);
        Ok(())
    }

    /// Invert the most recent command; `NotFound` if there is none
    pub fn undo(&mut self) -> Result<()> {
        self.history.begin()?;
        let mut command = match self.history.pop_undo() {
            Ok(command) => command,
            Err(e) => {
                self.history.end();
                return Err(e);
            }
        };
        let outcome = self.run_deferred(|p| command.invert(p));
        self.history.end();
        match outcome {
            Ok(()) => {
                log::debug!("Undid {:?}", command.description());
                self.history.push_redo(command);
                Ok(())
            }
            Err(e) => {
                self.history.push_undo(command);
                Err(e)
            }
        }
    }

    /// Re-apply the most recently undone command; `NotFound` if there is none
    pub fn redo(&mut self) -> Result<()> {
        self.history.begin()?;
        let mut command = match self.history.pop_redo() {
            Ok(command) => command,
            Err(e) => {
                self.history.end();
                return Err(e);
            }
        };
        let outcome = self.run_deferred(|p| command.apply(p));
        self.history.end();
        match outcome {
            Ok(()) => {
                log::debug!("Redid {:?}", command.description());
                self.history.push_undo(command);
                Ok(())
            }
            Err(e) => {
                self.history.push_redo(command);
                Err(e)
            }
        }
    }
}

/// Observable equality: ids, tree, channels, media, providers and metadata.
/// History, listeners and the dirty flag are not compared.
impl PartialEq for Presentation {
    fn eq(&self, other: &Self) -> bool {
        let providers = |p: &Presentation| {
            p.data_providers
                .iter()
                .map(|d| (d.id().clone(), d.mime_type().to_string()))
                .collect::<Vec<_>>()
        };
        self.id == other.id
            && self.name == other.name
            && self.tree == other.tree
            && self.channels == other.channels
            && self.media_data == other.media_data
            && providers(self) == providers(other)
            && self.metadata == other.metadata
    }
}
