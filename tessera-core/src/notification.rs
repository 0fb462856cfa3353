//! Change notification bus
//!
//! Every mutation of the content model is announced twice: first as a
//! specific [`Change`] describing what happened, then as a generic
//! [`Notification::Changed`] naming only where it happened. Listeners run
//! synchronously, in subscription order.
//!
//! A presentation's bus can be attached to its project's bus; notifications
//! then bubble upward once the local listeners have run.

use crate::factory::QualifiedName;
use crate::ids::{ChannelId, DataProviderId, MediaDataId, MetadataId, NodeId, PresentationId};
use crate::media::Media;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

/// A specific mutation of the content model
#[derive(Clone, Debug)]
pub enum Change {
    RootSet {
        node: NodeId,
    },
    NodeInserted {
        node: NodeId,
        parent: NodeId,
        index: usize,
    },
    NodeRemoved {
        node: NodeId,
        parent: NodeId,
        index: usize,
    },
    PropertySet {
        node: NodeId,
        kind: QualifiedName,
    },
    PropertyRemoved {
        node: NodeId,
        kind: QualifiedName,
    },
    /// A channel of a node was bound to new media (or unbound)
    MediaMapped {
        node: NodeId,
        channel: ChannelId,
        media: Option<Media>,
        previous: Option<Media>,
    },
    ChannelAdded {
        channel: ChannelId,
    },
    ChannelRemoved {
        channel: ChannelId,
    },
    ChannelRenamed {
        channel: ChannelId,
        name: String,
        previous: String,
    },
    MetadataAdded {
        id: MetadataId,
    },
    MetadataRemoved {
        id: MetadataId,
    },
    MetadataChanged {
        id: MetadataId,
        previous: String,
    },
    MediaDataAdded {
        id: MediaDataId,
    },
    MediaDataRemoved {
        id: MediaDataId,
    },
    DataProviderAdded {
        id: DataProviderId,
    },
    DataProviderRemoved {
        id: DataProviderId,
    },
    PresentationAdded {
        id: PresentationId,
    },
    PresentationRemoved {
        id: PresentationId,
    },
}

/// The entity a change happened to
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Entity {
    Node(NodeId),
    Channel(ChannelId),
    Metadata(MetadataId),
    MediaData(MediaDataId),
    DataProvider(DataProviderId),
    Presentation(PresentationId),
}

impl Change {
    /// The entity this change belongs to
    pub fn entity(&self) -> Entity {
        match self {
            Change::RootSet { node }
            | Change::PropertySet { node, .. }
            | Change::PropertyRemoved { node, .. }
            | Change::MediaMapped { node, .. } => Entity::Node(node.clone()),
            // Structural changes are reported against the parent that owns the children list
            Change::NodeInserted { parent, .. } | Change::NodeRemoved { parent, .. } => {
                Entity::Node(parent.clone())
            }
            Change::ChannelAdded { channel }
            | Change::ChannelRemoved { channel }
            | Change::ChannelRenamed { channel, .. } => Entity::Channel(channel.clone()),
            Change::MetadataAdded { id }
            | Change::MetadataRemoved { id }
            | Change::MetadataChanged { id, .. } => Entity::Metadata(id.clone()),
            Change::MediaDataAdded { id } | Change::MediaDataRemoved { id } => {
                Entity::MediaData(id.clone())
            }
            Change::DataProviderAdded { id } | Change::DataProviderRemoved { id } => {
                Entity::DataProvider(id.clone())
            }
            Change::PresentationAdded { id } | Change::PresentationRemoved { id } => {
                Entity::Presentation(id.clone())
            }
        }
    }
}

/// Where a change happened
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Origin {
    /// Presentation that emitted the change, `None` for project-level changes
    pub presentation: Option<PresentationId>,
    pub entity: Entity,
}

/// What listeners receive
#[derive(Clone, Debug)]
pub enum Notification {
    /// The specific change, always delivered first
    Change(Change),
    /// Generic "something changed" that follows every specific change
    Changed(Origin),
}

/// Handle returned by `subscribe`, used to unsubscribe
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Arc<dyn Fn(&Notification) + Send + Sync>;

#[derive(Default)]
struct BusInner {
    listeners: RwLock<Vec<(SubscriptionId, Listener)>>,
    next_id: AtomicU64,
    parent: RwLock<Option<NotificationBus>>,
    presentation: RwLock<Option<PresentationId>>,
}

/// Synchronous publish/subscribe bus
///
/// Cloning is cheap and yields a handle to the same bus.
#[derive(Clone, Default)]
pub struct NotificationBus {
    inner: Arc<BusInner>,
}

impl NotificationBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bus whose changes are attributed to a presentation
    pub(crate) fn for_presentation(id: PresentationId) -> Self {
        let bus = Self::new();
        *bus.inner.presentation.write().unwrap_or_else(|e| e.into_inner()) = Some(id);
        bus
    }

    /// Subscribe to every notification, specific and generic
    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&Notification) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        self.inner
            .listeners
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push((id, Arc::new(listener)));
        id
    }

    /// Subscribe to specific changes only
    pub fn subscribe_changes<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&Change) + Send + Sync + 'static,
    {
        self.subscribe(move |notification| {
            if let Notification::Change(change) = notification {
                listener(change);
            }
        })
    }

    /// Subscribe to the generic changed notification only
    pub fn subscribe_changed<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&Origin) + Send + Sync + 'static,
    {
        self.subscribe(move |notification| {
            if let Notification::Changed(origin) = notification {
                listener(origin);
            }
        })
    }

    /// Remove a listener; returns false if it was not subscribed
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.inner.listeners.write().unwrap_or_else(|e| e.into_inner());
        let before = listeners.len();
        listeners.retain(|(sid, _)| *sid != id);
        listeners.len() != before
    }

    pub fn listener_count(&self) -> usize {
        self.inner.listeners.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Forward everything this bus dispatches to `parent` as well
    pub(crate) fn set_parent(&self, parent: Option<NotificationBus>) {
        *self.inner.parent.write().unwrap_or_else(|e| e.into_inner()) = parent;
    }

    /// Announce a change: the specific notification, then the generic one
    pub fn emit(&self, change: Change) {
        let origin = Origin {
            presentation: self
                .inner
                .presentation
                .read()
                .unwrap_or_else(|e| e.into_inner())
                .clone(),
            entity: change.entity(),
        };
        self.dispatch(&Notification::Change(change));
        self.dispatch(&Notification::Changed(origin));
    }

    fn dispatch(&self, notification: &Notification) {
        // Snapshot so listeners may subscribe or unsubscribe while being called
        let listeners: Vec<Listener> = self
            .inner
            .listeners
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in listeners {
            listener(notification);
        }

        let parent = self.inner.parent.read().unwrap_or_else(|e| e.into_inner()).clone();
        if let Some(parent) = parent {
            parent.dispatch(notification);
        }
    }
}

impl std::fmt::Debug for NotificationBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationBus")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn channel_added(id: &str) -> Change {
        Change::ChannelAdded {
            channel: ChannelId::new(id),
        }
    }

    #[test]
    fn test_specific_then_generic_in_subscription_order() {
        let bus = NotificationBus::for_presentation(PresentationId::new("p1"));
        let log = Arc::new(Mutex::new(Vec::new()));

        let first = Arc::clone(&log);
        bus.subscribe(move |n| {
            let tag = match n {
                Notification::Change(_) => "first:change",
                Notification::Changed(_) => "first:changed",
            };
            first.lock().unwrap().push(tag);
        });
        let second = Arc::clone(&log);
        bus.subscribe(move |n| {
            let tag = match n {
                Notification::Change(_) => "second:change",
                Notification::Changed(_) => "second:changed",
            };
            second.lock().unwrap().push(tag);
        });

        bus.emit(channel_added("c1"));

        assert_eq!(
            *log.lock().unwrap(),
            vec!["first:change", "second:change", "first:changed", "second:changed"]
        );
    }

    #[test]
    fn test_generic_origin_names_presentation_and_entity() {
        let bus = NotificationBus::for_presentation(PresentationId::new("p1"));
        let seen = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&seen);
        bus.subscribe_changed(move |origin| {
            *sink.lock().unwrap() = Some(origin.clone());
        });

        bus.emit(channel_added("c9"));

        let origin = seen.lock().unwrap().clone().unwrap();
        assert_eq!(origin.presentation, Some(PresentationId::new("p1")));
        assert_eq!(origin.entity, Entity::Channel(ChannelId::new("c9")));
    }

    #[test]
    fn test_bubbles_to_parent_after_local_listeners() {
        let project_bus = NotificationBus::new();
        let bus = NotificationBus::new();
        bus.set_parent(Some(project_bus.clone()));

        let log = Arc::new(Mutex::new(Vec::new()));
        let local = Arc::clone(&log);
        bus.subscribe_changes(move |_| local.lock().unwrap().push("local"));
        let parent = Arc::clone(&log);
        project_bus.subscribe_changes(move |_| parent.lock().unwrap().push("parent"));

        bus.emit(channel_added("c1"));
        assert_eq!(*log.lock().unwrap(), vec!["local", "parent"]);
    }

    #[test]
    fn test_unsubscribe() {
        let bus = NotificationBus::new();
        let count = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&count);
        let id = bus.subscribe(move |_| {
            counter.fetch_add(1, Ordering::Relaxed);
        });

        bus.emit(channel_added("c1"));
        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        bus.emit(channel_added("c2"));

        assert_eq!(count.load(Ordering::Relaxed), 2);
        assert_eq!(bus.listener_count(), 0);
    }
}
