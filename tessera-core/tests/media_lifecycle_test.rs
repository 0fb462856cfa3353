//! Integration tests for media data lifetime and the document tree
//!
//! Media data live exactly as long as something refers to them; these tests
//! drive that through commands, direct edits and channel removal, and check
//! tree traversal order along the way.

use std::sync::{Arc, Mutex};
use tessera_core::commands::{ImportMediaCommand, ImportSource, RemoveChannelCommand, SetMediaCommand};
use tessera_core::notification::Entity;
use tessera_core::tree::{TreeNode, TreeVisitor};
use tessera_core::{
    Change, Channel, ChannelKind, MediaData, MediaDataId, MediaDataKind, MetadataEntry, NodeId,
    Notification, PcmFormat, Presentation,
};

fn setup() -> (tempfile::TempDir, Presentation, NodeId) {
    let dir = tempfile::tempdir().unwrap();
    let mut presentation = Presentation::new("Lifecycle", dir.path().join("data"));
    let root = presentation.create_root().unwrap();
    (dir, presentation, root)
}

fn import_audio(node: &NodeId, channel: &tessera_core::ChannelId, bytes: usize) -> ImportMediaCommand {
    ImportMediaCommand::new(
        node.clone(),
        channel.clone(),
        ImportSource::Bytes(vec![0u8; bytes]),
        "audio/x-wav",
        MediaDataKind::Audio(PcmFormat::default()),
    )
}

#[test]
fn test_import_then_undo_collects_media() {
    let (_dir, mut p, root) = setup();
    let audio = p.add_channel(Channel::new("Audio", ChannelKind::Audio)).unwrap();
    let command = import_audio(&root, &audio, 1_000);
    let data = command.media_data().clone();
    let provider = command.provider().clone();

    p.execute(Box::new(command)).unwrap();
    assert!(p.get_media(&root, &audio).unwrap().is_some());

    p.undo().unwrap();
    assert_eq!(p.get_media(&root, &audio).unwrap(), None);
    assert!(!p.media_data().contains(&data));
    assert!(!p.data_providers().contains(&provider));
}

#[test]
fn test_replaced_media_lives_while_undo_can_restore_it() {
    let (_dir, mut p, root) = setup();
    let audio = p.add_channel(Channel::new("Audio", ChannelKind::Audio)).unwrap();
    let first = import_audio(&root, &audio, 100);
    let first_data = first.media_data().clone();
    p.execute(Box::new(first)).unwrap();

    // Replacing the binding keeps the old media data alive inside the
    // undo history
    let second = import_audio(&root, &audio, 200);
    let second_data = second.media_data().clone();
    p.execute(Box::new(second)).unwrap();
    assert!(p.media_data().contains(&first_data));
    assert_eq!(p.media_data().reference_count(&first_data).unwrap(), 1);

    p.undo().unwrap();
    let restored = p.get_media(&root, &audio).unwrap().unwrap();
    assert_eq!(restored.media_data().unwrap().id(), &first_data);
    assert!(!p.media_data().contains(&second_data));

    // Dropping the history releases nothing still bound
    p.history_mut().clear_history();
    p.collect_orphans().unwrap();
    assert!(p.media_data().contains(&first_data));
}

#[test]
fn test_unbinding_outside_history_collects_on_demand() {
    let (_dir, mut p, root) = setup();
    let audio = p.add_channel(Channel::new("Audio", ChannelKind::Audio)).unwrap();
    let command = import_audio(&root, &audio, 10);
    let data = command.media_data().clone();
    p.execute(Box::new(command)).unwrap();
    p.history_mut().clear_history();

    let previous = p.set_media(&root, &audio, None).unwrap();
    // The returned media still holds a reference
    assert!(p.media_data().contains(&data));
    drop(previous);
    let report = p.collect_orphans().unwrap();
    assert_eq!(report.media_data, vec![data.clone()]);
    assert_eq!(report.data_providers.len(), 1);
}

#[test]
fn test_next_edit_collects_released_media() {
    let (_dir, mut p, root) = setup();
    let audio = p.add_channel(Channel::new("Audio", ChannelKind::Audio)).unwrap();
    let command = import_audio(&root, &audio, 10);
    let data = command.media_data().clone();
    p.execute(Box::new(command)).unwrap();
    p.history_mut().clear_history();

    drop(p.set_media(&root, &audio, None).unwrap());
    p.add_metadata(MetadataEntry::new("dc:title", "Untitled")).unwrap();
    assert!(!p.media_data().contains(&data));
    assert!(p.data_providers().is_empty());

    let child = p.create_node();
    p.append_node(&child, &root).unwrap();
    assert!(p.collect_orphans().unwrap().is_empty());
}

#[test]
fn test_removing_channel_drops_and_restores_bindings() {
    let (_dir, mut p, root) = setup();
    let audio = p.add_channel(Channel::new("Audio", ChannelKind::Audio)).unwrap();
    let child = p.create_node();
    p.append_node(&child, &root).unwrap();
    let command = import_audio(&child, &audio, 10);
    let data = command.media_data().clone();
    p.execute(Box::new(command)).unwrap();

    p.execute(Box::new(RemoveChannelCommand::new(audio.clone()))).unwrap();
    assert!(p.channels().is_empty());
    // Held by the removal command for undo
    assert!(p.media_data().contains(&data));

    p.undo().unwrap();
    assert_eq!(p.channels().index_of(&audio), Some(0));
    let media = p.get_media(&child, &audio).unwrap().unwrap();
    assert_eq!(media.media_data().unwrap().id(), &data);
}

#[test]
fn test_batch_defers_collection() {
    let (_dir, mut p, root) = setup();
    let audio = p.add_channel(Channel::new("Audio", ChannelKind::Audio)).unwrap();

    let bound = p
        .batch(|p| {
            let provider = p.create_data_provider("audio/x-wav");
            p.write_data(&provider, &[0u8; 16])?;
            let data = p.add_media_data(MediaData::audio(
                MediaDataId::generate(),
                "audio/x-wav",
                PcmFormat::default(),
                vec![provider],
            ))?;
            let id = data.id().clone();
            drop(data);
            // Unreferenced, but nothing is collected inside the batch
            p.collect_orphans()?;
            assert!(p.media_data().contains(&id));
            let data = p.reference(&id)?;
            p.set_media(&root, &audio, Some(tessera_core::Media::audio(data)))?;
            Ok(id)
        })
        .unwrap();

    assert!(p.media_data().contains(&bound));
    assert_eq!(p.data_providers().len(), 1);
}

#[test]
fn test_set_media_announces_previous_binding() {
    let (_dir, mut p, root) = setup();
    let text = p.add_channel(Channel::new("Text", ChannelKind::Text)).unwrap();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let log = seen.clone();
    p.bus().subscribe(move |notification| log.lock().unwrap().push(notification.clone()));

    p.execute(Box::new(SetMediaCommand::new(
        root.clone(),
        text.clone(),
        Some(tessera_core::Media::text("one")),
    )))
    .unwrap();
    seen.lock().unwrap().clear();
    p.execute(Box::new(SetMediaCommand::new(
        root.clone(),
        text.clone(),
        Some(tessera_core::Media::text("two")),
    )))
    .unwrap();

    let seen = seen.lock().unwrap();
    let mapped: Vec<_> = seen
        .iter()
        .filter_map(|n| match n {
            Notification::Change(Change::MediaMapped { media, previous, .. }) => {
                Some((media.clone(), previous.clone()))
            }
            _ => None,
        })
        .collect();
    assert_eq!(
        mapped,
        vec![(
            Some(tessera_core::Media::text("two")),
            Some(tessera_core::Media::text("one"))
        )]
    );
    assert!(seen.iter().any(|n| matches!(
        n,
        Notification::Changed(origin) if origin.entity == Entity::Node(root.clone())
    )));
}

/// Records pre-order entries and post-order exits
#[derive(Default)]
struct Trace {
    events: Vec<String>,
    skip: Option<NodeId>,
}

impl TreeVisitor for Trace {
    fn pre_visit(&mut self, node: &TreeNode) -> bool {
        self.events.push(format!("enter {}", node.id()));
        self.skip.as_ref() != Some(node.id())
    }

    fn post_visit(&mut self, node: &TreeNode) {
        self.events.push(format!("leave {}", node.id()));
    }
}

#[test]
fn test_visitor_order_and_pruning() {
    let (_dir, mut p, root) = setup();
    let a = p.create_node();
    let b = p.create_node();
    let a1 = p.create_node();
    p.append_node(&a, &root).unwrap();
    p.append_node(&b, &root).unwrap();
    p.append_node(&a1, &a).unwrap();

    let mut trace = Trace::default();
    p.tree().accept(&mut trace);
    assert_eq!(
        trace.events,
        vec![
            format!("enter {}", root),
            format!("enter {}", a),
            format!("enter {}", a1),
            format!("leave {}", a1),
            format!("leave {}", a),
            format!("enter {}", b),
            format!("leave {}", b),
            format!("leave {}", root),
        ]
    );

    let mut pruned = Trace {
        skip: Some(a.clone()),
        ..Trace::default()
    };
    p.tree().accept(&mut pruned);
    assert!(!pruned.events.contains(&format!("enter {}", a1)));
    assert!(!pruned.events.contains(&format!("leave {}", a)));

    let order: Vec<NodeId> = p.tree().iter().map(|n| n.id().clone()).collect();
    assert_eq!(order, vec![root, a, a1, b]);
}

#[test]
fn test_insert_then_remove_restores_tree() {
    let (_dir, mut p, root) = setup();
    let existing = p.create_node();
    p.append_node(&existing, &root).unwrap();
    let before = p.tree().clone();

    let node = p.create_node();
    p.insert_node(&node, &root, 0).unwrap();
    assert_eq!(p.node(&root).unwrap().index_of(&existing), Some(1));
    assert_eq!(p.remove_node(&node).unwrap(), (root.clone(), 0));
    p.discard_node(&node).unwrap();

    assert_eq!(p.tree(), &before);
    assert!(!p.tree().contains(&node));
}
