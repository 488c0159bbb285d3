// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use super::{GraphCache, GraphEvent, GRAPH_EVENT_QUEUE_DEPTH};
use crate::endpoint::{
    EndpointType, CREATED_BY_BARE_DDS_APP, NODE_NAMESPACE_UNKNOWN, NODE_NAME_UNKNOWN,
};
use crate::error::Error;
use crate::gid::{Gid, RMW_GID_STORAGE_SIZE};
use crate::msg::{NodeEntitiesInfo, ParticipantEntitiesInfo};
use crate::qos::{QosProfile, ReliabilityPolicy};
use crate::type_hash::TypeHash;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

fn gid(seed: u8) -> Gid {
    let mut bytes = [0u8; RMW_GID_STORAGE_SIZE];
    bytes[0] = seed;
    Gid::new(bytes)
}

fn identity(name: &str) -> String {
    name.to_string()
}

fn counting_cache() -> (GraphCache, Arc<AtomicUsize>) {
    let cache = GraphCache::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    cache.set_on_change_callback(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    (cache, calls)
}

fn add_default_writer(cache: &GraphCache, writer: Gid, topic: &str, participant: Gid) -> bool {
    cache.add_writer(
        writer,
        topic,
        "std_msgs/String",
        TypeHash::zero(),
        participant,
        QosProfile::default(),
    )
}

#[test]
fn test_add_writer_twice_keeps_first_entry() {
    let (cache, calls) = counting_cache();
    let best_effort = QosProfile::default().reliability(ReliabilityPolicy::BestEffort);

    assert!(cache.add_writer(gid(1), "/chatter", "first", TypeHash::zero(), gid(10), best_effort));
    assert!(!cache.add_writer(
        gid(1),
        "/other",
        "second",
        TypeHash::zero(),
        gid(11),
        QosProfile::default()
    ));
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let info = cache.writer_info(&gid(1)).expect("writer stored");
    assert_eq!(info.topic_name, "/chatter");
    assert_eq!(info.topic_type, "first");
    assert_eq!(info.participant_gid, gid(10));
    assert_eq!(info.qos, best_effort);
}

#[test]
fn test_remove_writer_updates_count() {
    let (cache, calls) = counting_cache();
    add_default_writer(&cache, gid(1), "/chatter", gid(10));
    add_default_writer(&cache, gid(2), "/chatter", gid(10));
    assert_eq!(cache.get_writer_count("/chatter"), 2);

    assert!(cache.remove_writer(&gid(1)));
    assert_eq!(cache.get_writer_count("/chatter"), 1);
    assert!(!cache.remove_writer(&gid(1)));
    assert_eq!(cache.get_writer_count("/chatter"), 1);
    // add, add, remove: the failed removal does not notify
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[test]
fn test_readers_and_writers_are_separate_maps() {
    let cache = GraphCache::new();
    assert!(cache.add_reader(
        gid(1),
        "/chatter",
        "std_msgs/String",
        TypeHash::zero(),
        gid(10),
        QosProfile::default()
    ));
    assert!(add_default_writer(&cache, gid(1), "/chatter", gid(10)));
    assert_eq!(cache.get_reader_count("/chatter"), 1);
    assert_eq!(cache.get_writer_count("/chatter"), 1);

    assert!(cache.remove_entity(&gid(1), EndpointType::Subscription));
    assert!(cache.reader_info(&gid(1)).is_none());
    assert!(cache.writer_info(&gid(1)).is_some());
}

#[test]
fn test_counts_match_topic_exactly() {
    let cache = GraphCache::new();
    add_default_writer(&cache, gid(1), "/chatter", gid(10));
    add_default_writer(&cache, gid(2), "/chatter2", gid(10));
    assert_eq!(cache.get_writer_count("/chatter"), 1);
    assert_eq!(cache.get_writer_count("/chat"), 0);
    assert_eq!(cache.get_reader_count("/chatter"), 0);
}

#[test]
fn test_add_participant_always_notifies() {
    let (cache, calls) = counting_cache();
    cache.add_participant(gid(10), "/a");
    cache.add_participant(gid(10), "/a");
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    cache.add_participant(gid(10), "/b");
    let info = cache.participant_info(&gid(10)).expect("participant");
    assert_eq!(info.enclave, "/b");
    assert!(info.node_entities_info_seq.is_empty());
}

#[test]
fn test_remove_participant_reports_presence() {
    let (cache, calls) = counting_cache();
    cache.add_participant(gid(10), "/");
    cache.add_node(gid(10), "talker", "/").expect("node");
    assert!(cache.remove_participant(&gid(10)));
    assert!(!cache.remove_participant(&gid(10)));
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(cache.get_number_of_nodes(), 0);
}

#[test]
fn test_add_node_then_remove_node_round_trip() {
    let cache = GraphCache::new();
    cache.add_participant(gid(10), "/");
    cache.add_node(gid(10), "a", "/").expect("a");
    cache.add_node(gid(10), "b", "/").expect("b");
    let before = cache.participant_entities_info(&gid(10)).expect("snapshot");

    let added = cache.add_node(gid(10), "c", "/ns").expect("c");
    assert_eq!(added.node_entities_info_seq.len(), 3);
    assert_eq!(added.node_entities_info_seq[2], NodeEntitiesInfo::new("c", "/ns"));

    let removed = cache.remove_node(gid(10), "c", "/ns").expect("remove");
    assert_eq!(removed, before);
}

#[test]
fn test_duplicate_nodes_first_match_wins() {
    let cache = GraphCache::new();
    cache.add_participant(gid(10), "/");
    cache.add_node(gid(10), "dup", "/").expect("first");
    cache.add_node(gid(10), "dup", "/").expect("second");

    let msg = cache
        .associate_writer(gid(1), gid(10), "dup", "/")
        .expect("associate");
    assert_eq!(msg.node_entities_info_seq[0].writer_gid_seq, vec![gid(1)]);
    assert!(msg.node_entities_info_seq[1].writer_gid_seq.is_empty());

    let msg = cache.remove_node(gid(10), "dup", "/").expect("remove");
    assert_eq!(msg.node_entities_info_seq.len(), 1);
    assert!(msg.node_entities_info_seq[0].writer_gid_seq.is_empty());
}

#[test]
fn test_associate_twice_dissociate_once_leaves_one() {
    let (cache, calls) = counting_cache();
    cache.add_participant(gid(10), "/");
    cache.add_node(gid(10), "talker", "/").expect("node");
    cache
        .associate_writer(gid(1), gid(10), "talker", "/")
        .expect("first");
    cache
        .associate_writer(gid(1), gid(10), "talker", "/")
        .expect("second");

    let msg = cache
        .dissociate_writer(gid(1), gid(10), "talker", "/")
        .expect("dissociate");
    assert_eq!(msg.node_entities_info_seq[0].writer_gid_seq, vec![gid(1)]);

    let msg = cache
        .dissociate_writer(gid(1), gid(10), "talker", "/")
        .expect("dissociate");
    assert!(msg.node_entities_info_seq[0].writer_gid_seq.is_empty());

    // dissociating an absent gid still succeeds and notifies
    let before = calls.load(Ordering::SeqCst);
    let msg = cache
        .dissociate_writer(gid(1), gid(10), "talker", "/")
        .expect("no-op");
    assert!(msg.node_entities_info_seq[0].writer_gid_seq.is_empty());
    assert_eq!(calls.load(Ordering::SeqCst), before + 1);
}

#[test]
fn test_reader_association_round_trip() {
    let cache = GraphCache::new();
    cache.add_participant(gid(10), "/");
    cache.add_node(gid(10), "listener", "/").expect("node");
    let before = cache.participant_entities_info(&gid(10)).expect("snapshot");

    let msg = cache
        .associate_reader(gid(2), gid(10), "listener", "/")
        .expect("associate");
    assert_eq!(msg.node_entities_info_seq[0].reader_gid_seq, vec![gid(2)]);
    assert!(msg.node_entities_info_seq[0].writer_gid_seq.is_empty());

    let msg = cache
        .dissociate_reader(gid(2), gid(10), "listener", "/")
        .expect("dissociate");
    assert_eq!(msg, before);
}

#[test]
fn test_missing_participant_or_node_is_an_error_without_side_effects() {
    let (cache, calls) = counting_cache();

    assert_eq!(
        cache.add_node(gid(10), "talker", "/"),
        Err(Error::ParticipantNotFound(gid(10)))
    );
    assert!(cache.participant_info(&gid(10)).is_none());

    cache.add_participant(gid(10), "/");
    let baseline = calls.load(Ordering::SeqCst);

    assert_eq!(
        cache.associate_writer(gid(1), gid(10), "ghost", "/"),
        Err(Error::NodeNotFound {
            name: "ghost".into(),
            namespace: "/".into()
        })
    );
    assert!(matches!(
        cache.remove_node(gid(10), "ghost", "/"),
        Err(Error::NodeNotFound { .. })
    ));
    assert!(matches!(
        cache.dissociate_reader(gid(1), gid(11), "ghost", "/"),
        Err(Error::ParticipantNotFound(_))
    ));
    assert_eq!(calls.load(Ordering::SeqCst), baseline);
    assert_eq!(cache.get_number_of_nodes(), 0);
}

#[test]
fn test_update_participant_entities_replaces_node_list() {
    let (cache, calls) = counting_cache();
    cache.add_participant(gid(10), "/secure");
    cache.add_node(gid(10), "a", "/").expect("a");
    cache.add_node(gid(10), "b", "/").expect("b");

    cache.update_participant_entities(&ParticipantEntitiesInfo::new(gid(10)));
    let info = cache.participant_info(&gid(10)).expect("participant");
    assert!(info.node_entities_info_seq.is_empty());
    assert_eq!(info.enclave, "/secure");
    assert_eq!(calls.load(Ordering::SeqCst), 4);
}

#[test]
fn test_update_participant_entities_creates_unknown_participant() {
    let cache = GraphCache::new();
    let mut msg = ParticipantEntitiesInfo::new(gid(20));
    let mut node = NodeEntitiesInfo::new("remote", "/r");
    node.writer_gid_seq.push(gid(3));
    msg.node_entities_info_seq.push(node);

    cache.update_participant_entities(&msg);
    let info = cache.participant_info(&gid(20)).expect("created");
    assert_eq!(info.enclave, "");
    assert_eq!(cache.participant_entities_info(&gid(20)), Some(msg));
}

#[test]
fn test_endpoint_info_for_ros_node() {
    let cache = GraphCache::new();
    cache.add_participant(gid(10), "enclave_a");
    let msg = cache.add_node(gid(10), "talker", "/ns").expect("node");
    assert_eq!(
        msg.node_entities_info_seq,
        vec![NodeEntitiesInfo::new("talker", "/ns")]
    );

    let msg = cache
        .associate_writer(gid(1), gid(10), "talker", "/ns")
        .expect("associate");
    assert_eq!(msg.node_entities_info_seq[0].writer_gid_seq, vec![gid(1)]);
    assert!(msg.node_entities_info_seq[0].reader_gid_seq.is_empty());

    add_default_writer(&cache, gid(1), "/chatter", gid(10));
    let infos = cache
        .get_writers_info_by_topic("/chatter", identity)
        .expect("query");
    assert_eq!(infos.len(), 1);
    assert_eq!(infos[0].node_name, "talker");
    assert_eq!(infos[0].node_namespace, "/ns");
    assert_eq!(infos[0].endpoint_type, EndpointType::Publisher);
    assert_eq!(infos[0].endpoint_gid, gid(1));
    assert_eq!(infos[0].topic_type, "std_msgs/String");
}

#[test]
fn test_endpoint_info_sentinels_for_unknown_creators() {
    let cache = GraphCache::new();
    cache.add_participant(gid(10), "/");
    add_default_writer(&cache, gid(1), "/chatter", gid(10));
    add_default_writer(&cache, gid(2), "/chatter", gid(99));

    let infos = cache
        .get_writers_info_by_topic("/chatter", identity)
        .expect("query");
    assert_eq!(infos.len(), 2);
    assert_eq!(infos[0].node_name, NODE_NAME_UNKNOWN);
    assert_eq!(infos[0].node_namespace, NODE_NAMESPACE_UNKNOWN);
    assert_eq!(infos[1].node_name, CREATED_BY_BARE_DDS_APP);
    assert_eq!(infos[1].node_namespace, CREATED_BY_BARE_DDS_APP);
}

#[test]
fn test_endpoint_info_demangles_type_only() {
    let cache = GraphCache::new();
    cache.add_reader(
        gid(5),
        "rt/chatter",
        "std_msgs::msg::dds_::String_",
        TypeHash::zero(),
        gid(10),
        QosProfile::default(),
    );
    let infos = cache
        .get_readers_info_by_topic("rt/chatter", |_| "std_msgs/msg/String".to_string())
        .expect("query");
    assert_eq!(infos.len(), 1);
    assert_eq!(infos[0].topic_type, "std_msgs/msg/String");
    assert_eq!(infos[0].endpoint_type, EndpointType::Subscription);

    assert!(cache
        .get_readers_info_by_topic("/chatter", identity)
        .expect("query")
        .is_empty());
    assert!(cache
        .get_writers_info_by_topic("rt/chatter", identity)
        .expect("query")
        .is_empty());
}

#[test]
fn test_endpoint_info_ordered_by_gid() {
    let cache = GraphCache::new();
    for seed in [7u8, 3, 9, 1] {
        add_default_writer(&cache, gid(seed), "/t", gid(10));
    }
    let gids: Vec<Gid> = cache
        .get_writers_info_by_topic("/t", identity)
        .expect("query")
        .into_iter()
        .map(|info| info.endpoint_gid)
        .collect();
    assert_eq!(gids, vec![gid(1), gid(3), gid(7), gid(9)]);
}

#[test]
fn test_names_and_types_union_and_filter() {
    let cache = GraphCache::new();
    add_default_writer(&cache, gid(1), "rt/chatter", gid(10));
    cache.add_reader(
        gid(2),
        "rt/chatter",
        "other/Type",
        TypeHash::zero(),
        gid(10),
        QosProfile::default(),
    );
    add_default_writer(&cache, gid(3), "hidden", gid(10));

    let topics = cache
        .get_names_and_types(
            |topic| topic.strip_prefix("rt").map(str::to_string).unwrap_or_default(),
            identity,
        )
        .expect("query");
    let mut expected = BTreeMap::new();
    expected.insert(
        "/chatter".to_string(),
        BTreeSet::from(["other/Type".to_string(), "std_msgs/String".to_string()]),
    );
    assert_eq!(topics, expected);
}

#[test]
fn test_names_and_types_by_node() {
    let cache = GraphCache::new();
    cache.add_participant(gid(10), "/");
    cache.add_node(gid(10), "talker", "/").expect("node");
    cache
        .associate_writer(gid(1), gid(10), "talker", "/")
        .expect("associate");
    // associated but never discovered
    cache
        .associate_writer(gid(2), gid(10), "talker", "/")
        .expect("associate");
    add_default_writer(&cache, gid(1), "/chatter", gid(10));
    add_default_writer(&cache, gid(3), "/unrelated", gid(10));

    let topics = cache
        .get_writer_names_and_types_by_node("talker", "/", identity, identity)
        .expect("query");
    assert_eq!(topics.len(), 1);
    assert!(topics.contains_key("/chatter"));

    let readers = cache
        .get_reader_names_and_types_by_node("talker", "/", identity, identity)
        .expect("query");
    assert!(readers.is_empty());

    assert_eq!(
        cache.get_writer_names_and_types_by_node("nobody", "/", identity, identity),
        Err(Error::NodeNameNonExistent {
            name: "nobody".into(),
            namespace: "/".into()
        })
    );
}

#[test]
fn test_node_names_parallel_arrays() {
    let cache = GraphCache::new();
    cache.add_participant(gid(20), "/late");
    cache.add_participant(gid(10), "/early");
    cache.add_node(gid(20), "c", "/").expect("c");
    cache.add_node(gid(10), "b", "/x").expect("b");
    cache.add_node(gid(10), "a", "/y").expect("a");

    let without = cache.get_node_names(false).expect("names");
    assert_eq!(without.names, vec!["b", "a", "c"]);
    assert_eq!(without.namespaces, vec!["/x", "/y", "/"]);
    assert!(without.enclaves.is_none());

    let with = cache.get_node_names(true).expect("names");
    assert_eq!(
        with.enclaves,
        Some(vec!["/early".into(), "/early".into(), "/late".into()])
    );
    assert_eq!(with.len(), cache.get_number_of_nodes());
}

#[test]
fn test_subscribe_receives_structural_events() {
    let cache = GraphCache::new();
    let events = cache.subscribe();

    add_default_writer(&cache, gid(1), "/chatter", gid(10));
    add_default_writer(&cache, gid(1), "/chatter", gid(10));
    cache.add_participant(gid(10), "/");
    cache.remove_writer(&gid(1));
    cache.remove_participant(&gid(10));

    let received: Vec<GraphEvent> = events.try_iter().collect();
    assert_eq!(
        received,
        vec![
            GraphEvent::EntityAdded {
                gid: gid(1),
                endpoint_type: EndpointType::Publisher
            },
            GraphEvent::ParticipantChanged(gid(10)),
            GraphEvent::EntityRemoved {
                gid: gid(1),
                endpoint_type: EndpointType::Publisher
            },
            GraphEvent::ParticipantRemoved(gid(10)),
        ]
    );

    drop(events);
    // a dropped receiver must not break later mutations
    assert!(add_default_writer(&cache, gid(2), "/chatter", gid(10)));
}

#[test]
fn test_lagging_subscriber_is_unsubscribed() {
    let cache = GraphCache::new();
    let lagging = cache.subscribe();

    for i in 0..=GRAPH_EVENT_QUEUE_DEPTH {
        let mut bytes = [0u8; RMW_GID_STORAGE_SIZE];
        bytes[..8].copy_from_slice(&(i as u64).to_be_bytes());
        add_default_writer(&cache, Gid::new(bytes), "/chatter", gid(10));
    }

    let fresh = cache.subscribe();
    cache.add_participant(gid(10), "/");

    assert_eq!(lagging.try_iter().count(), GRAPH_EVENT_QUEUE_DEPTH);
    assert_eq!(
        lagging.try_recv(),
        Err(crossbeam::channel::TryRecvError::Disconnected)
    );
    assert_eq!(
        fresh.try_recv(),
        Ok(GraphEvent::ParticipantChanged(gid(10)))
    );
}

#[test]
fn test_endpoint_info_ignores_nodes_of_other_participants() {
    let cache = GraphCache::new();
    cache.add_participant(gid(10), "/");
    cache.add_participant(gid(11), "/");
    cache.add_node(gid(10), "owner", "/").expect("node");
    cache.add_node(gid(11), "impostor", "/").expect("node");
    cache
        .associate_writer(gid(1), gid(11), "impostor", "/")
        .expect("associate");
    add_default_writer(&cache, gid(1), "/chatter", gid(10));

    let infos = cache
        .get_writers_info_by_topic("/chatter", identity)
        .expect("query");
    assert_eq!(infos[0].node_name, NODE_NAME_UNKNOWN);

    cache
        .associate_writer(gid(1), gid(10), "owner", "/")
        .expect("associate");
    let infos = cache
        .get_writers_info_by_topic("/chatter", identity)
        .expect("query");
    assert_eq!(infos[0].node_name, "owner");
}

#[test]
fn test_cleared_callback_is_not_invoked() {
    let (cache, calls) = counting_cache();
    add_default_writer(&cache, gid(1), "/chatter", gid(10));
    cache.clear_on_change_callback();
    add_default_writer(&cache, gid(2), "/chatter", gid(10));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_replacing_callback_drops_previous_outside_lock() {
    struct ReenterOnDrop(Arc<GraphCache>);
    impl Drop for ReenterOnDrop {
        fn drop(&mut self) {
            // Would deadlock if dropped while the cache lock is held.
            let _ = self.0.get_number_of_nodes();
        }
    }

    let cache = Arc::new(GraphCache::new());
    let guard = ReenterOnDrop(Arc::clone(&cache));
    cache.set_on_change_callback(move || {
        let _keep = &guard;
    });
    cache.set_on_change_callback(|| {});
    cache.clear_on_change_callback();
}

#[test]
fn test_dump_lists_all_sections() {
    let cache = GraphCache::new();
    cache.add_participant(gid(10), "enclave_a");
    cache.add_node(gid(10), "talker", "/ns").expect("node");
    cache
        .associate_writer(gid(1), gid(10), "talker", "/ns")
        .expect("associate");
    add_default_writer(&cache, gid(1), "/chatter", gid(10));

    let dump = cache.to_string();
    assert!(dump.starts_with("---------------------------------\nGraph cache:\n"));
    assert!(dump.contains("  Discovered data writers:\n    gid: '1.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0', topic name: '/chatter', topic_type: 'std_msgs/String'\n"));
    assert!(dump.contains("  Discovered data readers:\n  Discovered participants:\n"));
    assert!(dump.contains("    enclave name 'enclave_a'\n"));
    assert!(dump.contains("      namespace: '/ns' name: 'talker'\n"));
    assert!(dump.contains(
        "      associated data writers gids:\n        1.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0\n"
    ));
}

#[test]
fn test_concurrent_mutation_and_queries() {
    let cache = Arc::new(GraphCache::new());
    cache.add_participant(gid(200), "/");
    let barrier = Arc::new(Barrier::new(4));
    let mut handles = Vec::new();

    for worker in 0..4u8 {
        let cache = Arc::clone(&cache);
        let barrier = Arc::clone(&barrier);
        handles.push(thread::spawn(move || {
            barrier.wait();
            for i in 0..50u8 {
                let mut bytes = [0u8; RMW_GID_STORAGE_SIZE];
                bytes[0] = worker;
                bytes[1] = i;
                let writer = Gid::new(bytes);
                add_default_writer(&cache, writer, "/load", gid(200));
                let _ = cache.get_writers_info_by_topic("/load", identity);
                let _ = cache.get_names_and_types(identity, identity);
                if i % 2 == 0 {
                    cache.remove_writer(&writer);
                }
            }
        }));
    }
    for handle in handles {
        handle.join().expect("worker should succeed");
    }
    assert_eq!(cache.get_writer_count("/load"), 4 * 25);
}

#[test]
fn test_randomized_add_remove_matches_model() {
    let mut rng = fastrand::Rng::with_seed(0x5eed);
    let cache = GraphCache::new();
    let mut model: BTreeMap<Gid, String> = BTreeMap::new();
    let topics = ["/a", "/b", "/c"];

    for _ in 0..2_000 {
        let g = gid(rng.u8(..64));
        if rng.bool() {
            let topic = topics[rng.usize(..topics.len())];
            let added = add_default_writer(&cache, g, topic, gid(200));
            assert_eq!(added, !model.contains_key(&g));
            model.entry(g).or_insert_with(|| topic.to_string());
        } else {
            assert_eq!(cache.remove_writer(&g), model.remove(&g).is_some());
        }
    }

    for topic in topics {
        let expected = model.values().filter(|t| t.as_str() == topic).count();
        assert_eq!(cache.get_writer_count(topic), expected);
        let gids: Vec<Gid> = cache
            .get_writers_info_by_topic(topic, identity)
            .expect("query")
            .into_iter()
            .map(|info| info.endpoint_gid)
            .collect();
        let expected_gids: Vec<Gid> = model
            .iter()
            .filter(|(_, t)| t.as_str() == topic)
            .map(|(g, _)| *g)
            .collect();
        assert_eq!(gids, expected_gids);
    }
}
