// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![allow(clippy::uninlined_format_args)] // Test/bench code readability over pedantic
#![allow(clippy::too_many_lines)] // Example/test code
#![allow(clippy::redundant_closure_for_method_calls)] // Test code clarity

//! Dispatcher event flow: ordering, uncached types, catch-up.

use parking_lot::Mutex;
use statecast::{
    Dispatcher, DispatcherConfig, DynamicRecord, Header, OperationKind, PrimitiveKind,
    PropertySet, Record, StructDescriptor, StructDescriptorBuilder, TimePoint, Transmission,
    Value,
};
use std::sync::Arc;

const KEY: u32 = 1;
const TEXT: u32 = 2;

fn descriptor(name: &str, cached: bool) -> Arc<StructDescriptor> {
    StructDescriptorBuilder::new(name)
        .key_field(KEY, "id", PrimitiveKind::U32)
        .string_field(TEXT, "text")
        .cached(cached)
        .build_arc()
        .expect("valid descriptor")
}

fn set(tags: &[u32]) -> PropertySet {
    tags.iter().copied().collect()
}

fn create(desc: &Arc<StructDescriptor>, id: u32, sender: u32, millis: u64) -> Transmission {
    let record = DynamicRecord::new(desc).with(KEY, id).with(TEXT, format!("v{}", millis));
    let header = Header::new(desc.name(), sender, set(&[KEY, TEXT]))
        .with_sent_time(TimePoint::from_millis(millis));
    Transmission::new(header, record)
}

fn remove(desc: &Arc<StructDescriptor>, id: u32, sender: u32, millis: u64) -> Transmission {
    let header =
        Header::remove(desc.name(), sender, set(&[KEY])).with_sent_time(TimePoint::from_millis(millis));
    Transmission::new(header, DynamicRecord::new(desc).with(KEY, id))
}

#[derive(Debug, Clone, PartialEq)]
struct Seen {
    kind: OperationKind,
    created: TimePoint,
    created_from: u32,
    modified: TimePoint,
    last_update_from: u32,
    from_cache: Option<u32>,
    from_myself: bool,
}

fn recorder(
    dispatcher: &mut Dispatcher,
    desc: &Arc<StructDescriptor>,
) -> Arc<Mutex<Vec<Seen>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    dispatcher.add_event_handler(desc, move |_, event| {
        let info = event.clone_info();
        sink.lock().push(Seen {
            kind: event.operation(),
            created: info.created,
            created_from: info.created_from,
            modified: info.modified,
            last_update_from: info.last_update_from,
            from_cache: event.header().from_cache,
            from_myself: event.is_from_myself(),
        });
        Ok(())
    });
    seen
}

#[test]
fn test_event_ordering_create_update_remove() {
    let desc = descriptor("Track", true);
    let mut dispatcher = Dispatcher::new();
    let seen = recorder(&mut dispatcher, &desc);

    dispatcher.dispatch(&create(&desc, 1, 10, 100)).expect("create");
    dispatcher.dispatch(&create(&desc, 1, 11, 200)).expect("update");
    dispatcher.dispatch(&remove(&desc, 1, 12, 300)).expect("remove");

    let seen = seen.lock();
    let kinds: Vec<_> = seen.iter().map(|s| s.kind).collect();
    assert_eq!(
        kinds,
        vec![OperationKind::Create, OperationKind::Update, OperationKind::Remove]
    );
    for s in seen.iter() {
        assert_eq!(s.created, TimePoint::from_millis(100));
        assert_eq!(s.created_from, 10);
    }
    let modified: Vec<_> = seen.iter().map(|s| (s.modified, s.last_update_from)).collect();
    assert_eq!(
        modified,
        vec![
            (TimePoint::from_millis(100), 10),
            (TimePoint::from_millis(200), 11),
            (TimePoint::from_millis(300), 12),
        ]
    );
}

#[test]
fn test_remove_of_absent_key_raises_no_event() {
    let desc = descriptor("Track", true);
    let mut dispatcher = Dispatcher::new();
    let seen = recorder(&mut dispatcher, &desc);

    let kind = dispatcher.dispatch(&remove(&desc, 9, 1, 0)).expect("no-op");

    assert_eq!(kind, OperationKind::Remove);
    assert!(seen.lock().is_empty());
}

#[test]
fn test_updated_is_authoritative_state() {
    let desc = descriptor("Track", true);
    let mut dispatcher = Dispatcher::new();
    let observed = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&observed);
    dispatcher.add_event_handler(&desc, move |_, event| {
        sink.lock().push((
            event.transmitted().valid_properties(),
            event.updated().valid_properties(),
            event.updated_properties(),
            event.updated().value(TEXT).and_then(|v| v.as_str()).map(str::to_string),
        ));
        Ok(())
    });

    dispatcher.dispatch(&create(&desc, 1, 1, 0)).expect("create");
    // Key-only publish that does not target the text field.
    let header = Header::new("Track", 1, set(&[KEY]));
    dispatcher
        .dispatch(&Transmission::new(header, DynamicRecord::new(&desc).with(KEY, 1u32)))
        .expect("update");

    let observed = observed.lock();
    assert_eq!(observed.len(), 2);
    let (transmitted, updated, changed, text) = &observed[1];
    assert_eq!(*transmitted, set(&[KEY]));
    assert_eq!(*updated, set(&[KEY, TEXT]));
    assert_eq!(*changed, set(&[TEXT]));
    assert_eq!(text.as_deref(), Some("v0"));
}

#[test]
fn test_uncached_types_never_persist() {
    let desc = descriptor("Ping", false);
    let mut dispatcher = Dispatcher::new();
    let seen = recorder(&mut dispatcher, &desc);

    for i in 0..5u64 {
        dispatcher.dispatch(&create(&desc, 1, 3, i * 10)).expect("create");
        dispatcher.dispatch(&remove(&desc, 1, 3, i * 10 + 5)).expect("remove");
    }

    assert!(dispatcher.container(&desc).is_none());
    assert!(dispatcher.pool().is_empty());

    let seen = seen.lock();
    assert_eq!(seen.len(), 5);
    for (i, s) in seen.iter().enumerate() {
        assert_eq!(s.kind, OperationKind::Create);
        assert_eq!(s.created, TimePoint::from_millis(i as u64 * 10));
        assert_eq!(s.created, s.modified);
        assert_eq!(s.created_from, 3);
    }
}

#[test]
fn test_uncached_updated_is_transmitted() {
    let desc = descriptor("Ping", false);
    let mut dispatcher = Dispatcher::new();
    let same = Arc::new(Mutex::new(false));
    let sink = Arc::clone(&same);
    dispatcher.add_event_handler(&desc, move |_, event| {
        *sink.lock() = std::ptr::addr_eq(event.updated(), event.transmitted());
        Ok(())
    });

    dispatcher.dispatch(&create(&desc, 1, 1, 0)).expect("create");
    assert!(*same.lock());
}

#[test]
fn test_catch_up_is_idempotent() {
    let desc = descriptor("Track", true);
    let mut dispatcher = Dispatcher::new();
    for id in [3u32, 1, 2] {
        dispatcher.dispatch(&create(&desc, id, 7, u64::from(id))).expect("create");
    }
    dispatcher.dispatch(&create(&desc, 2, 8, 50)).expect("update");

    let keys = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&keys);
    let seen = recorder(&mut dispatcher, &desc);
    dispatcher.add_event_handler(&desc, move |_, event| {
        sink.lock()
            .push(event.updated().value(KEY).and_then(|v| v.as_u32()));
        Ok(())
    });

    {
        let seen = seen.lock();
        assert_eq!(seen.len(), 3);
        assert!(seen.iter().all(|s| s.kind == OperationKind::Create));
        assert!(seen.iter().all(|s| !s.from_myself));
        let countdown: Vec<_> = seen.iter().map(|s| s.from_cache).collect();
        assert_eq!(countdown, vec![Some(2), Some(1), Some(0)]);
        // Replays carry the current provenance.
        assert_eq!(seen[1].last_update_from, 8);
        assert_eq!(seen[1].modified, TimePoint::from_millis(50));
        assert_eq!(seen[1].created_from, 7);
    }
    assert_eq!(*keys.lock(), vec![Some(1), Some(2), Some(3)]);

    dispatcher.dispatch(&create(&desc, 4, 7, 60)).expect("create");
    let seen = seen.lock();
    assert_eq!(seen.len(), 4);
    assert_eq!(seen[3].from_cache, None);
}

#[test]
fn test_catch_up_for_transmission_handlers() {
    let desc = descriptor("Track", true);
    let mut dispatcher = Dispatcher::new();
    dispatcher.dispatch(&create(&desc, 1, 7, 10)).expect("create");
    dispatcher.dispatch(&create(&desc, 2, 7, 20)).expect("create");

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    dispatcher.add_transmission_handler(&desc, move |_, t| {
        sink.lock().push((
            t.header.from_cache,
            t.header.attributes,
            t.header.remove_obj,
            t.instance.value(KEY).cloned(),
        ));
        Ok(())
    });

    assert_eq!(
        *seen.lock(),
        vec![
            (Some(1), set(&[KEY, TEXT]), false, Some(Value::U32(1))),
            (Some(0), set(&[KEY, TEXT]), false, Some(Value::U32(2))),
        ]
    );
}

#[test]
fn test_catch_up_can_be_disabled() {
    let desc = descriptor("Track", true);
    let mut dispatcher = Dispatcher::with_config(DispatcherConfig::new().catch_up(false));
    dispatcher.dispatch(&create(&desc, 1, 7, 10)).expect("create");

    let seen = recorder(&mut dispatcher, &desc);
    assert!(seen.lock().is_empty());
}

#[test]
fn test_is_from_myself_uses_self_id() {
    let desc = descriptor("Track", true);
    let mut dispatcher = Dispatcher::with_config(DispatcherConfig::new().self_id(5));
    let seen = recorder(&mut dispatcher, &desc);

    dispatcher.dispatch(&create(&desc, 1, 5, 0)).expect("own");
    dispatcher.dispatch(&create(&desc, 2, 6, 0)).expect("foreign");
    let mut flagged = create(&desc, 3, 6, 0);
    flagged.header.is_from_myself = true;
    dispatcher.dispatch(&flagged).expect("flagged");

    let flags: Vec<_> = seen.lock().iter().map(|s| s.from_myself).collect();
    assert_eq!(flags, vec![true, false, true]);
}

#[test]
fn test_handlers_only_see_their_type() {
    let track = descriptor("Track", true);
    let ping = descriptor("Ping", false);
    let mut dispatcher = Dispatcher::new();
    let tracks = recorder(&mut dispatcher, &track);
    let pings = recorder(&mut dispatcher, &ping);

    dispatcher.dispatch(&create(&track, 1, 1, 0)).expect("track");
    dispatcher.dispatch(&create(&ping, 1, 1, 0)).expect("ping");
    dispatcher.dispatch(&create(&ping, 2, 1, 0)).expect("ping");

    assert_eq!(tracks.lock().len(), 1);
    assert_eq!(pings.lock().len(), 2);
}

#[test]
fn test_subscription_tokens() {
    let desc = descriptor("Track", true);
    let mut dispatcher = Dispatcher::new();
    let count = Arc::new(Mutex::new(0));
    let sink = Arc::clone(&count);
    let sub = dispatcher.subscribe_events(&desc, move |_, _| {
        *sink.lock() += 1;
        Ok(())
    });
    assert_eq!(sub.type_name(), "Track");

    dispatcher.dispatch(&create(&desc, 1, 1, 0)).expect("create");
    dispatcher.unsubscribe(sub.clone()).expect("unsubscribe");
    dispatcher.dispatch(&create(&desc, 2, 1, 0)).expect("create");

    assert_eq!(*count.lock(), 1);
    assert!(dispatcher.unsubscribe(sub).is_err());
    assert_eq!(dispatcher.event_handler_count("Track"), 0);
}
