// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![allow(clippy::uninlined_format_args)] // Test/bench code readability over pedantic
#![allow(clippy::float_cmp)] // Test assertions with constants

//! Hand-written record types flowing through the cache and the event view.

use parking_lot::Mutex;
use statecast::{
    Dispatcher, DynamicRecord, Error, Header, PrimitiveKind, PropertySet, Record,
    StructDescriptor, StructDescriptorBuilder, Transmission, Value,
};
use std::any::Any;
use std::sync::{Arc, OnceLock};

const SENSOR: u32 = 1;
const CELSIUS: u32 = 2;

fn temperature_descriptor() -> &'static Arc<StructDescriptor> {
    static DESC: OnceLock<Arc<StructDescriptor>> = OnceLock::new();
    DESC.get_or_init(|| {
        StructDescriptorBuilder::new("Temperature")
            .key_field(SENSOR, "sensor", PrimitiveKind::U32)
            .field(CELSIUS, "celsius", PrimitiveKind::F64)
            .build_arc()
            .expect("valid descriptor")
    })
}

/// Fixed-layout record with one slot per property.
#[derive(Debug, Clone)]
struct Temperature {
    sensor: Value,
    celsius: Value,
    valid: PropertySet,
}

impl Temperature {
    fn new(sensor: u32, celsius: f64) -> Self {
        Self {
            sensor: Value::U32(sensor),
            celsius: Value::F64(celsius),
            valid: PropertySet::from_tag(SENSOR) + PropertySet::from_tag(CELSIUS),
        }
    }

    fn key_only(sensor: u32) -> Self {
        Self {
            sensor: Value::U32(sensor),
            celsius: Value::F64(0.0),
            valid: PropertySet::from_tag(SENSOR),
        }
    }

    fn celsius(&self) -> Option<f64> {
        self.value(CELSIUS).and_then(Value::as_f64)
    }
}

impl Record for Temperature {
    fn descriptor(&self) -> &Arc<StructDescriptor> {
        temperature_descriptor()
    }

    fn valid_properties(&self) -> PropertySet {
        self.valid
    }

    fn slot(&self, tag: u32) -> Option<&Value> {
        match tag {
            SENSOR => Some(&self.sensor),
            CELSIUS => Some(&self.celsius),
            _ => None,
        }
    }

    fn slot_mut(&mut self, tag: u32) -> Option<&mut Value> {
        match tag {
            SENSOR => Some(&mut self.sensor),
            CELSIUS => Some(&mut self.celsius),
            _ => None,
        }
    }

    fn replace(&mut self, tag: u32, value: Option<Value>) -> Option<Value> {
        let was_valid = self.valid.contains(tag);
        let bit = PropertySet::from_tag(tag);
        let slot = self.slot_mut(tag)?;
        let previous = match value {
            Some(v) => {
                let previous = std::mem::replace(slot, v);
                self.valid = self.valid + bit;
                previous
            }
            None => {
                let previous = slot.clone();
                self.valid = self.valid - bit;
                previous
            }
        };
        was_valid.then_some(previous)
    }

    fn clone_record(&self) -> Box<dyn Record> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[test]
fn test_partial_operations_on_typed_record() {
    let mut a = Temperature::new(1, 20.0);
    let mut b = Temperature::key_only(1);

    assert_eq!(a.diff(&b, PropertySet::ALL), PropertySet::from_tag(CELSIUS));
    b.copy(&a, PropertySet::ALL);
    assert_eq!(b.celsius(), Some(20.0));
    assert!(a.equal(&b, PropertySet::ALL));

    a.clear(PropertySet::from_tag(CELSIUS));
    assert_eq!(a.celsius(), None);
    assert!(matches!(
        Record::get(&a, CELSIUS),
        Err(Error::PropertyNotSet { .. })
    ));

    a.swap(&mut b, PropertySet::from_tag(CELSIUS));
    assert_eq!(a.celsius(), Some(20.0));
    assert_eq!(b.celsius(), None);
    assert!(a.key_equal(&b));
}

#[test]
fn test_typed_record_is_cached_and_downcast() {
    let mut dispatcher = Dispatcher::new();
    let seen = Arc::new(Mutex::new(Vec::new()));

    let sink = Arc::clone(&seen);
    dispatcher.add_event_handler(temperature_descriptor(), move |_, event| {
        let updated = event.updated_as::<Temperature>()?;
        let transmitted = event.transmitted_as::<Temperature>()?;
        sink.lock().push((event.operation(), transmitted.celsius(), updated.celsius()));
        Ok(())
    });

    dispatcher
        .dispatch(&Transmission::publish(1, Temperature::new(4, 18.5)))
        .expect("create");

    // Partial update: celsius targeted but not provided.
    let header = Header::new("Temperature", 1, temperature_descriptor().all_properties());
    dispatcher
        .dispatch(&Transmission::new(header, Temperature::key_only(4)))
        .expect("update");

    let seen = seen.lock();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0].1, Some(18.5));
    assert_eq!(seen[0].2, Some(18.5));
    assert_eq!(seen[1].1, None);
    assert_eq!(seen[1].2, None);

    let container = dispatcher
        .container(temperature_descriptor())
        .expect("container");
    let entry = container.get(&Temperature::key_only(4)).expect("stored");
    let stored = entry.instance_as::<Temperature>().expect("typed entry");
    assert_eq!(stored.sensor, Value::U32(4));
    assert!(entry.instance_as::<DynamicRecord>().is_none());
}

#[test]
fn test_downcast_to_wrong_type_is_type_mismatch() {
    let mut dispatcher = Dispatcher::new();
    let outcome = Arc::new(Mutex::new(None));

    let sink = Arc::clone(&outcome);
    dispatcher.add_event_handler(temperature_descriptor(), move |_, event| {
        *sink.lock() = Some(event.updated_as::<DynamicRecord>().map(|_| ()));
        Ok(())
    });
    dispatcher
        .dispatch(&Transmission::publish(1, Temperature::new(1, 0.0)))
        .expect("create");

    match outcome.lock().take() {
        Some(Err(Error::TypeMismatch { got, .. })) => assert_eq!(got, "Temperature"),
        other => panic!("expected type mismatch, got {:?}", other),
    };
}

#[test]
fn test_typed_and_dynamic_records_share_a_container() {
    let desc = temperature_descriptor();
    let mut dispatcher = Dispatcher::new();

    dispatcher
        .dispatch(&Transmission::publish(1, Temperature::new(1, 10.0)))
        .expect("typed create");

    let dynamic = DynamicRecord::new(desc).with(SENSOR, 1u32).with(CELSIUS, 11.0f64);
    dispatcher
        .dispatch(&Transmission::publish(2, dynamic))
        .expect("dynamic update");

    let container = dispatcher.container(desc).expect("container");
    assert_eq!(container.len(), 1);
    let entry = container.get(&Temperature::key_only(1)).expect("stored");
    // The stored instance keeps the type it was created with.
    let stored = entry.instance_as::<Temperature>().expect("typed entry");
    assert_eq!(stored.celsius(), Some(11.0));
    assert_eq!(entry.clone_info().last_update_from, 2);
}
