// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # statecast - typed publish/subscribe state cache
//!
//! The reconciliation and dispatch core of a typed pub/sub middleware.
//! Producers publish partially-populated records; statecast keeps the latest
//! known state of every keyed instance per type and notifies subscribers of
//! create, update and remove transitions.
//!
//! ## Quick Start
//!
//! ```rust
//! use statecast::{
//!     Dispatcher, DynamicRecord, PrimitiveKind, Record, Result, StructDescriptorBuilder,
//!     Transmission,
//! };
//!
//! fn main() -> Result<()> {
//!     let sensor = StructDescriptorBuilder::new("Sensor")
//!         .key_field(1, "id", PrimitiveKind::U32)
//!         .field(2, "value", PrimitiveKind::F64)
//!         .build_arc()?;
//!
//!     let mut dispatcher = Dispatcher::new();
//!     dispatcher.add_event_handler(&sensor, |_, event| {
//!         println!("{} {:?}", event.operation(), event.updated().key());
//!         Ok(())
//!     });
//!
//!     let mut reading = DynamicRecord::new(&sensor);
//!     reading.set("id", 1u32)?;
//!     reading.set("value", 21.5f64)?;
//!     dispatcher.dispatch(&Transmission::publish(42, reading))?;
//!
//!     assert_eq!(dispatcher.container(&sensor).map(|c| c.len()), Some(1));
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +---------------------------------------------------------------------+
//! |                   Transport / protocol (external)                   |
//! |              deserializes (Header, instance) pairs                  |
//! +---------------------------------------------------------------------+
//! |                            Dispatcher                               |
//! |   transmission handlers -> reconcile -> Event -> event handlers     |
//! +---------------------------------------------------------------------+
//! |                  ContainerPool -> Container (per type)              |
//! |        BTreeMap<RecordKey, CacheEntry{instance, CloneInfo}>         |
//! +---------------------------------------------------------------------+
//! |          Record trait | DynamicRecord | PropertySet | Value         |
//! |               StructDescriptor (tag -> offset table)                |
//! +---------------------------------------------------------------------+
//! ```
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`PropertySet`] | Bitmask over property tags (validity and operation masks) |
//! | [`StructDescriptor`] | Per-type property table, key set and flags |
//! | [`Record`] | Capability trait with the partial-update operations |
//! | [`Container`] | Latest-value cache of one type |
//! | [`Dispatcher`] | Handler registries and the dispatch loop |
//! | [`Event`] | Read-only view passed to event handlers |
//!
//! ## Modules Overview
//!
//! - [`types`] - property sets, descriptors, values, records
//! - [`io`] - headers, containers, dispatcher
//! - [`event`] - event view
//! - [`config`] - dispatcher configuration (YAML with `config-loaders`)

/// Dispatcher configuration.
pub mod config;
/// Error types.
pub mod error;
/// Read-only dispatch view.
pub mod event;
/// Headers, containers and the dispatcher.
pub mod io;
/// Record model: property sets, descriptors, values and instances.
pub mod types;

pub use config::DispatcherConfig;
pub use error::{Error, HandlerError, HandlerResult, Result};
pub use event::Event;
pub use io::{
    CacheEntry, CloneInfo, Container, ContainerPool, Dispatcher, HandlerId, HandlerKind, Header,
    OperationKind, Reconciliation, SharedDispatcher, Subscription, Transmission,
};
pub use types::{
    DescriptorRegistry, DynamicRecord, EnumDescriptor, EnumVariant, FromValue, PeerId,
    PrimitiveKind, PropertyDescriptor, PropertySet, Record, RecordKey, StructDescriptor,
    StructDescriptorBuilder, StructFlags, TimePoint, TypeDescriptor, TypeKind, TypeRegistry,
    Value,
};

/// statecast version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
