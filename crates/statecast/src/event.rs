// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Read-only view handed to event handlers.

use crate::error::{Error, Result};
use crate::io::{CloneInfo, Header, OperationKind};
use crate::types::{PeerId, PropertySet, Record, StructDescriptor};
use std::sync::Arc;

/// One effective cache transition, as seen by an event handler.
///
/// `transmitted` is the instance as received. `updated` is the authoritative
/// state: the stored entry for cached types (the last known state for a
/// remove) and the transmitted instance itself for uncached types.
///
/// Borrowed for the duration of one callback only.
#[derive(Debug, Clone, Copy)]
pub struct Event<'a> {
    header: &'a Header,
    transmitted: &'a dyn Record,
    updated: &'a dyn Record,
    clone_info: &'a CloneInfo,
    kind: OperationKind,
    self_id: Option<PeerId>,
}

impl<'a> Event<'a> {
    pub fn new(
        header: &'a Header,
        transmitted: &'a dyn Record,
        updated: &'a dyn Record,
        clone_info: &'a CloneInfo,
        kind: OperationKind,
        self_id: Option<PeerId>,
    ) -> Self {
        Self {
            header,
            transmitted,
            updated,
            clone_info,
            kind,
            self_id,
        }
    }

    pub fn header(&self) -> &'a Header {
        self.header
    }

    pub fn transmitted(&self) -> &'a dyn Record {
        self.transmitted
    }

    pub fn updated(&self) -> &'a dyn Record {
        self.updated
    }

    pub fn clone_info(&self) -> &'a CloneInfo {
        self.clone_info
    }

    pub fn operation(&self) -> OperationKind {
        self.kind
    }

    pub fn descriptor(&self) -> &'a Arc<StructDescriptor> {
        self.updated.descriptor()
    }

    pub fn is_create(&self) -> bool {
        self.kind == OperationKind::Create
    }

    pub fn is_update(&self) -> bool {
        self.kind == OperationKind::Update
    }

    pub fn is_remove(&self) -> bool {
        self.kind == OperationKind::Remove
    }

    /// Published by this process: flagged by the protocol layer, or sent
    /// under the configured self id.
    pub fn is_from_myself(&self) -> bool {
        self.header.is_from_myself || self.self_id == Some(self.header.sender)
    }

    /// Whether the event replays a cached entry to a new handler.
    pub fn is_from_cache(&self) -> bool {
        self.header.is_from_cache()
    }

    /// Properties the publisher targeted.
    pub fn new_properties(&self) -> PropertySet {
        self.header.attributes
    }

    /// `attributes ^ updated.valid_properties`.
    pub fn updated_properties(&self) -> PropertySet {
        self.header.attributes ^ self.updated.valid_properties()
    }

    /// Transmitted instance as a concrete type.
    pub fn transmitted_as<T: Record>(&self) -> Result<&'a T> {
        downcast(self.transmitted)
    }

    /// Updated instance as a concrete type.
    pub fn updated_as<T: Record>(&self) -> Result<&'a T> {
        downcast(self.updated)
    }
}

fn downcast<T: Record>(record: &dyn Record) -> Result<&T> {
    record.downcast_ref::<T>().ok_or_else(|| Error::TypeMismatch {
        expected: std::any::type_name::<T>().to_string(),
        got: record.type_name().to_string(),
    })
}
