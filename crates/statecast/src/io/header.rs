// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Transmission header and envelope.

use crate::types::{PeerId, PropertySet, Record, TimePoint};

/// Metadata accompanying one published instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    /// Name of the published type.
    pub type_name: String,
    /// Sender-side publish time.
    pub sent_time: TimePoint,
    /// Publishing peer.
    pub sender: PeerId,
    /// Properties the sender claims to have populated.
    pub attributes: PropertySet,
    /// Removal request instead of create/update.
    pub remove_obj: bool,
    /// Set by the protocol layer for loopback publishes.
    pub is_from_myself: bool,
    /// Remaining number of cache replays after this one (catch-up only).
    pub from_cache: Option<u32>,
    /// Time the server forwarded the transmission, if relayed.
    pub server_sent_time: Option<TimePoint>,
}

impl Header {
    /// Create/update header for `type_name` covering `attributes`.
    pub fn new(type_name: impl Into<String>, sender: PeerId, attributes: PropertySet) -> Self {
        Self {
            type_name: type_name.into(),
            sent_time: TimePoint::now(),
            sender,
            attributes,
            remove_obj: false,
            is_from_myself: false,
            from_cache: None,
            server_sent_time: None,
        }
    }

    /// Header for a removal of the instance identified by `attributes`.
    pub fn remove(type_name: impl Into<String>, sender: PeerId, attributes: PropertySet) -> Self {
        Self {
            remove_obj: true,
            ..Self::new(type_name, sender, attributes)
        }
    }

    pub fn with_sent_time(mut self, sent_time: TimePoint) -> Self {
        self.sent_time = sent_time;
        self
    }

    pub fn with_from_myself(mut self, is_from_myself: bool) -> Self {
        self.is_from_myself = is_from_myself;
        self
    }

    pub fn with_server_sent_time(mut self, time: TimePoint) -> Self {
        self.server_sent_time = Some(time);
        self
    }

    /// Whether this header belongs to a catch-up replay.
    pub fn is_from_cache(&self) -> bool {
        self.from_cache.is_some()
    }
}

/// A deserialized publish: header plus instance.
#[derive(Debug, Clone)]
pub struct Transmission {
    pub header: Header,
    pub instance: Box<dyn Record>,
}

impl Transmission {
    pub fn new(header: Header, instance: impl Record) -> Self {
        Self {
            header,
            instance: Box::new(instance),
        }
    }

    /// Create/update transmission whose attributes are the instance's valid
    /// properties.
    pub fn publish(sender: PeerId, instance: impl Record) -> Self {
        let header = Header::new(instance.type_name(), sender, instance.valid_properties());
        Self::new(header, instance)
    }

    /// Removal transmission keyed by the instance's key properties.
    pub fn remove(sender: PeerId, instance: impl Record) -> Self {
        let keys = instance.descriptor().key_properties();
        let header = Header::remove(instance.type_name(), sender, keys);
        Self::new(header, instance)
    }

    pub fn type_name(&self) -> &str {
        &self.header.type_name
    }
}
