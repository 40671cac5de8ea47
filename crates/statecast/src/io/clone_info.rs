// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Provenance bookkeeping for cache entries.

use crate::io::Header;
use crate::types::{PeerId, TimePoint};
use std::fmt;
use std::time::Instant;

/// Kind of cache transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Create,
    Update,
    Remove,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationKind::Create => write!(f, "create"),
            OperationKind::Update => write!(f, "update"),
            OperationKind::Remove => write!(f, "remove"),
        }
    }
}

/// Who created an entry, who touched it last, and when.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloneInfo {
    pub created: TimePoint,
    pub created_from: PeerId,
    pub modified: TimePoint,
    pub last_update_from: PeerId,
    pub last_operation: OperationKind,
    /// Receipt time on this process (monotonic clock).
    pub local_update_time: Instant,
}

impl CloneInfo {
    /// Fresh `Create` info stamped from a header.
    pub fn created(header: &Header) -> Self {
        Self {
            created: header.sent_time,
            created_from: header.sender,
            modified: header.sent_time,
            last_update_from: header.sender,
            last_operation: OperationKind::Create,
            local_update_time: Instant::now(),
        }
    }

    /// Advance the modification stamps; `created` fields are untouched.
    pub fn touch(&mut self, header: &Header, operation: OperationKind) {
        self.last_operation = operation;
        self.last_update_from = header.sender;
        self.modified = header.sent_time;
        self.local_update_time = Instant::now();
    }
}
