// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Per-type latest-value cache and the reconciliation algorithm.
//!
//! # Reconciliation
//!
//! ```text
//! remove_obj  key present   effect
//! ----------  -----------   ------------------------------------------------
//! false       no            insert: clone incoming, keep `attributes` only
//! false       yes           update: swap `attributes - key` into the entry
//! true        yes           remove: stamp, copy `attributes - key`, extract
//! true        no            no-op
//! ```
//!
//! Validation runs before any mutation, so a rejected transmission leaves
//! the container untouched.

use crate::error::{Error, Result};
use crate::io::{CloneInfo, Header, OperationKind};
use crate::types::{PropertySet, Record, RecordKey, StructDescriptor};
use std::collections::btree_map::{self, BTreeMap};
use std::sync::Arc;

/// A cached instance together with its provenance.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    instance: Box<dyn Record>,
    clone_info: CloneInfo,
}

impl CacheEntry {
    pub fn new(instance: Box<dyn Record>, clone_info: CloneInfo) -> Self {
        Self {
            instance,
            clone_info,
        }
    }

    pub fn instance(&self) -> &dyn Record {
        self.instance.as_ref()
    }

    pub fn clone_info(&self) -> &CloneInfo {
        &self.clone_info
    }

    pub fn key(&self) -> RecordKey {
        self.instance.key()
    }

    pub fn into_parts(self) -> (Box<dyn Record>, CloneInfo) {
        (self.instance, self.clone_info)
    }

    /// Typed view of the stored instance.
    pub fn instance_as<T: Record>(&self) -> Option<&T> {
        self.instance.downcast_ref::<T>()
    }

    fn memory_usage(&self) -> usize {
        std::mem::size_of::<Self>() + self.instance.total_memory_usage()
    }
}

/// Outcome of [`Container::reconcile`].
#[derive(Debug)]
pub enum Reconciliation<'a> {
    /// Entry inserted (`Create`) or updated (`Update`) in place.
    Stored {
        kind: OperationKind,
        entry: &'a CacheEntry,
    },
    /// Entry extracted from the container, carrying its last known state.
    Removed(CacheEntry),
    /// Create of an uncached type; nothing was stored.
    Transient(CloneInfo),
    /// Nothing happened (remove of an absent key or of an uncached type).
    NoOp(OperationKind),
}

impl Reconciliation<'_> {
    pub fn kind(&self) -> OperationKind {
        match self {
            Reconciliation::Stored { kind, .. } => *kind,
            Reconciliation::Removed(_) => OperationKind::Remove,
            Reconciliation::Transient(_) => OperationKind::Create,
            Reconciliation::NoOp(kind) => *kind,
        }
    }

    /// Whether the reconciliation had no observable effect.
    pub fn is_noop(&self) -> bool {
        matches!(self, Reconciliation::NoOp(_))
    }

    pub fn clone_info(&self) -> Option<&CloneInfo> {
        match self {
            Reconciliation::Stored { entry, .. } => Some(entry.clone_info()),
            Reconciliation::Removed(entry) => Some(entry.clone_info()),
            Reconciliation::Transient(info) => Some(info),
            Reconciliation::NoOp(_) => None,
        }
    }
}

/// Reject transmissions that cannot be applied to `descriptor`.
///
/// # Errors
///
/// - [`Error::TypeMismatch`] if the header or the instance names another type
/// - [`Error::MissingKeyFields`] if the attributes or the instance lack a key
pub fn validate(descriptor: &StructDescriptor, header: &Header, incoming: &dyn Record) -> Result<()> {
    if header.type_name != descriptor.name() {
        return Err(Error::TypeMismatch {
            expected: descriptor.name().to_string(),
            got: header.type_name.clone(),
        });
    }
    if incoming.type_name() != descriptor.name() {
        return Err(Error::TypeMismatch {
            expected: descriptor.name().to_string(),
            got: incoming.type_name().to_string(),
        });
    }

    let keys = descriptor.key_properties();
    let missing = keys - (header.attributes & incoming.valid_properties());
    if !missing.is_empty() {
        return Err(Error::MissingKeyFields {
            type_name: descriptor.name().to_string(),
            missing,
        });
    }
    Ok(())
}

/// Ordered cache of the latest known state of every instance of one type.
#[derive(Debug)]
pub struct Container {
    descriptor: Arc<StructDescriptor>,
    instances: BTreeMap<RecordKey, CacheEntry>,
}

impl Container {
    pub fn new(descriptor: Arc<StructDescriptor>) -> Self {
        Self {
            descriptor,
            instances: BTreeMap::new(),
        }
    }

    pub fn descriptor(&self) -> &Arc<StructDescriptor> {
        &self.descriptor
    }

    /// Apply one transmission to the cache.
    pub fn reconcile(
        &mut self,
        header: &Header,
        incoming: &dyn Record,
    ) -> Result<Reconciliation<'_>> {
        validate(&self.descriptor, header, incoming)?;

        let key = incoming.key();
        let non_key = header.attributes - self.descriptor.key_properties();

        if header.remove_obj {
            return Ok(match self.instances.remove(&key) {
                Some(mut entry) => {
                    entry.clone_info.touch(header, OperationKind::Remove);
                    entry.instance.copy(incoming, non_key);
                    log::debug!(
                        "[Container] remove {}{} from peer {}",
                        self.descriptor.name(),
                        key,
                        header.sender
                    );
                    Reconciliation::Removed(entry)
                }
                None => {
                    log::debug!(
                        "[Container] remove of absent {}{} ignored",
                        self.descriptor.name(),
                        key
                    );
                    Reconciliation::NoOp(OperationKind::Remove)
                }
            });
        }

        match self.instances.entry(key) {
            btree_map::Entry::Vacant(slot) => {
                let mut instance = incoming.clone_record();
                instance.clear(!header.attributes);
                log::trace!(
                    "[Container] create {}{}",
                    self.descriptor.name(),
                    slot.key()
                );
                let entry = slot.insert(CacheEntry::new(instance, CloneInfo::created(header)));
                Ok(Reconciliation::Stored {
                    kind: OperationKind::Create,
                    entry,
                })
            }
            btree_map::Entry::Occupied(slot) => {
                let entry = slot.into_mut();
                let mut scratch = incoming.clone_record();
                entry.instance.swap(scratch.as_mut(), non_key);
                entry.clone_info.touch(header, OperationKind::Update);
                Ok(Reconciliation::Stored {
                    kind: OperationKind::Update,
                    entry,
                })
            }
        }
    }

    /// Entry with the same key as `instance`.
    pub fn find(&self, instance: &dyn Record) -> Option<&CacheEntry> {
        self.instances.get(&instance.key())
    }

    pub fn find_by_key(&self, key: &RecordKey) -> Option<&CacheEntry> {
        self.instances.get(key)
    }

    /// Like [`find`](Self::find), failing with [`Error::NotInContainer`].
    pub fn get(&self, instance: &dyn Record) -> Result<&CacheEntry> {
        self.find(instance)
            .ok_or_else(|| Error::NotInContainer(self.descriptor.name().to_string()))
    }

    /// Entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = &CacheEntry> {
        self.instances.values()
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn clear(&mut self) {
        self.instances.clear();
    }

    pub fn for_each<F: FnMut(&CacheEntry)>(&self, f: F) {
        self.instances.values().for_each(f);
    }

    /// Approximate bytes held by the cached entries.
    pub fn total_memory_usage(&self) -> usize {
        self.instances
            .iter()
            .map(|(key, entry)| {
                key.values()
                    .iter()
                    .map(|v| std::mem::size_of_val(v) + v.dynamic_memory_usage())
                    .sum::<usize>()
                    + entry.memory_usage()
            })
            .sum()
    }

    /// Snapshot of every entry, for replays that must not borrow the container.
    pub(crate) fn snapshot(&self) -> Vec<CacheEntry> {
        self.instances.values().cloned().collect()
    }
}

impl<'a> IntoIterator for &'a Container {
    type Item = &'a CacheEntry;
    type IntoIter = btree_map::Values<'a, RecordKey, CacheEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.instances.values()
    }
}

/// Attributes implied by a cache entry when it is replayed.
pub(crate) fn replay_attributes(entry: &CacheEntry) -> PropertySet {
    entry.instance().valid_properties()
}
