// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Record capability trait and partial-update operations.
//!
//! Every operation takes a [`PropertySet`] mask and only touches the
//! properties it selects. Validity travels with the value: a property whose
//! bit is not set in [`Record::valid_properties`] has no readable value.
//!
//! | Operation | Per tag in mask                                              |
//! |-----------|--------------------------------------------------------------|
//! | `assign`  | copy value and validity from `other` (invalid -> invalidate) |
//! | `copy`    | copy only if valid in `other`, otherwise leave untouched     |
//! | `merge`   | like `copy`, nested records merge recursively                |
//! | `swap`    | exchange value and validity                                  |
//! | `clear`   | invalidate                                                   |
//!
//! Both records of a binary operation must share the same descriptor.

use crate::error::{Error, Result};
use crate::types::{PropertySet, StructDescriptor, Value};
use std::any::Any;
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

/// A record instance: a slot per property plus a validity mask.
///
/// [`DynamicRecord`](crate::types::DynamicRecord) is the descriptor-driven
/// implementation. Hand-written or generated types implement the eight
/// required methods (descriptor, validity mask, slot access, `replace`,
/// cloning and `Any` access) and get every partial operation for free.
pub trait Record: fmt::Debug + Send + Any {
    /// Type descriptor shared by all instances of this type.
    fn descriptor(&self) -> &Arc<StructDescriptor>;

    /// Tags whose value is currently readable.
    fn valid_properties(&self) -> PropertySet;

    /// Raw slot for a tag, ignoring validity.
    fn slot(&self, tag: u32) -> Option<&Value>;

    /// Mutable raw slot for a tag. Does not change validity.
    fn slot_mut(&mut self, tag: u32) -> Option<&mut Value>;

    /// Store `Some(value)` (and mark valid) or invalidate with `None`.
    ///
    /// Returns the previous value if it was valid. Unknown tags are ignored.
    fn replace(&mut self, tag: u32, value: Option<Value>) -> Option<Value>;

    /// Deep copy behind a fresh box.
    fn clone_record(&self) -> Box<dyn Record>;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    fn type_name(&self) -> &str {
        self.descriptor().name()
    }

    fn is_valid(&self, tag: u32) -> bool {
        self.valid_properties().contains(tag)
    }

    /// Whether every key property is valid.
    fn has_key(&self) -> bool {
        self.valid_properties()
            .is_superset_of(self.descriptor().key_properties())
    }

    /// Value of a valid property.
    fn value(&self, tag: u32) -> Option<&Value> {
        if self.is_valid(tag) {
            self.slot(tag)
        } else {
            None
        }
    }

    /// Value of a property, failing when unknown or unset.
    fn get(&self, tag: u32) -> Result<&Value> {
        let desc = self.descriptor();
        let property = desc.property(tag).ok_or_else(|| Error::UnknownProperty {
            type_name: desc.name().to_string(),
            property: tag.to_string(),
        })?;
        self.value(tag).ok_or_else(|| Error::PropertyNotSet {
            type_name: desc.name().to_string(),
            property: property.name.clone(),
        })
    }

    /// Per tag in `mask`: take value and validity from `other`.
    fn assign(&mut self, other: &dyn Record, mask: PropertySet) {
        for tag in (mask & self.descriptor().all_properties()).tags() {
            let value = other.value(tag).cloned();
            self.replace(tag, value);
        }
    }

    /// Per tag in `mask`: take the value from `other` only if valid there.
    fn copy(&mut self, other: &dyn Record, mask: PropertySet) {
        let tags = mask & other.valid_properties() & self.descriptor().all_properties();
        for tag in tags.tags() {
            if let Some(value) = other.value(tag) {
                self.replace(tag, Some(value.clone()));
            }
        }
    }

    /// Like [`copy`](Record::copy), but nested records that are valid on
    /// both sides are merged field by field instead of overwritten.
    fn merge(&mut self, other: &dyn Record, mask: PropertySet) {
        let tags = mask & other.valid_properties() & self.descriptor().all_properties();
        for tag in tags.tags() {
            let Some(incoming) = other.value(tag) else {
                continue;
            };

            if let (true, Some(nested_in)) = (self.is_valid(tag), incoming.as_record()) {
                if let Some(nested) = self.slot_mut(tag).and_then(Value::as_record_mut) {
                    if nested.type_name() == nested_in.type_name() {
                        nested.merge(nested_in, PropertySet::ALL);
                        continue;
                    }
                }
            }

            self.replace(tag, Some(incoming.clone()));
        }
    }

    /// Per tag in `mask`: exchange value and validity with `other`.
    fn swap(&mut self, other: &mut dyn Record, mask: PropertySet) {
        for tag in (mask & self.descriptor().all_properties()).tags() {
            let mine = self.replace(tag, None);
            let theirs = other.replace(tag, mine);
            self.replace(tag, theirs);
        }
    }

    /// Invalidate every tag in `mask`.
    fn clear(&mut self, mask: PropertySet) {
        for tag in (mask & self.valid_properties()).tags() {
            self.replace(tag, None);
        }
    }

    /// Tags in `mask` whose value differs, plus every tag whose validity differs.
    fn diff(&self, other: &dyn Record, mask: PropertySet) -> PropertySet {
        let mut changed = self.valid_properties() ^ other.valid_properties();
        let both = mask & self.valid_properties() & other.valid_properties();
        for tag in both.tags() {
            if self.value(tag) != other.value(tag) {
                changed = changed + PropertySet::from_tag(tag);
            }
        }
        changed
    }

    /// Equal in validity and value on every tag of `mask`.
    fn equal(&self, other: &dyn Record, mask: PropertySet) -> bool {
        self.type_name() == other.type_name() && (self.diff(other, mask) & mask).is_empty()
    }

    /// Projection on the key properties.
    fn key(&self) -> RecordKey {
        let keys = self.descriptor().key_properties();
        RecordKey(keys.tags().filter_map(|tag| self.value(tag).cloned()).collect())
    }

    fn key_equal(&self, other: &dyn Record) -> bool {
        self.type_name() == other.type_name() && self.key() == other.key()
    }

    /// Total order: type name, then every property in tag order (unset first).
    fn compare(&self, other: &dyn Record) -> Ordering {
        self.type_name().cmp(other.type_name()).then_with(|| {
            let tags = self.descriptor().all_properties() | other.descriptor().all_properties();
            for tag in tags.tags() {
                let ord = self.value(tag).cmp(&other.value(tag));
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            Ordering::Equal
        })
    }

    /// Approximate bytes held by this record, including owned heap data.
    fn total_memory_usage(&self) -> usize {
        let heap: usize = self
            .valid_properties()
            .tags()
            .filter_map(|tag| self.slot(tag))
            .map(Value::dynamic_memory_usage)
            .sum();
        std::mem::size_of_val(self) + heap
    }
}

impl<'r> dyn Record + 'r {
    /// Downcast to a concrete record type.
    pub fn downcast_ref<T: Record>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    pub fn downcast_mut<T: Record>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut::<T>()
    }
}

impl Clone for Box<dyn Record> {
    fn clone(&self) -> Self {
        self.clone_record()
    }
}

/// Key projection of a record, used as the container index.
///
/// Values are compared with [`Value::total_cmp`], so float keys have a
/// total order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct RecordKey(Vec<Value>);

impl RecordKey {
    pub fn new(values: Vec<Value>) -> Self {
        Self(values)
    }

    pub fn values(&self) -> &[Value] {
        &self.0
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, value) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            match value {
                Value::String(s) => write!(f, "{:?}", s)?,
                Value::Struct(r) => write!(f, "{}{}", r.type_name(), r.key())?,
                other => write!(f, "{:?}", other)?,
            }
        }
        write!(f, ")")
    }
}
