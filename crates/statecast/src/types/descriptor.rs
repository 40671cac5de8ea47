// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Type descriptors for records and their property values.
//!
//! A [`StructDescriptor`] is created once per record type, validated, and then
//! shared (`Arc`) by every instance, container and handler registry of that
//! type. It replaces runtime reflection with an explicit `tag -> offset`
//! table: the offset is the slot index in the record's field area.

use crate::error::{Error, Result};
use crate::types::PropertySet;
use std::sync::Arc;

/// Primitive type kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Bool,
    U8,
    U16,
    U32,
    U64,
    I8,
    I16,
    I32,
    I64,
    F32,
    F64,
    Char,
    String { max_length: Option<usize> },
    /// Wall-clock time point.
    Time,
}

impl PrimitiveKind {
    /// Short name used in error messages.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::U8 => "u8",
            Self::U16 => "u16",
            Self::U32 => "u32",
            Self::U64 => "u64",
            Self::I8 => "i8",
            Self::I16 => "i16",
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::F32 => "f32",
            Self::F64 => "f64",
            Self::Char => "char",
            Self::String { .. } => "string",
            Self::Time => "time",
        }
    }
}

/// Type kind enumeration.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeKind {
    /// Primitive type.
    Primitive(PrimitiveKind),
    /// Enumeration.
    Enum(EnumDescriptor),
    /// Sequence (dynamic length) of a single element type.
    Sequence(Arc<TypeDescriptor>),
    /// Nested record type.
    Struct(Arc<StructDescriptor>),
}

/// Descriptor for the value held by one property.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDescriptor {
    /// Type name.
    pub name: String,
    /// Type kind.
    pub kind: TypeKind,
}

impl TypeDescriptor {
    /// Create a new type descriptor.
    pub fn new(name: impl Into<String>, kind: TypeKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    /// Create a primitive type descriptor named after its kind.
    pub fn primitive(kind: PrimitiveKind) -> Self {
        Self::new(kind.name(), TypeKind::Primitive(kind))
    }

    /// Create a sequence descriptor.
    pub fn sequence(element: Arc<TypeDescriptor>) -> Self {
        let name = format!("sequence<{}>", element.name);
        Self::new(name, TypeKind::Sequence(element))
    }

    /// Create a nested struct descriptor.
    pub fn structure(descriptor: Arc<StructDescriptor>) -> Self {
        Self::new(descriptor.name().to_string(), TypeKind::Struct(descriptor))
    }

    /// Create an enum descriptor.
    pub fn enumeration(name: impl Into<String>, descriptor: EnumDescriptor) -> Self {
        Self::new(name, TypeKind::Enum(descriptor))
    }

    /// Check if this is a nested struct type.
    pub fn is_struct(&self) -> bool {
        matches!(self.kind, TypeKind::Struct(_))
    }

    /// Nested struct descriptor, if any.
    pub fn as_struct(&self) -> Option<&Arc<StructDescriptor>> {
        match &self.kind {
            TypeKind::Struct(desc) => Some(desc),
            _ => None,
        }
    }
}

/// Enumeration type descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumDescriptor {
    /// Enum variants.
    pub variants: Vec<EnumVariant>,
}

impl EnumDescriptor {
    /// Create enum descriptor.
    pub fn new(variants: Vec<EnumVariant>) -> Self {
        Self { variants }
    }

    /// Get variant by name.
    pub fn variant(&self, name: &str) -> Option<&EnumVariant> {
        self.variants.iter().find(|v| v.name == name)
    }

    /// Get variant by value.
    pub fn variant_by_value(&self, value: i64) -> Option<&EnumVariant> {
        self.variants.iter().find(|v| v.value == value)
    }
}

/// Enum variant.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumVariant {
    /// Variant name.
    pub name: String,
    /// Variant value.
    pub value: i64,
}

impl EnumVariant {
    /// Create enum variant.
    pub fn new(name: impl Into<String>, value: i64) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// Descriptor of one record property.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDescriptor {
    /// Property tag (bit position in [`PropertySet`]), `1..=31`.
    pub tag: u32,
    /// Property name.
    pub name: String,
    /// Slot index in the record's field area. Assigned by [`StructDescriptor::new`].
    pub offset: usize,
    /// Value type.
    pub type_desc: Arc<TypeDescriptor>,
    /// Part of the instance identity.
    pub is_key: bool,
}

impl PropertyDescriptor {
    /// Create a new (non-key) property descriptor.
    pub fn new(tag: u32, name: impl Into<String>, type_desc: Arc<TypeDescriptor>) -> Self {
        Self {
            tag,
            name: name.into(),
            offset: 0,
            type_desc,
            is_key: false,
        }
    }

    /// Mark as key property.
    pub fn key(mut self) -> Self {
        self.is_key = true;
        self
    }

    /// Singleton set containing this property's tag.
    pub fn set(&self) -> PropertySet {
        PropertySet::from_tag(self.tag)
    }
}

/// Type-level flags.
///
/// Only `cached` is interpreted by the cache and dispatcher; the remaining
/// flags are carried for collaborators (protocol layer, persistence).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StructFlags {
    /// Instances are kept in a container (latest-value cache).
    pub cached: bool,
    /// Internal/system type.
    pub internal: bool,
    /// Persisted by an external store.
    pub persistent: bool,
    /// Only usable as a nested property, never published on its own.
    pub substruct_only: bool,
}

impl Default for StructFlags {
    fn default() -> Self {
        Self {
            cached: true,
            internal: false,
            persistent: false,
            substruct_only: false,
        }
    }
}

impl StructFlags {
    /// Flags of an uncached (event-only) type.
    pub fn uncached() -> Self {
        Self {
            cached: false,
            ..Self::default()
        }
    }
}

const NO_OFFSET: u8 = u8::MAX;

/// Static metadata of one record type.
#[derive(Debug, Clone, PartialEq)]
pub struct StructDescriptor {
    name: String,
    properties: Vec<PropertyDescriptor>,
    offsets: [u8; PropertySet::CAPACITY as usize],
    key_properties: PropertySet,
    all_properties: PropertySet,
    flags: StructFlags,
}

impl StructDescriptor {
    /// Validate and build a descriptor.
    ///
    /// Properties are ordered by tag and their offsets assigned in that order.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidDescriptor`] if a tag is `0` or above
    /// [`PropertySet::MAX_TAG`], or if a tag or name is used twice.
    pub fn new(
        name: impl Into<String>,
        mut properties: Vec<PropertyDescriptor>,
        flags: StructFlags,
    ) -> Result<Self> {
        let name = name.into();
        properties.sort_by_key(|p| p.tag);

        let mut offsets = [NO_OFFSET; PropertySet::CAPACITY as usize];
        let mut key_properties = PropertySet::NONE;
        let mut all_properties = PropertySet::NONE;

        for (offset, property) in properties.iter_mut().enumerate() {
            if property.tag == 0 || property.tag > PropertySet::MAX_TAG {
                return Err(Error::InvalidDescriptor(format!(
                    "{}.{}: tag {} outside 1..={}",
                    name,
                    property.name,
                    property.tag,
                    PropertySet::MAX_TAG
                )));
            }
            if all_properties.contains(property.tag) {
                return Err(Error::InvalidDescriptor(format!(
                    "{}: duplicate tag {}",
                    name, property.tag
                )));
            }
            property.offset = offset;
            offsets[property.tag as usize] = offset as u8;
            all_properties = all_properties + property.set();
            if property.is_key {
                key_properties = key_properties + property.set();
            }
        }

        for (i, a) in properties.iter().enumerate() {
            if properties[i + 1..].iter().any(|b| b.name == a.name) {
                return Err(Error::InvalidDescriptor(format!(
                    "{}: duplicate property name '{}'",
                    name, a.name
                )));
            }
        }

        Ok(Self {
            name,
            properties,
            offsets,
            key_properties,
            all_properties,
            flags,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Property descriptors ordered by tag.
    pub fn properties(&self) -> &[PropertyDescriptor] {
        &self.properties
    }

    /// Number of slots in the field area.
    pub fn field_count(&self) -> usize {
        self.properties.len()
    }

    /// Union of the key property tags.
    pub fn key_properties(&self) -> PropertySet {
        self.key_properties
    }

    /// Union of every declared tag.
    pub fn all_properties(&self) -> PropertySet {
        self.all_properties
    }

    pub fn flags(&self) -> StructFlags {
        self.flags
    }

    /// Whether instances of this type are cached in a container.
    pub fn cached(&self) -> bool {
        self.flags.cached
    }

    pub fn internal(&self) -> bool {
        self.flags.internal
    }

    /// Slot index for a tag.
    #[inline]
    pub fn offset_of(&self, tag: u32) -> Option<usize> {
        let offset = *self.offsets.get(tag as usize)?;
        (offset != NO_OFFSET).then_some(offset as usize)
    }

    /// Property by tag.
    pub fn property(&self, tag: u32) -> Option<&PropertyDescriptor> {
        self.offset_of(tag).map(|offset| &self.properties[offset])
    }

    /// Property by name.
    pub fn property_by_name(&self, name: &str) -> Option<&PropertyDescriptor> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// Properties selected by a mask, in tag order.
    pub fn properties_in(&self, mask: PropertySet) -> impl Iterator<Item = &PropertyDescriptor> {
        (mask & self.all_properties)
            .tags()
            .filter_map(move |tag| self.property(tag))
    }

    /// Tag names of a set (unknown tags are skipped), for diagnostics.
    pub fn property_names(&self, set: PropertySet) -> Vec<&str> {
        self.properties_in(set).map(|p| p.name.as_str()).collect()
    }
}
