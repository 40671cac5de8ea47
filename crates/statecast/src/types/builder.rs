// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Fluent builder API for StructDescriptor.

use crate::error::Result;
use crate::types::{
    EnumDescriptor, PrimitiveKind, PropertyDescriptor, StructDescriptor, StructFlags,
    TypeDescriptor,
};
use std::sync::Arc;

/// Builder for creating [`StructDescriptor`] instances.
///
/// ```rust
/// use statecast::{PrimitiveKind, StructDescriptorBuilder};
///
/// let desc = StructDescriptorBuilder::new("Sensor")
///     .key_field(1, "id", PrimitiveKind::U32)
///     .string_field(2, "label")
///     .field(3, "value", PrimitiveKind::F64)
///     .build()
///     .unwrap();
/// assert_eq!(desc.field_count(), 3);
/// ```
#[derive(Debug)]
pub struct StructDescriptorBuilder {
    name: String,
    properties: Vec<PropertyDescriptor>,
    flags: StructFlags,
}

impl StructDescriptorBuilder {
    /// Create a new builder for a cached struct type.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: Vec::new(),
            flags: StructFlags::default(),
        }
    }

    /// Add a primitive field.
    pub fn field(self, tag: u32, name: impl Into<String>, kind: PrimitiveKind) -> Self {
        self.field_type(tag, name, TypeDescriptor::primitive(kind))
    }

    /// Add a primitive key field.
    pub fn key_field(self, tag: u32, name: impl Into<String>, kind: PrimitiveKind) -> Self {
        self.push(
            PropertyDescriptor::new(tag, name, Arc::new(TypeDescriptor::primitive(kind))).key(),
        )
    }

    /// Add a field with an arbitrary value type.
    pub fn field_type(self, tag: u32, name: impl Into<String>, type_desc: TypeDescriptor) -> Self {
        self.push(PropertyDescriptor::new(tag, name, Arc::new(type_desc)))
    }

    /// Add an unbounded string field.
    pub fn string_field(self, tag: u32, name: impl Into<String>) -> Self {
        self.field(tag, name, PrimitiveKind::String { max_length: None })
    }

    /// Add a sequence field.
    pub fn sequence_field(self, tag: u32, name: impl Into<String>, element: PrimitiveKind) -> Self {
        let element = Arc::new(TypeDescriptor::primitive(element));
        self.field_type(tag, name, TypeDescriptor::sequence(element))
    }

    /// Add an enum field.
    pub fn enum_field(
        self,
        tag: u32,
        name: impl Into<String>,
        type_name: impl Into<String>,
        descriptor: EnumDescriptor,
    ) -> Self {
        self.field_type(tag, name, TypeDescriptor::enumeration(type_name, descriptor))
    }

    /// Add a nested struct field.
    pub fn struct_field(
        self,
        tag: u32,
        name: impl Into<String>,
        descriptor: Arc<StructDescriptor>,
    ) -> Self {
        self.field_type(tag, name, TypeDescriptor::structure(descriptor))
    }

    /// Add a prepared property descriptor.
    pub fn push(mut self, property: PropertyDescriptor) -> Self {
        self.properties.push(property);
        self
    }

    /// Whether instances are kept in a container (default `true`).
    pub fn cached(mut self, cached: bool) -> Self {
        self.flags.cached = cached;
        self
    }

    pub fn internal(mut self, internal: bool) -> Self {
        self.flags.internal = internal;
        self
    }

    pub fn persistent(mut self, persistent: bool) -> Self {
        self.flags.persistent = persistent;
        self
    }

    pub fn substruct_only(mut self, substruct_only: bool) -> Self {
        self.flags.substruct_only = substruct_only;
        self
    }

    /// Validate and build the descriptor.
    pub fn build(self) -> Result<StructDescriptor> {
        StructDescriptor::new(self.name, self.properties, self.flags)
    }

    /// Build directly into a shared descriptor.
    pub fn build_arc(self) -> Result<Arc<StructDescriptor>> {
        self.build().map(Arc::new)
    }
}
