// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Descriptor lookup by type name.
//!
//! The protocol layer registers descriptors as types are announced; the
//! dispatcher resolves incoming transmissions against the registry.

use crate::types::StructDescriptor;
use dashmap::DashMap;
use std::sync::Arc;

// ============================================================================
// DescriptorRegistry trait + DashMap implementation
// ============================================================================

/// Lookup of registered struct descriptors by type name.
pub trait DescriptorRegistry: Send + Sync {
    /// Descriptor for `name`, if registered.
    fn lookup(&self, name: &str) -> Option<Arc<StructDescriptor>>;
}

/// Concurrent [`DescriptorRegistry`] backed by a `DashMap`.
///
/// Registration may happen from the receive thread while lookups run on the
/// dispatch thread.
///
/// ```rust
/// use statecast::{DescriptorRegistry, PrimitiveKind, StructDescriptorBuilder, TypeRegistry};
///
/// let registry = TypeRegistry::new();
/// let desc = StructDescriptorBuilder::new("Sensor")
///     .key_field(1, "id", PrimitiveKind::U32)
///     .build_arc()
///     .unwrap();
/// registry.register(desc);
/// assert!(registry.lookup("Sensor").is_some());
/// ```
#[derive(Debug, Default)]
pub struct TypeRegistry {
    types: DashMap<Arc<str>, Arc<StructDescriptor>>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a descriptor, returning the one it replaced.
    pub fn register(&self, descriptor: Arc<StructDescriptor>) -> Option<Arc<StructDescriptor>> {
        let name: Arc<str> = Arc::from(descriptor.name());
        log::debug!("[TypeRegistry] register '{}'", name);
        self.types.insert(name, descriptor)
    }

    pub fn unregister(&self, name: &str) -> Option<Arc<StructDescriptor>> {
        self.types.remove(name).map(|(_, desc)| desc)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// Registered type names (unordered).
    pub fn names(&self) -> Vec<String> {
        self.types.iter().map(|e| e.key().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl DescriptorRegistry for TypeRegistry {
    fn lookup(&self, name: &str) -> Option<Arc<StructDescriptor>> {
        self.types.get(name).map(|e| Arc::clone(e.value()))
    }
}

impl<R: DescriptorRegistry + ?Sized> DescriptorRegistry for Arc<R> {
    fn lookup(&self, name: &str) -> Option<Arc<StructDescriptor>> {
        (**self).lookup(name)
    }
}
