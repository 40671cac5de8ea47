// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Type name -> container map.

use crate::error::{Error, Result};
use crate::io::container::{validate, Container, Reconciliation};
use crate::io::{CloneInfo, Header, OperationKind};
use crate::types::{Record, StructDescriptor};
use std::collections::BTreeMap;
use std::sync::Arc;

/// All containers owned by one dispatcher, created on first use.
#[derive(Debug, Default)]
pub struct ContainerPool {
    containers: BTreeMap<String, Container>,
}

impl ContainerPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Container for `descriptor`, if one was created.
    pub fn find(&self, descriptor: &StructDescriptor) -> Option<&Container> {
        self.find_by_name(descriptor.name())
    }

    pub fn find_by_name(&self, name: &str) -> Option<&Container> {
        self.containers.get(name)
    }

    /// Container for a cached type, created empty if needed.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidDescriptor`] if the type is not cached.
    pub fn get_or_create(&mut self, descriptor: &Arc<StructDescriptor>) -> Result<&mut Container> {
        if !descriptor.cached() {
            return Err(Error::InvalidDescriptor(format!(
                "type '{}' is not cached",
                descriptor.name()
            )));
        }
        let container = self
            .containers
            .entry(descriptor.name().to_string())
            .or_insert_with(|| {
                log::debug!("[ContainerPool] new container for '{}'", descriptor.name());
                Container::new(Arc::clone(descriptor))
            });
        Ok(container)
    }

    /// Drop a container with all its entries.
    pub fn remove(&mut self, name: &str) -> Option<Container> {
        self.containers.remove(name)
    }

    /// Containers ordered by type name.
    pub fn iter(&self) -> impl Iterator<Item = &Container> {
        self.containers.values()
    }

    pub fn len(&self) -> usize {
        self.containers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.containers.is_empty()
    }

    pub fn total_memory_usage(&self) -> usize {
        self.containers
            .values()
            .map(Container::total_memory_usage)
            .sum()
    }

    /// Route a transmission to its container, or handle it as transient
    /// when the type is not cached.
    pub fn reconcile(
        &mut self,
        descriptor: &Arc<StructDescriptor>,
        header: &Header,
        incoming: &dyn Record,
    ) -> Result<Reconciliation<'_>> {
        if descriptor.cached() {
            return self.get_or_create(descriptor)?.reconcile(header, incoming);
        }

        validate(descriptor, header, incoming)?;
        if header.remove_obj {
            log::debug!(
                "[ContainerPool] remove of uncached type '{}' ignored",
                descriptor.name()
            );
            Ok(Reconciliation::NoOp(OperationKind::Remove))
        } else {
            Ok(Reconciliation::Transient(CloneInfo::created(header)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DynamicRecord, PrimitiveKind, PropertySet, StructDescriptorBuilder};

    fn desc(name: &str, cached: bool) -> Arc<StructDescriptor> {
        StructDescriptorBuilder::new(name)
            .key_field(1, "id", PrimitiveKind::U32)
            .cached(cached)
            .build_arc()
            .expect("valid descriptor")
    }

    #[test]
    fn test_containers_created_lazily_for_cached_types() {
        let mut pool = ContainerPool::new();
        let cached = desc("Cached", true);
        let uncached = desc("Event", false);
        assert!(pool.find(&cached).is_none());

        let header = Header::new("Cached", 1, PropertySet::from_tag(1));
        pool.reconcile(&cached, &header, &DynamicRecord::new(&cached).with(1, 1u32))
            .expect("create");
        assert_eq!(pool.find_by_name("Cached").map(Container::len), Some(1));

        let header = Header::new("Event", 1, PropertySet::from_tag(1));
        let result = pool
            .reconcile(&uncached, &header, &DynamicRecord::new(&uncached).with(1, 1u32))
            .expect("transient");
        assert!(matches!(result, Reconciliation::Transient(_)));
        assert!(pool.find(&uncached).is_none());
        assert!(pool.get_or_create(&uncached).is_err());
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn test_uncached_remove_is_noop() {
        let mut pool = ContainerPool::new();
        let uncached = desc("Event", false);
        let header = Header::remove("Event", 1, PropertySet::from_tag(1));
        let result = pool
            .reconcile(&uncached, &header, &DynamicRecord::new(&uncached).with(1, 1u32))
            .expect("no-op");
        assert!(result.is_noop());
        assert!(pool.is_empty());
    }

    #[test]
    fn test_remove_container() {
        let mut pool = ContainerPool::new();
        let cached = desc("Cached", true);
        pool.get_or_create(&cached).expect("cached");
        assert!(pool.remove("Cached").is_some());
        assert!(pool.iter().next().is_none());
    }
}
