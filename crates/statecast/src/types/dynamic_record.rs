// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Descriptor-driven record implementation.

use crate::error::{Error, Result};
use crate::types::{FromValue, PropertySet, Record, StructDescriptor, Value};
use std::any::Any;
use std::sync::Arc;

/// Record whose layout comes from a [`StructDescriptor`] at runtime.
///
/// Holds one slot per declared property, in offset order. Unset slots keep
/// the type's default value so a later `replace` never reallocates the area.
///
/// # Example
///
/// ```rust
/// use statecast::{DynamicRecord, PrimitiveKind, Record, StructDescriptorBuilder};
/// use std::sync::Arc;
///
/// let desc = Arc::new(
///     StructDescriptorBuilder::new("Sensor")
///         .key_field(1, "id", PrimitiveKind::U32)
///         .field(2, "value", PrimitiveKind::F64)
///         .build()
///         .unwrap(),
/// );
///
/// let mut sensor = DynamicRecord::new(&desc);
/// sensor.set("id", 7u32).unwrap();
/// sensor.set("value", 21.5f64).unwrap();
/// assert_eq!(sensor.get::<f64>("value").unwrap(), 21.5);
/// assert!(sensor.has_key());
/// ```
#[derive(Debug, Clone)]
pub struct DynamicRecord {
    descriptor: Arc<StructDescriptor>,
    fields: Vec<Value>,
    valid: PropertySet,
}

impl DynamicRecord {
    /// Create an empty record (no property valid).
    pub fn new(descriptor: &Arc<StructDescriptor>) -> Self {
        let fields = descriptor
            .properties()
            .iter()
            .map(|p| Value::default_for(&p.type_desc))
            .collect();
        Self {
            descriptor: descriptor.clone(),
            fields,
            valid: PropertySet::NONE,
        }
    }

    fn tag_of(&self, name: &str) -> Result<u32> {
        self.descriptor
            .property_by_name(name)
            .map(|p| p.tag)
            .ok_or_else(|| Error::UnknownProperty {
                type_name: self.descriptor.name().to_string(),
                property: name.to_string(),
            })
    }

    /// Set a property by name (type-checked).
    pub fn set<V: Into<Value>>(&mut self, name: &str, value: V) -> Result<()> {
        let tag = self.tag_of(name)?;
        self.set_tag(tag, value)
    }

    /// Set a property by tag (type-checked).
    pub fn set_tag<V: Into<Value>>(&mut self, tag: u32, value: V) -> Result<()> {
        let property = self
            .descriptor
            .property(tag)
            .ok_or_else(|| Error::UnknownProperty {
                type_name: self.descriptor.name().to_string(),
                property: tag.to_string(),
            })?;
        let value = value.into();
        value.check_type(&property.name, &property.type_desc)?;
        self.replace(tag, Some(value));
        Ok(())
    }

    /// Builder-style [`set_tag`](Self::set_tag).
    ///
    /// Values that do not fit the property are dropped and logged.
    pub fn with<V: Into<Value>>(mut self, tag: u32, value: V) -> Self {
        if let Err(e) = self.set_tag(tag, value) {
            log::debug!("[DynamicRecord] with({}) ignored: {}", tag, e);
        }
        self
    }

    /// Read a property by name.
    pub fn get<T: FromValue>(&self, name: &str) -> Result<T> {
        let tag = self.tag_of(name)?;
        let value = Record::get(self, tag)?;
        T::from_value(value).ok_or_else(|| Error::ValueMismatch {
            property: name.to_string(),
            expected: std::any::type_name::<T>().to_string(),
            got: value.kind_name().to_string(),
        })
    }

    /// Invalidate a property by name.
    pub fn unset(&mut self, name: &str) -> Result<()> {
        let tag = self.tag_of(name)?;
        self.replace(tag, None);
        Ok(())
    }
}

impl Record for DynamicRecord {
    fn descriptor(&self) -> &Arc<StructDescriptor> {
        &self.descriptor
    }

    fn valid_properties(&self) -> PropertySet {
        self.valid
    }

    #[inline]
    fn slot(&self, tag: u32) -> Option<&Value> {
        self.descriptor
            .offset_of(tag)
            .and_then(|offset| self.fields.get(offset))
    }

    #[inline]
    fn slot_mut(&mut self, tag: u32) -> Option<&mut Value> {
        self.descriptor
            .offset_of(tag)
            .and_then(|offset| self.fields.get_mut(offset))
    }

    fn replace(&mut self, tag: u32, value: Option<Value>) -> Option<Value> {
        let offset = self.descriptor.offset_of(tag)?;
        let was_valid = self.valid.contains(tag);
        let bit = PropertySet::from_tag(tag);

        let incoming = match value {
            Some(v) => {
                self.valid = self.valid + bit;
                v
            }
            None => {
                self.valid = self.valid - bit;
                Value::default_for(&self.descriptor.properties()[offset].type_desc)
            }
        };

        let previous = std::mem::replace(&mut self.fields[offset], incoming);
        was_valid.then_some(previous)
    }

    fn clone_record(&self) -> Box<dyn Record> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl PartialEq for DynamicRecord {
    fn eq(&self, other: &Self) -> bool {
        self.equal(other, PropertySet::ALL)
    }
}
