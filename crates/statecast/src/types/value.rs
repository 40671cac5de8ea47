// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Property values.

use crate::error::{Error, Result};
use crate::types::{PrimitiveKind, Record, TimePoint, TypeDescriptor, TypeKind};
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

/// A value held in one property slot.
#[derive(Debug, Clone)]
pub enum Value {
    // Primitives
    Bool(bool),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    Char(char),
    String(String),
    Time(TimePoint),

    // Composites
    Enum(i64),
    Sequence(Vec<Value>),
    Struct(Box<dyn Record>),
}

impl Value {
    /// Default (zero) value for a type; used for unset slots.
    pub fn default_for(type_desc: &TypeDescriptor) -> Self {
        match &type_desc.kind {
            TypeKind::Primitive(p) => Self::default_primitive(*p),
            TypeKind::Enum(e) => Self::Enum(e.variants.first().map_or(0, |v| v.value)),
            TypeKind::Sequence(_) => Self::Sequence(Vec::new()),
            TypeKind::Struct(desc) => Self::Struct(Box::new(crate::types::DynamicRecord::new(desc))),
        }
    }

    // @audit-ok: Simple pattern matching - default value dispatch table
    fn default_primitive(kind: PrimitiveKind) -> Self {
        match kind {
            PrimitiveKind::Bool => Self::Bool(false),
            PrimitiveKind::U8 => Self::U8(0),
            PrimitiveKind::U16 => Self::U16(0),
            PrimitiveKind::U32 => Self::U32(0),
            PrimitiveKind::U64 => Self::U64(0),
            PrimitiveKind::I8 => Self::I8(0),
            PrimitiveKind::I16 => Self::I16(0),
            PrimitiveKind::I32 => Self::I32(0),
            PrimitiveKind::I64 => Self::I64(0),
            PrimitiveKind::F32 => Self::F32(0.0),
            PrimitiveKind::F64 => Self::F64(0.0),
            PrimitiveKind::Char => Self::Char('\0'),
            PrimitiveKind::String { .. } => Self::String(String::new()),
            PrimitiveKind::Time => Self::Time(TimePoint::EPOCH),
        }
    }

    /// Short kind name for diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::U8(_) => "u8",
            Self::U16(_) => "u16",
            Self::U32(_) => "u32",
            Self::U64(_) => "u64",
            Self::I8(_) => "i8",
            Self::I16(_) => "i16",
            Self::I32(_) => "i32",
            Self::I64(_) => "i64",
            Self::F32(_) => "f32",
            Self::F64(_) => "f64",
            Self::Char(_) => "char",
            Self::String(_) => "string",
            Self::Time(_) => "time",
            Self::Enum(_) => "enum",
            Self::Sequence(_) => "sequence",
            Self::Struct(_) => "struct",
        }
    }

    /// Check that this value can be stored in a slot of the given type.
    pub fn check_type(&self, property: &str, type_desc: &TypeDescriptor) -> Result<()> {
        let ok = match (&type_desc.kind, self) {
            (TypeKind::Primitive(p), v) => Self::matches_primitive(*p, v),
            (TypeKind::Enum(e), Self::Enum(value)) => e.variant_by_value(*value).is_some(),
            (TypeKind::Sequence(elem), Self::Sequence(items)) => items
                .iter()
                .all(|item| item.check_type(property, elem).is_ok()),
            (TypeKind::Struct(desc), Self::Struct(record)) => record.type_name() == desc.name(),
            _ => false,
        };

        if ok {
            Ok(())
        } else {
            Err(Error::ValueMismatch {
                property: property.to_string(),
                expected: type_desc.name.clone(),
                got: self.kind_name().to_string(),
            })
        }
    }

    fn matches_primitive(kind: PrimitiveKind, value: &Value) -> bool {
        match (kind, value) {
            (PrimitiveKind::String { max_length }, Self::String(s)) => {
                max_length.map_or(true, |max| s.chars().count() <= max)
            }
            (PrimitiveKind::Bool, Self::Bool(_))
            | (PrimitiveKind::U8, Self::U8(_))
            | (PrimitiveKind::U16, Self::U16(_))
            | (PrimitiveKind::U32, Self::U32(_))
            | (PrimitiveKind::U64, Self::U64(_))
            | (PrimitiveKind::I8, Self::I8(_))
            | (PrimitiveKind::I16, Self::I16(_))
            | (PrimitiveKind::I32, Self::I32(_))
            | (PrimitiveKind::I64, Self::I64(_))
            | (PrimitiveKind::F32, Self::F32(_))
            | (PrimitiveKind::F64, Self::F64(_))
            | (PrimitiveKind::Char, Self::Char(_))
            | (PrimitiveKind::Time, Self::Time(_)) => true,
            _ => false,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Self::Bool(_) => 0,
            Self::U8(_) => 1,
            Self::U16(_) => 2,
            Self::U32(_) => 3,
            Self::U64(_) => 4,
            Self::I8(_) => 5,
            Self::I16(_) => 6,
            Self::I32(_) => 7,
            Self::I64(_) => 8,
            Self::F32(_) => 9,
            Self::F64(_) => 10,
            Self::Char(_) => 11,
            Self::String(_) => 12,
            Self::Time(_) => 13,
            Self::Enum(_) => 14,
            Self::Sequence(_) => 15,
            Self::Struct(_) => 16,
        }
    }

    /// Total order over values. Floats use IEEE `totalOrder`, nested records
    /// compare property-wise in tag order (unset before set).
    pub fn total_cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => a.cmp(b),
            (Self::U8(a), Self::U8(b)) => a.cmp(b),
            (Self::U16(a), Self::U16(b)) => a.cmp(b),
            (Self::U32(a), Self::U32(b)) => a.cmp(b),
            (Self::U64(a), Self::U64(b)) => a.cmp(b),
            (Self::I8(a), Self::I8(b)) => a.cmp(b),
            (Self::I16(a), Self::I16(b)) => a.cmp(b),
            (Self::I32(a), Self::I32(b)) => a.cmp(b),
            (Self::I64(a), Self::I64(b)) => a.cmp(b),
            (Self::F32(a), Self::F32(b)) => a.total_cmp(b),
            (Self::F64(a), Self::F64(b)) => a.total_cmp(b),
            (Self::Char(a), Self::Char(b)) => a.cmp(b),
            (Self::String(a), Self::String(b)) => a.cmp(b),
            (Self::Time(a), Self::Time(b)) => a.cmp(b),
            (Self::Enum(a), Self::Enum(b)) => a.cmp(b),
            (Self::Sequence(a), Self::Sequence(b)) => {
                for (x, y) in a.iter().zip(b.iter()) {
                    let ord = x.total_cmp(y);
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                a.len().cmp(&b.len())
            }
            (Self::Struct(a), Self::Struct(b)) => a.compare(b.as_ref()),
            _ => self.rank().cmp(&other.rank()),
        }
    }

    /// Approximate heap bytes owned by this value.
    pub fn dynamic_memory_usage(&self) -> usize {
        match self {
            Self::String(s) => s.capacity(),
            Self::Sequence(items) => {
                items.capacity() * std::mem::size_of::<Value>()
                    + items.iter().map(Value::dynamic_memory_usage).sum::<usize>()
            }
            Self::Struct(record) => record.total_memory_usage(),
            _ => 0,
        }
    }

    /// Try to get as bool.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Try to get as u32.
    pub fn as_u32(&self) -> Option<u32> {
        match self {
            Self::U32(v) => Some(*v),
            _ => None,
        }
    }

    /// Try to get as i32.
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Self::I32(v) => Some(*v),
            _ => None,
        }
    }

    /// Try to get as f32.
    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Self::F32(v) => Some(*v),
            _ => None,
        }
    }

    /// Try to get as f64.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::F64(v) => Some(*v),
            _ => None,
        }
    }

    /// Try to get as string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(v) => Some(v),
            _ => None,
        }
    }

    /// Try to get as nested record.
    pub fn as_record(&self) -> Option<&dyn Record> {
        match self {
            Self::Struct(r) => Some(r.as_ref()),
            _ => None,
        }
    }

    /// Try to get as mutable nested record.
    pub fn as_record_mut(&mut self) -> Option<&mut dyn Record> {
        match self {
            Self::Struct(r) => Some(r.as_mut()),
            _ => None,
        }
    }

    /// Try to get as sequence.
    pub fn as_sequence(&self) -> Option<&[Value]> {
        match self {
            Self::Sequence(v) => Some(v),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.total_cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        self.total_cmp(other)
    }
}

/// Consistent with `Eq`: floats hash by bit pattern, records by key.
impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Bool(v) => v.hash(state),
            Value::U8(v) => v.hash(state),
            Value::U16(v) => v.hash(state),
            Value::U32(v) => v.hash(state),
            Value::U64(v) => v.hash(state),
            Value::I8(v) => v.hash(state),
            Value::I16(v) => v.hash(state),
            Value::I32(v) => v.hash(state),
            Value::I64(v) => v.hash(state),
            Value::F32(v) => v.to_bits().hash(state),
            Value::F64(v) => v.to_bits().hash(state),
            Value::Char(v) => v.hash(state),
            Value::String(v) => v.hash(state),
            Value::Time(v) => v.hash(state),
            Value::Enum(v) => v.hash(state),
            Value::Sequence(items) => items.hash(state),
            Value::Struct(r) => r.key().hash(state),
        }
    }
}

/// Conversion from a [`Value`] reference into a Rust type.
pub trait FromValue: Sized {
    fn from_value(value: &Value) -> Option<Self>;
}

macro_rules! impl_value_conversions {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Self::$variant(v)
                }
            }

            impl FromValue for $ty {
                fn from_value(value: &Value) -> Option<Self> {
                    match value {
                        Value::$variant(v) => Some(v.clone()),
                        _ => None,
                    }
                }
            }
        )*
    };
}

impl_value_conversions!(
    bool => Bool,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    f32 => F32,
    f64 => F64,
    char => Char,
    String => String,
    TimePoint => Time,
);

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Self::Sequence(v.into_iter().map(Into::into).collect())
    }
}

impl From<crate::types::DynamicRecord> for Value {
    fn from(v: crate::types::DynamicRecord) -> Self {
        Self::Struct(Box::new(v))
    }
}
