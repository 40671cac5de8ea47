// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Record types: property masks, descriptors, values and instances.

mod builder;
mod descriptor;
mod dynamic_record;
mod property_set;
mod record;
mod registry;
mod time;
mod value;

pub use builder::StructDescriptorBuilder;
pub use descriptor::{
    EnumDescriptor, EnumVariant, PrimitiveKind, PropertyDescriptor, StructDescriptor, StructFlags,
    TypeDescriptor, TypeKind,
};
pub use dynamic_record::DynamicRecord;
pub use property_set::{PropertySet, Tags};
pub use record::{Record, RecordKey};
pub use registry::{DescriptorRegistry, TypeRegistry};
pub use time::{PeerId, TimePoint};
pub use value::{FromValue, Value};
