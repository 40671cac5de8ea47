// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Cache and dispatch: headers, containers and the dispatcher.

mod clone_info;
pub(crate) mod container;
mod container_pool;
mod dispatcher;
mod header;
mod shared;

pub use clone_info::{CloneInfo, OperationKind};
pub use container::{validate, CacheEntry, Container, Reconciliation};
pub use container_pool::ContainerPool;
pub use dispatcher::{
    Dispatcher, ErrorHandler, EventHandler, HandlerId, HandlerKind, Subscription,
    TransmissionHandler,
};
pub use header::{Header, Transmission};
pub use shared::SharedDispatcher;
