// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Subscription registries and the dispatch loop.
//!
//! # Dispatch order
//!
//! ```text
//! dispatch(transmission)
//!   1. resolve descriptor (registry, else instance descriptor)
//!   2. transmission handlers, registration order, unmodified transmission
//!   3. reconcile against the container pool      (errors propagate)
//!   4. event handlers, registration order        (skipped on no-op)
//! ```
//!
//! # Reentrancy
//!
//! Handlers receive `&mut Dispatcher` and may dispatch, add or remove
//! handlers from inside a callback. Each pass over a registry works on a
//! snapshot of the handler ids taken when the pass starts. Every call holds
//! its own reference to the handler, so a nested dispatch of the same type
//! calls the running handler again. Removing a handler from a registry that
//! is being iterated only records the id in `pending_removals`; the registry
//! is purged once the outermost pass over it completes.
//!
//! Handlers are `Fn`; per-handler mutable state lives behind the handler's
//! own lock.

use crate::config::DispatcherConfig;
use crate::error::{Error, HandlerError, HandlerResult, Result};
use crate::event::Event;
use crate::io::container::replay_attributes;
use crate::io::{CacheEntry, Container, ContainerPool, Header, OperationKind, Reconciliation, Transmission};
use crate::types::{DescriptorRegistry, Record, StructDescriptor};
use std::any::Any;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::panic::{catch_unwind, resume_unwind, AssertUnwindSafe};
use std::sync::Arc;

/// Callback invoked with every transmission of a type, before reconciliation.
pub type TransmissionHandler =
    Arc<dyn Fn(&mut Dispatcher, &Transmission) -> HandlerResult + Send + Sync>;

/// Callback invoked with the event produced by each effective reconciliation.
pub type EventHandler = Arc<dyn Fn(&mut Dispatcher, &Event<'_>) -> HandlerResult + Send + Sync>;

/// Receives handler failures together with the type being dispatched.
pub type ErrorHandler = Box<dyn FnMut(&StructDescriptor, &HandlerError) + Send>;

/// Panic payload of a handler run without isolation.
type PanicPayload = Box<dyn Any + Send>;

/// Identifier of a registered handler, unique per dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HandlerId(u64);

impl HandlerId {
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for HandlerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Which registry a handler lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandlerKind {
    Transmission,
    Event,
}

/// Token returned by the `subscribe_*` helpers; pass it to
/// [`Dispatcher::unsubscribe`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[must_use = "dropping a Subscription does not unsubscribe"]
pub struct Subscription {
    kind: HandlerKind,
    type_name: String,
    id: HandlerId,
}

impl Subscription {
    pub fn kind(&self) -> HandlerKind {
        self.kind
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn id(&self) -> HandlerId {
        self.id
    }
}

// ============================================================================
// Handler registry
// ============================================================================

/// Handlers of one kind for one type, ordered by id (registration order).
struct Registry<H> {
    handlers: BTreeMap<HandlerId, H>,
}

impl<H: Clone> Registry<H> {
    fn new() -> Self {
        Self {
            handlers: BTreeMap::new(),
        }
    }

    fn ids(&self) -> Vec<HandlerId> {
        self.handlers.keys().copied().collect()
    }

    fn get(&self, id: HandlerId) -> Option<H> {
        self.handlers.get(&id).cloned()
    }
}

fn remove_handler<H>(
    registries: &mut HashMap<String, Registry<H>>,
    pending: &mut HashSet<HandlerId>,
    in_pass: bool,
    type_name: &str,
    id: HandlerId,
) -> Result<()> {
    let registry = registries
        .get_mut(type_name)
        .filter(|r| r.handlers.contains_key(&id) && !pending.contains(&id))
        .ok_or_else(|| Error::UnknownHandler {
            type_name: type_name.to_string(),
            id: id.0,
        })?;

    if in_pass {
        log::debug!(
            "[Dispatcher] deferring removal of handler {} for '{}'",
            id,
            type_name
        );
        pending.insert(id);
    } else {
        registry.handlers.remove(&id);
    }
    Ok(())
}

fn flush_removals<H>(
    registries: &mut HashMap<String, Registry<H>>,
    pending: &mut HashSet<HandlerId>,
    type_name: &str,
) {
    if pending.is_empty() {
        return;
    }
    if let Some(registry) = registries.get_mut(type_name) {
        registry.handlers.retain(|id, _| !pending.remove(id));
    }
}

fn count_active<H>(
    registries: &HashMap<String, Registry<H>>,
    pending: &HashSet<HandlerId>,
    type_name: &str,
) -> usize {
    registries.get(type_name).map_or(0, |r| {
        r.handlers.keys().filter(|id| !pending.contains(*id)).count()
    })
}

/// Header for replaying a cached entry to a late subscriber.
fn replay_header(descriptor: &StructDescriptor, entry: &CacheEntry, remaining: u32) -> Header {
    let info = entry.clone_info();
    Header {
        type_name: descriptor.name().to_string(),
        sent_time: info.modified,
        sender: info.last_update_from,
        attributes: replay_attributes(entry),
        remove_obj: false,
        is_from_myself: false,
        from_cache: Some(remaining),
        server_sent_time: None,
    }
}

// ============================================================================
// Dispatcher
// ============================================================================

/// Turns transmissions into cache mutations and handler callbacks.
///
/// Single-threaded: `dispatch` runs to completion on the calling thread. Use
/// [`SharedDispatcher`](crate::io::SharedDispatcher) when transmissions
/// arrive on another thread.
pub struct Dispatcher {
    config: DispatcherConfig,
    registry: Option<Arc<dyn DescriptorRegistry>>,
    pool: ContainerPool,
    transmission_handlers: HashMap<String, Registry<TransmissionHandler>>,
    event_handlers: HashMap<String, Registry<EventHandler>>,
    next_handler_id: u64,
    dispatching: Vec<(HandlerKind, String)>,
    pending_removals: HashSet<HandlerId>,
    running: Vec<HandlerId>,
    error_handler: Option<ErrorHandler>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::with_config(DispatcherConfig::default())
    }

    pub fn with_config(config: DispatcherConfig) -> Self {
        Self {
            config,
            registry: None,
            pool: ContainerPool::new(),
            transmission_handlers: HashMap::new(),
            event_handlers: HashMap::new(),
            next_handler_id: 1,
            dispatching: Vec::new(),
            pending_removals: HashSet::new(),
            running: Vec::new(),
            error_handler: None,
        }
    }

    /// Resolve incoming type names through `registry`.
    pub fn with_registry(mut self, registry: Arc<dyn DescriptorRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Replace the error callback. Without one, failures are logged.
    pub fn set_error_handler<F>(&mut self, handler: F)
    where
        F: FnMut(&StructDescriptor, &HandlerError) + Send + 'static,
    {
        self.error_handler = Some(Box::new(handler));
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    pub fn pool(&self) -> &ContainerPool {
        &self.pool
    }

    pub fn container(&self, descriptor: &StructDescriptor) -> Option<&Container> {
        self.pool.find(descriptor)
    }

    pub fn container_by_name(&self, name: &str) -> Option<&Container> {
        self.pool.find_by_name(name)
    }

    /// Number of live transmission handlers for a type.
    pub fn transmission_handler_count(&self, type_name: &str) -> usize {
        count_active(&self.transmission_handlers, &self.pending_removals, type_name)
    }

    /// Number of live event handlers for a type.
    pub fn event_handler_count(&self, type_name: &str) -> usize {
        count_active(&self.event_handlers, &self.pending_removals, type_name)
    }

    /// Id of the innermost handler currently being invoked.
    ///
    /// Lets a handler remove itself during catch-up, before its registration
    /// call has returned the id.
    pub fn current_handler(&self) -> Option<HandlerId> {
        self.running.last().copied()
    }

    fn next_id(&mut self) -> HandlerId {
        let id = HandlerId(self.next_handler_id);
        self.next_handler_id += 1;
        id
    }

    fn in_pass(&self, kind: HandlerKind, type_name: &str) -> bool {
        self.dispatching
            .iter()
            .any(|(k, name)| *k == kind && name == type_name)
    }

    fn report(&mut self, descriptor: &StructDescriptor, error: &HandlerError) {
        match self.error_handler.as_mut() {
            Some(handler) => handler(descriptor, error),
            None => log::error!(
                "[Dispatcher] handler for '{}' failed: {}",
                descriptor.name(),
                error
            ),
        }
    }

    /// Run one handler call. Errors and isolated panics go to the error
    /// handler. Without isolation the panic payload is returned so the
    /// calling pass can close itself before resuming the unwind.
    fn invoke<F>(
        &mut self,
        descriptor: &StructDescriptor,
        id: HandlerId,
        call: F,
    ) -> Option<PanicPayload>
    where
        F: FnOnce(&mut Self) -> HandlerResult,
    {
        self.running.push(id);
        let outcome = catch_unwind(AssertUnwindSafe(|| call(&mut *self)));
        self.running.pop();

        let result = match outcome {
            Ok(result) => result,
            Err(payload) if self.config.isolate_panics => Err(HandlerError::from_panic(payload)),
            Err(payload) => return Some(payload),
        };
        if let Err(e) = result {
            self.report(descriptor, &e);
        }
        None
    }

    /// Close a pass over a registry; purge pending removals once no pass
    /// over it remains.
    fn end_pass(&mut self, kind: HandlerKind, name: &str) {
        self.dispatching.pop();
        if self.in_pass(kind, name) {
            return;
        }
        match kind {
            HandlerKind::Transmission => {
                flush_removals(&mut self.transmission_handlers, &mut self.pending_removals, name);
            }
            HandlerKind::Event => {
                flush_removals(&mut self.event_handlers, &mut self.pending_removals, name);
            }
        }
    }

    // ------------------------------------------------------------------------
    // Registration
    // ------------------------------------------------------------------------

    /// Register a transmission handler for `descriptor`'s type.
    ///
    /// If the type is cached and its container holds entries, the handler is
    /// first called once per entry (key order) with a synthesized create
    /// transmission whose header counts down `from_cache`.
    pub fn add_transmission_handler<F>(
        &mut self,
        descriptor: &Arc<StructDescriptor>,
        handler: F,
    ) -> HandlerId
    where
        F: Fn(&mut Dispatcher, &Transmission) -> HandlerResult + Send + Sync + 'static,
    {
        let id = self.next_id();
        let name = descriptor.name();
        self.transmission_handlers
            .entry(name.to_string())
            .or_insert_with(Registry::new)
            .handlers
            .insert(id, Arc::new(handler));
        log::debug!("[Dispatcher] transmission handler {} added for '{}'", id, name);

        let entries = self.catch_up_entries(descriptor);
        if !entries.is_empty() {
            self.catch_up_transmissions(descriptor, id, entries);
        }
        id
    }

    /// Register an event handler for `descriptor`'s type.
    ///
    /// If the type is cached and its container holds entries, the handler is
    /// first called once per entry (key order) with a `Create` event.
    pub fn add_event_handler<F>(&mut self, descriptor: &Arc<StructDescriptor>, handler: F) -> HandlerId
    where
        F: Fn(&mut Dispatcher, &Event<'_>) -> HandlerResult + Send + Sync + 'static,
    {
        let id = self.next_id();
        let name = descriptor.name();
        self.event_handlers
            .entry(name.to_string())
            .or_insert_with(Registry::new)
            .handlers
            .insert(id, Arc::new(handler));
        log::debug!("[Dispatcher] event handler {} added for '{}'", id, name);

        let entries = self.catch_up_entries(descriptor);
        if !entries.is_empty() {
            self.catch_up_events(descriptor, id, entries);
        }
        id
    }

    /// Remove a transmission handler. Deferred while its registry is iterated.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownHandler`] if `id` is not registered for `type_name`.
    pub fn remove_transmission_handler(&mut self, type_name: &str, id: HandlerId) -> Result<()> {
        let in_pass = self.in_pass(HandlerKind::Transmission, type_name);
        remove_handler(
            &mut self.transmission_handlers,
            &mut self.pending_removals,
            in_pass,
            type_name,
            id,
        )
    }

    /// Remove an event handler. Deferred while its registry is iterated.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownHandler`] if `id` is not registered for `type_name`.
    pub fn remove_event_handler(&mut self, type_name: &str, id: HandlerId) -> Result<()> {
        let in_pass = self.in_pass(HandlerKind::Event, type_name);
        remove_handler(
            &mut self.event_handlers,
            &mut self.pending_removals,
            in_pass,
            type_name,
            id,
        )
    }

    /// [`add_transmission_handler`](Self::add_transmission_handler) returning a token.
    pub fn subscribe_transmissions<F>(
        &mut self,
        descriptor: &Arc<StructDescriptor>,
        handler: F,
    ) -> Subscription
    where
        F: Fn(&mut Dispatcher, &Transmission) -> HandlerResult + Send + Sync + 'static,
    {
        let id = self.add_transmission_handler(descriptor, handler);
        Subscription {
            kind: HandlerKind::Transmission,
            type_name: descriptor.name().to_string(),
            id,
        }
    }

    /// [`add_event_handler`](Self::add_event_handler) returning a token.
    pub fn subscribe_events<F>(&mut self, descriptor: &Arc<StructDescriptor>, handler: F) -> Subscription
    where
        F: Fn(&mut Dispatcher, &Event<'_>) -> HandlerResult + Send + Sync + 'static,
    {
        let id = self.add_event_handler(descriptor, handler);
        Subscription {
            kind: HandlerKind::Event,
            type_name: descriptor.name().to_string(),
            id,
        }
    }

    pub fn unsubscribe(&mut self, subscription: Subscription) -> Result<()> {
        match subscription.kind {
            HandlerKind::Transmission => {
                self.remove_transmission_handler(&subscription.type_name, subscription.id)
            }
            HandlerKind::Event => self.remove_event_handler(&subscription.type_name, subscription.id),
        }
    }

    // ------------------------------------------------------------------------
    // Catch-up
    // ------------------------------------------------------------------------

    fn catch_up_entries(&self, descriptor: &StructDescriptor) -> Vec<CacheEntry> {
        if !self.config.catch_up || !descriptor.cached() {
            return Vec::new();
        }
        match self.pool.find(descriptor) {
            Some(container) if !container.is_empty() => container.snapshot(),
            _ => Vec::new(),
        }
    }

    fn catch_up_transmissions(
        &mut self,
        descriptor: &Arc<StructDescriptor>,
        id: HandlerId,
        entries: Vec<CacheEntry>,
    ) {
        let name = descriptor.name().to_string();
        let total = entries.len();
        log::debug!(
            "[Dispatcher] replaying {} cached '{}' to transmission handler {}",
            total,
            name,
            id
        );

        self.dispatching.push((HandlerKind::Transmission, name.clone()));
        for (i, entry) in entries.into_iter().enumerate() {
            if self.pending_removals.contains(&id) {
                break;
            }
            let header = replay_header(descriptor, &entry, (total - 1 - i) as u32);
            let (instance, _) = entry.into_parts();
            let transmission = Transmission { header, instance };

            let Some(handler) = self.transmission_handlers.get(&name).and_then(|r| r.get(id))
            else {
                break;
            };
            if let Some(payload) = self.invoke(descriptor, id, |d| handler(d, &transmission)) {
                self.end_pass(HandlerKind::Transmission, &name);
                resume_unwind(payload);
            }
        }
        self.end_pass(HandlerKind::Transmission, &name);
    }

    fn catch_up_events(
        &mut self,
        descriptor: &Arc<StructDescriptor>,
        id: HandlerId,
        entries: Vec<CacheEntry>,
    ) {
        let name = descriptor.name().to_string();
        let total = entries.len();
        log::debug!(
            "[Dispatcher] replaying {} cached '{}' to event handler {}",
            total,
            name,
            id
        );

        self.dispatching.push((HandlerKind::Event, name.clone()));
        for (i, entry) in entries.iter().enumerate() {
            if self.pending_removals.contains(&id) {
                break;
            }
            let header = replay_header(descriptor, entry, (total - 1 - i) as u32);
            let mut info = entry.clone_info().clone();
            info.last_operation = OperationKind::Create;
            let event = Event::new(
                &header,
                entry.instance(),
                entry.instance(),
                &info,
                OperationKind::Create,
                None,
            );

            let Some(handler) = self.event_handlers.get(&name).and_then(|r| r.get(id)) else {
                break;
            };
            if let Some(payload) = self.invoke(descriptor, id, |d| handler(d, &event)) {
                self.end_pass(HandlerKind::Event, &name);
                resume_unwind(payload);
            }
        }
        self.end_pass(HandlerKind::Event, &name);
    }

    // ------------------------------------------------------------------------
    // Dispatch
    // ------------------------------------------------------------------------

    fn resolve(&self, transmission: &Transmission) -> Result<Arc<StructDescriptor>> {
        let name = transmission.type_name();
        let own = transmission.instance.descriptor();
        if own.name() != name {
            return Err(Error::TypeMismatch {
                expected: name.to_string(),
                got: own.name().to_string(),
            });
        }
        Ok(self
            .registry
            .as_ref()
            .and_then(|r| r.lookup(name))
            .unwrap_or_else(|| Arc::clone(own)))
    }

    /// Deliver one transmission.
    ///
    /// Returns the effective operation kind; a remove that found nothing
    /// still returns [`OperationKind::Remove`] but raises no event.
    ///
    /// # Errors
    ///
    /// Reconciliation failures ([`Error::MissingKeyFields`],
    /// [`Error::TypeMismatch`]). The cache is untouched in that case, but
    /// transmission handlers have already run.
    pub fn dispatch(&mut self, transmission: &Transmission) -> Result<OperationKind> {
        let descriptor = self.resolve(transmission)?;
        let name = descriptor.name();

        if self.transmission_handler_count(name) > 0 {
            self.run_transmission_handlers(&descriptor, transmission);
        }

        let has_event_handlers = self.event_handler_count(name) > 0;
        let reconciliation = self.pool.reconcile(
            &descriptor,
            &transmission.header,
            transmission.instance.as_ref(),
        )?;
        let kind = reconciliation.kind();
        log::trace!(
            "[Dispatcher] {} '{}' from peer {}",
            kind,
            name,
            transmission.header.sender
        );

        if !has_event_handlers {
            return Ok(kind);
        }

        let (updated, clone_info) = match reconciliation {
            Reconciliation::NoOp(_) => return Ok(kind),
            Reconciliation::Stored { entry, .. } => {
                (Some(entry.instance().clone_record()), entry.clone_info().clone())
            }
            Reconciliation::Removed(entry) => {
                let (instance, info) = entry.into_parts();
                (Some(instance), info)
            }
            Reconciliation::Transient(info) => (None, info),
        };

        let transmitted = transmission.instance.as_ref();
        let event = Event::new(
            &transmission.header,
            transmitted,
            updated.as_deref().unwrap_or(transmitted),
            &clone_info,
            kind,
            self.config.self_id,
        );
        self.run_event_handlers(&descriptor, &event);
        Ok(kind)
    }

    fn run_transmission_handlers(&mut self, descriptor: &StructDescriptor, transmission: &Transmission) {
        let name = descriptor.name().to_string();
        let ids = match self.transmission_handlers.get(&name) {
            Some(registry) => registry.ids(),
            None => return,
        };

        self.dispatching.push((HandlerKind::Transmission, name.clone()));
        for id in ids {
            if self.pending_removals.contains(&id) {
                continue;
            }
            let Some(handler) = self.transmission_handlers.get(&name).and_then(|r| r.get(id))
            else {
                continue;
            };
            if let Some(payload) = self.invoke(descriptor, id, |d| handler(d, transmission)) {
                self.end_pass(HandlerKind::Transmission, &name);
                resume_unwind(payload);
            }
        }
        self.end_pass(HandlerKind::Transmission, &name);
    }

    fn run_event_handlers(&mut self, descriptor: &StructDescriptor, event: &Event<'_>) {
        let name = descriptor.name().to_string();
        let ids = match self.event_handlers.get(&name) {
            Some(registry) => registry.ids(),
            None => return,
        };

        self.dispatching.push((HandlerKind::Event, name.clone()));
        for id in ids {
            if self.pending_removals.contains(&id) {
                continue;
            }
            let Some(handler) = self.event_handlers.get(&name).and_then(|r| r.get(id)) else {
                continue;
            };
            if let Some(payload) = self.invoke(descriptor, id, |d| handler(d, event)) {
                self.end_pass(HandlerKind::Event, &name);
                resume_unwind(payload);
            }
        }
        self.end_pass(HandlerKind::Event, &name);
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("config", &self.config)
            .field("containers", &self.pool.len())
            .field("transmission_types", &self.transmission_handlers.len())
            .field("event_types", &self.event_handlers.len())
            .field("next_handler_id", &self.next_handler_id)
            .field("pending_removals", &self.pending_removals.len())
            .finish()
    }
}
