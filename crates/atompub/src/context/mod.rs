//! # Navigation Context
//!
//! A [`Context`] is the "you are here" of an AtomPub walk: which service document,
//! collection and member entry are current. The three locations form a hierarchy, so
//! changing an outer one forgets everything below it:
//!
//! - setting the service clears the collection, the entry and the saved history
//! - setting the collection clears the entry and the saved history
//! - the entry may be set on its own
//!
//! [`ContextState::push`] and [`ContextState::pop`] allow a temporary detour into another
//! collection, returning afterwards to the exact collection and entry that were current.
//!
//! The locations themselves live in a plain, serializable [`ContextState`], which a
//! [`Context`] pairs with the [`Client`] used to reach them. A saved state can be
//! resumed later with [`Context::from_state`], and [`Context::restore`] rebuilds the
//! resources it points at.
#[cfg(test)]
mod tests;

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::events::EventBus;
use crate::transport::Transport;

/// Errors raised while manipulating a [`ContextState`].
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ContextError {
    /// [`ContextState::pop`] was called without a matching [`ContextState::push`].
    #[error("There is no saved collection to return to")]
    EmptyHistory,
}

/// The serializable part of a [`Context`]: the current locations and the stack of saved
/// `(collection, entry)` pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextState {
    service: Option<Url>,
    collection: Option<Url>,
    entry: Option<Url>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    history: Vec<(Option<Url>, Option<Url>)>,
}

impl ContextState {
    /// The current service document URI.
    pub fn service(&self) -> Option<&Url> {
        self.service.as_ref()
    }

    /// The current collection URI.
    pub fn collection(&self) -> Option<&Url> {
        self.collection.as_ref()
    }

    /// The current member entry URI.
    pub fn entry(&self) -> Option<&Url> {
        self.entry.as_ref()
    }

    /// The number of detours taken with [`ContextState::push`] that have not been undone.
    pub fn depth(&self) -> usize {
        self.history.len()
    }

    /// Set the service, forgetting the collection, the entry and any saved history.
    pub fn set_service(&mut self, service: Option<Url>) {
        self.service = service;
        self.collection = None;
        self.entry = None;
        self.history.clear();
    }

    /// Set the collection, forgetting the entry and any saved history.
    pub fn set_collection(&mut self, collection: Option<Url>) {
        self.collection = collection;
        self.entry = None;
        self.history.clear();
    }

    /// Set the entry. Nothing else changes.
    pub fn set_entry(&mut self, entry: Option<Url>) {
        self.entry = entry;
    }

    /// Save the current collection and entry, then make `collection` current with no
    /// entry.
    pub fn push(&mut self, collection: Url) {
        let saved = (self.collection.take(), self.entry.take());
        self.history.push(saved);
        self.collection = Some(collection);
    }

    /// Return to the collection and entry saved by the most recent
    /// [`ContextState::push`].
    pub fn pop(&mut self) -> Result<(), ContextError> {
        let (collection, entry) = self.history.pop().ok_or(ContextError::EmptyHistory)?;
        self.collection = collection;
        self.entry = entry;
        Ok(())
    }
}

/// What a resource needs to talk to the outside world: the transport that performs
/// requests and the bus every exchange is announced on.
///
/// Cloning a client shares both.
#[derive(Clone)]
pub struct Client {
    transport: Arc<dyn Transport>,
    events: Arc<EventBus>,
}

impl Client {
    /// A client over `transport` with a fresh, empty [`EventBus`].
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Client::with_events(transport, Arc::new(EventBus::default()))
    }

    /// A client over `transport` announcing exchanges on an existing bus.
    pub fn with_events(transport: Arc<dyn Transport>, events: Arc<EventBus>) -> Self {
        Client { transport, events }
    }

    /// The transport requests are issued through.
    pub fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    /// The bus exchanges are announced on.
    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("events", &self.events)
            .finish_non_exhaustive()
    }
}

/// The current position of a walk over an AtomPub server, along with the [`Client`] used
/// to reach it.
///
/// Dereferences to its [`ContextState`] for reading and updating the locations. Clones
/// copy the locations and share the client, so a clone can be walked independently of
/// the context it came from.
#[derive(Debug, Clone)]
pub struct Context {
    state: ContextState,
    client: Client,
}

impl Context {
    /// An empty context using `client`.
    pub fn new(client: Client) -> Self {
        Context::from_state(ContextState::default(), client)
    }

    /// Resume a saved state with `client`.
    pub fn from_state(state: ContextState, client: Client) -> Self {
        Context { state, client }
    }

    /// A copy of this context with a different service.
    pub fn with_service(&self, service: Url) -> Self {
        let mut context = self.clone();
        context.set_service(Some(service));
        context
    }

    /// A copy of this context with a different collection.
    pub fn with_collection(&self, collection: Url) -> Self {
        let mut context = self.clone();
        context.set_collection(Some(collection));
        context
    }

    /// A copy of this context with a different entry.
    pub fn with_entry(&self, entry: Url) -> Self {
        let mut context = self.clone();
        context.set_entry(Some(entry));
        context
    }

    /// The client shared by every copy of this context.
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// The locations, for saving.
    pub fn state(&self) -> &ContextState {
        &self.state
    }

    /// Drop the client, keeping only the locations.
    pub fn into_state(self) -> ContextState {
        self.state
    }

    /// Rebuild the resources this context points at.
    ///
    /// Each slot is built from a copy of this context only when its location is set, and
    /// is `None` otherwise.
    pub fn restore<S, C, E>(&self) -> (Option<S>, Option<C>, Option<E>)
    where
        S: FromContext,
        C: FromContext,
        E: FromContext,
    {
        let build = |set: bool| set.then(|| self.clone());
        (
            build(self.service.is_some()).map(S::from_context),
            build(self.collection.is_some()).map(C::from_context),
            build(self.entry.is_some()).map(E::from_context),
        )
    }
}

impl Deref for Context {
    type Target = ContextState;
    fn deref(&self) -> &Self::Target {
        &self.state
    }
}

impl DerefMut for Context {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.state
    }
}

/// Types that can be built from a [`Context`], such as the resources of [`crate::model`].
pub trait FromContext {
    /// Build `Self` around `context`.
    fn from_context(context: Context) -> Self;
}
