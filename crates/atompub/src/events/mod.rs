//! # Exchange Interception
//!
//! Every network operation of the resource model is announced twice on an [`EventBus`]:
//! once before the request is issued ([`Phase::Pre`]) and once after the response
//! arrives ([`Phase::Post`]). Callbacks subscribe with a [`Filter`] over the [`Token`]s
//! describing an exchange:
//!
//! | kind     | tokens                                   |
//! |----------|------------------------------------------|
//! | phase    | `PRE`, `POST`                            |
//! | method   | `GET`, `PUT`, `DELETE`, `CREATE`         |
//! | modifier | `MEDIA`, `NEXT`                          |
//! | resource | `SERVICE`, `COLLECTION`, `ENTRY`         |
//! | wildcard | `ANY`                                    |
//!
//! A filter selects an exchange when each of its tokens describes that exchange, with
//! `ANY` describing all of them. Filters without a phase only see the `PRE` phase, so
//! `PUT_ENTRY` is notified before every entry update and `ANY` on both sides of every
//! exchange.
//!
//! `PRE` callbacks receive the outgoing headers mutably and may add to them, which is how
//! authentication is layered onto requests. `POST` callbacks receive the response headers
//! and body.
#[cfg(test)]
mod tests;

mod event;
mod filter;

pub use event::{Event, Operation, Phase, ResourceKind};
pub use filter::{Filter, FilterError, Token, TokenSet};

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use http::HeaderMap;
use thiserror::Error;

use crate::error::Error;
use crate::transport::Response;

/// The error type callbacks may fail with.
pub type HookError = Box<dyn std::error::Error + Send + Sync>;

/// A callback notified of the exchanges selected by its [`Filter`].
pub type Callback = dyn Fn(&mut HeaderMap, &[u8], &Event) -> Result<(), HookError> + Send + Sync;

/// A callback failed, aborting the exchange it was notified of.
#[derive(Error, Debug)]
#[error("The {filter} callback failed on {event}")]
pub struct CallbackError {
    pub filter: Filter,
    pub event: Event,
    #[source]
    pub source: HookError,
}

/// The registry of callbacks interested in the exchanges of the resource model.
///
/// Shared between resources through their [`crate::Client`]. Callbacks are run in
/// registration order, inline with the exchange that triggered them.
#[derive(Default)]
pub struct EventBus {
    callbacks: Mutex<Vec<(Filter, Arc<Callback>)>>,
}

impl EventBus {
    /// Notify `callback` of every exchange selected by `filter`.
    pub fn register<F>(&self, filter: &str, callback: F) -> Result<(), FilterError>
    where
        F: Fn(&mut HeaderMap, &[u8], &Event) -> Result<(), HookError> + Send + Sync + 'static,
    {
        self.subscribe(filter.parse()?, callback);
        Ok(())
    }

    /// Like [`EventBus::register`], with an already parsed filter.
    pub fn subscribe<F>(&self, filter: Filter, callback: F)
    where
        F: Fn(&mut HeaderMap, &[u8], &Event) -> Result<(), HookError> + Send + Sync + 'static,
    {
        tracing::trace!(%filter, "registering callback");
        self.lock().push((filter, Arc::new(callback)));
    }

    /// Remove every registered callback.
    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Run every callback whose filter selects `event`, stopping at the first failure.
    ///
    /// Callbacks registered while a dispatch is running are first notified on the next
    /// one.
    pub fn trigger(
        &self,
        event: &Event,
        headers: &mut HeaderMap,
        body: &[u8],
    ) -> Result<(), CallbackError> {
        let tokens = event.tokens();
        let selected: Vec<_> = self
            .lock()
            .iter()
            .filter(|(filter, _)| filter.matches(tokens))
            .cloned()
            .collect();

        for (filter, callback) in selected {
            callback(headers, body, event).map_err(|source| CallbackError {
                filter,
                event: event.clone(),
                source,
            })?;
        }
        Ok(())
    }

    /// Run `exchange` between the `PRE` and `POST` notifications of an operation.
    ///
    /// `PRE` callbacks see `headers` and the request `body` before both are handed to
    /// `exchange`, with whatever headers the callbacks added. `POST` callbacks see the
    /// response, which is then returned as is. Errors from `exchange` skip the `POST`
    /// phase.
    pub fn intercept<F>(
        &self,
        resource: ResourceKind,
        operation: Operation,
        uri: &url::Url,
        mut headers: HeaderMap,
        body: Option<Vec<u8>>,
        exchange: F,
    ) -> Result<Response, Error>
    where
        F: FnOnce(HeaderMap, Option<Vec<u8>>) -> Result<Response, Error>,
    {
        let event = Event::pre(resource, operation, uri.clone());
        self.trigger(&event, &mut headers, body.as_deref().unwrap_or_default())?;

        let mut response = exchange(headers, body)?;

        let event = event.post(response.status);
        self.trigger(&event, &mut response.headers, &response.body)?;
        Ok(response)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(Filter, Arc<Callback>)>> {
        self.callbacks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let filters: Vec<String> = self.lock().iter().map(|(f, _)| f.to_string()).collect();
        f.debug_struct("EventBus").field("callbacks", &filters).finish()
    }
}
