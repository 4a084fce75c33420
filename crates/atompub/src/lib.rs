//! # AtomPub Client Model
//!
//! A client-side model of the Atom Publishing Protocol (RFC 5023). Navigation flows
//! from a service document, to the collections it advertises, to the member entries of
//! each collection:
//!
//! ```text
//! Service ──iter()──▶ Context ──▶ Collection ──iter()──▶ Context ──▶ Entry
//! ```
//!
//! A [`Context`] records which service, collection and entry are "current". Every
//! resource owns a copy of one, and every navigation step hands out a fresh copy with a
//! single field overwritten, so independent walks never alias each other's state.
//!
//! Each network operation of a resource is composed with the [`EventBus`] of its
//! [`Client`], which notifies registered callbacks before the request is issued and
//! after the response arrives. Authentication headers, logging and protocol checks are
//! all layered on through that bus.
//!
//! The [`text`] module reads and writes Atom text and date constructs on the parsed
//! trees the resources cache.
#[deny(missing_docs)]
pub mod context;
pub mod events;
pub mod mime;
pub mod model;
pub mod text;
pub mod transport;
pub mod uri;
pub mod validate;
pub mod xml;

mod auth;
mod error;

pub use auth::{trace_exchanges, HeaderAuth};
pub use context::{Client, Context, ContextState, FromContext};
pub use error::Error;
pub use events::EventBus;
pub use model::{Collection, CollectionInfo, Entry, Service};
pub use transport::{Request, Response, Transport};
