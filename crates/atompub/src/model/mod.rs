//! # Resource Model
//!
//! The three kinds of AtomPub resource, each a small state machine over a [`Context`]:
//!
//! - [`Service`] reads a service document and hands out contexts for its collections.
//! - [`Collection`] walks the pages of a collection feed and creates new members.
//! - [`Entry`] reads, updates and deletes a member entry and its media resource.
//!
//! A resource starts out unfetched. A successful `get` caches the response body along
//! with its parsed tree, and any accessor needing the tree performs that `get` on first
//! use. Successful updates and deletes drop the cache again. Responses with an error
//! status are returned as is and leave the resource unfetched; only a `2xx` body that is
//! not well-formed XML is an error.
//!
//! Every exchange is announced on the [`crate::EventBus`] of the context's client.

mod collection;
mod entry;
mod service;

pub use collection::{Collection, EntryContexts, EntryTrees};
pub use entry::Entry;
pub use service::{Collections, CollectionInfo, Service};

use http::{HeaderMap, Method};
use url::Url;
use xmltree::Element;

use crate::context::Context;
use crate::error::Error;
use crate::events::{Operation, ResourceKind};
use crate::transport::{Request, Response};
use crate::xml;

/// A fetched representation of a resource.
#[derive(Debug, Clone)]
struct Document {
    body: Vec<u8>,
    tree: Element,
}

impl Document {
    /// Parse the body of `response`, keeping the whole response in the error when it is not
    /// well-formed.
    fn parse(response: &Response) -> Result<Self, Error> {
        match xml::parse(&response.body) {
            Ok(tree) => Ok(Document {
                body: response.body.clone(),
                tree,
            }),
            Err(source) => {
                tracing::debug!(status = %response.status, %source, "malformed document");
                Err(Error::MalformedDocument {
                    response: Box::new(response.clone()),
                    source,
                })
            }
        }
    }
}

fn require(uri: Option<&Url>, kind: ResourceKind) -> Result<Url, Error> {
    uri.cloned().ok_or(Error::MissingUri(kind))
}

/// Issue a request through the transport of `context`, outside of any interception.
fn send(
    context: &Context,
    method: Method,
    uri: &Url,
    headers: HeaderMap,
    body: Option<Vec<u8>>,
) -> Result<Response, Error> {
    tracing::debug!(%method, %uri, "sending request");
    let request = Request {
        method,
        uri: uri.clone(),
        headers,
        body,
    };
    let response = context.client().transport().request(request)?;
    tracing::debug!(%uri, status = %response.status, "received response");
    Ok(response)
}

/// Issue `operation` against `uri`, announced on the event bus of `context`.
fn exchange(
    context: &Context,
    resource: ResourceKind,
    operation: Operation,
    method: Method,
    uri: &Url,
    headers: HeaderMap,
    body: Option<Vec<u8>>,
) -> Result<Response, Error> {
    context
        .client()
        .events()
        .intercept(resource, operation, uri, headers, body, |headers, body| {
            send(context, method, uri, headers, body)
        })
}

/// Whether a mutation answered with `response` invalidates cached representations.
fn invalidates(response: &Response) -> bool {
    response.status.as_u16() < 300
}
