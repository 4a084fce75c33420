use thiserror::Error;
use url::Url;

use crate::context::ContextError;
use crate::events::{CallbackError, ResourceKind};
use crate::transport::{Response, TransportError};

#[derive(Error, Debug)]
pub enum Error {
    /// A successful response whose body is not well-formed XML. The response is kept so
    /// callers can inspect what the server sent.
    #[error("The {} document returned by the server is not well-formed", .response.status)]
    MalformedDocument {
        response: Box<Response>,
        #[source]
        source: xmltree::ParseError,
    },
    #[error("The entry at {0} has no edit-media link")]
    NoMediaLink(Url),
    #[error("The context has no {0} location")]
    MissingUri(ResourceKind),
    #[error("The collection has no further pages")]
    NoNextPage,
    #[error("There is no representation of {0} to send")]
    NoRepresentation(Url),
    #[error(transparent)]
    InvalidUri(#[from] url::ParseError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Callback(#[from] CallbackError),
    #[error(transparent)]
    Context(#[from] ContextError),
    #[error(transparent)]
    Serialize(#[from] xmltree::Error),
}
