use http::header::{HeaderValue, CONTENT_TYPE};
use http::{HeaderMap, Method};
use url::Url;
use xmltree::Element;

use super::{exchange, invalidates, require, send, Document};
use crate::context::{Client, Context, FromContext};
use crate::error::Error;
use crate::events::{Operation, ResourceKind};
use crate::transport::Response;
use crate::uri::absolutize;
use crate::xml;

const ENTRY_TYPE: &str = "application/atom+xml;type=entry";

/// A member entry of a collection, possibly a Media Link Entry with an associated media
/// resource.
#[derive(Debug, Clone)]
pub struct Entry {
    context: Context,
    document: Option<Document>,
    edit_media: Option<Url>,
}

impl Entry {
    pub fn new(context: Context) -> Self {
        Entry {
            context,
            document: None,
            edit_media: None,
        }
    }

    /// An entry at `uri`, in a fresh context.
    pub fn from_uri(client: Client, uri: Url) -> Self {
        Entry::new(Context::new(client).with_entry(uri))
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn uri(&self) -> Option<&Url> {
        self.context.entry()
    }

    /// The body of the last successful `get`.
    pub fn representation(&self) -> Option<&[u8]> {
        self.document.as_ref().map(|d| d.body.as_slice())
    }

    fn clear(&mut self) {
        self.document = None;
        self.edit_media = None;
    }

    /// Fetch the entry, caching it and its `edit-media` link on success.
    pub fn get(&mut self, headers: HeaderMap) -> Result<Response, Error> {
        let uri = require(self.uri(), ResourceKind::Entry)?;
        let response = exchange(
            &self.context,
            ResourceKind::Entry,
            Operation::Get,
            Method::GET,
            &uri,
            headers,
            None,
        )?;

        self.clear();
        if response.is_success() {
            let document = Document::parse(&response)?;
            self.edit_media = xml::link_value(&document.tree, "edit-media")
                .map(|href| absolutize(&uri, href))
                .transpose()?;
            self.document = Some(document);
        }
        Ok(response)
    }

    fn ensure_fetched(&mut self) -> Result<(), Error> {
        if self.document.is_none() {
            self.get(HeaderMap::new())?;
        }
        Ok(())
    }

    /// The parsed entry, fetching it on first use.
    pub fn tree(&mut self) -> Result<Option<&Element>, Error> {
        self.ensure_fetched()?;
        Ok(self.document.as_ref().map(|d| &d.tree))
    }

    /// The parsed entry for editing in place before a [`Entry::put`] without a body.
    pub fn tree_mut(&mut self) -> Result<Option<&mut Element>, Error> {
        self.ensure_fetched()?;
        Ok(self.document.as_mut().map(|d| &mut d.tree))
    }

    /// Whether this is a Media Link Entry, fetching the entry on first use.
    pub fn has_media(&mut self) -> Result<bool, Error> {
        self.ensure_fetched()?;
        Ok(self.edit_media.is_some())
    }

    /// The absolute URI of the media resource, if known.
    pub fn edit_media(&self) -> Option<&Url> {
        self.edit_media.as_ref()
    }

    fn media_uri(&mut self) -> Result<Url, Error> {
        self.ensure_fetched()?;
        match &self.edit_media {
            Some(uri) => Ok(uri.clone()),
            None => Err(Error::NoMediaLink(require(self.uri(), ResourceKind::Entry)?)),
        }
    }

    /// Fetch the media resource of this Media Link Entry.
    pub fn get_media(&mut self, headers: HeaderMap) -> Result<Response, Error> {
        let uri = self.media_uri()?;
        exchange(
            &self.context,
            ResourceKind::Entry,
            Operation::GetMedia,
            Method::GET,
            &uri,
            headers,
            None,
        )
    }

    /// Replace the media resource of this Media Link Entry.
    pub fn put_media(&mut self, headers: HeaderMap, body: Vec<u8>) -> Result<Response, Error> {
        let uri = self.media_uri()?;
        let response = exchange(
            &self.context,
            ResourceKind::Entry,
            Operation::PutMedia,
            Method::PUT,
            &uri,
            headers,
            Some(body),
        )?;
        if invalidates(&response) {
            self.clear();
        }
        Ok(response)
    }

    /// Update the entry on the server.
    ///
    /// Without a `body`, the cached entry is serialized and sent, fetching it first if
    /// needed. The `content-type` defaults to `application/atom+xml;type=entry`.
    pub fn put(&mut self, headers: HeaderMap, body: Option<Vec<u8>>) -> Result<Response, Error> {
        let uri = require(self.uri(), ResourceKind::Entry)?;
        if body.is_none() {
            self.ensure_fetched()?;
        }

        let cached = self.document.as_ref().map(|d| &d.tree);
        let context = &self.context;
        let response = context.client().events().intercept(
            ResourceKind::Entry,
            Operation::Put,
            &uri,
            headers,
            body,
            |mut headers, body| {
                headers
                    .entry(CONTENT_TYPE)
                    .or_insert(HeaderValue::from_static(ENTRY_TYPE));
                let body = match (body, cached) {
                    (Some(body), _) => body,
                    (None, Some(tree)) => xml::serialize(tree)?,
                    (None, None) => return Err(Error::NoRepresentation(uri.clone())),
                };
                send(context, Method::PUT, &uri, headers, Some(body))
            },
        )?;

        if invalidates(&response) {
            self.clear();
        }
        Ok(response)
    }

    /// Delete the entry from the server.
    pub fn delete(&mut self, headers: HeaderMap) -> Result<Response, Error> {
        let uri = require(self.uri(), ResourceKind::Entry)?;
        let response = exchange(
            &self.context,
            ResourceKind::Entry,
            Operation::Delete,
            Method::DELETE,
            &uri,
            headers,
            None,
        )?;
        if invalidates(&response) {
            self.clear();
        }
        Ok(response)
    }
}

impl FromContext for Entry {
    fn from_context(context: Context) -> Self {
        Entry::new(context)
    }
}
