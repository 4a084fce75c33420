use http::{HeaderMap, Method};
use serde::Serialize;
use url::Url;
use xmltree::Element;

use super::{exchange, require, Document};
use crate::context::{Client, Context, FromContext};
use crate::error::Error;
use crate::events::{Operation, ResourceKind};
use crate::mime;
use crate::text::child_title;
use crate::transport::Response;
use crate::uri::absolutize;
use crate::xml::{self, QName};

/// The media range accepted by collections that do not list any `app:accept`.
const DEFAULT_ACCEPT: &str = "application/atom+xml";

/// A collection as advertised by a service document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectionInfo {
    /// Title of the workspace the collection belongs to.
    pub workspace: String,
    pub title: String,
    /// The absolute collection URI, `None` when the collection has no `href`.
    pub href: Option<Url>,
}

/// An AtomPub service document.
#[derive(Debug, Clone)]
pub struct Service {
    context: Context,
    document: Option<Document>,
}

impl Service {
    pub fn new(context: Context) -> Self {
        Service {
            context,
            document: None,
        }
    }

    /// A service document at `uri`, in a fresh context.
    pub fn from_uri(client: Client, uri: Url) -> Self {
        Service::new(Context::new(client).with_service(uri))
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn uri(&self) -> Option<&Url> {
        self.context.service()
    }

    /// The body of the last successful `get`.
    pub fn representation(&self) -> Option<&[u8]> {
        self.document.as_ref().map(|d| d.body.as_slice())
    }

    /// Fetch the service document, caching it when the server answers with success.
    pub fn get(&mut self, headers: HeaderMap) -> Result<Response, Error> {
        let uri = require(self.uri(), ResourceKind::Service)?;
        let response = exchange(
            &self.context,
            ResourceKind::Service,
            Operation::Get,
            Method::GET,
            &uri,
            headers,
            None,
        )?;

        self.document = None;
        if response.is_success() {
            self.document = Some(Document::parse(&response)?);
        }
        Ok(response)
    }

    /// The parsed service document, fetching it on first use.
    ///
    /// `None` when the server did not answer with a document.
    pub fn tree(&mut self) -> Result<Option<&Element>, Error> {
        if self.document.is_none() {
            self.get(HeaderMap::new())?;
        }
        Ok(self.document.as_ref().map(|d| &d.tree))
    }

    /// Contexts for each collection accepting a media type in `range`, such as
    /// `image/png` or `image/*`.
    ///
    /// The document is fetched up front if needed. Each context is a copy of this
    /// service's context with the collection set.
    pub fn iter_match<'a>(&'a mut self, range: &'a str) -> Result<Collections<'a>, Error> {
        let base = require(self.uri(), ResourceKind::Service)?;
        self.tree()?;
        let this: &'a Service = self;

        let collections = this
            .document
            .as_ref()
            .map(|d| xml::descendants(&d.tree, QName::app("collection")))
            .unwrap_or_default();

        Ok(Collections {
            context: &this.context,
            base,
            range,
            collections: collections.into_iter(),
        })
    }

    /// Contexts for every collection in the service document.
    pub fn iter(&mut self) -> Result<Collections<'_>, Error> {
        self.iter_match("*/*")
    }

    /// The workspace title, collection title and collection URI of every collection,
    /// grouped by workspace in document order.
    pub fn iter_info(
        &mut self,
    ) -> Result<impl Iterator<Item = Result<CollectionInfo, Error>> + '_, Error> {
        let base = require(self.uri(), ResourceKind::Service)?;
        let workspaces = self
            .tree()?
            .map(|tree| xml::descendants(tree, QName::app("workspace")))
            .unwrap_or_default();

        Ok(workspaces.into_iter().flat_map(move |workspace| {
            let workspace_title = child_title(workspace);
            let base = base.clone();
            xml::descendants(workspace, QName::app("collection"))
                .into_iter()
                .map(move |collection| -> Result<CollectionInfo, Error> {
                    Ok(CollectionInfo {
                        workspace: workspace_title.clone(),
                        title: child_title(collection),
                        href: href(&base, collection)?,
                    })
                })
        }))
    }
}

impl FromContext for Service {
    fn from_context(context: Context) -> Self {
        Service::new(context)
    }
}

fn href(base: &Url, collection: &Element) -> Result<Option<Url>, Error> {
    collection
        .attributes
        .get("href")
        .map(|h| absolutize(base, h))
        .transpose()
        .map_err(Error::from)
}

/// Whether `collection` accepts any media type in `range`.
///
/// An empty `app:accept` accepts nothing.
fn accepts(collection: &Element, range: &str) -> bool {
    let mut accepted = xml::children(collection, QName::app("accept"))
        .map(xml::text)
        .peekable();
    if accepted.peek().is_none() {
        return mime::matches(DEFAULT_ACCEPT, range);
    }
    accepted.any(|t| !t.trim().is_empty() && mime::matches(t.trim(), range))
}

/// The contexts of the collections of a [`Service`], produced by [`Service::iter_match`].
pub struct Collections<'a> {
    context: &'a Context,
    base: Url,
    range: &'a str,
    collections: std::vec::IntoIter<&'a Element>,
}

impl Iterator for Collections<'_> {
    type Item = Result<Context, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        let collection = self
            .collections
            .by_ref()
            .find(|c| accepts(c, self.range))?;
        Some(href(&self.base, collection).map(|href| {
            let mut context = self.context.clone();
            context.set_collection(href);
            context
        }))
    }
}
