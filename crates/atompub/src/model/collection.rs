use http::{HeaderMap, Method, StatusCode};
use url::Url;
use xmltree::Element;

use super::{exchange, require, Document};
use crate::context::{Client, Context, FromContext};
use crate::error::Error;
use crate::events::{Operation, ResourceKind};
use crate::transport::Response;
use crate::uri::absolutize;
use crate::xml::{self, QName};

/// An AtomPub collection, read as a series of feed pages linked by `rel="next"`.
#[derive(Debug, Clone)]
pub struct Collection {
    context: Context,
    page: Option<Document>,
    /// Positions of the `atom:entry` children of the current page.
    members: Vec<usize>,
    next: Option<Url>,
}

impl Collection {
    pub fn new(context: Context) -> Self {
        Collection {
            context,
            page: None,
            members: Vec::new(),
            next: None,
        }
    }

    /// A collection at `uri`, in a fresh context.
    pub fn from_uri(client: Client, uri: Url) -> Self {
        Collection::new(Context::new(client).with_collection(uri))
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn uri(&self) -> Option<&Url> {
        self.context.collection()
    }

    /// The body of the current page.
    pub fn representation(&self) -> Option<&[u8]> {
        self.page.as_ref().map(|d| d.body.as_slice())
    }

    /// Fetch the first page of the collection.
    pub fn get(&mut self, headers: HeaderMap) -> Result<Response, Error> {
        let uri = require(self.uri(), ResourceKind::Collection)?;
        let response = exchange(
            &self.context,
            ResourceKind::Collection,
            Operation::Get,
            Method::GET,
            &uri,
            headers,
            None,
        )?;
        self.record(&uri, &response)?;
        Ok(response)
    }

    /// Whether the current page links to a following one.
    pub fn has_next(&self) -> bool {
        self.next.is_some()
    }

    /// The absolute URI of the following page.
    pub fn next_uri(&self) -> Option<&Url> {
        self.next.as_ref()
    }

    /// Fetch the page following the current one.
    pub fn get_next(&mut self, headers: HeaderMap) -> Result<Response, Error> {
        let uri = self.next.clone().ok_or(Error::NoNextPage)?;
        let response = exchange(
            &self.context,
            ResourceKind::Collection,
            Operation::GetNext,
            Method::GET,
            &uri,
            headers,
            None,
        )?;
        self.record(&uri, &response)?;
        Ok(response)
    }

    /// Cache the page fetched from `base` and find the page after it.
    fn record(&mut self, base: &Url, response: &Response) -> Result<(), Error> {
        self.page = None;
        self.members.clear();
        self.next = None;
        if response.status != StatusCode::OK {
            return Ok(());
        }

        let page = Document::parse(response)?;
        self.next = xml::link_value(&page.tree, "next")
            .map(|next| absolutize(base, next))
            .transpose()?;
        let entry = QName::atom("entry");
        self.members = page
            .tree
            .children
            .iter()
            .enumerate()
            .filter(|(_, node)| xml::as_element(node).is_some_and(|e| entry.matches(e)))
            .map(|(position, _)| position)
            .collect();
        tracing::trace!(page = %base, next = ?self.next.as_ref().map(Url::as_str), "recorded page");
        self.page = Some(page);
        Ok(())
    }

    /// The current page, fetching the first one if nothing is cached.
    pub fn tree(&mut self) -> Result<Option<&Element>, Error> {
        if self.page.is_none() {
            self.get(HeaderMap::new())?;
        }
        Ok(self.page.as_ref().map(|d| &d.tree))
    }

    /// Create a new member by posting `body`. Set `content-type` to match, e.g. an
    /// image type for media collections.
    pub fn create(&mut self, headers: HeaderMap, body: Vec<u8>) -> Result<Response, Error> {
        let uri = require(self.uri(), ResourceKind::Collection)?;
        exchange(
            &self.context,
            ResourceKind::Collection,
            Operation::Create,
            Method::POST,
            &uri,
            headers,
            Some(body),
        )
    }

    /// Create a new member, returning a copy of this collection's context pointing at it.
    ///
    /// `None` unless the server answers `201 Created` with a `location`, which is resolved
    /// against the collection URI. The request is made through [`Collection::create`], so
    /// it is announced to `CREATE` callbacks like any other creation and carries the
    /// headers they add.
    pub fn entry_create(
        &mut self,
        headers: HeaderMap,
        body: Vec<u8>,
    ) -> Result<Option<Context>, Error> {
        let base = require(self.uri(), ResourceKind::Collection)?;
        let response = self.create(headers, body)?;
        let location = match response.header("location") {
            Some(location) if response.status == StatusCode::CREATED => location,
            _ => return Ok(None),
        };
        Ok(Some(self.context.with_entry(absolutize(&base, location)?)))
    }

    /// Contexts for every member entry, across all pages, starting over from the first
    /// page.
    pub fn iter(&mut self) -> EntryContexts<'_> {
        EntryContexts(Members::new(self))
    }

    /// The member entries as they appear in the feed, across all pages, starting over
    /// from the first page. These may be partial representations of the entries.
    pub fn iter_entry(&mut self) -> EntryTrees<'_> {
        EntryTrees(Members::new(self))
    }

    fn member(&self, index: usize) -> Option<&Element> {
        let page = self.page.as_ref()?;
        let position = *self.members.get(index)?;
        page.tree.children.get(position).and_then(xml::as_element)
    }
}

impl FromContext for Collection {
    fn from_context(context: Context) -> Self {
        Collection::new(context)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cursor {
    Start,
    Page(usize),
    Done,
}

/// A walk over the members of a collection, page by page.
struct Members<'a> {
    collection: &'a mut Collection,
    cursor: Cursor,
}

impl<'a> Members<'a> {
    fn new(collection: &'a mut Collection) -> Self {
        Members {
            collection,
            cursor: Cursor::Start,
        }
    }

    /// Move to the next member, returning its index in the current page.
    fn advance(&mut self) -> Option<Result<usize, Error>> {
        loop {
            match self.cursor {
                Cursor::Done => return None,
                Cursor::Start => {
                    self.cursor = Cursor::Page(0);
                    if let Err(e) = self.collection.get(HeaderMap::new()) {
                        self.cursor = Cursor::Done;
                        return Some(Err(e));
                    }
                }
                Cursor::Page(i) if self.collection.member(i).is_some() => {
                    self.cursor = Cursor::Page(i + 1);
                    return Some(Ok(i));
                }
                Cursor::Page(_) if self.collection.has_next() => {
                    self.cursor = Cursor::Page(0);
                    if let Err(e) = self.collection.get_next(HeaderMap::new()) {
                        self.cursor = Cursor::Done;
                        return Some(Err(e));
                    }
                }
                Cursor::Page(_) => self.cursor = Cursor::Done,
            }
        }
    }
}

/// Contexts for the members of a collection, produced by [`Collection::iter`].
///
/// Each is a copy of the collection's context with the entry set to the member's
/// `rel="edit"` link.
pub struct EntryContexts<'a>(Members<'a>);

impl Iterator for EntryContexts<'_> {
    type Item = Result<Context, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        let index = match self.0.advance()? {
            Ok(index) => index,
            Err(e) => return Some(Err(e)),
        };
        let collection = &*self.0.collection;
        let edit = collection
            .member(index)
            .and_then(|member| xml::link_value(member, "edit"));

        let mut context = collection.context.clone();
        let entry = match (edit, collection.uri()) {
            (Some(edit), Some(base)) => match absolutize(base, edit) {
                Ok(entry) => Some(entry),
                Err(e) => return Some(Err(e.into())),
            },
            _ => None,
        };
        context.set_entry(entry);
        Some(Ok(context))
    }
}

/// The member entries of a collection, produced by [`Collection::iter_entry`].
pub struct EntryTrees<'a>(Members<'a>);

impl Iterator for EntryTrees<'_> {
    type Item = Result<Element, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        let index = match self.0.advance()? {
            Ok(index) => index,
            Err(e) => return Some(Err(e)),
        };
        self.0.collection.member(index).cloned().map(Ok)
    }
}
