//! # Protocol Validation
//!
//! Exercises a live server through the publishing cycle and records how closely it
//! follows AtomPub. A [`Validator`] runs the tests; the [`Recorder`] it reports to is
//! attached to the [`EventBus`](crate::EventBus) of the client under test, so every
//! exchange is logged and every retrieval and creation is checked as it happens.
//!
//! | test                     | exercises                                                |
//! |--------------------------|----------------------------------------------------------|
//! | entry collection         | create three entries, check order, update one, remove all |
//! | media collection         | create an image, update its Media Link Entry, remove it  |
//! | introspection            | find the collections above in a service document         |
//!
//! Servers are free to reorder and rename, so most deviations are warnings. Errors mark
//! responses that break the protocol outright.
#[cfg(test)]
mod tests;

mod checks;
mod recorder;

pub use checks::{
    check_create_response, check_entry_links, check_entry_slug, check_order_of_entries,
    check_remove_response, check_update_response, entry_id,
};
pub use recorder::{Check, Finding, Recorder, Severity, StopTest, TestReport};

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use chrono::{DateTime, SecondsFormat, Utc};
use http::header::{HeaderValue, InvalidHeaderValue, CONTENT_TYPE};
use http::HeaderMap;
use thiserror::Error;

use crate::error::Error;
use crate::model::{Collection, Entry, Service};
use crate::text::{write_text, TextKind};
use crate::transport::Response;
use crate::uri::absolutize;

const ENTRY_RANGE: &str = "application/atom+xml;type=entry";

/// A 1x1 transparent GIF.
const GIF: &[u8] = b"GIF89a\x01\x00\x01\x00\x80\x00\x00\x00\x00\x00\xff\xff\xff\x21\xf9\x04\x01\x00\x00\x00\x00\x2c\x00\x00\x00\x00\x01\x00\x01\x00\x00\x02\x02\x44\x01\x00\x3b";

#[derive(Error, Debug)]
enum Abort {
    #[error(transparent)]
    Stop(#[from] StopTest),
    #[error(transparent)]
    Client(#[from] Error),
    #[error(transparent)]
    Header(#[from] InvalidHeaderValue),
}

impl From<url::ParseError> for Abort {
    fn from(e: url::ParseError) -> Self {
        Abort::Client(e.into())
    }
}

/// Runs the validation tests, reporting to a [`Recorder`].
#[derive(Debug)]
pub struct Validator {
    recorder: Arc<Recorder>,
    pause: Duration,
}

impl Validator {
    pub fn new(recorder: Arc<Recorder>) -> Self {
        Validator {
            recorder,
            pause: Duration::from_millis(1100),
        }
    }

    /// Wait `pause` between creations, so that each member gets a distinct `app:edited`.
    pub fn with_pause(mut self, pause: Duration) -> Self {
        self.pause = pause;
        self
    }

    pub fn recorder(&self) -> &Recorder {
        &self.recorder
    }

    /// Run the entry collection test on the first collection of `service` accepting
    /// entries, and the media collection test on the first accepting GIF images.
    pub fn introspect(&self, service: &mut Service) {
        self.run(
            "Entry Collection",
            "Find the first entry collection listed in a service document and run the entry \
             collection tests against it.",
            || {
                match service.iter_match(ENTRY_RANGE)?.next().transpose()? {
                    Some(context) => self.entry_collection(&mut Collection::new(context)),
                    None => self.recorder.info("Didn't find any entry collections to test"),
                }
                match service.iter_match("image/gif")?.next().transpose()? {
                    Some(context) => self.media_collection(&mut Collection::new(context)),
                    None => self
                        .recorder
                        .info("Didn't find any media collections that would accept GIF images"),
                }
                Ok(())
            },
        );
    }

    pub fn entry_collection(&self, collection: &mut Collection) {
        self.run(
            "Basic Entry Manipulation",
            "Add and remove three entries to the collection",
            || self.basic_entry_manipulation(collection),
        );
    }

    pub fn media_collection(&self, collection: &mut Collection) {
        self.run(
            "Basic Media Manipulation",
            "Add and remove an image in the collection",
            || self.basic_media_manipulation(collection),
        );
    }

    fn run(&self, name: &str, description: &str, test: impl FnOnce() -> Result<(), Abort>) {
        self.recorder.begin_test(name, description);
        match test() {
            Ok(()) | Err(Abort::Stop(_)) => {}
            Err(Abort::Client(Error::Callback(e))) if e.source.is::<StopTest>() => {}
            Err(Abort::Client(Error::MalformedDocument { response, .. })) => {
                self.recorder.log(response.text());
                self.recorder.error(Check::WellFormedXml, "Not well-formed XML");
            }
            Err(e) => self
                .recorder
                .info(format!("Internal error occurred while running tests: {e}")),
        }
    }

    fn basic_entry_manipulation(&self, collection: &mut Collection) -> Result<(), Abort> {
        let recorder = &*self.recorder;
        if let Some(uri) = collection.uri() {
            recorder.info(format!("Collection: {uri}"));
        }
        collection.get(HeaderMap::new())?;

        let mut slugs = Vec::new();
        let mut ids = Vec::new();
        let mut added = HashMap::new();
        for n in 1..=3 {
            recorder.info(format!("Create new entry #{n}"));
            let slug = slug();
            let mut headers = HeaderMap::new();
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/atom+xml"));
            headers.insert("slug", HeaderValue::from_str(&slug)?);

            let response = collection.create(headers, entry_body(n).into_bytes())?;
            check_create_response(recorder, &response)?;
            let (id, entry) = self.created(collection, &response)?;
            slugs.push(slug);
            ids.push(id.clone());
            added.insert(id, entry);
            if n < 3 {
                std::thread::sleep(self.pause);
            }
        }

        // newest first
        ids.reverse();
        let entries = collection.iter_entry().collect::<Result<Vec<_>, _>>()?;
        check_order_of_entries(recorder, &entries, &ids);

        let entry = added.get_mut(&ids[1]).ok_or(StopTest)?;
        let tree = entry.tree_mut()?.ok_or(StopTest)?;
        check_entry_slug(recorder, tree, &slugs[1]);
        check_entry_links(recorder, tree, false);
        write_text(tree, "title", TextKind::Text, "Internationalization - 2");

        recorder.info("Update entry #2 and write back to the collection");
        let response = entry.put(HeaderMap::new(), None)?;
        check_update_response(recorder, &response, "Entry #2");

        // the update moves the second entry to the front
        ids.swap(0, 1);
        let entries = collection.iter_entry().collect::<Result<Vec<_>, _>>()?;
        check_order_of_entries(recorder, &entries, &ids);

        self.remove_entries(collection, &ids)
    }

    fn basic_media_manipulation(&self, collection: &mut Collection) -> Result<(), Abort> {
        let recorder = &*self.recorder;
        if let Some(uri) = collection.uri() {
            recorder.info(format!("Collection: {uri}"));
        }

        recorder.info("Create new media entry");
        let slug = slug();
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("image/gif"));
        headers.insert("slug", HeaderValue::from_str(&slug)?);
        let response = collection.create(headers, GIF.to_vec())?;
        check_create_response(recorder, &response)?;
        let (id, mut entry) = self.created(collection, &response)?;

        let entries = collection.iter_entry().collect::<Result<Vec<_>, _>>()?;
        check_order_of_entries(recorder, &entries, std::slice::from_ref(&id));

        entry.get(HeaderMap::new())?;
        let tree = entry.tree_mut()?.ok_or(StopTest)?;
        check_entry_slug(recorder, tree, &slug);
        check_entry_links(recorder, tree, true);
        write_text(tree, "title", TextKind::Text, "Success");

        recorder.info("Update Media Link Entry and write back to the collection");
        let response = entry.put(HeaderMap::new(), None)?;
        check_update_response(recorder, &response, "Media Link Entry");

        recorder.info("Remove entry");
        let response = entry.delete(HeaderMap::new())?;
        check_remove_response(recorder, &response)?;
        recorder.success("Removed Media Entry");
        Ok(())
    }

    /// Fetch the member a creation answered with, along with its `atom:id`.
    fn created(
        &self,
        collection: &Collection,
        response: &Response,
    ) -> Result<(String, Entry), Abort> {
        let (Some(base), Some(location)) = (collection.uri(), response.header("location")) else {
            return Err(StopTest.into());
        };
        let uri = absolutize(base, location)?;
        let mut entry = Entry::new(collection.context().with_entry(uri));
        let id = entry.tree()?.and_then(entry_id);
        match id {
            Some(id) => Ok((id, entry)),
            None => {
                self.recorder.info(
                    "Atom entry did not contain the required atom:id, can't continue with test.",
                );
                Err(StopTest.into())
            }
        }
    }

    /// Delete the members of `collection` whose `atom:id` is in `ids`.
    fn remove_entries(&self, collection: &mut Collection, ids: &[String]) -> Result<(), Abort> {
        let mut remaining = ids.len();
        for context in collection.iter() {
            let context = context?;
            if context.entry().is_none() {
                continue;
            }
            let mut entry = Entry::new(context);
            let id = entry.tree()?.and_then(entry_id);
            if !id.is_some_and(|id| ids.contains(&id)) {
                continue;
            }
            self.recorder.info("Remove entry");
            let response = entry.delete(HeaderMap::new())?;
            check_remove_response(&self.recorder, &response)?;
            remaining -= 1;
            if remaining == 0 {
                break;
            }
        }
        if remaining == 0 {
            self.recorder
                .success("Removed all entries that were previously added.");
        }
        Ok(())
    }
}

/// Ten random letters, for the `Slug` header.
fn slug() -> String {
    (0..10).map(|_| char::from(b'a' + fastrand::u8(..12))).collect()
}

fn entry_body(n: usize) -> String {
    let now = SystemTime::now();
    let stamp = now
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    let updated = DateTime::<Utc>::from(now).to_rfc3339_opts(SecondsFormat::Secs, true);
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<entry xmlns="http://www.w3.org/2005/Atom">
  <title>Internationalization - {n}</title>
  <id>tag:apub.invalid,2008:validate/{stamp}/{n}</id>
  <updated>{updated}</updated>
  <author><name>Iñtërnâtiônàlizætiøn</name></author>
  <content type="xhtml"><div xmlns="http://www.w3.org/1999/xhtml"><p>Ἰοὺ ἰού· τὰ πάντʼ ἂν ἐξήκοι σαφῆ. <b>Iñtërnâtiônàlizætiøn</b></p></div></content>
</entry>
"#
    )
}
