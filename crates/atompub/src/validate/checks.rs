//! Checks on the responses and members produced by a test.
use http::StatusCode;
use xmltree::Element;

use super::recorder::{Check, Recorder, StopTest};
use crate::transport::Response;
use crate::xml::{self, QName};

/// A creation must answer `201 Created` with a `location`.
pub fn check_create_response(recorder: &Recorder, response: &Response) -> Result<(), StopTest> {
    if response.status != StatusCode::CREATED {
        recorder.error(
            Check::CreateReturns201,
            format!("Entry creation failed with status: {}", response.status),
        );
        return Err(StopTest);
    }
    if response.header("location").is_none() {
        recorder.error(
            Check::CreateReturnsLocation,
            "Location: not returned in response headers.",
        );
        return Err(StopTest);
    }
    if response.header("content-location").is_none() {
        recorder.warning(
            Check::CreateContentLocation,
            "Content-Location: not returned in response headers.",
        );
    }
    if response.body.is_empty() {
        recorder.warning(
            Check::CreateReturnsEntry,
            "Atom Entry not returned on member creation.",
        );
    }
    Ok(())
}

/// Whether the server used `slug` in an alternate link of the member.
pub fn check_entry_slug(recorder: &Recorder, entry: &Element, slug: &str) {
    let honored = xml::children(entry, QName::atom("link"))
        .filter(|link| {
            matches!(
                link.attributes.get("rel").map(String::as_str),
                None | Some("alternate")
            )
        })
        .any(|link| link.attributes.get("href").is_some_and(|href| href.contains(slug)));
    if honored {
        recorder.success("Slug was honored");
    } else {
        recorder.warning(Check::SlugHeader, "Slug was ignored");
    }
}

pub fn check_entry_links(recorder: &Recorder, entry: &Element, media: bool) {
    if xml::link_value(entry, "edit").is_some() {
        recorder.success("Member contained an 'edit' link");
    } else {
        recorder.warning(
            Check::EntryLinkEdit,
            "Member Entry did not contain an atom:link element with a relation of 'edit'",
        );
    }

    if !media {
        return;
    }
    if xml::link_value(entry, "edit-media").is_some() {
        recorder.success("Member contained an 'edit-media' link");
    } else {
        recorder.warning(
            Check::MediaEntryLinkEdit,
            "Member Entry did not contain an atom:link element with a relation of 'edit-media'",
        );
    }
}

pub fn check_update_response(recorder: &Recorder, response: &Response, what: &str) {
    if matches!(response.status, StatusCode::OK | StatusCode::NO_CONTENT) {
        recorder.success(format!("Updated {what}"));
    } else {
        recorder.error(
            Check::PutStatusCode,
            format!("Failed to accept updated {what}: {}", response.status),
        );
    }
}

pub fn check_remove_response(recorder: &Recorder, response: &Response) -> Result<(), StopTest> {
    match response.status {
        StatusCode::OK | StatusCode::ACCEPTED | StatusCode::NO_CONTENT => Ok(()),
        status => {
            recorder.error(
                Check::DeleteStatusCode,
                format!("Entry removal failed with status: {status}"),
            );
            Err(StopTest)
        }
    }
}

/// The `atom:id` of an entry.
pub fn entry_id(entry: &Element) -> Option<String> {
    xml::child(entry, QName::atom("id")).map(|id| xml::text(id).trim().to_owned())
}

/// Members must be listed most recently edited first.
///
/// `order` holds the expected ids; members with other ids are skipped.
pub fn check_order_of_entries(recorder: &Recorder, entries: &[Element], order: &[String]) {
    recorder.info("Check order of entries in the collection document");
    let mut order = order;
    for id in entries.iter().filter_map(entry_id) {
        let Some((expected, rest)) = order.split_first() else {
            break;
        };
        if !order.contains(&id) {
            continue;
        }
        if *expected != id {
            recorder.error(
                Check::EntriesOrderedByAtomEdited,
                format!(
                    "Failed to preserve order of entries, was expecting {expected}, but found {id}"
                ),
            );
            return;
        }
        order = rest;
    }

    if order.is_empty() {
        recorder.success("Order of entries is correct");
    } else {
        recorder.warning(
            Check::CreateAppearCollection,
            format!(
                "All entries did not appear in the collection. The following ids never appeared: {}",
                order.join(", ")
            ),
        );
    }
}
