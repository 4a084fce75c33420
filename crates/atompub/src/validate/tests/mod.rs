use std::sync::Arc;
use std::time::Duration;

use http::{HeaderMap, Method, StatusCode};
use url::Url;

use super::*;
use crate::context::{Client, Context};
use crate::text::read_text;
use crate::transport::mock::MockTransport;
use crate::xml;

const SERVICE: &str = r#"<service xmlns="http://www.w3.org/2007/app" xmlns:atom="http://www.w3.org/2005/Atom">
  <workspace>
    <atom:title>Main Site</atom:title>
    <collection href="/entries/">
      <atom:title>entries</atom:title>
    </collection>
    <collection href="/images/">
      <atom:title>images</atom:title>
      <accept>image/*</accept>
    </collection>
  </workspace>
</service>"#;

const READ_ONLY_SERVICE: &str = r#"<service xmlns="http://www.w3.org/2007/app" xmlns:atom="http://www.w3.org/2005/Atom">
  <workspace>
    <atom:title>Comments</atom:title>
    <collection href="/comments/">
      <atom:title>comments</atom:title>
      <accept/>
    </collection>
  </workspace>
</service>"#;

const EMPTY: &str = r#"<feed xmlns="http://www.w3.org/2005/Atom"><title>entries</title></feed>"#;

fn member(n: u32, extra: &str) -> String {
    format!(
        r#"<entry xmlns="http://www.w3.org/2005/Atom">
  <title>Internationalization - {n}</title>
  <id>urn:apub:{n}</id>
  <link rel="edit" href="http://example.org/entries/{n}"/>{extra}
</entry>"#
    )
}

fn feed(order: [u32; 3]) -> String {
    let members: String = order.iter().map(|n| member(*n, "")).collect();
    format!(r#"<feed xmlns="http://www.w3.org/2005/Atom"><title>entries</title>{members}</feed>"#)
}

const PICTURE: &str = r#"<entry xmlns="http://www.w3.org/2005/Atom">
  <title>success.gif</title>
  <id>urn:apub:picture</id>
  <link rel="edit" href="http://example.org/images/9"/>
  <link rel="edit-media" href="9.gif"/>
</entry>"#;

fn ok(body: impl Into<Vec<u8>>) -> Response {
    Response::new(StatusCode::OK)
        .with_header("etag", "\"1\"")
        .with_body(body)
}

fn created(location: &str, body: &str) -> Response {
    Response::new(StatusCode::CREATED)
        .with_header("location", location)
        .with_header("content-location", location)
        .with_header("content-type", "application/atom+xml;type=entry")
        .with_body(body)
}

/// A server that behaves, answering every step of both collection tests.
fn server() -> Arc<MockTransport> {
    let images = format!(
        r#"<feed xmlns="http://www.w3.org/2005/Atom"><title>images</title>{PICTURE}</feed>"#
    );
    let mock = Arc::new(MockTransport::default());
    mock.on(Method::GET, "http://example.org/service.atomsvc", ok(SERVICE))
        .on(Method::GET, "http://example.org/entries/", ok(EMPTY))
        .on(Method::GET, "http://example.org/entries/", ok(feed([3, 2, 1])))
        .on(Method::GET, "http://example.org/entries/", ok(feed([2, 3, 1])))
        .on(Method::GET, "http://example.org/images/", ok(images));
    for n in 1..=3 {
        let uri = format!("http://example.org/entries/{n}");
        let location = format!("/entries/{n}");
        mock.on(
            Method::POST,
            "http://example.org/entries/",
            created(&location, &member(n, "")),
        )
        .on(Method::GET, &uri, ok(member(n, "")))
        .on(Method::PUT, &uri, Response::new(StatusCode::OK))
        .on(Method::DELETE, &uri, Response::new(StatusCode::NO_CONTENT));
    }
    mock.on(
        Method::POST,
        "http://example.org/images/",
        created("/images/9", PICTURE),
    )
    .on(Method::GET, "http://example.org/images/9", ok(PICTURE))
    .on(
        Method::PUT,
        "http://example.org/images/9",
        Response::new(StatusCode::OK),
    )
    .on(
        Method::DELETE,
        "http://example.org/images/9",
        Response::new(StatusCode::OK),
    );
    mock
}

fn url(s: &str) -> Url {
    Url::parse(s).expect("test urls are valid")
}

/// A validator reporting on every exchange made through the returned client.
fn validator(mock: &Arc<MockTransport>) -> anyhow::Result<(Validator, Client)> {
    let client = Client::new(mock.clone());
    let recorder = Arc::new(Recorder::default());
    recorder.attach(client.events())?;
    Ok((Validator::new(recorder).with_pause(Duration::ZERO), client))
}

fn service(client: Client) -> Service {
    Service::new(Context::new(client).with_service(url("http://example.org/service.atomsvc")))
}

fn collection(client: Client, uri: &str) -> Collection {
    Collection::new(Context::new(client).with_collection(url(uri)))
}

fn ids(order: &[u32]) -> Vec<String> {
    order.iter().map(|n| format!("urn:apub:{n}")).collect()
}

fn problems(recorder: &Recorder) -> Vec<(Severity, Check)> {
    recorder
        .findings()
        .into_iter()
        .filter_map(|f| f.check.map(|check| (f.severity, check)))
        .collect()
}

#[test]
fn well_behaved_server() -> anyhow::Result<()> {
    let mock = server();
    let (validator, client) = validator(&mock)?;
    let mut service = service(client);
    validator.introspect(&mut service);

    let recorder = validator.recorder();
    insta::assert_snapshot!(recorder.to_string(), @r"
    Entry Collection: Find the first entry collection listed in a service document and run the entry collection tests against it.
    Basic Entry Manipulation: Add and remove three entries to the collection
      Success: Order of entries is correct
      Warning:SLUG_HEADER Slug was ignored
      Success: Member contained an 'edit' link
      Success: Updated Entry #2
      Success: Order of entries is correct
      Success: Removed all entries that were previously added.
    Basic Media Manipulation: Add and remove an image in the collection
      Success: Order of entries is correct
      Warning:SLUG_HEADER Slug was ignored
      Success: Member contained an 'edit' link
      Success: Member contained an 'edit-media' link
      Success: Updated Media Link Entry
      Success: Removed Media Entry
    ");
    assert!(!recorder.has_errors());
    assert_eq!(recorder.status(), 1);

    let requests = mock.requests();
    let posts: Vec<_> = requests.iter().filter(|r| r.method == Method::POST).collect();
    assert_eq!(posts.len(), 4);
    for post in &posts {
        let slug = post.headers.get("slug").map(|v| v.as_bytes()).unwrap_or_default();
        assert_eq!(slug.len(), 10);
        assert!(slug.iter().all(|c| (b'a'..=b'l').contains(c)));
    }
    assert_eq!(
        posts[3].headers.get("content-type").map(|v| v.as_bytes()),
        Some(&b"image/gif"[..])
    );

    let put = requests
        .iter()
        .find(|r| r.method == Method::PUT && r.uri == url("http://example.org/entries/2"))
        .expect("entry #2 was updated");
    let sent = xml::parse(put.body.as_deref().unwrap_or_default())?;
    assert_eq!(read_text(&sent, "title").1, "Internationalization - 2");

    let deleted: Vec<String> = requests
        .iter()
        .filter(|r| r.method == Method::DELETE)
        .map(|r| r.uri.to_string())
        .collect();
    assert_eq!(
        deleted,
        [
            "http://example.org/entries/2",
            "http://example.org/entries/3",
            "http://example.org/entries/1",
            "http://example.org/images/9",
        ]
    );
    Ok(())
}

#[test]
fn exchanges_are_logged() -> anyhow::Result<()> {
    let mock = server();
    let (validator, client) = validator(&mock)?;
    let mut service = service(client);
    validator.introspect(&mut service);

    let logs: Vec<Finding> = validator
        .recorder()
        .findings()
        .into_iter()
        .filter(|f| f.severity == Severity::Log)
        .collect();
    // both sides of every request
    assert_eq!(logs.len(), 2 * mock.hits());
    assert!(logs[0].detail.starts_with("Request: "));
    assert!(logs[1].detail.starts_with("Response: "));
    assert!(logs[1].detail.contains("etag: \"1\""));
    assert!(logs
        .iter()
        .any(|f| f.detail.contains("<43 bytes of image/gif>")));
    Ok(())
}

#[test]
fn nothing_to_test() -> anyhow::Result<()> {
    let mock = Arc::new(MockTransport::default());
    mock.on(Method::GET, "http://example.org/service.atomsvc", ok(READ_ONLY_SERVICE));
    let (validator, client) = validator(&mock)?;
    let mut service = service(client);
    validator.introspect(&mut service);

    let infos: Vec<String> = validator
        .recorder()
        .findings()
        .into_iter()
        .filter(|f| f.severity == Severity::Info)
        .map(|f| f.detail)
        .collect();
    assert_eq!(
        infos,
        [
            "Didn't find any entry collections to test",
            "Didn't find any media collections that would accept GIF images",
        ]
    );
    assert_eq!(validator.recorder().status(), 0);
    assert_eq!(mock.hits(), 1);
    Ok(())
}

#[test]
fn creation_without_location_stops_the_test() -> anyhow::Result<()> {
    let mock = Arc::new(MockTransport::default());
    mock.on(Method::GET, "http://example.org/entries/", ok(EMPTY))
        .on(
            Method::POST,
            "http://example.org/entries/",
            Response::new(StatusCode::CREATED),
        );
    let (validator, client) = validator(&mock)?;
    let mut collection = collection(client, "http://example.org/entries/");
    validator.entry_collection(&mut collection);

    assert_eq!(
        problems(validator.recorder()),
        [(Severity::Error, Check::CreateReturnsLocation)]
    );
    assert_eq!(validator.recorder().status(), 2);
    // one creation, then nothing
    assert_eq!(mock.hits(), 2);
    Ok(())
}

#[test]
fn refused_creation() -> anyhow::Result<()> {
    let mock = Arc::new(MockTransport::default());
    mock.on(
        Method::POST,
        "http://example.org/images/",
        Response::new(StatusCode::UNSUPPORTED_MEDIA_TYPE),
    );
    let (validator, client) = validator(&mock)?;
    let mut collection = collection(client, "http://example.org/images/");
    validator.media_collection(&mut collection);

    let findings = validator.recorder().findings();
    let error = findings
        .iter()
        .find(|f| f.severity == Severity::Error)
        .expect("the refusal is an error");
    assert_eq!(error.check, Some(Check::CreateReturns201));
    insta::assert_snapshot!(error.detail.as_str(), @"Entry creation failed with status: 415 Unsupported Media Type");
    assert_eq!(mock.hits(), 1);
    Ok(())
}

#[test]
fn failed_retrieval_stops_the_test() -> anyhow::Result<()> {
    let mock = Arc::new(MockTransport::default());
    mock.on(
        Method::GET,
        "http://example.org/entries/",
        Response::new(StatusCode::INTERNAL_SERVER_ERROR),
    );
    let (validator, client) = validator(&mock)?;
    let mut collection = collection(client, "http://example.org/entries/");
    validator.entry_collection(&mut collection);

    assert_eq!(
        problems(validator.recorder()),
        [(Severity::Error, Check::GetStatusCode)]
    );
    // no internal error was reported, the check itself ended the test
    assert!(!validator
        .recorder()
        .findings()
        .iter()
        .any(|f| f.detail.starts_with("Internal error")));
    assert_eq!(mock.hits(), 1);
    Ok(())
}

#[test]
fn malformed_collection() -> anyhow::Result<()> {
    let mock = Arc::new(MockTransport::default());
    mock.on(
        Method::GET,
        "http://example.org/entries/",
        ok(r#"<feed xmlns="http://www.w3.org/2005/Atom"><entry>"#),
    );
    let (validator, client) = validator(&mock)?;
    let mut collection = collection(client, "http://example.org/entries/");
    validator.entry_collection(&mut collection);

    assert_eq!(
        problems(validator.recorder()),
        [(Severity::Error, Check::WellFormedXml)]
    );
    Ok(())
}

#[test]
fn malformed_creation_response() -> anyhow::Result<()> {
    let mock = Arc::new(MockTransport::default());
    mock.on(Method::GET, "http://example.org/entries/", ok(EMPTY))
        .on(
            Method::POST,
            "http://example.org/entries/",
            created("/entries/1", "<entry><title>"),
        )
        .on(Method::GET, "http://example.org/entries/1", ok(member(1, "")));
    let (validator, client) = validator(&mock)?;
    let mut collection = collection(client, "http://example.org/entries/");
    validator.entry_collection(&mut collection);

    assert_eq!(
        problems(validator.recorder()).first(),
        Some(&(Severity::Error, Check::WellFormedXml))
    );
    Ok(())
}

#[test]
fn retrieval_headers() -> anyhow::Result<()> {
    let mock = Arc::new(MockTransport::default());
    mock.on(
        Method::GET,
        "http://example.org/entries/1",
        Response::new(StatusCode::OK)
            .with_header("content-length", "140")
            .with_body(member(1, "")),
    );
    let (validator, client) = validator(&mock)?;
    let context = Context::new(client).with_entry(url("http://example.org/entries/1"));
    let mut entry = Entry::new(context);
    entry.get(HeaderMap::new())?;

    assert_eq!(
        problems(validator.recorder()),
        [
            (Severity::Warning, Check::HttpEtag),
            (Severity::Warning, Check::HttpLastModified),
            (Severity::Warning, Check::HttpContentEncoding),
        ]
    );
    Ok(())
}

#[test]
fn creation_response_checks() {
    let recorder = Recorder::default();
    let bare = Response::new(StatusCode::CREATED).with_header("location", "/entries/1");
    assert_eq!(check_create_response(&recorder, &bare), Ok(()));
    assert_eq!(
        problems(&recorder),
        [
            (Severity::Warning, Check::CreateContentLocation),
            (Severity::Warning, Check::CreateReturnsEntry),
        ]
    );

    let recorder = Recorder::default();
    let refused = Response::new(StatusCode::OK).with_header("location", "/entries/1");
    assert_eq!(check_create_response(&recorder, &refused), Err(StopTest));
    assert_eq!(
        problems(&recorder),
        [(Severity::Error, Check::CreateReturns201)]
    );
}

#[test]
fn slugs_and_links() -> anyhow::Result<()> {
    let recorder = Recorder::default();
    let honored = xml::parse(
        member(
            4,
            r#"<link href="http://example.org/2008/abcdefghij"/><link rel="edit-media" href="4.gif"/>"#,
        )
        .as_bytes(),
    )?;
    check_entry_slug(&recorder, &honored, "abcdefghij");
    check_entry_links(&recorder, &honored, true);

    let bare = xml::parse(
        br#"<entry xmlns="http://www.w3.org/2005/Atom"><link rel="self" href="abcdefghij"/></entry>"#,
    )?;
    check_entry_slug(&recorder, &bare, "abcdefghij");
    check_entry_links(&recorder, &bare, true);

    let findings: Vec<(Severity, Option<Check>)> = recorder
        .findings()
        .into_iter()
        .map(|f| (f.severity, f.check))
        .collect();
    assert_eq!(
        findings,
        [
            (Severity::Success, None),
            (Severity::Success, None),
            (Severity::Success, None),
            (Severity::Warning, Some(Check::SlugHeader)),
            (Severity::Warning, Some(Check::EntryLinkEdit)),
            (Severity::Warning, Some(Check::MediaEntryLinkEdit)),
        ]
    );
    Ok(())
}

#[test]
fn entry_order() -> anyhow::Result<()> {
    let entries: Vec<_> = [3, 2, 1]
        .into_iter()
        .map(|n| xml::parse(member(n, "").as_bytes()))
        .collect::<Result<_, _>>()?;
    let recorder = Recorder::default();
    check_order_of_entries(&recorder, &entries, &ids(&[3, 1]));
    check_order_of_entries(&recorder, &entries, &ids(&[2, 3]));
    check_order_of_entries(&recorder, &entries, &ids(&[1, 5]));
    assert_eq!(
        problems(&recorder),
        [
            (Severity::Error, Check::EntriesOrderedByAtomEdited),
            (Severity::Warning, Check::CreateAppearCollection),
        ]
    );

    let details: Vec<String> = recorder
        .findings()
        .into_iter()
        .filter(|f| f.severity != Severity::Info)
        .map(|f| f.detail)
        .collect();
    insta::assert_debug_snapshot!(details, @r#"
    [
        "Order of entries is correct",
        "Failed to preserve order of entries, was expecting urn:apub:2, but found urn:apub:3",
        "All entries did not appear in the collection. The following ids never appeared: urn:apub:5",
    ]
    "#);
    Ok(())
}

#[test]
fn removal_and_update_statuses() {
    let recorder = Recorder::default();
    recorder.begin_test("Statuses", "Removal and update");
    for status in [StatusCode::OK, StatusCode::ACCEPTED, StatusCode::NO_CONTENT] {
        assert_eq!(check_remove_response(&recorder, &Response::new(status)), Ok(()));
    }
    assert_eq!(
        check_remove_response(&recorder, &Response::new(StatusCode::METHOD_NOT_ALLOWED)),
        Err(StopTest)
    );
    check_update_response(&recorder, &Response::new(StatusCode::NO_CONTENT), "Entry #2");
    check_update_response(&recorder, &Response::new(StatusCode::CONFLICT), "Entry #2");

    insta::assert_snapshot!(recorder.to_string(), @r"
    Statuses: Removal and update
      Error:DELETE_STATUS_CODE Entry removal failed with status: 405 Method Not Allowed
      Success: Updated Entry #2
      Error:PUT_STATUS_CODE Failed to accept updated Entry #2: 409 Conflict
    ");
}
