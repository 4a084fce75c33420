use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use http::header::{HeaderValue, CONTENT_LENGTH};
use http::{Method, StatusCode};
use url::Url;

use super::*;
use crate::transport::mock::MockTransport;
use crate::{Client, Context, Entry};

fn uri() -> Url {
    Url::parse("http://example.org/entry/67").expect("valid test uri")
}

/// Stand-in for a resource operation, answering without any transport.
fn fake(
    bus: &EventBus,
    resource: ResourceKind,
    operation: Operation,
    headers: HeaderMap,
    body: &[u8],
) -> Result<Response, Error> {
    bus.intercept(resource, operation, &uri(), headers, Some(body.to_vec()), |_, _| {
        Ok(Response::new(StatusCode::OK).with_body("bar"))
    })
}

fn counter(bus: &EventBus, filter: &str) -> anyhow::Result<Arc<AtomicUsize>> {
    let count = Arc::new(AtomicUsize::new(0));
    let c = count.clone();
    bus.register(filter, move |_, _, _| {
        c.fetch_add(1, Ordering::SeqCst);
        Ok(())
    })?;
    Ok(count)
}

fn entry_get(bus: &EventBus) -> Result<Response, Error> {
    fake(bus, ResourceKind::Entry, Operation::Get, HeaderMap::new(), b"")
}

fn entry_put_media(bus: &EventBus) -> Result<Response, Error> {
    fake(bus, ResourceKind::Entry, Operation::PutMedia, HeaderMap::new(), b"")
}

fn service_get(bus: &EventBus) -> Result<Response, Error> {
    fake(bus, ResourceKind::Service, Operation::Get, HeaderMap::new(), b"")
}

#[test]
fn filters_parse_with_implied_pre() -> anyhow::Result<()> {
    insta::assert_snapshot!("get_entry".parse::<Filter>()?.to_string(), @"PRE_GET_ENTRY");
    insta::assert_snapshot!("entry_post_get".parse::<Filter>()?.to_string(), @"POST_GET_ENTRY");
    insta::assert_snapshot!("ANY".parse::<Filter>()?.to_string(), @"ANY");
    insta::assert_snapshot!("PRE_ANY".parse::<Filter>()?.to_string(), @"PRE_ANY");
    Ok(())
}

#[test]
fn bad_filters() {
    assert_eq!("".parse::<Filter>(), Err(FilterError::Empty));
    assert_eq!(
        "PRE_FETCH".parse::<Filter>(),
        Err(FilterError::UnknownToken("FETCH".into()))
    );
    assert_eq!(
        "PRE__GET".parse::<Filter>(),
        Err(FilterError::UnknownToken("".into()))
    );
    assert_eq!(
        "PRE_POST".parse::<Filter>(),
        Err(FilterError::ConflictingPhases)
    );
}

#[test]
fn event_tokens() {
    let event = Event::pre(ResourceKind::Collection, Operation::GetNext, uri());
    assert_eq!(event.tokens().to_string(), "PRE_GET_NEXT_COLLECTION");
    let event = event.post(StatusCode::OK);
    assert_eq!(event.tokens().to_string(), "POST_GET_NEXT_COLLECTION");
    assert!(!event.tokens().contains(Token::Any));
    assert_eq!(
        event.to_string(),
        "POST_GET_NEXT_COLLECTION http://example.org/entry/67 -> 200"
    );
}

#[test]
fn any_is_only_called_once_registered() -> anyhow::Result<()> {
    let bus = EventBus::default();
    entry_get(&bus)?;
    let count = counter(&bus, "ANY")?;
    entry_get(&bus)?;
    assert_eq!(count.load(Ordering::SeqCst), 2);
    Ok(())
}

#[test]
fn pre_sees_the_request() -> anyhow::Result<()> {
    let bus = EventBus::default();
    let seen = Arc::new(Mutex::new(None));
    let s = seen.clone();
    bus.register("PRE", move |headers, body, event| {
        *s.lock().expect("not poisoned") =
            Some((headers.clone(), body.to_vec(), event.tokens()));
        Ok(())
    })?;

    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_LENGTH, HeaderValue::from_static("7"));
    fake(&bus, ResourceKind::Entry, Operation::Get, headers, b"<feed/>")?;

    let (headers, body, tokens) = seen.lock().expect("not poisoned").take().expect("called");
    assert_eq!(headers.get(CONTENT_LENGTH), Some(&HeaderValue::from_static("7")));
    assert_eq!(body, b"<feed/>");
    assert!(tokens.contains(Token::Pre));
    assert!(!tokens.contains(Token::Any));
    Ok(())
}

#[test]
fn post_sees_the_response() -> anyhow::Result<()> {
    let bus = EventBus::default();
    let seen = Arc::new(Mutex::new(None));
    let s = seen.clone();
    bus.register("POST", move |_, body, event| {
        *s.lock().expect("not poisoned") = Some((body.to_vec(), event.status, event.tokens()));
        Ok(())
    })?;

    let response = entry_put_media(&bus)?;
    assert_eq!(response.body, b"bar");

    let (body, status, tokens) = seen.lock().expect("not poisoned").take().expect("called");
    assert_eq!(body, b"bar");
    assert_eq!(status, Some(StatusCode::OK));
    assert!(tokens.contains(Token::Post) && tokens.contains(Token::Media));
    Ok(())
}

#[test]
fn multiple_axes() -> anyhow::Result<()> {
    let cases: &[(&[&str], usize)] = &[
        (&["GET", "PRE"], 2),
        (&["POST_GET"], 1),
        (&["POST_GET", "PRE_ENTRY"], 2),
        (&["PRE_ANY", "POST_GET", "PRE_ENTRY"], 3),
    ];
    for (filters, expected) in cases {
        let bus = EventBus::default();
        let count = Arc::new(AtomicUsize::new(0));
        for filter in *filters {
            let c = count.clone();
            bus.register(filter, move |_, _, _| {
                c.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })?;
        }
        entry_get(&bus)?;
        assert_eq!(count.load(Ordering::SeqCst), *expected, "{filters:?}");
    }
    Ok(())
}

#[test]
fn any_spans_phases_and_resources() -> anyhow::Result<()> {
    for (filter, expected) in [("ANY", 6), ("POST_ANY", 3), ("PRE_ENTRY", 2)] {
        let bus = EventBus::default();
        let count = counter(&bus, filter)?;
        entry_get(&bus)?;
        entry_put_media(&bus)?;
        service_get(&bus)?;
        assert_eq!(count.load(Ordering::SeqCst), expected, "{filter}");
    }
    Ok(())
}

#[test]
fn failing_callback_aborts_the_exchange() -> anyhow::Result<()> {
    let bus = EventBus::default();
    let later = counter(&bus, "ANY")?;
    bus.register("PRE_GET", |_, _, _| Err("refused".into()))?;
    let after = counter(&bus, "ANY")?;

    let called = Arc::new(AtomicUsize::new(0));
    let c = called.clone();
    let result = bus.intercept(
        ResourceKind::Entry,
        Operation::Get,
        &uri(),
        HeaderMap::new(),
        None,
        |_, _| {
            c.fetch_add(1, Ordering::SeqCst);
            Ok(Response::new(StatusCode::OK))
        },
    );

    let e = match result {
        Err(Error::Callback(e)) => e,
        other => anyhow::bail!("expected a callback error, got {other:?}"),
    };
    assert_eq!(e.filter.to_string(), "PRE_GET");
    assert_eq!(e.source.to_string(), "refused");
    assert_eq!(called.load(Ordering::SeqCst), 0);
    assert_eq!(later.load(Ordering::SeqCst), 1);
    assert_eq!(after.load(Ordering::SeqCst), 0);
    Ok(())
}

#[test]
fn clear_removes_everything() -> anyhow::Result<()> {
    let bus = EventBus::default();
    let count = counter(&bus, "ANY")?;
    assert_eq!(bus.len(), 1);
    bus.clear();
    assert!(bus.is_empty());
    entry_get(&bus)?;
    assert_eq!(count.load(Ordering::SeqCst), 0);
    Ok(())
}

const MEDIA_ENTRY: &str = r#"<entry xmlns="http://www.w3.org/2005/Atom">
  <title>A picture</title>
  <link rel="edit" href="http://example.org/images/77"/>
  <link rel="edit-media" href="http://example.org/images/77.jpg"/>
</entry>"#;

fn media_entry() -> anyhow::Result<(Arc<MockTransport>, Entry)> {
    let mock = Arc::new(MockTransport::default());
    mock.on(
        Method::GET,
        "http://example.org/images/77",
        Response::new(StatusCode::OK).with_body(MEDIA_ENTRY),
    )
    .on(
        Method::PUT,
        "http://example.org/images/77.jpg",
        Response::new(StatusCode::ACCEPTED),
    );
    let context = Context::new(Client::new(mock.clone()))
        .with_entry(Url::parse("http://example.org/images/77")?);
    Ok((mock, Entry::new(context)))
}

#[test]
fn pre_entry_runs_before_the_transport() -> anyhow::Result<()> {
    let (mock, mut entry) = media_entry()?;
    let hits_seen = Arc::new(Mutex::new(Vec::new()));
    let (m, h) = (mock.clone(), hits_seen.clone());
    entry
        .context()
        .client()
        .events()
        .register("PRE_ENTRY", move |_, _, _| {
            h.lock().expect("not poisoned").push(m.hits());
            Ok(())
        })?;

    entry.get(HeaderMap::new())?;
    assert_eq!(*hits_seen.lock().expect("not poisoned"), [0]);
    assert_eq!(mock.hits(), 1);
    Ok(())
}

#[test]
fn post_get_fires_once_across_get_and_put_media() -> anyhow::Result<()> {
    let (_, mut entry) = media_entry()?;
    let bus = entry.context().client().events().clone();
    let post_get = counter(&bus, "POST_GET")?;
    let any = counter(&bus, "ANY")?;

    entry.get(HeaderMap::new())?;
    let response = entry.put_media(HeaderMap::new(), b"jpeg bytes".to_vec())?;
    assert_eq!(response.status, StatusCode::ACCEPTED);

    assert_eq!(post_get.load(Ordering::SeqCst), 1);
    assert_eq!(any.load(Ordering::SeqCst), 4);
    Ok(())
}
