use std::sync::Arc;

use super::*;
use crate::transport::mock::MockTransport;

fn client() -> Client {
    Client::new(Arc::new(MockTransport::default()))
}

fn url(s: &str) -> Url {
    Url::parse(s).expect("test urls are valid")
}

fn full() -> Context {
    let mut c = Context::new(client());
    c.set_service(Some(url("http://example.org/service.atomsvc")));
    c.set_collection(Some(url("http://example.org/collection/1/")));
    c.set_entry(Some(url("http://example.org/collection/1/1")));
    c
}

#[derive(Debug)]
struct Probe(Context);

impl FromContext for Probe {
    fn from_context(context: Context) -> Self {
        Probe(context)
    }
}

#[test]
fn setting_a_location_clears_those_below_it() {
    let mut c = full();
    assert_eq!(c.service(), Some(&url("http://example.org/service.atomsvc")));
    assert_eq!(c.collection(), Some(&url("http://example.org/collection/1/")));
    assert_eq!(c.entry(), Some(&url("http://example.org/collection/1/1")));

    c.set_collection(Some(url("http://example.org/collection/2/")));
    assert_eq!(c.service(), Some(&url("http://example.org/service.atomsvc")));
    assert_eq!(c.collection(), Some(&url("http://example.org/collection/2/")));
    assert_eq!(c.entry(), None);

    c.set_entry(Some(url("http://example.org/collection/2/9")));
    c.set_service(Some(url("http://example.org/some_other_service.atomsvc")));
    assert_eq!(
        c.service(),
        Some(&url("http://example.org/some_other_service.atomsvc"))
    );
    assert_eq!(c.collection(), None);
    assert_eq!(c.entry(), None);
}

#[test]
fn setting_the_entry_keeps_everything_else() -> anyhow::Result<()> {
    let mut c = full();
    c.push(url("http://fred.org/"));
    c.set_entry(Some(url("http://fred.org/1")));
    assert_eq!(c.collection(), Some(&url("http://fred.org/")));
    assert_eq!(c.depth(), 1);
    c.pop()?;
    assert_eq!(c.entry(), Some(&url("http://example.org/collection/1/1")));
    Ok(())
}

#[test]
fn outer_writes_drop_history() {
    let mut c = full();
    c.push(url("http://fred.org/"));
    c.set_collection(Some(url("http://example.org/collection/3/")));
    assert_eq!(c.pop(), Err(ContextError::EmptyHistory));

    c.push(url("http://fred.org/"));
    c.set_service(None);
    assert_eq!(c.depth(), 0);
    assert_eq!(c.pop(), Err(ContextError::EmptyHistory));
}

#[test]
fn push_and_pop_survive_serialization() -> anyhow::Result<()> {
    let mut c = full();
    c.push(url("http://fred.org/"));

    let saved = serde_json::to_string(c.state())?;
    let mut c = Context::from_state(serde_json::from_str(&saved)?, client());

    assert_eq!(c.collection(), Some(&url("http://fred.org/")));
    assert_eq!(c.entry(), None);
    c.pop()?;
    assert_eq!(c.collection(), Some(&url("http://example.org/collection/1/")));
    assert_eq!(c.entry(), Some(&url("http://example.org/collection/1/1")));
    Ok(())
}

#[test]
fn nested_detours_unwind_in_order() -> anyhow::Result<()> {
    let mut c = full();
    c.push(url("http://a.example/"));
    c.set_entry(Some(url("http://a.example/1")));
    c.push(url("http://b.example/"));
    c.push(url("http://c.example/"));
    assert_eq!(c.depth(), 3);

    c.pop()?;
    assert_eq!(c.collection(), Some(&url("http://b.example/")));
    assert_eq!(c.entry(), None);
    c.pop()?;
    assert_eq!(c.collection(), Some(&url("http://a.example/")));
    assert_eq!(c.entry(), Some(&url("http://a.example/1")));
    c.pop()?;
    assert_eq!(c.collection(), Some(&url("http://example.org/collection/1/")));
    assert_eq!(c.pop(), Err(ContextError::EmptyHistory));
    Ok(())
}

#[test]
fn serialized_form() -> anyhow::Result<()> {
    let mut c = Context::new(client());
    c.set_service(Some(url("http://example.org/service.atomsvc")));
    insta::assert_snapshot!(
        serde_json::to_string(c.state())?,
        @r#"{"service":"http://example.org/service.atomsvc","collection":null,"entry":null}"#
    );
    Ok(())
}

#[test]
fn copies_are_independent() {
    let c = full();
    let other = c.with_collection(url("http://example.org/collection/2/"));
    assert_eq!(c.collection(), Some(&url("http://example.org/collection/1/")));
    assert_eq!(c.entry(), Some(&url("http://example.org/collection/1/1")));
    assert_eq!(other.entry(), None);
    assert!(Arc::ptr_eq(c.client().events(), other.client().events()));
}

#[test]
fn restore_builds_only_what_is_set() {
    let c = full();
    let (s, col, e) = c.restore::<Probe, Probe, Probe>();
    assert!(s.is_some() && col.is_some());
    assert_eq!(
        e.map(|Probe(ctx)| ctx.entry().cloned()),
        Some(Some(url("http://example.org/collection/1/1")))
    );

    let mut c = full();
    c.set_service(None);
    let (s, col, e) = c.restore::<Probe, Probe, Probe>();
    assert!(s.is_none() && col.is_none() && e.is_none());
}
