use atompub::{Client, Collection, Context, ContextState, Entry, Service};
use clap::Parser;
use http::HeaderMap;
use std::path::PathBuf;

#[derive(Parser, Debug)]
pub(in super::super) struct Args {
    /// A file written by `--save`
    session: PathBuf,

    /// Only print the saved locations, without contacting the server
    #[arg(long)]
    offline: bool,
}

pub(super) fn run(client: Client, args: Args) -> anyhow::Result<()> {
    let raw = std::fs::read_to_string(&args.session)?;
    let state: ContextState = serde_json::from_str(&raw)?;
    let context = Context::from_state(state, client);

    let show = |label: &str, uri: Option<&url::Url>| {
        println!("{label:<10}\t{}", uri.map(|u| u.as_str()).unwrap_or("-"));
    };
    show("service", context.service());
    show("collection", context.collection());
    show("entry", context.entry());
    if args.offline {
        return Ok(());
    }

    let (service, collection, entry) = context.restore::<Service, Collection, Entry>();
    if let Some(mut service) = service {
        let response = service.get(HeaderMap::new())?;
        tracing::info!(status = %response.status, "Revisited service");
    }
    if let Some(mut collection) = collection {
        let response = collection.get(HeaderMap::new())?;
        tracing::info!(
            status = %response.status,
            more = collection.has_next(),
            "Revisited collection"
        );
    }
    if let Some(mut entry) = entry {
        let response = entry.get(HeaderMap::new())?;
        tracing::info!(status = %response.status, media = ?entry.edit_media(), "Revisited entry");
    }
    Ok(())
}
