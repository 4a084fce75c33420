use super::{client, ensure_success};

use atompub::{Client, Entry};
use clap::Parser;
use http::HeaderMap;

#[derive(Parser, Debug)]
pub(in super::super) struct Args {
    /// Entry URI
    uri: String,
}

pub(super) fn run(client: Client, args: Args) -> anyhow::Result<()> {
    let uri = client::resolve(&args.uri)?;
    let mut entry = Entry::from_uri(client, uri.clone());
    ensure_success(&entry.delete(HeaderMap::new())?)?;
    tracing::info!(entry = %uri, "Deleted entry");
    Ok(())
}
