use super::{client, ensure_success, save};
use crate::cli::logging::LogValue;

use atompub::text::{read_date, read_text};
use atompub::{xml, Client, Collection};
use clap::Parser;
use http::HeaderMap;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Parser, Debug)]
pub(in super::super) struct Args {
    /// Collection URI
    uri: String,

    /// Stop after this many entries
    #[arg(long, short = 'n', value_name = "N")]
    limit: Option<usize>,

    /// Print one JSON object per entry instead of its edit URI
    #[arg(long)]
    json: bool,

    /// Save the collection location for `show`
    #[arg(long, value_name = "FILE")]
    save: Option<PathBuf>,
}

#[derive(Serialize)]
struct Member {
    id: String,
    title: String,
    updated: Option<i64>,
    edit: Option<String>,
}

pub(super) fn run(client: Client, args: Args) -> anyhow::Result<()> {
    let uri = client::resolve(&args.uri)?;
    let mut collection = Collection::from_uri(client, uri);
    ensure_success(&collection.get(HeaderMap::new())?)?;
    save(args.save.as_deref(), collection.context())?;

    let limit = args.limit.unwrap_or(usize::MAX);
    if args.json {
        for entry in collection.iter_entry().take(limit) {
            let entry = entry?;
            let member = Member {
                id: xml::child(&entry, "id".into())
                    .map(xml::text)
                    .unwrap_or_default(),
                title: read_text(&entry, "title").1,
                updated: read_date(&entry, "updated").ok(),
                edit: xml::link_value(&entry, "edit").map(str::to_owned),
            };
            println!("{}", member.as_json());
        }
        return Ok(());
    }

    for context in collection.iter().take(limit) {
        match context?.entry() {
            Some(entry) => println!("{entry}"),
            None => tracing::warn!("Member entry without an edit link"),
        }
    }
    Ok(())
}
