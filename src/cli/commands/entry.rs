use super::{client, ensure_success, save};

use atompub::text::{read_date, read_text, wrap};
use atompub::{Client, Entry};
use chrono::DateTime;
use clap::Parser;
use http::HeaderMap;
use std::io::Write;
use std::path::PathBuf;

#[derive(Parser, Debug)]
pub(in super::super) struct Args {
    /// Entry URI
    uri: String,

    /// Fetch the media resource instead of the entry
    #[arg(long, short, conflicts_with = "summary")]
    media: bool,

    /// Print the title, update time and summary instead of the raw entry
    #[arg(long, short)]
    summary: bool,

    /// Save the entry location for `show`
    #[arg(long, value_name = "FILE")]
    save: Option<PathBuf>,
}

pub(super) fn run(client: Client, args: Args) -> anyhow::Result<()> {
    let uri = client::resolve(&args.uri)?;
    let mut entry = Entry::from_uri(client, uri);
    ensure_success(&entry.get(HeaderMap::new())?)?;
    save(args.save.as_deref(), entry.context())?;

    if args.media {
        let response = entry.get_media(HeaderMap::new())?;
        ensure_success(&response)?;
        tracing::debug!(
            content_type = response.header("content-type"),
            bytes = response.body.len(),
            "Fetched media resource"
        );
        std::io::stdout().write_all(&response.body)?;
        return Ok(());
    }

    if args.summary {
        return summarize(&mut entry);
    }

    if let Some(body) = entry.representation() {
        std::io::stdout().write_all(body)?;
    }
    Ok(())
}

fn summarize(entry: &mut Entry) -> anyhow::Result<()> {
    let media = entry.edit_media().map(|uri| uri.to_string());
    let Some(tree) = entry.tree()? else {
        return Ok(());
    };

    let (_, title) = read_text(tree, "title");
    println!("{title}");
    match read_date(tree, "updated") {
        Ok(secs) => match DateTime::from_timestamp(secs, 0) {
            Some(updated) => println!("updated {}", updated.to_rfc3339()),
            None => tracing::warn!(secs, "Update time out of range"),
        },
        Err(e) => tracing::warn!(error = %e, "No usable update time"),
    }
    if let Some(media) = media {
        println!("media {media}");
    }

    let (_, summary) = read_text(tree, "summary");
    if !summary.is_empty() {
        print!("\n{}", wrap(&summary, 72));
    }
    Ok(())
}
