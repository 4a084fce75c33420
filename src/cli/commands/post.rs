use super::{client, save};

use atompub::{Client, Collection};
use clap::Parser;
use http::header::{HeaderValue, CONTENT_TYPE};
use http::HeaderMap;
use std::path::PathBuf;

#[derive(Parser, Debug)]
pub(in super::super) struct Args {
    /// Collection URI
    collection: String,

    /// File holding the new member, an Atom entry or a media resource
    file: PathBuf,

    /// Media type of the new member
    #[arg(
        long,
        short = 't',
        value_name = "TYPE",
        default_value = "application/atom+xml;type=entry"
    )]
    content_type: String,

    /// Name hint for the server, sent as the `Slug` header
    #[arg(long)]
    slug: Option<String>,

    /// Save the location of the new entry for `show`
    #[arg(long, value_name = "FILE")]
    save: Option<PathBuf>,
}

pub(super) fn run(client: Client, args: Args) -> anyhow::Result<()> {
    let uri = client::resolve(&args.collection)?;
    let body = std::fs::read(&args.file)?;

    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_str(&args.content_type)?);
    if let Some(slug) = &args.slug {
        headers.insert("slug", HeaderValue::from_str(slug)?);
    }

    let mut collection = Collection::from_uri(client, uri);
    let Some(context) = collection.entry_create(headers, body)? else {
        anyhow::bail!("the server did not report a new member");
    };
    if let Some(entry) = context.entry() {
        tracing::info!(entry = %entry, file = %args.file.display(), "Created member");
        println!("{entry}");
    }
    save(args.save.as_deref(), &context)
}
