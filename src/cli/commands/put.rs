use super::{client, ensure_success};

use atompub::text::{write_text, TextKind};
use atompub::{Client, Entry};
use clap::Parser;
use http::header::{HeaderValue, CONTENT_TYPE};
use http::HeaderMap;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(arg_required_else_help = true)]
pub(in super::super) struct Args {
    /// Entry URI
    uri: String,

    /// Replacement body; the entry itself, or its media resource with `--media`
    #[arg(conflicts_with = "title")]
    file: Option<PathBuf>,

    /// Media type of the replacement body
    #[arg(long, short = 't', value_name = "TYPE", requires = "file")]
    content_type: Option<String>,

    /// Replace the media resource of a Media Link Entry
    #[arg(long, short, requires = "file")]
    media: bool,

    /// Retitle the entry as it is stored on the server
    #[arg(long)]
    title: Option<String>,
}

pub(super) fn run(client: Client, args: Args) -> anyhow::Result<()> {
    let uri = client::resolve(&args.uri)?;
    let mut entry = Entry::from_uri(client, uri);

    let mut headers = HeaderMap::new();
    if let Some(content_type) = &args.content_type {
        headers.insert(CONTENT_TYPE, HeaderValue::from_str(content_type)?);
    }

    let response = match (args.file, args.title) {
        (Some(file), _) if args.media => entry.put_media(headers, std::fs::read(file)?)?,
        (Some(file), _) => entry.put(headers, Some(std::fs::read(file)?))?,
        (None, Some(title)) => {
            let Some(tree) = entry.tree_mut()? else {
                anyhow::bail!("the entry could not be fetched");
            };
            write_text(tree, "title", TextKind::Text, &title);
            entry.put(headers, None)?
        }
        (None, None) => anyhow::bail!("nothing to send; give a file or `--title`"),
    };
    ensure_success(&response)?;
    tracing::info!(status = %response.status, "Updated entry");
    Ok(())
}
