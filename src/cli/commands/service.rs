use super::{client, ensure_success, save};
use crate::cli::logging::LogValue;

use atompub::{Client, Service};
use clap::Parser;
use http::HeaderMap;
use std::path::PathBuf;

#[derive(Parser, Debug)]
pub(in super::super) struct Args {
    /// Service document URI or configured alias
    #[arg(name = "SERVICE")]
    target: String,

    /// Only list collections accepting this media range, e.g. `image/*`
    #[arg(long, short, value_name = "RANGE")]
    accept: Option<String>,

    /// Print one JSON object per collection
    #[arg(long, conflicts_with = "accept")]
    json: bool,

    /// Save the service location for `show`
    #[arg(long, value_name = "FILE")]
    save: Option<PathBuf>,
}

pub(super) fn run(client: Client, args: Args) -> anyhow::Result<()> {
    let uri = client::resolve(&args.target)?;
    let mut service = Service::from_uri(client, uri);
    let response = service.get(HeaderMap::new())?;
    ensure_success(&response)?;
    save(args.save.as_deref(), service.context())?;

    if let Some(range) = &args.accept {
        for context in service.iter_match(range)? {
            if let Some(collection) = context?.collection() {
                println!("{collection}");
            }
        }
        return Ok(());
    }

    let mut count = 0;
    for info in service.iter_info()? {
        let info = info?;
        count += 1;
        if args.json {
            println!("{}", info.as_json());
            continue;
        }
        let href = info.href.as_ref().map(|h| h.as_str()).unwrap_or("-");
        println!("{}\t{}\t{}", info.workspace, info.title, href);
    }
    tracing::info!(collections = count, "Listed service");
    Ok(())
}
