mod collection;
mod delete;
mod entry;
mod post;
mod put;
mod service;
mod show;
mod validate;

use super::client;
use super::Args;

use atompub::{Context, Response};
use clap::Subcommand;
use std::path::Path;

#[derive(Subcommand)]
pub(super) enum Commands {
    /// List the collections of a service document.
    ///
    /// The service may be given as an absolute URI or as an alias from
    /// the `[services]` table of the configuration file.
    #[command(verbatim_doc_comment)]
    Service(service::Args),
    /// List the member entries of a collection, following every page.
    Collection(collection::Args),
    /// Fetch an entry, or the media resource of a Media Link Entry.
    Entry(entry::Args),
    /// Create a new member in a collection.
    Post(post::Args),
    /// Replace an entry, or the media resource of a Media Link Entry.
    Put(put::Args),
    /// Delete an entry.
    Delete(delete::Args),
    /// Show and revisit a location saved with `--save`.
    Show(show::Args),
    /// Check a server against the protocol.
    ///
    /// Creates, updates and deletes members of the first entry
    /// collection and of the first collection accepting GIF images,
    /// then reports every error, warning and success.
    #[command(verbatim_doc_comment)]
    Validate(validate::Args),
}

pub fn run(args: Args) -> anyhow::Result<()> {
    let client = client::connect(&args.transport)?;
    match args.command {
        Commands::Service(args) => service::run(client, args),
        Commands::Collection(args) => collection::run(client, args),
        Commands::Entry(args) => entry::run(client, args),
        Commands::Post(args) => post::run(client, args),
        Commands::Put(args) => put::run(client, args),
        Commands::Delete(args) => delete::run(client, args),
        Commands::Show(args) => show::run(client, args),
        Commands::Validate(args) => validate::run(client, args),
    }
}

/// Fail on anything but a 2xx answer.
fn ensure_success(response: &Response) -> anyhow::Result<()> {
    if !response.is_success() {
        anyhow::bail!("server answered {}", response.status);
    }
    Ok(())
}

/// Write the location of `context` to `path`, for `show` to pick up later.
fn save(path: Option<&Path>, context: &Context) -> anyhow::Result<()> {
    if let Some(path) = path {
        std::fs::write(path, serde_json::to_string_pretty(context.state())?)?;
        tracing::info!(path = %path.display(), "Saved location");
    }
    Ok(())
}
