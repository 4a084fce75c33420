use super::client;

use atompub::validate::{Recorder, Validator};
use atompub::{Client, Service};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
pub(in super::super) struct Args {
    /// Service document URI
    service: String,

    /// Write the report to FILE instead of standard output
    #[arg(long, short, value_name = "FILE")]
    output: Option<PathBuf>,
}

pub(super) fn run(client: Client, args: Args) -> anyhow::Result<()> {
    let uri = client::resolve(&args.service)?;
    let recorder = Arc::new(Recorder::default());
    recorder.attach(client.events())?;

    tracing::info!(service = %uri, "Validating service");
    let mut service = Service::from_uri(client, uri);
    Validator::new(recorder.clone()).introspect(&mut service);

    let report = recorder.to_string();
    match &args.output {
        Some(path) => std::fs::write(path, report)?,
        None => print!("{report}"),
    }

    match recorder.status() {
        0 => Ok(()),
        1 => {
            tracing::warn!("The service passed with warnings");
            Ok(())
        }
        _ => anyhow::bail!("the service does not follow the protocol"),
    }
}
