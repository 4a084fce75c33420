use super::TransportArgs;

use atompub::transport::http::HttpTransport;
use atompub::transport::playback::{Playback, Recorder};
use atompub::transport::{Transport, TransportError};
use atompub::{trace_exchanges, Client, HeaderAuth};
use config::CONFIG;
use std::sync::Arc;
use thiserror::Error;
use url::Url;

#[derive(Error, Debug)]
pub(super) enum ClientError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("invalid bearer token")]
    Token(#[from] http::header::InvalidHeaderValue),
    #[error("`{0}` is neither a configured service nor an absolute URI")]
    Unresolved(String),
}

#[tracing::instrument(skip(args), err)]
pub(super) fn connect(args: &TransportArgs) -> Result<Client, ClientError> {
    let record = args.record.as_ref().or(CONFIG.record());
    let transport: Arc<dyn Transport> = match (&args.playback, record) {
        (Some(dir), _) => {
            tracing::debug!(dir = %dir.display(), "answering from recordings");
            Arc::new(Playback::new(dir))
        }
        (None, Some(dir)) => {
            tracing::debug!(dir = %dir.display(), "recording exchanges");
            Arc::new(Recorder::new(HttpTransport::new(CONFIG.user_agent())?, dir))
        }
        (None, None) => Arc::new(HttpTransport::new(CONFIG.user_agent())?),
    };

    if let Some(credentials) = CONFIG.credentials() {
        transport.add_credentials(&credentials.name, &credentials.password);
    }

    let client = Client::new(transport);
    if let Some(token) = &args.token {
        HeaderAuth::bearer(token)?.register(client.events());
    }
    trace_exchanges(client.events());
    Ok(client)
}

/// A service alias from the configuration, or else an absolute URI.
pub(super) fn resolve(target: &str) -> Result<Url, ClientError> {
    let uri = CONFIG.service(target).unwrap_or(target);
    Url::parse(uri).map_err(|_| ClientError::Unresolved(target.to_owned()))
}
