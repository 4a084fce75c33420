//! A real HTTP client.
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use reqwest::blocking::Client;

use super::{Request, Response, Transport, TransportError};

/// A [`Transport`] backed by a blocking [`reqwest`] client.
///
/// Credentials given to [`Transport::add_credentials`] are sent as HTTP basic
/// authentication on every following request.
#[derive(Debug)]
pub struct HttpTransport {
    client: Client,
    credentials: Mutex<Option<(String, String)>>,
}

impl HttpTransport {
    pub fn new(user_agent: &str) -> Result<Self, TransportError> {
        let client = Client::builder()
            .user_agent(user_agent)
            .connect_timeout(Duration::from_secs(30))
            .build()?;
        Ok(HttpTransport {
            client,
            credentials: Mutex::default(),
        })
    }
}

impl Transport for HttpTransport {
    fn request(&self, request: Request) -> Result<Response, TransportError> {
        let mut builder = self
            .client
            .request(request.method, request.uri)
            .headers(request.headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }
        let credentials = self
            .credentials
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some((name, password)) = credentials {
            builder = builder.basic_auth(name, Some(password));
        }

        let response = builder.send()?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes()?.to_vec();
        Ok(Response {
            status,
            headers,
            body,
        })
    }

    fn add_credentials(&self, name: &str, password: &str) {
        *self.credentials.lock().unwrap_or_else(PoisonError::into_inner) =
            Some((name.to_owned(), password.to_owned()));
    }
}
