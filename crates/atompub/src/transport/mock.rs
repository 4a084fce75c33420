//! In-memory routes, for tests and demos.
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use ::http::{Method, StatusCode};
use url::Url;

use super::{Request, Response, Transport, TransportError};

#[derive(Debug, Default)]
struct Route {
    responses: Vec<Response>,
    hits: usize,
}

#[derive(Debug, Default)]
struct State {
    routes: HashMap<(Method, String), Route>,
    requests: Vec<Request>,
    credentials: Option<(String, String)>,
}

/// A [`Transport`] answering from routes registered up front.
///
/// Each route holds a sequence of responses: the first hit gets the first response, the
/// second hit the second, and so on, with the last one repeating once the sequence runs
/// out. Requests without a route get an empty `404`.
#[derive(Debug, Default)]
pub struct MockTransport {
    state: Mutex<State>,
}

fn key(uri: &str) -> String {
    Url::parse(uri)
        .map(String::from)
        .unwrap_or_else(|_| uri.to_owned())
}

impl MockTransport {
    /// Append `response` to the sequence answering `method` requests to `uri`.
    pub fn on(&self, method: Method, uri: &str, response: Response) -> &Self {
        self.lock()
            .routes
            .entry((method, key(uri)))
            .or_default()
            .responses
            .push(response);
        self
    }

    /// Every request received so far, in order.
    pub fn requests(&self) -> Vec<Request> {
        self.lock().requests.clone()
    }

    /// How many requests were received so far.
    pub fn hits(&self) -> usize {
        self.lock().requests.len()
    }

    /// The credentials last passed to [`Transport::add_credentials`].
    pub fn credentials(&self) -> Option<(String, String)> {
        self.lock().credentials.clone()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Transport for MockTransport {
    fn request(&self, request: Request) -> Result<Response, TransportError> {
        let mut state = self.lock();
        let route = state
            .routes
            .get_mut(&(request.method.clone(), key(request.uri.as_str())));
        let response = match route {
            Some(route) if !route.responses.is_empty() => {
                let i = route.hits.min(route.responses.len() - 1);
                route.hits += 1;
                route.responses[i].clone()
            }
            _ => Response::new(StatusCode::NOT_FOUND),
        };
        tracing::trace!(
            method = %request.method,
            uri = %request.uri,
            status = response.status.as_u16(),
            "mock exchange"
        );
        state.requests.push(request);
        Ok(response)
    }

    fn add_credentials(&self, name: &str, password: &str) {
        self.lock().credentials = Some((name.to_owned(), password.to_owned()));
    }
}
