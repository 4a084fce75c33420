//! Exchanges recorded on disk.
//!
//! A recording directory holds one file per response, at
//! `<dir>/<METHOD>/<path>.file`, where `<path>` is the percent-encoded path of the request
//! URI without its leading and trailing slashes. The response to the n-th request for the
//! same method and URI may be stored in `<path>.file.<n>` instead; it takes precedence
//! over the plain file when present.
//!
//! Each file holds the response headers as `name: value` lines, the status among them as
//! a `status` header, then an empty line and the body.
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use ::http::header::{HeaderName, HeaderValue};
use ::http::StatusCode;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use super::{Request, Response, Transport, TransportError};

const PATH: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'_')
    .remove(b'.')
    .remove(b'-')
    .remove(b'/');

fn recording_path(dir: &Path, request: &Request) -> PathBuf {
    let path = request.uri.path().trim_matches('/');
    let name = format!("{}.file", utf8_percent_encode(path, PATH));
    dir.join(request.method.as_str()).join(name)
}

fn with_hit(path: &Path, hit: usize) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(format!(".{hit}"));
    PathBuf::from(name)
}

fn hit_key(request: &Request) -> String {
    format!("{}{}", request.method, request.uri)
}

/// Count a hit on `request`, returning which hit this is, starting at `1`.
fn count(hits: &Mutex<HashMap<String, usize>>, request: &Request) -> usize {
    let mut hits = hits.lock().unwrap_or_else(PoisonError::into_inner);
    let n = hits.entry(hit_key(request)).or_default();
    *n += 1;
    *n
}

fn parse_recording(path: &Path, raw: &[u8]) -> Result<Response, TransportError> {
    let malformed = |reason: String| TransportError::Recording {
        path: path.to_owned(),
        reason,
    };

    let (head, body) = split_head(raw);
    let head = std::str::from_utf8(head).map_err(|e| malformed(e.to_string()))?;

    let mut response = Response::new(StatusCode::OK).with_body(body);
    for line in head.lines().filter(|l| !l.trim().is_empty()) {
        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| malformed(format!("not a header line: {line:?}")))?;
        let (name, value) = (name.trim(), value.trim());
        if name.eq_ignore_ascii_case("status") {
            let code = value.split_whitespace().next().unwrap_or_default();
            response.status = code
                .parse::<u16>()
                .ok()
                .and_then(|c| StatusCode::from_u16(c).ok())
                .ok_or_else(|| malformed(format!("invalid status: {value:?}")))?;
            continue;
        }
        let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| malformed(e.to_string()))?;
        let value = HeaderValue::from_str(value).map_err(|e| malformed(e.to_string()))?;
        response.headers.append(name, value);
    }
    Ok(response)
}

/// Split a recording at the first empty line.
fn split_head(raw: &[u8]) -> (&[u8], &[u8]) {
    let crlf = raw.windows(4).position(|w| w == b"\r\n\r\n").map(|i| (i, 4));
    let lf = raw.windows(2).position(|w| w == b"\n\n").map(|i| (i, 2));
    let split = match (crlf, lf) {
        (Some(a), Some(b)) => Some(if a.0 <= b.0 { a } else { b }),
        (a, b) => a.or(b),
    };
    match split {
        Some((i, len)) => (&raw[..i], &raw[i + len..]),
        None => (raw, &[]),
    }
}

/// A [`Transport`] answering from a recording directory. Requests without a recording get
/// an empty `404`.
#[derive(Debug)]
pub struct Playback {
    dir: PathBuf,
    hits: Mutex<HashMap<String, usize>>,
}

impl Playback {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Playback {
            dir: dir.into(),
            hits: Mutex::default(),
        }
    }
}

impl Transport for Playback {
    fn request(&self, request: Request) -> Result<Response, TransportError> {
        let hit = count(&self.hits, &request);
        let path = recording_path(&self.dir, &request);
        let numbered = with_hit(&path, hit);
        let path = if numbered.exists() { numbered } else { path };

        if !path.exists() {
            tracing::debug!(path = %path.display(), "no recording, answering 404");
            return Ok(Response::new(StatusCode::NOT_FOUND));
        }
        tracing::trace!(path = %path.display(), hit, "playing back");
        let raw = fs::read(&path)?;
        parse_recording(&path, &raw)
    }
}

/// A [`Transport`] passing requests on to another transport and writing every response
/// to a recording directory that [`Playback`] can answer from.
pub struct Recorder<T> {
    inner: T,
    dir: PathBuf,
    hits: Mutex<HashMap<String, usize>>,
}

impl<T: Transport> Recorder<T> {
    pub fn new(inner: T, dir: impl Into<PathBuf>) -> Self {
        Recorder {
            inner,
            dir: dir.into(),
            hits: Mutex::default(),
        }
    }

    pub fn into_inner(self) -> T {
        self.inner
    }

    fn write(&self, path: &Path, response: &Response) -> Result<(), TransportError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut lines = vec![format!("status: {}", response.status.as_u16())];
        lines.extend(response.headers.iter().map(|(name, value)| {
            format!("{}: {}", name, String::from_utf8_lossy(value.as_bytes()))
        }));

        let mut out = lines.join("\r\n").into_bytes();
        out.extend_from_slice(b"\r\n\r\n");
        out.extend_from_slice(&response.body);
        fs::write(path, out)?;
        Ok(())
    }
}

impl<T: Transport> Transport for Recorder<T> {
    fn request(&self, request: Request) -> Result<Response, TransportError> {
        let hit = count(&self.hits, &request);
        let path = recording_path(&self.dir, &request);
        let path = if hit >= 2 { with_hit(&path, hit) } else { path };

        let response = self.inner.request(request)?;
        tracing::debug!(path = %path.display(), "recording response");
        self.write(&path, &response)?;
        Ok(response)
    }

    fn add_credentials(&self, name: &str, password: &str) {
        self.inner.add_credentials(name, password);
    }
}
