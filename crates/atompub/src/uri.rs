//! # URI Resolution
//!
//! Links found in service documents and feeds may be relative. They are resolved against
//! the URI of the document they were found in before being stored in a [`crate::Context`].
use url::Url;

/// Return the absolute form of `uri`, resolved against `base`.
///
/// A `uri` that already carries an authority component (`//host`) is returned as is,
/// anything else is joined onto `base`.
pub fn absolutize(base: &Url, uri: &str) -> Result<Url, url::ParseError> {
    match Url::parse(uri) {
        Ok(url) if url.has_authority() => Ok(url),
        Ok(_) | Err(url::ParseError::RelativeUrlWithoutBase) => base.join(uri),
        Err(e) => Err(e),
    }
}
