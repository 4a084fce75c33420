//! # MIME Range Matching
//!
//! Selects the best of a set of concrete media types for an `Accept`-style range
//! expression such as `image/*, application/atom+xml;q=0.5`. A collection in a service
//! document is offered for a range when one of its accepted types is selected here.
use std::collections::BTreeMap;
use std::str::FromStr;

/// A parsed media type or media range, e.g. `text/*;q=0.3`.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaRange {
    kind: String,
    subtype: String,
    params: BTreeMap<String, String>,
    quality: f32,
}

impl MediaRange {
    /// The quality factor, defaulting to `1` when missing or invalid.
    pub fn quality(&self) -> f32 {
        self.quality
    }

    /// Score how well `self` is matched by the best of `ranges`, returning the quality of
    /// that range and its fitness. `None` when no range matches at all.
    fn fitness_in(&self, ranges: &[MediaRange]) -> Option<(f32, u32)> {
        ranges
            .iter()
            .filter(|r| {
                (r.kind == self.kind || r.kind == "*" || self.kind == "*")
                    && (r.subtype == self.subtype || r.subtype == "*" || self.subtype == "*")
            })
            .map(|r| {
                let params = self
                    .params
                    .iter()
                    .filter(|(k, v)| r.params.get(*k) == Some(*v))
                    .count() as u32;
                let fitness = if r.kind == self.kind { 100 } else { 0 }
                    + if r.subtype == self.subtype { 10 } else { 0 }
                    + params;
                (r.quality, fitness)
            })
            // first range with the highest fitness wins
            .fold(None, |best: Option<(f32, u32)>, (q, fit)| match best {
                Some((_, best_fit)) if best_fit >= fit => best,
                _ => Some((q, fit)),
            })
    }
}

impl FromStr for MediaRange {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split(';');
        let full = parts.next().unwrap_or_default().trim();
        let full = if full == "*" { "*/*" } else { full };
        let (kind, subtype) = full.split_once('/').unwrap_or((full, ""));

        let mut params: BTreeMap<String, String> = parts
            .filter_map(|p| p.split_once('='))
            .map(|(k, v)| (k.trim().to_owned(), v.trim().to_owned()))
            .collect();

        let quality = params
            .remove("q")
            .and_then(|q| q.parse::<f32>().ok())
            .filter(|q| (0.0..=1.0).contains(q))
            .unwrap_or(1.0);

        Ok(MediaRange {
            kind: kind.trim().to_owned(),
            subtype: subtype.trim().to_owned(),
            params,
            quality,
        })
    }
}

fn parse_ranges(header: &str) -> Vec<MediaRange> {
    header
        .split(',')
        .filter(|r| !r.trim().is_empty())
        .filter_map(|r| r.parse().ok())
        .collect()
}

/// Return the entry of `supported` that best matches the range expression `header`.
///
/// Candidates are ranked by how specific their best matching range is, then by the
/// quality of that range, and ties go to the greatest candidate name. `None` when nothing
/// matches, or when the top ranked candidate has a quality of zero.
pub fn best_match<'a, S: AsRef<str>>(supported: &'a [S], header: &str) -> Option<&'a str> {
    let ranges = parse_ranges(header);
    let mut best: Option<(u32, f32, &'a str)> = None;

    for candidate in supported {
        let candidate = candidate.as_ref();
        let mime: MediaRange = match candidate.parse() {
            Ok(mime) => mime,
            Err(never) => match never {},
        };
        let Some((q, fitness)) = mime.fitness_in(&ranges) else {
            continue;
        };
        let rank = (fitness, q, candidate);
        if best.map_or(true, |best| rank > best) {
            best = Some(rank);
        }
    }

    best.filter(|(_, q, _)| *q > 0.0).map(|(.., c)| c)
}

/// Whether `mime` is acceptable under the range expression `range`.
pub fn matches(mime: &str, range: &str) -> bool {
    best_match(&[mime], range).is_some()
}
