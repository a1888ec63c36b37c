use std::fmt;
use std::fmt::Formatter;

use serde::Serialize;

pub(crate) const GENERATION_PARAM: &str = "t";

/// Cache-busting token stamped on every URL returned by one locator call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Generation(pub u64);

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Public URL of one stored photo.
///
/// Two handles are equal when their URLs match once the generation token is
/// removed.
#[derive(Debug, Clone, Serialize)]
#[serde(transparent)]
pub struct PhotoHandle {
    url: String,
}

impl PhotoHandle {
    pub fn new(url: impl Into<String>) -> Self {
        PhotoHandle { url: url.into() }
    }

    pub fn stamped(url: &str, generation: Generation) -> Self {
        let base = strip_generation(url);
        let separator = if base.contains('?') { '&' } else { '?' };
        PhotoHandle {
            url: format!("{}{}{}={}", base, separator, GENERATION_PARAM, generation),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn into_url(self) -> String {
        self.url
    }

    pub fn generation(&self) -> Option<Generation> {
        let (_, query) = self.url.split_once('?')?;
        query
            .split('&')
            .filter_map(|pair| pair.split_once('='))
            .find(|(key, _)| *key == GENERATION_PARAM)
            .and_then(|(_, value)| value.parse().ok())
            .map(Generation)
    }

    pub fn without_generation(&self) -> String {
        strip_generation(&self.url)
    }
}

impl PartialEq for PhotoHandle {
    fn eq(&self, other: &Self) -> bool {
        self.without_generation() == other.without_generation()
    }
}

impl Eq for PhotoHandle {}

impl fmt::Display for PhotoHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url)
    }
}

fn strip_generation(url: &str) -> String {
    let (base, query) = match url.split_once('?') {
        Some(parts) => parts,
        None => return url.to_string(),
    };

    let kept: Vec<&str> = query
        .split('&')
        .filter(|pair| !pair.is_empty() && pair.split('=').next() != Some(GENERATION_PARAM))
        .collect();

    if kept.is_empty() {
        base.to_string()
    } else {
        format!("{}?{}", base, kept.join("&"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stamping_replaces_previous_token() {
        let first = PhotoHandle::stamped("https://x/o/Luna/luna1.jpg", Generation(10));
        assert_eq!(first.url(), "https://x/o/Luna/luna1.jpg?t=10");
        assert_eq!(first.generation(), Some(Generation(10)));

        let second = PhotoHandle::stamped(first.url(), Generation(11));
        assert_eq!(second.url(), "https://x/o/Luna/luna1.jpg?t=11");
        assert_eq!(first, second);
    }

    #[test]
    fn other_query_parameters_survive() {
        let handle = PhotoHandle::stamped("https://img/p.jpg?w=400&t=3&fit=crop", Generation(7));
        assert_eq!(handle.url(), "https://img/p.jpg?w=400&fit=crop&t=7");
        assert_eq!(handle.without_generation(), "https://img/p.jpg?w=400&fit=crop");
        assert_ne!(handle, PhotoHandle::new("https://img/p.jpg"));
    }
}
