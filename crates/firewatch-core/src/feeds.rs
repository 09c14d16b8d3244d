use std::fmt;

use firewatch_parser::SensorProduct;
use serde::Serialize;

use crate::error::{PipelineError, Result};

pub const FIRMS_BASE_URL: &str = "https://firms.modaps.eosdis.nasa.gov";
const MAP_KEY_LEN: usize = 32;
const AREA: &str = "world";
const DAY_RANGE: u8 = 9;

/// FIRMS MAP_KEY. The `Debug` impl never prints the key.
#[derive(Clone, PartialEq, Eq)]
pub struct MapKey(String);

impl MapKey {
    pub fn parse(value: &str) -> Result<Self> {
        if value.is_empty() {
            return Err(PipelineError::InvalidCredential(
                "map key is empty".to_string(),
            ));
        }
        if value.len() != MAP_KEY_LEN {
            return Err(PipelineError::InvalidCredential(format!(
                "map key must be {MAP_KEY_LEN} characters, got {}",
                value.len()
            )));
        }
        if !value.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(PipelineError::InvalidCredential(
                "map key must be hexadecimal".to_string(),
            ));
        }
        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for MapKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MapKey(****)")
    }
}

impl TryFrom<&str> for MapKey {
    type Error = PipelineError;

    fn try_from(value: &str) -> Result<Self> {
        MapKey::parse(value)
    }
}

/// The three per-product feed URLs, always in `SensorProduct::ALL` order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct FeedUrlSet([String; 3]);

impl FeedUrlSet {
    pub fn urls(&self) -> &[String; 3] {
        &self.0
    }

    pub fn get(&self, product: SensorProduct) -> &str {
        let idx = SensorProduct::ALL
            .iter()
            .position(|p| *p == product)
            .unwrap_or_default();
        &self.0[idx]
    }

    pub fn iter(&self) -> impl Iterator<Item = (SensorProduct, &str)> {
        SensorProduct::ALL
            .into_iter()
            .zip(self.0.iter().map(String::as_str))
    }

    /// Short stable identifier for logs; the URLs themselves embed the map key.
    pub fn fingerprint(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        for url in &self.0 {
            hasher.update(url.as_bytes());
            hasher.update(b"\n");
        }
        hasher.finalize().to_hex()[..16].to_string()
    }
}

impl TryFrom<Vec<String>> for FeedUrlSet {
    type Error = PipelineError;

    fn try_from(urls: Vec<String>) -> Result<Self> {
        let count = urls.len();
        let urls: [String; 3] = urls.try_into().map_err(|_| {
            PipelineError::Validation(format!(
                "a feed URL set needs exactly 3 URLs, got {count}"
            ))
        })?;
        Ok(Self(urls))
    }
}

pub fn feed_url(key: &MapKey, product: SensorProduct) -> String {
    format!(
        "{FIRMS_BASE_URL}/api/area/csv/{}/{}/{AREA}/{DAY_RANGE}",
        key.as_str(),
        product.as_str()
    )
}

/// Builds the feed URL set for a raw credential, rejecting malformed keys before
/// any network use.
pub fn build_feed_urls(credential: &str) -> Result<FeedUrlSet> {
    let key = MapKey::parse(credential)?;
    Ok(feed_urls_for(&key))
}

pub fn feed_urls_for(key: &MapKey) -> FeedUrlSet {
    FeedUrlSet(SensorProduct::ALL.map(|product| feed_url(key, product)))
}

pub fn map_key_status_url(key: &MapKey) -> String {
    format!(
        "{FIRMS_BASE_URL}/mapserver/mapkey_status/?MAP_KEY={}",
        key.as_str()
    )
}

/// Masks map keys in a URL: any 32-character hex path segment and the value of a
/// `MAP_KEY=` query parameter.
pub fn redact_credentials(url: &str) -> String {
    let (path, query) = match url.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (url, None),
    };

    let path = path
        .split('/')
        .map(|segment| {
            if segment.len() == MAP_KEY_LEN && segment.chars().all(|c| c.is_ascii_hexdigit()) {
                "****"
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/");

    match query {
        None => path,
        Some(query) => {
            let query = query
                .split('&')
                .map(|pair| match pair.split_once('=') {
                    Some((name, _)) if name.eq_ignore_ascii_case("MAP_KEY") => {
                        format!("{name}=****")
                    }
                    _ => pair.to_string(),
                })
                .collect::<Vec<_>>()
                .join("&");
            format!("{path}?{query}")
        }
    }
}
