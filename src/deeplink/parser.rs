//! Pure classifier for checkout return URIs.
//!
//! # Parsing Rules
//!
//! - The URI must parse as an absolute URL; anything else is `Ignored`
//! - The match target is the host followed by the percent-decoded path, so
//!   `myapp://checkout/success` and `https://shop.example/checkout/success`
//!   both match `checkout/success`
//! - Markers match case-insensitively as substrings of the target
//! - Success markers are checked before cancel markers. A misread success
//!   only costs a server check, while a misread cancel would drop the
//!   pending order
//! - Query pairs are URL-decoded into a flat map; duplicate keys last-wins

use thiserror::Error;
use url::Url;

use super::intent::{NavigationIntent, QueryParams};

/// Errors from URI parsing. Callers normally degrade these to `Ignored`.
#[derive(Debug, Error)]
pub enum DeepLinkParseError {
    #[error("invalid URI {uri:?}: {source}")]
    InvalidUri {
        uri: String,
        #[source]
        source: url::ParseError,
    },

    #[error("URI path is not valid UTF-8 after decoding: {uri:?}")]
    InvalidEncoding { uri: String },
}

/// Path markers that identify checkout return links.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeepLinkMarkers {
    pub success: Vec<String>,
    pub cancel: Vec<String>,
}

impl Default for DeepLinkMarkers {
    fn default() -> Self {
        DeepLinkMarkers {
            success: vec!["checkout/success".to_string(), "payment-success".to_string()],
            cancel: vec!["checkout/cancel".to_string(), "payment-cancel".to_string()],
        }
    }
}

impl DeepLinkMarkers {
    /// Creates a marker set. Empty markers are dropped since they would match
    /// every URI.
    pub fn new<S: Into<String>>(
        success: impl IntoIterator<Item = S>,
        cancel: impl IntoIterator<Item = S>,
    ) -> Self {
        fn clean<S: Into<String>>(items: impl IntoIterator<Item = S>) -> Vec<String> {
            items
                .into_iter()
                .map(Into::into)
                .map(|m: String| m.trim().trim_matches('/').to_ascii_lowercase())
                .filter(|m| !m.is_empty())
                .collect()
        }
        DeepLinkMarkers {
            success: clean(success),
            cancel: clean(cancel),
        }
    }

    fn matches(markers: &[String], target: &str) -> bool {
        markers
            .iter()
            .any(|m| target.contains(m.to_ascii_lowercase().as_str()))
    }
}

/// Parses and classifies a URI, reporting why unparseable input was rejected.
///
/// # Examples
///
/// ```
/// use payment_reconciler::deeplink::{DeepLinkMarkers, NavigationIntent, parse_deep_link};
///
/// let markers = DeepLinkMarkers::default();
/// let intent = parse_deep_link("myapp://checkout/success?orderId=o1", &markers).unwrap();
/// assert!(matches!(intent, NavigationIntent::Success { .. }));
///
/// let intent = parse_deep_link("myapp://profile", &markers).unwrap();
/// assert_eq!(intent, NavigationIntent::Ignored);
///
/// assert!(parse_deep_link("not a uri", &markers).is_err());
/// ```
pub fn parse_deep_link(
    uri: &str,
    markers: &DeepLinkMarkers,
) -> Result<NavigationIntent, DeepLinkParseError> {
    let parsed = Url::parse(uri.trim()).map_err(|source| DeepLinkParseError::InvalidUri {
        uri: uri.to_string(),
        source,
    })?;

    let raw_target = format!("{}{}", parsed.host_str().unwrap_or(""), parsed.path());
    let target = urlencoding::decode(&raw_target)
        .map_err(|_| DeepLinkParseError::InvalidEncoding {
            uri: uri.to_string(),
        })?
        .to_ascii_lowercase();

    let is_success = DeepLinkMarkers::matches(&markers.success, &target);
    let is_cancel = !is_success && DeepLinkMarkers::matches(&markers.cancel, &target);
    if !is_success && !is_cancel {
        return Ok(NavigationIntent::Ignored);
    }

    let params: QueryParams = parsed.query_pairs().into_owned().collect();
    Ok(if is_success {
        NavigationIntent::Success { params }
    } else {
        NavigationIntent::Cancel { params }
    })
}

/// Classifies a URI, degrading parse failures to [`NavigationIntent::Ignored`].
pub fn classify(uri: &str, markers: &DeepLinkMarkers) -> NavigationIntent {
    match parse_deep_link(uri, markers) {
        Ok(intent) => intent,
        Err(e) => {
            tracing::debug!(error = %e, "Ignoring unparseable deep link");
            NavigationIntent::Ignored
        }
    }
}
