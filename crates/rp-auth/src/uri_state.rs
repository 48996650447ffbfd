//! `state` parameter extraction and small URI rewrites.

use crate::{AuthError, AuthResult};
use url::Url;

/// Where in a URI to look for the `state` parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UriLocation {
    /// The query string (`?state=...`), as on an outgoing auth request.
    Query,
    /// The fragment (`#state=...`), as on an implicit-flow redirect back.
    Hash,
}

const STATE_PARAM: &str = "state";

fn parse_absolute(uri: &str) -> AuthResult<Url> {
    Url::parse(uri).map_err(|e| AuthError::malformed_uri(uri, e))
}

/// Extract the `state` parameter from `uri`.
///
/// A missing or empty `uri` yields `Ok(None)`. A non-empty `uri` must be an
/// absolute URI.
pub fn extract_state(uri: Option<&str>, location: UriLocation) -> AuthResult<Option<String>> {
    let uri = match uri {
        Some(u) if !u.is_empty() => u,
        _ => return Ok(None),
    };
    let url = parse_absolute(uri)?;

    let state = match location {
        UriLocation::Query => url
            .query_pairs()
            .find(|(k, _)| k == STATE_PARAM)
            .map(|(_, v)| v.into_owned()),
        UriLocation::Hash => url.fragment().and_then(|fragment| {
            url::form_urlencoded::parse(fragment.as_bytes())
                .find(|(k, _)| k == STATE_PARAM)
                .map(|(_, v)| v.into_owned())
        }),
    };

    Ok(state.filter(|s| !s.is_empty()))
}

/// True iff `current_uri` carries a `state` in its fragment, i.e. the page
/// was reached by an authentication redirect.
pub fn has_auth_response(current_uri: Option<&str>) -> AuthResult<bool> {
    Ok(extract_state(current_uri, UriLocation::Hash)?.is_some())
}

/// `uri` with its fragment removed.
pub fn strip_fragment(uri: &str) -> AuthResult<String> {
    let mut url = parse_absolute(uri)?;
    url.set_fragment(None);
    Ok(url.to_string())
}

/// `uri` with query parameter `name` set to `value`, replacing any existing
/// occurrences.
pub fn set_query_param(uri: &str, name: &str, value: &str) -> AuthResult<String> {
    let mut url = parse_absolute(uri)?;
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| k != name)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    url.query_pairs_mut()
        .clear()
        .extend_pairs(kept)
        .append_pair(name, value);

    Ok(url.to_string())
}
