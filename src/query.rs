//! `application/x-www-form-urlencoded` helpers shared by the listener and the request builders.

use std::collections::HashMap;

use oauth2::url::form_urlencoded;

/// Decodes a query string into a map. A key without `=` maps to an empty string and the last
/// occurrence of a duplicated key wins.
pub fn parse_query(query: &str) -> HashMap<String, String> {
    form_urlencoded::parse(query.as_bytes())
        .into_owned()
        .collect()
}

/// Encodes a single query component.
pub fn encode(value: &str) -> String {
    form_urlencoded::byte_serialize(value.as_bytes()).collect()
}
