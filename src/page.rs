use std::sync::LazyLock;

use regex::Regex;

static HEX32_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[0-9a-fA-F]{32}$").unwrap());

/// Extract a page id from a Notion URL.
///
/// Takes the last path segment (queries and fragments stripped), then the
/// part after the last `-` — Notion slugs look like `My-Page-<32 hex>`.
/// A bare 32-hex id is hyphenated into UUID form; anything else is returned
/// as-is (it may already be a UUID).
pub fn page_id_from_url(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let last = path.trim_end_matches('/').rsplit('/').next().unwrap_or(path);
    let id = last.rsplit('-').next().unwrap_or(last);

    if HEX32_RE.is_match(id) {
        format!(
            "{}-{}-{}-{}-{}",
            &id[..8],
            &id[8..12],
            &id[12..16],
            &id[16..20],
            &id[20..]
        )
    } else {
        id.to_string()
    }
}
