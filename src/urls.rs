//! Result url handling.
//!
//! Fragment urls are stored relative to the site root. Before they reach
//! callers they are joined onto the configured base url, optionally tagged
//! with highlight query parameters, and for sub-results pointed at a
//! heading id.

use url::Url;

/// Origin used to run relative urls through [`Url`]; stripped afterwards.
const PLACEHOLDER_ORIGIN: &str = "https://example.com";

/// `http://`, `https://` or protocol-relative `//`.
fn is_absolute(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://") || url.starts_with("//")
}

/// Join a stored url onto `base_url`.
///
/// Absolute urls are returned unchanged. Relative ones are appended to the
/// base with repeated slashes collapsed.
pub fn full_url(raw: &str, base_url: &str) -> String {
    if is_absolute(raw) {
        return raw.to_owned();
    }

    let joined = format!("{base_url}/{raw}");
    let mut collapsed = String::with_capacity(joined.len());
    for c in joined.chars() {
        if c == '/' && collapsed.ends_with('/') {
            continue;
        }
        collapsed.push(c);
    }

    for scheme in ["http:/", "https:/"] {
        if let Some(rest) = collapsed.strip_prefix(scheme) {
            return format!("{scheme}/{rest}");
        }
    }
    collapsed
}

/// Parse `url` (absolute, protocol-relative or relative), apply `edit`, and
/// serialise it back in the same form. `None` if it does not parse.
fn edit_url(url: &str, edit: impl FnOnce(&mut Url)) -> Option<String> {
    if url.starts_with("http://") || url.starts_with("https://") {
        let mut parsed = Url::parse(url).ok()?;
        edit(&mut parsed);
        return Some(parsed.into());
    }

    if url.starts_with("//") {
        let mut parsed = Url::parse(&format!("https:{url}")).ok()?;
        edit(&mut parsed);
        return String::from(parsed)
            .strip_prefix("https:")
            .map(str::to_owned);
    }

    let path = if url.starts_with('/') {
        url.to_owned()
    } else {
        format!("/{url}")
    };
    let mut parsed = Url::parse(PLACEHOLDER_ORIGIN).ok()?.join(&path).ok()?;
    edit(&mut parsed);
    String::from(parsed)
        .strip_prefix(PLACEHOLDER_ORIGIN)
        .map(str::to_owned)
}

/// The url handed to callers for a fragment.
///
/// [`full_url`], plus one `highlight_param=<word>` query pair per word of
/// `term` when a highlight parameter is configured. Urls that cannot be
/// parsed are returned without parameters.
pub fn processed_url(
    raw: &str,
    base_url: &str,
    highlight_param: Option<&str>,
    term: &str,
) -> String {
    let normalized = full_url(raw, base_url);
    let Some(param) = highlight_param else {
        return normalized;
    };
    if term.split_whitespace().next().is_none() {
        return normalized;
    }

    edit_url(&normalized, |url| {
        let mut pairs = url.query_pairs_mut();
        for word in term.split_whitespace() {
            pairs.append_pair(param, word);
        }
    })
    .unwrap_or_else(|| {
        tracing::debug!(url = %normalized, "cannot add highlight parameters");
        normalized
    })
}

/// `url` with its fragment identifier replaced by `id`.
pub fn anchored_url(url: &str, id: &str) -> String {
    edit_url(url, |parsed| parsed.set_fragment(Some(id))).unwrap_or_else(|| {
        tracing::warn!(url, id, "cannot anchor sub-result url");
        url.to_owned()
    })
}
