//! URI reference algebra used while walking schema documents.
//!
//! These are pure functions over `url::Url`: resolution of `$ref` and `$id`
//! text against a base URI, and manipulation of JSON-Pointer fragments.
//! Nothing here touches the network or the filesystem.

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};
use url::Url;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("failed to resolve '{reference}' against base URI '{base}': {source}")]
    Resolve {
        reference: String,
        base: String,
        #[source]
        source: url::ParseError,
    },
}

/// Resolve `reference` as a URI reference against `base`.
///
/// Absolute references are returned in their normalized form, and relative
/// references are merged with the scheme, authority and path of `base`.
/// A trailing empty fragment is removed, so that `#` resolves to the
/// fragment-less document URI.
///
/// ```
/// use json::uri::resolve;
///
/// let base = url::Url::parse("http://example.com/schemas/root.json#/definitions/a").unwrap();
///
/// assert_eq!(resolve(&base, "#").unwrap().as_str(), "http://example.com/schemas/root.json");
/// assert_eq!(
///     resolve(&base, "other.json#/items").unwrap().as_str(),
///     "http://example.com/schemas/other.json#/items",
/// );
/// assert_eq!(
///     resolve(&base, "urn:example:thing").unwrap().as_str(),
///     "urn:example:thing",
/// );
/// ```
pub fn resolve(base: &Url, reference: &str) -> Result<Url, Error> {
    let mut uri = base.join(reference).map_err(|source| Error::Resolve {
        reference: reference.to_string(),
        base: base.to_string(),
        source,
    })?;

    if let Some("") = uri.fragment() {
        uri.set_fragment(None);
    }
    Ok(uri)
}

/// Append an escaped JSON-Pointer `segment` to the fragment of `uri`,
/// creating a `#` fragment if `uri` has none.
///
/// ```
/// use json::uri::append_pointer_segment;
///
/// let root = url::Url::parse("http://example.com/root.json").unwrap();
/// let defs = append_pointer_segment(&root, "definitions");
/// let child = append_pointer_segment(&defs, "a/b~c d");
///
/// assert_eq!(child.as_str(), "http://example.com/root.json#/definitions/a~1b~0c%20d");
/// ```
pub fn append_pointer_segment(uri: &Url, segment: &str) -> Url {
    let mut fragment = uri.fragment().unwrap_or("").to_string();
    fragment.push('/');
    encode_segment(&mut fragment, segment);

    let mut out = uri.clone();
    out.set_fragment(Some(&fragment));
    out
}

/// Split `uri` into its fragment-less base and the decoded segments of its
/// JSON-Pointer fragment. A missing or empty fragment yields no segments.
///
/// ```
/// use json::uri::split_fragment;
///
/// let uri = url::Url::parse("http://example.com/root.json#/definitions/a~1b/0").unwrap();
/// let (base, segments) = split_fragment(&uri);
///
/// assert_eq!(base.as_str(), "http://example.com/root.json");
/// assert_eq!(segments, vec!["definitions", "a/b", "0"]);
/// ```
pub fn split_fragment(uri: &Url) -> (Url, Vec<String>) {
    let mut base = uri.clone();
    base.set_fragment(None);

    let segments = match uri.fragment() {
        None | Some("") => Vec::new(),
        Some(fragment) => {
            let decoded = percent_decode_str(fragment).decode_utf8_lossy();
            let pointer = decoded.strip_prefix('/').unwrap_or(&decoded);

            pointer
                .split('/')
                .map(|s| s.replace("~1", "/").replace("~0", "~"))
                .collect()
        }
    };
    (base, segments)
}

/// Returns true if `uri` has no fragment, an empty fragment, or a fragment
/// which is a JSON pointer (as opposed to a plain-name anchor).
pub fn has_pointer_fragment(uri: &Url) -> bool {
    match uri.fragment() {
        None | Some("") => true,
        Some(f) => f.starts_with('/'),
    }
}

/// Returns `uri` without its fragment.
pub fn without_fragment(uri: &Url) -> Url {
    let mut out = uri.clone();
    out.set_fragment(None);
    out
}

// Escape a pointer segment per RFC 6901 ('~' => "~0", '/' => "~1"), after
// percent-encoding it for use within a URI fragment.
fn encode_segment(into: &mut String, segment: &str) {
    for p in utf8_percent_encode(segment, FRAGMENT) {
        for c in p.chars() {
            match c {
                '~' => into.push_str("~0"),
                '/' => into.push_str("~1"),
                _ => into.push(c),
            }
        }
    }
}

/// https://url.spec.whatwg.org/#fragment-percent-encode-set, plus '%' so that
/// literal percent signs survive a decode.
const FRAGMENT: &AsciiSet = &CONTROLS
    .add(b'%')
    .add(b' ')
    .add(b'"')
    .add(b'<')
    .add(b'>')
    .add(b'`');
