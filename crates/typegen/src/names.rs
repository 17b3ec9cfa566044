use json::schema::Node;
use regex::{Captures, Regex};
use std::collections::BTreeSet;

/// Identifier used when no other naming rule yields one.
pub const FALLBACK_NAME: &str = "AnonymousSchema";

/// Allocator hands out identifiers which are unique across a compilation.
#[derive(Debug, Default)]
pub struct Allocator {
    used: BTreeSet<String>,
}

impl Allocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a name for `node`, derived from (in order of precedence)
    /// a `preferred` name, its title, the last JSON pointer segment of its
    /// URI, or the last path component of its `$id` or URI without
    /// extension. The first candidate which sanitizes to a non-empty
    /// identifier is used.
    pub fn allocate(&mut self, node: &Node, preferred: Option<&str>) -> String {
        let base = preferred
            .into_iter()
            .map(str::to_string)
            .chain(candidates(node))
            .find_map(|c| sanitize(&c))
            .unwrap_or_else(|| FALLBACK_NAME.to_string());

        self.allocate_unique(base)
    }

    /// Allocate `base`, or `base` with the smallest non-negative integer
    /// suffix for which the name is not yet in use.
    pub fn allocate_unique(&mut self, base: String) -> String {
        let mut name = base.clone();
        let mut suffix = 0;

        while self.used.contains(&name) {
            name = format!("{base}{suffix}");
            suffix += 1;
        }
        self.used.insert(name.clone());
        name
    }
}

fn candidates(node: &Node) -> Vec<String> {
    let mut out = Vec::new();
    let schema = node.schema();

    if let Some(title) = schema.and_then(|s| s.title.as_ref()) {
        out.push(title.clone());
    }
    // Only pointers of plain word segments name a schema.
    if let Some(tail) = node
        .uri
        .fragment()
        .and_then(|f| POINTER_TAIL_RE.captures(f))
        .and_then(|c| c.get(1))
    {
        out.push(tail.as_str().to_string());
    }

    let uri = schema.and_then(|s| s.id.as_ref()).unwrap_or(&node.uri);
    // Paths of URIs which cannot be a base (`urn:...`) have no segments.
    if let Some(file) = uri.path().rsplit('/').find(|s| !s.is_empty()) {
        out.push(EXTENSION_RE.replace(file, "").into_owned());
    }
    out
}

/// Sanitize `s` into a PascalCase identifier. Characters other than ASCII
/// letters, digits, `_` and `$` are word boundaries, and a leading character
/// which can't begin an identifier is dropped. The first letter of each
/// word, a letter following `_`, and a letter following digits or `$` are
/// upper-cased, and the `_` is removed. Returns None if nothing remains.
///
/// ```
/// use typegen::names::sanitize;
///
/// assert_eq!(sanitize("my_schema-name").as_deref(), Some("MySchemaName"));
/// assert_eq!(sanitize("camelCase").as_deref(), Some("CamelCase"));
/// assert_eq!(sanitize("2d point").as_deref(), Some("DPoint"));
/// assert_eq!(sanitize("  --  "), None);
/// ```
pub fn sanitize(s: &str) -> Option<String> {
    let s = UNSAFE_RE.replace_all(s, " ");
    let s = LEADING_UNDERSCORE_RE.replace(&s, upper);
    let s = UNDERSCORE_RE.replace_all(&s, |c: &Captures| c[0][1..].to_uppercase());
    let s = DIGITS_RE.replace_all(&s, upper);
    let s = SPACED_RE.replace_all(&s, upper);

    let mut out: String = s.chars().filter(|c| !c.is_whitespace()).collect();
    // Digits may remain at the start of runs such as "22nd".
    out = out.trim_start_matches(|c: char| c.is_ascii_digit()).to_string();

    if let Some(first) = out.get(..1) {
        let first = first.to_ascii_uppercase();
        out.replace_range(..1, &first);
    }

    if out.is_empty() {
        None
    } else {
        Some(out)
    }
}

fn upper(c: &Captures) -> String {
    c[0].to_uppercase()
}

lazy_static::lazy_static! {
    // A leading non-identifier character, or any non-identifier character.
    static ref UNSAFE_RE: Regex = Regex::new(r"(^\s*[^a-zA-Z_$])|[^a-zA-Z_$0-9]").unwrap();
    static ref LEADING_UNDERSCORE_RE: Regex = Regex::new(r"^_[a-z]").unwrap();
    static ref UNDERSCORE_RE: Regex = Regex::new(r"_[a-z]").unwrap();
    static ref DIGITS_RE: Regex = Regex::new(r"[0-9$]+[a-zA-Z]").unwrap();
    static ref SPACED_RE: Regex = Regex::new(r"\s+[a-zA-Z]").unwrap();
    // JSON pointer fragment of word segments, capturing the last.
    static ref POINTER_TAIL_RE: Regex =
        Regex::new(r"^/(?:[A-Za-z0-9_]+/)*([A-Za-z0-9_]+)$").unwrap();
    // Extension of a file name, including compound extensions.
    static ref EXTENSION_RE: Regex = Regex::new(r"\.[A-Za-z0-9_.]*$").unwrap();
}
