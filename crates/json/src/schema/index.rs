use super::build::{build_schema, Scope};
use super::refs::{Dangling, Ledger, RefId, Reference, Resolution};
use super::{keywords, Node, NodeId, NodeKind};
use crate::diagnostics::{Code, Diagnostics};
use crate::ptr::Token;
use crate::uri;
use serde_json::Value;
use std::collections::BTreeMap;
use url::Url;

/// Graph is an arena of schema Nodes, indexed on every URI by which each
/// Node may be referenced: its structural URI, its URI relative to its
/// nearest `$id`, and any plain-name anchor.
///
/// Documents are added with [`Graph::add_document`], after which
/// [`Graph::resolve_references`] resolves every `$ref` of the graph.
/// Problems are collected into the Graph's [`Diagnostics`].
#[derive(Debug, Default)]
pub struct Graph {
    nodes: Vec<Node>,
    // Index of (URI) => Node.
    idx: BTreeMap<String, NodeId>,
    // Raw documents and `$id`-scoped subtrees, keyed on fragment-less URI.
    resources: BTreeMap<String, Value>,
    pub(crate) ledger: Ledger,
    pub(crate) diagnostics: Diagnostics,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a schema document at `uri`, and return its root Node.
    ///
    /// Adding a document which is equal to one already added at `uri`
    /// returns the existing root. Adding a different document at an
    /// already-registered `uri` is reported as a conflict, and the
    /// first document is kept.
    pub fn add_document(&mut self, uri: &Url, doc: &Value) -> NodeId {
        let scope = Scope::root(uri);

        if !self.add_resource(&scope.uri, doc) {
            self.diagnostics.error(
                Code::SchemaConflict,
                &scope.uri,
                "a different schema document is already registered with this URI",
            );
        }
        if let Some(id) = self.fetch(scope.uri.as_str()) {
            return id;
        }
        tracing::debug!(uri = %scope.uri, "adding schema document");

        build_schema(self, scope, doc)
    }

    /// Resolve every pending Reference of the graph. Resolution may build
    /// further Nodes from registered resources, and their References are
    /// resolved in turn. Each Reference which can't be resolved is reported
    /// once as a diagnostic.
    pub fn resolve_references(&mut self) {
        let mut next = 0;
        let mut dangling = 0;

        while next != self.ledger.len() {
            let id = RefId(next);
            next += 1;

            let reference = self.ledger.get(id);
            if reference.resolution.is_some() {
                continue;
            }
            let resolution = match reference.to_uri.clone() {
                // The invalid URI was reported when the reference was built.
                None => Resolution::Dangling(Dangling::InvalidUri),
                Some(to_uri) => match self.resolve_uri(&to_uri) {
                    Ok(node) => Resolution::Node(node),
                    Err(detail) => {
                        let reference = self.ledger.get(id);
                        self.diagnostics.error(
                            Code::Unresolved,
                            &reference.from_uri,
                            format!(
                                "schema $ref '{}', referenced by '{}', was not found: {detail}",
                                reference.text, reference.from_uri
                            ),
                        );
                        dangling += 1;
                        Resolution::Dangling(detail)
                    }
                },
            };
            self.ledger.get_mut(id).resolution = Some(resolution);
        }
        tracing::debug!(references = next, dangling, "resolved schema references");
    }

    /// Fetch the Node registered at `uri`, if any.
    pub fn fetch(&self, uri: &str) -> Option<NodeId> {
        self.idx.get(uri).copied()
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    /// Iterate over all Nodes in the order they were built.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes.iter().enumerate().map(|(ind, n)| (NodeId(ind), n))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn reference(&self, id: RefId) -> &Reference {
        self.ledger.get(id)
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Take the Diagnostics collected so far, leaving none behind.
    pub fn take_diagnostics(&mut self) -> Diagnostics {
        std::mem::take(&mut self.diagnostics)
    }

    // Track a raw resource at a fragment-less `uri`.
    // Returns false if a different resource is already registered there.
    pub(crate) fn add_resource(&mut self, uri: &Url, v: &Value) -> bool {
        match self.resources.get(uri.as_str()) {
            Some(existing) => existing == v,
            None => {
                self.resources.insert(uri.to_string(), v.clone());
                true
            }
        }
    }

    // Reserve a Node which is filled in once its children are built.
    pub(crate) fn reserve(&mut self, uri: &Url, base_uri: &Url) -> NodeId {
        self.nodes.push(Node {
            uri: uri.clone(),
            base_uri: base_uri.clone(),
            kind: NodeKind::Bool(true),
        });
        NodeId(self.nodes.len() - 1)
    }

    pub(crate) fn set_kind(&mut self, id: NodeId, kind: NodeKind) {
        self.nodes[id.0].kind = kind;
    }

    // Register `uri` as a key of Node `id`. Registering a URI which is
    // already a key of another Node is a conflict, and the first is kept.
    pub(crate) fn register(&mut self, uri: &Url, id: NodeId) {
        match self.idx.get(uri.as_str()) {
            Some(existing) if *existing != id => {
                tracing::debug!(%uri, ?existing, ?id, "conflicting schema registration");
                self.diagnostics.error(
                    Code::SchemaConflict,
                    uri,
                    format!("a different schema is already registered with URI '{uri}'"),
                );
            }
            Some(_) => (),
            None => {
                self.idx.insert(uri.to_string(), id);
            }
        }
    }

    fn resolve_uri(&mut self, to_uri: &Url) -> Result<NodeId, Dangling> {
        if let Some(id) = self.fetch(to_uri.as_str()) {
            return Ok(id);
        }

        let (resource_uri, segments) = uri::split_fragment(to_uri);
        let Some(resource) = self.resources.get(resource_uri.as_str()) else {
            return Err(Dangling::MissingResource(resource_uri.to_string()));
        };

        if !uri::has_pointer_fragment(to_uri) {
            return Err(Dangling::MissingAnchor {
                resource: resource_uri.to_string(),
                anchor: to_uri.fragment().unwrap_or_default().to_string(),
            });
        }

        // Walk the raw resource along the pointer, tracking the base URI
        // and the alias of each location as `$id`s are crossed.
        let mut scope = Scope::root(&resource_uri);
        let mut value = resource;

        for segment in segments.iter() {
            match id_of(&scope.base, value) {
                Some(base) if base != scope.base => {
                    scope.base = base.clone();
                    scope.alias = base;
                }
                _ => (),
            }
            value = Token::from_str(segment).query(value).ok_or_else(|| {
                Dangling::MissingPointer {
                    resource: resource_uri.to_string(),
                    segment: segment.clone(),
                }
            })?;
            scope = scope.push(segment);
        }

        // The structural URI of the target is the referenced URI.
        scope.uri = to_uri.clone();

        let value = value.clone();
        tracing::debug!(uri = %to_uri, "building schema at non-keyword location");

        Ok(build_schema(self, scope, &value))
    }
}

// Fragment-less `$id` of schema `v`, if it declares one which is in effect.
fn id_of(base: &Url, v: &Value) -> Option<Url> {
    let obj = v.as_object()?;
    if obj.contains_key(keywords::REF) {
        return None;
    }
    let id = obj.get(keywords::ID)?.as_str()?;
    let id = uri::resolve(base, id).ok()?;
    Some(uri::without_fragment(&id))
}

#[cfg(test)]
mod test {
    use super::super::Items;
    use super::*;
    use crate::diagnostics::Severity;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    fn uris(graph: &Graph) -> Vec<String> {
        graph.nodes().map(|(_, n)| n.uri.to_string()).collect()
    }

    #[test]
    fn test_nodes_are_built_for_every_subschema() {
        let mut graph = Graph::new();
        let root = graph.add_document(
            &url("http://example.com/root.json#ignored"),
            &json!({
                "type": "object",
                "properties": {
                    "a/b": {"type": "string"},
                    "list": {"items": [true, {"type": "integer"}], "additionalItems": false},
                },
                "definitions": {"d": {"not": {"const": 1}}},
                "dependencies": {"a/b": ["list"], "list": {"required": ["c"]}},
            }),
        );
        assert_eq!(root, NodeId(0));

        insta::assert_debug_snapshot!(uris(&graph), @r###"
        [
            "http://example.com/root.json",
            "http://example.com/root.json#/properties/a~1b",
            "http://example.com/root.json#/properties/list",
            "http://example.com/root.json#/properties/list/items/0",
            "http://example.com/root.json#/properties/list/items/1",
            "http://example.com/root.json#/properties/list/additionalItems",
            "http://example.com/root.json#/definitions/d",
            "http://example.com/root.json#/definitions/d/not",
            "http://example.com/root.json#/dependencies/list",
        ]
        "###);

        let list = graph
            .fetch("http://example.com/root.json#/properties/list")
            .unwrap();
        let list = graph.node(list).schema().unwrap();
        assert_eq!(list.items, Some(Items::Tuple(vec![NodeId(3), NodeId(4)])));
        assert!(matches!(
            graph.node(NodeId(5)).kind,
            NodeKind::Bool(false)
        ));
        assert!(graph.diagnostics().is_empty());
    }

    #[test]
    fn test_documents_are_memoized_and_conflicts_are_reported() {
        let mut graph = Graph::new();
        let uri = url("http://example.com/root.json");
        let doc = json!({"properties": {"a": true}});

        let first = graph.add_document(&uri, &doc);
        assert_eq!(graph.add_document(&uri, &doc), first);
        assert_eq!(graph.len(), 2);
        assert!(graph.diagnostics().is_empty());

        // A different body at the same URI is a conflict, and the first wins.
        assert_eq!(graph.add_document(&uri, &json!({"type": "string"})), first);
        assert_eq!(graph.len(), 2);

        let diagnostics: Vec<_> = graph.take_diagnostics().into_vec();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code, Code::SchemaConflict);
        assert_eq!(diagnostics[0].severity, Severity::Error);
        assert_eq!(diagnostics[0].uri, "http://example.com/root.json");
    }

    #[test]
    fn test_ids_and_anchors_are_registered() {
        let mut graph = Graph::new();
        graph.add_document(
            &url("http://localhost:1234/root"),
            &json!({
                "definitions": {
                    "A": {"$id": "#foo", "type": "integer"},
                    "B": {
                        "$id": "folder/",
                        "items": {"$ref": "folderInteger.json"},
                        "definitions": {"inner": {"$id": "#bar"}}
                    },
                    "C": {"$id": "http://other.test/c.json", "$ref": "#/definitions/A"},
                }
            }),
        );

        for (uri, expect) in [
            ("http://localhost:1234/root#foo", "http://localhost:1234/root#/definitions/A"),
            ("http://localhost:1234/folder/", "http://localhost:1234/root#/definitions/B"),
            (
                "http://localhost:1234/folder/#/items",
                "http://localhost:1234/root#/definitions/B/items",
            ),
            (
                "http://localhost:1234/folder/#bar",
                "http://localhost:1234/root#/definitions/B/definitions/inner",
            ),
        ] {
            let id = graph.fetch(uri).unwrap_or_else(|| panic!("{uri} not found"));
            assert_eq!(graph.node(id).uri.as_str(), expect);
        }
        // $id beside $ref is inert.
        assert!(graph.fetch("http://other.test/c.json").is_none());

        let items = graph.fetch("http://localhost:1234/folder/#/items").unwrap();
        assert_eq!(
            graph.node(items).base_uri.as_str(),
            "http://localhost:1234/folder/"
        );

        let refs: Vec<_> = graph
            .ledger()
            .iter()
            .map(|(_, r)| (r.text.as_str(), r.to_uri.as_ref().unwrap().to_string()))
            .collect();
        insta::assert_debug_snapshot!(refs, @r###"
        [
            (
                "folderInteger.json",
                "http://localhost:1234/folder/folderInteger.json",
            ),
            (
                "#/definitions/A",
                "http://localhost:1234/root#/definitions/A",
            ),
        ]
        "###);
    }

    #[test]
    fn test_conflicting_anchors_are_reported() {
        let mut graph = Graph::new();
        graph.add_document(
            &url("http://example.com/root.json"),
            &json!({
                "definitions": {
                    "a": {"$id": "#foo", "type": "string"},
                    "b": {"$id": "#foo", "type": "integer"},
                    // The same resource, embedded twice.
                    "c": {"$id": "item.json", "type": "null"},
                    "d": {"items": {"$id": "item.json", "type": "null"}},
                },
                "$ref": "#/definitions/d/items",
            }),
        );
        graph.resolve_references();

        // The first registration of the anchor is kept.
        let foo = graph.fetch("http://example.com/root.json#foo").unwrap();
        assert_eq!(
            graph.node(foo).uri.as_str(),
            "http://example.com/root.json#/definitions/a"
        );
        // Embeddings of an equal resource are one Node.
        assert_eq!(
            graph.fetch("http://example.com/root.json#/definitions/d/items"),
            graph.fetch("http://example.com/item.json"),
        );

        insta::assert_json_snapshot!(graph.take_diagnostics().into_vec(), @r###"
        [
          {
            "code": "ESCHEMACONFLICT",
            "severity": "Error",
            "message": "a different schema is already registered with URI 'http://example.com/root.json#foo'",
            "uri": "http://example.com/root.json#foo"
          }
        ]
        "###);
    }

    #[test]
    fn test_references_resolve_lazily_across_documents() {
        let mut graph = Graph::new();
        graph.add_document(
            &url("http://localhost:1234/root.json"),
            &json!({
                "properties": {
                    "int": {"$ref": "subSchemas.json#/integer"},
                    "self": {"$ref": "#"},
                    "nested": {"$ref": "#/properties/self"},
                }
            }),
        );
        // Added after the referencing document.
        graph.add_document(
            &url("http://localhost:1234/subSchemas.json"),
            &json!({
                "integer": {"type": "integer"},
                "refToInteger": {"$ref": "#/integer"}
            }),
        );
        graph.resolve_references();
        assert!(graph.diagnostics().is_empty());

        let targets: Vec<_> = graph
            .ledger()
            .iter()
            .map(|(_, r)| graph.node(r.target().unwrap()).uri.to_string())
            .collect();

        assert_eq!(
            targets,
            vec![
                "http://localhost:1234/subSchemas.json#/integer",
                "http://localhost:1234/root.json",
                "http://localhost:1234/root.json#/properties/self",
            ]
        );
        // Resolution is idempotent, and finds the now-built node.
        graph.resolve_references();
        assert!(graph.diagnostics().is_empty());
        assert!(graph
            .fetch("http://localhost:1234/subSchemas.json#/integer")
            .is_some());
    }

    #[test]
    fn test_dangling_references_are_reported_once() {
        let mut graph = Graph::new();
        graph.add_document(
            &url("http://example.com/root.json"),
            &json!({
                "definitions": {"present": {}},
                "properties": {
                    "a": {"$ref": "#/definitions/missing"},
                    "b": {"$ref": "#/definitions/present/deeper"},
                    "c": {"$ref": "other.json"},
                    "d": {"$ref": "#nope"},
                }
            }),
        );
        graph.resolve_references();
        graph.resolve_references();

        let dangling: Vec<_> = graph
            .ledger()
            .dangling()
            .map(|(_, r, d)| (r.text.as_str(), d.to_string()))
            .collect();
        insta::assert_debug_snapshot!(dangling, @r###"
        [
            (
                "#/definitions/missing",
                "JSON pointer segment 'missing' does not exist within 'http://example.com/root.json'",
            ),
            (
                "#/definitions/present/deeper",
                "JSON pointer segment 'deeper' does not exist within 'http://example.com/root.json'",
            ),
            (
                "other.json",
                "no schema is registered with URI 'http://example.com/other.json'",
            ),
            (
                "#nope",
                "anchor 'nope' does not exist within 'http://example.com/root.json'",
            ),
        ]
        "###);

        let diagnostics = graph.take_diagnostics().into_vec();
        assert_eq!(diagnostics.len(), 4);
        assert!(diagnostics.iter().all(|d| d.code == Code::Unresolved));
        assert_eq!(
            diagnostics[0].uri,
            "http://example.com/root.json#/properties/a"
        );
        assert_eq!(
            diagnostics[0].message,
            "schema $ref '#/definitions/missing', referenced by 'http://example.com/root.json#/properties/a', was not found: JSON pointer segment 'missing' does not exist within 'http://example.com/root.json'"
        );
    }

    #[test]
    fn test_invalid_keywords_are_reported_and_skipped() {
        let mut graph = Graph::new();
        graph.add_document(
            &url("http://example.com/root.json"),
            &json!({
                "type": "nope",
                "properties": 5,
                "required": ["a", 1],
                "items": [true, 3],
                "minLength": -1,
                "$ref": "http://[::1",
                "allOf": [{"title": 32}],
            }),
        );
        graph.resolve_references();

        let diagnostics: Vec<_> = graph
            .take_diagnostics()
            .into_vec()
            .into_iter()
            .map(|d| format!("{d}"))
            .collect();

        insta::assert_debug_snapshot!(diagnostics, @r###"
        [
            "EINVALIDSCHEMA at 'http://example.com/root.json': at keyword 'type': expected a type or array of types",
            "EINVALIDSCHEMA at 'http://example.com/root.json': at keyword 'properties': expected an object",
            "EINVALIDSCHEMA at 'http://example.com/root.json': at keyword 'required': expected an array of strings",
            "EINVALIDSCHEMA at 'http://example.com/root.json': at keyword 'items': expected a schema or array of schemas",
            "EINVALIDSCHEMA at 'http://example.com/root.json': at keyword 'minLength': expected an unsigned integer",
            "EINVALIDREF at 'http://example.com/root.json': at keyword '$ref': failed to resolve 'http://[::1' against base URI 'http://example.com/root.json': invalid IPv6 address",
            "EINVALIDSCHEMA at 'http://example.com/root.json#/allOf/0': at keyword 'title': expected a string",
        ]
        "###);

        // The invalid reference is dangling, but not reported twice.
        let (_, _, dangling) = graph.ledger().dangling().next().unwrap();
        assert_eq!(dangling, &Dangling::InvalidUri);
    }
}
