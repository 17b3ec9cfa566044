//! In-memory model of draft-07 schemas.
//!
//! A [`Graph`] owns every [`Node`] built from a set of schema documents.
//! Nodes reference their children by [`NodeId`], and reference `$ref`
//! targets through the [`Ledger`], so that cyclic schemas are represented
//! by indirection and never by nesting.

use serde_json::{Number, Value};
use url::Url;

pub mod build;
pub mod index;
pub mod keywords;
pub mod refs;
pub mod types;

pub use index::Graph;
pub use refs::{Dangling, Ledger, RefId, Reference, Resolution};

/// Index of a Node within its Graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub usize);

/// Node is one schema or subschema, normalized and immutable once built.
#[derive(Debug, Clone)]
pub struct Node {
    /// Structural location of the node, as reached from its document root.
    pub uri: Url,
    /// URI against which relative references of this node resolve.
    pub base_uri: Url,
    pub kind: NodeKind,
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    /// Literal `true` (always valid) or `false` (never valid) schema.
    Bool(bool),
    Schema(Box<SchemaNode>),
}

impl Node {
    /// Returns the SchemaNode of this Node, if it's not a boolean schema.
    pub fn schema(&self) -> Option<&SchemaNode> {
        match &self.kind {
            NodeKind::Schema(schema) => Some(schema),
            NodeKind::Bool(_) => None,
        }
    }
}

/// Items is the form of an `items` keyword.
#[derive(Debug, Clone, PartialEq)]
pub enum Items {
    /// A single schema applied to every item.
    Single(NodeId),
    /// Positional schemas of a tuple.
    Tuple(Vec<NodeId>),
}

/// Dependency is the form of a single `dependencies` entry.
#[derive(Debug, Clone, PartialEq)]
pub enum Dependency {
    Schema(NodeId),
    Required(Vec<String>),
}

/// SchemaNode holds the draft-07 keywords of an object schema.
/// Subschemas are already-built child nodes rather than raw JSON.
#[derive(Debug, Clone, Default)]
pub struct SchemaNode {
    // Core.
    pub id: Option<Url>,
    pub r#ref: Option<RefId>,
    pub schema: Option<String>,
    pub comment: Option<String>,
    pub definitions: Vec<(String, NodeId)>,

    // Annotations.
    pub title: Option<String>,
    pub description: Option<String>,
    pub default: Option<Value>,
    pub examples: Vec<Value>,
    pub read_only: Option<bool>,
    pub write_only: Option<bool>,
    pub format: Option<String>,
    pub content_encoding: Option<String>,
    pub content_media_type: Option<String>,

    // Any instance type.
    pub type_: Option<types::Set>,
    pub r#enum: Option<Vec<Value>>,
    pub r#const: Option<Value>,
    pub all_of: Vec<NodeId>,
    pub any_of: Vec<NodeId>,
    pub one_of: Vec<NodeId>,
    pub not: Option<NodeId>,
    pub r#if: Option<NodeId>,
    pub then: Option<NodeId>,
    pub r#else: Option<NodeId>,

    // Numbers.
    pub multiple_of: Option<Number>,
    pub maximum: Option<Number>,
    pub exclusive_maximum: Option<Number>,
    pub minimum: Option<Number>,
    pub exclusive_minimum: Option<Number>,

    // Strings.
    pub max_length: Option<u64>,
    pub min_length: Option<u64>,
    pub pattern: Option<String>,

    // Arrays.
    pub items: Option<Items>,
    pub additional_items: Option<NodeId>,
    pub max_items: Option<u64>,
    pub min_items: Option<u64>,
    pub unique_items: Option<bool>,
    pub contains: Option<NodeId>,

    // Objects.
    pub properties: Vec<(String, NodeId)>,
    pub pattern_properties: Vec<(String, NodeId)>,
    pub additional_properties: Option<NodeId>,
    pub property_names: Option<NodeId>,
    pub required: Vec<String>,
    pub max_properties: Option<u64>,
    pub min_properties: Option<u64>,
    pub dependencies: Vec<(String, Dependency)>,
}

impl SchemaNode {
    /// Returns true if the node declares an array-only keyword,
    /// from which an array shape may be inferred in the absence of `type`.
    pub fn is_array_inferable(&self) -> bool {
        self.items.is_some()
            || self.min_items.is_some()
            || self.max_items.is_some()
            || self.unique_items.is_some()
            || self.contains.is_some()
    }

    /// Returns true if `property` is named by the `required` keyword.
    pub fn is_required(&self, property: &str) -> bool {
        self.required.iter().any(|r| r == property)
    }
}
