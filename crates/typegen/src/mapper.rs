use super::ast::{IndexSignature, Property, Record, Tuple, TypeExpr};
use super::names::Allocator;
use super::options::{AnyRepresentation, CompileOptions, ExportPolicy};
use super::{Declaration, EmissionFilter, Origin};
use json::schema::{Graph, Items, Node, NodeId, NodeKind, RefId, Resolution, SchemaNode};
use serde_json::Value;
use std::collections::BTreeMap;

/// Name of the prelude declaration of JSON scalar values.
pub const JSON_PRIMITIVE: &str = "JSONPrimitive";
/// Name of the prelude declaration of any JSON value.
pub const JSON_VALUE: &str = "JSONValue";

/// Synthesizer maps the Nodes of a Graph into type expressions.
///
/// Nodes targeted by a `$ref` are named on first reference, and become
/// declarations of their own ("lifted"). Names are handed out in discovery
/// order, which is also the order of the declarations produced.
pub struct Synthesizer<'a> {
    graph: &'a Graph,
    options: &'a CompileOptions,
    filter: Option<&'a EmissionFilter>,
    names: Allocator,
    // Nodes which are named, and the declarations they produce.
    named: BTreeMap<NodeId, String>,
    order: Vec<(NodeId, Origin)>,
}

impl<'a> Synthesizer<'a> {
    pub fn new(
        graph: &'a Graph,
        options: &'a CompileOptions,
        filter: Option<&'a EmissionFilter>,
        names: Allocator,
    ) -> Self {
        Self {
            graph,
            options,
            filter,
            names,
            named: BTreeMap::new(),
            order: Vec::new(),
        }
    }

    /// Declare the root Node of an input document under an already-allocated `name`.
    pub fn declare_root(&mut self, id: NodeId, name: String) {
        if self.named.contains_key(&id) {
            return;
        }
        self.named.insert(id, name);
        self.order.push((id, Origin::Root));
    }

    /// Name of the declaration of Node `id`, lifting the Node into a
    /// declaration of its own if it's not already named.
    pub fn name_for(&mut self, id: NodeId) -> String {
        if let Some(name) = self.named.get(&id) {
            return name.clone();
        }
        let name = self.names.allocate(self.graph.node(id), None);
        tracing::debug!(%name, uri = %self.graph.node(id).uri, "lifted referenced schema");

        self.named.insert(id, name.clone());
        self.order.push((id, Origin::Lifted));
        name
    }

    /// Synthesize declarations of all root Nodes, and of every Node lifted
    /// while doing so, in discovery order.
    pub fn into_declarations(mut self) -> Vec<Declaration> {
        let mut out = self.prelude();
        let mut next = 0;

        while let Some((id, origin)) = self.order.get(next).cloned() {
            next += 1;

            let node = self.graph.node(id);
            let expr = self.synthesize(id);
            let policy = match origin {
                Origin::Lifted => self.options.lifted_policy(),
                Origin::Root | Origin::Prelude => self.options.top_level_export_policy,
            };

            out.push(Declaration {
                name: self.named[&id].clone(),
                uri: Some(node.uri.clone()),
                expr,
                doc: self.declaration_doc(node),
                policy,
                origin,
            });
        }
        out
    }

    // Declarations which other declarations may reference by name.
    fn prelude(&self) -> Vec<Declaration> {
        if self.options.placeholder_any_representation != AnyRepresentation::OpenJsonValueUnion {
            return Vec::new();
        }
        let value = || TypeExpr::Reference {
            name: JSON_VALUE.to_string(),
        };
        let declare = |name: &str, expr| Declaration {
            name: name.to_string(),
            uri: None,
            expr,
            doc: None,
            policy: ExportPolicy::Internal,
            origin: Origin::Prelude,
        };

        vec![
            declare(
                JSON_PRIMITIVE,
                TypeExpr::union([
                    TypeExpr::Boolean,
                    TypeExpr::Null,
                    TypeExpr::Number,
                    TypeExpr::String,
                ]),
            ),
            declare(
                JSON_VALUE,
                TypeExpr::union([
                    TypeExpr::Reference {
                        name: JSON_PRIMITIVE.to_string(),
                    },
                    TypeExpr::Array {
                        of: Box::new(value()),
                    },
                    TypeExpr::Record(Record {
                        properties: Vec::new(),
                        indexes: vec![IndexSignature {
                            pattern: None,
                            value: value(),
                        }],
                    }),
                ]),
            ),
        ]
    }

    // Documentation of a declaration, which also names the schema's `$id`.
    fn declaration_doc(&self, node: &Node) -> Option<String> {
        let id = match node.schema().and_then(|s| s.id.as_ref()) {
            Some(id) if !self.options.omit_id_comments => id,
            _ => return doc_of(node),
        };
        match doc_of(node) {
            Some(doc) => Some(format!("{doc}\n\n@see {id}")),
            None => Some(format!("@see {id}")),
        }
    }

    /// The type expression of a schema which accepts any value.
    pub fn anything(&self) -> TypeExpr {
        match self.options.placeholder_any_representation {
            AnyRepresentation::MinimalTopType => TypeExpr::Unknown,
            AnyRepresentation::FullyOpen => TypeExpr::Any,
            AnyRepresentation::OpenJsonValueUnion => TypeExpr::Reference {
                name: JSON_VALUE.to_string(),
            },
        }
    }

    /// Synthesize the type expression of Node `id`.
    /// It's the intersection of the contribution of each keyword.
    pub fn synthesize(&mut self, id: NodeId) -> TypeExpr {
        let graph = self.graph;
        let node = graph.node(id);

        let schema = match &node.kind {
            NodeKind::Bool(true) => return self.anything(),
            NodeKind::Bool(false) => return TypeExpr::Never,
            NodeKind::Schema(schema) => schema,
        };
        let mut conjuncts = Vec::new();

        if let Some(r) = schema.r#ref {
            conjuncts.extend(self.reference(r));
        }
        if let Some(values) = &schema.r#enum {
            conjuncts.push(TypeExpr::union(values.iter().map(literal)));
        }
        if let Some(value) = &schema.r#const {
            conjuncts.push(literal(value));
        }
        // Exclusivity of `oneOf` isn't expressible as a type, and it's
        // typed the same as `anyOf`.
        for branches in [&schema.any_of, &schema.one_of] {
            if let Some(variants) = self.branches(node, branches) {
                conjuncts.push(TypeExpr::union(variants));
            }
        }
        if let Some(variants) = self.branches(node, &schema.all_of) {
            conjuncts.push(TypeExpr::intersection(variants, &self.anything()));
        }

        match schema.type_ {
            Some(type_) => {
                let mut disjunct = Vec::new();

                for name in type_.iter() {
                    disjunct.push(match name {
                        "array" => self.array_to_expr(node, schema),
                        "boolean" => TypeExpr::Boolean,
                        // Integers are not distinct from other numbers.
                        "integer" | "number" => TypeExpr::Number,
                        "null" => TypeExpr::Null,
                        "object" => self.object_to_expr(node, schema),
                        "string" => TypeExpr::String,
                        _ => continue,
                    });
                }
                conjuncts.push(TypeExpr::union(disjunct));
            }
            None if schema.is_array_inferable() => {
                conjuncts.push(self.array_to_expr(node, schema));
            }
            None => (),
        }

        TypeExpr::intersection(conjuncts, &self.anything())
    }

    // Contribution of a `$ref`. A reference to a missing resource contributes
    // nothing, while other dangling references accept any value.
    fn reference(&mut self, r: RefId) -> Option<TypeExpr> {
        let graph = self.graph;

        match &graph.reference(r).resolution {
            Some(Resolution::Node(target)) => Some(TypeExpr::Reference {
                name: self.name_for(*target),
            }),
            Some(Resolution::Dangling(dangling)) if dangling.is_missing_resource() => None,
            _ => Some(self.anything()),
        }
    }

    // Synthesize combinator branches which are emitted, or None if there are none.
    fn branches(&mut self, parent: &Node, branches: &[NodeId]) -> Option<Vec<TypeExpr>> {
        let emitted: Vec<NodeId> = branches
            .iter()
            .copied()
            .filter(|child| self.emits(*child, parent))
            .collect();
        let variants: Vec<_> = emitted
            .into_iter()
            .map(|child| self.synthesize(child))
            .collect();

        if variants.is_empty() {
            None
        } else {
            Some(variants)
        }
    }

    fn object_to_expr(&mut self, node: &Node, schema: &SchemaNode) -> TypeExpr {
        let mut properties = Vec::new();

        for (name, child) in &schema.properties {
            if !self.emits(*child, node) {
                continue;
            }
            properties.push(Property {
                name: name.clone(),
                value: self.synthesize(*child),
                required: schema.is_required(name),
                doc: doc_of(self.graph.node(*child)),
            });
        }

        let mut indexes = Vec::new();

        for (pattern, child) in &schema.pattern_properties {
            if !self.emits(*child, node) {
                continue;
            }
            indexes.push(IndexSignature {
                pattern: Some(pattern.clone()),
                value: self.synthesize(*child),
            });
        }

        match schema.additional_properties {
            // Omitted additionalProperties permit any other property.
            None => indexes.push(IndexSignature {
                pattern: None,
                value: self.anything(),
            }),
            // `false` permits no other properties.
            Some(child) if is_false(self.graph.node(child)) => (),
            Some(child) if self.emits(child, node) => indexes.push(IndexSignature {
                pattern: None,
                value: self.synthesize(child),
            }),
            Some(_) => (),
        }

        TypeExpr::Record(Record {
            properties,
            indexes,
        })
    }

    fn array_to_expr(&mut self, node: &Node, schema: &SchemaNode) -> TypeExpr {
        match &schema.items {
            None => TypeExpr::Array {
                of: Box::new(self.anything()),
            },
            Some(Items::Single(child)) => TypeExpr::Array {
                of: Box::new(self.item_to_expr(*child, node)),
            },
            Some(Items::Tuple(children)) => {
                let items = children
                    .iter()
                    .map(|child| self.item_to_expr(*child, node))
                    .collect();

                let rest = match schema.additional_items {
                    None => None,
                    Some(child) if is_false(self.graph.node(child)) => None,
                    Some(child) => Some(Box::new(self.item_to_expr(child, node))),
                };
                TypeExpr::Tuple(Tuple { items, rest })
            }
        }
    }

    // Item positions which aren't emitted accept any value.
    fn item_to_expr(&mut self, child: NodeId, parent: &Node) -> TypeExpr {
        if self.emits(child, parent) {
            self.synthesize(child)
        } else {
            self.anything()
        }
    }

    fn emits(&self, child: NodeId, parent: &Node) -> bool {
        match self.filter {
            Some(filter) => filter(self.graph.node(child), parent),
            None => true,
        }
    }
}

/// Type expression of a JSON literal. Arrays become tuples of literals,
/// and objects become closed records of required literal properties.
pub fn literal(value: &Value) -> TypeExpr {
    match value {
        Value::Array(items) => TypeExpr::Tuple(Tuple {
            items: items.iter().map(literal).collect(),
            rest: None,
        }),
        Value::Object(fields) => TypeExpr::Record(Record {
            properties: fields
                .iter()
                .map(|(name, value)| Property {
                    name: name.clone(),
                    value: literal(value),
                    required: true,
                    doc: None,
                })
                .collect(),
            indexes: Vec::new(),
        }),
        _ => TypeExpr::Literal {
            value: value.clone(),
        },
    }
}

/// Documentation of a Node, from its `title` and `description`.
pub fn doc_of(node: &Node) -> Option<String> {
    let schema = node.schema()?;

    match (&schema.title, &schema.description) {
        (Some(title), Some(description)) => Some(format!("{title}\n\n{description}")),
        (Some(s), None) | (None, Some(s)) => Some(s.clone()),
        (None, None) => None,
    }
}

fn is_false(node: &Node) -> bool {
    matches!(node.kind, NodeKind::Bool(false))
}
