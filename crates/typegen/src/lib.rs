//! Compile JSON Schema (draft-07) documents into type declarations.
//!
//! ```
//! use serde_json::json;
//! use typegen::{CompileOptions, Compiler};
//!
//! let mut compiler = Compiler::new(CompileOptions::default());
//! let name = compiler.add_schema(
//!     url::Url::parse("http://example.com/person.json").unwrap(),
//!     &json!({
//!         "type": "object",
//!         "properties": {"name": {"type": "string"}},
//!         "required": ["name"],
//!         "additionalProperties": false,
//!     }),
//! );
//! assert_eq!(name, "Person");
//!
//! let output = compiler.compile();
//! assert!(!output.has_errors());
//! assert_eq!(
//!     output.render(),
//!     "export type Person = {\n    name: string;\n};\n"
//! );
//! ```

use itertools::Itertools;
use json::schema::{Graph, Node};
use json::Diagnostic;
use url::Url;

pub mod ast;
pub mod mapper;
pub mod names;
pub mod options;

pub use ast::TypeExpr;
pub use options::{AnyRepresentation, CompileOptions, ExportPolicy};

use ast::Context;
use mapper::Synthesizer;
use names::Allocator;

/// EmissionFilter decides whether a child schema (the first argument) of a
/// parent schema (the second) is emitted into the parent's type.
pub type EmissionFilter = dyn Fn(&Node, &Node) -> bool;

/// Origin of a Declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// A supporting declaration of the compilation, such as `JSONValue`.
    Prelude,
    /// The root of an input document.
    Root,
    /// A schema which was the target of a `$ref`.
    Lifted,
}

/// Declaration is a named type of the compilation output.
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub name: String,
    /// URI of the schema from which the declaration was synthesized.
    /// Prelude declarations have none.
    pub uri: Option<Url>,
    pub expr: TypeExpr,
    /// Documentation from the schema's `title`, `description` and `$id`.
    pub doc: Option<String>,
    pub policy: ExportPolicy,
    pub origin: Origin,
}

impl Declaration {
    /// Render the declaration as TypeScript-flavored text.
    pub fn render(&self, ctx: &mut Context) {
        if let Some(doc) = &self.doc {
            ast::render_doc(ctx, doc);
            ctx.into.push('\n');
        }
        if let Some(keyword) = self.policy.keyword() {
            ctx.into.push_str(keyword);
            ctx.into.push(' ');
        }
        ctx.into.push_str("type ");
        ctx.into.push_str(&self.name);
        ctx.into.push_str(" = ");
        self.expr.render(ctx);
        ctx.into.push_str(";\n");
    }
}

/// Output of a compilation.
#[derive(Debug)]
pub struct Output {
    /// Declarations in discovery order: prelude declarations, then input
    /// roots in the order they were added, followed by lifted schemas in
    /// the order first referenced.
    pub declarations: Vec<Declaration>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Output {
    /// Returns true if any diagnostic is an error, meaning the
    /// declarations are not faithful to their schemas.
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == json::Severity::Error)
    }

    /// Render all declarations, separated by blank lines.
    pub fn render(&self) -> String {
        self.declarations
            .iter()
            .map(|declaration| {
                let mut w = String::new();
                declaration.render(&mut Context::new(&mut w));
                w
            })
            .join("\n")
    }
}

/// Compiler compiles a set of schema documents into declarations.
/// All documents are added before compilation, so that references between
/// them may be in any order.
pub struct Compiler {
    options: CompileOptions,
    filter: Option<Box<EmissionFilter>>,
    graph: Graph,
    names: Allocator,
    roots: Vec<(json::schema::NodeId, String)>,
}

impl Compiler {
    pub fn new(options: CompileOptions) -> Self {
        let mut names = Allocator::new();

        // Prelude declarations get first pick of names.
        if options.placeholder_any_representation == AnyRepresentation::OpenJsonValueUnion {
            for name in [mapper::JSON_PRIMITIVE, mapper::JSON_VALUE] {
                names.allocate_unique(name.to_string());
            }
        }

        Self {
            options,
            filter: None,
            graph: Graph::new(),
            names,
            roots: Vec::new(),
        }
    }

    /// Install a filter deciding whether each child schema is emitted
    /// into the type of its parent. Properties and index signatures which
    /// aren't emitted are dropped, as are combinator branches, while
    /// items which aren't emitted accept any value.
    pub fn with_emission_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&Node, &Node) -> bool + 'static,
    {
        self.filter = Some(Box::new(filter));
        self
    }

    /// Add schema document `doc` located at `uri`, and return the name
    /// of its declaration. Adding the same document twice returns the
    /// same name.
    pub fn add_schema(&mut self, uri: Url, doc: &serde_json::Value) -> String {
        self.add(uri, doc, None)
    }

    /// Add schema document `doc` located at `uri`, preferring `preferred`
    /// over other naming rules for its declaration. The allocated name,
    /// which differs if `preferred` is already used, is returned.
    pub fn add_schema_with_name(
        &mut self,
        uri: Url,
        doc: &serde_json::Value,
        preferred: &str,
    ) -> String {
        self.add(uri, doc, Some(preferred))
    }

    fn add(&mut self, uri: Url, doc: &serde_json::Value, preferred: Option<&str>) -> String {
        let id = self.graph.add_document(&uri, doc);

        if let Some((_, name)) = self.roots.iter().find(|(root, _)| *root == id) {
            return name.clone();
        }
        let name = self.names.allocate(self.graph.node(id), preferred);
        tracing::debug!(%uri, %name, "added schema");

        self.roots.push((id, name.clone()));
        name
    }

    /// Compile all added documents. References are resolved across all
    /// documents, and then declarations are synthesized for each document
    /// root and for every schema they reference.
    pub fn compile(self) -> Output {
        let Compiler {
            options,
            filter,
            mut graph,
            names,
            roots,
        } = self;

        graph.resolve_references();

        let mut synthesizer = Synthesizer::new(&graph, &options, filter.as_deref(), names);
        for (id, name) in roots {
            synthesizer.declare_root(id, name);
        }
        let declarations = synthesizer.into_declarations();

        tracing::debug!(
            declarations = declarations.len(),
            diagnostics = graph.diagnostics().len(),
            "compiled schemas"
        );

        Output {
            declarations,
            diagnostics: graph.take_diagnostics().into_vec(),
        }
    }
}
