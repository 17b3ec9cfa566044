use super::{
    keywords, types, Dependency, Graph, Items, NodeId, NodeKind, RefId, Reference, SchemaNode,
};
use crate::diagnostics::Code;
use crate::uri;
use serde_json as sj;
use url::Url;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("expected a boolean")]
    ExpectedBool,
    #[error("expected a string")]
    ExpectedString,
    #[error("expected an object")]
    ExpectedObject,
    #[error("expected an array")]
    ExpectedArray,
    #[error("expected a schema")]
    ExpectedSchema,
    #[error("expected a schema or array of schemas")]
    ExpectedSchemaOrArrayOfSchemas,
    #[error("expected a schema or array of property names")]
    ExpectedSchemaOrArrayOfStrings,
    #[error("expected a type or array of types")]
    ExpectedType,
    #[error("expected an unsigned integer")]
    ExpectedUnsigned,
    #[error("expected a number")]
    ExpectedNumber,
    #[error("expected an array of strings")]
    ExpectedStringArray,
    #[error(transparent)]
    Uri(#[from] uri::Error),

    #[error("at keyword '{keyword}': {detail}")]
    AtKeyword {
        #[source]
        detail: Box<Error>,
        keyword: String,
    },
}
use Error::*;

impl Error {
    /// Code of the Diagnostic which reports this Error.
    pub fn code(&self) -> Code {
        match self {
            Uri(_) => Code::InvalidRef,
            AtKeyword { detail, .. } => detail.code(),
            _ => Code::InvalidSchema,
        }
    }
}

/// Scope is the location at which a schema is built.
#[derive(Debug, Clone, PartialEq)]
pub struct Scope {
    /// Structural URI of the schema.
    pub uri: Url,
    /// Base URI in effect at the schema.
    pub base: Url,
    /// URI of the schema relative to its nearest base: `<base>#<pointer>`.
    pub alias: Url,
}

impl Scope {
    /// Scope of a document root, which is its own base.
    /// A fragment of `uri` is ignored.
    pub fn root(uri: &Url) -> Scope {
        let uri = uri::without_fragment(uri);
        Scope {
            uri: uri.clone(),
            base: uri.clone(),
            alias: uri,
        }
    }

    /// Scope of a child schema at `segment` of this Scope.
    pub fn push(&self, segment: &str) -> Scope {
        Scope {
            uri: uri::append_pointer_segment(&self.uri, segment),
            base: self.base.clone(),
            alias: uri::append_pointer_segment(&self.alias, segment),
        }
    }
}

/// Build schema `v` located at `scope` into `graph`, along with every
/// subschema it holds. If a Node is already registered at the scope's URI,
/// it's returned instead. Problems of the schema are reported to the
/// diagnostics of `graph` and never abort the build.
pub fn build_schema(graph: &mut Graph, scope: Scope, v: &sj::Value) -> NodeId {
    if let Some(id) = graph.fetch(scope.uri.as_str()) {
        return id;
    }
    // The same location reached through a different path.
    if let Some(id) = graph.fetch(scope.alias.as_str()) {
        graph.register(&scope.uri, id);
        return id;
    }

    match v {
        sj::Value::Object(obj) => build_object(graph, scope, obj, v),
        sj::Value::Bool(b) => build_bool(graph, scope, *b),
        _ => {
            graph
                .diagnostics
                .error(ExpectedSchema.code(), &scope.uri, ExpectedSchema);
            build_bool(graph, scope, true)
        }
    }
}

fn build_bool(graph: &mut Graph, scope: Scope, b: bool) -> NodeId {
    let id = graph.reserve(&scope.uri, &scope.base);
    graph.register(&scope.uri, id);
    graph.register(&scope.alias, id);
    graph.set_kind(id, NodeKind::Bool(b));

    tracing::trace!(uri = %scope.uri, ?id, b, "built boolean schema");
    id
}

fn build_object(
    graph: &mut Graph,
    scope: Scope,
    obj: &sj::Map<String, sj::Value>,
    v: &sj::Value,
) -> NodeId {
    let Scope {
        uri,
        mut base,
        mut alias,
    } = scope;

    let mut id_uri = None;
    let mut anchor = None;

    // A sibling $ref makes $id inert.
    match obj.get(keywords::ID) {
        _ if obj.contains_key(keywords::REF) => (),
        None => (),
        Some(sj::Value::String(id)) => match uri::resolve(&base, id) {
            Ok(resolved) => {
                let resource = uri::without_fragment(&resolved);

                if !uri::has_pointer_fragment(&resolved) {
                    anchor = Some(resolved.clone());
                }
                if resource != base {
                    if !graph.add_resource(&resource, v) {
                        graph.diagnostics.error(
                            Code::SchemaConflict,
                            &resource,
                            format!(
                                "a different schema is already registered with $id '{resource}'"
                            ),
                        );
                    }
                    base = resource.clone();
                    alias = resource;

                    // An equal resource which is already built.
                    if let Some(existing) = graph.fetch(alias.as_str()) {
                        graph.register(&uri, existing);
                        return existing;
                    }
                }
                id_uri = Some(resolved);
            }
            Err(err) => {
                let err = at_keyword(keywords::ID, err.into());
                graph.diagnostics.error(err.code(), &uri, err);
            }
        },
        Some(_) => {
            let err = at_keyword(keywords::ID, ExpectedString);
            graph.diagnostics.error(err.code(), &uri, err);
        }
    }

    let id = graph.reserve(&uri, &base);
    graph.register(&uri, id);
    graph.register(&alias, id);
    if let Some(anchor) = &anchor {
        graph.register(anchor, id);
    }
    tracing::trace!(%uri, %base, ?id, "building schema");

    let mut builder = Builder {
        graph: &mut *graph,
        scope: Scope { uri, base, alias },
        node: SchemaNode {
            id: id_uri,
            ..Default::default()
        },
    };

    for (keyword, value) in obj {
        if let Err(err) = builder.process_keyword(keyword, value) {
            let err = at_keyword(keyword, err);
            builder
                .graph
                .diagnostics
                .error(err.code(), &builder.scope.uri, err);
        }
    }
    let node = builder.node;

    graph.set_kind(id, NodeKind::Schema(Box::new(node)));
    id
}

fn at_keyword(keyword: &str, detail: Error) -> Error {
    AtKeyword {
        detail: Box::new(detail),
        keyword: keyword.to_string(),
    }
}

struct Builder<'g> {
    graph: &'g mut Graph,
    scope: Scope,
    node: SchemaNode,
}

impl<'g> Builder<'g> {
    fn process_keyword(&mut self, keyword: &str, v: &sj::Value) -> Result<(), Error> {
        use keywords as kw;

        match keyword {
            // Core keywords.
            kw::ID => (), // Already handled.
            kw::SCHEMA => self.node.schema = Some(string(v)?),
            kw::COMMENT => self.node.comment = Some(string(v)?),
            kw::REF => {
                let text = string(v)?;
                self.node.r#ref = Some(self.add_reference(text));
            }
            kw::DEFINITIONS => self.node.definitions = self.schema_map(keyword, v)?,

            // Annotation keywords.
            kw::TITLE => self.node.title = Some(string(v)?),
            kw::DESCRIPTION => self.node.description = Some(string(v)?),
            kw::DEFAULT => self.node.default = Some(v.clone()),
            kw::EXAMPLES => self.node.examples = array(v)?.clone(),
            kw::READ_ONLY => self.node.read_only = Some(boolean(v)?),
            kw::WRITE_ONLY => self.node.write_only = Some(boolean(v)?),
            kw::FORMAT => self.node.format = Some(string(v)?),
            kw::CONTENT_ENCODING => self.node.content_encoding = Some(string(v)?),
            kw::CONTENT_MEDIA_TYPE => self.node.content_media_type = Some(string(v)?),

            // Keywords of any instance type.
            kw::TYPE => self.node.type_ = Some(types::Set::for_keyword(v).ok_or(ExpectedType)?),
            kw::ENUM => self.node.r#enum = Some(array(v)?.clone()),
            kw::CONST => self.node.r#const = Some(v.clone()),
            kw::ALL_OF => self.node.all_of = self.schema_array(keyword, v)?,
            kw::ANY_OF => self.node.any_of = self.schema_array(keyword, v)?,
            kw::ONE_OF => self.node.one_of = self.schema_array(keyword, v)?,
            kw::NOT => self.node.not = Some(self.child(&[keyword], v)?),
            kw::IF => self.node.r#if = Some(self.child(&[keyword], v)?),
            kw::THEN => self.node.then = Some(self.child(&[keyword], v)?),
            kw::ELSE => self.node.r#else = Some(self.child(&[keyword], v)?),

            // Number keywords.
            kw::MULTIPLE_OF => self.node.multiple_of = Some(number(v)?),
            kw::MAXIMUM => self.node.maximum = Some(number(v)?),
            kw::EXCLUSIVE_MAXIMUM => self.node.exclusive_maximum = Some(number(v)?),
            kw::MINIMUM => self.node.minimum = Some(number(v)?),
            kw::EXCLUSIVE_MINIMUM => self.node.exclusive_minimum = Some(number(v)?),

            // String keywords.
            kw::MAX_LENGTH => self.node.max_length = Some(unsigned(v)?),
            kw::MIN_LENGTH => self.node.min_length = Some(unsigned(v)?),
            kw::PATTERN => self.node.pattern = Some(string(v)?),

            // Array keywords.
            kw::ITEMS => {
                self.node.items = Some(match v {
                    sj::Value::Array(arr) => {
                        let mut items = Vec::with_capacity(arr.len());
                        for (index, item) in arr.iter().enumerate() {
                            let index = index.to_string();
                            items.push(
                                self.child(&[keyword, &index], item)
                                    .map_err(|_| ExpectedSchemaOrArrayOfSchemas)?,
                            );
                        }
                        Items::Tuple(items)
                    }
                    _ => Items::Single(
                        self.child(&[keyword], v)
                            .map_err(|_| ExpectedSchemaOrArrayOfSchemas)?,
                    ),
                })
            }
            kw::ADDITIONAL_ITEMS => self.node.additional_items = Some(self.child(&[keyword], v)?),
            kw::MAX_ITEMS => self.node.max_items = Some(unsigned(v)?),
            kw::MIN_ITEMS => self.node.min_items = Some(unsigned(v)?),
            kw::UNIQUE_ITEMS => self.node.unique_items = Some(boolean(v)?),
            kw::CONTAINS => self.node.contains = Some(self.child(&[keyword], v)?),

            // Object keywords.
            kw::PROPERTIES => self.node.properties = self.schema_map(keyword, v)?,
            kw::PATTERN_PROPERTIES => self.node.pattern_properties = self.schema_map(keyword, v)?,
            kw::ADDITIONAL_PROPERTIES => {
                self.node.additional_properties = Some(self.child(&[keyword], v)?)
            }
            kw::PROPERTY_NAMES => self.node.property_names = Some(self.child(&[keyword], v)?),
            kw::REQUIRED => self.node.required = string_array(v)?,
            kw::MAX_PROPERTIES => self.node.max_properties = Some(unsigned(v)?),
            kw::MIN_PROPERTIES => self.node.min_properties = Some(unsigned(v)?),
            kw::DEPENDENCIES => {
                let mut dependencies = Vec::new();
                for (property, dependency) in object(v)? {
                    let dependency = match dependency {
                        sj::Value::Array(_) => Dependency::Required(
                            string_array(dependency).map_err(|_| ExpectedSchemaOrArrayOfStrings)?,
                        ),
                        _ => Dependency::Schema(
                            self.child(&[keyword, property], dependency)
                                .map_err(|_| ExpectedSchemaOrArrayOfStrings)?,
                        ),
                    };
                    dependencies.push((property.clone(), dependency));
                }
                self.node.dependencies = dependencies;
            }

            // Other keywords are permitted, and carry no meaning.
            _ => (),
        }
        Ok(())
    }

    // Build the child schema `v` found at `segments` below this schema.
    fn child(&mut self, segments: &[&str], v: &sj::Value) -> Result<NodeId, Error> {
        if !matches!(v, sj::Value::Object(_) | sj::Value::Bool(_)) {
            return Err(ExpectedSchema);
        }
        let scope = segments
            .iter()
            .fold(self.scope.clone(), |scope, segment| scope.push(segment));

        Ok(build_schema(self.graph, scope, v))
    }

    fn schema_array(&mut self, keyword: &str, v: &sj::Value) -> Result<Vec<NodeId>, Error> {
        let mut out = Vec::new();
        for (index, child) in array(v)?.iter().enumerate() {
            out.push(self.child(&[keyword, &index.to_string()], child)?);
        }
        Ok(out)
    }

    fn schema_map(
        &mut self,
        keyword: &str,
        v: &sj::Value,
    ) -> Result<Vec<(String, NodeId)>, Error> {
        let mut out = Vec::new();
        for (property, child) in object(v)? {
            out.push((property.clone(), self.child(&[keyword, property], child)?));
        }
        Ok(out)
    }

    fn add_reference(&mut self, text: String) -> RefId {
        let to_uri = match uri::resolve(&self.scope.base, &text) {
            Ok(to_uri) => Some(to_uri),
            Err(err) => {
                let err = at_keyword(keywords::REF, err.into());
                self.graph
                    .diagnostics
                    .error(err.code(), &self.scope.uri, err);
                None
            }
        };
        let to_base_uri = to_uri.as_ref().map(uri::without_fragment);

        tracing::trace!(
            from = %self.scope.uri,
            %text,
            to = ?to_uri.as_ref().map(Url::as_str),
            "recorded reference"
        );

        self.graph.ledger.push(Reference {
            text,
            from_uri: self.scope.uri.clone(),
            from_base_uri: self.scope.base.clone(),
            to_uri,
            to_base_uri,
            resolution: None,
        })
    }
}

fn string(v: &sj::Value) -> Result<String, Error> {
    v.as_str().map(str::to_string).ok_or(ExpectedString)
}

fn boolean(v: &sj::Value) -> Result<bool, Error> {
    v.as_bool().ok_or(ExpectedBool)
}

fn array(v: &sj::Value) -> Result<&Vec<sj::Value>, Error> {
    v.as_array().ok_or(ExpectedArray)
}

fn object(v: &sj::Value) -> Result<&sj::Map<String, sj::Value>, Error> {
    v.as_object().ok_or(ExpectedObject)
}

fn number(v: &sj::Value) -> Result<sj::Number, Error> {
    match v {
        sj::Value::Number(n) => Ok(n.clone()),
        _ => Err(ExpectedNumber),
    }
}

// Draft-07 permits integral floats (`2.0`) wherever a non-negative integer is expected.
fn unsigned(v: &sj::Value) -> Result<u64, Error> {
    match (v.as_u64(), v.as_f64()) {
        (Some(u), _) => Ok(u),
        (None, Some(f)) if f >= 0.0 && f.fract() == 0.0 && f <= u64::MAX as f64 => Ok(f as u64),
        _ => Err(ExpectedUnsigned),
    }
}

fn string_array(v: &sj::Value) -> Result<Vec<String>, Error> {
    array(v)
        .map_err(|_| ExpectedStringArray)?
        .iter()
        .map(|s| s.as_str().map(str::to_string).ok_or(ExpectedStringArray))
        .collect()
}
