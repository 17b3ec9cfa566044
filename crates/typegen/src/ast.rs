use serde_json::Value;

/// TypeExpr is an abstract type expression, to be printed by a code printer
/// into concrete syntax. Named references are already resolved to the names
/// of other declarations.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeExpr {
    /// Fully-open type which accepts and permits anything.
    Any,
    /// Top type which accepts any value.
    Unknown,
    /// Bottom type having no values.
    Never,
    Boolean,
    Null,
    Number,
    String,
    /// A scalar JSON literal.
    Literal { value: Value },
    /// The named declaration of another schema.
    Reference { name: String },
    Array { of: Box<TypeExpr> },
    Tuple(Tuple),
    Record(Record),
    Union { variants: Vec<TypeExpr> },
    Intersection { variants: Vec<TypeExpr> },
}

/// Tuple has fixed positional items, optionally followed by
/// zero or more items of a `rest` type.
#[derive(Debug, Clone, PartialEq)]
pub struct Tuple {
    pub items: Vec<TypeExpr>,
    pub rest: Option<Box<TypeExpr>>,
}

/// Record is a structural object type. A Record without properties
/// or index signatures accepts only the empty object, and renders as an
/// index signature of `never`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    pub properties: Vec<Property>,
    pub indexes: Vec<IndexSignature>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub name: String,
    pub value: TypeExpr,
    pub required: bool,
    pub doc: Option<String>,
}

/// IndexSignature types the values of properties not otherwise named.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexSignature {
    /// Pattern which keys of the signature match, or None for all keys.
    /// It's documentation only, and doesn't alter the type.
    pub pattern: Option<String>,
    pub value: TypeExpr,
}

impl TypeExpr {
    /// Build the union of `variants`. Nested unions are flattened and
    /// repeated variants removed. A union of a single variant is that
    /// variant, and a union of none is `Never`.
    pub fn union<I>(variants: I) -> TypeExpr
    where
        I: IntoIterator<Item = TypeExpr>,
    {
        let mut out = Vec::new();
        for variant in variants {
            match variant {
                TypeExpr::Union { variants } => extend_unique(&mut out, variants),
                variant => extend_unique(&mut out, [variant]),
            }
        }
        // `never` is the identity of a union.
        if out.len() > 1 {
            out.retain(|v| v != &TypeExpr::Never);
        }

        match out.len() {
            0 => TypeExpr::Never,
            1 => out.pop().unwrap_or(TypeExpr::Never),
            _ => TypeExpr::Union { variants: out },
        }
    }

    /// Build the intersection of `variants`. Nested intersections are
    /// flattened and repeated variants removed. Top types, including `top`,
    /// are dropped when any other variant is present, and otherwise only the
    /// first is kept. An intersection of none is `top`.
    pub fn intersection<I>(variants: I, top: &TypeExpr) -> TypeExpr
    where
        I: IntoIterator<Item = TypeExpr>,
    {
        let mut out = Vec::new();
        for variant in variants {
            match variant {
                TypeExpr::Intersection { variants } => extend_unique(&mut out, variants),
                variant => extend_unique(&mut out, [variant]),
            }
        }
        let is_top = |v: &TypeExpr| matches!(v, TypeExpr::Any | TypeExpr::Unknown) || v == top;

        if out.iter().any(|v| !is_top(v)) {
            out.retain(|v| !is_top(v));
        } else {
            out.truncate(1);
        }

        match out.len() {
            0 => top.clone(),
            1 => out.pop().unwrap_or_else(|| top.clone()),
            _ => TypeExpr::Intersection { variants: out },
        }
    }
}

fn extend_unique<I>(out: &mut Vec<TypeExpr>, variants: I)
where
    I: IntoIterator<Item = TypeExpr>,
{
    for variant in variants {
        if !out.contains(&variant) {
            out.push(variant);
        }
    }
}

pub struct Context<'a> {
    pub into: &'a mut String,
    pub indent: usize,
}

impl<'a> Context<'a> {
    pub fn new(into: &'a mut String) -> Self {
        Self { into, indent: 0 }
    }
}

impl TypeExpr {
    /// Render the expression as TypeScript-flavored text.
    pub fn render(&self, ctx: &mut Context) {
        match self {
            TypeExpr::Any => ctx.into.push_str("any"),
            TypeExpr::Unknown => ctx.into.push_str("unknown"),
            TypeExpr::Never => ctx.into.push_str("never"),
            TypeExpr::Boolean => ctx.into.push_str("boolean"),
            TypeExpr::Null => ctx.into.push_str("null"),
            TypeExpr::Number => ctx.into.push_str("number"),
            TypeExpr::String => ctx.into.push_str("string"),
            TypeExpr::Literal { value } => ctx.into.push_str(&value.to_string()),
            TypeExpr::Reference { name } => ctx.into.push_str(name),
            TypeExpr::Array { of } => {
                Self::render_grouped(ctx, of);
                ctx.into.push_str("[]");
            }
            TypeExpr::Tuple(tuple) => Self::render_tuple(ctx, tuple),
            TypeExpr::Record(record) => Self::render_record(ctx, record),
            TypeExpr::Union { variants } => Self::render_joined(ctx, variants, " | "),
            TypeExpr::Intersection { variants } => {
                for (ind, variant) in variants.iter().enumerate() {
                    if ind != 0 {
                        ctx.into.push_str(" & ");
                    }
                    Self::render_grouped(ctx, variant);
                }
            }
        }
    }

    // Render `expr`, wrapped in parentheses if it's a union or intersection.
    fn render_grouped(ctx: &mut Context, expr: &TypeExpr) {
        if let TypeExpr::Union { .. } | TypeExpr::Intersection { .. } = expr {
            ctx.into.push('(');
            expr.render(ctx);
            ctx.into.push(')');
        } else {
            expr.render(ctx);
        }
    }

    fn render_joined(ctx: &mut Context, variants: &[TypeExpr], sep: &str) {
        for (ind, variant) in variants.iter().enumerate() {
            if ind != 0 {
                ctx.into.push_str(sep);
            }
            variant.render(ctx);
        }
    }

    fn render_tuple(ctx: &mut Context, tuple: &Tuple) {
        ctx.into.push('[');
        Self::render_joined(ctx, &tuple.items, ", ");

        // Tack on rest items, if present.
        if let Some(rest) = &tuple.rest {
            if !tuple.items.is_empty() {
                ctx.into.push_str(", ");
            }
            ctx.into.push_str("...");
            Self::render_grouped(ctx, rest);
            ctx.into.push_str("[]");
        }
        ctx.into.push(']');
    }

    fn render_record(ctx: &mut Context, record: &Record) {
        // `{}` would accept any non-nullish value.
        if record.properties.is_empty() && record.indexes.is_empty() {
            ctx.into.push_str("{ [k: string]: never }");
            return;
        }
        ctx.into.push('{');
        ctx.indent += 1;

        for prop in record.properties.iter() {
            if let Some(doc) = &prop.doc {
                Self::push_newline(ctx);
                render_doc(ctx, doc);
            }
            Self::push_newline(ctx);
            ctx.into.push_str(&property_name(&prop.name));
            if !prop.required {
                ctx.into.push('?');
            }
            ctx.into.push_str(": ");
            prop.value.render(ctx);
            ctx.into.push(';');
        }
        for index in record.indexes.iter() {
            Self::push_newline(ctx);
            ctx.into.push_str("[k: string]: ");
            index.value.render(ctx);
            ctx.into.push(';');

            if let Some(pattern) = &index.pattern {
                ctx.into.push_str(" // ");
                ctx.into.push_str(pattern);
            }
        }

        ctx.indent -= 1;
        Self::push_newline(ctx);
        ctx.into.push('}');
    }

    fn push_newline(ctx: &mut Context) {
        ctx.into.push('\n');
        ctx.into.extend(std::iter::repeat(' ').take(ctx.indent * 4));
    }
}

/// Render `doc` as a block comment at the current indentation,
/// leaving the context positioned at the end of the comment.
pub fn render_doc(ctx: &mut Context, doc: &str) {
    ctx.into.push_str("/**");
    for line in doc.lines() {
        TypeExpr::push_newline(ctx);
        ctx.into.push_str(" *");
        if !line.is_empty() {
            ctx.into.push(' ');
            ctx.into.push_str(&line.replace("*/", "*\\/"));
        }
    }
    TypeExpr::push_newline(ctx);
    ctx.into.push_str(" */");
}

fn property_name(name: &str) -> String {
    if TS_VARIABLE_RE.is_match(name) {
        name.to_string()
    } else {
        // Use JSON encoding to escape and quote the property.
        serde_json::Value::String(name.to_string()).to_string()
    }
}

lazy_static::lazy_static! {
    // The set of allowed characters in a bare TypeScript property name.
    static ref TS_VARIABLE_RE: regex::Regex = regex::Regex::new(r"^[\pL_$][\pL\pN_$]*$").unwrap();
}
