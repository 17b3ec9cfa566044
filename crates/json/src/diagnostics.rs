use std::fmt;

/// Code classifies a Diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Code {
    /// A `$ref` whose target could not be found among registered schemas.
    Unresolved,
    /// Two different schema bodies were registered under the same URI.
    SchemaConflict,
    /// `$ref` or `$id` text which isn't a resolvable URI reference.
    InvalidRef,
    /// A schema, or a keyword of a schema, having an unexpected JSON type.
    InvalidSchema,
}

impl Code {
    pub fn as_str(&self) -> &'static str {
        match self {
            Code::Unresolved => "EUNRESOLVED",
            Code::SchemaConflict => "ESCHEMACONFLICT",
            Code::InvalidRef => "EINVALIDREF",
            Code::InvalidSchema => "EINVALIDSCHEMA",
        }
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl serde::Serialize for Code {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
pub enum Severity {
    Error,
    Warn,
}

/// Diagnostic describes a problem encountered while building or typing
/// a set of schemas. Errors mean the output is not faithful to the input.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Diagnostic {
    pub code: Code,
    pub severity: Severity,
    pub message: String,
    pub uri: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at '{}': {}", self.code, self.uri, self.message)
    }
}

/// Diagnostics is an append-only sink of Diagnostic.
#[derive(Debug, Default)]
pub struct Diagnostics(Vec<Diagnostic>);

impl Diagnostics {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn error(&mut self, code: Code, uri: impl fmt::Display, message: impl fmt::Display) {
        self.push(code, Severity::Error, uri, message)
    }

    fn push(
        &mut self,
        code: Code,
        severity: Severity,
        uri: impl fmt::Display,
        message: impl fmt::Display,
    ) {
        let diagnostic = Diagnostic {
            code,
            severity,
            message: message.to_string(),
            uri: uri.to_string(),
        };
        tracing::debug!(%diagnostic, "recorded diagnostic");
        self.0.push(diagnostic);
    }

    pub fn has_errors(&self) -> bool {
        self.0.iter().any(|d| d.severity == Severity::Error)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.0
    }
}
