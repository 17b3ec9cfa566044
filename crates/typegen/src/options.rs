use serde::{Deserialize, Serialize};

/// Options of a compilation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct CompileOptions {
    /// Representation of schemas which accept any value.
    pub placeholder_any_representation: AnyRepresentation,
    /// Omit `@see` tags which document the `$id` of a declaration's schema.
    pub omit_id_comments: bool,
    /// How declarations of input document roots are emitted.
    pub top_level_export_policy: ExportPolicy,
    /// How declarations lifted from `$ref` targets are emitted.
    /// Defaults to the policy of top-level declarations.
    pub lifted_export_policy: Option<ExportPolicy>,
}

impl CompileOptions {
    pub fn lifted_policy(&self) -> ExportPolicy {
        self.lifted_export_policy.unwrap_or(self.top_level_export_policy)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum AnyRepresentation {
    /// The top type, `unknown`.
    #[default]
    MinimalTopType,
    /// A shared `JSONValue` declaration: the union of null, boolean, number,
    /// string, arrays of `JSONValue` and objects of `JSONValue` properties.
    OpenJsonValueUnion,
    /// A fully-open type, `any`, which may be used as any other type.
    FullyOpen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum ExportPolicy {
    /// `export type Name = ...`
    #[default]
    Export,
    /// `declare type Name = ...`, an ambient declaration.
    Declare,
    /// `type Name = ...`
    Internal,
}

impl ExportPolicy {
    /// Keyword which prefixes `type` in a declaration of this policy.
    pub fn keyword(&self) -> Option<&'static str> {
        match self {
            ExportPolicy::Export => Some("export"),
            ExportPolicy::Declare => Some("declare"),
            ExportPolicy::Internal => None,
        }
    }
}
