// Keywords of JSON Schema draft-07 which are understood by the builder.

// Core.
pub const ID: &str = "$id";
pub const REF: &str = "$ref";
pub const SCHEMA: &str = "$schema";
pub const COMMENT: &str = "$comment";
pub const DEFINITIONS: &str = "definitions";

// Applicators.
pub const ALL_OF: &str = "allOf";
pub const ANY_OF: &str = "anyOf";
pub const ONE_OF: &str = "oneOf";
pub const NOT: &str = "not";
pub const IF: &str = "if";
pub const THEN: &str = "then";
pub const ELSE: &str = "else";
pub const ITEMS: &str = "items";
pub const ADDITIONAL_ITEMS: &str = "additionalItems";
pub const CONTAINS: &str = "contains";
pub const PROPERTIES: &str = "properties";
pub const PATTERN_PROPERTIES: &str = "patternProperties";
pub const ADDITIONAL_PROPERTIES: &str = "additionalProperties";
pub const PROPERTY_NAMES: &str = "propertyNames";
pub const DEPENDENCIES: &str = "dependencies";

// Validations.
pub const TYPE: &str = "type";
pub const ENUM: &str = "enum";
pub const CONST: &str = "const";
pub const MULTIPLE_OF: &str = "multipleOf";
pub const MAXIMUM: &str = "maximum";
pub const EXCLUSIVE_MAXIMUM: &str = "exclusiveMaximum";
pub const MINIMUM: &str = "minimum";
pub const EXCLUSIVE_MINIMUM: &str = "exclusiveMinimum";
pub const MAX_LENGTH: &str = "maxLength";
pub const MIN_LENGTH: &str = "minLength";
pub const PATTERN: &str = "pattern";
pub const MAX_ITEMS: &str = "maxItems";
pub const MIN_ITEMS: &str = "minItems";
pub const UNIQUE_ITEMS: &str = "uniqueItems";
pub const MAX_PROPERTIES: &str = "maxProperties";
pub const MIN_PROPERTIES: &str = "minProperties";
pub const REQUIRED: &str = "required";

// Annotations.
pub const TITLE: &str = "title";
pub const DESCRIPTION: &str = "description";
pub const DEFAULT: &str = "default";
pub const EXAMPLES: &str = "examples";
pub const READ_ONLY: &str = "readOnly";
pub const WRITE_ONLY: &str = "writeOnly";
pub const FORMAT: &str = "format";
pub const CONTENT_ENCODING: &str = "contentEncoding";
pub const CONTENT_MEDIA_TYPE: &str = "contentMediaType";

/// Keywords which, when present without a `type`, mark a schema
/// as describing an array.
pub const ARRAY_INFERENCE: &[&str] = &[ITEMS, MIN_ITEMS, MAX_ITEMS, UNIQUE_ITEMS, CONTAINS];
