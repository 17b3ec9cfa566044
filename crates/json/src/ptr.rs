use serde_json::Value;
use std::str::FromStr;

/// Token is a parsed, unescaped segment of a JSON pointer.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd)]
pub enum Token {
    /// Integer index of a JSON array.
    /// If applied to a JSON object, the index may also serve as a property name.
    Index(usize),
    /// JSON object property name without escaping. Never an integer.
    Property(String),
}

impl Token {
    pub fn from_str(s: &str) -> Self {
        if s.starts_with('+') || (s.starts_with('0') && s.len() > 1) {
            Token::Property(s.to_string())
        } else if let Ok(ind) = usize::from_str(s) {
            Token::Index(ind)
        } else {
            Token::Property(s.to_string())
        }
    }

    /// Query the child of `value` which this token addresses, if it exists.
    pub fn query<'v>(&self, value: &'v Value) -> Option<&'v Value> {
        match value {
            Value::Object(fields) => match self {
                Token::Index(ind) => fields.get(&ind.to_string()),
                Token::Property(property) => fields.get(property),
            },
            Value::Array(arr) => match self {
                Token::Index(ind) => arr.get(*ind),
                Token::Property(_) => None,
            },
            _ => None,
        }
    }
}
