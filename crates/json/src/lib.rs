pub mod diagnostics;
pub mod ptr;
pub mod schema;
pub mod uri;

pub use diagnostics::{Code, Diagnostic, Diagnostics, Severity};
pub use ptr::Token;
