//! Content-stream token model.

use crate::object::Object;

/// One token of a page content stream, in postfix order: operands are pushed
/// as encountered, an operator consumes the operands before it.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentToken {
    /// An operand: any scalar or composite object that can appear inline in
    /// a content stream (numbers, names, strings, arrays, dictionaries).
    Operand(Object),
    /// An operator word, e.g. `cm`, `q`, `Do`, `BDC`.
    Operator(String),
}

impl ContentToken {
    /// Shorthand for an operator token.
    pub fn op(name: &str) -> Self {
        ContentToken::Operator(name.to_string())
    }
}
