use thiserror::Error;

/// Errors produced while turning Java source into Python source.
///
/// The pipeline stops at the first error; there is no recovery and no
/// partial output.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TranspileError {
    #[error("lex error at {line}:{column}: {message}")]
    Lex {
        line: usize,
        column: usize,
        message: String,
    },
    #[error("parse error at {line}:{column}: expected {expected}, got '{found}' (token #{token_index})")]
    Parse {
        found: String,
        expected: String,
        line: usize,
        column: usize,
        token_index: usize,
    },
}
