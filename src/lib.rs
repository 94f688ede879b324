//! Source-to-source translator from a subset of Java to Python 3.10+.
//!
//! The pipeline is a one-way pass: source text is lexed into tokens, parsed
//! by recursive descent into a [`ast::CompilationUnit`], and walked by the
//! translator to produce Python text. Nothing flows backwards and no state
//! survives a translation.
//!
//! ```
//! let java = "public class A extends B {}";
//! let python = j2py::transpile(java).unwrap();
//! assert_eq!(python, "class A(B):\n    pass\n");
//! ```
//!
//! Known limitation: overloaded constructors collapse into a single
//! `__init__` with a union signature and defaults, keeping only the longest
//! overload's body. Overloads whose bodies differ in behavior are not merged
//! faithfully.

pub mod ast;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod translator;

pub use error::TranspileError;
pub use translator::{PythonTarget, TranslateConfig, Translator};

use ast::CompilationUnit;
use lexer::Lexer;
use parser::Parser;

/// Lex and parse a Java source file.
pub fn parse_source(source: &str) -> Result<CompilationUnit, TranspileError> {
    let tokens = Lexer::new(source).tokenize()?;
    Parser::new(tokens).parse()
}

/// Translate a Java source file to Python with the default configuration.
pub fn transpile(source: &str) -> Result<String, TranspileError> {
    transpile_with_config(source, &TranslateConfig::default())
}

/// Translate a Java source file to Python.
pub fn transpile_with_config(
    source: &str,
    config: &TranslateConfig,
) -> Result<String, TranspileError> {
    let unit = parse_source(source)?;
    Ok(Translator::new(config.clone()).translate(&unit))
}

/// Translate a bare statement list that is not wrapped in a class.
pub fn transpile_snippet(source: &str) -> Result<String, TranspileError> {
    let tokens = Lexer::new(source).tokenize()?;
    let stmts = Parser::new(tokens).parse_statements()?;
    Ok(Translator::new(TranslateConfig::default()).translate_statements(&stmts))
}
