pub mod lexer;
pub mod parser;

use lexer::{AlphabetLexer, MissingHeaderError};
use parser::{Parser, arena::AstArena, ast::Stmt, error::SyntaxError};

/// Scans and parses a source buffer in one shot. Declarations the parser had
/// to drop are returned alongside the surviving statements; only a missing
/// language header aborts the frontend outright.
pub fn parse<'ast>(
    path: &str,
    arena: &'ast AstArena<'ast>,
    source: &'ast str,
) -> Result<(Vec<&'ast Stmt<'ast>>, Vec<SyntaxError>), MissingHeaderError> {
    let lexer = AlphabetLexer::new(path, source);
    let tokens = lexer.tokenize()?;
    tracing::debug!(path, tokens = tokens.len(), "scanned source");

    let mut parser = Parser::new(arena, tokens, source);
    let statements = parser.parse();
    let errors = parser.take_errors();
    tracing::debug!(
        path,
        statements = statements.len(),
        dropped = errors.len(),
        "parsed source"
    );
    Ok((statements, errors))
}
