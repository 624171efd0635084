use miette::{Diagnostic, SourceSpan};
use thiserror::Error;

use crate::alphabet_c::frontend::lexer::token::TokenKindVec;
use crate::declare_error_type;

declare_error_type! {
    #[error("parse error: {0}")]
    pub enum SyntaxError {
        UnexpectedToken(UnexpectedTokenError),
        ExpectedExpression(ExpectedExpressionError),
        InvalidAssignmentTarget(InvalidAssignmentTargetError),
        InterfaceMember(InterfaceMemberError),
    }
}

pub type ParseResult<T> = Result<T, SyntaxError>;

#[derive(Error, Diagnostic, Debug)]
#[diagnostic(code(syntax::unexpected_token))]
#[error("found unexpected token on line {line}")]
pub struct UnexpectedTokenError {
    pub found: String,
    pub expected: TokenKindVec,
    pub line: u32,
    #[label("was not expecting {found} here, expected one of: {expected}")]
    pub span: SourceSpan,
    #[source_code]
    pub src: String,
}

#[derive(Error, Diagnostic, Debug)]
#[diagnostic(code(syntax::expected_expression))]
#[error("expected an expression on line {line}")]
pub struct ExpectedExpressionError {
    pub line: u32,
    #[label = "this token cannot start an expression"]
    pub span: SourceSpan,
    #[source_code]
    pub src: String,
}

#[derive(Error, Diagnostic, Debug)]
#[diagnostic(
    code(syntax::invalid_assignment_target),
    help("only variables and property accesses can be assigned to")
)]
#[error("invalid assignment target on line {line}")]
pub struct InvalidAssignmentTargetError {
    pub line: u32,
    #[label = "cannot assign to this expression"]
    pub span: SourceSpan,
    #[source_code]
    pub src: String,
}

#[derive(Error, Diagnostic, Debug)]
#[diagnostic(
    code(syntax::interface_member),
    help("interfaces declare method signatures only")
)]
#[error("interfaces can only contain methods")]
pub struct InterfaceMemberError {
    #[label = "this is not a method signature"]
    pub span: SourceSpan,
    #[source_code]
    pub src: String,
}
