use miette::{Diagnostic, SourceSpan};
use thiserror::Error;

use crate::alphabet_c::type_system::TypeError;
use crate::declare_error_type;

declare_error_type! {
    #[error("compile error: {0}")]
    pub enum CompileError {
        TypeMismatch(TypeMismatchError),
        ReturnTypeMismatch(ReturnTypeMismatchError),
        Type(TypeError),
    }
}

pub type CompileResult<T> = Result<T, CompileError>;

#[derive(Error, Diagnostic, Debug)]
#[diagnostic(
    code(compile::type_mismatch),
    help("the initializer's type cannot flow into the declared type ID")
)]
#[error("type mismatch: cannot assign type {found} to variable of type {expected}")]
pub struct TypeMismatchError {
    pub found: u16,
    pub expected: u16,
    #[label("this initializer has type {found}, the variable was declared as {expected}")]
    pub span: SourceSpan,
    #[source_code]
    pub src: String,
}

#[derive(Error, Diagnostic, Debug)]
#[diagnostic(
    code(compile::return_type_mismatch),
    help("the returned expression's type cannot flow into the declared return type ID")
)]
#[error("method '{method}': return type mismatch, found {found} but expected {expected}")]
pub struct ReturnTypeMismatchError {
    pub method: String,
    pub found: u16,
    pub expected: u16,
    #[label("this return value has type {found}, the method declares {expected}")]
    pub span: SourceSpan,
    #[source_code]
    pub src: String,
}
