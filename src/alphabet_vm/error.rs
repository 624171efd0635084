pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Runtime failures. All of these unwind through active try/handle handlers
/// exactly like user-thrown values (the message string becomes the thrown
/// value); only `UnhandledException` escapes the interpreter, after
/// unwinding found no handler anywhere on the frame stack.
#[derive(Debug, Clone, PartialEq)]
pub enum RuntimeError {
    StackOverflow,
    StackUnderflow,
    DivisionByZero,
    UnknownClass(String),
    UnknownClassId(u16),
    MethodNotFound { class: String, method: String },
    UnhandledException(String),
}

impl std::fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use RuntimeError::*;
        match self {
            StackOverflow => write!(f, "Stack overflow"),
            StackUnderflow => write!(f, "Stack underflow"),
            DivisionByZero => write!(f, "Division by zero"),
            UnknownClass(name) => write!(f, "Unknown class: {}", name),
            UnknownClassId(id) => write!(f, "Unknown class ID: {}", id),
            MethodNotFound { class, method } => {
                write!(f, "Method '{}' not found in class '{}'", method, class)
            }
            UnhandledException(value) => write!(f, "Unhandled exception: {}", value),
        }
    }
}

impl std::error::Error for RuntimeError {}
