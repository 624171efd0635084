pub mod codegen;
pub mod frontend;
pub mod type_system;
pub mod utils;
