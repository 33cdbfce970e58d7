pub mod ast;
pub mod lexer;
pub mod parser;
pub mod environment;
pub mod value;
pub mod evaluator;
pub mod error;
pub mod runner;

pub use lexer::tokenize;
pub use parser::parse;
pub use evaluator::evaluate;
pub use runner::{run_source, Interpreter};
