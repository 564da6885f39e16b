pub mod ast;
pub mod cache;
pub mod matcher;
pub mod types;
