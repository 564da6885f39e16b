pub mod executor;

pub use executor::{EmitFn, ReduceFn, execute};
