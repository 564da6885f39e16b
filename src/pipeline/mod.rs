pub mod evaluator;
pub mod stage;

pub use stage::{Accumulator, AccumulatorSpec, Pipeline, Stage, SumOperand};
