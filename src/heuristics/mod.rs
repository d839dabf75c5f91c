//! Evolutionary operators and the genetic algorithm engine.
//!
//! This module exports the noise model, the selection operators, the
//! permutation operators and the engine that drives them.

pub mod noise;
pub mod selection;
pub mod operators;
pub mod genetic;

pub use noise::*;
pub use selection::*;
pub use operators::*;
pub use genetic::*;
