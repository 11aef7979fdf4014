//! Code generation module

mod generator;
mod naming;
mod plan;
mod type_mapping;

pub use generator::*;
pub use naming::*;
pub use plan::*;
pub use type_mapping::*;
