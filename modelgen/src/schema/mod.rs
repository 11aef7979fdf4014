//! Schema model and table selection

mod filter;
mod model;

pub use filter::*;
pub use model::*;
