//! Link-header driven pagination over GitHub collections.

pub mod iterator;
pub mod links;

pub use iterator::*;
pub use links::*;
