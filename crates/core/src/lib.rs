//! Domain types and pure transformations shared by storage and the HTTP layer.

pub mod query;
pub mod shaping;
pub mod types;
