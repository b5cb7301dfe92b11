/// Geometry and index types shared by every stage.
pub mod core;
/// Error taxonomy.
pub mod error;
