//! Device profiles: canvas size and button grid per controller model.

/// Built-in and user-supplied profile tables.
pub mod table;
