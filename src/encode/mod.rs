//! Per-tile GIF encoding.

/// Tile encoder and its options.
pub mod tile;
