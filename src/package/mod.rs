//! Tile delivery.
//!
//! Sinks receive a complete tile set in row-major order; a failed delivery is aborted, never
//! left half-written.

/// Staged on-disk delivery with a `tiles.json` index.
pub mod dir;
/// Sink trait, naming helpers and the in-memory sink.
pub mod sink;
