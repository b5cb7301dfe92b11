//! GIF container decoding into raw, uncomposited frames.

/// Raw frame extraction and probing.
pub mod frames;
