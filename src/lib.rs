//! gifgrid cuts an animated GIF into per-button animations for grid controllers.
//!
//! A source GIF sized to a device's full button canvas is decoded, every frame is rebuilt with
//! its disposal rules applied, and the resulting canvas sequence is cropped into one looping GIF
//! per button:
//!
//! - Resolve a [`DeviceProfile`] from a [`ProfileTable`]
//! - Run [`slice_gif`] to get one [`EncodedTile`] per cell, in row-major order
//! - Hand the set to a [`TileSink`] with [`deliver_tiles`]
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod foundation;

/// Frame reconstruction.
pub mod composite;
/// GIF decoding.
pub mod decode;
/// Tile encoding.
pub mod encode;
/// Tile delivery sinks.
pub mod package;
/// End-to-end slicing.
pub mod pipeline;
/// Device profiles.
pub mod profile;
/// Grid slicing.
pub mod slice;
/// Scratch directories.
pub mod workspace;

pub use crate::foundation::core::{CanvasSize, FrameIndex, Rect};
pub use crate::foundation::error::{ErrorClass, GridError, GridResult};

pub use crate::composite::compositor::{CompositedFrame, composite_frames};
pub use crate::decode::frames::{
    DecodedGif, DisposalMode, GifInfo, RawFrame, SourceRepeat, decode_gif, decode_gif_with_limit,
    probe_gif,
};
pub use crate::encode::tile::{EncodeOpts, EncodedTile, LoopCount, TileEncoder};
pub use crate::package::dir::{DirTileSink, DirTileSinkOpts, MANIFEST_FILE};
pub use crate::package::sink::{
    InMemoryTileSink, SinkConfig, TILE_EXTENSION, TileSink, deliver_tiles, profile_cell_key,
    tile_file_name,
};
pub use crate::pipeline::{SliceOpts, SliceStats, slice_gif, slice_gif_with_stats};
pub use crate::profile::table::{DeviceProfile, ProfileTable, validate_dimensions};
pub use crate::slice::grid::{
    TileAnimation, TileFrame, TileSpec, check_geometry, check_timing, slice_cell, slice_tiles,
    tile_specs,
};
pub use crate::workspace::Workspace;

#[cfg(test)]
#[path = "../tests/support/mod.rs"]
pub(crate) mod test_support;
