use crate::encode::tile::EncodedTile;
use crate::foundation::error::{GridError, GridResult};
use crate::profile::table::DeviceProfile;

/// File extension of every encoded tile.
pub const TILE_EXTENSION: &str = "gif";

/// Externally visible tile name, 1-indexed: `tile_r{row+1}_c{col+1}.{ext}`.
pub fn tile_file_name(row: u32, col: u32, ext: &str) -> String {
    format!("tile_r{}_c{}.{ext}", row + 1, col + 1)
}

/// Button coordinate used by device-profile manifests: `"{col},{row}"`, 0-indexed.
pub fn profile_cell_key(row: u32, col: u32) -> String {
    format!("{col},{row}")
}

/// Configuration handed to a [`TileSink`] before any tile is pushed.
#[derive(Clone, Debug)]
pub struct SinkConfig {
    /// Profile the tiles were cut for.
    pub profile: DeviceProfile,
    /// Number of tiles that will follow.
    pub tile_count: usize,
}

/// Consumer of finished tiles, e.g. an archive writer or a device-profile builder.
///
/// Ordering contract: `push_tile` is called in row-major order. Either `end` is called after the
/// last tile, or `abort` is called and everything delivered so far must be discarded.
pub trait TileSink {
    /// Called once before any tiles are pushed.
    fn begin(&mut self, cfg: SinkConfig) -> GridResult<()>;
    /// Push one tile.
    fn push_tile(&mut self, tile: &EncodedTile) -> GridResult<()>;
    /// Called once after the last tile is pushed.
    fn end(&mut self) -> GridResult<()>;
    /// Called instead of `end` when delivery fails part-way.
    fn abort(&mut self) {}
}

/// Drive `sink` with a complete tile set. Partial sets are never delivered.
#[tracing::instrument(skip(tiles, sink), fields(model = %profile.name, tiles = tiles.len()))]
pub fn deliver_tiles(
    tiles: &[EncodedTile],
    profile: &DeviceProfile,
    sink: &mut dyn TileSink,
) -> GridResult<()> {
    check_complete(tiles, profile)?;
    let result = push_all(tiles, profile, sink);
    if result.is_err() {
        sink.abort();
    }
    result
}

fn push_all(
    tiles: &[EncodedTile],
    profile: &DeviceProfile,
    sink: &mut dyn TileSink,
) -> GridResult<()> {
    sink.begin(SinkConfig {
        profile: profile.clone(),
        tile_count: tiles.len(),
    })?;
    for tile in tiles {
        sink.push_tile(tile)?;
    }
    sink.end()
}

fn check_complete(tiles: &[EncodedTile], profile: &DeviceProfile) -> GridResult<()> {
    if tiles.len() != profile.tile_count() {
        return Err(GridError::invariant(format!(
            "expected {} tiles for '{}', got {}",
            profile.tile_count(),
            profile.name,
            tiles.len()
        )));
    }
    let mut expected = (0..profile.rows).flat_map(|r| (0..profile.cols).map(move |c| (r, c)));
    for tile in tiles {
        if expected.next() != Some((tile.row, tile.col)) {
            return Err(GridError::invariant(format!(
                "tile r{} c{} is out of row-major order",
                tile.row, tile.col
            )));
        }
    }
    Ok(())
}

/// In-memory sink for tests and embedding: named files in delivery order.
#[derive(Debug, Default)]
pub struct InMemoryTileSink {
    cfg: Option<SinkConfig>,
    files: Vec<(String, Vec<u8>)>,
    finished: bool,
}

impl InMemoryTileSink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration captured in `begin`, if any.
    pub fn config(&self) -> Option<&SinkConfig> {
        self.cfg.as_ref()
    }

    /// Delivered `(file name, bytes)` pairs.
    pub fn files(&self) -> &[(String, Vec<u8>)] {
        &self.files
    }

    /// `true` once `end` completed.
    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

impl TileSink for InMemoryTileSink {
    fn begin(&mut self, cfg: SinkConfig) -> GridResult<()> {
        self.cfg = Some(cfg);
        self.files.clear();
        self.finished = false;
        Ok(())
    }

    fn push_tile(&mut self, tile: &EncodedTile) -> GridResult<()> {
        self.files.push((
            tile_file_name(tile.row, tile.col, TILE_EXTENSION),
            tile.bytes.clone(),
        ));
        Ok(())
    }

    fn end(&mut self) -> GridResult<()> {
        self.finished = true;
        Ok(())
    }

    fn abort(&mut self) {
        self.files.clear();
        self.finished = false;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/package/sink.rs"]
mod tests;
