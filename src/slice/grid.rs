use image::RgbaImage;
use image::imageops;

use crate::composite::compositor::CompositedFrame;
use crate::foundation::core::{CanvasSize, Rect};
use crate::foundation::error::{GridError, GridResult};
use crate::profile::table::DeviceProfile;

/// One grid cell: 0-indexed row/column plus its pixel rectangle on the canvas.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct TileSpec {
    /// 0-indexed row.
    pub row: u32,
    /// 0-indexed column.
    pub col: u32,
    /// Left edge on the canvas.
    pub x: u32,
    /// Top edge on the canvas.
    pub y: u32,
    /// Tile width.
    pub width: u32,
    /// Tile height.
    pub height: u32,
}

impl TileSpec {
    /// Canvas rectangle covered by this tile.
    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }
}

/// One cropped frame of a tile.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TileFrame {
    /// Cropped straight-alpha RGBA8 pixels, `spec.width x spec.height`.
    pub image: RgbaImage,
    /// Display time in hundredths of a second.
    pub delay_centiseconds: u16,
}

/// The cropped animation of one cell, same length and timing as the composited source.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TileAnimation {
    /// Cell geometry.
    pub spec: TileSpec,
    /// Frames in source order.
    pub frames: Vec<TileFrame>,
}

impl TileAnimation {
    /// Per-frame delays in order.
    pub fn delays(&self) -> Vec<u16> {
        self.frames.iter().map(|f| f.delay_centiseconds).collect()
    }
}

/// Row-major cell layout for `canvas` cut into `tile_width x tile_height` tiles.
///
/// Rows and columns are the floor of canvas over tile size; any right/bottom margin is dropped.
pub fn tile_specs(
    canvas: CanvasSize,
    tile_width: u32,
    tile_height: u32,
) -> GridResult<Vec<TileSpec>> {
    if tile_width == 0 || tile_height == 0 {
        return Err(GridError::geometry("tile size must be non-zero"));
    }
    let rows = canvas.height / tile_height;
    let cols = canvas.width / tile_width;
    let mut specs = Vec::with_capacity((rows as usize) * (cols as usize));
    for row in 0..rows {
        for col in 0..cols {
            specs.push(TileSpec {
                row,
                col,
                x: col * tile_width,
                y: row * tile_height,
                width: tile_width,
                height: tile_height,
            });
        }
    }
    Ok(specs)
}

/// Cell layout of a device profile, over its declared canvas.
pub fn profile_tile_specs(profile: &DeviceProfile) -> GridResult<Vec<TileSpec>> {
    tile_specs(profile.canvas(), profile.tile_width, profile.tile_height)
}

/// Every tile must lie inside the canvas and no two tiles may share a pixel.
pub fn check_geometry(canvas: CanvasSize, specs: &[TileSpec]) -> GridResult<()> {
    let bounds = canvas.rect();
    for (i, a) in specs.iter().enumerate() {
        if a.rect().is_empty() {
            return Err(GridError::geometry(format!(
                "tile r{} c{} is empty",
                a.row, a.col
            )));
        }
        if !a.rect().is_within(bounds) {
            return Err(GridError::geometry(format!(
                "tile r{} c{} at {:?} exceeds the {canvas} canvas",
                a.row,
                a.col,
                a.rect()
            )));
        }
        for b in &specs[i + 1..] {
            if a.rect().overlaps(b.rect()) {
                return Err(GridError::geometry(format!(
                    "tile r{} c{} overlaps tile r{} c{}",
                    a.row, a.col, b.row, b.col
                )));
            }
        }
    }
    Ok(())
}

/// Crop one cell out of every composited frame.
pub fn slice_cell(frames: &[CompositedFrame], spec: TileSpec) -> GridResult<TileAnimation> {
    let mut out = Vec::new();
    out.try_reserve_exact(frames.len())
        .map_err(|e| GridError::resource(format!("reserve tile frames: {e}")))?;

    for frame in frames {
        let canvas = CanvasSize::new(frame.canvas.width(), frame.canvas.height());
        if !spec.rect().is_within(canvas.rect()) {
            return Err(GridError::geometry(format!(
                "tile r{} c{} exceeds the {canvas} canvas of frame {}",
                spec.row, spec.col, frame.index.0
            )));
        }
        let image = imageops::crop_imm(&frame.canvas, spec.x, spec.y, spec.width, spec.height)
            .to_image();
        out.push(TileFrame {
            image,
            delay_centiseconds: frame.delay_centiseconds,
        });
    }

    Ok(TileAnimation { spec, frames: out })
}

/// Cut every composited frame into the profile's grid, one animation per cell in row-major order.
#[tracing::instrument(skip(frames, profile), fields(model = %profile.name, frames = frames.len()))]
pub fn slice_tiles(
    frames: &[CompositedFrame],
    profile: &DeviceProfile,
) -> GridResult<Vec<TileAnimation>> {
    let first = frames
        .first()
        .ok_or_else(|| GridError::invariant("cannot slice an empty frame sequence"))?;
    let canvas = CanvasSize::new(first.canvas.width(), first.canvas.height());
    let specs = profile_tile_specs(profile)?;
    check_geometry(canvas, &specs)?;

    let tiles = specs
        .into_iter()
        .map(|spec| slice_cell(frames, spec))
        .collect::<GridResult<Vec<_>>>()?;
    tracing::debug!(tiles = tiles.len(), "sliced tiles");
    Ok(tiles)
}

/// Tile frame count and delays must match the composited source exactly.
pub fn check_timing(source: &[CompositedFrame], tile: &TileAnimation) -> GridResult<()> {
    if tile.frames.len() != source.len() {
        return Err(GridError::invariant(format!(
            "tile r{} c{} has {} frames, source has {}",
            tile.spec.row,
            tile.spec.col,
            tile.frames.len(),
            source.len()
        )));
    }
    for (i, (t, s)) in tile.frames.iter().zip(source).enumerate() {
        if t.delay_centiseconds != s.delay_centiseconds {
            return Err(GridError::invariant(format!(
                "tile r{} c{} frame {i} delay {} != source delay {}",
                tile.spec.row, tile.spec.col, t.delay_centiseconds, s.delay_centiseconds
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/slice/grid.rs"]
mod tests;
