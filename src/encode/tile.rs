use crate::decode::frames::SourceRepeat;
use crate::foundation::error::{GridError, GridResult};
use crate::slice::grid::TileAnimation;

/// Loop behaviour written into each encoded tile.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopCount {
    /// Loop forever.
    #[default]
    Infinite,
    /// Repeat `n` times after the first play; `Finite(0)` plays once.
    Finite(u16),
    /// Reuse the source animation's loop extension.
    MatchSource,
}

/// Encoder configuration. None of these settings change frame count or timing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct EncodeOpts {
    /// NeuQuant sampling speed, 1 (best) to 30 (fastest). Only used for frames with more than
    /// 256 distinct colours.
    pub speed: i32,
    /// Loop extension of every tile.
    pub loop_count: LoopCount,
}

impl Default for EncodeOpts {
    fn default() -> Self {
        Self {
            speed: 10,
            loop_count: LoopCount::Infinite,
        }
    }
}

impl EncodeOpts {
    /// Reject settings the quantizer cannot honour.
    pub fn validate(&self) -> GridResult<()> {
        if !(1..=30).contains(&self.speed) {
            return Err(GridError::config(format!(
                "encode speed must be within 1..=30, got {}",
                self.speed
            )));
        }
        Ok(())
    }
}

/// A complete, independently loopable GIF for one grid cell.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncodedTile {
    /// 0-indexed row.
    pub row: u32,
    /// 0-indexed column.
    pub col: u32,
    /// GIF file bytes.
    pub bytes: Vec<u8>,
}

/// Stateless tile encoder shared read-only by every cell task.
#[derive(Clone, Copy, Debug)]
pub struct TileEncoder {
    speed: i32,
    repeat: Option<gif::Repeat>,
}

impl TileEncoder {
    /// Resolve options against the source's loop extension.
    pub fn new(opts: &EncodeOpts, source: SourceRepeat) -> GridResult<Self> {
        opts.validate()?;
        let count = match opts.loop_count {
            LoopCount::Infinite => SourceRepeat::Infinite,
            LoopCount::Finite(n) => SourceRepeat::Finite(n),
            LoopCount::MatchSource => source,
        };
        // no extension at all is the only portable way to say "play once"
        let repeat = match count {
            SourceRepeat::Infinite => Some(gif::Repeat::Infinite),
            SourceRepeat::Finite(0) => None,
            SourceRepeat::Finite(n) => Some(gif::Repeat::Finite(n)),
        };
        Ok(Self {
            speed: opts.speed,
            repeat,
        })
    }

    /// Encode one tile animation. Every frame covers the whole tile and disposes to background,
    /// so each displayed frame is exactly the cropped input, including transparent pixels.
    #[tracing::instrument(
        name = "encode_tile",
        skip(self, tile),
        fields(row = tile.spec.row, col = tile.spec.col)
    )]
    pub fn encode(&self, tile: &TileAnimation) -> GridResult<EncodedTile> {
        let spec = tile.spec;
        if tile.frames.is_empty() {
            return Err(GridError::encode(format!(
                "tile r{} c{} has no frames",
                spec.row, spec.col
            )));
        }
        let (w, h) = match (u16::try_from(spec.width), u16::try_from(spec.height)) {
            (Ok(w), Ok(h)) if w > 0 && h > 0 => (w, h),
            _ => {
                return Err(GridError::encode(format!(
                    "tile size {}x{} cannot be stored in a gif",
                    spec.width, spec.height
                )));
            }
        };

        let mut encoder = gif::Encoder::new(Vec::new(), w, h, &[]).map_err(|e| {
            GridError::encode(format!("start gif for r{} c{}: {e}", spec.row, spec.col))
        })?;
        if let Some(repeat) = self.repeat {
            encoder
                .set_repeat(repeat)
                .map_err(|e| GridError::encode(format!("write loop extension: {e}")))?;
        }

        for (i, f) in tile.frames.iter().enumerate() {
            if f.image.dimensions() != (spec.width, spec.height) {
                let (fw, fh) = f.image.dimensions();
                return Err(GridError::encode(format!(
                    "tile r{} c{} frame {i} is {fw}x{fh}, expected {}x{}",
                    spec.row, spec.col, spec.width, spec.height
                )));
            }
            let mut rgba = f.image.as_raw().clone();
            let mut frame = gif::Frame::from_rgba_speed(w, h, &mut rgba, self.speed);
            frame.delay = f.delay_centiseconds;
            frame.dispose = gif::DisposalMethod::Background;
            encoder
                .write_frame(&frame)
                .map_err(|e| GridError::encode(format!("write frame {i}: {e}")))?;
        }

        let bytes = encoder
            .into_inner()
            .map_err(|e| GridError::encode(format!("finish gif: {e}")))?;
        Ok(EncodedTile {
            row: spec.row,
            col: spec.col,
            bytes,
        })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/tile.rs"]
mod tests;
