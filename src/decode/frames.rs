use std::io::Cursor;

use crate::foundation::core::{CanvasSize, FrameIndex, Rect};
use crate::foundation::error::{GridError, GridResult};

/// Default ceiling on the composited footprint of one image (`width * height * 4 * frames`).
pub const DEFAULT_MAX_COMPOSITED_BYTES: u64 = 1 << 30;

/// What happens to a frame's rectangle before the next frame is drawn.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum DisposalMode {
    /// Unspecified; treated like [`DisposalMode::DoNotDispose`].
    #[default]
    None,
    /// Leave the frame in place.
    DoNotDispose,
    /// Clear the frame's rectangle to transparent.
    RestoreBackground,
    /// Restore the frame's rectangle to what it held before the frame was drawn.
    RestorePrevious,
}

impl From<gif::DisposalMethod> for DisposalMode {
    fn from(m: gif::DisposalMethod) -> Self {
        match m {
            gif::DisposalMethod::Any => Self::None,
            gif::DisposalMethod::Keep => Self::DoNotDispose,
            gif::DisposalMethod::Background => Self::RestoreBackground,
            gif::DisposalMethod::Previous => Self::RestorePrevious,
        }
    }
}

/// Loop behaviour declared by the source container.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum SourceRepeat {
    /// No loop extension, or an explicit count. `Finite(0)` plays once.
    Finite(u16),
    /// Loops forever.
    Infinite,
}

/// One decoded partial-canvas patch, exactly as stored in the container.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawFrame {
    /// Position in the source animation.
    pub index: FrameIndex,
    /// Display time in hundredths of a second.
    pub delay_centiseconds: u16,
    /// Disposal applied after this frame is shown.
    pub disposal: DisposalMode,
    /// Patch rectangle on the logical canvas.
    pub bounds: Rect,
    /// Straight-alpha RGBA8 pixels, `bounds.width * bounds.height * 4` bytes.
    pub pixels: Vec<u8>,
    /// Whether the patch declares a transparent palette index.
    pub transparent: bool,
}

/// Result of the Frame Source stage.
#[derive(Clone, Debug)]
pub struct DecodedGif {
    /// Logical screen size.
    pub canvas: CanvasSize,
    /// Frames in container order.
    pub frames: Vec<RawFrame>,
    /// Loop extension of the source.
    pub repeat: SourceRepeat,
}

impl DecodedGif {
    /// Per-frame delays in container order.
    pub fn delays(&self) -> Vec<u16> {
        self.frames.iter().map(|f| f.delay_centiseconds).collect()
    }
}

/// Summary of an animation without its pixel data.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct GifInfo {
    /// Logical screen size.
    pub canvas: CanvasSize,
    /// Number of frames.
    pub frame_count: usize,
    /// Sum of all frame delays, in centiseconds.
    pub total_delay_cs: u64,
    /// Loop extension of the source.
    pub repeat: SourceRepeat,
}

/// Decode GIF bytes into raw frames using [`DEFAULT_MAX_COMPOSITED_BYTES`].
pub fn decode_gif(bytes: &[u8]) -> GridResult<DecodedGif> {
    decode_gif_with_limit(bytes, DEFAULT_MAX_COMPOSITED_BYTES)
}

/// Decode GIF bytes into raw frames, refusing images whose composited sequence would exceed
/// `max_composited_bytes`.
#[tracing::instrument(name = "decode_gif", skip(bytes), fields(len = bytes.len()))]
pub fn decode_gif_with_limit(bytes: &[u8], max_composited_bytes: u64) -> GridResult<DecodedGif> {
    let mut options = gif::DecodeOptions::new();
    options.set_color_output(gif::ColorOutput::RGBA);
    let mut decoder = options
        .read_info(Cursor::new(bytes))
        .map_err(|e| GridError::decode(format!("read gif header: {e}")))?;

    let canvas = CanvasSize::new(u32::from(decoder.width()), u32::from(decoder.height()));
    if canvas.is_empty() {
        return Err(GridError::decode(format!(
            "gif declares an empty logical screen ({canvas})"
        )));
    }
    let per_frame = canvas
        .rgba_len()
        .ok_or_else(|| GridError::resource(format!("canvas {canvas} is too large")))?;

    let mut frames = Vec::new();
    while let Some(frame) = decoder
        .read_next_frame()
        .map_err(|e| GridError::decode(format!("read frame {}: {e}", frames.len())))?
    {
        let budget = per_frame.saturating_mul(frames.len() as u64 + 1);
        if budget > max_composited_bytes {
            return Err(GridError::resource(format!(
                "composited size of {} frames at {canvas} exceeds the {max_composited_bytes} byte limit",
                frames.len() + 1
            )));
        }

        let bounds = Rect::new(
            u32::from(frame.left),
            u32::from(frame.top),
            u32::from(frame.width),
            u32::from(frame.height),
        );
        let expected = (bounds.width as usize) * (bounds.height as usize) * 4;
        if frame.buffer.len() != expected {
            return Err(GridError::decode(format!(
                "frame {} carries {} bytes for a {}x{} patch",
                frames.len(),
                frame.buffer.len(),
                bounds.width,
                bounds.height
            )));
        }

        frames.push(RawFrame {
            index: FrameIndex(frames.len()),
            delay_centiseconds: frame.delay,
            disposal: frame.dispose.into(),
            bounds,
            pixels: frame.buffer.to_vec(),
            transparent: frame.transparent.is_some(),
        });
    }

    if frames.is_empty() {
        return Err(GridError::decode("gif contains no frames"));
    }

    let repeat = source_repeat(decoder.repeat());

    tracing::debug!(%canvas, frames = frames.len(), ?repeat, "decoded gif");
    Ok(DecodedGif {
        canvas,
        frames,
        repeat,
    })
}

/// Read canvas size, frame count and total duration without compositing.
///
/// Frames are decoded as palette indices one at a time and dropped immediately, so memory stays
/// at one patch regardless of animation length. No composited budget applies.
pub fn probe_gif(bytes: &[u8]) -> GridResult<GifInfo> {
    let mut options = gif::DecodeOptions::new();
    options.set_color_output(gif::ColorOutput::Indexed);
    let mut decoder = options
        .read_info(Cursor::new(bytes))
        .map_err(|e| GridError::decode(format!("read gif header: {e}")))?;

    let canvas = CanvasSize::new(u32::from(decoder.width()), u32::from(decoder.height()));
    if canvas.is_empty() {
        return Err(GridError::decode(format!(
            "gif declares an empty logical screen ({canvas})"
        )));
    }

    let mut frame_count = 0usize;
    let mut total_delay_cs = 0u64;
    while let Some(frame) = decoder
        .read_next_frame()
        .map_err(|e| GridError::decode(format!("read frame {frame_count}: {e}")))?
    {
        frame_count += 1;
        total_delay_cs += u64::from(frame.delay);
    }
    if frame_count == 0 {
        return Err(GridError::decode("gif contains no frames"));
    }

    Ok(GifInfo {
        canvas,
        frame_count,
        total_delay_cs,
        repeat: source_repeat(decoder.repeat()),
    })
}

fn source_repeat(repeat: gif::Repeat) -> SourceRepeat {
    match repeat {
        gif::Repeat::Infinite => SourceRepeat::Infinite,
        gif::Repeat::Finite(n) => SourceRepeat::Finite(n),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/decode/frames.rs"]
mod tests;
