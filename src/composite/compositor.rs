use image::{Rgba, RgbaImage};

use crate::decode::frames::{DisposalMode, RawFrame};
use crate::foundation::core::{CanvasSize, FrameIndex, Rect};
use crate::foundation::error::{GridError, GridResult};

/// A full-canvas image produced by folding raw frames up to and including `index`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompositedFrame {
    /// Position in the source animation.
    pub index: FrameIndex,
    /// Display time in hundredths of a second, copied from the raw frame.
    pub delay_centiseconds: u16,
    /// Straight-alpha RGBA8 canvas.
    pub canvas: RgbaImage,
}

/// Disposal owed by the previously drawn frame, applied before the next patch.
enum PendingDisposal {
    Keep,
    Clear(Rect),
    Restore(SavedRegion),
}

/// Pixels of a canvas rectangle captured before a patch was drawn over it.
struct SavedRegion {
    rect: Rect,
    rgba: Vec<u8>,
}

/// Fold raw frames into composited full-canvas frames, one-to-one and in order.
///
/// The running canvas starts fully transparent. Before each frame is drawn, the disposal of the
/// frame before it is applied to that frame's rectangle. Patches and disposal rectangles are
/// clipped to the canvas.
#[tracing::instrument(skip(frames), fields(frames = frames.len()))]
pub fn composite_frames(
    canvas: CanvasSize,
    frames: &[RawFrame],
) -> GridResult<Vec<CompositedFrame>> {
    if canvas.is_empty() {
        return Err(GridError::decode(format!(
            "cannot composite onto an empty canvas ({canvas})"
        )));
    }

    let mut out = Vec::new();
    out.try_reserve_exact(frames.len()).map_err(|e| {
        GridError::resource(format!("reserve {} composited frames: {e}", frames.len()))
    })?;

    let mut working = try_alloc_canvas(canvas)?;
    let mut pending = PendingDisposal::Keep;

    for raw in frames {
        check_patch_len(raw)?;
        apply_disposal(&mut working, std::mem::replace(&mut pending, PendingDisposal::Keep));

        let clip = raw.bounds.intersect(canvas.rect());
        pending = match raw.disposal {
            DisposalMode::None | DisposalMode::DoNotDispose => PendingDisposal::Keep,
            DisposalMode::RestoreBackground => PendingDisposal::Clear(clip),
            DisposalMode::RestorePrevious => PendingDisposal::Restore(save_region(&working, clip)),
        };

        draw_patch(&mut working, raw, clip);

        out.push(CompositedFrame {
            index: raw.index,
            delay_centiseconds: raw.delay_centiseconds,
            canvas: try_clone_canvas(&working)?,
        });
    }

    tracing::debug!(%canvas, composited = out.len(), "composited frames");
    Ok(out)
}

fn apply_disposal(canvas: &mut RgbaImage, pending: PendingDisposal) {
    match pending {
        PendingDisposal::Keep => {}
        PendingDisposal::Clear(rect) => {
            for y in rect.top..rect.bottom() {
                for x in rect.left..rect.right() {
                    canvas.put_pixel(x, y, Rgba([0, 0, 0, 0]));
                }
            }
        }
        PendingDisposal::Restore(saved) => {
            let mut px = saved.rgba.chunks_exact(4);
            for y in saved.rect.top..saved.rect.bottom() {
                for x in saved.rect.left..saved.rect.right() {
                    if let Some(p) = px.next() {
                        canvas.put_pixel(x, y, Rgba([p[0], p[1], p[2], p[3]]));
                    }
                }
            }
        }
    }
}

fn save_region(canvas: &RgbaImage, rect: Rect) -> SavedRegion {
    let mut rgba = Vec::with_capacity((rect.width as usize) * (rect.height as usize) * 4);
    for y in rect.top..rect.bottom() {
        for x in rect.left..rect.right() {
            rgba.extend_from_slice(&canvas.get_pixel(x, y).0);
        }
    }
    SavedRegion { rect, rgba }
}

fn draw_patch(canvas: &mut RgbaImage, raw: &RawFrame, clip: Rect) {
    let stride = raw.bounds.width as usize;
    for y in clip.top..clip.bottom() {
        let sy = (y - raw.bounds.top) as usize;
        for x in clip.left..clip.right() {
            let sx = (x - raw.bounds.left) as usize;
            let i = (sy * stride + sx) * 4;
            let src = [
                raw.pixels[i],
                raw.pixels[i + 1],
                raw.pixels[i + 2],
                raw.pixels[i + 3],
            ];
            if raw.transparent && src[3] == 0 {
                continue;
            }
            let dst = canvas.get_pixel_mut(x, y);
            dst.0 = if raw.transparent {
                over(dst.0, src)
            } else {
                src
            };
        }
    }
}

/// Straight-alpha source-over.
fn over(dst: [u8; 4], src: [u8; 4]) -> [u8; 4] {
    let sa = u32::from(src[3]);
    if sa == 255 {
        return src;
    }
    let da = mul_div255(u32::from(dst[3]), 255 - sa);
    let oa = sa + da;
    if oa == 0 {
        return [0, 0, 0, 0];
    }
    let mut out = [0u8; 4];
    for c in 0..3 {
        let v = (u32::from(src[c]) * sa + u32::from(dst[c]) * da + oa / 2) / oa;
        out[c] = v.min(255) as u8;
    }
    out[3] = oa.min(255) as u8;
    out
}

fn mul_div255(x: u32, y: u32) -> u32 {
    (x * y + 127) / 255
}

fn check_patch_len(raw: &RawFrame) -> GridResult<()> {
    let expected = (raw.bounds.width as usize) * (raw.bounds.height as usize) * 4;
    if raw.pixels.len() != expected {
        return Err(GridError::invariant(format!(
            "raw frame {} has {} bytes for a {}x{} patch",
            raw.index.0,
            raw.pixels.len(),
            raw.bounds.width,
            raw.bounds.height
        )));
    }
    Ok(())
}

pub(crate) fn try_alloc_canvas(canvas: CanvasSize) -> GridResult<RgbaImage> {
    let len = canvas
        .rgba_len()
        .and_then(|l| usize::try_from(l).ok())
        .ok_or_else(|| GridError::resource(format!("canvas {canvas} is too large")))?;
    let mut buf = Vec::new();
    buf.try_reserve_exact(len)
        .map_err(|e| GridError::resource(format!("allocate {canvas} canvas: {e}")))?;
    buf.resize(len, 0);
    RgbaImage::from_raw(canvas.width, canvas.height, buf)
        .ok_or_else(|| GridError::invariant(format!("canvas buffer does not fit {canvas}")))
}

pub(crate) fn try_clone_canvas(src: &RgbaImage) -> GridResult<RgbaImage> {
    let raw = src.as_raw();
    let mut buf = Vec::new();
    buf.try_reserve_exact(raw.len())
        .map_err(|e| GridError::resource(format!("snapshot canvas: {e}")))?;
    buf.extend_from_slice(raw);
    RgbaImage::from_raw(src.width(), src.height(), buf)
        .ok_or_else(|| GridError::invariant("canvas snapshot lost its dimensions"))
}

#[cfg(test)]
#[path = "../../tests/unit/composite/compositor.rs"]
mod tests;
