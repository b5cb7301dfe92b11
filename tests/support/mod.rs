#![allow(dead_code)]

/// One frame of a synthetic GIF: a patch placed on the logical screen.
#[derive(Clone, Debug)]
pub struct FixtureFrame {
    pub left: u16,
    pub top: u16,
    pub width: u16,
    pub height: u16,
    pub rgba: Vec<u8>,
    pub delay_cs: u16,
    pub dispose: gif::DisposalMethod,
}

impl FixtureFrame {
    pub fn solid(left: u16, top: u16, width: u16, height: u16, color: [u8; 4]) -> Self {
        let rgba = color.repeat(usize::from(width) * usize::from(height));
        Self {
            left,
            top,
            width,
            height,
            rgba,
            delay_cs: 10,
            dispose: gif::DisposalMethod::Keep,
        }
    }

    pub fn delay(mut self, delay_cs: u16) -> Self {
        self.delay_cs = delay_cs;
        self
    }

    pub fn dispose(mut self, dispose: gif::DisposalMethod) -> Self {
        self.dispose = dispose;
        self
    }

    /// Overwrite one pixel of the patch (patch-local coordinates).
    pub fn with_pixel(mut self, x: u16, y: u16, color: [u8; 4]) -> Self {
        let i = (usize::from(y) * usize::from(self.width) + usize::from(x)) * 4;
        self.rgba[i..i + 4].copy_from_slice(&color);
        self
    }
}

/// Encode frames into a GIF with an empty global palette and per-frame local palettes.
pub fn build_gif(
    width: u16,
    height: u16,
    frames: &[FixtureFrame],
    repeat: Option<gif::Repeat>,
) -> Vec<u8> {
    let mut out = Vec::new();
    {
        let mut enc = gif::Encoder::new(&mut out, width, height, &[]).unwrap();
        if let Some(r) = repeat {
            enc.set_repeat(r).unwrap();
        }
        for f in frames {
            let mut px = f.rgba.clone();
            let mut frame = gif::Frame::from_rgba_speed(f.width, f.height, &mut px, 10);
            frame.left = f.left;
            frame.top = f.top;
            frame.delay = f.delay_cs;
            frame.dispose = f.dispose;
            enc.write_frame(&frame).unwrap();
        }
    }
    out
}

/// Full-canvas frame where every `tile x tile` cell has its own opaque colour.
pub fn cell_colored_frame(width: u16, height: u16, tile: u16, shift: u8) -> FixtureFrame {
    let mut f = FixtureFrame::solid(0, 0, width, height, [0, 0, 0, 255]);
    for y in 0..height {
        for x in 0..width {
            let color = cell_color(y / tile, x / tile, shift);
            let i = (usize::from(y) * usize::from(width) + usize::from(x)) * 4;
            f.rgba[i..i + 4].copy_from_slice(&color);
        }
    }
    f
}

/// Colour used by [`cell_colored_frame`] for the cell at `(row, col)`.
pub fn cell_color(row: u16, col: u16, shift: u8) -> [u8; 4] {
    [
        (row as u8).wrapping_mul(50).wrapping_add(shift),
        (col as u8).wrapping_mul(28),
        200u8.wrapping_sub(shift),
        255,
    ]
}

/// A looping animation of `count` full-canvas frames with distinct per-frame colours.
pub fn cell_colored_gif(width: u16, height: u16, tile: u16, delays: &[u16]) -> Vec<u8> {
    let frames = delays
        .iter()
        .enumerate()
        .map(|(i, d)| cell_colored_frame(width, height, tile, (i as u8) * 3).delay(*d))
        .collect::<Vec<_>>();
    build_gif(width, height, &frames, Some(gif::Repeat::Infinite))
}

/// Decode with `image`'s GIF reader: `(rgba, delay_ms)` per frame, fully composited.
pub fn read_with_image(bytes: &[u8]) -> Vec<(image::RgbaImage, u32)> {
    use image::AnimationDecoder as _;

    let decoder = image::codecs::gif::GifDecoder::new(std::io::Cursor::new(bytes)).unwrap();
    decoder
        .into_frames()
        .collect_frames()
        .unwrap()
        .into_iter()
        .map(|f| {
            let (num, den) = f.delay().numer_denom_ms();
            (f.into_buffer(), num / den.max(1))
        })
        .collect()
}

/// Loop count written into a GIF's NETSCAPE extension, read back with the `gif` crate.
pub fn read_repeat(bytes: &[u8]) -> gif::Repeat {
    let mut decoder = gif::DecodeOptions::new()
        .read_info(std::io::Cursor::new(bytes))
        .unwrap();
    while decoder.read_next_frame().unwrap().is_some() {}
    decoder.repeat()
}

/// Raw frame descriptors (bounds, delay, disposal) as stored in the container.
pub fn raw_descriptors(bytes: &[u8]) -> Vec<(u16, u16, u16, u16, u16, gif::DisposalMethod)> {
    let mut options = gif::DecodeOptions::new();
    options.set_color_output(gif::ColorOutput::RGBA);
    let mut decoder = options.read_info(std::io::Cursor::new(bytes)).unwrap();
    let mut out = Vec::new();
    while let Some(f) = decoder.read_next_frame().unwrap() {
        out.push((f.left, f.top, f.width, f.height, f.delay, f.dispose));
    }
    out
}
