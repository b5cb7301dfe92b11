use rayon::prelude::*;

use crate::{
    composite::compositor::composite_frames,
    decode::frames::{DEFAULT_MAX_COMPOSITED_BYTES, decode_gif_with_limit},
    encode::tile::{EncodeOpts, EncodedTile, TileEncoder},
    foundation::core::CanvasSize,
    foundation::error::{GridError, GridResult},
    profile::table::{ProfileTable, validate_dimensions},
    slice::grid::{TileSpec, check_geometry, check_timing, profile_tile_specs, slice_cell},
};

/// Options for [`slice_gif`].
#[derive(Clone, Debug)]
pub struct SliceOpts {
    /// Per-tile encoder settings.
    pub encode: EncodeOpts,
    /// Slice and encode cells on a worker pool when `true`.
    pub parallel: bool,
    /// Optional explicit worker thread count (defaults to the number of CPUs).
    pub threads: Option<usize>,
    /// Refuse inputs whose composited frames would exceed this many bytes.
    pub max_composited_bytes: u64,
}

impl Default for SliceOpts {
    fn default() -> Self {
        Self {
            encode: EncodeOpts::default(),
            parallel: true,
            threads: None,
            max_composited_bytes: DEFAULT_MAX_COMPOSITED_BYTES,
        }
    }
}

/// Counters describing one completed slicing run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
pub struct SliceStats {
    /// Frames in the source (and in every tile).
    pub frames: usize,
    /// Tiles produced.
    pub tiles: usize,
    /// Decoded canvas size.
    pub canvas: CanvasSize,
    /// Sum of all frame delays, in centiseconds.
    pub total_delay_cs: u64,
}

/// Decode, validate, composite, slice and re-encode one GIF for `model`.
///
/// All-or-nothing: either every tile of the grid is returned in row-major order or the call
/// fails. The model is resolved and the canvas checked before any compositing work is done.
pub fn slice_gif(
    bytes: &[u8],
    model: &str,
    table: &ProfileTable,
    opts: &SliceOpts,
) -> GridResult<Vec<EncodedTile>> {
    slice_gif_with_stats(bytes, model, table, opts).map(|(tiles, _)| tiles)
}

/// Same as [`slice_gif`], also returning run counters.
#[tracing::instrument(name = "slice_gif", skip(bytes, table, opts), fields(len = bytes.len()))]
pub fn slice_gif_with_stats(
    bytes: &[u8],
    model: &str,
    table: &ProfileTable,
    opts: &SliceOpts,
) -> GridResult<(Vec<EncodedTile>, SliceStats)> {
    opts.encode.validate()?;
    if let Some(n) = opts.threads
        && n == 0
    {
        return Err(GridError::config("'threads' must be >= 1 when set"));
    }
    table.get(model)?;

    let decoded = decode_gif_with_limit(bytes, opts.max_composited_bytes)?;
    let profile = validate_dimensions(table, model, decoded.canvas)?;
    let specs = profile_tile_specs(profile)?;
    check_geometry(decoded.canvas, &specs)?;
    let encoder = TileEncoder::new(&opts.encode, decoded.repeat)?;

    let composited = composite_frames(decoded.canvas, &decoded.frames)?;
    if composited.len() != decoded.frames.len() {
        return Err(GridError::invariant(format!(
            "composited {} frames from {} raw frames",
            composited.len(),
            decoded.frames.len()
        )));
    }
    let stats = SliceStats {
        frames: composited.len(),
        tiles: specs.len(),
        canvas: decoded.canvas,
        total_delay_cs: composited
            .iter()
            .map(|f| u64::from(f.delay_centiseconds))
            .sum(),
    };
    drop(decoded);

    let encode_cell = |spec: &TileSpec| -> GridResult<EncodedTile> {
        let tile = slice_cell(&composited, *spec)?;
        check_timing(&composited, &tile)?;
        encoder.encode(&tile)
    };

    let results = if opts.parallel {
        let pool = build_thread_pool(opts.threads)?;
        pool.install(|| specs.par_iter().map(encode_cell).collect::<Vec<_>>())
    } else {
        specs.iter().map(encode_cell).collect::<Vec<_>>()
    };

    let mut tiles = Vec::with_capacity(results.len());
    for item in results {
        tiles.push(item?);
    }

    tracing::info!(
        model = %profile.name,
        tiles = tiles.len(),
        frames = stats.frames,
        "sliced gif"
    );
    Ok((tiles, stats))
}

fn build_thread_pool(threads: Option<usize>) -> GridResult<rayon::ThreadPool> {
    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| GridError::resource(format!("failed to build rayon thread pool: {e}")))
}
