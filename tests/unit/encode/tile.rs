use image::{Rgba, RgbaImage};

use super::*;
use crate::slice::grid::{TileFrame, TileSpec};
use crate::test_support::{raw_descriptors, read_repeat, read_with_image};

const SPEC: TileSpec = TileSpec {
    row: 1,
    col: 2,
    x: 192,
    y: 96,
    width: 8,
    height: 4,
};

fn solid(color: [u8; 4], delay: u16) -> TileFrame {
    TileFrame {
        image: RgbaImage::from_pixel(SPEC.width, SPEC.height, Rgba(color)),
        delay_centiseconds: delay,
    }
}

fn encoder(loop_count: LoopCount, source: SourceRepeat) -> TileEncoder {
    TileEncoder::new(
        &EncodeOpts {
            loop_count,
            ..EncodeOpts::default()
        },
        source,
    )
    .unwrap()
}

#[test]
fn encoded_tile_round_trips_frames_delays_and_pixels() {
    let mut second = solid([0, 200, 0, 255], 25);
    second.image.put_pixel(3, 2, Rgba([9, 8, 7, 255]));
    let tile = TileAnimation {
        spec: SPEC,
        frames: vec![solid([200, 0, 0, 255], 4), second, solid([0, 0, 200, 255], 7)],
    };

    let out = encoder(LoopCount::Infinite, SourceRepeat::Finite(0))
        .encode(&tile)
        .unwrap();
    assert_eq!((out.row, out.col), (1, 2));

    let decoded = read_with_image(&out.bytes);
    assert_eq!(decoded.len(), 3);
    let delays_ms = decoded.iter().map(|(_, d)| *d).collect::<Vec<_>>();
    assert_eq!(delays_ms, vec![40, 250, 70]);
    for ((img, _), src) in decoded.iter().zip(&tile.frames) {
        assert_eq!(img, &src.image);
    }
    assert_eq!(read_repeat(&out.bytes), gif::Repeat::Infinite);
}

#[test]
fn every_frame_is_full_tile_and_disposes_to_background() {
    let tile = TileAnimation {
        spec: SPEC,
        frames: vec![solid([1, 2, 3, 255], 3), solid([4, 5, 6, 255], 3)],
    };
    let out = encoder(LoopCount::Infinite, SourceRepeat::Infinite)
        .encode(&tile)
        .unwrap();
    for (left, top, w, h, delay, dispose) in raw_descriptors(&out.bytes) {
        assert_eq!((left, top, w, h), (0, 0, 8, 4));
        assert_eq!(delay, 3);
        assert_eq!(dispose, gif::DisposalMethod::Background);
    }
}

#[test]
fn transparent_regions_do_not_show_earlier_frames() {
    let mut hole = solid([0, 200, 0, 255], 5);
    hole.image.put_pixel(0, 0, Rgba([0, 0, 0, 0]));
    let tile = TileAnimation {
        spec: SPEC,
        frames: vec![solid([200, 0, 0, 255], 5), hole],
    };
    let out = encoder(LoopCount::Infinite, SourceRepeat::Infinite)
        .encode(&tile)
        .unwrap();
    let decoded = read_with_image(&out.bytes);
    assert_eq!(decoded[1].0.get_pixel(0, 0).0[3], 0);
    assert_eq!(decoded[1].0.get_pixel(1, 0).0, [0, 200, 0, 255]);
}

#[test]
fn loop_count_options_resolve_against_source() {
    let tile = TileAnimation {
        spec: SPEC,
        frames: vec![solid([1, 1, 1, 255], 1)],
    };

    let finite = encoder(LoopCount::Finite(2), SourceRepeat::Infinite)
        .encode(&tile)
        .unwrap();
    assert_eq!(read_repeat(&finite.bytes), gif::Repeat::Finite(2));

    let matched = encoder(LoopCount::MatchSource, SourceRepeat::Finite(5))
        .encode(&tile)
        .unwrap();
    assert_eq!(read_repeat(&matched.bytes), gif::Repeat::Finite(5));

    let matched_inf = encoder(LoopCount::MatchSource, SourceRepeat::Infinite)
        .encode(&tile)
        .unwrap();
    assert_eq!(read_repeat(&matched_inf.bytes), gif::Repeat::Infinite);
}

#[test]
fn frame_size_disagreement_is_an_encode_error() {
    let mut tile = TileAnimation {
        spec: SPEC,
        frames: vec![solid([1, 1, 1, 255], 1)],
    };
    tile.frames.push(TileFrame {
        image: RgbaImage::new(4, 4),
        delay_centiseconds: 1,
    });
    let err = encoder(LoopCount::Infinite, SourceRepeat::Infinite)
        .encode(&tile)
        .unwrap_err();
    assert!(matches!(err, GridError::Encode(_)));
    assert!(err.to_string().contains("expected 8x4"));
}

#[test]
fn empty_tile_is_an_encode_error() {
    let tile = TileAnimation {
        spec: SPEC,
        frames: vec![],
    };
    let err = encoder(LoopCount::Infinite, SourceRepeat::Infinite)
        .encode(&tile)
        .unwrap_err();
    assert!(matches!(err, GridError::Encode(_)));
}

#[test]
fn speed_outside_quantizer_range_is_rejected() {
    for speed in [0, 31, -1] {
        let opts = EncodeOpts {
            speed,
            ..EncodeOpts::default()
        };
        let err = TileEncoder::new(&opts, SourceRepeat::Infinite).unwrap_err();
        assert!(matches!(err, GridError::Config(_)));
    }
    EncodeOpts::default().validate().unwrap();
}
