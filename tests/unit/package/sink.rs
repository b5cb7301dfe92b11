use super::*;
use crate::profile::table::ProfileTable;

fn mini() -> DeviceProfile {
    ProfileTable::builtin().get("mini").unwrap().clone()
}

fn tiles_for(profile: &DeviceProfile) -> Vec<EncodedTile> {
    (0..profile.rows)
        .flat_map(|row| (0..profile.cols).map(move |col| (row, col)))
        .map(|(row, col)| EncodedTile {
            row,
            col,
            bytes: vec![row as u8, col as u8],
        })
        .collect()
}

#[derive(Default)]
struct FailingSink {
    fail_at: usize,
    pushed: usize,
    aborted: bool,
    ended: bool,
}

impl TileSink for FailingSink {
    fn begin(&mut self, _cfg: SinkConfig) -> GridResult<()> {
        Ok(())
    }

    fn push_tile(&mut self, _tile: &EncodedTile) -> GridResult<()> {
        if self.pushed == self.fail_at {
            return Err(GridError::resource("disk full"));
        }
        self.pushed += 1;
        Ok(())
    }

    fn end(&mut self) -> GridResult<()> {
        self.ended = true;
        Ok(())
    }

    fn abort(&mut self) {
        self.aborted = true;
    }
}

#[test]
fn names_are_one_indexed_and_cells_are_col_row() {
    assert_eq!(tile_file_name(0, 0, TILE_EXTENSION), "tile_r1_c1.gif");
    assert_eq!(tile_file_name(3, 7, "gif"), "tile_r4_c8.gif");
    assert_eq!(profile_cell_key(0, 0), "0,0");
    assert_eq!(profile_cell_key(1, 4), "4,1");
}

#[test]
fn delivers_complete_set_in_row_major_order() {
    let profile = mini();
    let tiles = tiles_for(&profile);
    let mut sink = InMemoryTileSink::new();
    deliver_tiles(&tiles, &profile, &mut sink).unwrap();

    assert!(sink.is_finished());
    let cfg = sink.config().unwrap();
    assert_eq!(cfg.tile_count, 6);
    assert_eq!(cfg.profile.name, "mini");
    let names = sink.files().iter().map(|(n, _)| n.as_str()).collect::<Vec<_>>();
    assert_eq!(
        names,
        vec![
            "tile_r1_c1.gif",
            "tile_r1_c2.gif",
            "tile_r1_c3.gif",
            "tile_r2_c1.gif",
            "tile_r2_c2.gif",
            "tile_r2_c3.gif",
        ]
    );
    assert_eq!(sink.files()[4].1, vec![1, 1]);
}

#[test]
fn partial_sets_are_rejected_before_begin() {
    let profile = mini();
    let mut tiles = tiles_for(&profile);
    tiles.pop();
    let mut sink = InMemoryTileSink::new();
    let err = deliver_tiles(&tiles, &profile, &mut sink).unwrap_err();
    assert!(matches!(err, GridError::Invariant(_)));
    assert!(sink.config().is_none());
    assert!(sink.files().is_empty());
}

#[test]
fn out_of_order_tiles_are_rejected() {
    let profile = mini();
    let mut tiles = tiles_for(&profile);
    tiles.swap(0, 1);
    let mut sink = InMemoryTileSink::new();
    let err = deliver_tiles(&tiles, &profile, &mut sink).unwrap_err();
    assert!(matches!(err, GridError::Invariant(_)));
    assert!(!sink.is_finished());
}

#[test]
fn failing_sink_is_aborted_and_never_ended() {
    let profile = mini();
    let tiles = tiles_for(&profile);
    let mut sink = FailingSink {
        fail_at: 3,
        ..FailingSink::default()
    };
    let err = deliver_tiles(&tiles, &profile, &mut sink).unwrap_err();
    assert!(err.to_string().contains("disk full"));
    assert!(sink.aborted);
    assert!(!sink.ended);
    assert_eq!(sink.pushed, 3);
}
