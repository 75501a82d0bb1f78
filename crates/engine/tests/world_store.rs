//! WorldStore tests: coordinate normalization, column queries, snapshots,
//! live-chunk membership and the player index. All block values are opaque.

use cubopolis_engine::world::block::{Block, BlockError};
use cubopolis_engine::world::chunk::Chunk;
use cubopolis_engine::world::players::PlayerId;
use cubopolis_engine::world::position::{ChunkPos, LocalCell, Position};
use cubopolis_engine::world::snapshot::ChunkSnapshot;
use cubopolis_engine::world::WorldStore;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn block(token: &str) -> Block {
    Block::new(token).unwrap()
}

/// A snapshot with a single column of solid cells at `(y, x)`, z in `zs`.
fn column(y: i64, x: i64, zs: &[u32]) -> ChunkSnapshot {
    let mut snapshot = ChunkSnapshot::default();
    for &z in zs {
        snapshot.push(LocalCell::new(y, x, z), block("1"));
    }
    snapshot
}

// ---------------------------------------------------------------------------
// Coordinates
// ---------------------------------------------------------------------------

#[test]
fn clamp_carries_into_chunk_index() {
    let world = WorldStore::new(16);
    let p = world.clamp_coordinates(Position::new(0, 0, 3, -1, 16));
    assert_eq!(p, Position::new(-1, 1, 3, 15, 0));

    let p = world.clamp_coordinates(Position::new(2, -2, 0, 40, -33));
    assert_eq!(p, Position::new(4, -5, 0, 8, 15));
}

#[test]
fn clamp_is_bounded_and_lossless() {
    let size = 16;
    let world = WorldStore::new(size);
    let inputs = [-1_000_003i64, -257, -17, -16, -1, 0, 1, 15, 16, 31, 32, 999_999];
    for &cy in &[-3i64, 0, 7] {
        for &y in &inputs {
            for &x in &inputs {
                let raw = Position::new(cy, -cy, 1, y, x);
                let p = world.clamp_coordinates(raw);
                assert!((0..size as i64).contains(&p.y), "y out of bounds for {raw:?}");
                assert!((0..size as i64).contains(&p.x), "x out of bounds for {raw:?}");
                assert_eq!(p.world_yx(size), raw.world_yx(size), "displacement lost for {raw:?}");
                assert_eq!(p.z, raw.z);
            }
        }
    }
}

#[test]
fn offset_steps_across_chunk_edges() {
    let p = Position::new(0, 0, 2, 0, 15).offset(-1, 1, 16);
    assert_eq!(p, Position::new(-1, 1, 2, 15, 0));
}

#[test]
fn extreme_offsets_saturate_instead_of_overflowing() {
    let p = Position::new(0, 0, 1, 3, 3).offset(i64::MAX, i64::MIN, 16);
    assert!((0..16).contains(&p.y));
    assert!((0..16).contains(&p.x));
    assert_eq!(p.z, 1);

    let p = Position::new(i64::MAX, i64::MIN, 0, 40, -40).normalized(16);
    assert_eq!(p, Position::new(i64::MAX, i64::MIN, 0, 8, 8));
}

// ---------------------------------------------------------------------------
// Floor / ceiling
// ---------------------------------------------------------------------------

#[test]
fn single_block_floor_and_ceiling() {
    let world = WorldStore::new(16);
    world.set_chunk(ChunkPos::new(0, 0), &column(0, 0, &[0]));

    let at = Position::new(0, 0, 5, 0, 0);
    assert_eq!(world.floor(at), 0);
    assert_eq!(world.ceiling(at), 1);
}

#[test]
fn floor_stops_at_first_solid_cell() {
    let world = WorldStore::new(16);
    world.set_chunk(ChunkPos::new(0, 0), &column(2, 3, &[0, 1, 2, 6]));

    assert_eq!(world.floor(Position::new(0, 0, 9, 2, 3)), 6);
    assert_eq!(world.floor(Position::new(0, 0, 5, 2, 3)), 2);
    // Standing inside the stack: floor is the cell itself.
    assert_eq!(world.floor(Position::new(0, 0, 1, 2, 3)), 1);
}

#[test]
fn ceiling_climbs_the_contiguous_stack_only() {
    let world = WorldStore::new(16);
    world.set_chunk(ChunkPos::new(0, 0), &column(2, 3, &[0, 1, 2, 6]));

    assert_eq!(world.ceiling(Position::new(0, 0, 4, 2, 3)), 3);
    assert_eq!(world.ceiling(Position::new(0, 0, 1, 2, 3)), 3);
    assert_eq!(world.ceiling(Position::new(0, 0, 12, 2, 3)), 7);
}

#[test]
fn empty_column_rests_at_zero() {
    let world = WorldStore::new(16);
    world.set_chunk(ChunkPos::new(0, 0), &ChunkSnapshot::default());
    let at = Position::new(0, 0, 8, 4, 4);
    assert_eq!(world.floor(at), 0);
    assert_eq!(world.ceiling(at), 0);

    // Unknown chunk behaves the same.
    let far = Position::new(9, 9, 8, 4, 4);
    assert_eq!(world.floor(far), 0);
    assert_eq!(world.ceiling(far), 0);
}

#[test]
fn ceiling_is_idempotent() {
    let world = WorldStore::new(8);
    let mut snapshot = ChunkSnapshot::default();
    for (y, x, zs) in [(0, 0, vec![0u32, 1]), (1, 1, vec![3, 4, 5]), (2, 2, vec![0, 2, 3]), (3, 3, vec![])] {
        for z in zs {
            snapshot.push(LocalCell::new(y, x, z), block("7"));
        }
    }
    world.set_chunk(ChunkPos::new(0, 0), &snapshot);

    for y in 0..4 {
        for start in 0..12 {
            let at = Position::new(0, 0, start, y, y);
            let rest = world.ceiling(at);
            assert_eq!(world.ceiling(at.with_z(rest)), rest, "column {y}, start {start}");
        }
    }
}

#[test]
fn ceiling_of_full_column_is_depth() {
    let world = WorldStore::with_depth(4, 3);
    world.set_chunk(ChunkPos::new(0, 0), &column(1, 1, &[0, 1, 2]));
    let at = Position::new(0, 0, 50, 1, 1);
    assert_eq!(world.floor(at), 2);
    assert_eq!(world.ceiling(at), 3);
    assert_eq!(world.column_height(ChunkPos::new(0, 0), 1, 1), 3);
}

// ---------------------------------------------------------------------------
// Chunks and cells
// ---------------------------------------------------------------------------

#[test]
fn set_chunk_replaces_wholesale() {
    let world = WorldStore::new(16);
    let pos = ChunkPos::new(1, -1);
    world.set_chunk(pos, &column(0, 0, &[0, 1]));
    world.set_chunk(pos, &column(5, 5, &[0]));

    assert_eq!(world.get_cell(Position::new(1, -1, 0, 0, 0)), None);
    assert_eq!(world.get_cell(Position::new(1, -1, 0, 5, 5)), Some(block("1")));
    assert_eq!(world.chunk_count(), 1);
}

#[test]
fn set_cell_requires_resident_chunk() {
    let world = WorldStore::new(16);
    let cell = Position::new(0, 0, 2, 3, 4);
    assert!(!world.set_cell(cell, Some(block("5"))));
    assert_eq!(world.get_cell(cell), None);

    world.set_chunk(ChunkPos::new(0, 0), &ChunkSnapshot::default());
    assert!(world.set_cell(cell, Some(block("5"))));
    assert_eq!(world.get_cell(cell), Some(block("5")));

    assert!(world.set_cell(cell, None));
    assert_eq!(world.get_cell(cell), None);

    // Outside the chunk's depth.
    assert!(!world.set_cell(cell.with_z(17), Some(block("5"))));
}

#[test]
fn chunk_cells_read_through_chunk_ref() {
    let world = WorldStore::new(16);
    world.set_chunk(ChunkPos::new(0, 0), &column(3, 4, &[2]));
    let chunk = world.get_chunk(&ChunkPos::new(0, 0)).unwrap();
    assert_eq!(chunk.get(LocalCell::new(3, 4, 2)), Some(&block("1")));
    assert_eq!(chunk.get(LocalCell::new(3, 4, 1)), None);
    assert_eq!(chunk.get(LocalCell::new(-1, 4, 2)), None);
}

#[test]
fn oversized_snapshot_cells_are_dropped() {
    let world = WorldStore::with_depth(4, 4);
    let mut snapshot = column(0, 0, &[0, 9]);
    snapshot.push(LocalCell::new(7, 0, 0), block("2"));
    world.set_chunk(ChunkPos::new(0, 0), &snapshot);

    let chunk = world.get_chunk(&ChunkPos::new(0, 0)).unwrap();
    assert_eq!(chunk.to_snapshot(), column(0, 0, &[0]));
}

#[test]
fn pending_chunks_clear_on_arrival() {
    let world = WorldStore::new(16);
    let pos = ChunkPos::new(2, 2);
    assert!(!world.has_or_pending_chunk(pos));

    world.mark_pending(pos);
    assert!(world.has_or_pending_chunk(pos));
    assert!(!world.has_chunk(pos));

    world.set_chunk(pos, &ChunkSnapshot::default());
    assert!(world.has_chunk(pos));
    world.retain_chunks(&[]);
    assert!(!world.has_or_pending_chunk(pos));
}

#[test]
fn retain_chunks_evicts_chunks_and_their_players() {
    let world = WorldStore::new(16);
    let keep = ChunkPos::new(0, 0);
    let drop = ChunkPos::new(0, 1);
    world.set_chunk(keep, &ChunkSnapshot::default());
    world.set_chunk(drop, &ChunkSnapshot::default());
    world.mark_pending(ChunkPos::new(5, 5));

    world.player_moved(PlayerId(1), Position::new(0, 0, 0, 1, 1));
    world.player_moved(PlayerId(2), Position::new(0, 1, 0, 1, 1));

    let evicted = world.retain_chunks(&[keep]);
    assert_eq!(evicted, vec![(PlayerId(2), Position::new(0, 1, 0, 1, 1))]);
    assert!(world.has_chunk(keep));
    assert!(!world.has_chunk(drop));
    assert!(!world.has_or_pending_chunk(ChunkPos::new(5, 5)));
    assert_eq!(world.player_count(), 1);
    assert_eq!(world.occupied_cell_count(), 1);
}

#[test]
fn column_height_of_unknown_column_is_zero() {
    let world = WorldStore::new(16);
    assert_eq!(world.column_height(ChunkPos::new(0, 0), 0, 0), 0);
    world.set_chunk(ChunkPos::new(0, 0), &column(0, 0, &[0, 4]));
    assert_eq!(world.column_height(ChunkPos::new(0, 0), 0, 0), 5);
}

// ---------------------------------------------------------------------------
// Blocks
// ---------------------------------------------------------------------------

#[test]
fn legacy_zero_marker_is_empty() {
    assert_eq!(Block::from_token("0"), None);
    assert_eq!(Block::from_token(""), None);
    assert_eq!(Block::from_token("00").map(|b| b.to_string()), Some("00".to_string()));
    assert_eq!(Block::new("0"), Err(BlockError::Empty));
    assert!(matches!(Block::new("a b"), Err(BlockError::Reserved(_))));
    assert!(matches!(Block::new("1,2"), Err(BlockError::Reserved(_))));
}

// ---------------------------------------------------------------------------
// Snapshots
// ---------------------------------------------------------------------------

#[test]
fn unpack_reads_rows_columns_and_stacks() {
    let snapshot = ChunkSnapshot::unpack("1,2|,3#|4");
    let cells: Vec<(LocalCell, &str)> = snapshot
        .cells()
        .iter()
        .map(|(c, b)| (*c, b.as_str()))
        .collect();
    assert_eq!(
        cells,
        vec![
            (LocalCell::new(0, 0, 0), "1"),
            (LocalCell::new(0, 0, 1), "2"),
            (LocalCell::new(0, 1, 1), "3"),
            (LocalCell::new(1, 1, 0), "4"),
        ]
    );
}

#[test]
fn unpack_keeps_trailing_unterminated_value() {
    let snapshot = ChunkSnapshot::unpack("5,,12");
    assert_eq!(snapshot.len(), 2);
    assert_eq!(snapshot.cells()[1], (LocalCell::new(0, 0, 2), block("12")));
}

#[test]
fn unpack_normalizes_legacy_zero() {
    let snapshot = ChunkSnapshot::unpack("0,0,3|0");
    assert_eq!(snapshot.cells(), &[(LocalCell::new(0, 0, 2), block("3"))]);
}

#[test]
fn pack_then_unpack_reproduces_every_cell() {
    let mut chunk = Chunk::new(6, 7);
    let placed = [
        (LocalCell::new(0, 0, 0), "1"),
        (LocalCell::new(0, 0, 3), "22"),
        (LocalCell::new(2, 5, 6), "x"),
        (LocalCell::new(4, 1, 2), "9"),
        (LocalCell::new(5, 5, 0), "end"),
    ];
    for (cell, token) in placed {
        assert!(chunk.set(cell, Some(block(token))));
    }

    let packed = chunk.to_snapshot().pack();
    assert!(packed.ends_with("end"), "last value is unterminated: {packed}");

    let (restored, dropped) = Chunk::from_snapshot(&ChunkSnapshot::unpack(&packed), 6, 7);
    assert_eq!(dropped, 0);
    assert_eq!(restored.to_snapshot(), chunk.to_snapshot());
}

#[test]
fn pack_of_empty_snapshot_is_empty() {
    assert_eq!(ChunkSnapshot::default().pack(), "");
    assert!(ChunkSnapshot::unpack("").is_empty());
}

// ---------------------------------------------------------------------------
// Live chunks
// ---------------------------------------------------------------------------

#[test]
fn live_chunks_replace_wholesale() {
    let world = WorldStore::new(16);
    world.set_live_chunks([ChunkPos::new(0, 0), ChunkPos::new(0, 1)]);
    assert!(world.is_live_chunk(ChunkPos::new(0, 1)));

    world.set_live_chunks([ChunkPos::new(3, 3)]);
    assert!(!world.is_live_chunk(ChunkPos::new(0, 0)));
    assert!(!world.is_live_chunk(ChunkPos::new(0, 1)));
    assert_eq!(world.live_chunks(), vec![ChunkPos::new(3, 3)]);

    world.set_live_chunks(Vec::<ChunkPos>::new());
    assert!(world.live_chunks().is_empty());
}

// ---------------------------------------------------------------------------
// Player index
// ---------------------------------------------------------------------------

#[test]
fn player_move_leaves_no_trace_behind() {
    let world = WorldStore::new(16);
    let id = PlayerId(42);
    let a = Position::new(0, 0, 1, 2, 3);
    let b = Position::new(0, 1, 1, 2, 3);

    assert_eq!(world.player_moved(id, a), None);
    assert_eq!(world.player_moved(id, b), Some(a));

    assert!(world.players_at(a).is_empty());
    assert_eq!(world.players_at(b), vec![id]);
    assert_eq!(world.occupied_cell_count(), 1);

    assert_eq!(world.remove_player(id), Some(b));
    assert!(world.players_at(b).is_empty());
    assert_eq!(world.player_position(id), None);
    assert_eq!(world.occupied_cell_count(), 0);
}

#[test]
fn players_share_a_cell() {
    let world = WorldStore::new(16);
    let cell = Position::new(0, 0, 1, 1, 1);
    world.player_moved(PlayerId(3), cell);
    world.player_moved(PlayerId(1), cell);
    assert_eq!(world.players_at(cell), vec![PlayerId(1), PlayerId(3)]);

    world.remove_player(PlayerId(3));
    assert_eq!(world.players_at(cell), vec![PlayerId(1)]);
}

#[test]
fn removing_unknown_player_is_not_found() {
    let world = WorldStore::new(16);
    assert_eq!(world.remove_player(PlayerId(7)), None);
    assert_eq!(world.player_count(), 0);
}
