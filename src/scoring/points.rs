//! Finishing rank to race points.

/// Points for ranks 1 through 12. Any other rank scores nothing.
pub const RACE_POINT_TABLE: [i64; 12] = [15, 12, 10, 9, 8, 7, 6, 5, 4, 3, 2, 1];

/// Returns the race points awarded for a finishing rank.
pub fn points_for_rank(rank: i64) -> i64 {
    if rank < 1 {
        return 0;
    }
    usize::try_from(rank - 1)
        .ok()
        .and_then(|idx| RACE_POINT_TABLE.get(idx).copied())
        .unwrap_or(0)
}
