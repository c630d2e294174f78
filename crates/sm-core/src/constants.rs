/// Phase 1 completes after this many calendar days.
pub const PHASE1_THRESHOLD: u32 = 5;

/// Phase 2 completes after this many calendar days.
pub const PHASE2_THRESHOLD: u32 = 45;

/// Phase 1 repetitions per day, indexed by day (1-based) minus one.
/// Strictly decreasing by 5; there is no schedule beyond day 5.
pub const PHASE1_REPETITIONS: [u32; PHASE1_THRESHOLD as usize] = [25, 20, 15, 10, 5];
