/// Rating every entity starts from once initialized. Group models are
/// born at this value; images map their seeding stars around it.
pub const DEFAULT_RATING: f64 = 1000.0;

/// Elo logistic scale: a 400-point gap means ~10:1 expected odds.
pub const ELO_SCALE: f64 = 400.0;

/// K-factor schedule, largest first. An entity's first matches move it
/// by up to 64 points; after 30 matches it settles at 24. Evaluated on
/// the match count *before* the increment.
pub const K_SCHEDULE: [(u32, f64); 3] = [(10, 64.0), (20, 48.0), (30, 32.0)];

/// K-factor once an entity has played out the schedule above.
pub const K_FLOOR: f64 = 24.0;

/// Rating distance beyond which a pairing scores zero closeness.
/// Pairs further apart than this are only ever selected when nothing
/// closer exists (their match-count term still ranks them).
pub const CLOSENESS_WINDOW: f64 = 1000.0;

/// Score multiplier applied when both candidates share a group.
/// Spreads comparisons across groups so group rankings are driven by
/// cross-group results rather than intra-group noise.
pub const SAME_GROUP_PENALTY: f64 = 0.9;

/// Sentinel group name for images known to carry no provenance, as
/// opposed to `""` (never scanned / ungrouped subset).
pub const NO_GROUP: &str = "NONE";

/// Hard cap on k-means iterations. The empty-cluster rule already
/// guarantees termination in practice; the cap makes it unconditional.
pub const KMEANS_MAX_ITERATIONS: usize = 100;

/// Tolerance for floating-point comparisons at quantile boundaries.
pub const QUANTILE_EPSILON: f64 = 1e-9;

/// Fixed labels for the 7-bucket pony scoring strategy.
pub const PONY_TAGS: [&str; 7] = [
    "score_3", "score_4", "score_5", "score_6", "score_7", "score_8", "score_9",
];

/// Default cut points for the 5-bucket custom quantile strategy:
/// bottom 10% / next 20% / middle 40% / next 20% / top 10%.
pub const CUSTOM_QUANTILES: [f64; 5] = [0.1, 0.3, 0.7, 0.9, 1.0];

/// Default normalized thresholds for the range-normalization strategy.
pub const DEFAULT_RANGE_THRESHOLDS: [f64; 4] = [0.15, 0.35, 0.65, 0.85];
