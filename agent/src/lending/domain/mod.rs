pub mod depth;
pub mod duration;
pub mod lend_cap;
pub mod min_size;
pub mod orders;
pub mod policy;
pub mod rate;

pub use depth::{
    DEFAULT_REQUEST_DEPTH, DepthOutcome, DepthRateFinder, DepthUnits, MAX_REQUEST_DEPTH,
    RequestDepthTable,
};
pub use duration::{DEFAULT_DURATION_DAYS, DurationPlanner, END_OF_SERVICE_MARGIN_DAYS};
pub use lend_cap::amount_to_lend;
pub use min_size::MinSizeLearner;
pub use orders::{OrderBuilder, OrderIntent, split_amount};
pub use policy::{
    ActiveLimit, BiasRange, CoinPolicy, DurationThreshold, GapMode, LendingStrategy, MAX_SPREAD,
    MIN_SPREAD, PolicyStore,
};
pub use rate::{BIAS_STEPS, BiasCycle, RateDecider, RateDecision, RateOutcome};
