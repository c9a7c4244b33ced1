pub mod histogram;
pub mod interactions;
pub mod invalidation;
pub mod peaks;
pub mod pipeline;
pub mod pivots;
pub mod smoothing;
pub mod weighting;
