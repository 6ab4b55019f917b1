//! Staleness sampling and series merging.

pub mod merger;
pub mod sampler;

pub use merger::{reconcile_series, MergeOutcome, SeriesMerger};
pub use sampler::{
    Decision, SampleVerdict, SamplingDecision, StalenessSampler, DEFAULT_SAMPLE_SIZE,
};
