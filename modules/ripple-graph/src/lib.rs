pub mod features;
pub mod graph;
pub mod ian;
pub mod sampler;
pub mod stats;
pub mod thread_index;
pub mod writer;

#[cfg(any(test, feature = "test-utils"))]
pub mod testutil;

pub use features::FeatureExtractor;
pub use graph::{InfluenceEdge, InfluenceGraph};
pub use ian::IanResolver;
pub use sampler::{PairSampler, SampleSet, SamplerStats};
pub use stats::CorpusStats;
pub use thread_index::ThreadIndex;
pub use writer::ArtifactWriter;
