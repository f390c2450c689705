pub mod results;
pub mod runner;
pub mod scorer;
pub mod sweep;

pub use results::{NegativesRow, SweepRow};
pub use runner::{run_configuration, RunOutcome};
pub use scorer::{CommandScorer, ScoreRequest, Scorer};
pub use sweep::{Corpus, Experiment, SweepReport};
