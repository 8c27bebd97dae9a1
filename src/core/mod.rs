/// Core functionality modules
///
/// Contains the palette's business logic: recency history, command sources,
/// matching, ranking and the query pipeline that ties them together.

pub mod aggregator;
pub mod candidate;
pub mod matcher;
pub mod pipeline;
pub mod ranking;
pub mod readiness;
pub mod recency;
pub mod registry;
pub mod runner;

pub use aggregator::{CandidateAggregator, LocalActionProvider, SourceKind};
pub use candidate::Candidate;
pub use pipeline::{KeybindingResolver, LastQuery, ResultPipeline};
pub use ranking::RankingPolicy;
pub use readiness::ReadinessGate;
pub use recency::{spawn_capacity_sync, RecencyStore};
pub use registry::{CommandDescriptor, CommandRegistry};
pub use runner::{CommandExecutor, CommandRunner, ExecutionError};
