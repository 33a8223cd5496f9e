//! Mark Passing Detection
//!
//! Streaming detection of when each competitor passes each waypoint.
//!
//! - **finder**: [`CandidateFinder`] turns fix batches into candidate deltas
//! - **chooser**: [`CandidateChooser`] resolves candidates into one ordered
//!   passing per waypoint, with fixed and suppressed passings
//! - **store**: [`MarkPassingStore`], the shared result with change
//!   subscriptions
//! - **calculator**: [`MarkPassingCalculator`] wires both stages to a
//!   [`TrackedRace`](crate::race::TrackedRace)

mod calculator;
mod candidate;
mod chooser;
mod finder;
mod store;

pub use calculator::{MarkPassingCalculator, MarkPassingSettings};
pub use candidate::{Candidate, CandidateDelta, CandidateKey, CandidateOrigin, MarkPassing};
pub use chooser::{CandidateChooser, ChooserSettings};
pub use finder::{CandidateFinder, FinderSettings};
pub use store::{CompetitorPassings, MarkPassingStore, MarkPassingUpdate, Subscription};
