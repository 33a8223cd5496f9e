//! # Regatta Core
//!
//! Race analysis for GPS-tracked sailing races: detects when each
//! competitor passes each waypoint of the course, and infers the wind
//! direction from the sequence of maneuvers the boats sailed.
//!
//! The crate is pure computation with **no I/O**. The host feeds fixes and
//! maneuvers in and decides threading, storage and presentation.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  regatta-core                                                │
//! │  ├── geo/track/course/race  (positions, fixes, waypoints)    │
//! │  ├── markpassing/  finder ─► chooser ─► MarkPassingStore     │
//! │  ├── wind/         (circular wind range algebra)             │
//! │  └── maneuver/     graph ─► BestPathsCalculator              │
//! └──────────────────────────────────────────────────────────────┘
//!                              ▲
//!                 ┌────────────┴────────────┐
//!                 │  regatta-analyzer       │
//!                 │  (CLI, JSON in and out) │
//!                 └─────────────────────────┘
//! ```
//!
//! ## Key Modules
//!
//! - [`geo`] - Positions, great-circle geometry, unit conversion
//! - [`track`] - Shared, time-ordered GPS fix storage
//! - [`course`] - Waypoints and passing instructions
//! - [`race`] - A course plus competitor and mark tracks
//! - [`markpassing`] - Incremental mark passing detection
//! - [`wind`] - Wind course ranges and their intersection
//! - [`maneuver`] - Maneuver graph and the best-path decoder
//!
//! ## Example: Mark Passings
//!
//! ```rust
//! use regatta_core::course::{Course, Waypoint};
//! use regatta_core::geo::Position;
//! use regatta_core::markpassing::{MarkPassingCalculator, MarkPassingSettings};
//! use regatta_core::race::TrackedRace;
//! use regatta_core::track::GpsFix;
//! use std::sync::Arc;
//!
//! let mut race = TrackedRace::new(Course::new(vec![Waypoint::new("Start", &["pin", "rc"])]));
//! race.add_mark("pin").add_fix(GpsFix::new(Position::new(0.0, 0.0), 0));
//! race.add_mark("rc").add_fix(GpsFix::new(Position::new(0.0, 0.001), 0));
//! race.add_competitor("GER 1");
//!
//! let mut calculator = MarkPassingCalculator::new(Arc::new(race), MarkPassingSettings::default());
//! calculator
//!     .add_competitor_fixes(
//!         "GER 1",
//!         &[
//!             GpsFix::new(Position::new(-0.0005, 0.0005), 90_000),
//!             GpsFix::new(Position::new(0.0005, 0.0005), 110_000),
//!         ],
//!     )
//!     .unwrap();
//! let start = calculator.store().passing("GER 1", 0).unwrap();
//! assert_eq!(start.time, 100_000);
//! ```

pub mod course;
pub mod error;
pub mod geo;
pub mod maneuver;
pub mod markpassing;
pub mod race;
pub mod track;
pub mod wind;

// Re-export commonly used types
pub use course::{Course, PassingInstruction, Waypoint};
pub use error::{CourseError, InferenceError};
pub use geo::{Position, SpeedWithBearing};
pub use maneuver::{BestPathsCalculator, GraphLevelInference, ManeuverGraph};
pub use markpassing::{MarkPassing, MarkPassingCalculator, MarkPassingStore};
pub use race::TrackedRace;
pub use track::{GpsFix, GpsTrack, TimePoint};
pub use wind::{CombinationMode, IntersectedWindRange, WindCourseRange};
