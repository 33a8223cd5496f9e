//! Maneuver-based wind inference
//!
//! Turns a chronological sequence of classified maneuvers into a layered
//! graph and decodes the most plausible classification path, which in turn
//! pins down the wind direction at each maneuver.
//!
//! # Architecture
//!
//! - **types**: maneuver input, hypotheses as a sum type, the wind range
//!   provider seam and its geometric default
//! - **graph**: [`GraphLevel`]/[`GraphNode`] arena ([`ManeuverGraph`]) with
//!   confidence normalization and the penalty circle upgrade
//! - **transition**: pluggable transition probabilities between levels
//! - **best_paths**: forward/backward decoder ([`BestPathsCalculator`])
//!
//! # Usage
//!
//! ```rust
//! use regatta_core::geo::SpeedWithBearing;
//! use regatta_core::maneuver::{
//!     BestPathsCalculator, GeometricWindRangeProvider, IntersectionTransitionCalculator,
//!     ManeuverForEstimation, ManeuverGraph, ManeuverTypeLikelihoods,
//! };
//!
//! let provider = GeometricWindRangeProvider::default();
//! let mut graph = ManeuverGraph::new();
//! graph.push_maneuver(
//!     ManeuverForEstimation {
//!         time: 0,
//!         position: None,
//!         speed_before: SpeedWithBearing::new(6.0, 315.0),
//!         speed_after: SpeedWithBearing::new(6.0, 45.0),
//!         course_change: 90.0,
//!         middle_course: 0.0,
//!     },
//!     &ManeuverTypeLikelihoods::new(0.8, 0.1, 0.05, 0.05),
//!     &provider,
//! );
//!
//! let mut calculator = BestPathsCalculator::new(IntersectionTransitionCalculator::default(), false);
//! calculator.compute_best_paths_from_scratch(&graph).unwrap();
//! let path = calculator.get_best_path(&graph).unwrap();
//! assert_eq!(path.len(), 1);
//! ```

mod best_paths;
mod graph;
mod transition;
mod types;

pub use best_paths::{
    BestManeuverNodeInfo, BestPathsCalculator, CalculatorState, GraphLevelInference,
};
pub use graph::{GraphLevel, GraphNode, ManeuverGraph, PENALTY_CIRCLE_BONUS};
pub use transition::{
    wind_shift_penalty, GraphNodeTransitionProbabilitiesCalculator,
    IntersectionTransitionCalculator, TransitionSettings,
};
pub use types::{
    GeometricWindRangeProvider, ManeuverForEstimation, ManeuverHypothesis, ManeuverTypeLikelihoods,
    Tack, WindRangeProvider, WindRangeSettings,
};
