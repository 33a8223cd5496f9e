//! Wind Range Algebra
//!
//! Circular-interval arithmetic over wind-from directions, used to chain
//! the wind constraints implied by consecutive maneuvers.
//!
//! - **range**: [`WindCourseRange`], [`IntersectedWindRange`] and the
//!   [`CombinationMode`] applied when two ranges fail to overlap

mod range;

pub use range::{CombinationMode, IntersectedWindRange, WindCourseRange};
