//! Scenario driver for the U-turn engine: plans a single turn from a JSON
//! description, or walks a simulated vehicle through one.

pub mod plan;
pub mod scenario;
pub mod walk;

pub use plan::{plan, PlanReport};
pub use scenario::Scenario;
pub use uturn_core::Strategy;
pub use walk::{walk, WalkReport};
