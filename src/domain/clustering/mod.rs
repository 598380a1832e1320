pub mod assignment;
pub mod family;
pub mod selection;

pub use assignment::{AssignmentRow, ClusterAssignment, ClusterSummary};
pub use family::{ClusteringFamily, InformationCriterion};
pub use selection::{CountSelection, DegradedReason, SelectionConfidence, SelectionMethod};
