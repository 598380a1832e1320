// Cluster families, selection outcomes, assignments
pub mod clustering;

// Domain-specific error types
pub mod errors;

// Efficiency-ratio feature tables
pub mod features;

// Price series and timestamp alignment
pub mod market;

// Port interfaces
pub mod ports;
