// Pipeline orchestration and result aggregation
pub mod analysis;

// Clustering strategies and cluster-count selection
pub mod clustering;

// Efficiency-ratio feature extraction
pub mod features;
