//! Analysis parameters from environment variables.
//!
//! Unset variables fall back to the documented defaults; a variable that is
//! set but cannot be parsed is an error.

use crate::application::analysis::AnalysisConfig;
use crate::application::clustering::{ClusteringConfig, DEFAULT_SEED};
use crate::domain::clustering::{ClusteringFamily, InformationCriterion};
use crate::domain::features::DegenerateColumnPolicy;
use anyhow::{Result, anyhow};
use std::env;
use std::fmt::Display;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisEnvConfig {
    pub init_period: usize,
    pub end_period: usize,
    pub family: ClusteringFamily,
    pub fixed_count: Option<usize>,
    pub max_count: usize,
    pub seed: u64,
    pub criterion: InformationCriterion,
    pub degenerate_policy: DegenerateColumnPolicy,
    pub align_timestamps: bool,
}

impl Default for AnalysisEnvConfig {
    fn default() -> Self {
        let analysis = AnalysisConfig::default();
        Self {
            init_period: analysis.init_period,
            end_period: analysis.end_period,
            family: analysis.clustering.family,
            fixed_count: analysis.clustering.fixed_count,
            max_count: analysis.clustering.max_count,
            seed: DEFAULT_SEED,
            criterion: analysis.clustering.criterion,
            degenerate_policy: analysis.degenerate_policy,
            align_timestamps: analysis.align_timestamps,
        }
    }
}

impl AnalysisEnvConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let fixed_count = match lookup("CLUSTER_COUNT") {
            Some(raw) if !raw.trim().is_empty() => Some(parse_value("CLUSTER_COUNT", &raw)?),
            _ => None,
        };

        let align_timestamps = match lookup("ALIGN_TIMESTAMPS") {
            Some(raw) => parse_bool("ALIGN_TIMESTAMPS", &raw)?,
            None => defaults.align_timestamps,
        };

        Ok(Self {
            init_period: parse_or(&lookup, "ER_INIT_PERIOD", defaults.init_period)?,
            end_period: parse_or(&lookup, "ER_END_PERIOD", defaults.end_period)?,
            family: parse_or(&lookup, "CLUSTER_FAMILY", defaults.family)?,
            fixed_count,
            max_count: parse_or(&lookup, "CLUSTER_MAX_COUNT", defaults.max_count)?,
            seed: parse_or(&lookup, "CLUSTER_SEED", defaults.seed)?,
            criterion: parse_or(&lookup, "GMM_CRITERION", defaults.criterion)?,
            degenerate_policy: parse_or(
                &lookup,
                "DEGENERATE_COLUMN_POLICY",
                defaults.degenerate_policy,
            )?,
            align_timestamps,
        })
    }

    pub fn to_analysis_config(&self) -> AnalysisConfig {
        let mut clustering = ClusteringConfig::for_family(self.family)
            .with_max_count(self.max_count)
            .with_seed(self.seed)
            .with_criterion(self.criterion);
        clustering.fixed_count = self.fixed_count;

        AnalysisConfig {
            init_period: self.init_period,
            end_period: self.end_period,
            clustering,
            degenerate_policy: self.degenerate_policy,
            align_timestamps: self.align_timestamps,
        }
    }
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| anyhow!("Failed to parse {}='{}': {}", key, raw, e))
}

fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => parse_value(key, &raw),
        None => Ok(default),
    }
}

fn parse_bool(key: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(anyhow!(
            "Failed to parse {}='{}': expected true or false",
            key,
            raw
        )),
    }
}
