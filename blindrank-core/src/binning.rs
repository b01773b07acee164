//! Binning strategies: continuous Elo ratings → discrete tags.
//!
//! Each strategy is one implementation of [`BinningStrategy`];
//! [`build_strategy`] turns parsed parameters into a boxed strategy,
//! rejecting malformed parameter shapes up front. Sample-size
//! preconditions are checked separately by `validate`, so a caller can
//! report "bad parameters" and "not enough rated images" distinctly.
//! A violation produces no partial output.

use std::collections::HashMap;

use crate::constants::{
    CUSTOM_QUANTILES, DEFAULT_RANGE_THRESHOLDS, PONY_TAGS, QUANTILE_EPSILON,
};
use crate::error::Error;
use crate::kmeans::kmeans_1d_capped;

/// Input to the binning engine: one rated image.
#[derive(Debug, Clone, PartialEq)]
pub struct RatedImage {
    pub name: String,
    pub rating: f64,
}

/// A stateless rating → tag transform.
pub trait BinningStrategy {
    fn name(&self) -> &'static str;

    /// Check the minimum-sample precondition for this strategy.
    fn validate(&self, sample_size: usize) -> Result<(), Error>;

    /// Assign a tag to every rated image. Callers run `validate`
    /// first; `assign` assumes the preconditions hold.
    fn assign(&self, rated: &[RatedImage]) -> HashMap<String, String>;
}

/// Parsed strategy parameters, one variant per strategy.
#[derive(Debug, Clone, PartialEq)]
pub enum StrategySpec {
    /// 5 buckets at cumulative quantiles 10/30/70/90/100%.
    CustomQuantile { tags: Vec<String> },
    /// Equal 7-way split with the fixed score_3..score_9 labels.
    PonyQuantile,
    /// Equal n-way quantile split.
    EqualQuantile { tags: Vec<String>, bins: usize },
    /// Bands at fixed multiples of the standard deviation.
    StdDev { tags: Vec<String> },
    /// Min-max normalize, then cut at fixed thresholds.
    RangeNormalization {
        tags: Vec<String>,
        /// Ascending values in [0, 1]; `None` uses the defaults.
        thresholds: Option<Vec<f64>>,
    },
    /// 1-D k-means, clusters ordered by centroid.
    KMeans { tags: Vec<String>, clusters: usize },
}

/// Validate parameter shape and construct the strategy.
pub fn build_strategy(spec: StrategySpec) -> Result<Box<dyn BinningStrategy>, Error> {
    match spec {
        StrategySpec::CustomQuantile { tags } => {
            if tags.len() != 5 {
                return Err(Error::validation(format!(
                    "custom quantile requires exactly 5 tag names, got {}",
                    tags.len()
                )));
            }
            Ok(Box::new(CustomQuantile { tags }))
        }
        StrategySpec::PonyQuantile => Ok(Box::new(PonyQuantile)),
        StrategySpec::EqualQuantile { tags, bins } => {
            if bins < 2 {
                return Err(Error::validation("number of bins must be at least 2"));
            }
            if tags.len() != bins {
                return Err(Error::validation(format!(
                    "number of tag names ({}) must match bins ({bins})",
                    tags.len()
                )));
            }
            Ok(Box::new(EqualQuantile { tags, bins }))
        }
        StrategySpec::StdDev { tags } => {
            if tags.len() != 5 && tags.len() != 7 {
                return Err(Error::validation(
                    "standard deviation strategy requires exactly 5 or 7 tag names",
                ));
            }
            Ok(Box::new(StdDev { tags }))
        }
        StrategySpec::RangeNormalization { tags, thresholds } => {
            let thresholds =
                thresholds.unwrap_or_else(|| DEFAULT_RANGE_THRESHOLDS.to_vec());
            if thresholds.is_empty() {
                return Err(Error::validation("at least one threshold is required"));
            }
            if thresholds.iter().any(|t| !(0.0..=1.0).contains(t)) {
                return Err(Error::validation("thresholds must lie within [0, 1]"));
            }
            if thresholds.windows(2).any(|w| w[0] >= w[1]) {
                return Err(Error::validation("thresholds must be strictly ascending"));
            }
            if tags.len() != thresholds.len() + 1 {
                return Err(Error::validation(format!(
                    "need {} tag names for {} thresholds, got {}",
                    thresholds.len() + 1,
                    thresholds.len(),
                    tags.len()
                )));
            }
            Ok(Box::new(RangeNormalization { tags, thresholds }))
        }
        StrategySpec::KMeans { tags, clusters } => {
            if clusters < 2 {
                return Err(Error::validation("number of clusters must be at least 2"));
            }
            if tags.len() != clusters {
                return Err(Error::validation(format!(
                    "number of tag names ({}) must match clusters ({clusters})",
                    tags.len()
                )));
            }
            Ok(Box::new(KMeans { tags, clusters }))
        }
    }
}

/// Build, validate against the sample, and assign in one call.
pub fn apply_strategy(
    spec: StrategySpec,
    rated: &[RatedImage],
) -> Result<HashMap<String, String>, Error> {
    let strategy = build_strategy(spec)?;
    strategy.validate(rated.len())?;
    Ok(strategy.assign(rated))
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

fn require_samples(strategy: &str, needed: usize, got: usize) -> Result<(), Error> {
    if got < needed {
        return Err(Error::validation(format!(
            "{strategy} needs at least {needed} rated images, got {got}"
        )));
    }
    Ok(())
}

/// Percentile rank of `score` within `sorted` (ascending): the last
/// index holding a value <= score, normalized to [0, 1]. Duplicate
/// ratings share the last-matching index, so ties always land in the
/// same bucket.
fn percentile_rank(sorted: &[f64], score: f64) -> f64 {
    let last_idx = sorted.partition_point(|&x| x <= score).saturating_sub(1);
    if sorted.len() <= 1 {
        1.0
    } else {
        last_idx as f64 / (sorted.len() - 1) as f64
    }
}

/// First tag whose cumulative cut point covers the percentile.
fn tag_for_percentile<'t>(percentile: f64, cut_points: &[f64], tags: &'t [String]) -> &'t str {
    for (i, &cut) in cut_points.iter().enumerate() {
        if percentile <= cut + QUANTILE_EPSILON {
            return &tags[i];
        }
    }
    &tags[tags.len() - 1]
}

fn assign_by_quantiles(
    rated: &[RatedImage],
    tags: &[String],
    cut_points: &[f64],
) -> HashMap<String, String> {
    let mut sorted: Vec<f64> = rated.iter().map(|img| img.rating).collect();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    rated
        .iter()
        .map(|img| {
            let percentile = percentile_rank(&sorted, img.rating);
            (
                img.name.clone(),
                tag_for_percentile(percentile, cut_points, tags).to_string(),
            )
        })
        .collect()
}

fn mean_and_stddev(values: &[f64]) -> (f64, f64) {
    let n = values.len();
    if n == 0 {
        return (0.0, 0.0);
    }
    let mean = values.iter().sum::<f64>() / n as f64;
    if n == 1 {
        return (mean, 0.0);
    }
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n as f64;
    (mean, variance.sqrt())
}

fn middle_tag(tags: &[String]) -> &str {
    &tags[tags.len() / 2]
}

// ---------------------------------------------------------------------------
// Strategy implementations
// ---------------------------------------------------------------------------

struct CustomQuantile {
    tags: Vec<String>,
}

impl BinningStrategy for CustomQuantile {
    fn name(&self) -> &'static str {
        "customQuantile"
    }

    fn validate(&self, sample_size: usize) -> Result<(), Error> {
        require_samples(self.name(), 5, sample_size)
    }

    fn assign(&self, rated: &[RatedImage]) -> HashMap<String, String> {
        assign_by_quantiles(rated, &self.tags, &CUSTOM_QUANTILES)
    }
}

struct PonyQuantile;

impl BinningStrategy for PonyQuantile {
    fn name(&self) -> &'static str {
        "ponyQuantile"
    }

    fn validate(&self, sample_size: usize) -> Result<(), Error> {
        require_samples(self.name(), 7, sample_size)
    }

    fn assign(&self, rated: &[RatedImage]) -> HashMap<String, String> {
        let tags: Vec<String> = PONY_TAGS.iter().map(|t| t.to_string()).collect();
        let cut_points: Vec<f64> = (1..=7).map(|i| i as f64 / 7.0).collect();
        assign_by_quantiles(rated, &tags, &cut_points)
    }
}

struct EqualQuantile {
    tags: Vec<String>,
    bins: usize,
}

impl BinningStrategy for EqualQuantile {
    fn name(&self) -> &'static str {
        "equalQuantile"
    }

    fn validate(&self, sample_size: usize) -> Result<(), Error> {
        require_samples(self.name(), self.bins, sample_size)
    }

    fn assign(&self, rated: &[RatedImage]) -> HashMap<String, String> {
        let cut_points: Vec<f64> = (1..=self.bins)
            .map(|i| i as f64 / self.bins as f64)
            .collect();
        assign_by_quantiles(rated, &self.tags, &cut_points)
    }
}

struct StdDev {
    tags: Vec<String>,
}

impl StdDev {
    fn band(&self, score: f64, mean: f64, stddev: f64) -> &str {
        if stddev == 0.0 {
            return middle_tag(&self.tags);
        }
        let tags = &self.tags;
        if tags.len() == 5 {
            if score < mean - 1.5 * stddev {
                &tags[0]
            } else if score < mean - 0.5 * stddev {
                &tags[1]
            } else if score <= mean + 0.5 * stddev {
                &tags[2]
            } else if score <= mean + 1.5 * stddev {
                &tags[3]
            } else {
                &tags[4]
            }
        } else {
            if score < mean - 1.75 * stddev {
                &tags[0]
            } else if score < mean - 1.0 * stddev {
                &tags[1]
            } else if score < mean - 0.25 * stddev {
                &tags[2]
            } else if score <= mean + 0.25 * stddev {
                &tags[3]
            } else if score <= mean + 1.0 * stddev {
                &tags[4]
            } else if score <= mean + 1.75 * stddev {
                &tags[5]
            } else {
                &tags[6]
            }
        }
    }
}

impl BinningStrategy for StdDev {
    fn name(&self) -> &'static str {
        "stdDev"
    }

    fn validate(&self, sample_size: usize) -> Result<(), Error> {
        require_samples(self.name(), 2, sample_size)
    }

    fn assign(&self, rated: &[RatedImage]) -> HashMap<String, String> {
        let scores: Vec<f64> = rated.iter().map(|img| img.rating).collect();
        let (mean, stddev) = mean_and_stddev(&scores);
        rated
            .iter()
            .map(|img| {
                (
                    img.name.clone(),
                    self.band(img.rating, mean, stddev).to_string(),
                )
            })
            .collect()
    }
}

struct RangeNormalization {
    tags: Vec<String>,
    thresholds: Vec<f64>,
}

impl BinningStrategy for RangeNormalization {
    fn name(&self) -> &'static str {
        "rangeNormalization"
    }

    fn validate(&self, sample_size: usize) -> Result<(), Error> {
        require_samples(self.name(), 2, sample_size)
    }

    fn assign(&self, rated: &[RatedImage]) -> HashMap<String, String> {
        let min = rated.iter().map(|img| img.rating).fold(f64::INFINITY, f64::min);
        let max = rated
            .iter()
            .map(|img| img.rating)
            .fold(f64::NEG_INFINITY, f64::max);

        rated
            .iter()
            .map(|img| {
                let tag = if max == min {
                    middle_tag(&self.tags)
                } else {
                    let normalized = (img.rating - min) / (max - min);
                    self.thresholds
                        .iter()
                        .position(|&t| normalized <= t + QUANTILE_EPSILON)
                        .map(|i| self.tags[i].as_str())
                        .unwrap_or_else(|| &self.tags[self.tags.len() - 1])
                };
                (img.name.clone(), tag.to_string())
            })
            .collect()
    }
}

struct KMeans {
    tags: Vec<String>,
    clusters: usize,
}

impl BinningStrategy for KMeans {
    fn name(&self) -> &'static str {
        "kmeans"
    }

    fn validate(&self, sample_size: usize) -> Result<(), Error> {
        require_samples(self.name(), self.clusters, sample_size)
    }

    fn assign(&self, rated: &[RatedImage]) -> HashMap<String, String> {
        let data: Vec<f64> = rated.iter().map(|img| img.rating).collect();
        let result = kmeans_1d_capped(&data, self.clusters);

        // Order clusters by centroid so the first tag always means the
        // lowest-rated cluster, whatever raw index k-means produced.
        let mut order: Vec<usize> = (0..self.clusters).collect();
        order.sort_by(|&a, &b| {
            result.centroids[a]
                .partial_cmp(&result.centroids[b])
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        let mut tag_of_cluster = vec![0usize; self.clusters];
        for (tag_idx, &cluster) in order.iter().enumerate() {
            tag_of_cluster[cluster] = tag_idx;
        }

        rated
            .iter()
            .zip(result.assignments.iter())
            .map(|(img, &cluster)| {
                (img.name.clone(), self.tags[tag_of_cluster[cluster]].clone())
            })
            .collect()
    }
}
