#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

/// The parameters of the default registration pipeline.
///
/// [`Icp::from_settings`](crate::Icp::from_settings) builds every default collaborator from
/// these values. Fields missing from a serialized configuration fall back to their defaults.
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct IcpSettings {
    /// The number of reference neighbors matched to every reading point
    #[cfg_attr(feature = "serde-serialize", serde(default = "default_knn"))]
    pub knn: usize,
    /// The fraction of closest correspondences kept by the trimmed distance outlier filter
    #[cfg_attr(feature = "serde-serialize", serde(default = "default_trimmed_ratio"))]
    pub trimmed_ratio: f64,
    /// The maximum number of iterations
    #[cfg_attr(feature = "serde-serialize", serde(default = "default_max_iterations"))]
    pub max_iterations: usize,
    /// The mean rotation change (radians) below which the registration has converged
    #[cfg_attr(
        feature = "serde-serialize",
        serde(default = "default_min_diff_rot_err")
    )]
    pub min_diff_rot_err: f64,
    /// The mean translation change below which the registration has converged
    #[cfg_attr(
        feature = "serde-serialize",
        serde(default = "default_min_diff_trans_err")
    )]
    pub min_diff_trans_err: f64,
    /// The number of successive changes averaged to detect convergence
    #[cfg_attr(feature = "serde-serialize", serde(default = "default_smooth_length"))]
    pub smooth_length: usize,
    /// The probability that a reading point survives preprocessing
    #[cfg_attr(
        feature = "serde-serialize",
        serde(default = "default_reading_sampling_prob")
    )]
    pub reading_sampling_prob: f64,
    /// The maximum number of reference points in a surface normal bin
    #[cfg_attr(
        feature = "serde-serialize",
        serde(default = "default_reference_normal_knn")
    )]
    pub reference_normal_knn: usize,
    /// The fraction of every surface normal bin that is kept in the reference
    #[cfg_attr(
        feature = "serde-serialize",
        serde(default = "default_reference_sampling_ratio")
    )]
    pub reference_sampling_ratio: f64,
    /// The seed of the random sampling done during preprocessing
    #[cfg_attr(feature = "serde-serialize", serde(default = "default_seed"))]
    pub seed: u64,
}

impl Default for IcpSettings {
    fn default() -> Self {
        Self {
            knn: default_knn(),
            trimmed_ratio: default_trimmed_ratio(),
            max_iterations: default_max_iterations(),
            min_diff_rot_err: default_min_diff_rot_err(),
            min_diff_trans_err: default_min_diff_trans_err(),
            smooth_length: default_smooth_length(),
            reading_sampling_prob: default_reading_sampling_prob(),
            reference_normal_knn: default_reference_normal_knn(),
            reference_sampling_ratio: default_reference_sampling_ratio(),
            seed: default_seed(),
        }
    }
}

fn default_knn() -> usize {
    1
}

fn default_trimmed_ratio() -> f64 {
    0.85
}

fn default_max_iterations() -> usize {
    40
}

fn default_min_diff_rot_err() -> f64 {
    0.001
}

fn default_min_diff_trans_err() -> f64 {
    0.001
}

fn default_smooth_length() -> usize {
    3
}

fn default_reading_sampling_prob() -> f64 {
    0.75
}

fn default_reference_normal_knn() -> usize {
    7
}

fn default_reference_sampling_ratio() -> f64 {
    0.5
}

fn default_seed() -> u64 {
    0
}
