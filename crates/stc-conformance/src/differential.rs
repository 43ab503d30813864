#![forbid(unsafe_code)]

//! Randomized differential trials: staircase search against a linear scan.

use crate::{TrialLogEntry, maybe_append_trial_log};
use serde::{Deserialize, Serialize};
use stc_axis::{find_staircase_violation, sort_array_all_axes};
use stc_ndarray::DenseArray;
use stc_random::DeterministicRng;
use stc_search::search_with_stats;
use std::fs;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

pub const DIFFERENTIAL_REASON_CODES: [&str; 2] = [
    "search_brute_force_disagreement",
    "axis_sort_staircase_violation",
];

/// Random-trial distribution for one dimension count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DifferentialProfile {
    pub dims: usize,
    pub trials: usize,
    /// Inclusive per-axis size bounds.
    pub min_size: usize,
    pub max_size: usize,
    /// Inclusive value bounds; keys are drawn from the same range.
    pub min_value: i64,
    pub max_value: i64,
}

impl DifferentialProfile {
    /// 1D, 2D and 3D profiles, 10,000 trials each.
    #[must_use]
    pub fn reference_set() -> Vec<Self> {
        vec![
            Self {
                dims: 1,
                trials: 10_000,
                min_size: 10,
                max_size: 1000,
                min_value: 0,
                max_value: 2000,
            },
            Self {
                dims: 2,
                trials: 10_000,
                min_size: 5,
                max_size: 100,
                min_value: 0,
                max_value: 2000,
            },
            Self {
                dims: 3,
                trials: 10_000,
                min_size: 2,
                max_size: 20,
                min_value: 0,
                max_value: 2000,
            },
        ]
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.dims == 0 {
            return Err("profile dims must be >= 1".to_string());
        }
        if self.min_size > self.max_size {
            return Err(format!(
                "profile dims={} has min_size {} > max_size {}",
                self.dims, self.min_size, self.max_size
            ));
        }
        if self.min_value > self.max_value {
            return Err(format!(
                "profile dims={} has min_value {} > max_value {}",
                self.dims, self.min_value, self.max_value
            ));
        }
        let largest = u32::try_from(self.dims)
            .ok()
            .and_then(|dims| self.max_size.checked_pow(dims));
        if largest.is_none() {
            return Err(format!(
                "profile dims={} max_size={} overflows the element count",
                self.dims, self.max_size
            ));
        }
        Ok(())
    }
}

/// One generated trial, before axis sorting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialCase {
    pub trial: usize,
    pub seed: u64,
    pub sizes: Vec<usize>,
    pub values: Vec<i64>,
    pub key: i64,
}

pub fn generate_trial(
    profile: &DifferentialProfile,
    trial: usize,
    seed: u64,
) -> Result<TrialCase, String> {
    let mut rng = DeterministicRng::new(seed);
    let sizes = (0..profile.dims)
        .map(|_| rng.uniform_usize(profile.min_size, profile.max_size))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|err| format!("trial {trial}: size draw failed: {err}"))?;
    let count = stc_ndarray::element_count(&sizes)
        .map_err(|err| format!("trial {trial}: {err}"))?;
    let values = rng
        .fill_i64(count, profile.min_value, profile.max_value)
        .map_err(|err| format!("trial {trial}: value draw failed: {err}"))?;
    let key = rng
        .uniform_i64(profile.min_value, profile.max_value)
        .map_err(|err| format!("trial {trial}: key draw failed: {err}"))?;
    Ok(TrialCase {
        trial,
        seed,
        sizes,
        values,
        key,
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialOutcome {
    pub trial: usize,
    pub seed: u64,
    pub sizes: Vec<usize>,
    pub key: i64,
    pub expected: bool,
    pub actual: bool,
    pub probes: usize,
    pub peak_pending: usize,
    pub staircase_violation_axis: Option<usize>,
}

impl TrialOutcome {
    #[must_use]
    pub fn passed(&self) -> bool {
        self.expected == self.actual && self.staircase_violation_axis.is_none()
    }

    #[must_use]
    pub fn reason_code(&self) -> &'static str {
        if self.staircase_violation_axis.is_some() {
            "axis_sort_staircase_violation"
        } else {
            "search_brute_force_disagreement"
        }
    }
}

/// Sorts every axis, searches the full region and compares with a linear scan.
pub fn execute_trial(case: &TrialCase) -> Result<TrialOutcome, String> {
    let mut array = DenseArray::new(case.sizes.clone(), case.values.clone())
        .map_err(|err| format!("trial {}: {err}", case.trial))?;
    sort_array_all_axes(&mut array).map_err(|err| format!("trial {}: {err}", case.trial))?;

    let violation = find_staircase_violation(array.values(), array.sizes())
        .map_err(|err| format!("trial {}: {err}", case.trial))?;
    let outcome = search_with_stats(
        array.values(),
        array.sizes(),
        &array.full_region(),
        &case.key,
    );
    let expected = array.values().iter().any(|&value| value == case.key);

    Ok(TrialOutcome {
        trial: case.trial,
        seed: case.seed,
        sizes: case.sizes.clone(),
        key: case.key,
        expected,
        actual: outcome.found,
        probes: outcome.probes,
        peak_pending: outcome.peak_pending,
        staircase_violation_axis: violation.map(|v| v.axis),
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DifferentialMismatch {
    pub trial: usize,
    pub seed: u64,
    pub sizes: Vec<usize>,
    pub key: i64,
    pub expected: bool,
    pub actual: bool,
    pub reason_code: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileReport {
    pub profile: DifferentialProfile,
    pub seed: u64,
    pub trials_run: usize,
    pub found_count: usize,
    pub total_elements: u64,
    pub total_probes: u64,
    pub max_probes: usize,
    pub max_peak_pending: usize,
    pub mean_probes: f64,
    pub mean_elements: f64,
    /// First disagreement; remaining trials are skipped once one is seen.
    pub mismatch: Option<DifferentialMismatch>,
}

impl ProfileReport {
    #[must_use]
    pub fn passed(&self) -> bool {
        self.mismatch.is_none() && self.trials_run == self.profile.trials
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DifferentialReport {
    pub schema_version: u8,
    pub generated_at_unix_ms: u128,
    pub seed: u64,
    pub profiles: Vec<ProfileReport>,
}

impl DifferentialReport {
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.profiles.iter().all(ProfileReport::passed)
    }
}

/// Runs every trial of `profile`, stopping at the first disagreement.
pub fn run_profile(profile: &DifferentialProfile, seed: u64) -> Result<ProfileReport, String> {
    profile.validate()?;
    let mut rng = DeterministicRng::new(seed);
    let mut report = ProfileReport {
        profile: profile.clone(),
        seed,
        trials_run: 0,
        found_count: 0,
        total_elements: 0,
        total_probes: 0,
        max_probes: 0,
        max_peak_pending: 0,
        mean_probes: 0.0,
        mean_elements: 0.0,
        mismatch: None,
    };

    for trial in 0..profile.trials {
        let case = generate_trial(profile, trial, rng.fork_seed())?;
        let outcome = execute_trial(&case)?;

        report.trials_run += 1;
        report.found_count += usize::from(outcome.expected);
        report.total_elements += case.values.len() as u64;
        report.total_probes += outcome.probes as u64;
        report.max_probes = report.max_probes.max(outcome.probes);
        report.max_peak_pending = report.max_peak_pending.max(outcome.peak_pending);

        maybe_append_trial_log(&TrialLogEntry {
            suite: "staircase_differential",
            dims: profile.dims,
            trial,
            seed: case.seed,
            sizes: case.sizes.clone(),
            key: case.key,
            expected: outcome.expected,
            actual: outcome.actual,
            probes: outcome.probes,
            reason_code: outcome.reason_code().to_string(),
            passed: outcome.passed(),
        })?;

        if !outcome.passed() {
            report.mismatch = Some(DifferentialMismatch {
                trial,
                seed: case.seed,
                sizes: case.sizes,
                key: case.key,
                expected: outcome.expected,
                actual: outcome.actual,
                reason_code: outcome.reason_code().to_string(),
            });
            break;
        }
    }

    if report.trials_run > 0 {
        let trials = report.trials_run as f64;
        report.mean_probes = report.total_probes as f64 / trials;
        report.mean_elements = report.total_elements as f64 / trials;
    }
    Ok(report)
}

/// Runs every profile from one root seed; each profile gets a forked seed.
pub fn run_differential(
    profiles: &[DifferentialProfile],
    seed: u64,
) -> Result<DifferentialReport, String> {
    let mut root = DeterministicRng::new(seed);
    let mut reports = Vec::with_capacity(profiles.len());
    for profile in profiles {
        reports.push(run_profile(profile, root.fork_seed())?);
    }
    Ok(DifferentialReport {
        schema_version: 1,
        generated_at_unix_ms: SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_millis()),
        seed,
        profiles: reports,
    })
}

pub fn write_differential_report(path: &Path, report: &DifferentialReport) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|err| format!("failed creating {}: {err}", parent.display()))?;
    }
    let raw = serde_json::to_string_pretty(report)
        .map_err(|err| format!("failed serializing differential report: {err}"))?;
    fs::write(path, raw).map_err(|err| format!("failed writing {}: {err}", path.display()))
}
