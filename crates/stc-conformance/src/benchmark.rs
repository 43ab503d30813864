#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};
use stc_axis::{axis_sort, sort_all_axes};
use stc_ndarray::Region;
use stc_random::{DEFAULT_RNG_SEED, DeterministicRng};
use stc_search::search_with_stats;
use std::fs;
use std::path::Path;
use std::process::Command;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

const KEYS_PER_RUN: usize = 256;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PercentileSummary {
    pub p50_ms: f64,
    pub p95_ms: f64,
    pub p99_ms: f64,
    pub min_ms: f64,
    pub max_ms: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkWorkload {
    pub name: String,
    pub runs: usize,
    pub samples_ms: Vec<f64>,
    pub percentiles: PercentileSummary,
    /// Mean probes per search for search workloads, zero otherwise.
    pub mean_probes: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkBaseline {
    pub schema_version: u8,
    pub generated_at_unix_ms: u128,
    pub git_commit: String,
    pub workloads: Vec<BenchmarkWorkload>,
}

fn now_unix_ms() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis())
}

fn git_commit_short(repo_root: &Path) -> String {
    let output = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .current_dir(repo_root)
        .output();

    match output {
        Ok(out) if out.status.success() => String::from_utf8_lossy(&out.stdout).trim().to_string(),
        _ => "unknown".to_string(),
    }
}

fn percentile_index(len: usize, percentile_num: usize) -> usize {
    if len == 0 {
        return 0;
    }
    let last = len - 1;
    (last * percentile_num + 50) / 100
}

fn summarize_samples(samples: &[f64]) -> PercentileSummary {
    let mut sorted = samples.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let pick = |percentile: usize| {
        sorted
            .get(percentile_index(sorted.len(), percentile))
            .copied()
            .unwrap_or(0.0)
    };

    PercentileSummary {
        p50_ms: pick(50),
        p95_ms: pick(95),
        p99_ms: pick(99),
        min_ms: sorted.first().copied().unwrap_or(0.0),
        max_ms: sorted.last().copied().unwrap_or(0.0),
    }
}

fn time_workload<F>(name: &str, runs: usize, mut run_fn: F) -> Result<BenchmarkWorkload, String>
where
    F: FnMut() -> Result<usize, String>,
{
    let mut samples_ms = Vec::with_capacity(runs);
    let mut probes = 0usize;

    for _ in 0..runs {
        let start = Instant::now();
        probes += run_fn()?;
        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
        samples_ms.push(elapsed_ms);
    }

    let percentiles = summarize_samples(&samples_ms);
    let searches = runs * KEYS_PER_RUN;
    let mean_probes = if probes == 0 || searches == 0 {
        0.0
    } else {
        probes as f64 / searches as f64
    };

    Ok(BenchmarkWorkload {
        name: name.to_string(),
        runs,
        samples_ms,
        percentiles,
        mean_probes,
    })
}

/// Random per-axis sorted array plus a fixed batch of keys drawn from the same range.
fn staircase_fixture(sizes: &[usize], max_value: i64) -> Result<(Vec<i64>, Vec<i64>), String> {
    let mut rng = DeterministicRng::new(DEFAULT_RNG_SEED);
    let count = stc_ndarray::element_count(sizes).map_err(|err| err.to_string())?;
    let values = rng
        .fill_i64(count, 0, max_value)
        .map_err(|err| format!("benchmark values: {err}"))?;
    let sorted = sort_all_axes(&values, sizes).map_err(|err| format!("benchmark sort: {err}"))?;
    let keys = rng
        .fill_i64(KEYS_PER_RUN, 0, max_value)
        .map_err(|err| format!("benchmark keys: {err}"))?;
    Ok((sorted, keys))
}

fn search_workload(name: &str, sizes: &[usize], runs: usize) -> Result<BenchmarkWorkload, String> {
    // a value range wider than the element count keeps most keys absent or unique
    let count = i64::try_from(sizes.iter().product::<usize>())
        .map_err(|_| "benchmark array too large".to_string())?;
    let (values, keys) = staircase_fixture(sizes, count.saturating_mul(4))?;
    let region = Region::full(sizes);
    time_workload(name, runs, || {
        let mut probes = 0usize;
        for key in &keys {
            let outcome = search_with_stats(&values, sizes, &region, key);
            std::hint::black_box(outcome.found);
            probes += outcome.probes;
        }
        Ok(probes)
    })
}

pub fn generate_benchmark_baseline(
    repo_root: &Path,
    output_path: &Path,
) -> Result<BenchmarkBaseline, String> {
    let search_1d = search_workload("search_1d_65536", &[65_536], 20)?;
    let search_2d = search_workload("search_2d_256x256", &[256, 256], 20)?;
    let search_3d = search_workload("search_3d_40x40x40", &[40, 40, 40], 20)?;

    let sort_sizes = [40usize, 40, 40];
    let raw_values = DeterministicRng::new(DEFAULT_RNG_SEED)
        .fill_i64(sort_sizes.iter().product(), 0, 2000)
        .map_err(|err| format!("benchmark values: {err}"))?;
    let sort_axis2 = time_workload("axis_sort_axis2_40x40x40", 20, || {
        let out = axis_sort(&raw_values, &sort_sizes, 2)
            .map_err(|err| format!("axis sort failed: {err}"))?;
        std::hint::black_box(out[0]);
        Ok(0)
    })?;

    let baseline = BenchmarkBaseline {
        schema_version: 1,
        generated_at_unix_ms: now_unix_ms(),
        git_commit: git_commit_short(repo_root),
        workloads: vec![search_1d, search_2d, search_3d, sort_axis2],
    };

    if let Some(parent) = output_path.parent() {
        fs::create_dir_all(parent)
            .map_err(|err| format!("failed creating {}: {err}", parent.display()))?;
    }

    let raw = serde_json::to_string_pretty(&baseline)
        .map_err(|err| format!("failed serializing baseline: {err}"))?;
    fs::write(output_path, raw)
        .map_err(|err| format!("failed writing {}: {err}", output_path.display()))?;

    Ok(baseline)
}
