#![forbid(unsafe_code)]

pub mod benchmark;
pub mod differential;

use crate::differential::{DifferentialProfile, run_differential, write_differential_report};
use serde::{Deserialize, Serialize};
use stc_axis::{find_staircase_violation, sort_array_all_axes};
use stc_ndarray::{DenseArray, Region};
use stc_random::entropy_seed;
use stc_search::search_with_stats;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};

pub const SEED_ENV_VAR: &str = "STC_HARNESS_SEED";
pub const TRIAL_LOG_ENV_VAR: &str = "STC_TRIAL_LOG_PATH";

#[derive(Debug, Clone)]
pub struct HarnessConfig {
    pub fixture_root: PathBuf,
    pub report_root: PathBuf,
    /// Pinned seed; `None` draws one from entropy per run.
    pub seed: Option<u64>,
    pub profiles: Vec<DifferentialProfile>,
}

impl HarnessConfig {
    #[must_use]
    pub fn default_paths() -> Self {
        let repo_root = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../..");
        Self {
            fixture_root: PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures"),
            report_root: repo_root.join("artifacts/reports"),
            seed: seed_from_env(),
            profiles: DifferentialProfile::reference_set(),
        }
    }

    /// Same profiles with every trial count replaced.
    #[must_use]
    pub fn with_trials(mut self, trials: usize) -> Self {
        for profile in &mut self.profiles {
            profile.trials = trials;
        }
        self
    }

    #[must_use]
    pub fn resolved_seed(&self) -> u64 {
        self.seed.unwrap_or_else(entropy_seed)
    }
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self::default_paths()
    }
}

fn seed_from_env() -> Option<u64> {
    let raw = std::env::var(SEED_ENV_VAR).ok()?;
    let raw = raw.trim();
    match raw.strip_prefix("0x") {
        Some(hex) => u64::from_str_radix(hex, 16).ok(),
        None => raw.parse().ok(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessReport {
    pub suite: &'static str,
    pub fixture_count: usize,
    pub profile_count: usize,
    pub seed_pinned: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuiteReport {
    pub suite: &'static str,
    pub case_count: usize,
    pub pass_count: usize,
    pub failures: Vec<String>,
}

impl SuiteReport {
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.case_count == self.pass_count && self.failures.is_empty()
    }
}

#[derive(Debug, Clone, Deserialize)]
struct RegionFixture {
    start: Vec<usize>,
    end: Vec<usize>,
}

#[derive(Debug, Clone, Deserialize)]
struct SearchScenarioCase {
    id: String,
    sizes: Vec<usize>,
    values: Vec<i64>,
    #[serde(default)]
    sort_axes: bool,
    #[serde(default)]
    expected_sorted: Option<Vec<i64>>,
    #[serde(default)]
    region: Option<RegionFixture>,
    key: i64,
    expected: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct TrialLogEntry {
    pub(crate) suite: &'static str,
    pub(crate) dims: usize,
    pub(crate) trial: usize,
    pub(crate) seed: u64,
    pub(crate) sizes: Vec<usize>,
    pub(crate) key: i64,
    pub(crate) expected: bool,
    pub(crate) actual: bool,
    pub(crate) probes: usize,
    pub(crate) reason_code: String,
    pub(crate) passed: bool,
}

static TRIAL_LOG_PATH: OnceLock<Mutex<Option<PathBuf>>> = OnceLock::new();

pub fn set_trial_log_path(path: Option<PathBuf>) {
    let cell = TRIAL_LOG_PATH.get_or_init(|| Mutex::new(None));
    if let Ok(mut slot) = cell.lock() {
        *slot = path;
    }
}

#[must_use]
pub fn run_smoke(config: &HarnessConfig) -> HarnessReport {
    let fixture_count = fs::read_dir(&config.fixture_root)
        .ok()
        .into_iter()
        .flat_map(|it| it.filter_map(Result::ok))
        .count();

    HarnessReport {
        suite: "smoke",
        fixture_count,
        profile_count: config.profiles.len(),
        seed_pinned: config.seed.is_some(),
    }
}

fn load_search_scenarios(fixture_root: &Path) -> Result<Vec<SearchScenarioCase>, String> {
    let path = fixture_root.join("search_scenarios.json");
    let raw = fs::read_to_string(&path)
        .map_err(|err| format!("failed reading {}: {err}", path.display()))?;
    serde_json::from_str(&raw).map_err(|err| format!("invalid json: {err}"))
}

/// Fixed scenarios with known answers, checked both against the fixture and a
/// linear scan of the searched region.
pub fn run_search_scenario_suite(config: &HarnessConfig) -> Result<SuiteReport, String> {
    let cases = load_search_scenarios(&config.fixture_root)?;

    let mut report = SuiteReport {
        suite: "search_scenarios",
        case_count: cases.len(),
        pass_count: 0,
        failures: Vec::new(),
    };

    for case in cases {
        let failures = evaluate_search_scenario(&case);
        if failures.is_empty() {
            report.pass_count += 1;
        }
        report.failures.extend(failures);
    }

    Ok(report)
}

fn evaluate_search_scenario(case: &SearchScenarioCase) -> Vec<String> {
    let mut failures = Vec::new();
    let mut array = match DenseArray::new(case.sizes.clone(), case.values.clone()) {
        Ok(array) => array,
        Err(err) => {
            failures.push(format!("{}: invalid array: {err}", case.id));
            return failures;
        }
    };

    if case.sort_axes {
        if let Err(err) = sort_array_all_axes(&mut array) {
            failures.push(format!("{}: axis sort failed: {err}", case.id));
            return failures;
        }
    }
    if let Some(expected_sorted) = &case.expected_sorted
        && array.values() != expected_sorted.as_slice()
    {
        failures.push(format!(
            "{}: sorted layout mismatch expected={expected_sorted:?} actual={:?}",
            case.id,
            array.values()
        ));
    }
    match find_staircase_violation(array.values(), array.sizes()) {
        Ok(None) => {}
        Ok(Some(violation)) => failures.push(format!(
            "{}: staircase violated on axis {} at flat index {}",
            case.id, violation.axis, violation.flat_index
        )),
        Err(err) => failures.push(format!("{}: {err}", case.id)),
    }

    let region = match &case.region {
        Some(fixture) => match Region::new(fixture.start.clone(), fixture.end.clone())
            .and_then(|region| region.validate_within(array.sizes()).map(|()| region))
        {
            Ok(region) => region,
            Err(err) => {
                failures.push(format!("{}: invalid region: {err}", case.id));
                return failures;
            }
        },
        None => array.full_region(),
    };

    let outcome = search_with_stats(array.values(), array.sizes(), &region, &case.key);
    let scanned = linear_scan(&array, &region, case.key);
    if outcome.found != case.expected {
        failures.push(format!(
            "{}: key={} expected={} actual={}",
            case.id, case.key, case.expected, outcome.found
        ));
    }
    if scanned != case.expected {
        failures.push(format!(
            "{}: fixture disagrees with linear scan key={} scan={scanned}",
            case.id, case.key
        ));
    }
    failures
}

/// Visits every element of `region` in flat order.
fn linear_scan(array: &DenseArray<i64>, region: &Region, key: i64) -> bool {
    let mut coord = region.start().to_vec();
    for _ in 0..region.elem_count() {
        if array.get(&coord) == Some(&key) {
            return true;
        }
        for axis in 0..coord.len() {
            coord[axis] += 1;
            if coord[axis] < region.end()[axis] {
                break;
            }
            coord[axis] = region.start()[axis];
        }
    }
    false
}

/// Randomized differential suite. Writes `differential_report.json` under the
/// report root.
pub fn run_differential_suite(config: &HarnessConfig) -> Result<SuiteReport, String> {
    let seed = config.resolved_seed();
    let report = run_differential(&config.profiles, seed)?;
    write_differential_report(&config.report_root.join("differential_report.json"), &report)?;

    let failures = report
        .profiles
        .iter()
        .filter_map(|profile| {
            let mismatch = profile.mismatch.as_ref()?;
            Some(format!(
                "dims={}: root_seed={seed} trial={} trial_seed={} sizes={:?} key={} expected={} actual={} reason_code={}",
                profile.profile.dims,
                mismatch.trial,
                mismatch.seed,
                mismatch.sizes,
                mismatch.key,
                mismatch.expected,
                mismatch.actual,
                mismatch.reason_code
            ))
        })
        .collect::<Vec<_>>();

    Ok(SuiteReport {
        suite: "staircase_differential",
        case_count: report.profiles.len(),
        pass_count: report.profiles.iter().filter(|p| p.passed()).count(),
        failures,
    })
}

pub fn run_all_core_suites(config: &HarnessConfig) -> Result<Vec<SuiteReport>, String> {
    Ok(vec![
        run_search_scenario_suite(config)?,
        run_differential_suite(config)?,
    ])
}

pub(crate) fn maybe_append_trial_log(entry: &TrialLogEntry) -> Result<(), String> {
    let configured = TRIAL_LOG_PATH
        .get()
        .and_then(|cell| cell.lock().ok())
        .and_then(|slot| slot.clone());
    let from_env = std::env::var_os(TRIAL_LOG_ENV_VAR).map(PathBuf::from);
    let Some(path) = configured.or(from_env) else {
        return Ok(());
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|err| format!("failed creating {}: {err}", parent.display()))?;
    }

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|err| format!("failed opening {}: {err}", path.display()))?;
    let line = serde_json::to_string(entry)
        .map_err(|err| format!("failed serializing trial log entry: {err}"))?;
    let mut payload = line.into_bytes();
    payload.push(b'\n');
    file.write_all(&payload)
        .map_err(|err| format!("failed appending trial log {}: {err}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::{
        HarnessConfig, SuiteReport, linear_scan, run_differential_suite, run_search_scenario_suite,
        run_smoke, set_trial_log_path,
    };
    use stc_ndarray::{DenseArray, Region};
    use crate::differential::DifferentialProfile;
    use serde_json::Value;
    use std::fs;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_dir(name: &str) -> PathBuf {
        let ts = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_nanos());
        std::env::temp_dir().join(format!("stc_{name}_{ts}"))
    }

    #[test]
    fn linear_scan_stays_inside_region() {
        // 4x3, axis 0 fastest; value = 10 * y + x
        let values: Vec<i64> = (0..3).flat_map(|y| (0..4).map(move |x| 10 * y + x)).collect();
        let array = DenseArray::new(vec![4, 3], values).expect("array");
        let region = Region::new(vec![1, 1], vec![3, 3]).expect("region");
        for key in [11, 12, 21, 22] {
            assert!(linear_scan(&array, &region, key), "key={key}");
        }
        for key in [0, 10, 13, 20, 23, 3] {
            assert!(!linear_scan(&array, &region, key), "key={key}");
        }
        assert!(linear_scan(&array, &array.full_region(), 23));

        let empty = Region::new(vec![2, 0], vec![2, 3]).expect("empty region");
        assert!(!linear_scan(&array, &empty, 20));
    }

    fn quick_config(report_root: PathBuf) -> HarnessConfig {
        let mut cfg = HarnessConfig::default_paths().with_trials(200);
        cfg.report_root = report_root;
        cfg.seed = Some(0x5EED);
        cfg
    }

    #[test]
    fn smoke_harness_finds_fixtures() {
        let cfg = HarnessConfig::default_paths();
        let report = run_smoke(&cfg);
        assert_eq!(report.suite, "smoke");
        assert!(report.fixture_count >= 1, "expected at least one fixture");
        assert_eq!(report.profile_count, 3);
    }

    #[test]
    fn search_scenarios_are_green() {
        let cfg = HarnessConfig::default_paths();
        let suite = run_search_scenario_suite(&cfg).expect("scenario suite should run");
        assert!(suite.case_count >= 6);
        assert!(suite.all_passed(), "failures={:?}", suite.failures);
    }

    #[test]
    fn scenario_suite_errors_when_fixture_missing() {
        let mut cfg = HarnessConfig::default_paths();
        cfg.fixture_root =
            PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures/does_not_exist");
        let err = run_search_scenario_suite(&cfg).expect_err("missing fixture");
        assert!(err.contains("failed reading"));
    }

    #[test]
    fn differential_suite_writes_report() {
        let root = temp_dir("report");
        let cfg = quick_config(root.clone());
        let suite = run_differential_suite(&cfg).expect("differential suite should run");
        assert!(suite.all_passed(), "failures={:?}", suite.failures);
        assert_eq!(suite.case_count, 3);

        let raw = fs::read_to_string(root.join("differential_report.json")).expect("report");
        let parsed: Value = serde_json::from_str(&raw).expect("report json");
        assert_eq!(parsed["seed"], 0x5EED);
        assert_eq!(parsed["profiles"].as_array().map(Vec::len), Some(3));
        let _ = fs::remove_dir_all(root);
    }

    #[test]
    fn trial_log_records_every_trial() {
        let root = temp_dir("trial_log");
        let log_path = root.join("trials.jsonl");
        let mut cfg = quick_config(root.clone());
        cfg.profiles = vec![DifferentialProfile {
            dims: 2,
            trials: 25,
            min_size: 1,
            max_size: 8,
            min_value: 0,
            max_value: 30,
        }];

        set_trial_log_path(Some(log_path.clone()));
        let suite = run_differential_suite(&cfg);
        set_trial_log_path(None);
        let suite: SuiteReport = suite.expect("suite should run");
        assert!(suite.all_passed());

        let raw = fs::read_to_string(&log_path).expect("trial log");
        let entries = raw
            .lines()
            .map(|line| serde_json::from_str::<Value>(line).expect("jsonl entry"))
            .filter(|entry| entry["dims"] == 2 && entry["suite"] == "staircase_differential")
            .collect::<Vec<_>>();
        assert!(entries.len() >= 25);
        assert!(entries.iter().all(|entry| entry["passed"] == true));
        let _ = fs::remove_dir_all(root);
    }
}
