//! Scoring policy constants with hot-reload from config/scoring.json.
//!
//! The weight table has no "correct" value from first principles; it is a
//! tuning artifact. Everything lives in one struct so tests can pin it and
//! operators can adjust it without touching scoring logic.
//!
//! JSON shape (all fields optional, defaults below):
//! {
//!   "w_geography": 20.0,
//!   "w_stage": 25.0,
//!   "w_needs": 25.0,
//!   "w_industry": 10.0,
//!   "w_amount": 20.0,
//!   "urgency_bonus": 10.0,
//!   "urgency_window_days": 30,
//!   "adjacent_stage_factor": 0.5,
//!   "partial_amount_factor": 0.5
//! }
//!
//! On each `current()` call we check the file's modified time and reload if changed.

use serde::Deserialize;
use std::{
    fs, io,
    path::{Path, PathBuf},
    sync::RwLock,
    time::SystemTime,
};

/// Fixed weight table plus the policy knobs of individual criteria.
/// Constant across requests; identical inputs always score identically.
#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(default)]
pub struct ScorePolicy {
    pub w_geography: f32,
    pub w_stage: f32,
    pub w_needs: f32,
    pub w_industry: f32,
    pub w_amount: f32,
    /// Maximum urgency contribution in score points, added on top of the
    /// weighted mean so a missing deadline stays strictly neutral.
    pub urgency_bonus: f32,
    /// Deadlines further out than this many days earn no bonus.
    pub urgency_window_days: i64,
    /// Sub-score for a stage one step away on the ordered scale.
    pub adjacent_stage_factor: f32,
    /// Sub-score for a half-open requested range that intersects the
    /// instrument range without either containing the other.
    pub partial_amount_factor: f32,
}

impl Default for ScorePolicy {
    fn default() -> Self {
        Self {
            w_geography: 20.0,
            w_stage: 25.0,
            w_needs: 25.0,
            w_industry: 10.0,
            w_amount: 20.0,
            urgency_bonus: 10.0,
            urgency_window_days: 30,
            adjacent_stage_factor: 0.5,
            partial_amount_factor: 0.5,
        }
    }
}

/// Hot-reload wrapper: reloads when the config file mtime changes.
#[derive(Debug)]
pub struct HotReloadPolicy {
    path: PathBuf,
    inner: RwLock<State>,
}

#[derive(Debug)]
struct State {
    policy: ScorePolicy,
    last_modified: Option<SystemTime>,
}

impl HotReloadPolicy {
    /// Create with a path (defaults to "config/scoring.json" if `None`).
    pub fn new(path: Option<&Path>) -> Self {
        let path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("config/scoring.json"));
        let policy = load_policy_file(&path).unwrap_or_default();
        let last_modified = fs::metadata(&path).and_then(|m| m.modified()).ok();
        Self {
            path,
            inner: RwLock::new(State {
                policy,
                last_modified,
            }),
        }
    }

    /// Get the latest policy, reloading if the config file changed.
    pub fn current(&self) -> ScorePolicy {
        let needs_reload = match fs::metadata(&self.path).and_then(|m| m.modified()) {
            Ok(mtime) => {
                let guard = self.inner.read().expect("policy lock poisoned");
                guard.last_modified != Some(mtime)
            }
            // File missing: keep whatever we have (defaults at worst).
            Err(_) => false,
        };

        if !needs_reload {
            return self.inner.read().expect("policy lock poisoned").policy;
        }

        let mut guard = self.inner.write().expect("policy lock poisoned");
        if let Ok(mtime) = fs::metadata(&self.path).and_then(|m| m.modified()) {
            if guard.last_modified != Some(mtime) {
                if let Ok(p) = load_policy_file(&self.path) {
                    guard.policy = p;
                    guard.last_modified = Some(mtime);
                }
            }
        }
        guard.policy
    }
}

/// Load the policy directly (no caching). Public for tests/tools.
pub fn load_policy_file(path: &Path) -> io::Result<ScorePolicy> {
    let bytes = fs::read(path)?;
    let p: ScorePolicy = serde_json::from_slice(&bytes)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    Ok(p)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::{io::Write, thread, time::Duration};

    /// Create a unique temporary directory in std::env::temp_dir().
    fn unique_tmp_dir() -> PathBuf {
        let mut dir = std::env::temp_dir();
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        dir.push(format!("scoring_policy_test_{}", nanos));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn defaults_sum_to_the_full_scale() {
        let p = ScorePolicy::default();
        let base = p.w_geography + p.w_stage + p.w_needs + p.w_industry + p.w_amount;
        assert!((base - 100.0).abs() < f32::EPSILON);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let hot = HotReloadPolicy::new(Some(Path::new("definitely/not/here.json")));
        let p = hot.current();
        assert!((p.w_stage - 25.0).abs() < f32::EPSILON);
        assert_eq!(p.urgency_window_days, 30);
    }

    #[test]
    fn loads_and_hot_reloads() {
        let tmpdir = unique_tmp_dir();
        let path = tmpdir.join("scoring.json");

        {
            let mut f = fs::File::create(&path).unwrap();
            write!(f, r#"{{"w_stage":40.0,"urgency_window_days":14}}"#).unwrap();
            f.sync_all().unwrap();
        }

        let hot = HotReloadPolicy::new(Some(&path));
        let p1 = hot.current();
        assert!((p1.w_stage - 40.0).abs() < f32::EPSILON);
        assert_eq!(p1.urgency_window_days, 14);
        // Untouched fields keep defaults.
        assert!((p1.w_geography - 20.0).abs() < f32::EPSILON);

        // Ensure different mtime (Windows granularity can be coarse).
        thread::sleep(Duration::from_millis(1100));

        {
            let mut f = fs::File::create(&path).unwrap();
            write!(f, r#"{{"w_stage":10.0}}"#).unwrap();
            f.sync_all().unwrap();
        }

        let p2 = hot.current();
        assert!((p2.w_stage - 10.0).abs() < f32::EPSILON);
        assert_eq!(p2.urgency_window_days, 30);

        let _ = fs::remove_file(&path);
        let _ = fs::remove_dir_all(&tmpdir);
    }
}
