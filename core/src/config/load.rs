use std::path::Path;
use std::time::Duration;

use anyhow::Context;

use super::types::SchedulerConfig;

pub const ENV_MAX_WORKERS: &str = "DAGRUN_MAX_WORKERS";
pub const ENV_TIMEOUT_SECS: &str = "DAGRUN_TIMEOUT_SECS";
pub const ENV_FAIL_FAST: &str = "DAGRUN_FAIL_FAST";
pub const ENV_LOG_LEVEL: &str = "DAGRUN_LOG_LEVEL";

/// Load a TOML config file, apply `DAGRUN_*` environment overrides and
/// validate the result.
pub fn load_from_path(path: impl AsRef<Path>) -> anyhow::Result<SchedulerConfig> {
    let path = path.as_ref();
    let s = std::fs::read_to_string(path)
        .with_context(|| format!("reading scheduler config {}", path.display()))?;
    load_from_str(&s).with_context(|| format!("loading scheduler config {}", path.display()))
}

pub fn load_from_str(s: &str) -> anyhow::Result<SchedulerConfig> {
    let mut cfg: SchedulerConfig = toml::from_str(s)?;
    apply_overrides(&mut cfg, |key| std::env::var(key).ok())?;
    cfg.validate()?;
    Ok(cfg)
}

/// Apply overrides from `lookup` (normally the process environment).
/// Blank values are ignored.
pub fn apply_overrides<F>(cfg: &mut SchedulerConfig, lookup: F) -> anyhow::Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(v) = get(ENV_MAX_WORKERS) {
        cfg.max_workers = v
            .trim()
            .parse()
            .with_context(|| format!("{ENV_MAX_WORKERS}={v} is not a worker count"))?;
    }
    if let Some(v) = get(ENV_TIMEOUT_SECS) {
        let secs: f64 = v
            .trim()
            .parse()
            .with_context(|| format!("{ENV_TIMEOUT_SECS}={v} is not a number"))?;
        cfg.timeout_per_task = Duration::try_from_secs_f64(secs)
            .with_context(|| format!("{ENV_TIMEOUT_SECS}={v} is not a valid timeout"))?;
    }
    if let Some(v) = get(ENV_FAIL_FAST) {
        cfg.fail_fast = match v.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            other => anyhow::bail!("{ENV_FAIL_FAST}={other} is not a boolean"),
        };
    }
    if let Some(v) = get(ENV_LOG_LEVEL) {
        cfg.logging.level = v.trim().to_string();
    }

    Ok(())
}
