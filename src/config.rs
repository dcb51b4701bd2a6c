use crate::form::DEFAULT_ROSTER_ROWS;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::warn;

pub const ROSTER_ROWS_ENV: &str = "ATTENDANCED_ROSTER_ROWS";
pub const WORKSPACE_ENV: &str = "ATTENDANCED_WORKSPACE";
pub const WORKSPACE_CONFIG_FILE: &str = "attendance.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaemonConfig {
    pub roster_rows: usize,
    /// Workspace to open before the first request arrives.
    pub workspace: Option<PathBuf>,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            roster_rows: DEFAULT_ROSTER_ROWS,
            workspace: None,
        }
    }
}

/// Per-workspace overrides read from `attendance.json`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceConfig {
    pub roster_rows: Option<usize>,
}

impl DaemonConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let mut cfg = DaemonConfig::default();
        if let Some(raw) = get(ROSTER_ROWS_ENV) {
            match parse_row_count(&raw) {
                Some(n) => cfg.roster_rows = n,
                None => warn!(value = %raw, "ignoring invalid {}", ROSTER_ROWS_ENV),
            }
        }
        cfg.workspace = get(WORKSPACE_ENV)
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from);
        cfg
    }

    /// Row count for a workspace: its own override if present and valid,
    /// otherwise the daemon default.
    pub fn roster_rows_for(&self, workspace: &Path) -> usize {
        match load_workspace_config(workspace) {
            Ok(Some(WorkspaceConfig {
                roster_rows: Some(n),
            })) if n > 0 => n,
            Ok(Some(WorkspaceConfig {
                roster_rows: Some(_),
            })) => {
                warn!("ignoring rosterRows = 0 in {}", WORKSPACE_CONFIG_FILE);
                self.roster_rows
            }
            Ok(_) => self.roster_rows,
            Err(e) => {
                // Best-effort: a broken file must not keep the workspace closed.
                warn!(error = %e, "could not read {}", WORKSPACE_CONFIG_FILE);
                self.roster_rows
            }
        }
    }
}

fn parse_row_count(raw: &str) -> Option<usize> {
    raw.trim().parse::<usize>().ok().filter(|n| *n > 0)
}

pub fn load_workspace_config(workspace: &Path) -> anyhow::Result<Option<WorkspaceConfig>> {
    let path = workspace.join(WORKSPACE_CONFIG_FILE);
    if !path.is_file() {
        return Ok(None);
    }
    let text = std::fs::read_to_string(&path)?;
    Ok(Some(serde_json::from_str(&text)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k: &str| map.get(k).cloned()
    }

    fn temp_dir(prefix: &str) -> PathBuf {
        let p = std::env::temp_dir().join(format!(
            "{}-{}",
            prefix,
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .expect("clock")
                .as_nanos()
        ));
        std::fs::create_dir_all(&p).expect("create temp dir");
        p
    }

    #[test]
    fn env_overrides_defaults() {
        let cfg = DaemonConfig::from_lookup(env(&[
            (ROSTER_ROWS_ENV, " 35 "),
            (WORKSPACE_ENV, "/tmp/sheets"),
        ]));
        assert_eq!(cfg.roster_rows, 35);
        assert_eq!(cfg.workspace, Some(PathBuf::from("/tmp/sheets")));
    }

    #[test]
    fn invalid_row_counts_fall_back() {
        for bad in ["0", "-3", "many", ""] {
            let cfg = DaemonConfig::from_lookup(env(&[(ROSTER_ROWS_ENV, bad)]));
            assert_eq!(cfg.roster_rows, DEFAULT_ROSTER_ROWS, "value {bad:?}");
        }
    }

    #[test]
    fn workspace_file_overrides_row_count() {
        let dir = temp_dir("attendanced-config");
        let cfg = DaemonConfig::default();
        assert_eq!(cfg.roster_rows_for(&dir), DEFAULT_ROSTER_ROWS);

        std::fs::write(dir.join(WORKSPACE_CONFIG_FILE), r#"{ "rosterRows": 40 }"#)
            .expect("write config");
        assert_eq!(cfg.roster_rows_for(&dir), 40);

        std::fs::write(dir.join(WORKSPACE_CONFIG_FILE), "not json").expect("write config");
        assert_eq!(cfg.roster_rows_for(&dir), DEFAULT_ROSTER_ROWS);
    }
}
