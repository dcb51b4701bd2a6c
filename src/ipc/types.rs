use std::path::{Path, PathBuf};

use chrono::Local;
use serde::Deserialize;
use tracing::info;

use crate::config::DaemonConfig;
use crate::db;
use crate::form::SheetForm;
use crate::sync::LoadedSheetState;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

pub struct AppState {
    pub config: DaemonConfig,
    pub workspace: Option<PathBuf>,
    pub roster_rows: usize,
    pub form: SheetForm,
    pub loaded: LoadedSheetState,
}

impl AppState {
    pub fn new(config: DaemonConfig) -> Self {
        let roster_rows = config.roster_rows;
        Self {
            config,
            workspace: None,
            roster_rows,
            form: SheetForm::starting_at(Local::now().naive_local(), roster_rows),
            loaded: LoadedSheetState::default(),
        }
    }

    /// Opens (and if needed creates) the workspace database, then starts a
    /// fresh form sized for that workspace.
    pub fn select_workspace(&mut self, path: &Path) -> anyhow::Result<()> {
        // Only checks the schema; every lookup and save opens its own connection.
        drop(db::open_db(path)?);
        self.workspace = Some(path.to_path_buf());
        self.roster_rows = self.config.roster_rows_for(path);
        self.reset_form();
        info!(workspace = %path.display(), roster_rows = self.roster_rows, "workspace selected");
        Ok(())
    }

    pub fn reset_form(&mut self) {
        self.form = SheetForm::starting_at(Local::now().naive_local(), self.roster_rows);
        self.loaded = LoadedSheetState::default();
    }
}
