//! Hot reload of the trigger table and the access configuration.

use std::{path::PathBuf, sync::Arc};

use tracing::instrument;

use crate::{
    base::error::EngineError,
    store::{
        access::{AccessConfig, AccessStore},
        activity::ActivityLog,
        responses::{ResponseStore, TriggerTable},
    },
};

/// Outcome of a reload, per half.
#[derive(Debug)]
pub struct ReloadReport {
    /// Access configuration result.
    pub config: Result<(), EngineError>,
    /// Trigger table result, with the number of triggers installed.
    pub responses: Result<usize, EngineError>,
}

impl ReloadReport {
    pub fn is_complete(&self) -> bool {
        self.config.is_ok() && self.responses.is_ok()
    }
}

struct ReloadSources {
    access_config_path: PathBuf,
    responses_path: PathBuf,
}

/// Replaces store contents from their backing files.
///
/// This is trivially cloneable and can be passed around without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct ReloadCoordinator {
    sources: Arc<ReloadSources>,
    access: AccessStore,
    responses: ResponseStore,
    activity: ActivityLog,
}

impl ReloadCoordinator {
    pub fn new(access_config_path: impl Into<PathBuf>, responses_path: impl Into<PathBuf>, access: AccessStore, responses: ResponseStore, activity: ActivityLog) -> Self {
        Self {
            sources: Arc::new(ReloadSources {
                access_config_path: access_config_path.into(),
                responses_path: responses_path.into(),
            }),
            access,
            responses,
            activity,
        }
    }

    /// Loads the config, then the trigger table, installing each half that loads.
    ///
    /// A half that fails keeps its previous state; the other half is unaffected.
    #[instrument(skip_all)]
    pub fn reload(&self) -> ReloadReport {
        let config = match AccessConfig::load(&self.sources.access_config_path) {
            Ok(config) => {
                self.access.replace(config);
                let _ = self.activity.info("Config loaded.");
                Ok(())
            }
            Err(err) => {
                let _ = self.activity.error(format!("Failed to load access config: {err}"));
                Err(err)
            }
        };

        let responses = match TriggerTable::load(&self.sources.responses_path) {
            Ok(table) => {
                let count = table.len();
                self.responses.replace(table);
                let _ = self.activity.info(format!("Responses loaded ({count} triggers)."));
                Ok(count)
            }
            Err(err) => {
                let _ = self.activity.error(format!("Failed to load responses: {err}"));
                Err(err)
            }
        };

        ReloadReport { config, responses }
    }
}
