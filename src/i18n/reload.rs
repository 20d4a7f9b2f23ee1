//! Staleness checks for lazily reloaded catalogs.

use crate::i18n::source::FileTree;
use chrono::{DateTime, Utc};
use tracing::{error, info};

/// The only mode in which catalogs are ever reloaded.
pub const DEVELOPMENT: &str = "development";

/// Decides whether the catalog should be rebuilt before serving a request.
pub struct ReloadSupervisor;

impl ReloadSupervisor {
    /// `true` when running in development mode and either nothing has been
    /// loaded yet or some file changed after `loaded_at`.
    ///
    /// Walk errors are logged and skipped; they never force a reload on
    /// their own.
    pub fn needs_reload(mode: &str, loaded_at: Option<DateTime<Utc>>, tree: &dyn FileTree) -> bool {
        if mode != DEVELOPMENT {
            return false;
        }

        let Some(loaded_at) = loaded_at else {
            return true;
        };

        for entry in tree.walk() {
            match entry {
                Ok(entry) if entry.is_dir => {}
                Ok(entry) => {
                    if entry.modified.is_some_and(|modified| modified > loaded_at) {
                        info!("Locale file changed: {}", entry.path.display());
                        return true;
                    }
                }
                Err(e) => error!("Error while checking locale files: {}", e),
            }
        }

        false
    }
}
