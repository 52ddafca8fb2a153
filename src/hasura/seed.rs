use std::path::Path;

use anyhow::Result;
use tracing::{debug, error, info};

use crate::error::EnvError;
use crate::hasura::SeedApplier;
use crate::layout::ProjectLayout;

#[derive(Debug, Default)]
pub struct SeedReport {
    pub applied: Vec<String>,
    /// File name and reason, for files that could not be read or applied.
    pub failed: Vec<(String, String)>,
}

/// Apply every file in `dir` as SQL, in file name order.
///
/// An unreadable directory is an error. A file that cannot be read or
/// applied is logged and skipped.
pub async fn apply_seeds<A: SeedApplier>(dir: &Path, applier: &A) -> Result<SeedReport> {
    let entries = std::fs::read_dir(dir).map_err(|source| EnvError::SeedsUnreadable {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut files: Vec<_> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .collect();
    files.sort();

    let mut report = SeedReport::default();
    for path in files {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let sql = match tokio::fs::read_to_string(&path).await {
            Ok(sql) => sql,
            Err(e) => {
                error!(seed = %name, error = %e, "failed to open seed");
                report.failed.push((name, e.to_string()));
                continue;
            }
        };

        match applier.apply_sql(&sql).await {
            Ok(()) => {
                debug!(seed = %name, "seed applied");
                report.applied.push(name);
            }
            Err(e) => {
                error!(seed = %name, error = %format!("{e:#}"), "failed to apply seed");
                report.failed.push((name, format!("{e:#}")));
            }
        }
    }

    info!(applied = report.applied.len(), failed = report.failed.len(), "seeds done");
    Ok(report)
}

/// Whether this session seeds the database.
///
/// Sampled once before any container starts: the database creates the
/// first-run marker as soon as it boots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedPlan {
    Seed,
    Skip,
}

impl SeedPlan {
    pub fn sample(layout: &ProjectLayout, marker: &str, no_seed: bool) -> Self {
        let first_run = layout.is_first_run(marker);
        debug!(first_run, no_seed, "checked first-run marker");
        if first_run && !no_seed {
            SeedPlan::Seed
        } else {
            SeedPlan::Skip
        }
    }

    /// Apply the seeds in `dir` when the plan says so.
    pub async fn run<A: SeedApplier>(self, dir: &Path, applier: &A) -> Result<Option<SeedReport>> {
        match self {
            SeedPlan::Skip => Ok(None),
            SeedPlan::Seed => {
                info!(dir = %dir.display(), "applying seeds");
                apply_seeds(dir, applier).await.map(Some)
            }
        }
    }
}
