use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use anyhow::{bail, Context, Result};

use spacexp_common::catalog::{CatalogQuery, CatalogRow};
use spacexp_common::stats::{self, StatisticsReport};

/// Where a catalog is read from: the CSV an indexing run wrote, or the
/// SQLite store.
#[derive(Debug, Clone)]
pub enum CatalogSource {
    Csv(PathBuf),
    Db(PathBuf),
}

impl CatalogSource {
    pub fn path(&self) -> &Path {
        match self {
            CatalogSource::Csv(p) | CatalogSource::Db(p) => p,
        }
    }

    fn require_exists(&self) -> Result<()> {
        if !self.path().exists() {
            bail!(
                "no data to analyse: {} does not exist; run `spacexp index` first",
                self.path().display()
            );
        }
        Ok(())
    }

    pub fn rows(&self) -> Result<Vec<CatalogRow>> {
        self.require_exists()?;
        match self {
            CatalogSource::Csv(p) => crate::catalog::read_csv(p),
            CatalogSource::Db(p) => spacexp_store::all_rows(&spacexp_store::open(p)?),
        }
    }

    pub fn report(&self, n: usize) -> Result<StatisticsReport> {
        self.require_exists()?;
        match self {
            CatalogSource::Csv(p) => Ok(stats::report(&crate::catalog::read_csv(p)?, n)),
            CatalogSource::Db(p) => spacexp_store::report(&spacexp_store::open(p)?, n),
        }
    }

    pub fn search(&self, query: &CatalogQuery) -> Result<Vec<CatalogRow>> {
        self.require_exists()?;
        match self {
            CatalogSource::Csv(p) => {
                let rows = crate::catalog::read_csv(p)?;
                Ok(rows.into_iter().filter(|r| query.matches(r)).collect())
            }
            CatalogSource::Db(p) => spacexp_store::search(&spacexp_store::open(p)?, query),
        }
    }

    /// Unix time of the last indexing run, if there has been one.  For a CSV
    /// catalog this is the file's modification time.
    pub fn last_index(&self) -> Result<Option<i64>> {
        match self {
            CatalogSource::Csv(p) => {
                let Ok(meta) = std::fs::metadata(p) else {
                    return Ok(None);
                };
                let mtime = meta
                    .modified()
                    .with_context(|| format!("modification time of {}", p.display()))?;
                let secs = mtime
                    .duration_since(UNIX_EPOCH)
                    .map(|d| d.as_secs() as i64)
                    .unwrap_or(0);
                Ok(Some(secs))
            }
            CatalogSource::Db(p) => {
                if !p.exists() {
                    return Ok(None);
                }
                spacexp_store::last_index(&spacexp_store::open(p)?)
            }
        }
    }
}
