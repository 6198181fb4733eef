//! High-level [`Workshop`] API for embedding.
//!
//! ```no_run
//! use reroader::workshop::{Workshop, WorkshopOptions};
//!
//! let mut ws = Workshop::open("workshop", WorkshopOptions::default())?;
//! let mut session = ws.session();
//! session.add_category("Favourites")?;
//! ws.commit(&session)?;
//! ws.save()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::env;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use crate::categories::{CategoriesFile, CategoryError};
use crate::order::{OrderError, OrderFile};
use crate::scan::{reconcile_new_entries, ScanReport};
use crate::sortfile::{SortFile, SyncReport};
use crate::view::{unzip, zip, LabelWarning, NestedView, Session, ViewError};

pub const ORDER_FILE:      &str = "order.roa";
pub const CATEGORIES_FILE: &str = "categories.roa";
/// Environment variable overriding the workshop directory.
pub const WORKSHOP_DIR_ENV: &str = "ROA_WORKSHOP_DIR";

// ── Error type ───────────────────────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum WorkshopError {
    #[error("{path}: {source}")]
    Order { path: PathBuf, #[source] source: OrderError },
    #[error("{path}: {source}")]
    Categories { path: PathBuf, #[source] source: CategoryError },
    #[error(transparent)]
    View(#[from] ViewError),
}

// ── WorkshopOptions ──────────────────────────────────────────────────────────

/// Configuration for [`Workshop::open`].
#[derive(Debug, Clone)]
pub struct WorkshopOptions {
    pub order_file:      String,
    pub categories_file: String,
    /// Append entries found on disk but missing from the order file.
    pub scan_on_open:    bool,
    /// Roots listed in addition to the parents of known entries.
    pub extra_roots:     Vec<PathBuf>,
}

impl Default for WorkshopOptions {
    fn default() -> Self {
        Self {
            order_file:      ORDER_FILE.into(),
            categories_file: CATEGORIES_FILE.into(),
            scan_on_open:    true,
            extra_roots:     Vec::new(),
        }
    }
}

/// `%LOCALAPPDATA%/RivalsofAether/workshop`, when `LOCALAPPDATA` is set.
pub fn default_workshop_dir() -> Option<PathBuf> {
    env::var_os("LOCALAPPDATA").map(|base| PathBuf::from(base).join("RivalsofAether").join("workshop"))
}

// ── Workshop ─────────────────────────────────────────────────────────────────

pub struct Workshop {
    dir:             PathBuf,
    order_path:      PathBuf,
    categories_path: PathBuf,
    extra_roots:     Vec<PathBuf>,
    pub order:       OrderFile,
    pub categories:  CategoriesFile,
    last_scan:       Option<ScanReport>,
}

impl Workshop {
    pub fn open<P: AsRef<Path>>(dir: P, opts: WorkshopOptions) -> Result<Self, WorkshopError> {
        let dir = dir.as_ref().to_owned();
        let order_path = dir.join(&opts.order_file);
        let categories_path = dir.join(&opts.categories_file);

        let order = OrderFile::load(&order_path)
            .map_err(|source| WorkshopError::Order { path: order_path.clone(), source })?;
        let categories = CategoriesFile::load(&categories_path)
            .map_err(|source| WorkshopError::Categories { path: categories_path.clone(), source })?;

        let mut ws = Self {
            dir,
            order_path,
            categories_path,
            extra_roots: opts.extra_roots,
            order,
            categories,
            last_scan: None,
        };
        if opts.scan_on_open {
            ws.rescan();
        }
        Ok(ws)
    }

    // ── Reconciliation ──────────────────────────────────────────────────────

    pub fn rescan(&mut self) -> &ScanReport {
        let report = reconcile_new_entries(&mut self.order, &self.extra_roots);
        self.last_scan.insert(report)
    }

    pub fn last_scan(&self) -> Option<&ScanReport> { self.last_scan.as_ref() }

    // ── Views ───────────────────────────────────────────────────────────────

    pub fn view(&self) -> NestedView {
        zip(&self.order, &self.categories)
    }

    pub fn session(&self) -> Session {
        Session::new(self.view())
    }

    /// Flatten `session` into the in-memory containers.  Nothing is written.
    pub fn commit(&mut self, session: &Session) -> Result<Vec<LabelWarning>, WorkshopError> {
        let unzipped = session.unzip()?;
        Ok(unzipped.apply(&mut self.order, &mut self.categories))
    }

    /// Bring `sort` up to date with the current characters, then flatten it
    /// into the in-memory containers.  Nothing is written.
    pub fn apply_sort_file(&mut self, sort: &mut SortFile) -> Result<(SyncReport, Vec<LabelWarning>), WorkshopError> {
        let synced = sort.sync(self.order.characters());
        let (view, order, mut warnings) = sort.resolve(self.order.characters());
        let unzipped = unzip(&view, &order)?;
        warnings.extend(unzipped.apply(&mut self.order, &mut self.categories));
        Ok((synced, warnings))
    }

    // ── Persistence ─────────────────────────────────────────────────────────

    pub fn is_dirty(&self) -> bool {
        self.order.is_dirty() || self.categories.is_dirty()
    }

    /// Overwrite both files with the in-memory state.
    pub fn save(&mut self) -> Result<(), WorkshopError> {
        self.order
            .save(&self.order_path)
            .map_err(|source| WorkshopError::Order { path: self.order_path.clone(), source })?;
        self.categories
            .save(&self.categories_path)
            .map_err(|source| WorkshopError::Categories { path: self.categories_path.clone(), source })?;
        info!("saved workshop state in {}", self.dir.display());
        Ok(())
    }

    // ── Metadata ────────────────────────────────────────────────────────────

    pub fn dir(&self) -> &Path { &self.dir }

    pub fn order_path(&self) -> &Path { &self.order_path }

    pub fn categories_path(&self) -> &Path { &self.categories_path }
}
