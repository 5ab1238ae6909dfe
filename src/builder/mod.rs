//! Streaming tree construction
//!
//! The builder is the write side of the system: it decompresses each input
//! file, parses one record per line, derives the record's category tags and
//! cost attributes, and folds the result into the tree at the record's
//! directory. Regular files and symlinks contribute to their containing
//! directory; directories contribute to themselves; anything else is
//! counted in the statistics but not inserted.
//!
//! Failure policy is log-and-continue at two granularities: a malformed
//! line is skipped, a failing input file is abandoned for the next one.
//! Nothing is retried.

mod identity;
mod record;

pub use identity::{IdentityCache, NameSource, SystemNameSource};
pub use record::{LstatRecord, RECORD_FIELDS};

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use tracing::{debug, error, info, warn};

use crate::classify::CategoryClassifier;
use crate::datum::Datum;
use crate::error::{Error, RecordError, Result};
use crate::indexed_map::IndexedMap;
use crate::tree::Tree;

/// Seconds in the 365-day year used for age weighting.
pub const SECONDS_IN_YEAR: u64 = 31_536_000;

/// Storage cost of one TiB held for one year, in currency units.
pub const COST_PER_TIB_YEAR: f64 = 150.0;

/// One tebibyte.
pub const TIB: u64 = 1 << 40;

/// Progress is logged every this many input lines.
const PROGRESS_INTERVAL: u64 = 10_000;

/// Counters accumulated over a build.
#[derive(Debug, Default, Clone)]
pub struct BuildStats {
    /// Input lines seen across all files.
    pub lines: u64,
    /// Records folded into the tree.
    pub inserted: u64,
    /// Malformed lines skipped.
    pub skipped: u64,
    /// Input files abandoned after an open or read error.
    pub failed_files: u64,
}

/// Builds a [`Tree`] from gzip-compressed lstat dumps.
///
/// The wall clock is sampled once at construction; every age-weighted cost
/// in the resulting tree is relative to that instant.
pub struct TreeBuilder {
    tree: Tree,
    classifier: CategoryClassifier,
    identities: IdentityCache,
    now: i64,
    stats: BuildStats,
}

impl TreeBuilder {
    /// Builder over the system user and group databases.
    pub fn new() -> Self {
        Self::with_identity_source(Box::new(SystemNameSource))
    }

    /// Builder with a caller-supplied identity source.
    pub fn with_identity_source(source: Box<dyn NameSource + Send>) -> Self {
        Self {
            tree: Tree::new(),
            classifier: CategoryClassifier::new(),
            identities: IdentityCache::with_source(source),
            now: chrono::Utc::now().timestamp(),
            stats: BuildStats::default(),
        }
    }

    /// Pin the cost reference instant. Ages and costs become deterministic,
    /// which the tests rely on.
    pub fn with_clock(mut self, now: i64) -> Self {
        self.now = now;
        self
    }

    /// Consume every input, finalize, and return the tree with the build
    /// counters.
    ///
    /// A file that cannot be opened or read is logged and abandoned; the
    /// build carries on with the remaining inputs. An empty input list is a
    /// configuration-level error.
    pub fn from_lstat(mut self, inputs: &[PathBuf]) -> Result<(Tree, BuildStats)> {
        if inputs.is_empty() {
            return Err(Error::NoInput("no lstat files given".to_string()));
        }

        for input in inputs {
            info!(file = %input.display(), "ingesting lstat dump");
            if let Err(err) = self.ingest_file(input) {
                error!(file = %input.display(), %err, "abandoning input file");
                self.stats.failed_files += 1;
            }
        }

        info!(
            lines = self.stats.lines,
            inserted = self.stats.inserted,
            skipped = self.stats.skipped,
            failed_files = self.stats.failed_files,
            nodes = self.tree.node_count(),
            keys = self.tree.interner().len(),
            "ingest complete, finalizing"
        );

        self.tree.finalize();
        debug!(nodes = self.tree.node_count(), "finalize complete");

        Ok((self.tree, self.stats))
    }

    fn ingest_file(&mut self, input: &Path) -> std::io::Result<()> {
        let file = File::open(input)?;
        let reader = BufReader::new(GzDecoder::new(file));

        for (lineno, line) in reader.lines().enumerate() {
            let line = line?;
            self.stats.lines += 1;

            match self.ingest_line(&line) {
                Ok(true) => self.stats.inserted += 1,
                Ok(false) => {}
                Err(err) => {
                    warn!(
                        file = %input.display(),
                        line = lineno + 1,
                        %err,
                        "skipping malformed record"
                    );
                    self.stats.skipped += 1;
                }
            }

            if self.stats.lines % PROGRESS_INTERVAL == 0 {
                info!(
                    lines = self.stats.lines,
                    nodes = self.tree.node_count(),
                    "ingest progress"
                );
            }
        }
        Ok(())
    }

    /// Fold one line into the tree. `Ok(true)` when the record was
    /// inserted, `Ok(false)` for file types that are not.
    fn ingest_line(&mut self, line: &str) -> std::result::Result<bool, RecordError> {
        let record = LstatRecord::parse(line)?;
        let im = self.derive_attributes(&record);

        match record.file_type {
            'd' => {
                self.tree.add_node(&record.path, &im);
                Ok(true)
            }
            'f' | 'l' => {
                self.tree.add_node(parent_path(&record.path), &im);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Expand one record into its attribute map: for every category tag,
    /// five attributes, each fanned out across the four (group, user)
    /// wildcard combinations.
    fn derive_attributes(&mut self, record: &LstatRecord) -> IndexedMap {
        let group = self.identities.group(record.gid).to_string();
        let user = self.identities.user(record.uid).to_string();
        let categories = self.classifier.classify(&record.path, record.file_type);

        let tib = record.size as f64 / TIB as f64;
        let age_years =
            |t: i64| (self.now.saturating_sub(t)) as f64 / SECONDS_IN_YEAR as f64;
        let atime_cost = COST_PER_TIB_YEAR * tib * age_years(record.atime);
        let mtime_cost = COST_PER_TIB_YEAR * tib * age_years(record.mtime);
        let ctime_cost = COST_PER_TIB_YEAR * tib * age_years(record.ctime);

        let mut im = IndexedMap::new();
        for category in &categories {
            self.add_attributes(&mut im, "count", Datum::int(1), &group, &user, category);
            self.add_attributes(
                &mut im,
                "size",
                Datum::int(record.size),
                &group,
                &user,
                category,
            );
            self.add_attributes(
                &mut im,
                "atime",
                Datum::float(atime_cost),
                &group,
                &user,
                category,
            );
            self.add_attributes(
                &mut im,
                "mtime",
                Datum::float(mtime_cost),
                &group,
                &user,
                category,
            );
            self.add_attributes(
                &mut im,
                "ctime",
                Datum::float(ctime_cost),
                &group,
                &user,
                category,
            );
        }
        im
    }

    fn add_attributes(
        &self,
        im: &mut IndexedMap,
        attr: &str,
        value: Datum,
        group: &str,
        user: &str,
        category: &str,
    ) {
        let interner = self.tree.interner();
        for (g, u) in [("*", "*"), (group, "*"), ("*", user), (group, user)] {
            im.add_item(interner, &format!("{attr}${g}${u}${category}"), value);
        }
    }
}

impl Default for TreeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Directory containing `path`: everything before the final slash.
fn parent_path(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[..idx],
        None => "",
    }
}
