use std::path::{Path, PathBuf};

use serde::{Serialize, Serializer};

use crate::error::Failure;
use crate::options::DiffOptions;

/// Name of the directory, relative to the test directory, holding the reference images.
pub const GOLD_DIR: &str = "gold";

/// What to compare: `<base_dir>/<name>` against `<base_dir>/gold/<name>` for every name.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonRequest {
    base_dir: PathBuf,
    out_files: Vec<PathBuf>,
    options: DiffOptions,
}

impl ComparisonRequest {
    pub fn new<I, P>(base_dir: impl Into<PathBuf>, out_files: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            base_dir: base_dir.into(),
            out_files: out_files.into_iter().map(Into::into).collect(),
            options: DiffOptions::default(),
        }
    }

    pub fn with_options(mut self, options: DiffOptions) -> Self {
        self.options = options;
        self
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn out_files(&self) -> &[PathBuf] {
        &self.out_files
    }

    pub fn options(&self) -> &DiffOptions {
        &self.options
    }

    pub fn test_path(&self, name: &Path) -> PathBuf {
        self.base_dir.join(name)
    }

    pub fn gold_path(&self, name: &Path) -> PathBuf {
        self.base_dir.join(GOLD_DIR).join(name)
    }
}

/// Outcome of one test/gold pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairReport {
    pub test_path: PathBuf,
    pub gold_path: PathBuf,
    /// Fraction of differing samples; only set when both images decoded with equal shapes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difference: Option<f64>,
    #[serde(rename = "messages", serialize_with = "failures_as_messages")]
    pub failures: Vec<Failure>,
}

impl PairReport {
    pub fn same(&self) -> bool {
        self.failures.is_empty()
    }
}

/// The verdict handed back to a harness. `same` holds exactly when `messages` is empty; the
/// fields are only set through [`ComparisonResult::from_parts`] so that cannot drift.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonResult {
    same: bool,
    messages: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pairs: Vec<PairReport>,
}

impl ComparisonResult {
    /// Builds the result from per-pair reports plus any request-level failures, preserving
    /// order: request-level failures first, then each pair in request order.
    pub fn from_parts(request_failures: &[Failure], pairs: Vec<PairReport>) -> Self {
        let messages: Vec<String> = request_failures
            .iter()
            .chain(pairs.iter().flat_map(|p| p.failures.iter()))
            .map(ToString::to_string)
            .collect();
        Self {
            same: messages.is_empty(),
            messages,
            pairs,
        }
    }

    /// A failed result carrying a single request-level failure and no pair reports.
    pub fn failed(failure: Failure) -> Self {
        Self::from_parts(std::slice::from_ref(&failure), Vec::new())
    }

    pub fn same(&self) -> bool {
        self.same
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    pub fn pairs(&self) -> &[PairReport] {
        &self.pairs
    }

    /// All messages joined with newlines, for single-string harness reports.
    pub fn message_text(&self) -> String {
        self.messages.join("\n")
    }
}

fn failures_as_messages<S: Serializer>(failures: &[Failure], s: S) -> Result<S::Ok, S::Error> {
    s.collect_seq(failures.iter().map(ToString::to_string))
}
