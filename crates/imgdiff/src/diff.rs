//! The gold-image comparator.

use std::path::{Component, Path};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::codec::{ImageCodec, ImageCrateCodec};
use crate::error::{CapabilityError, ConfigError, Failure};
use crate::options::Tolerance;
use crate::pixels::PixelArray;
use crate::request::{ComparisonRequest, ComparisonResult, PairReport};

/// Compares `request` with the default codec.
///
/// Never fails: invalid options and a missing decoding capability are reported as messages on
/// a not-same result, like every other problem.
pub fn diff(request: &ComparisonRequest) -> ComparisonResult {
    match ImageDiff::new(request.clone()) {
        Ok(comparator) => comparator.diff(),
        Err(err) => ComparisonResult::failed(Failure::InvalidOptions(err)),
    }
}

/// A comparator bound to one request.
///
/// Options are validated and the codec probed once, at construction. [`ImageDiff::diff`] only
/// reads the filesystem, so calling it repeatedly on unchanged files yields identical results.
#[derive(Clone)]
pub struct ImageDiff {
    request: ComparisonRequest,
    tolerance: Tolerance,
    codec: Arc<dyn ImageCodec>,
    capability: Result<(), CapabilityError>,
}

impl std::fmt::Debug for ImageDiff {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageDiff")
            .field("request", &self.request)
            .field("tolerance", &self.tolerance)
            .field("capability", &self.capability)
            .finish_non_exhaustive()
    }
}

impl ImageDiff {
    pub fn new(request: ComparisonRequest) -> Result<Self, ConfigError> {
        Self::with_codec(request, Arc::new(ImageCrateCodec::new()))
    }

    pub fn with_codec(
        request: ComparisonRequest,
        codec: Arc<dyn ImageCodec>,
    ) -> Result<Self, ConfigError> {
        let tolerance = Tolerance::from_options(request.options())?;
        let capability = codec.probe();
        if let Err(err) = &capability {
            warn!(reason = %err, "image codec probe failed; comparisons will be reported as failures");
        }
        Ok(Self {
            request,
            tolerance,
            codec,
            capability,
        })
    }

    pub fn request(&self) -> &ComparisonRequest {
        &self.request
    }

    pub fn tolerance(&self) -> Tolerance {
        self.tolerance
    }

    /// Runs the comparison for every listed file pair and aggregates the diagnostics in order.
    pub fn diff(&self) -> ComparisonResult {
        if let Err(err) = &self.capability {
            return ComparisonResult::failed(Failure::CodecUnavailable(err.clone()));
        }

        let pairs: Vec<PairReport> = self
            .request
            .out_files()
            .iter()
            .map(|name| self.compare_pair(name))
            .collect();
        let result = ComparisonResult::from_parts(&[], pairs);
        debug!(
            base_dir = %self.request.base_dir().display(),
            files = self.request.out_files().len(),
            same = result.same(),
            "image comparison finished"
        );
        result
    }

    fn compare_pair(&self, name: &Path) -> PairReport {
        let test_path = self.request.test_path(name);
        let gold_path = self.request.gold_path(name);
        let mut failures = Vec::new();

        // Joining an absolute name replaces the base directory, which would point both paths at
        // the same file.
        if is_rooted(name) {
            failures.push(Failure::InvalidName {
                path: name.to_path_buf(),
            });
            return PairReport {
                test_path,
                gold_path,
                difference: None,
                failures,
            };
        }

        if !test_path.exists() {
            failures.push(Failure::MissingTestFile {
                path: test_path.clone(),
            });
        }
        if !gold_path.exists() {
            failures.push(Failure::MissingGoldFile {
                path: gold_path.clone(),
            });
        }
        if !failures.is_empty() {
            return PairReport {
                test_path,
                gold_path,
                difference: None,
                failures,
            };
        }

        let test = self.decode(&test_path, &mut failures);
        let gold = self.decode(&gold_path, &mut failures);
        let difference = match (test, gold) {
            (Some(test), Some(gold)) => self.compare_arrays(&test, &gold, &mut failures),
            _ => None,
        };

        debug!(
            test = %test_path.display(),
            difference = ?difference,
            failures = failures.len(),
            "compared image pair"
        );
        PairReport {
            test_path,
            gold_path,
            difference,
            failures,
        }
    }

    fn decode(&self, path: &Path, failures: &mut Vec<Failure>) -> Option<PixelArray> {
        match self.codec.decode(path) {
            Ok(arr) => Some(arr),
            Err(err) => {
                debug!(error = %err, "image decode failed");
                failures.push(Failure::Decode {
                    path: path.to_path_buf(),
                });
                None
            }
        }
    }

    fn compare_arrays(
        &self,
        test: &PixelArray,
        gold: &PixelArray,
        failures: &mut Vec<Failure>,
    ) -> Option<f64> {
        let Some(fraction) = test.difference_fraction(gold, self.tolerance.zero_threshold) else {
            failures.push(Failure::ShapeMismatch {
                gold: gold.shape(),
                test: test.shape(),
            });
            return None;
        };
        failures.extend(self.tolerance.check(fraction));
        Some(fraction)
    }
}

fn is_rooted(name: &Path) -> bool {
    name.is_absolute()
        || name
            .components()
            .any(|c| matches!(c, Component::RootDir | Component::Prefix(_)))
}
