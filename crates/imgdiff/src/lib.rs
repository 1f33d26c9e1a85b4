#![forbid(unsafe_code)]

//! Gold-image regression comparison (headless).
//!
//! A test writes `<test_dir>/<name>`; the trusted reference lives at `<test_dir>/gold/<name>`.
//! [`diff`] decodes both, subtracts them sample by sample and fails when the fraction of
//! samples differing by more than `zero_threshold` exceeds `rel_err`.
//!
//! Every problem (missing file, undecodable image, shape mismatch, too many differences) is
//! reported as a message on the returned [`ComparisonResult`]; nothing here panics or returns
//! an error to the harness.
//!
//! ```no_run
//! use imgdiff::{ComparisonRequest, DiffOptions};
//!
//! let request = ComparisonRequest::new("tests/plot", ["scatter.png"])
//!     .with_options(DiffOptions::new().with_rel_err(0.01));
//! let result = imgdiff::diff(&request);
//! if !result.same() {
//!     eprintln!("{}", result.message_text());
//! }
//! ```

pub mod codec;
pub mod diff;
pub mod error;
pub mod options;
pub mod pixels;
pub mod request;

pub use codec::{ImageCodec, ImageCrateCodec};
pub use diff::{ImageDiff, diff};
pub use error::{CapabilityError, ConfigError, DecodeError, Failure};
pub use options::{
    DEFAULT_REL_ERR, DEFAULT_ZERO_THRESHOLD, DiffOptions, Tolerance, resolve_options,
};
pub use pixels::{PixelArray, Samples, Shape};
pub use request::{ComparisonRequest, ComparisonResult, GOLD_DIR, PairReport};
