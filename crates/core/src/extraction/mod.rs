//! Extraction driver.
//!
//! Launches the external scripted extraction that pulls source data and
//! writes a spreadsheet into the download directory. An [`Extractor`]
//! performs exactly one attempt (probe, render, run); [`ExtractionDriver`]
//! wraps it in bounded retry with exponential backoff and builds a fresh
//! request for every attempt.

mod config;
mod driver;
mod error;
mod script;
mod scripted;
mod traits;
mod types;

pub use config::ExtractionConfig;
pub use driver::ExtractionDriver;
pub use error::ExtractionError;
pub use script::{render_output_filename, script_variables, ScriptTemplate};
pub use scripted::ScriptedExtractor;
pub use traits::Extractor;
pub use types::{ExtractionOutcome, ExtractionRequest};
