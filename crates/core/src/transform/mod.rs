//! Transform seam.
//!
//! The column filtering and composite-key rules live outside this crate. The
//! orchestrator only needs "artifact in, artifact out", expressed by the
//! [`Transformer`] trait. [`CommandTransformer`] delegates to an external
//! program.

mod command;
mod config;
mod error;
mod traits;
mod types;

pub use command::CommandTransformer;
pub use config::TransformConfig;
pub use error::TransformError;
pub use traits::Transformer;
pub use types::TransformOutput;
