//! Upload client for the remote document store (Microsoft Graph drive API).
//!
//! A [`Uploader`] performs one complete attempt: obtain a token, resolve the
//! site id, then either a single PUT (small files) or an upload session with
//! sequential byte-ranged chunks (large files). [`UploadClient`] wraps an
//! uploader in bounded retry. A retried attempt always starts over with a new
//! session; an aborted session is never resumed.

mod client;
mod config;
mod error;
mod graph;
mod token;
mod traits;
mod types;

pub use client::UploadClient;
pub use config::UploadConfig;
pub use error::UploadError;
pub use graph::{encode_drive_path, GraphUploader};
pub use token::{TokenCache, TOKEN_REFRESH_MARGIN};
pub use traits::Uploader;
pub use types::{plan_chunks, ChunkRange, UploadMode, UploadReceipt, UploadSession};
