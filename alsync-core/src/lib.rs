mod client;

pub use client::{AlistClient, ApiError, FsEntry, FsInfo};
