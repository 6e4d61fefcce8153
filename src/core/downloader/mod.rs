pub mod client;
pub mod progress;

pub use client::{DownloadTask, Downloader};
