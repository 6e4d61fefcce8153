pub mod descriptor;

pub use descriptor::{artifact_filename, Changelog, Channel, DownloadUrls, VersionDescriptor};
