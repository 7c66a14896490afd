pub mod bucket;
pub mod size_group;

pub use bucket::{BoxType, BucketKey, BucketKeyParseError, SizeKey};
pub use size_group::{LoadingHistoryEntry, SizeGroup};
