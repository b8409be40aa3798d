pub mod cache;
pub mod sample_loader;

pub use cache::BucketCache;
pub use sample_loader::{Buckets, Sample, ScanIssue, ScanResult, SymbolConflict, detect_symbol, scan_folder};
