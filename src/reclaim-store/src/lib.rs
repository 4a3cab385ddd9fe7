//! reclaim-store - Storage layer for Reclaim
//!
//! Video listing, metadata access and deletion behind async traits, plus a
//! plain-directory implementation.

mod error;
mod fs;
mod schema;
mod traits;

pub use error::StoreError;
pub use fs::{parse_recorded_at, FsVideoStore, VIDEO_EXTENSIONS};
pub use schema::*;
pub use traits::*;

/// Bytes in one gigabyte (GiB)
pub const BYTES_PER_GB: u64 = 1024 * 1024 * 1024;

/// Format bytes as human-readable string
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(500), "500 B");
        assert_eq!(format_bytes(1024), "1.0 KB");
        assert_eq!(format_bytes(1024 * 1024), "1.0 MB");
        assert_eq!(format_bytes(BYTES_PER_GB), "1.0 GB");
        assert_eq!(format_bytes(BYTES_PER_GB * 3 / 2), "1.5 GB");
    }
}
