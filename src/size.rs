use std::path::Path;
use tracing::debug;
use walkdir::WalkDir;

const BYTES_PER_GIGABYTE: f64 = 1024.0 * 1024.0 * 1024.0;

/// Sum the sizes of all regular files under `root`, ignoring symbolic links.
///
/// Entries that cannot be read (permissions, files removed mid-walk) are
/// skipped. A missing root counts as empty.
pub fn directory_size(root: &Path) -> u64 {
    WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                debug!("Skipping unreadable entry during size walk: {}", e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| match entry.metadata() {
            Ok(metadata) => Some(metadata.len()),
            Err(e) => {
                debug!("Skipping {} during size walk: {}", entry.path().display(), e);
                None
            }
        })
        .sum()
}

/// Render a byte count in gigabytes with two decimals
pub fn format_gigabytes(bytes: u64) -> String {
    format!("{:.2} GB", bytes as f64 / BYTES_PER_GIGABYTE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;
    use assert_fs::TempDir;

    #[test]
    fn test_sums_nested_files() {
        let root = TempDir::new().unwrap();
        root.child("a.bin").write_binary(&[0u8; 100]).unwrap();
        root.child("nested/deeper/b.bin").write_binary(&[0u8; 250]).unwrap();
        root.child("nested/empty.txt").touch().unwrap();

        assert_eq!(directory_size(root.path()), 350);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinks_are_not_counted() {
        let outside = TempDir::new().unwrap();
        let target = outside.child("big.bin");
        target.write_binary(&[0u8; 500]).unwrap();

        let root = TempDir::new().unwrap();
        root.child("a.bin").write_binary(&[0u8; 100]).unwrap();
        root.child("b.bin").write_binary(&[0u8; 250]).unwrap();
        root.child("c.bin").touch().unwrap();
        root.child("link.bin").symlink_to_file(target.path()).unwrap();
        root.child("linkdir").symlink_to_dir(outside.path()).unwrap();

        assert_eq!(directory_size(root.path()), 350);
    }

    #[test]
    fn test_missing_root_is_empty() {
        assert_eq!(directory_size(Path::new("/nonexistent/ghmirror/root")), 0);
    }

    #[test]
    fn test_format_gigabytes() {
        assert_eq!(format_gigabytes(0), "0.00 GB");
        assert_eq!(format_gigabytes(1024 * 1024 * 1024), "1.00 GB");
        assert_eq!(format_gigabytes(3 * 512 * 1024 * 1024), "1.50 GB");
    }
}
