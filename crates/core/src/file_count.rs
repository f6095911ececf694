use log::warn;
use std::path::Path;
use walkdir::WalkDir;

/// Number of regular files below `root`, recursively. A missing root counts as empty.
///
/// Unreadable entries are skipped with a warning and the count carries on,
/// the same way a sorting run walks past them.
pub fn count_files(root: &Path) -> usize {
    if !root.exists() {
        return 0;
    }

    let mut count = 0usize;
    for entry in WalkDir::new(root) {
        match entry {
            Ok(entry) if entry.file_type().is_file() => count += 1,
            Ok(_) => {}
            Err(err) => {
                let path = err.path().unwrap_or(root);
                warn!("数えられませんでした: {}: {err}", path.display());
            }
        }
    }
    count
}

#[cfg(test)]
mod tests {
    use super::count_files;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn counts_files_in_nested_folders_only() {
        let temp = tempdir().expect("tempdir");
        let nested = temp.path().join("a/b");
        fs::create_dir_all(&nested).expect("create nested");
        fs::create_dir_all(temp.path().join("empty")).expect("create empty");
        fs::write(temp.path().join("one.jpg"), b"1").expect("write one");
        fs::write(nested.join("two.txt"), b"2").expect("write two");
        fs::write(nested.join("three.mov"), b"3").expect("write three");

        assert_eq!(count_files(temp.path()), 3);
    }

    #[test]
    fn missing_root_is_zero() {
        let temp = tempdir().expect("tempdir");
        assert_eq!(count_files(&temp.path().join("nope")), 0);
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_subdirectory_is_skipped() {
        use std::os::unix::fs::PermissionsExt;

        let temp = tempdir().expect("tempdir");
        fs::write(temp.path().join("clip.mp4"), b"1").expect("write clip");
        let locked = temp.path().join("locked");
        fs::create_dir_all(&locked).expect("create locked");
        fs::write(locked.join("hidden.jpg"), b"2").expect("write hidden");
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).expect("chmod 000");

        let readable = fs::read_dir(&locked).is_ok();
        let counted = count_files(temp.path());
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).expect("restore");

        if readable {
            // Running with privileges that ignore permission bits.
            assert_eq!(counted, 2);
        } else {
            assert_eq!(counted, 1);
        }
    }
}
