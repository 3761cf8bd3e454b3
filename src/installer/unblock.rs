use std::{
    io,
    path::{Path, PathBuf},
};

/// Result of removing download marks from extracted files.
#[derive(Debug, Default)]
pub struct UnblockReport {
    /// Files that carried a mark and had it removed.
    pub unblocked: usize,
    pub failures: Vec<(PathBuf, io::Error)>,
}

/// Best-effort removal of the `Zone.Identifier` stream Windows attaches to
/// downloaded files. Files without the stream are skipped. Does nothing on
/// other platforms.
pub fn unblock_files(paths: &[PathBuf]) -> UnblockReport {
    let mut report = UnblockReport::default();
    for path in paths {
        report.unblock(path);
    }
    report
}

impl UnblockReport {
    /// Unblock one file and fold the result into the report.
    pub fn unblock(&mut self, path: &Path) {
        match remove_zone_identifier(path) {
            Ok(true) => self.unblocked += 1,
            Ok(false) => {}
            Err(err) => self.failures.push((path.to_path_buf(), err)),
        }
    }
}

#[cfg(windows)]
fn remove_zone_identifier(path: &Path) -> io::Result<bool> {
    let mut stream = path.as_os_str().to_os_string();
    stream.push(":Zone.Identifier");
    match std::fs::remove_file(&stream) {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err),
    }
}

#[cfg(not(windows))]
fn remove_zone_identifier(_path: &Path) -> io::Result<bool> {
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn files_without_marks_are_not_counted() {
        let temp = tempdir().unwrap();
        let file = temp.path().join("plugin.dll");
        std::fs::write(&file, b"x").unwrap();

        let report = unblock_files(&[file]);

        assert_eq!(report.unblocked, 0);
        assert!(report.failures.is_empty());
    }

    #[cfg(windows)]
    #[test]
    fn removes_zone_identifier_stream() {
        let temp = tempdir().unwrap();
        let file = temp.path().join("plugin.dll");
        std::fs::write(&file, b"x").unwrap();
        let mut stream = file.as_os_str().to_os_string();
        stream.push(":Zone.Identifier");
        std::fs::write(&stream, "[ZoneTransfer]\r\nZoneId=3\r\n").unwrap();

        let report = unblock_files(std::slice::from_ref(&file));

        assert_eq!(report.unblocked, 1);
        assert!(std::fs::read(&stream).is_err());
        assert_eq!(std::fs::read(&file).unwrap(), b"x");
    }
}
