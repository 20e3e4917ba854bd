use std::path::{Path, PathBuf};

fn tmp_json_path() -> PathBuf {
    use rand::distributions::{Alphanumeric, DistString};

    const DIR: &str = "/tmp/";
    const EXT: &str = ".json";
    const LEN: usize = 16;

    let mut path = String::with_capacity(DIR.len() + LEN + EXT.len());
    path.push_str(DIR);
    Alphanumeric.append_string(&mut rand::thread_rng(), &mut path, LEN);
    path.push_str(EXT);
    path.into()
}

/// Owns a transient file path and removes the file when dropped, so cleanup happens on every
/// exit path of the owning scope. The file does not have to exist yet; the guard is created
/// before the engine writes to the path.
pub struct TempPath(PathBuf);

impl TempPath {
    pub fn json() -> Self {
        Self(tmp_json_path())
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}

impl Drop for TempPath {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.0) {
            Ok(()) => log::debug!("removed {}", self.0.display()),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {}
            Err(error) => log::debug!("failed to remove {}: {error}", self.0.display()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_removes_file_on_drop() {
        let guard = TempPath::json();
        std::fs::write(guard.path(), b"{}").unwrap();
        let path = guard.path().to_owned();
        drop(guard);
        assert!(!path.exists());
    }

    #[test]
    fn test_tolerates_missing_file() {
        let guard = TempPath::json();
        let path = guard.path().to_owned();
        drop(guard);
        assert!(!path.exists());
    }

    #[test]
    fn test_removes_file_on_early_return() {
        fn fallible(path_out: &mut PathBuf) -> Result<(), ()> {
            let guard = TempPath::json();
            std::fs::write(guard.path(), b"{}").map_err(|_| ())?;
            *path_out = guard.path().to_owned();
            Err(())
        }

        let mut path = PathBuf::new();
        assert!(fallible(&mut path).is_err());
        assert!(!path.exists());
    }
}
