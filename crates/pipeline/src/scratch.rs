//! Private scratch storage for one invocation.
//!
//! The directory and everything in it is removed when the [`Scratch`] is
//! dropped, so every exit path of a handler (success, `?` early return,
//! panic unwind) cleans up.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::PipelineError;

pub struct Scratch {
    dir: TempDir,
}

impl Scratch {
    pub fn new() -> Result<Self, PipelineError> {
        let dir = tempfile::Builder::new().prefix("outpaint-").tempdir()?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Location for `image_name` inside the scratch directory.
    ///
    /// Only the final path component is used. Names that have none (empty,
    /// `..`) or that end in a separator (`a.png/`) are rejected.
    pub fn file(&self, image_name: &str) -> Result<PathBuf, PipelineError> {
        let invalid = || PipelineError::InvalidImageName(image_name.to_string());
        if image_name.ends_with(std::path::is_separator) {
            return Err(invalid());
        }
        let file_name = Path::new(image_name).file_name().ok_or_else(invalid)?;
        Ok(self.dir.path().join(file_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn directory_removed_on_drop() {
        let scratch = Scratch::new().unwrap();
        let file = scratch.file("a.png").unwrap();
        std::fs::write(&file, b"x").unwrap();
        let dir = scratch.path().to_path_buf();
        assert!(file.exists());

        drop(scratch);
        assert!(!dir.exists());
    }

    #[test]
    fn file_keeps_only_last_component() {
        let scratch = Scratch::new().unwrap();
        let file = scratch.file("../../etc/a.png").unwrap();
        assert_eq!(file.parent(), Some(scratch.path()));
        assert_eq!(file.file_name().unwrap(), "a.png");
    }

    #[test]
    fn file_rejects_names_without_component() {
        let scratch = Scratch::new().unwrap();
        assert_matches!(scratch.file(""), Err(PipelineError::InvalidImageName(_)));
        assert_matches!(scratch.file(".."), Err(PipelineError::InvalidImageName(_)));
        assert_matches!(scratch.file("a.png/"), Err(PipelineError::InvalidImageName(_)));
        assert_matches!(scratch.file("dir/"), Err(PipelineError::InvalidImageName(_)));
    }
}
