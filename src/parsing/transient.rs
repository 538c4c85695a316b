//! Request-scoped files that hand payload bytes to the converter.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::TempPath;

const PREFIX: &str = "docparse-";

/// Uniquely named file holding one request's payload.
///
/// The file is deleted when the value is dropped, whichever way the request ends.
#[derive(Debug)]
pub struct TransientFile {
    path: TempPath,
}

impl TransientFile {
    /// Write `bytes` to a fresh file ending in `suffix`, under `dir` or the system temp dir.
    pub async fn stage(bytes: Vec<u8>, suffix: &'static str, dir: Option<&Path>) -> io::Result<Self> {
        let dir: Option<PathBuf> = dir.map(Path::to_path_buf);
        let path = tokio::task::spawn_blocking(move || -> io::Result<TempPath> {
            let mut builder = tempfile::Builder::new();
            builder.prefix(PREFIX).suffix(suffix);
            let mut file = match &dir {
                Some(dir) => builder.tempfile_in(dir)?,
                None => builder.tempfile()?,
            };
            file.write_all(&bytes)?;
            file.flush()?;
            Ok(file.into_temp_path())
        })
        .await
        .map_err(io::Error::other)??;

        Ok(Self { path })
    }

    /// Location of the staged payload.
    pub fn path(&self) -> &Path {
        &self.path
    }
}
