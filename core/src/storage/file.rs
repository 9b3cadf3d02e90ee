use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::{self, AsyncWriteExt};
use tracing::{debug, warn};

use crate::storage::{ConflictError, Error, Result};

/// Reads and writes the raw content of one record.
///
/// Stateless: every call goes straight to the filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentStore;

impl ContentStore {
    /// Writes `content` to `directory/filename`, creating the directory if needed.
    /// Returns the path that was written.
    pub async fn write(directory: &Path, filename: &str, content: impl AsRef<[u8]>) -> Result<PathBuf> {
        fs::create_dir_all(directory).await.map_err(Error::Io)?;
        let path = directory.join(filename);
        fs::write(&path, content).await.map_err(Error::Io)?;
        debug!("Wrote content file {}", path.display());
        Ok(path)
    }

    /// Copies an existing file into `directory/filename`.
    /// Returns the destination path and the number of bytes copied.
    ///
    /// Never overwrites: an existing destination is a
    /// [`ConflictError::ContentFileExists`]. If the copy fails part way, the partial
    /// destination file is removed again.
    pub async fn copy(source: &Path, directory: &Path, filename: &str) -> Result<(PathBuf, u64)> {
        fs::create_dir_all(directory).await.map_err(Error::Io)?;
        let path = directory.join(filename);
        let mut reader = fs::File::open(source).await.map_err(|e| not_found_or_io(e, source))?;
        let mut writer = match fs::OpenOptions::new().write(true).create_new(true).open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(ConflictError::ContentFileExists(path).into());
            }
            Err(e) => return Err(Error::Io(e)),
        };

        let copied = async {
            let size = io::copy(&mut reader, &mut writer).await?;
            writer.flush().await?;
            Ok::<_, std::io::Error>(size)
        }
        .await;
        drop(writer);

        match copied {
            Ok(size) => {
                debug!("Copied {} -> {} ({} bytes)", source.display(), path.display(), size);
                Ok((path, size))
            }
            Err(e) => {
                warn!("Copying {} failed ({}); removing partial {}", source.display(), e, path.display());
                if let Err(cleanup) = fs::remove_file(&path).await {
                    warn!("Could not remove '{}': {}", path.display(), cleanup);
                }
                Err(Error::Io(e))
            }
        }
    }

    /// Reads the entire content of the file into a byte vector.
    pub async fn read(path: &Path) -> Result<Vec<u8>> {
        fs::read(path).await.map_err(|e| not_found_or_io(e, path))
    }

    /// Reads the entire content of the file into a String.
    ///
    /// Content that is not valid UTF-8 is reported as an IO error of kind `InvalidData`.
    pub async fn read_string(path: &Path) -> Result<String> {
        fs::read_to_string(path).await.map_err(|e| not_found_or_io(e, path))
    }

    /// Deletes the file. A missing file is reported as [`Error::FileNotFound`] so the
    /// caller can decide whether that matters.
    pub async fn delete(path: &Path) -> Result<()> {
        fs::remove_file(path).await.map_err(|e| not_found_or_io(e, path))?;
        debug!("Deleted content file {}", path.display());
        Ok(())
    }

    pub async fn exists(path: &Path) -> Result<bool> {
        fs::try_exists(path).await.map_err(Error::Io)
    }
}

fn not_found_or_io(e: std::io::Error, path: &Path) -> Error {
    if e.kind() == ErrorKind::NotFound {
        Error::FileNotFound(path.to_path_buf())
    } else {
        Error::Io(e)
    }
}
