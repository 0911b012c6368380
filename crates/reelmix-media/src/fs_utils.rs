//! Filesystem helpers shared by the encoders and the output stage.

use std::io::ErrorKind;
use std::path::Path;
use tokio::fs;
use tracing::{debug, warn};

use crate::error::{MediaError, MediaResult};

/// EXDEV on Linux and macOS.
const CROSS_DEVICE_ERRNO: i32 = 18;

/// Move a finished file into place, across filesystems if needed.
///
/// Temp directories often live on a different mount than the output folder,
/// in which case `rename` fails with EXDEV and the file is copied next to the
/// destination and renamed there instead.
pub async fn move_file(src: impl AsRef<Path>, dst: impl AsRef<Path>) -> MediaResult<()> {
    let src = src.as_ref();
    let dst = dst.as_ref();

    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent).await?;
    }

    match fs::rename(src, dst).await {
        Ok(()) => Ok(()),
        Err(e) if e.raw_os_error() == Some(CROSS_DEVICE_ERRNO) => {
            debug!(
                "Cross-device move {} -> {}, copying",
                src.display(),
                dst.display()
            );
            let staging = dst.with_extension("partial");
            if let Err(e) = fs::copy(src, &staging).await {
                let _ = fs::remove_file(&staging).await;
                return Err(MediaError::from(e));
            }
            if let Err(e) = fs::rename(&staging, dst).await {
                let _ = fs::remove_file(&staging).await;
                return Err(MediaError::from(e));
            }
            if let Err(e) = fs::remove_file(src).await {
                warn!("Moved {} but could not remove it: {}", src.display(), e);
            }
            Ok(())
        }
        Err(e) => Err(MediaError::from(e)),
    }
}

/// Remove a file, treating "already gone" as success.
pub async fn remove_if_exists(path: impl AsRef<Path>) -> MediaResult<()> {
    match fs::remove_file(path.as_ref()).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(MediaError::from(e)),
    }
}

/// Whether `path` is a regular file with at least one byte.
pub async fn is_non_empty_file(path: impl AsRef<Path>) -> bool {
    matches!(fs::metadata(path.as_ref()).await, Ok(meta) if meta.is_file() && meta.len() > 0)
}

/// Fail with [`MediaError::EmptyOutput`] unless the encoder left a non-empty file.
pub async fn ensure_output(path: impl AsRef<Path>) -> MediaResult<()> {
    let path = path.as_ref();
    if is_non_empty_file(path).await {
        Ok(())
    } else {
        Err(MediaError::EmptyOutput(path.to_path_buf()))
    }
}
