//! Scratch storage for in-flight uploads.
//!
//! Each request gets exactly one scratch file with a UUID-based name, so
//! concurrent uploads of identically named client files cannot collide. The
//! client-supplied filename is never used as a path component; it only
//! survives as sanitized log metadata.
//!
//! [`ScratchFile`] is a drop guard: once allocated, the file is removed when
//! the guard goes out of scope, on success and failure paths alike.

use std::fmt::Display;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::warn;
use uuid::Uuid;

use crate::error::AppError;

/// A uniquely named scratch path that deletes its file on drop.
#[derive(Debug)]
pub struct ScratchFile {
    path: PathBuf,
}

impl ScratchFile {
    /// Allocate a fresh scratch path under `dir`.
    ///
    /// The file itself is not created yet; [`store_stream`] does that when
    /// the first chunk arrives.
    pub fn new(dir: &Path) -> Self {
        Self {
            path: dir.join(format!("upload-{}.audio", Uuid::new_v4())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            // The file may legitimately not exist if the upload failed
            // before the first chunk was written.
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Failed to remove scratch file"
                );
            }
        }
    }
}

/// Stream an upload's chunks into `dest` through a buffered writer.
///
/// Returns the number of bytes written. Completion means the incoming stream
/// ended AND the write buffer was flushed and synced to the underlying
/// medium; callers may read the file back immediately afterwards.
///
/// A chunk that would push the total past `max_bytes` aborts the write with
/// a validation error (the partial file is left for the guard to delete).
pub async fn store_stream<S, E>(mut stream: S, dest: &Path, max_bytes: usize) -> Result<u64, AppError>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
    E: Display,
{
    let file = tokio::fs::File::create(dest).await?;
    let mut writer = BufWriter::new(file);
    let mut written: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk =
            chunk.map_err(|e| AppError::BadRequest(format!("malformed upload stream: {}", e)))?;
        written += chunk.len() as u64;
        if written > max_bytes as u64 {
            return Err(AppError::ValidationError(format!(
                "upload too large: exceeds {} bytes",
                max_bytes
            )));
        }
        writer.write_all(&chunk).await?;
    }

    writer.flush().await?;
    writer.into_inner().sync_all().await?;

    Ok(written)
}

/// Reduce a client-supplied filename to something safe to log: the final
/// path component with control characters stripped.
pub fn sanitize_filename(raw: &str) -> String {
    let name = raw.rsplit(['/', '\\']).next().unwrap_or("");
    let cleaned: String = name.chars().filter(|c| !c.is_control()).collect();
    if cleaned.is_empty() || cleaned == "." || cleaned == ".." {
        "upload".to_string()
    } else {
        cleaned
    }
}
