//! Uploaded post images, stored below the media root.

use rand::{Rng, distr::Alphanumeric};
use std::{
    io,
    path::{Path, PathBuf},
};
use tokio::{fs, io::AsyncWriteExt};
use tracing::debug;

const POSTS_DIR: &str = "posts";
const SUFFIX_LEN: usize = 7;
const MAX_SAVE_ATTEMPTS: usize = 16;
const FALLBACK_STEM: &str = "image";

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct MediaStore {
    root: PathBuf,
}

impl MediaStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Writes an uploaded image to `posts/` and returns its path relative to
    /// the media root. Existing files are never overwritten; a random suffix
    /// is appended to the name instead.
    pub async fn save_post_image(&self, file_name: &str, bytes: &[u8]) -> io::Result<String> {
        let dir = self.root.join(POSTS_DIR);
        fs::create_dir_all(&dir).await?;

        let (stem, extension) = sanitize_file_name(file_name);
        let mut candidate = with_extension(&stem, extension.as_deref());

        for _ in 0..MAX_SAVE_ATTEMPTS {
            let open = fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(dir.join(&candidate))
                .await;

            match open {
                Ok(mut file) => {
                    file.write_all(bytes).await?;
                    file.flush().await?;

                    debug!(file = %candidate, size = bytes.len(), "Stored post image");
                    return Ok(format!("{POSTS_DIR}/{candidate}"));
                }
                Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                    let suffixed = format!("{stem}_{}", random_suffix());
                    candidate = with_extension(&suffixed, extension.as_deref());
                }
                Err(err) => return Err(err),
            }
        }

        Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("no free file name for {file_name}"),
        ))
    }
}

/// Splits the last path component of an uploaded name into a stem and an
/// extension, keeping only letters, digits, `-`, `_` and `.`.
fn sanitize_file_name(file_name: &str) -> (String, Option<String>) {
    let base = file_name.rsplit(['/', '\\']).next().unwrap_or_default();

    let cleaned: String = base
        .trim()
        .chars()
        .filter_map(|ch| match ch {
            ch if ch.is_whitespace() => Some('_'),
            ch if ch.is_alphanumeric() || matches!(ch, '-' | '_' | '.') => Some(ch),
            _ => None,
        })
        .collect();
    let cleaned = cleaned.trim_matches('.');

    let (stem, extension) = match cleaned.rsplit_once('.') {
        Some((stem, extension)) if !extension.is_empty() => (stem, Some(extension.to_lowercase())),
        _ => (cleaned, None),
    };

    let stem = if stem.is_empty() { FALLBACK_STEM } else { stem };
    (stem.to_owned(), extension)
}

fn with_extension(stem: &str, extension: Option<&str>) -> String {
    match extension {
        Some(extension) => format!("{stem}.{extension}"),
        None => stem.to_owned(),
    }
}

fn random_suffix() -> String {
    rand::rng()
        .sample_iter(Alphanumeric)
        .take(SUFFIX_LEN)
        .map(char::from)
        .collect()
}
