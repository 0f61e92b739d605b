// src/error.rs
use std::path::PathBuf;

/// Failures that abort a single map render.
///
/// Near-pole projection, an unsolvable viewport and labels that cannot be
/// placed cleanly are recovered where they happen and only logged.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("no CJK-capable font could be loaded ({} candidates tried)", tried.len())]
    FontNotFound { tried: Vec<PathBuf> },

    #[error("invalid encoded polyline: {0}")]
    Polyline(String),

    #[error(
        "base map is {actual_width}x{actual_height} but the viewport expects {expected_width}x{expected_height}"
    )]
    CanvasMismatch {
        actual_width: u32,
        actual_height: u32,
        expected_width: u32,
        expected_height: u32,
    },

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("failed to write {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type RenderResult<T> = std::result::Result<T, RenderError>;
