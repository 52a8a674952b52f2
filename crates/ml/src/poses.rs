//! Recorded reference poses.
//!
//! A pose file is a comma-separated table with one row per frame. Rows that
//! do not parse as numbers (column headers, comments) are skipped. Only the
//! first `n_links` columns of each row are kept.

use std::path::Path;

use crate::error::PoseError;

/// Ordered sequence of joint-angle vectors.
#[derive(Clone, Debug, PartialEq)]
pub struct PoseSequence {
    poses: Vec<Vec<f32>>,
}

impl PoseSequence {
    /// Wrap in-memory poses.
    ///
    /// # Errors
    ///
    /// Fails for an empty sequence, ragged rows or non-finite angles.
    pub fn new(poses: Vec<Vec<f32>>) -> Result<Self, PoseError> {
        let Some(first) = poses.first() else {
            return Err(PoseError::Empty);
        };
        let width = first.len();
        for (line, pose) in poses.iter().enumerate() {
            if pose.len() != width {
                return Err(PoseError::ShortRow { line: line + 1, expected: width, got: pose.len() });
            }
            if pose.iter().any(|a| !a.is_finite()) {
                return Err(PoseError::NonFinite { line: line + 1 });
            }
        }
        Ok(Self { poses })
    }

    /// Parse CSV text.
    ///
    /// # Errors
    ///
    /// See [`PoseError`].
    pub fn from_csv_str(text: &str, n_links: usize) -> Result<Self, PoseError> {
        let mut poses = Vec::new();
        for (idx, line) in text.lines().enumerate() {
            let line_no = idx + 1;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let parsed: Result<Vec<f32>, _> = trimmed.split(',').map(|c| c.trim().parse::<f32>()).collect();
            let Ok(values) = parsed else {
                tracing::debug!(line = line_no, "skipping non-numeric pose row");
                continue;
            };
            if values.len() < n_links {
                return Err(PoseError::ShortRow { line: line_no, expected: n_links, got: values.len() });
            }
            let pose = values[..n_links].to_vec();
            if pose.iter().any(|a| !a.is_finite()) {
                return Err(PoseError::NonFinite { line: line_no });
            }
            poses.push(pose);
        }
        Self::new(poses)
    }

    /// Read and parse a CSV file.
    ///
    /// # Errors
    ///
    /// I/O failures and everything [`Self::from_csv_str`] reports.
    pub fn from_path(path: impl AsRef<Path>, n_links: usize) -> Result<Self, PoseError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| PoseError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let poses = Self::from_csv_str(&text, n_links)?;
        tracing::info!(path = %path.display(), frames = poses.len(), "loaded reference poses");
        Ok(poses)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.poses.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.poses.is_empty()
    }

    /// Angles of each pose.
    #[must_use]
    pub fn width(&self) -> usize {
        self.poses[0].len()
    }

    /// Pose `index`, saturating at the final frame.
    #[must_use]
    pub fn get_clamped(&self, index: usize) -> &[f32] {
        &self.poses[index.min(self.poses.len() - 1)]
    }
}
