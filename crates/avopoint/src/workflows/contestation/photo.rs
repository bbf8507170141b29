//! Radar-photo analysis seam.
//!
//! Decides whether the driver is identifiable on the control photo, which
//! flips the contestation grounds used by the letter. The default
//! implementation is a constant: no classifier is wired in, and "not
//! visible" is the conservative answer for a contestation.

use async_trait::async_trait;

use crate::documents::DocumentSet;

#[derive(Debug, thiserror::Error)]
pub enum PhotoAnalysisError {
    #[error("photo analysis failed: {0}")]
    Backend(String),
}

#[async_trait]
pub trait DriverVisibilityAnalyzer: Send + Sync {
    async fn driver_visible(&self, documents: &DocumentSet) -> Result<bool, PhotoAnalysisError>;
}

/// Always-available default analyzer returning a fixed verdict.
#[derive(Debug, Clone, Copy)]
pub struct ConstantDriverVisibility(pub bool);

impl Default for ConstantDriverVisibility {
    fn default() -> Self {
        Self(false)
    }
}

#[async_trait]
impl DriverVisibilityAnalyzer for ConstantDriverVisibility {
    async fn driver_visible(&self, _documents: &DocumentSet) -> Result<bool, PhotoAnalysisError> {
        Ok(self.0)
    }
}
