//! Fallback-chained rendering of the contestation letter.
//!
//! Three interchangeable backends produce the same semantic document at
//! decreasing fidelity: a LaTeX compile, a programmatic PDF, and a styled
//! HTML file. Selection happens once, by availability probe, before any
//! generation starts; a failure in the chosen backend is reported as-is and
//! never silently retried against a lower-priority backend.

mod fields;
mod html;
mod latex;
mod pdf;

pub use fields::{ContestationGround, LetterFields, PLACEHOLDER};

use std::path::PathBuf;
use std::time::Duration;

use crate::documents::DocumentSet;
use crate::workflows::contestation::store::TaskId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LetterBackend {
    Latex,
    Pdf,
    Html,
}

impl LetterBackend {
    /// Strict priority order; pure over the availability flags.
    pub fn select(availability: BackendAvailability) -> Self {
        if availability.latex {
            Self::Latex
        } else if availability.pdf {
            Self::Pdf
        } else {
            Self::Html
        }
    }
}

/// Which backends this host can run.
#[derive(Debug, Clone, Copy)]
pub struct BackendAvailability {
    pub latex: bool,
    pub pdf: bool,
}

impl BackendAvailability {
    /// Probes pdflatex on PATH; the PDF library is compiled in and thus
    /// always available, leaving HTML as the unconditional last resort.
    pub fn detect() -> Self {
        Self {
            latex: latex::pdflatex_available(),
            pdf: true,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LetterError {
    #[error("letter output failed at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("pdflatex failed: {0}")]
    Compiler(String),
    #[error("pdflatex timed out after {0:?}")]
    CompilerTimeout(Duration),
    #[error("pdf composition failed: {0}")]
    Pdf(String),
}

/// Renders contestation letters into the results directory.
pub struct LetterRenderer {
    results_dir: PathBuf,
    availability: BackendAvailability,
    latex_timeout: Duration,
}

impl LetterRenderer {
    pub fn new(results_dir: PathBuf, latex_timeout: Duration) -> Self {
        Self::with_availability(results_dir, latex_timeout, BackendAvailability::detect())
    }

    /// Fixed availability, used by tests and the CLI demo to force a backend.
    pub fn with_availability(
        results_dir: PathBuf,
        latex_timeout: Duration,
        availability: BackendAvailability,
    ) -> Self {
        Self {
            results_dir,
            availability,
            latex_timeout,
        }
    }

    pub fn backend(&self) -> LetterBackend {
        LetterBackend::select(self.availability)
    }

    /// Produces the final artifact and returns its path.
    pub async fn render(
        &self,
        documents: &DocumentSet,
        driver_visible: bool,
        task_id: &TaskId,
    ) -> Result<PathBuf, LetterError> {
        tokio::fs::create_dir_all(&self.results_dir)
            .await
            .map_err(|source| LetterError::Io {
                path: self.results_dir.clone(),
                source,
            })?;

        let fields = LetterFields::from_documents(documents, driver_visible);
        match self.backend() {
            LetterBackend::Latex => {
                latex::render(&fields, &self.results_dir, task_id, self.latex_timeout).await
            }
            LetterBackend::Pdf => pdf::render(&fields, &self.results_dir, task_id),
            LetterBackend::Html => html::render(&fields, &self.results_dir, task_id).await,
        }
    }
}
