use crate::documents::DocumentKind;
use serde::{Deserialize, Serialize};

/// Pipeline stages in required order, plus the two terminal states.
///
/// Each status pins a progress value and a default client-facing message;
/// the store applies this table on every transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Uploaded,
    ScanningContravention,
    ScanningCertificat,
    ScanningPermis,
    ScanningDomicile,
    Validating,
    FillingForm,
    AnalyzingPhoto,
    GeneratingPdf,
    Completed,
    Failed,
}

impl TaskStatus {
    /// Progress in [-1, 100]; -1 is the failure sentinel.
    pub const fn progress(self) -> i8 {
        match self {
            Self::Uploaded => 0,
            Self::ScanningContravention => 10,
            Self::ScanningCertificat => 15,
            Self::ScanningPermis => 20,
            Self::ScanningDomicile => 25,
            Self::Validating => 40,
            Self::FillingForm => 60,
            Self::AnalyzingPhoto => 80,
            Self::GeneratingPdf => 90,
            Self::Completed => 100,
            Self::Failed => -1,
        }
    }

    pub const fn message(self) -> &'static str {
        match self {
            Self::Uploaded => "Documents received",
            Self::ScanningContravention => "Extracting the violation notice data",
            Self::ScanningCertificat => "Extracting the vehicle registration data",
            Self::ScanningPermis => "Extracting the driving licence data",
            Self::ScanningDomicile => "Extracting the proof of residence data",
            Self::Validating => "Cross-checking the extracted data",
            Self::FillingForm => "Submitting the government web form",
            Self::AnalyzingPhoto => "Analyzing the radar photo",
            Self::GeneratingPdf => "Rendering the contestation letter",
            Self::Completed => "Processing finished",
            Self::Failed => "Processing failed",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// The SCREAMING_SNAKE_CASE name clients see on the wire.
    pub const fn as_wire_str(self) -> &'static str {
        match self {
            Self::Uploaded => "UPLOADED",
            Self::ScanningContravention => "SCANNING_CONTRAVENTION",
            Self::ScanningCertificat => "SCANNING_CERTIFICAT",
            Self::ScanningPermis => "SCANNING_PERMIS",
            Self::ScanningDomicile => "SCANNING_DOMICILE",
            Self::Validating => "VALIDATING",
            Self::FillingForm => "FILLING_FORM",
            Self::AnalyzingPhoto => "ANALYZING_PHOTO",
            Self::GeneratingPdf => "GENERATING_PDF",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
        }
    }

    /// The extraction stage gating the given document kind.
    pub const fn scanning(kind: DocumentKind) -> Self {
        match kind {
            DocumentKind::Contravention => Self::ScanningContravention,
            DocumentKind::Certificat => Self::ScanningCertificat,
            DocumentKind::Permis => Self::ScanningPermis,
            DocumentKind::Domicile => Self::ScanningDomicile,
        }
    }
}
