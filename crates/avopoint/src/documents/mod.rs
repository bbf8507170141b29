//! Source documents of a contestation and the semi-structured data the
//! vision model extracts from them.
//!
//! Extraction replies arrive as loosely-shaped JSON in which the literal
//! string `"NONE"` marks a field the model could not find. The payload
//! crosses into the typed world exactly once, through
//! [`DocumentSet::insert`]: sentinels are scrubbed to true absences there,
//! and every downstream consumer works with `Option` fields instead of
//! re-checking magic strings.

mod extracted;
mod normalize;

pub use extracted::{
    CertificatData, ContraventionData, ContraventionIdentity, DomicileData, InfractionDetails,
    IssuingAgent, LicenceAddress, LicenceDetails, LicenceIdentity, OwnerIdentity, PaymentTerms,
    PermisData, RegisteredVehicle, ResidenceDetails, ResidentIdentity, SpeedDevice,
    VehicleIdentification,
};
pub use normalize::scrub_sentinels;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// The four documents a contestation is built from.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Contravention,
    Certificat,
    Permis,
    Domicile,
}

impl DocumentKind {
    /// Pipeline scan order.
    pub const fn ordered() -> [Self; 4] {
        [
            Self::Contravention,
            Self::Certificat,
            Self::Permis,
            Self::Domicile,
        ]
    }

    /// Wire name, also used as the multipart field name on upload.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Contravention => "contravention",
            Self::Certificat => "certificat",
            Self::Permis => "permis",
            Self::Domicile => "domicile",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Contravention => "avis de contravention",
            Self::Certificat => "certificat d'immatriculation",
            Self::Permis => "permis de conduire",
            Self::Domicile => "justificatif de domicile",
        }
    }

    pub fn from_field_name(name: &str) -> Option<Self> {
        match name {
            "contravention" => Some(Self::Contravention),
            "certificat" => Some(Self::Certificat),
            "permis" => Some(Self::Permis),
            "domicile" => Some(Self::Domicile),
            _ => None,
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error raised when an extraction payload cannot be shaped into its typed
/// structure even after normalization.
#[derive(Debug, thiserror::Error)]
#[error("malformed {kind} payload: {source}")]
pub struct DocumentError {
    pub kind: DocumentKind,
    #[source]
    source: serde_json::Error,
}

/// The (possibly partial) set of extracted documents owned by one task.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentSet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contravention: Option<ContraventionData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificat: Option<CertificatData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permis: Option<PermisData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domicile: Option<DomicileData>,
}

impl DocumentSet {
    /// Normalizes a raw extraction payload (scrubbing `"NONE"` sentinels)
    /// and stores it under `kind`. Missing keys, missing groups, and extra
    /// fields are all tolerated; only a structurally incompatible payload is
    /// an error.
    pub fn insert(&mut self, kind: DocumentKind, mut payload: Value) -> Result<(), DocumentError> {
        scrub_sentinels(&mut payload);
        let malformed = |source| DocumentError { kind, source };
        match kind {
            DocumentKind::Contravention => {
                self.contravention = Some(serde_json::from_value(payload).map_err(malformed)?);
            }
            DocumentKind::Certificat => {
                self.certificat = Some(serde_json::from_value(payload).map_err(malformed)?);
            }
            DocumentKind::Permis => {
                self.permis = Some(serde_json::from_value(payload).map_err(malformed)?);
            }
            DocumentKind::Domicile => {
                self.domicile = Some(serde_json::from_value(payload).map_err(malformed)?);
            }
        }
        Ok(())
    }

    pub fn contains(&self, kind: DocumentKind) -> bool {
        match kind {
            DocumentKind::Contravention => self.contravention.is_some(),
            DocumentKind::Certificat => self.certificat.is_some(),
            DocumentKind::Permis => self.permis.is_some(),
            DocumentKind::Domicile => self.domicile.is_some(),
        }
    }

    pub fn present_kinds(&self) -> Vec<DocumentKind> {
        DocumentKind::ordered()
            .into_iter()
            .filter(|kind| self.contains(*kind))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.present_kinds().is_empty()
    }
}
