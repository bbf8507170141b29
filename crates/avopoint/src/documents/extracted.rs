//! Typed-but-partial shapes for the four extraction payloads.
//!
//! Field and group names mirror the JSON structures the extraction prompts
//! request, accented keys included. Every field is optional: the model is
//! free to omit groups, and sentinel scrubbing turns unknowns into `None`.

use super::normalize::lenient_u32;
use serde::{Deserialize, Serialize};

fn join_name(nom: &Option<String>, prenom: &Option<String>) -> Option<String> {
    let surname = nom.as_deref().map(str::trim).filter(|s| !s.is_empty())?;
    let full = match prenom.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(given) => format!("{surname} {given}"),
        None => surname.to_string(),
    };
    Some(full)
}

// --- avis de contravention ---

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContraventionData {
    #[serde(default, rename = "identité", alias = "identite")]
    pub identite: Option<ContraventionIdentity>,
    #[serde(default)]
    pub infraction: Option<InfractionDetails>,
    #[serde(default)]
    pub identification_vehicule: Option<VehicleIdentification>,
    #[serde(default)]
    pub appareil_controle: Option<SpeedDevice>,
    #[serde(default)]
    pub agent_verbalisateur: Option<IssuingAgent>,
    #[serde(default, rename = "réglements", alias = "reglements")]
    pub reglements: Option<PaymentTerms>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContraventionIdentity {
    #[serde(default)]
    pub nom: Option<String>,
    #[serde(default)]
    pub prenom: Option<String>,
    #[serde(default)]
    pub adresse: Option<String>,
}

impl ContraventionIdentity {
    pub fn full_name(&self) -> Option<String> {
        join_name(&self.nom, &self.prenom)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InfractionDetails {
    #[serde(default)]
    pub numero_avis: Option<String>,
    #[serde(default)]
    pub date_heure: Option<String>,
    #[serde(default)]
    pub format_date: Option<String>,
    #[serde(default)]
    pub route: Option<String>,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub exces_vitesse_kmh: Option<u32>,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub vitesse_maximale_autorisee: Option<u32>,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub vitesse_mesuree: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VehicleIdentification {
    #[serde(default)]
    pub immatriculation: Option<String>,
    #[serde(default)]
    pub pays: Option<String>,
    #[serde(default)]
    pub marque: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpeedDevice {
    #[serde(default, rename = "type")]
    pub device_type: Option<String>,
    #[serde(default)]
    pub date_derniere_verification: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IssuingAgent {
    #[serde(default)]
    pub agent_verbalisateur: Option<String>,
    #[serde(default)]
    pub service: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PaymentTerms {
    #[serde(default)]
    pub date_15j: Option<String>,
    #[serde(default)]
    pub adresse_demarche: Option<String>,
}

// --- certificat d'immatriculation ---

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CertificatData {
    #[serde(default)]
    pub proprietaire: Option<OwnerIdentity>,
    #[serde(default)]
    pub vehicule: Option<RegisteredVehicle>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OwnerIdentity {
    #[serde(default)]
    pub nom: Option<String>,
    #[serde(default)]
    pub prenom: Option<String>,
}

impl OwnerIdentity {
    pub fn full_name(&self) -> Option<String> {
        join_name(&self.nom, &self.prenom)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegisteredVehicle {
    #[serde(default)]
    pub immatriculation: Option<String>,
    #[serde(default)]
    pub marque: Option<String>,
}

// --- permis de conduire ---

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PermisData {
    #[serde(default)]
    pub identite: Option<LicenceIdentity>,
    #[serde(default)]
    pub permis: Option<LicenceDetails>,
    #[serde(default)]
    pub adresse: Option<LicenceAddress>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LicenceIdentity {
    #[serde(default)]
    pub nom: Option<String>,
    #[serde(default)]
    pub prenom: Option<String>,
    #[serde(default)]
    pub date_naissance: Option<String>,
    #[serde(default)]
    pub lieu_naissance: Option<String>,
}

impl LicenceIdentity {
    pub fn full_name(&self) -> Option<String> {
        join_name(&self.nom, &self.prenom)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LicenceDetails {
    #[serde(default)]
    pub numero_permis: Option<String>,
    #[serde(default)]
    pub date_delivrance: Option<String>,
    #[serde(default)]
    pub date_expiration: Option<String>,
    #[serde(default)]
    pub autorite_delivrance: Option<String>,
    #[serde(default)]
    pub categories: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LicenceAddress {
    #[serde(default)]
    pub adresse_complete: Option<String>,
    #[serde(default)]
    pub code_postal: Option<String>,
    #[serde(default)]
    pub ville: Option<String>,
}

// --- justificatif de domicile ---

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DomicileData {
    #[serde(default)]
    pub personne: Option<ResidentIdentity>,
    #[serde(default)]
    pub domicile: Option<ResidenceDetails>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResidentIdentity {
    #[serde(default)]
    pub nom: Option<String>,
    #[serde(default)]
    pub prenom: Option<String>,
}

impl ResidentIdentity {
    pub fn full_name(&self) -> Option<String> {
        join_name(&self.nom, &self.prenom)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResidenceDetails {
    #[serde(default)]
    pub adresse: Option<String>,
    #[serde(default)]
    pub date_justificatif: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_name_requires_a_surname() {
        let identity = ResidentIdentity {
            nom: None,
            prenom: Some("Jean".to_string()),
        };
        assert_eq!(identity.full_name(), None);

        let identity = ResidentIdentity {
            nom: Some("DUPONT".to_string()),
            prenom: Some("Jean".to_string()),
        };
        assert_eq!(identity.full_name().as_deref(), Some("DUPONT Jean"));

        let identity = ResidentIdentity {
            nom: Some("  ".to_string()),
            prenom: None,
        };
        assert_eq!(identity.full_name(), None);
    }

    #[test]
    fn accented_group_keys_deserialize() {
        let payload = serde_json::json!({
            "identité": {"nom": "DUPONT", "prenom": "Jean"},
            "réglements": {"date_15j": "30/01/2024"}
        });
        let data: ContraventionData = serde_json::from_value(payload).expect("parse");
        assert_eq!(
            data.identite.and_then(|ident| ident.full_name()).as_deref(),
            Some("DUPONT Jean")
        );
        assert_eq!(
            data.reglements.and_then(|terms| terms.date_15j).as_deref(),
            Some("30/01/2024")
        );
    }
}
