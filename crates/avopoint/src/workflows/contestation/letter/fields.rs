//! Defensive field extraction shared by the three letter backends.

use chrono::{Local, NaiveDate};

use crate::documents::DocumentSet;

/// Substituted verbatim wherever a source field is absent.
pub const PLACEHOLDER: &str = "N/A";

/// Fixed fine for speeding in a ≤50 km/h zone and above 90 km/h.
const FINE_URBAN_OR_FAST: &str = "135";
/// Fixed fine for speeding where the limit sits between 51 and 90 km/h.
const FINE_RURAL: &str = "68";

/// One numbered ground of the contestation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContestationGround {
    pub title: &'static str,
    pub detail: &'static str,
}

const GROUNDS_DRIVER_VISIBLE: [ContestationGround; 5] = [
    ContestationGround {
        title: "Défaut de signalisation",
        detail: "La signalisation du contrôle radar n'était pas conforme aux dispositions réglementaires en vigueur.",
    },
    ContestationGround {
        title: "Conditions de circulation",
        detail: "Les conditions de circulation au moment des faits ne permettaient pas le respect de la limitation de vitesse en toute sécurité.",
    },
    ContestationGround {
        title: "Calibrage de l'appareil",
        detail: "Je conteste la fiabilité de l'appareil de contrôle et demande la production du certificat de vérification périodique.",
    },
    ContestationGround {
        title: "Erreur sur la personne",
        detail: "Je n'étais pas le conducteur du véhicule au moment des faits reprochés.",
    },
    ContestationGround {
        title: "Vice de procédure",
        detail: "La procédure de constatation de l'infraction présente des irrégularités substantielles.",
    },
];

const GROUNDS_DRIVER_NOT_VISIBLE: [ContestationGround; 5] = [
    ContestationGround {
        title: "Impossibilité d'identification du conducteur",
        detail: "La photographie jointe à l'avis de contravention ne permet pas d'identifier clairement le conducteur du véhicule au moment des faits.",
    },
    ContestationGround {
        title: "Défaut de preuve",
        detail: "En application de l'article 529-2 du Code de procédure pénale, l'administration doit apporter la preuve de l'infraction. La photo fournie ne constitue pas une preuve suffisante de mon implication personnelle.",
    },
    ContestationGround {
        title: "Principe de la présomption d'innocence",
        detail: "Conformément à l'article 9 de la Déclaration des droits de l'homme et du citoyen, toute personne est présumée innocente jusqu'à ce que sa culpabilité soit établie.",
    },
    ContestationGround {
        title: "Qualité de la photographie",
        detail: "La qualité de l'image ne permet pas une identification formelle et certaine du conducteur, rendant impossible l'établissement de ma responsabilité.",
    },
    ContestationGround {
        title: "Usage possible du véhicule par un tiers",
        detail: "Le véhicule aurait pu être utilisé par une tierce personne autorisée au moment des faits reprochés.",
    },
];

/// Recipient block of the letter.
pub(crate) const RECIPIENT_LINES: [&str; 4] = [
    "Service de Traitement des Contraventions",
    "Centre National de Traitement",
    "CS 41101",
    "35911 RENNES CEDEX 9",
];

/// Attachments enumerated at the bottom of the letter.
pub(crate) const ATTACHMENTS: [&str; 5] = [
    "Copie de l'avis de contravention",
    "Copie du certificat d'immatriculation",
    "Copie du permis de conduire",
    "Copie du justificatif de domicile",
    "Photo du contrôle radar (si applicable)",
];

/// The resolved content of one letter, identical across backends.
#[derive(Debug, Clone)]
pub struct LetterFields {
    pub full_name: String,
    pub address: String,
    pub notice_number: String,
    pub violation_date: String,
    pub violation_location: String,
    pub registration: String,
    pub vehicle_make: String,
    pub fine_estimate: String,
    pub grounds: &'static [ContestationGround; 5],
    pub letter_date: String,
}

impl LetterFields {
    pub fn from_documents(documents: &DocumentSet, driver_visible: bool) -> Self {
        Self::with_date(documents, driver_visible, Local::now().date_naive())
    }

    pub fn with_date(documents: &DocumentSet, driver_visible: bool, date: NaiveDate) -> Self {
        // Sender identity: licence first, then residence proof, then the
        // registration certificate.
        let full_name = documents
            .permis
            .as_ref()
            .and_then(|data| data.identite.as_ref())
            .and_then(|identity| identity.full_name())
            .or_else(|| {
                documents
                    .domicile
                    .as_ref()
                    .and_then(|data| data.personne.as_ref())
                    .and_then(|person| person.full_name())
            })
            .or_else(|| {
                documents
                    .certificat
                    .as_ref()
                    .and_then(|data| data.proprietaire.as_ref())
                    .and_then(|owner| owner.full_name())
            })
            .unwrap_or_else(|| PLACEHOLDER.to_string());

        let address = documents
            .domicile
            .as_ref()
            .and_then(|data| data.domicile.as_ref())
            .and_then(|residence| residence.adresse.clone())
            .unwrap_or_else(|| PLACEHOLDER.to_string());

        let infraction = documents
            .contravention
            .as_ref()
            .and_then(|data| data.infraction.as_ref());
        let notice_number = infraction
            .and_then(|details| details.numero_avis.clone())
            .unwrap_or_else(|| PLACEHOLDER.to_string());
        let violation_date = infraction
            .and_then(|details| details.date_heure.clone())
            .unwrap_or_else(|| PLACEHOLDER.to_string());
        let violation_location = infraction
            .and_then(|details| details.route.clone())
            .unwrap_or_else(|| PLACEHOLDER.to_string());

        let fine_estimate = infraction
            .and_then(|details| details.vitesse_maximale_autorisee)
            .map(|limit| match limit {
                0..=50 => FINE_URBAN_OR_FAST,
                51..=90 => FINE_RURAL,
                _ => FINE_URBAN_OR_FAST,
            })
            .unwrap_or(PLACEHOLDER)
            .to_string();

        let vehicle = documents
            .certificat
            .as_ref()
            .and_then(|data| data.vehicule.as_ref());
        let registration = vehicle
            .and_then(|details| details.immatriculation.clone())
            .unwrap_or_else(|| PLACEHOLDER.to_string());
        let vehicle_make = vehicle
            .and_then(|details| details.marque.clone())
            .unwrap_or_else(|| PLACEHOLDER.to_string());

        let grounds = if driver_visible {
            &GROUNDS_DRIVER_VISIBLE
        } else {
            &GROUNDS_DRIVER_NOT_VISIBLE
        };

        Self {
            full_name,
            address,
            notice_number,
            violation_date,
            violation_location,
            registration,
            vehicle_make,
            fine_estimate,
            grounds,
            letter_date: date.format("%d/%m/%Y").to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::documents::DocumentKind;
    use serde_json::json;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 20).expect("valid date")
    }

    #[test]
    fn name_resolution_prefers_the_licence() {
        let mut documents = DocumentSet::default();
        documents
            .insert(
                DocumentKind::Permis,
                json!({"identite": {"nom": "DUPONT", "prenom": "Jean"}}),
            )
            .unwrap();
        documents
            .insert(
                DocumentKind::Domicile,
                json!({"personne": {"nom": "AUTRE", "prenom": "Nom"}}),
            )
            .unwrap();

        let fields = LetterFields::with_date(&documents, false, date());
        assert_eq!(fields.full_name, "DUPONT Jean");
    }

    #[test]
    fn name_resolution_falls_through_domicile_then_certificat() {
        let mut documents = DocumentSet::default();
        documents
            .insert(
                DocumentKind::Permis,
                json!({"identite": {"nom": "NONE", "prenom": "NONE"}}),
            )
            .unwrap();
        documents
            .insert(
                DocumentKind::Certificat,
                json!({"proprietaire": {"nom": "LEGRAND", "prenom": "Anne"}}),
            )
            .unwrap();

        let fields = LetterFields::with_date(&documents, false, date());
        assert_eq!(fields.full_name, "LEGRAND Anne");
    }

    #[test]
    fn absent_fields_become_placeholders() {
        let fields = LetterFields::with_date(&DocumentSet::default(), false, date());
        assert_eq!(fields.full_name, PLACEHOLDER);
        assert_eq!(fields.address, PLACEHOLDER);
        assert_eq!(fields.notice_number, PLACEHOLDER);
        assert_eq!(fields.registration, PLACEHOLDER);
        assert_eq!(fields.fine_estimate, PLACEHOLDER);
    }

    #[test]
    fn fine_estimate_follows_the_posted_limit() {
        let limits = [(50, "135"), (51, "68"), (90, "68"), (110, "135")];
        for (limit, expected) in limits {
            let mut documents = DocumentSet::default();
            documents
                .insert(
                    DocumentKind::Contravention,
                    json!({"infraction": {"vitesse_maximale_autorisee": limit}}),
                )
                .unwrap();
            let fields = LetterFields::with_date(&documents, false, date());
            assert_eq!(fields.fine_estimate, expected, "limit {limit}");
        }
    }

    #[test]
    fn non_numeric_limit_degrades_to_placeholder() {
        let mut documents = DocumentSet::default();
        documents
            .insert(
                DocumentKind::Contravention,
                json!({"infraction": {"vitesse_maximale_autorisee": "inconnue"}}),
            )
            .unwrap();
        let fields = LetterFields::with_date(&documents, false, date());
        assert_eq!(fields.fine_estimate, PLACEHOLDER);
    }

    #[test]
    fn grounds_swap_wholesale_with_driver_visibility() {
        let visible = LetterFields::with_date(&DocumentSet::default(), true, date());
        let hidden = LetterFields::with_date(&DocumentSet::default(), false, date());
        assert_eq!(visible.grounds.len(), 5);
        assert_eq!(hidden.grounds.len(), 5);
        assert_ne!(visible.grounds[0].title, hidden.grounds[0].title);
        assert_eq!(
            hidden.grounds[0].title,
            "Impossibilité d'identification du conducteur"
        );
    }
}
