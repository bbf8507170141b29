//! Per-document extraction prompts. The JSON schemas here are the contract
//! mirrored by the typed structures in `crate::documents`.

use crate::documents::DocumentKind;

pub(crate) fn extraction_prompt(kind: DocumentKind) -> &'static str {
    match kind {
        DocumentKind::Contravention => CONTRAVENTION_PROMPT,
        DocumentKind::Certificat => CERTIFICAT_PROMPT,
        DocumentKind::Permis => PERMIS_PROMPT,
        DocumentKind::Domicile => DOMICILE_PROMPT,
    }
}

/// Token budget per document kind; the violation notice carries the densest
/// layout and gets the larger budget.
pub(crate) const fn max_tokens(kind: DocumentKind) -> u32 {
    match kind {
        DocumentKind::Permis => 2048,
        _ => 4024,
    }
}

const CONTRAVENTION_PROMPT: &str = r#"Analyse cette image d'avis de contravention français et extrais les informations suivantes au format JSON strict. Si une information n'est pas disponible, utilise "NONE".

Structure JSON attendue:
{
  "identité": {
    "nom": "nom de la personne verbalisée",
    "prenom": "prénom de la personne verbalisée",
    "adresse": "adresse de la personne verbalisée"
  },
  "infraction": {
    "numero_avis": "numéro de l'avis de contravention",
    "date_heure": "date et heure de l'infraction (format exact trouvé)",
    "format_date": "DD/MM/YYYY:HHhMM",
    "route": "nom de la route (ex: D938, A10, etc.)",
    "exces_vitesse_kmh": nombre (vitesse mesurée - vitesse autorisée),
    "vitesse_maximale_autorisee": nombre,
    "vitesse_mesuree": nombre
  },
  "identification_vehicule": {
    "immatriculation": "numéro d'immatriculation",
    "pays": "pays d'immatriculation",
    "marque": "marque du véhicule"
  },
  "appareil_controle": {
    "type": "type d'appareil de contrôle",
    "date_derniere_verification": "date de dernière vérification"
  },
  "agent_verbalisateur": {
    "agent_verbalisateur": "Numéro de l'agent verbalisateur",
    "service": "nom du service verbalisateur"
  },
  "réglements": {
    "date_15j": "date à compter de laquelle la personne doit payer dans les 15 jours",
    "adresse_demarche": "Adresse à laquelle adresser requêtes par lettre recommandée"
  }
}

Retourne UNIQUEMENT le JSON, sans commentaire ni explication. Si l'information est indisponible, return NONE."#;

const PERMIS_PROMPT: &str = r#"Analyse cette image de permis de conduire français et extrais les informations suivantes au format JSON strict. Si une information n'est pas disponible, utilise "NONE".

Structure JSON attendue:
{
  "identite": {
    "nom": "nom de famille",
    "prenom": "prénom(s)",
    "date_naissance": "DD/MM/YYYY",
    "lieu_naissance": "ville et pays de naissance"
  },
  "permis": {
    "numero_permis": "numéro du permis",
    "date_delivrance": "DD/MM/YYYY",
    "date_expiration": "DD/MM/YYYY",
    "autorite_delivrance": "préfecture ou autorité",
    "categories": ["B", "A1", "etc."]
  },
  "adresse": {
    "adresse_complete": "adresse complète",
    "code_postal": "code postal",
    "ville": "ville"
  }
}

Retourne UNIQUEMENT le JSON, sans commentaire ni explication."#;

const CERTIFICAT_PROMPT: &str = r#"Analyse cette image de certificat d'immatriculation français (carte grise) et extrais UNIQUEMENT les informations suivantes au format JSON strict. Si une information n'est pas disponible, utilise "NONE".

Structure JSON attendue:
{
  "proprietaire": {
    "nom": "nom de famille du propriétaire",
    "prenom": "prénom du propriétaire"
  },
  "vehicule": {
    "immatriculation": "numéro d'immatriculation au format XX-123-XX",
    "marque": "marque du véhicule uniquement"
  }
}

IMPORTANT:
- Pour l'immatriculation, cherche le format XX-123-XX (2 lettres, 3 chiffres, 2 lettres)
- Pour la marque, donne uniquement la marque (ex: PEUGEOT, RENAULT, etc.)
- Ne pas inclure le modèle, juste la marque

Retourne UNIQUEMENT le JSON, sans commentaire ni explication."#;

const DOMICILE_PROMPT: &str = r#"Analyse cette image de justificatif de domicile français (facture, attestation, etc.) et extrais UNIQUEMENT les informations suivantes au format JSON strict. Si une information n'est pas disponible, utilise "NONE".

Structure JSON attendue:
{
  "personne": {
    "nom": "nom de famille de la personne",
    "prenom": "prénom de la personne"
  },
  "domicile": {
    "adresse": "adresse complète du domicile",
    "date_justificatif": "date du justificatif (convertis au format: DD-MM-YYYY)"
  }
}

IMPORTANT:
- Cherche le nom et prénom du titulaire/destinataire du document
- Pour l'adresse, donne l'adresse complète (rue, code postal, ville)
- Pour la date, utilise le format exact trouvé sur le document (peut être une date de facture, d'émission, etc.)

Retourne UNIQUEMENT le JSON, sans commentaire ni explication."#;
