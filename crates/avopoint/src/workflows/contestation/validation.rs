//! Cross-document consistency checks.
//!
//! The judgement itself (are these the same person, is the residence proof
//! recent) is delegated to a reasoning collaborator; this module collects
//! the evidence, phrases the question, and normalizes the answer. It never
//! raises: every failure degrades to an `ERROR`-status result, because
//! validation is advisory and must not sink the pipeline.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::sync::Arc;

use crate::anthropic::{extract_json_object, AnthropicClient, ContentBlock, MessageRequest};
use crate::documents::DocumentSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationStatus {
    Valid,
    Invalid,
    Warning,
    Error,
}

impl ValidationStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Valid => "VALID",
            Self::Invalid => "INVALID",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckStatus {
    Valid,
    Invalid,
    NotChecked,
    Error,
}

impl CheckStatus {
    fn from_verdict(answer: Option<bool>) -> Self {
        match answer {
            Some(true) => Self::Valid,
            Some(false) => Self::Invalid,
            None => Self::NotChecked,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NameConsistencyCheck {
    pub status: CheckStatus,
    pub details: String,
    pub found_names: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResidenceDateCheck {
    pub status: CheckStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_found: Option<String>,
    pub details: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationChecks {
    pub names_consistency: NameConsistencyCheck,
    pub justificatif_date: ResidenceDateCheck,
}

/// Produced once per task, never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub status: ValidationStatus,
    pub checks: ValidationChecks,
    pub summary: String,
}

impl ValidationResult {
    /// Catch-all shape for a collaborator or parse failure.
    pub fn error_with(detail: impl Into<String>) -> Self {
        let detail = detail.into();
        Self {
            status: ValidationStatus::Error,
            checks: ValidationChecks {
                names_consistency: NameConsistencyCheck {
                    status: CheckStatus::Error,
                    details: format!("validation failed: {detail}"),
                    found_names: Vec::new(),
                },
                justificatif_date: ResidenceDateCheck {
                    status: CheckStatus::Error,
                    date_found: None,
                    details: format!("validation failed: {detail}"),
                },
            },
            summary: format!("Validation error: {detail}"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ReasoningError {
    #[error("reasoning backend failed: {0}")]
    Backend(String),
}

/// Free-text in, parseable-JSON-ish text out.
#[async_trait]
pub trait ReasoningGateway: Send + Sync {
    async fn reason(&self, prompt: &str) -> Result<String, ReasoningError>;
}

/// Production gateway over the shared Anthropic client.
#[derive(Debug, Clone)]
pub struct AnthropicReasoner {
    client: AnthropicClient,
    model: String,
}

impl AnthropicReasoner {
    pub fn new(client: AnthropicClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }
}

#[async_trait]
impl ReasoningGateway for AnthropicReasoner {
    async fn reason(&self, prompt: &str) -> Result<String, ReasoningError> {
        let request = MessageRequest::user(
            self.model.clone(),
            1024,
            vec![ContentBlock::Text {
                text: prompt.to_string(),
            }],
        );
        self.client
            .complete(&request)
            .await
            .map_err(|err| ReasoningError::Backend(err.to_string()))
    }
}

/// The shape the collaborator is asked to answer in.
#[derive(Debug, Deserialize)]
struct LlmVerdict {
    #[serde(default)]
    names_consistent: Option<bool>,
    #[serde(default)]
    names_explanation: String,
    #[serde(default)]
    names_found: Vec<String>,
    #[serde(default)]
    date_valid: Option<bool>,
    #[serde(default)]
    date_explanation: Option<String>,
    #[serde(default)]
    date_found: Option<String>,
    #[serde(default)]
    overall_status: String,
    #[serde(default)]
    summary: String,
}

/// Names and residence-proof date gathered from the extracted documents.
struct Evidence {
    found_names: Vec<String>,
    justificatif_date: Option<String>,
    description: String,
}

impl Evidence {
    fn collect(documents: &DocumentSet) -> Self {
        let mut found_names = Vec::new();
        let mut description = String::new();
        let mut justificatif_date = None;

        if let Some(name) = documents
            .contravention
            .as_ref()
            .and_then(|data| data.identite.as_ref())
            .and_then(|identity| identity.full_name())
        {
            found_names.push(format!("Contravention: {name}"));
            let _ = writeln!(description, "- Contravention: {name}");
        }

        if let Some(name) = documents
            .permis
            .as_ref()
            .and_then(|data| data.identite.as_ref())
            .and_then(|identity| identity.full_name())
        {
            found_names.push(format!("Permis: {name}"));
            let _ = writeln!(description, "- Permis de conduire: {name}");
        }

        if let Some(name) = documents
            .certificat
            .as_ref()
            .and_then(|data| data.proprietaire.as_ref())
            .and_then(|owner| owner.full_name())
        {
            found_names.push(format!("Certificat: {name}"));
            let _ = writeln!(description, "- Certificat d'immatriculation: {name}");
        }

        if let Some(domicile) = documents.domicile.as_ref() {
            if let Some(name) = domicile
                .personne
                .as_ref()
                .and_then(|person| person.full_name())
            {
                found_names.push(format!("Justificatif: {name}"));
                justificatif_date = domicile
                    .domicile
                    .as_ref()
                    .and_then(|residence| residence.date_justificatif.clone());
                match &justificatif_date {
                    Some(date) => {
                        let _ =
                            writeln!(description, "- Justificatif de domicile: {name}, date: {date}");
                    }
                    None => {
                        let _ = writeln!(description, "- Justificatif de domicile: {name}");
                    }
                }
            }
        }

        Self {
            found_names,
            justificatif_date,
            description,
        }
    }
}

/// Normalizes the reasoning collaborator's answer into a [`ValidationResult`].
pub struct DocumentValidator<R> {
    gateway: Arc<R>,
}

impl<R> DocumentValidator<R>
where
    R: ReasoningGateway,
{
    pub fn new(gateway: Arc<R>) -> Self {
        Self { gateway }
    }

    /// Never fails; see the module docs.
    pub async fn validate(&self, documents: &DocumentSet, today: NaiveDate) -> ValidationResult {
        let evidence = Evidence::collect(documents);
        match self.consult(&evidence, today).await {
            Ok(result) => result,
            Err(detail) => ValidationResult::error_with(detail),
        }
    }

    async fn consult(&self, evidence: &Evidence, today: NaiveDate) -> Result<ValidationResult, String> {
        let prompt = build_prompt(evidence, today);
        let reply = self
            .gateway
            .reason(&prompt)
            .await
            .map_err(|err| err.to_string())?;

        let object = extract_json_object(&reply)
            .ok_or_else(|| "no JSON object in the reasoning reply".to_string())?;
        let verdict: LlmVerdict = serde_json::from_str(object)
            .map_err(|err| format!("unparseable reasoning reply: {err}"))?;

        Ok(shape_result(evidence, verdict))
    }
}

fn build_prompt(evidence: &Evidence, today: NaiveDate) -> String {
    let current_date = today.format("%d/%m/%Y");
    let names_json =
        serde_json::to_string(&evidence.found_names).unwrap_or_else(|_| "[]".to_string());
    let date_value = evidence
        .justificatif_date
        .as_deref()
        .unwrap_or("null")
        .to_string();

    format!(
        r#"Date du jour: {current_date}

Données extraites des documents:
{evidence}
Analyse ces données et vérifie:
1. Les noms/prénoms sont-ils cohérents entre tous les documents (même personne) ?
2. Si il y a un justificatif de domicile avec une date, cette date fait-elle moins de 3 mois par rapport à aujourd'hui ?

Réponds UNIQUEMENT au format JSON strict:
{{
  "names_consistent": true/false,
  "names_explanation": "explication détaillée de l'analyse des noms",
  "names_found": {names_json},
  "date_valid": true/false/null,
  "date_explanation": "explication de la vérification de date (null si pas de date)",
  "date_found": "{date_value}",
  "overall_status": "VALID/INVALID/WARNING",
  "summary": "résumé de la validation"
}}

Notes importantes:
- Pour les noms, considère les variations normales (majuscules/minuscules, tirets, espaces, accents)
- Pour la date, accepte tous les formats français courants
- Si pas de justificatif de domicile, date_valid = null
- Si moins de 2 noms trouvés, names_consistent = null"#,
        evidence = evidence.description,
    )
}

fn shape_result(evidence: &Evidence, verdict: LlmVerdict) -> ValidationResult {
    let status = match verdict.overall_status.trim() {
        "VALID" => ValidationStatus::Valid,
        "INVALID" => ValidationStatus::Invalid,
        _ => ValidationStatus::Warning,
    };

    let mut names_status = CheckStatus::from_verdict(verdict.names_consistent);
    if evidence.found_names.len() < 2 {
        // Not enough evidence to compare; true/false would both overclaim.
        names_status = CheckStatus::NotChecked;
    }

    let mut date_status = CheckStatus::from_verdict(verdict.date_valid);
    let mut date_found = verdict.date_found.filter(|date| date.as_str() != "null");
    if evidence.justificatif_date.is_none() {
        date_status = CheckStatus::NotChecked;
        date_found = None;
    }

    let found_names = if verdict.names_found.is_empty() {
        evidence.found_names.clone()
    } else {
        verdict.names_found
    };

    let summary = if verdict.summary.is_empty() {
        "Validation effectuée".to_string()
    } else {
        verdict.summary
    };

    ValidationResult {
        status,
        checks: ValidationChecks {
            names_consistency: NameConsistencyCheck {
                status: names_status,
                details: verdict.names_explanation,
                found_names,
            },
            justificatif_date: ResidenceDateCheck {
                status: date_status,
                date_found,
                details: verdict.date_explanation.unwrap_or_default(),
            },
        },
        summary,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::documents::DocumentKind;
    use serde_json::json;
    use std::sync::Mutex;

    struct ScriptedReasoner {
        reply: Mutex<Result<String, String>>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedReasoner {
        fn replying(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Mutex::new(Ok(reply.to_string())),
                prompts: Mutex::new(Vec::new()),
            })
        }

        fn failing(message: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Mutex::new(Err(message.to_string())),
                prompts: Mutex::new(Vec::new()),
            })
        }

        fn last_prompt(&self) -> String {
            self.prompts.lock().unwrap().last().cloned().unwrap_or_default()
        }
    }

    #[async_trait]
    impl ReasoningGateway for ScriptedReasoner {
        async fn reason(&self, prompt: &str) -> Result<String, ReasoningError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.reply
                .lock()
                .unwrap()
                .clone()
                .map_err(ReasoningError::Backend)
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 15).expect("valid date")
    }

    fn full_document_set() -> DocumentSet {
        let mut documents = DocumentSet::default();
        documents
            .insert(
                DocumentKind::Contravention,
                json!({"identité": {"nom": "DUPONT", "prenom": "Jean"}}),
            )
            .unwrap();
        documents
            .insert(
                DocumentKind::Permis,
                json!({"identite": {"nom": "Dupont", "prenom": "Jean"}}),
            )
            .unwrap();
        documents
            .insert(
                DocumentKind::Certificat,
                json!({"proprietaire": {"nom": "DUPONT", "prenom": "Jean"}}),
            )
            .unwrap();
        documents
            .insert(
                DocumentKind::Domicile,
                json!({
                    "personne": {"nom": "DUPONT", "prenom": "Jean"},
                    "domicile": {"adresse": "1 rue Haute, 35000 Rennes", "date_justificatif": "05-03-2024"}
                }),
            )
            .unwrap();
        documents
    }

    const AGREEING_VERDICT: &str = r#"{
        "names_consistent": true,
        "names_explanation": "Même personne sur les quatre documents.",
        "names_found": [],
        "date_valid": true,
        "date_explanation": "Justificatif daté de moins de trois mois.",
        "date_found": "05-03-2024",
        "overall_status": "VALID",
        "summary": "Dossier cohérent"
    }"#;

    #[tokio::test]
    async fn consistent_documents_yield_a_valid_result() {
        let gateway = ScriptedReasoner::replying(AGREEING_VERDICT);
        let validator = DocumentValidator::new(gateway.clone());

        let result = validator.validate(&full_document_set(), today()).await;
        assert_eq!(result.status, ValidationStatus::Valid);
        assert_eq!(result.checks.names_consistency.status, CheckStatus::Valid);
        assert_eq!(result.checks.justificatif_date.status, CheckStatus::Valid);
        assert_eq!(
            result.checks.justificatif_date.date_found.as_deref(),
            Some("05-03-2024")
        );
        assert_eq!(result.checks.names_consistency.found_names.len(), 4);

        let prompt = gateway.last_prompt();
        assert!(prompt.contains("Date du jour: 15/03/2024"));
        assert!(prompt.contains("- Permis de conduire: Dupont Jean"));
    }

    #[tokio::test]
    async fn wrapped_reply_is_still_parsed() {
        let wrapped = format!("Voici mon analyse :\n```json\n{AGREEING_VERDICT}\n```");
        let validator = DocumentValidator::new(ScriptedReasoner::replying(&wrapped));
        let result = validator.validate(&full_document_set(), today()).await;
        assert_eq!(result.status, ValidationStatus::Valid);
    }

    #[tokio::test]
    async fn fewer_than_two_names_is_never_checked() {
        let mut documents = DocumentSet::default();
        documents
            .insert(
                DocumentKind::Permis,
                json!({"identite": {"nom": "MARTIN", "prenom": "Luc"}}),
            )
            .unwrap();

        // Even an overconfident collaborator answer cannot promote the check.
        let verdict = r#"{"names_consistent": true, "overall_status": "VALID"}"#;
        let validator = DocumentValidator::new(ScriptedReasoner::replying(verdict));
        let result = validator.validate(&documents, today()).await;
        assert_eq!(
            result.checks.names_consistency.status,
            CheckStatus::NotChecked
        );
    }

    #[tokio::test]
    async fn missing_residence_date_is_never_checked() {
        let mut documents = full_document_set();
        documents
            .insert(
                DocumentKind::Domicile,
                json!({"personne": {"nom": "DUPONT", "prenom": "Jean"}, "domicile": {"adresse": "x", "date_justificatif": "NONE"}}),
            )
            .unwrap();

        let verdict = r#"{"names_consistent": true, "date_valid": false, "overall_status": "VALID"}"#;
        let validator = DocumentValidator::new(ScriptedReasoner::replying(verdict));
        let result = validator.validate(&documents, today()).await;
        assert_eq!(
            result.checks.justificatif_date.status,
            CheckStatus::NotChecked
        );
        assert!(result.checks.justificatif_date.date_found.is_none());
    }

    #[tokio::test]
    async fn stale_date_verdict_surfaces_as_invalid_check() {
        let verdict = r#"{
            "names_consistent": true,
            "date_valid": false,
            "date_explanation": "La date remonte à plus de trois mois.",
            "date_found": "01/02/2023",
            "overall_status": "WARNING",
            "summary": "Justificatif trop ancien"
        }"#;
        let validator = DocumentValidator::new(ScriptedReasoner::replying(verdict));
        let result = validator.validate(&full_document_set(), today()).await;
        assert_eq!(result.status, ValidationStatus::Warning);
        assert_eq!(result.checks.justificatif_date.status, CheckStatus::Invalid);
    }

    #[tokio::test]
    async fn collaborator_failure_degrades_to_error_result() {
        let validator =
            DocumentValidator::new(ScriptedReasoner::failing("connection reset by peer"));
        let result = validator.validate(&full_document_set(), today()).await;
        assert_eq!(result.status, ValidationStatus::Error);
        assert_eq!(result.checks.names_consistency.status, CheckStatus::Error);
        assert_eq!(result.checks.justificatif_date.status, CheckStatus::Error);
        assert!(result
            .checks
            .names_consistency
            .details
            .contains("connection reset by peer"));
    }

    #[tokio::test]
    async fn garbage_reply_degrades_to_error_result() {
        let validator = DocumentValidator::new(ScriptedReasoner::replying("je ne sais pas"));
        let result = validator.validate(&full_document_set(), today()).await;
        assert_eq!(result.status, ValidationStatus::Error);
    }
}
