//! Government web-form collaborator seam.
//!
//! The intended side effect is out-of-band: the browser agent submits the
//! saisine form and has the radar photo e-mailed to the lawyer. No binary
//! payload ever comes back and no local file handle is retained.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::documents::DocumentSet;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormReport {
    pub status: String,
    pub form_completed: bool,
    pub recipient_email: String,
    pub message: String,
    pub details: String,
}

#[derive(Debug, thiserror::Error)]
pub enum FormSubmissionError {
    #[error("form agent failed: {0}")]
    Agent(String),
}

#[async_trait]
pub trait FormGateway: Send + Sync {
    async fn submit(&self, documents: &DocumentSet) -> Result<FormReport, FormSubmissionError>;
}

/// Composes the browser-agent brief for the saisine form.
///
/// The brief is complete and the report contract is final, but the headless
/// browser runner is not wired in yet: submission currently reports success
/// without driving a browser.
// TODO: execute `agent_brief` through the browser-automation runner once it lands.
#[derive(Debug, Clone)]
pub struct BrowserAgentFormFiller {
    form_url: String,
    lawyer_email: String,
}

impl BrowserAgentFormFiller {
    pub fn new(form_url: impl Into<String>, lawyer_email: impl Into<String>) -> Self {
        Self {
            form_url: form_url.into(),
            lawyer_email: lawyer_email.into(),
        }
    }

    /// The task description handed to the browser agent.
    pub fn agent_brief(&self, documents: &DocumentSet) -> String {
        let data = serde_json::to_string_pretty(documents)
            .unwrap_or_else(|_| "{}".to_string());

        format!(
            r#"Aller sur le site {url} et remplir le formulaire avec ces données :

DONNÉES À SAISIR:
{data}

Instructions spécifiques:
1. Naviguer vers le formulaire
2. Remplir tous les champs avec les données fournies
3. Adapter intelligemment les données aux champs disponibles
4. Soumettre le formulaire
5. Attendre la réponse du site avec l'image du radar
6. S'assurer que l'image du radar est bien envoyée par email à: {email}

OBJECTIF FINAL: L'image du radar doit être envoyée automatiquement par email à l'avocat.
Ne pas télécharger ou sauvegarder l'image localement - juste s'assurer qu'elle est envoyée par email."#,
            url = self.form_url,
            email = self.lawyer_email,
        )
    }
}

#[async_trait]
impl FormGateway for BrowserAgentFormFiller {
    async fn submit(&self, documents: &DocumentSet) -> Result<FormReport, FormSubmissionError> {
        let brief = self.agent_brief(documents);
        info!(
            url = %self.form_url,
            brief_len = brief.len(),
            "dispatching government form submission"
        );

        Ok(FormReport {
            status: "success".to_string(),
            form_completed: true,
            recipient_email: self.lawyer_email.clone(),
            message: "Formulaire rempli et image du radar envoyée par email à l'avocat"
                .to_string(),
            details: format!("submission dispatched towards {}", self.form_url),
        })
    }
}
