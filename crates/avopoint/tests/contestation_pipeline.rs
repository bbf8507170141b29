//! End-to-end specifications for the contestation pipeline, driven through
//! scripted collaborators so every scenario is deterministic.

mod common {
    use std::collections::{BTreeMap, HashMap};
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;
    use serde_json::{json, Value};
    use tempfile::TempDir;

    use avopoint::anthropic::AnthropicError;
    use avopoint::documents::{DocumentKind, DocumentSet};
    use avopoint::workflows::contestation::extraction::{DocumentExtractor, ExtractionError};
    use avopoint::workflows::contestation::formfill::{
        FormGateway, FormReport, FormSubmissionError,
    };
    use avopoint::workflows::contestation::letter::{BackendAvailability, LetterRenderer};
    use avopoint::workflows::contestation::photo::ConstantDriverVisibility;
    use avopoint::workflows::contestation::validation::{
        DocumentValidator, ReasoningError, ReasoningGateway,
    };
    use avopoint::workflows::contestation::{
        ContestationPipeline, InMemoryTaskStore, TaskId, TaskStore,
    };

    /// Extractor scripted per document kind; records which kinds ran.
    pub(crate) struct ScriptedExtractor {
        replies: HashMap<DocumentKind, Result<Value, String>>,
        pub(crate) calls: Mutex<Vec<DocumentKind>>,
    }

    impl ScriptedExtractor {
        pub(crate) fn new(replies: HashMap<DocumentKind, Result<Value, String>>) -> Arc<Self> {
            Arc::new(Self {
                replies,
                calls: Mutex::new(Vec::new()),
            })
        }

        pub(crate) fn calls(&self) -> Vec<DocumentKind> {
            self.calls.lock().expect("calls mutex").clone()
        }
    }

    #[async_trait]
    impl DocumentExtractor for ScriptedExtractor {
        async fn extract(
            &self,
            kind: DocumentKind,
            _path: &std::path::Path,
        ) -> Result<Value, ExtractionError> {
            self.calls.lock().expect("calls mutex").push(kind);
            match self.replies.get(&kind) {
                Some(Ok(value)) => Ok(value.clone()),
                Some(Err(message)) => Err(ExtractionError::Api(AnthropicError::Api(
                    message.clone(),
                ))),
                None => Ok(json!({})),
            }
        }
    }

    pub(crate) struct ScriptedReasoner {
        reply: String,
    }

    impl ScriptedReasoner {
        pub(crate) fn replying(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: reply.to_string(),
            })
        }
    }

    #[async_trait]
    impl ReasoningGateway for ScriptedReasoner {
        async fn reason(&self, _prompt: &str) -> Result<String, ReasoningError> {
            Ok(self.reply.clone())
        }
    }

    pub(crate) struct ScriptedFormGateway {
        failure: Option<String>,
    }

    impl ScriptedFormGateway {
        pub(crate) fn succeeding() -> Arc<Self> {
            Arc::new(Self { failure: None })
        }

        pub(crate) fn failing(message: &str) -> Arc<Self> {
            Arc::new(Self {
                failure: Some(message.to_string()),
            })
        }
    }

    #[async_trait]
    impl FormGateway for ScriptedFormGateway {
        async fn submit(
            &self,
            _documents: &DocumentSet,
        ) -> Result<FormReport, FormSubmissionError> {
            match &self.failure {
                Some(message) => Err(FormSubmissionError::Agent(message.clone())),
                None => Ok(FormReport {
                    status: "success".to_string(),
                    form_completed: true,
                    recipient_email: "avocat@test.fr".to_string(),
                    message: "ok".to_string(),
                    details: String::new(),
                }),
            }
        }
    }

    pub(crate) type TestPipeline = ContestationPipeline<
        InMemoryTaskStore,
        ScriptedExtractor,
        ScriptedReasoner,
        ScriptedFormGateway,
        ConstantDriverVisibility,
    >;

    pub(crate) struct Harness {
        pub(crate) store: Arc<InMemoryTaskStore>,
        pub(crate) extractor: Arc<ScriptedExtractor>,
        pub(crate) pipeline: Arc<TestPipeline>,
        _results_dir: TempDir,
    }

    pub(crate) fn harness(
        extractor_replies: HashMap<DocumentKind, Result<Value, String>>,
        reasoner_reply: &str,
        form: Arc<ScriptedFormGateway>,
    ) -> Harness {
        let store = Arc::new(InMemoryTaskStore::default());
        let extractor = ScriptedExtractor::new(extractor_replies);
        let results_dir = tempfile::tempdir().expect("results dir");
        let renderer = Arc::new(LetterRenderer::with_availability(
            results_dir.path().to_path_buf(),
            Duration::from_secs(5),
            BackendAvailability {
                latex: false,
                pdf: false,
            },
        ));

        let pipeline = Arc::new(ContestationPipeline::new(
            Arc::clone(&store),
            Arc::clone(&extractor),
            DocumentValidator::new(ScriptedReasoner::replying(reasoner_reply)),
            form,
            Arc::new(ConstantDriverVisibility::default()),
            renderer,
        ));

        Harness {
            store,
            extractor,
            pipeline,
            _results_dir: results_dir,
        }
    }

    pub(crate) fn create_task(
        store: &InMemoryTaskStore,
        id: &str,
        kinds: &[DocumentKind],
    ) -> TaskId {
        let task_id = TaskId(id.to_string());
        let mut paths = BTreeMap::new();
        for kind in kinds {
            paths.insert(
                *kind,
                PathBuf::from(format!("uploads/{id}/{kind}_scan.png", kind = kind.as_str())),
            );
        }
        store.create(task_id.clone(), paths).expect("task created");
        task_id
    }

    pub(crate) fn full_extraction_replies() -> HashMap<DocumentKind, Result<Value, String>> {
        let mut replies = HashMap::new();
        replies.insert(
            DocumentKind::Contravention,
            Ok(json!({
                "identité": {"nom": "DUPONT", "prenom": "Jean", "adresse": "NONE"},
                "infraction": {
                    "numero_avis": "12345678901234",
                    "date_heure": "15/01/2024:14h30",
                    "route": "D938",
                    "vitesse_maximale_autorisee": 90,
                    "vitesse_mesuree": 98
                },
                "identification_vehicule": {"immatriculation": "AB-123-CD", "marque": "PEUGEOT"}
            })),
        );
        replies.insert(
            DocumentKind::Certificat,
            Ok(json!({
                "proprietaire": {"nom": "DUPONT", "prenom": "Jean"},
                "vehicule": {"immatriculation": "AB-123-CD", "marque": "PEUGEOT"}
            })),
        );
        replies.insert(
            DocumentKind::Permis,
            Ok(json!({"identite": {"nom": "DUPONT", "prenom": "Jean"}})),
        );
        replies.insert(
            DocumentKind::Domicile,
            Ok(json!({
                "personne": {"nom": "DUPONT", "prenom": "Jean"},
                "domicile": {"adresse": "123 Rue de la République, 75001 Paris", "date_justificatif": "05-01-2024"}
            })),
        );
        replies
    }

    pub(crate) const VALID_VERDICT: &str = r#"{
        "names_consistent": true,
        "names_explanation": "Même personne partout.",
        "date_valid": true,
        "date_explanation": "Moins de trois mois.",
        "date_found": "05-01-2024",
        "overall_status": "VALID",
        "summary": "Dossier cohérent"
    }"#;

    pub(crate) const STALE_DATE_VERDICT: &str = r#"{
        "names_consistent": true,
        "names_explanation": "Même personne partout.",
        "date_valid": false,
        "date_explanation": "La date remonte à plus d'un an.",
        "date_found": "01/01/2023",
        "overall_status": "WARNING",
        "summary": "Justificatif trop ancien"
    }"#;
}

mod scenarios {
    use super::common::*;
    use avopoint::documents::DocumentKind;
    use avopoint::workflows::contestation::validation::{CheckStatus, ValidationStatus};
    use avopoint::workflows::contestation::{TaskStatus, TaskStore};

    #[tokio::test]
    async fn all_documents_consistent_reaches_completed_with_valid_validation() {
        let harness = harness(
            full_extraction_replies(),
            VALID_VERDICT,
            ScriptedFormGateway::succeeding(),
        );
        let id = create_task(&harness.store, "scenario-a", &DocumentKind::ordered());

        harness.pipeline.run(id.clone()).await;

        let record = harness.store.get(&id).expect("record kept");
        assert_eq!(record.status, TaskStatus::Completed);
        assert_eq!(record.progress, 100);
        assert!(record.error.is_none());

        let validation = record.validation.expect("validation stored");
        assert_eq!(validation.status, ValidationStatus::Valid);

        let artifact = record.result_file.expect("artifact recorded");
        assert!(artifact.exists(), "artifact written to disk");
        assert_eq!(record.documents.present_kinds().len(), 4);
        assert_eq!(record.driver_visible, Some(false));
        assert!(record.form_report.is_some());
    }

    #[tokio::test]
    async fn stale_residence_proof_still_completes_with_warning() {
        let harness = harness(
            full_extraction_replies(),
            STALE_DATE_VERDICT,
            ScriptedFormGateway::succeeding(),
        );
        let id = create_task(&harness.store, "scenario-b", &DocumentKind::ordered());

        harness.pipeline.run(id.clone()).await;

        let record = harness.store.get(&id).expect("record kept");
        assert_eq!(record.status, TaskStatus::Completed, "pipeline proceeds regardless");
        let validation = record.validation.expect("validation stored");
        assert_eq!(validation.status, ValidationStatus::Warning);
        assert_eq!(
            validation.checks.justificatif_date.status,
            CheckStatus::Invalid
        );
        assert!(record.result_file.is_some());
    }

    #[tokio::test]
    async fn contravention_extraction_failure_fails_the_task_and_names_the_document() {
        let mut replies = full_extraction_replies();
        replies.insert(
            DocumentKind::Contravention,
            Err("overloaded_error: try again later".to_string()),
        );
        let harness = harness(replies, VALID_VERDICT, ScriptedFormGateway::succeeding());
        let id = create_task(&harness.store, "scenario-c", &DocumentKind::ordered());

        harness.pipeline.run(id.clone()).await;

        let record = harness.store.get(&id).expect("record kept");
        assert_eq!(record.status, TaskStatus::Failed);
        assert_eq!(record.progress, -1);
        let error = record.error.expect("error recorded");
        assert!(error.contains("contravention"), "error names the document: {error}");
        assert!(record.result_file.is_none(), "no partial artifact");
        assert!(record.validation.is_none(), "no later stage ran");

        // Contravention scans first, so nothing else was attempted.
        assert_eq!(harness.extractor.calls(), vec![DocumentKind::Contravention]);
    }

    #[tokio::test]
    async fn partial_document_set_runs_only_present_extractions() {
        let harness = harness(
            full_extraction_replies(),
            VALID_VERDICT,
            ScriptedFormGateway::succeeding(),
        );
        let id = create_task(
            &harness.store,
            "scenario-d",
            &[DocumentKind::Certificat, DocumentKind::Permis],
        );

        harness.pipeline.run(id.clone()).await;

        let record = harness.store.get(&id).expect("record kept");
        assert_eq!(record.status, TaskStatus::Completed);
        assert_eq!(
            harness.extractor.calls(),
            vec![DocumentKind::Certificat, DocumentKind::Permis],
            "exactly the present documents are scanned"
        );
        assert_eq!(
            record.documents.present_kinds(),
            vec![DocumentKind::Certificat, DocumentKind::Permis]
        );
        assert!(!record.documents.contains(DocumentKind::Domicile));
    }

    #[tokio::test]
    async fn empty_document_set_still_validates_and_completes() {
        let harness = harness(
            full_extraction_replies(),
            r#"{"overall_status": "WARNING", "summary": "rien à vérifier"}"#,
            ScriptedFormGateway::succeeding(),
        );
        let id = create_task(&harness.store, "scenario-empty", &[]);

        harness.pipeline.run(id.clone()).await;

        let record = harness.store.get(&id).expect("record kept");
        assert_eq!(record.status, TaskStatus::Completed);
        assert!(harness.extractor.calls().is_empty());

        let validation = record.validation.expect("validation always runs");
        assert_eq!(
            validation.checks.names_consistency.status,
            CheckStatus::NotChecked
        );
        assert_eq!(
            validation.checks.justificatif_date.status,
            CheckStatus::NotChecked
        );
    }

    #[tokio::test]
    async fn later_extraction_failure_preserves_earlier_extractions_but_fails() {
        let mut replies = full_extraction_replies();
        replies.insert(DocumentKind::Domicile, Err("api_error: 500".to_string()));
        let harness = harness(replies, VALID_VERDICT, ScriptedFormGateway::succeeding());
        let id = create_task(&harness.store, "late-failure", &DocumentKind::ordered());

        harness.pipeline.run(id.clone()).await;

        let record = harness.store.get(&id).expect("record kept");
        assert_eq!(record.status, TaskStatus::Failed);
        assert_eq!(record.progress, -1);
        assert!(record.error.expect("error").contains("domicile"));
        // The three earlier successes were recorded before the halt.
        assert_eq!(record.documents.present_kinds().len(), 3);
        assert!(record.result_file.is_none());
    }

    #[tokio::test]
    async fn form_submission_failure_halts_the_pipeline() {
        let harness = harness(
            full_extraction_replies(),
            VALID_VERDICT,
            ScriptedFormGateway::failing("saisine site unreachable"),
        );
        let id = create_task(&harness.store, "form-failure", &DocumentKind::ordered());

        harness.pipeline.run(id.clone()).await;

        let record = harness.store.get(&id).expect("record kept");
        assert_eq!(record.status, TaskStatus::Failed);
        assert!(record
            .error
            .expect("error")
            .contains("saisine site unreachable"));
        assert!(record.validation.is_some(), "validation had already run");
        assert!(record.result_file.is_none());
    }

    #[tokio::test]
    async fn validation_collaborator_garbage_is_not_fatal() {
        let harness = harness(
            full_extraction_replies(),
            "je refuse de répondre en JSON",
            ScriptedFormGateway::succeeding(),
        );
        let id = create_task(&harness.store, "validation-garbage", &DocumentKind::ordered());

        harness.pipeline.run(id.clone()).await;

        let record = harness.store.get(&id).expect("record kept");
        assert_eq!(record.status, TaskStatus::Completed, "validation is advisory");
        let validation = record.validation.expect("error result stored");
        assert_eq!(validation.status, ValidationStatus::Error);
        assert!(record.result_file.is_some(), "letter still delivered");
    }

    #[tokio::test]
    async fn deleted_task_mid_run_is_not_resurrected() {
        let harness = harness(
            full_extraction_replies(),
            VALID_VERDICT,
            ScriptedFormGateway::succeeding(),
        );
        let id = create_task(&harness.store, "deleted-early", &DocumentKind::ordered());

        // Simulate a DELETE racing the pipeline: the record disappears
        // before the run starts, and every later update lands nowhere.
        harness.store.delete(&id).expect("deleted");
        harness.pipeline.run(id.clone()).await;

        assert!(harness.store.get(&id).is_none());
        assert!(harness.store.list().is_empty());
    }
}
