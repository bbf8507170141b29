use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusHandle;

use avopoint::anthropic::AnthropicClient;
use avopoint::config::AppConfig;
use avopoint::error::AppError;
use avopoint::workflows::contestation::extraction::AnthropicVisionExtractor;
use avopoint::workflows::contestation::formfill::BrowserAgentFormFiller;
use avopoint::workflows::contestation::letter::LetterRenderer;
use avopoint::workflows::contestation::photo::ConstantDriverVisibility;
use avopoint::workflows::contestation::storage::UploadStorage;
use avopoint::workflows::contestation::validation::{AnthropicReasoner, DocumentValidator};
use avopoint::workflows::contestation::{
    ContestationPipeline, ContestationService, InMemoryTaskStore,
};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) type ProductionService = ContestationService<
    InMemoryTaskStore,
    AnthropicVisionExtractor,
    AnthropicReasoner,
    BrowserAgentFormFiller,
    ConstantDriverVisibility,
>;

/// Wires the production collaborators from configuration.
pub(crate) fn build_contestation_service(
    config: &AppConfig,
) -> Result<Arc<ProductionService>, AppError> {
    let api_key = config.anthropic.require_key()?;
    let client = AnthropicClient::new(api_key, &config.anthropic.api_version)?;

    let store = Arc::new(InMemoryTaskStore::default());
    let extractor = Arc::new(AnthropicVisionExtractor::new(
        client.clone(),
        config.anthropic.extraction_model.clone(),
    ));
    let validator = DocumentValidator::new(Arc::new(AnthropicReasoner::new(
        client,
        config.anthropic.validation_model.clone(),
    )));
    let form = Arc::new(BrowserAgentFormFiller::new(
        config.letter.form_url.clone(),
        config.letter.lawyer_email.clone(),
    ));
    let photo = Arc::new(ConstantDriverVisibility::default());
    let renderer = Arc::new(LetterRenderer::new(
        config.storage.results_dir.clone(),
        config.letter.latex_timeout,
    ));

    let pipeline = Arc::new(ContestationPipeline::new(
        Arc::clone(&store),
        extractor,
        validator,
        form,
        photo,
        renderer,
    ));

    Ok(Arc::new(ContestationService::new(
        store,
        UploadStorage::new(config.storage.upload_dir.clone()),
        pipeline,
    )))
}
