use std::path::PathBuf;
use std::time::Duration;

use clap::Args;
use serde_json::json;

use avopoint::documents::{DocumentKind, DocumentSet};
use avopoint::error::AppError;
use avopoint::workflows::contestation::letter::{
    BackendAvailability, LetterBackend, LetterRenderer,
};
use avopoint::workflows::contestation::TaskId;

#[derive(Args, Debug)]
pub(crate) struct LetterArgs {
    /// Treat the driver as identifiable on the radar photo
    #[arg(long)]
    pub(crate) driver_visible: bool,
    /// Directory receiving the rendered letter
    #[arg(long, default_value = "results")]
    pub(crate) output_dir: PathBuf,
}

/// Renders a sample letter with whatever backend this host supports, so the
/// fallback chain can be checked without uploading documents.
pub(crate) async fn run_letter_demo(args: LetterArgs) -> Result<(), AppError> {
    let documents = sample_documents();
    let availability = BackendAvailability::detect();
    let renderer = LetterRenderer::with_availability(
        args.output_dir.clone(),
        Duration::from_secs(45),
        availability,
    );

    println!("Contestation letter demo");
    println!(
        "Backend availability: pdflatex {}, pdf library {}, html always",
        tick(availability.latex),
        tick(availability.pdf)
    );
    println!(
        "Selected backend: {}",
        match renderer.backend() {
            LetterBackend::Latex => "LaTeX",
            LetterBackend::Pdf => "PDF library",
            LetterBackend::Html => "HTML",
        }
    );

    let path = renderer
        .render(
            &documents,
            args.driver_visible,
            &TaskId("demo".to_string()),
        )
        .await?;
    println!("Letter written to {}", path.display());

    Ok(())
}

fn tick(available: bool) -> &'static str {
    if available {
        "available"
    } else {
        "unavailable"
    }
}

fn sample_documents() -> DocumentSet {
    let mut documents = DocumentSet::default();
    documents
        .insert(
            DocumentKind::Contravention,
            json!({
                "identité": {"nom": "DUPONT", "prenom": "Jean", "adresse": "NONE"},
                "infraction": {
                    "numero_avis": "12345678901234",
                    "date_heure": "15/01/2024:14h30",
                    "route": "Avenue des Champs-Élysées, Paris",
                    "vitesse_maximale_autorisee": 50,
                    "vitesse_mesuree": 63
                },
                "identification_vehicule": {"immatriculation": "AB-123-CD", "pays": "FR", "marque": "PEUGEOT"}
            }),
        )
        .expect("sample contravention payload");
    documents
        .insert(
            DocumentKind::Certificat,
            json!({
                "proprietaire": {"nom": "DUPONT", "prenom": "Jean"},
                "vehicule": {"immatriculation": "AB-123-CD", "marque": "PEUGEOT"}
            }),
        )
        .expect("sample certificat payload");
    documents
        .insert(
            DocumentKind::Permis,
            json!({"identite": {"nom": "DUPONT", "prenom": "Jean"}}),
        )
        .expect("sample permis payload");
    documents
        .insert(
            DocumentKind::Domicile,
            json!({
                "personne": {"nom": "DUPONT", "prenom": "Jean"},
                "domicile": {"adresse": "123 Rue de la République, 75001 Paris", "date_justificatif": "NONE"}
            }),
        )
        .expect("sample domicile payload");
    documents
}
