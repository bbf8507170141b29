//! Programmatic PDF backend: no external tooling, lower typographic
//! fidelity than the LaTeX path.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfLayerReference};

use super::fields::{LetterFields, ATTACHMENTS, RECIPIENT_LINES};
use super::LetterError;
use crate::workflows::contestation::store::TaskId;

const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;
const MARGIN_MM: f32 = 25.0;
const BODY_SIZE: f32 = 11.0;
const LINE_HEIGHT_MM: f32 = 6.0;
const WRAP_COLUMNS: usize = 88;

pub(super) fn render(
    fields: &LetterFields,
    results_dir: &Path,
    task_id: &TaskId,
) -> Result<PathBuf, LetterError> {
    let (doc, page, layer) = PdfDocument::new(
        "Contestation de contravention",
        Mm(PAGE_WIDTH_MM),
        Mm(PAGE_HEIGHT_MM),
        "letter",
    );
    let regular = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|err| LetterError::Pdf(err.to_string()))?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|err| LetterError::Pdf(err.to_string()))?;

    let mut page_layer = doc.get_page(page).get_layer(layer);
    let mut cursor = PAGE_HEIGHT_MM - MARGIN_MM;

    let write = |layer: &mut PdfLayerReference,
                     cursor: &mut f32,
                     text: &str,
                     font: &IndirectFontRef,
                     indent: f32| {
        for line in wrap(text, WRAP_COLUMNS) {
            if *cursor < MARGIN_MM {
                let (next_page, next_layer) =
                    doc.add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "letter");
                *layer = doc.get_page(next_page).get_layer(next_layer);
                *cursor = PAGE_HEIGHT_MM - MARGIN_MM;
            }
            layer.use_text(line, BODY_SIZE, Mm(MARGIN_MM + indent), Mm(*cursor), font);
            *cursor -= LINE_HEIGHT_MM;
        }
    };

    // Sender block, pushed towards the right edge.
    for line in [fields.full_name.as_str(), fields.address.as_str()] {
        page_layer.use_text(line, BODY_SIZE, Mm(110.0), Mm(cursor), &regular);
        cursor -= LINE_HEIGHT_MM;
    }
    page_layer.use_text(
        format!("Le {}", fields.letter_date),
        BODY_SIZE,
        Mm(110.0),
        Mm(cursor),
        &regular,
    );
    cursor -= 2.0 * LINE_HEIGHT_MM;

    // Recipient block.
    write(&mut page_layer, &mut cursor, "À l'attention de :", &bold, 0.0);
    for line in RECIPIENT_LINES {
        write(&mut page_layer, &mut cursor, line, &regular, 0.0);
    }
    cursor -= LINE_HEIGHT_MM;

    // Title.
    page_layer.use_text(
        "CONTESTATION DE CONTRAVENTION",
        14.0,
        Mm(55.0),
        Mm(cursor),
        &bold,
    );
    cursor -= LINE_HEIGHT_MM;
    write(
        &mut page_layer,
        &mut cursor,
        &format!("Avis de contravention n° {}", fields.notice_number),
        &bold,
        30.0,
    );
    cursor -= LINE_HEIGHT_MM;

    // Salutation and opening paragraph.
    write(&mut page_layer, &mut cursor, "Madame, Monsieur,", &regular, 0.0);
    cursor -= LINE_HEIGHT_MM / 2.0;
    write(
        &mut page_layer,
        &mut cursor,
        &format!(
            "Je conteste par la présente l'avis de contravention mentionné en objet, établi le {} à {}, concernant le véhicule immatriculé {}.",
            fields.violation_date, fields.violation_location, fields.registration
        ),
        &regular,
        0.0,
    );
    cursor -= LINE_HEIGHT_MM / 2.0;

    // Reference table.
    write(
        &mut page_layer,
        &mut cursor,
        "RÉFÉRENCES DE LA CONTRAVENTION :",
        &bold,
        0.0,
    );
    let references = [
        ("Numéro d'avis :", fields.notice_number.clone()),
        ("Date de l'infraction :", fields.violation_date.clone()),
        ("Lieu :", fields.violation_location.clone()),
        ("Montant :", format!("{} €", fields.fine_estimate)),
        ("Véhicule :", fields.vehicle_make.clone()),
        ("Immatriculation :", fields.registration.clone()),
    ];
    for (label, value) in references {
        if cursor < MARGIN_MM {
            let (next_page, next_layer) =
                doc.add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "letter");
            page_layer = doc.get_page(next_page).get_layer(next_layer);
            cursor = PAGE_HEIGHT_MM - MARGIN_MM;
        }
        page_layer.use_text(label, BODY_SIZE, Mm(MARGIN_MM), Mm(cursor), &bold);
        page_layer.use_text(value, BODY_SIZE, Mm(MARGIN_MM + 50.0), Mm(cursor), &regular);
        cursor -= LINE_HEIGHT_MM;
    }
    cursor -= LINE_HEIGHT_MM / 2.0;

    // Numbered grounds, chosen wholesale by driver visibility.
    write(&mut page_layer, &mut cursor, "MOTIFS DE CONTESTATION :", &bold, 0.0);
    for (index, ground) in fields.grounds.iter().enumerate() {
        write(
            &mut page_layer,
            &mut cursor,
            &format!("{}. {} : {}", index + 1, ground.title, ground.detail),
            &regular,
            4.0,
        );
        cursor -= LINE_HEIGHT_MM / 3.0;
    }
    cursor -= LINE_HEIGHT_MM / 2.0;

    // Closing.
    for paragraph in [
        "En application des articles 529-2 et suivants du Code de procédure pénale, je conteste formellement cette contravention et demande son annulation.",
        "Je vous prie de bien vouloir annuler cette contravention et vous remercie de l'attention que vous porterez à ma demande.",
        "Je vous prie d'agréer, Madame, Monsieur, l'expression de mes salutations distinguées.",
    ] {
        write(&mut page_layer, &mut cursor, paragraph, &regular, 0.0);
        cursor -= LINE_HEIGHT_MM / 2.0;
    }
    cursor -= LINE_HEIGHT_MM;

    // Signature block.
    write(&mut page_layer, &mut cursor, &fields.full_name, &regular, 110.0);
    write(&mut page_layer, &mut cursor, "Signature", &regular, 110.0);
    cursor -= LINE_HEIGHT_MM;

    // Attachments.
    write(&mut page_layer, &mut cursor, "Pièces jointes :", &bold, 0.0);
    for attachment in ATTACHMENTS {
        write(
            &mut page_layer,
            &mut cursor,
            &format!("- {attachment}"),
            &regular,
            4.0,
        );
    }

    let path = results_dir.join(format!("contestation_{task_id}.pdf"));
    let file = File::create(&path).map_err(|source| LetterError::Io {
        path: path.clone(),
        source,
    })?;
    doc.save(&mut BufWriter::new(file))
        .map_err(|err| LetterError::Pdf(err.to_string()))?;
    Ok(path)
}

/// Greedy word wrap; long unbreakable tokens get their own line.
fn wrap(text: &str, columns: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        if current.is_empty() {
            current = word.to_string();
        } else if current.chars().count() + 1 + word.chars().count() <= columns {
            current.push(' ');
            current.push_str(word);
        } else {
            lines.push(std::mem::take(&mut current));
            current = word.to_string();
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}
