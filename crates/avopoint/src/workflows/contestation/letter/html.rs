//! HTML letter backend, the unconditional last resort: only disk I/O can
//! make it fail.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use super::fields::{LetterFields, ATTACHMENTS, RECIPIENT_LINES};
use super::LetterError;
use crate::workflows::contestation::store::TaskId;

pub(super) async fn render(
    fields: &LetterFields,
    results_dir: &Path,
    task_id: &TaskId,
) -> Result<PathBuf, LetterError> {
    let path = results_dir.join(format!("contestation_{task_id}.html"));
    tokio::fs::write(&path, document(fields))
        .await
        .map_err(|source| LetterError::Io {
            path: path.clone(),
            source,
        })?;
    Ok(path)
}

pub(super) fn document(fields: &LetterFields) -> String {
    let mut grounds = String::new();
    for ground in fields.grounds {
        let _ = writeln!(
            grounds,
            "            <li><b>{} :</b> {}</li>",
            escape(ground.title),
            escape(ground.detail)
        );
    }

    let mut attachments = String::new();
    for attachment in ATTACHMENTS {
        let _ = writeln!(attachments, "            <li>{}</li>", escape(attachment));
    }

    let recipient = RECIPIENT_LINES.join("<br>\n        ");

    format!(
        r#"<!DOCTYPE html>
<html lang="fr">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Contestation de Contravention</title>
    <style>
        @media print {{
            body {{ margin: 0; }}
        }}
        body {{
            font-family: 'Times New Roman', serif;
            font-size: 12pt;
            line-height: 1.6;
            max-width: 21cm;
            margin: 2.5cm auto;
            padding: 0 2.5cm;
            color: #000;
        }}
        .header {{ text-align: right; margin-bottom: 2cm; }}
        .destinataire {{ margin-bottom: 2cm; }}
        .titre {{ text-align: center; font-weight: bold; font-size: 14pt; margin: 2cm 0; }}
        .references table {{ width: 100%; border-collapse: collapse; }}
        .references td:first-child {{ font-weight: bold; width: 30%; padding: 3px 0; }}
        .motifs ol {{ padding-left: 1.5cm; }}
        .motifs li {{ margin-bottom: 0.5cm; text-align: justify; }}
        .signature {{ text-align: right; margin-top: 3cm; }}
        .pieces-jointes {{ margin-top: 2cm; }}
        .bold {{ font-weight: bold; }}
    </style>
</head>
<body>
    <div class="header">
        {name}<br>
        {address}<br><br>
        Le {letter_date}
    </div>

    <div class="destinataire">
        <strong>À l'attention de :</strong><br>
        {recipient}
    </div>

    <div class="titre">
        CONTESTATION DE CONTRAVENTION<br>
        <strong>Avis de contravention n° {notice}</strong>
    </div>

    <p>Madame, Monsieur,</p>

    <p>Je conteste par la présente l'avis de contravention mentionné en objet, établi le {violation_date} à {location}, concernant le véhicule immatriculé {registration}.</p>

    <div class="references">
        <p class="bold">RÉFÉRENCES DE LA CONTRAVENTION :</p>
        <table>
            <tr><td>Numéro d'avis :</td><td>{notice}</td></tr>
            <tr><td>Date de l'infraction :</td><td>{violation_date}</td></tr>
            <tr><td>Lieu :</td><td>{location}</td></tr>
            <tr><td>Montant :</td><td>{fine} €</td></tr>
            <tr><td>Véhicule :</td><td>{make}</td></tr>
            <tr><td>Immatriculation :</td><td>{registration}</td></tr>
        </table>
    </div>

    <div class="motifs">
        <p class="bold">MOTIFS DE CONTESTATION :</p>
        <ol>
{grounds}        </ol>
    </div>

    <p>En application des articles 529-2 et suivants du Code de procédure pénale, je conteste formellement cette contravention et demande son annulation.</p>

    <p>Je vous prie de bien vouloir annuler cette contravention et vous remercie de l'attention que vous porterez à ma demande.</p>

    <p>Je vous prie d'agréer, Madame, Monsieur, l'expression de mes salutations distinguées.</p>

    <div class="signature">
        {name}<br>
        <em>Signature</em>
    </div>

    <div class="pieces-jointes">
        <p class="bold">Pièces jointes :</p>
        <ul>
{attachments}        </ul>
    </div>
</body>
</html>
"#,
        name = escape(&fields.full_name),
        address = escape(&fields.address),
        letter_date = escape(&fields.letter_date),
        recipient = recipient,
        notice = escape(&fields.notice_number),
        violation_date = escape(&fields.violation_date),
        location = escape(&fields.violation_location),
        fine = escape(&fields.fine_estimate),
        make = escape(&fields.vehicle_make),
        registration = escape(&fields.registration),
        grounds = grounds,
        attachments = attachments,
    )
}

fn escape(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}
