//! LaTeX letter backend: highest fidelity, requires pdflatex on the host.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tracing::debug;

use super::fields::{LetterFields, ATTACHMENTS, RECIPIENT_LINES};
use super::LetterError;
use crate::workflows::contestation::store::TaskId;

/// Capability probe used at backend selection time.
pub(super) fn pdflatex_available() -> bool {
    std::process::Command::new("pdflatex")
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

pub(super) async fn render(
    fields: &LetterFields,
    results_dir: &Path,
    task_id: &TaskId,
    timeout: Duration,
) -> Result<PathBuf, LetterError> {
    let scratch = tempfile::tempdir().map_err(|source| LetterError::Io {
        path: std::env::temp_dir(),
        source,
    })?;

    let tex_path = scratch.path().join("contestation.tex");
    tokio::fs::write(&tex_path, source(fields))
        .await
        .map_err(|source| LetterError::Io {
            path: tex_path.clone(),
            source,
        })?;

    let compile = tokio::process::Command::new("pdflatex")
        .arg("-interaction=nonstopmode")
        .arg("-halt-on-error")
        .arg("-output-directory")
        .arg(scratch.path())
        .arg(&tex_path)
        .stdin(Stdio::null())
        .output();

    let output = tokio::time::timeout(timeout, compile)
        .await
        .map_err(|_| LetterError::CompilerTimeout(timeout))?
        .map_err(|source| LetterError::Compiler(source.to_string()))?;

    if !output.status.success() {
        let log = String::from_utf8_lossy(&output.stdout);
        let tail: String = log
            .lines()
            .rev()
            .take(12)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect::<Vec<_>>()
            .join("\n");
        return Err(LetterError::Compiler(tail));
    }

    let compiled = scratch.path().join("contestation.pdf");
    let destination = results_dir.join(format!("contestation_{task_id}.pdf"));
    tokio::fs::copy(&compiled, &destination)
        .await
        .map_err(|source| LetterError::Io {
            path: destination.clone(),
            source,
        })?;

    debug!(path = %destination.display(), "letter compiled with pdflatex");
    Ok(destination)
}

pub(super) fn source(fields: &LetterFields) -> String {
    let mut grounds = String::new();
    for ground in fields.grounds {
        let _ = writeln!(
            grounds,
            "  \\item \\textbf{{{} :}} {}",
            escape(ground.title),
            escape(ground.detail)
        );
    }

    let mut attachments = String::new();
    for attachment in ATTACHMENTS {
        let _ = writeln!(attachments, "  \\item {}", escape(attachment));
    }

    let recipient = RECIPIENT_LINES
        .map(escape_owned)
        .join(" \\\\\n");

    format!(
        r#"\documentclass[12pt,a4paper]{{article}}
\usepackage[utf8]{{inputenc}}
\usepackage[T1]{{fontenc}}
\usepackage[french]{{babel}}
\usepackage[margin=2.5cm]{{geometry}}
\usepackage{{enumitem}}
\setlength{{\parindent}}{{0pt}}
\begin{{document}}

\begin{{flushright}}
{name} \\
{address} \\[1em]
Le {letter_date}
\end{{flushright}}

\textbf{{À l'attention de :}} \\
{recipient}

\vspace{{1.5em}}
\begin{{center}}
\textbf{{\large CONTESTATION DE CONTRAVENTION}} \\[0.5em]
\textbf{{Avis de contravention n° {notice}}}
\end{{center}}

Madame, Monsieur,

\vspace{{0.5em}}
Je conteste par la présente l'avis de contravention mentionné en objet,
établi le {violation_date} à {location}, concernant le véhicule
immatriculé {registration}.

\vspace{{0.5em}}
\textbf{{RÉFÉRENCES DE LA CONTRAVENTION :}}

\begin{{tabular}}{{ll}}
Numéro d'avis : & {notice} \\
Date de l'infraction : & {violation_date} \\
Lieu : & {location} \\
Montant : & {fine}~€ \\
Véhicule : & {make} \\
Immatriculation : & {registration} \\
\end{{tabular}}

\vspace{{0.5em}}
\textbf{{MOTIFS DE CONTESTATION :}}
\begin{{enumerate}}[leftmargin=*]
{grounds}\end{{enumerate}}

En application des articles 529-2 et suivants du Code de procédure pénale,
je conteste formellement cette contravention et demande son annulation.

Je vous prie de bien vouloir annuler cette contravention et vous remercie
de l'attention que vous porterez à ma demande.

Je vous prie d'agréer, Madame, Monsieur, l'expression de mes salutations
distinguées.

\begin{{flushright}}
{name} \\
\textit{{Signature}}
\end{{flushright}}

\textbf{{Pièces jointes :}}
\begin{{itemize}}
{attachments}\end{{itemize}}

\end{{document}}
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
            '\\' => escaped.push_str("\\textbackslash{}"),
            '{' => escaped.push_str("\\{"),
            '}' => escaped.push_str("\\}"),
            '$' => escaped.push_str("\\$"),
            '&' => escaped.push_str("\\&"),
            '#' => escaped.push_str("\\#"),
            '^' => escaped.push_str("\\textasciicircum{}"),
            '_' => escaped.push_str("\\_"),
            '%' => escaped.push_str("\\%"),
            '~' => escaped.push_str("\\textasciitilde{}"),
            other => escaped.push(other),
        }
    }
    escaped
}

fn escape_owned(raw: &str) -> String {
    escape(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::documents::DocumentSet;

    #[test]
    fn source_is_a_complete_document_with_escaped_values() {
        let mut fields = LetterFields::with_date(
            &DocumentSet::default(),
            true,
            chrono::NaiveDate::from_ymd_opt(2024, 1, 20).unwrap(),
        );
        fields.address = "12 rue du 100% \\ Paris".to_string();

        let tex = source(&fields);
        assert!(tex.starts_with("\\documentclass"));
        assert!(tex.contains("\\end{document}"));
        assert!(tex.contains("CONTESTATION DE CONTRAVENTION"));
        assert!(tex.contains("\\%"), "percent sign escaped");
        assert!(tex.contains("\\textbackslash{}"), "backslash escaped");
        assert_eq!(tex.matches("\\item \\textbf").count(), 5);
    }
}
