//! Prompts for every model-facing stage.
//!
//! Every builder here is a pure, total function: no I/O, no failure modes.
//! Keeping them together means a wording change touches exactly one file and
//! unit tests can inspect prompts without a model.
//!
//! | Stage | Builder |
//! |-------|---------|
//! | Language detection | [`language_detection_prompt`] |
//! | Transcription A/B/C | [`transcription_prompt`] |
//! | Judge | [`judge_prompt`] |
//! | Summary | [`summary_prompt`] |

use crate::language::{DetectedLanguage, Language};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Marker the detector reply must start with.
pub const DETECTION_MARKER: &str = "DOMINANT_LANGUAGE";

/// Bias of one ensemble transcription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Variant {
    /// A: only high-confidence text.
    Accuracy,
    /// B: everything, always a best guess.
    Completeness,
    /// C: exact layout.
    Structure,
}

impl Variant {
    pub const ALL: [Variant; 3] = [Variant::Accuracy, Variant::Completeness, Variant::Structure];

    pub fn letter(&self) -> char {
        match self {
            Variant::Accuracy => 'A',
            Variant::Completeness => 'B',
            Variant::Structure => 'C',
        }
    }

    pub fn focus(&self) -> &'static str {
        match self {
            Variant::Accuracy => "accuracy",
            Variant::Completeness => "completeness",
            Variant::Structure => "structure",
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.letter(), self.focus())
    }
}

// ── Language detection ───────────────────────────────────────────────────

const LANGUAGE_DETECTION_PROMPT: &str = r#"Look at the handwritten notes in this image and determine which language most of the handwriting is written in.

The notes are expected to be in German, English, French or Italian.

Answer with exactly one line in this format and nothing else:
DOMINANT_LANGUAGE: <german|english|french|italian>"#;

pub fn language_detection_prompt() -> &'static str {
    LANGUAGE_DETECTION_PROMPT
}

// ── Transcription ────────────────────────────────────────────────────────

const TRANSCRIPTION_BASE: &str = r#"You are transcribing a photograph of handwritten inspection notes.

Rules:
- Preserve acronyms, abbreviations, part numbers and capitalisation exactly as written
- Do not translate, correct or expand what is written
- Output ONLY the transcription: no preamble, no explanation, no closing remarks"#;

fn language_clause(detected: DetectedLanguage) -> String {
    match detected.known() {
        None => "\n\nLANGUAGE\n\
The notes may mix German, English, French and Italian. Transcribe every part in the \
language it is written in; do not translate between them."
            .to_string(),
        Some(lang) => format!(
            "\n\nLANGUAGE\n\
The notes are written mainly in {name}. Short fragments in another language \
(technical terms, names, quoted labels) may appear; transcribe them as written.",
            name = lang.display_name()
        ),
    }
}

fn variant_clause(variant: Variant) -> &'static str {
    match variant {
        Variant::Accuracy => {
            "\n\nFOCUS: ACCURACY\n\
- Transcribe only text you can read with high confidence\n\
- When a word is ambiguous, mark it as word[alt1/alt2] listing the readings you consider plausible\n\
- Preserve the original line breaks"
        }
        Variant::Completeness => {
            "\n\nFOCUS: COMPLETENESS\n\
- Transcribe everything on the page, including faint, crossed-out or unclear passages\n\
- Always give a best guess rather than skipping a word\n\
- When a word is uncertain, mark it as word[alt1/alt2]"
        }
        Variant::Structure => {
            "\n\nFOCUS: STRUCTURE\n\
- Reproduce the exact layout: line breaks, indentation, lists, sections and headings\n\
- Keep items that belong together on the same line as in the original\n\
- When a word is ambiguous, mark it as word[alt1/alt2]"
        }
    }
}

/// Prompt for one ensemble member.
pub fn transcription_prompt(variant: Variant, detected: DetectedLanguage) -> String {
    let mut prompt = String::with_capacity(1024);
    prompt.push_str(TRANSCRIPTION_BASE);
    prompt.push_str(&language_clause(detected));
    prompt.push_str(variant_clause(variant));
    prompt
}

// ── Judge ────────────────────────────────────────────────────────────────

/// Prompt for the reconciliation step.
///
/// The transcriptions are embedded verbatim in the order given; labels only
/// identify them and carry no ranking.
pub fn judge_prompt<'a, I>(transcriptions: I, detected: DetectedLanguage) -> String
where
    I: IntoIterator<Item = (Variant, &'a str)>,
{
    let mut prompt = String::from(
        "You are reviewing three independent transcriptions of the same photograph of \
handwritten inspection notes. The photograph is attached.\n\n\
All three describe one single real-world situation. Merge them into ONE internally \
consistent transcription:\n\
- Where the transcriptions disagree, look at the image to decide which reading is correct\n\
- Keep every piece of information that at least one transcription read correctly\n\
- Keep acronyms, part numbers and capitalisation exactly as written\n\
- If a word still cannot be resolved after checking the image, write the candidates \
as [alt1, alt2, alt3]\n\
- Output ONLY the final transcription: no preamble, no notes about your decisions",
    );

    match detected.known() {
        Some(lang) => prompt.push_str(&format!(
            "\n\nThe notes are written mainly in {}.",
            lang.display_name()
        )),
        None => prompt.push_str(
            "\n\nThe notes may mix German, English, French and Italian; keep each part in \
its original language.",
        ),
    }

    for (i, (variant, text)) in transcriptions.into_iter().enumerate() {
        prompt.push_str(&format!(
            "\n\n=== TRANSCRIPTION {} (variant {}) ===\n{}",
            i + 1,
            variant.letter(),
            text
        ));
    }
    prompt.push_str("\n\n=== END OF TRANSCRIPTIONS ===");
    prompt
}

// ── Summary ──────────────────────────────────────────────────────────────

const SUMMARY_GERMAN: &str = r#"ZUSAMMENFASSUNG DER INSPEKTIONSNOTIZEN

Unten folgen mehrere Notizen. Die Dateinamen dienen nur zur Ordnung und sind keine Inhalte. Alle Inhalte sind bereits als Klartext extrahiert; es gibt keine Bilder zu analysieren.

Erstelle daraus EIN zusammenhängendes Dokument auf Deutsch:
- Höchstens {pages} Seiten (etwa {words} Wörter)
- Rein beschreibend: keine Empfehlungen, keine Bewertungen, keine Kommentare zu dieser Aufgabe
- Fasse Beobachtungen zusammen, die denselben Ort oder dasselbe Bauteil betreffen
- Übernimm Messwerte, Kennzeichnungen und Abkürzungen unverändert"#;

const SUMMARY_ENGLISH: &str = r#"INSPECTION NOTES SUMMARY

Several notes follow below. File names are organisational labels only, not content. All content has already been extracted as plain text; there are no images to analyse.

Write ONE coherent document in English:
- At most {pages} pages (about {words} words)
- Purely descriptive: no recommendations, no assessments, no commentary about this task
- Group observations that concern the same location or component
- Keep measurements, labels and abbreviations exactly as written"#;

const SUMMARY_FRENCH: &str = r#"SYNTHÈSE DES NOTES D'INSPECTION

Plusieurs notes suivent. Les noms de fichiers servent uniquement à l'organisation et ne font pas partie du contenu. Tout le contenu a déjà été extrait en texte brut ; il n'y a aucune image à analyser.

Rédige UN document cohérent en français :
- Au maximum {pages} pages (environ {words} mots)
- Purement descriptif : pas de recommandations, pas d'évaluations, aucun commentaire sur cette tâche
- Regroupe les observations qui concernent le même endroit ou le même composant
- Conserve les mesures, les repères et les abréviations tels qu'ils sont écrits"#;

const SUMMARY_ITALIAN: &str = r#"SINTESI DELLE NOTE DI ISPEZIONE

Di seguito trovi diverse note. I nomi dei file sono solo etichette organizzative, non contenuto. Tutto il contenuto è già stato estratto come testo semplice; non ci sono immagini da analizzare.

Scrivi UN unico documento coerente in italiano:
- Al massimo {pages} pagine (circa {words} parole)
- Puramente descrittivo: nessuna raccomandazione, nessuna valutazione, nessun commento su questo compito
- Raggruppa le osservazioni che riguardano lo stesso luogo o lo stesso componente
- Mantieni misure, sigle e abbreviazioni esattamente come scritte"#;

/// Words per page used to express the budget as pages.
const WORDS_PER_PAGE: usize = 500;

/// Summary instructions for `language`, bounded to `word_budget` words.
pub fn summary_prompt(language: Language, word_budget: usize) -> String {
    let template = match language {
        Language::German => SUMMARY_GERMAN,
        Language::English => SUMMARY_ENGLISH,
        Language::French => SUMMARY_FRENCH,
        Language::Italian => SUMMARY_ITALIAN,
    };
    let pages = word_budget.div_ceil(WORDS_PER_PAGE).max(1);
    template
        .replace("{pages}", &pages.to_string())
        .replace("{words}", &word_budget.to_string())
}
