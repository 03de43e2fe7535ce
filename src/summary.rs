//! Cross-item summary.
//!
//! The summary is built from whatever the result set holds *now*, so user
//! edits made after extraction are what the model reads. One call, never
//! retried; the reply is returned verbatim.

use crate::client::ContentPart;
use crate::error::NotesError;
use crate::language::Language;
use crate::output::{PipelineResult, ResultSet, Summary};
use crate::pipeline::llm::{ask, CallOptions, Completion};
use crate::pipeline::StageContext;
use crate::prompts::summary_prompt;
use tracing::info;

/// Prompt body: one labelled section per result, in result order.
pub fn summary_body(results: &[PipelineResult]) -> String {
    results
        .iter()
        .map(|r| format!("### {} ({})\n{}", r.filename, r.kind.as_str(), r.content))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Summarize `results` in `language`.
///
/// An empty list fails with [`NotesError::EmptySummaryInput`] without
/// contacting the model.
pub async fn summarize(
    ctx: StageContext<'_>,
    results: &[PipelineResult],
    language: Language,
) -> Result<Completion, NotesError> {
    if results.is_empty() {
        return Err(NotesError::EmptySummaryInput);
    }

    info!(
        "Summarizing {} result(s) in {}",
        results.len(),
        language.display_name()
    );
    ask(
        ctx,
        CallOptions::summary(ctx.config),
        vec![
            ContentPart::Text(summary_prompt(language, ctx.config.summary_word_budget)),
            ContentPart::Text(summary_body(results)),
        ],
    )
    .await
    .map_err(NotesError::Summary)
}

/// Summarize a result set, stamping the summary with the set's version.
pub(crate) async fn summarize_set(
    ctx: StageContext<'_>,
    set: &ResultSet,
    language: &str,
) -> Result<Summary, NotesError> {
    let language = Language::from_label(language);
    let completion = summarize(ctx, set.results(), language).await?;
    Ok(Summary {
        text: completion.text,
        language,
        source_version: set.version(),
        item_count: set.len(),
        usage: completion.usage,
    })
}
