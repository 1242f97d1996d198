//! Output formatting: human-readable terminal output and JSON for
//! scripting.

use mnemon_core::evaluation::EvalReport;
use mnemon_core::search::{ComparisonReport, SearchResponse, SearchResult};
use serde::Serialize;

/// Maximum characters shown in a text snippet.
const SNIPPET_MAX_LEN: usize = 200;

/// JSON output structure for a search.
#[derive(Serialize)]
struct JsonOutput<'a> {
    query: &'a str,
    results: Vec<JsonResult>,
    stats: &'a mnemon_core::search::SearchStats,
}

#[derive(Serialize)]
struct JsonResult {
    id: String,
    score: f32,
    vector_score: f32,
    keyword_score: f32,
    source: String,
    reference: String,
    date: String,
    snippet: String,
}

impl From<&SearchResult> for JsonResult {
    fn from(result: &SearchResult) -> Self {
        Self {
            id: result.id.clone(),
            score: result.score,
            vector_score: result.vector_score,
            keyword_score: result.keyword_score,
            source: result.citation.source.clone(),
            reference: result.citation.reference.clone(),
            date: result.citation.date.to_rfc3339(),
            snippet: truncate_text(&result.text, SNIPPET_MAX_LEN),
        }
    }
}

/// Formats a search response as pretty JSON.
pub fn format_json(query: &str, response: &SearchResponse) -> String {
    let output = JsonOutput {
        query,
        results: response.results.iter().map(JsonResult::from).collect(),
        stats: &response.stats,
    };
    serde_json::to_string_pretty(&output).unwrap_or_else(|_| "{}".to_string())
}

/// Formats a search response for the terminal.
pub fn format_human(query: &str, response: &SearchResponse) -> String {
    let mut out = String::new();

    if response.results.is_empty() {
        out.push_str(&format!("No results for \"{query}\"\n"));
    } else {
        out.push_str(&format!(
            "Results for \"{query}\" ({} in {}ms):\n\n",
            response.results.len(),
            response.stats.query_time_ms
        ));
        for (i, result) in response.results.iter().enumerate() {
            out.push_str(&format!(
                "{}. {} (score {:.4}, vector {:.4}, keyword {:.4})\n",
                i + 1,
                result.citation.reference,
                result.score,
                result.vector_score,
                result.keyword_score
            ));
            out.push_str(&format!(
                "   {}\n\n",
                truncate_text(&result.text, SNIPPET_MAX_LEN)
            ));
        }
    }

    for note in &response.stats.degraded {
        out.push_str(&format!("warning: degraded retrieval: {note}\n"));
    }
    out
}

/// Formats a vector-only vs hybrid comparison.
pub fn format_comparison(query: &str, report: &ComparisonReport) -> String {
    let mut out = format!("Comparison for \"{query}\":\n\n");
    out.push_str("Vector only:\n");
    out.push_str(&ranking_lines(&report.vector_only));
    out.push_str("\nHybrid:\n");
    out.push_str(&ranking_lines(&report.hybrid));
    out
}

fn ranking_lines(results: &[SearchResult]) -> String {
    if results.is_empty() {
        return "  (no results)\n".to_string();
    }
    results
        .iter()
        .enumerate()
        .map(|(i, r)| format!("  {}. {} ({:.4})\n", i + 1, r.citation.reference, r.score))
        .collect()
}

/// Formats an evaluation report.
pub fn format_eval(report: &EvalReport) -> String {
    format!(
        "Evaluated {} queries at k={}:\n\
         \x20 precision@k  {:.4}\n\
         \x20 recall@k     {:.4}\n\
         \x20 mrr          {:.4}\n\
         \x20 ndcg@k       {:.4}\n",
        report.query_count, report.k, report.precision_at_k, report.recall_at_k, report.mrr,
        report.ndcg
    )
}

/// Truncates text on a char boundary, appending an ellipsis when cut.
fn truncate_text(text: &str, max_len: usize) -> String {
    let flattened = text.replace('\n', " ");
    if flattened.chars().count() <= max_len {
        return flattened;
    }
    let truncated: String = flattened.chars().take(max_len).collect();
    format!("{truncated}...")
}
