use crate::remote::{GroundingAttribution, ModelResponse};

/// How the sources line is attached to an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourcesStyle {
    /// Separated from the answer by a blank line.
    Block,
    /// On the line right after the answer (terminal output).
    Line,
}

/// Human-readable source labels of the first candidate, without duplicates.
pub fn citation_labels(response: &ModelResponse) -> Vec<String> {
    let Some(candidate) = response.candidates.first() else {
        return Vec::new();
    };
    let mut labels: Vec<String> = Vec::new();
    for attribution in &candidate.grounding_attributions {
        if let Some(label) = attribution_label(attribution) {
            if !labels.contains(&label) {
                labels.push(label);
            }
        }
    }
    labels
}

fn attribution_label(attribution: &GroundingAttribution) -> Option<String> {
    if let Some(title) = attribution.title.as_deref().map(str::trim) {
        if !title.is_empty() {
            return Some(title.to_string());
        }
    }
    let uri = attribution.uri.as_deref()?.trim();
    let segment = uri.rsplit('/').next().unwrap_or(uri).trim();
    // "dir/Paper A.pdf" labels as "Paper A" so it matches the titled form.
    let label = match segment.rsplit_once('.') {
        Some((stem, _)) if !stem.trim().is_empty() => stem.trim(),
        _ => segment,
    };
    if label.is_empty() {
        None
    } else {
        Some(label.to_string())
    }
}

pub fn format_sources(labels: &[String], style: SourcesStyle) -> String {
    if labels.is_empty() {
        return String::new();
    }
    let prefix = match style {
        SourcesStyle::Block => "\n\n",
        SourcesStyle::Line => "\n",
    };
    format!("{prefix}📚 Sources: {}", labels.join(", "))
}

/// Trailing sources block for `response`, or an empty string when the
/// response carries no usable grounding metadata.
pub fn extract_citations(response: &ModelResponse, style: SourcesStyle) -> String {
    format_sources(&citation_labels(response), style)
}
