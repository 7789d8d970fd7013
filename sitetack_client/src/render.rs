// src/render.rs

use crate::classify::{classify, Classification};
use crate::models::{PredictionResponse, SequencePrediction};

/// How a highlighted residue is decorated. The residue itself is never changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    /// `<span class="bg-warning">K</span>`, as in the web results panel.
    Html,
    /// ANSI yellow background for terminals.
    Terminal,
}

impl Marker {
    fn wrap(&self, residue: char, out: &mut String) {
        match self {
            Marker::Html => {
                out.push_str("<span class=\"bg-warning\">");
                out.push(residue);
                out.push_str("</span>");
            }
            Marker::Terminal => {
                out.push_str("\x1b[30;43m");
                out.push(residue);
                out.push_str("\x1b[0m");
            }
        }
    }
}

/// Rebuilds the sequence in order, decorating every position flagged in `classification`.
/// Positions without a scored site, or sites outside the sequence, are left alone.
pub fn render_sequence(
    sequence: &SequencePrediction,
    classification: &Classification,
    marker: Marker,
) -> String {
    let mut out = String::with_capacity(sequence.sequence.len());
    for (index, residue) in sequence.sequence.chars().enumerate() {
        if classification.get(&(index + 1)).copied().unwrap_or(false) {
            marker.wrap(residue, &mut out);
        } else {
            out.push(residue);
        }
    }
    out
}

/// Full results panel text for `(model, threshold)`.
///
/// Each call regenerates everything from its arguments, so callers replace the
/// previous panel with the return value.
pub fn display_results_with_highlighting(
    model: &PredictionResponse,
    threshold: f64,
    marker: Marker,
) -> String {
    let mut formatted = String::new();
    for seq in &model.sequence_predictions {
        let flags = classify(seq, threshold);
        let highlighted = render_sequence(seq, &flags, marker);
        formatted.push_str(&format!(
            "Sequence Name: {}\nSequence: {}\n\n",
            seq.sequence_name, highlighted
        ));
    }
    formatted
}
