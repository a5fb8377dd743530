//! Human-readable prediction card for the terminal.

use triage_ai::StatusReport;
use triage_core::{Prediction, Variant};

const BAR_WIDTH: usize = 20;

/// Render a prediction as a short card.
pub fn render_prediction(prediction: &Prediction, variant: Variant) -> String {
    let noun = match variant {
        Variant::Symptom => "symptom",
        Variant::Diagnosis | Variant::Chat => "disease",
    };

    let mut out = format!(
        "  Predicted {noun}: {}  ({})\n",
        prediction.label,
        percent(prediction.confidence)
    );

    // ── Ranking ──

    let width = prediction
        .top
        .iter()
        .map(|(label, _)| label.chars().count())
        .max()
        .unwrap_or(0);
    out.push_str("\n  ── Ranking ──\n");
    for (i, (label, score)) in prediction.top.iter().enumerate() {
        out.push_str(&format!(
            "    {}. {label:<width$}  {:>6}  {}\n",
            i + 1,
            percent(*score),
            bar(*score)
        ));
    }

    // ── Advice ──

    if let Some(advice) = &prediction.advice {
        out.push_str(&format!("\n  ── Advice ──\n    {advice}\n"));
    }
    out
}

pub fn print_prediction(prediction: &Prediction, variant: Variant) {
    print!("{}", render_prediction(prediction, variant));
}

pub fn render_status(status: &StatusReport) -> String {
    let mut out = format!(
        "  {}\n  model loaded: {}\n",
        status.status,
        if status.model_loaded { "yes" } else { "no" }
    );
    if let Some(reason) = &status.reason {
        out.push_str(&format!("  reason: {reason}\n"));
    }
    out
}

fn percent(score: f64) -> String {
    format!("{:.1}%", score * 100.0)
}

fn bar(score: f64) -> String {
    let filled = (score.clamp(0.0, 1.0) * BAR_WIDTH as f64).round() as usize;
    "█".repeat(filled)
}
