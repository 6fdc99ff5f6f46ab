//! Per-file report rendering for terminal output.

use crate::engine::Decision;

const DIM: &str = "\x1b[2m";
const GREEN: &str = "\x1b[32m";
const RESET: &str = "\x1b[0m";

/// Transcripts longer than this are truncated in the report.
const TRANSCRIPT_PREVIEW_CHARS: usize = 100;

/// Renders the full per-file report.
pub fn render_result(name: &str, decision: &Decision) -> String {
    let mut out = format!("\n=== {} ===\n", name);

    if decision.signals.is_empty() {
        out.push_str("Detected signals: None\n");
    } else {
        out.push_str("Detected signals:\n");
        for signal in &decision.signals {
            out.push_str(&format!(
                "  - {}: {:.2}s {DIM}({}){RESET}\n",
                signal.kind,
                signal.timestamp.as_secs_f32(),
                signal.details
            ));
        }
    }

    if !decision.transcript.is_empty() {
        let mut preview: String = decision
            .transcript
            .chars()
            .take(TRANSCRIPT_PREVIEW_CHARS)
            .collect();
        if decision.transcript.chars().count() > TRANSCRIPT_PREVIEW_CHARS {
            preview.push_str("...");
        }
        out.push_str(&format!("Transcript: {}\n", preview));
    }

    out.push_str(&format!(
        "\n{GREEN}✓{RESET} Ideal drop time: {:.2}s\n",
        decision.recommended_drop_time.as_secs_f32()
    ));
    out.push_str(&format!(
        "  Reason: {} {DIM}[{}]{RESET}\n",
        decision.reason,
        decision.reason.code()
    ));
    out.push_str(&format!(
        "  Decision made at: {:.2}s into stream\n",
        decision.decision_made_at.as_secs_f32()
    ));
    if !decision.dead_air.is_zero() {
        out.push_str(&format!(
            "  Dead air: {:.2}s\n",
            decision.dead_air.as_secs_f32()
        ));
    }

    out
}

/// One-line summary for quiet mode.
pub fn render_compact(name: &str, decision: &Decision) -> String {
    format!(
        "{}: {:.2}s {}",
        name,
        decision.recommended_drop_time.as_secs_f32(),
        decision.reason.code()
    )
}
