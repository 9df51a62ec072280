use crate::orchestrator::{ComparisonRun, GenerationResult, ResponseStatus, SummaryStatus};
use crate::summary::{self, Analysis};
use std::fmt::Write;

fn stars(count: u8) -> String {
    (0..5).map(|i| if i < count { '★' } else { '☆' }).collect()
}

fn response_card(out: &mut String, r: &GenerationResult) {
    match &r.status {
        ResponseStatus::Loading => {
            let _ = writeln!(out, "## {} (waiting)", r.provider);
        }
        ResponseStatus::Success { content } => {
            let (simulated, text) = summary::split_simulation_marker(content);
            let badge = if simulated { " [simulated]" } else { "" };
            let _ = writeln!(out, "## {}{badge}\n{text}", r.provider);
        }
        ResponseStatus::Error { message } => {
            let _ = writeln!(out, "## {} (failed)\n{message}", r.provider);
        }
    }
}

fn analysis_table(out: &mut String, analysis: &Analysis) {
    let _ = writeln!(out, "Head-to-Head Analysis");
    for v in &analysis.analysis {
        let _ = writeln!(
            out,
            "  {:<12} {:>3}/100 {}  {}",
            v.model_name,
            v.score.round() as i64,
            stars(v.stars()),
            v.verdict
        );
    }
}

/// Plain-text rendering of a finished run: summary first, then each card.
pub fn render_text(run: &ComparisonRun) -> String {
    let mut out = String::new();

    if let Some(s) = &run.summary {
        let _ = writeln!(out, "# Summary & Analysis");
        match &s.status {
            SummaryStatus::Loading => {
                let _ = writeln!(out, "(pending)");
            }
            SummaryStatus::Success {
                summary_text,
                sources,
            } => {
                match summary::parse_analysis(summary_text) {
                    Ok(analysis) => analysis_table(&mut out, &analysis),
                    Err(_) => {
                        let _ = writeln!(out, "{summary_text}");
                    }
                }
                if !sources.is_empty() {
                    let _ = writeln!(out, "\nSources:");
                    for src in sources {
                        let title = src.title.as_deref().unwrap_or(&src.uri);
                        let _ = writeln!(out, "  - {title} <{}>", src.uri);
                    }
                }
            }
            SummaryStatus::Error { message } => {
                let _ = writeln!(out, "{message}");
            }
        }
        out.push('\n');
    }

    for r in &run.responses {
        response_card(&mut out, r);
        out.push('\n');
    }
    out
}
