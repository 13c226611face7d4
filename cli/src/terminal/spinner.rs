use colored::*;
use indicatif::ProgressStyle;
use scopr_core::Phase;
use tracing::Span;
use tracing_indicatif::span_ext::IndicatifSpanExt;

const TICKS: &[&str] = &[
    "▁▁▁▁▁",
    "▁▂▂▂▁",
    "▁▄▂▄▁",
    "▂▄▆▄▂",
    "▄▆█▆▄",
    "▂▄▆▄▂",
    "▁▄▂▄▁",
    "▁▂▂▂▁",
];

/// Turns `span` into the run spinner.
pub fn attach(span: &Span) {
    let style: ProgressStyle = ProgressStyle::with_template("{spinner:.blue} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(TICKS);
    span.pb_set_style(&style);
    span.pb_set_message(&format!("{}", "Press Ctrl-C to stop early".italic().white()));
}

pub fn report_progress(span: &Span, phase: Phase, entity: &str) {
    let label: ColoredString = match phase {
        Phase::Seeds => "loading seeds".normal(),
        Phase::Discovery => "discovering".blue().bold(),
        Phase::Comparison => "comparing".normal(),
        Phase::Enumeration => "enumerating".green().bold(),
        Phase::Export => "exporting".normal(),
    };
    span.pb_set_message(&format!("{label} {}", entity.bold()));
}
