use std::{cell::Cell, fmt::Display};

use colored::*;
use scopr_common::log::PRINT_TARGET;
use scopr_core::export::Node;
use tracing::info;
use unicode_width::UnicodeWidthStr;

use crate::terminal::{colors, format};

pub const TOTAL_WIDTH: usize = 64;

thread_local! {
    static KEY_WIDTH: Cell<usize> = const { Cell::new(0) }
}

#[macro_export]
macro_rules! sprint {
    () => {
        $crate::terminal::print::print("");
    };
    ($msg:expr) => {
        $crate::terminal::print::print($msg);
    };
}

/// Writes one raw line through the tracing pipeline, above the spinner.
pub fn print(msg: &str) {
    info!(target: PRINT_TARGET, raw_msg = msg);
}

fn rule(ch: &str, width: usize) -> ColoredString {
    ch.repeat(width).color(colors::SEPARATOR)
}

/// `text` centred in a line of `fill`.
fn framed(text: &str, fill: &str, paint: impl Fn(&str) -> ColoredString) -> String {
    let free: usize = TOTAL_WIDTH.saturating_sub(UnicodeWidthStr::width(text));
    format!("{}{}{}", rule(fill, free / 2), paint(text), rule(fill, free - free / 2))
}

pub fn banner(q_level: u8) {
    if q_level > 0 {
        return;
    }
    let title: String = format!("⟦ SCOPR v{} ⟧", env!("CARGO_PKG_VERSION"));
    print(&framed(&title, "═", |t| t.color(colors::PRIMARY).bold()));
}

pub fn header(title: &str, q_level: u8) {
    if q_level > 0 {
        return;
    }
    let label: String = format!("⟦ {} ⟧", title.to_uppercase());
    print(&framed(&label, "─", |t| t.color(colors::ACCENT)));
}

/// Fixes the key column for the following [`aligned_line`] calls.
pub fn set_key_width<'a>(keys: impl IntoIterator<Item = &'a str>) {
    KEY_WIDTH.set(keys.into_iter().map(UnicodeWidthStr::width).max().unwrap_or(0));
}

/// `> key.....: value`
pub fn aligned_line(key: &str, value: impl Display) {
    let dots: usize = (KEY_WIDTH.get() + 1).saturating_sub(UnicodeWidthStr::width(key));
    print_status(format!(
        "{}{} {}",
        key.color(colors::PRIMARY),
        format!("{}:", ".".repeat(dots)).color(colors::SEPARATOR),
        value
    ));
}

pub fn print_status<T: AsRef<str>>(msg: T) {
    print(&format!("{} {}", ">".color(colors::SEPARATOR), msg.as_ref()));
}

/// Renders every child of `group`: an indexed head, its details, then its
/// linked entities as a nested tree.
pub fn scope_group(group: &Node, q_level: u8) {
    let last_idx: usize = group.children.len().saturating_sub(1);
    for (idx, entity) in group.children.iter().enumerate() {
        print(&format!(
            "{}{}{} {}",
            "[".color(colors::SEPARATOR),
            idx.to_string().color(colors::ACCENT),
            "]".color(colors::SEPARATOR),
            format::node_label(entity)
        ));
        if q_level == 0 {
            details(&format::node_details(entity));
        }
        branches(&entity.children, " ");
        if idx != last_idx {
            sprint!();
        }
    }
}

fn details(rows: &[(String, ColoredString)]) {
    let width: usize = rows.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
    for (i, (key, value)) in rows.iter().enumerate() {
        let branch: &str = if i + 1 == rows.len() { "└─" } else { "├─" };
        print(&format!(
            " {} {}{} {}",
            branch.color(colors::SEPARATOR),
            key.color(colors::TEXT_DEFAULT),
            format!("{}:", ".".repeat(width + 1 - key.len())).color(colors::SEPARATOR),
            value
        ));
    }
}

fn branches(children: &[Node], indent: &str) {
    for (i, child) in children.iter().enumerate() {
        let last: bool = i + 1 == children.len();
        let (branch, rail): (&str, &str) = if last { ("└─", " ") } else { ("├─", "│") };
        print(&format!("{indent}{} {}", branch.color(colors::SEPARATOR), format::node_label(child)));
        branches(&child.children, &format!("{indent}{}  ", rail.color(colors::SEPARATOR)));
    }
}

const NO_SCOPE: &str = r#"
          _   _  ___    ____   ____ ___  ____  _____
         | \ | |/ _ \  / ___| / ___/ _ \|  _ \| ____|
         |  \| | | | | \___ \| |  | | | | |_) |  _|
         | |\  | |_| |  ___) | |__| |_| |  __/| |___
         |_| \_|\___/  |____/ \____\___/|_|   |_____|
"#;

pub fn no_results() {
    print(&format!("{}", NO_SCOPE.color(colors::OUT_OF_SCOPE).bold()));
}

/// Closing summary between two heavy rules.
pub fn footer(summary: &str) {
    let pad: String = " ".repeat(TOTAL_WIDTH.saturating_sub(console::measure_text_width(summary)) / 2);
    print(&rule("═", TOTAL_WIDTH).to_string());
    print(&format!("{pad}{summary}"));
    print(&rule("═", TOTAL_WIDTH).to_string());
}
