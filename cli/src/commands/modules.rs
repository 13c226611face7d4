use colored::*;
use scopr_plugins::registry::{DEFAULT_DISCOVERY, DEFAULT_ENUMERATION, DISCOVERY_MODULES, ENUMERATION_MODULES};

use crate::sprint;
use crate::terminal::{colors, print};

pub fn modules() {
    print::set_key_width(DISCOVERY_MODULES.iter().chain(ENUMERATION_MODULES).copied());

    print::header("discovery modules", 0);
    list(DISCOVERY_MODULES, DEFAULT_DISCOVERY);
    sprint!();
    print::header("enumeration modules", 0);
    list(ENUMERATION_MODULES, DEFAULT_ENUMERATION);
}

fn list(names: &[&str], defaults: &[&str]) {
    for name in names {
        let status: ColoredString = if defaults.contains(name) {
            "default".color(colors::ACCENT)
        } else {
            "opt-in".dimmed()
        };
        print::aligned_line(name, status);
    }
}
