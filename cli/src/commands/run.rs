use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use colored::*;
use tracing::info_span;

use scopr_common::cancel::StopSignal;
use scopr_common::config::RunConfig;
use scopr_common::error::ConfigError;
use scopr_common::events::Event;
use scopr_common::ports::{Resolver, ScopeStore};
use scopr_common::{error, success, warn};
use scopr_core::export::{DOMAINS_GROUP, HOSTS_GROUP, NodeKind, Report};
use scopr_core::{MemoryStore, Phase, Pipeline, RunOutcome};
use scopr_plugins::{Modules, build_modules};
use scopr_protocols::DnsResolver;

use crate::commands::RunArgs;
use crate::sprint;
use crate::terminal::{colors, print, prompt::PromptApproval, spinner};

/// Exit status after a forced quit, as shells report SIGINT.
const INTERRUPTED: i32 = 130;

pub async fn run(args: RunArgs) -> anyhow::Result<()> {
    let cfg: RunConfig = args.into_config();
    cfg.validate()?;

    print::header("preparing run", cfg.quiet);
    let store: Arc<MemoryStore> = Arc::new(load_state(&cfg)?);
    let resolver = DnsResolver::new(cfg.nameserver);
    let modules: Modules = build_modules(&cfg, resolver.clone())?;
    print_setup(&cfg, &modules);

    let stop = StopSignal::new();
    watch_interrupt(stop.clone());

    let span = info_span!("run", indicatif.pb_show = true);
    spinner::attach(&span);
    let guard = span.enter();

    let progress_span = span.clone();
    let shared_store: Arc<dyn ScopeStore> = store.clone();
    let shared_resolver: Arc<dyn Resolver> = Arc::new(resolver);
    let mut pipeline = Pipeline::new(&cfg, shared_store, modules, shared_resolver, stop)
        .on_progress(Box::new(move |phase: Phase, entity: &str| {
            spinner::report_progress(&progress_span, phase, entity)
        }));
    if cfg.ask {
        pipeline = pipeline.with_approval(Arc::new(PromptApproval));
    }

    let start_time: Instant = Instant::now();
    let outcome = pipeline.run().await;
    drop(guard);
    drop(span);

    save_state(&cfg, &store)?;
    let outcome: RunOutcome = outcome?;

    run_ends(&outcome, start_time.elapsed(), &cfg);

    let report = Report::new(outcome.tree, outcome.diagnostics);
    let path: PathBuf = report.write(&cfg.output_dir)?;
    success!("Report written to {}", path.display());
    Ok(())
}

fn load_state(cfg: &RunConfig) -> Result<MemoryStore, ConfigError> {
    let Some(path) = &cfg.state_file else {
        return Ok(MemoryStore::new());
    };
    MemoryStore::load(path).map_err(|e| ConfigError::StateFile {
        path: path.clone(),
        reason: e.to_string(),
    })
}

fn save_state(cfg: &RunConfig, store: &MemoryStore) -> Result<(), ConfigError> {
    let Some(path) = &cfg.state_file else {
        return Ok(());
    };
    store.save(path).map_err(|e| ConfigError::StateFile {
        path: path.clone(),
        reason: e.to_string(),
    })?;
    success!("State saved to {}", path.display());
    Ok(())
}

#[derive(Debug, PartialEq, Eq)]
enum Interrupt {
    /// Finish the current entity, then wind down.
    Stop,
    Quit,
}

impl Interrupt {
    fn after(presses: u32) -> Self {
        if presses <= 1 { Interrupt::Stop } else { Interrupt::Quit }
    }
}

fn watch_interrupt(stop: StopSignal) {
    tokio::spawn(async move {
        let mut presses: u32 = 0;
        while tokio::signal::ctrl_c().await.is_ok() {
            presses += 1;
            match Interrupt::after(presses) {
                Interrupt::Stop => {
                    warn!("Stopping after the current entity, press Ctrl-C again to quit now");
                    stop.stop();
                }
                Interrupt::Quit => {
                    error!("Interrupted");
                    std::process::exit(INTERRUPTED);
                }
            }
        }
    });
}

fn print_setup(cfg: &RunConfig, modules: &Modules) {
    if cfg.quiet > 0 {
        return;
    }

    let providers: String = modules.provider_names().join(", ");
    let enumerators: String = modules.enumerator_names().join(", ");
    print::set_key_width(["Scope", "Discovery", "Enumeration", "Proxy", "State"]);
    print::aligned_line("Scope", cfg.name.as_str().color(colors::ACCENT).bold());
    print::aligned_line("Discovery", none_if_empty(providers));
    print::aligned_line("Enumeration", none_if_empty(enumerators));
    if let Some(proxy) = &cfg.proxy {
        print::aligned_line("Proxy", proxy.as_str());
    }
    if let Some(state) = &cfg.state_file {
        print::aligned_line("State", state.display().to_string());
    }
}

fn none_if_empty(list: String) -> ColoredString {
    if list.is_empty() { "none".dimmed() } else { list.normal() }
}

fn run_ends(outcome: &RunOutcome, total_time: Duration, cfg: &RunConfig) {
    let tree = &outcome.tree;
    if tree.children.iter().all(|group| group.children.is_empty()) {
        print::header("empty scope", cfg.quiet);
        print::no_results();
    } else if cfg.quiet < 2 {
        for group_name in [HOSTS_GROUP, DOMAINS_GROUP] {
            let Some(group) = tree.child(group_name) else {
                continue;
            };
            if group.children.is_empty() {
                continue;
            }
            sprint!();
            print::header(group_name, 0);
            print::scope_group(group, cfg.quiet);
        }
    }

    print_diagnostics(&outcome.diagnostics, cfg);
    print_summary(outcome, total_time, cfg);
}

fn print_diagnostics(diagnostics: &[Event], cfg: &RunConfig) {
    if diagnostics.is_empty() || cfg.quiet > 1 {
        return;
    }

    sprint!();
    print::header("diagnostics", 0);
    for event in diagnostics {
        print::print_status(format!(
            "{} {} {}",
            format!("[{}]", event.component).color(colors::SEPARATOR),
            event.entity.color(colors::PRIMARY),
            event.outcome.to_string().red()
        ));
    }
}

fn print_summary(outcome: &RunOutcome, total_time: Duration, cfg: &RunConfig) {
    let tree = &outcome.tree;
    let hosts: ColoredString = format!("{} hosts", tree.count(NodeKind::Host)).bold().color(colors::HOST);
    let domains: ColoredString = format!("{} domains", tree.count(NodeKind::Domain)).bold().color(colors::DOMAIN);
    let matched: ColoredString = format!("{} linked", outcome.comparison.matched.len()).bold().green();
    let total_time: ColoredString = format!("{:.2}s", total_time.as_secs_f64()).bold().yellow();

    let verb: &str = if outcome.stopped { "Run Stopped" } else { "Run Complete" };
    let output: String = format!("{verb}: {hosts}, {domains}, {matched} in {total_time}")
        .color(colors::TEXT_DEFAULT)
        .to_string();

    match cfg.quiet {
        0 => {
            print::footer(&output);
        }
        _ => {
            sprint!();
            success!("{}", output)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_interrupt_quits() {
        assert_eq!(Interrupt::after(1), Interrupt::Stop);
        assert_eq!(Interrupt::after(2), Interrupt::Quit);
        assert_eq!(Interrupt::after(5), Interrupt::Quit);
    }
}
