pub mod modules;
pub mod run;

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use scopr_common::config::{ApiKeys, DEFAULT_NAMESERVER, RunConfig, SeedFiles};

#[derive(Parser)]
#[command(name = "scopr")]
#[command(about = "Recon orchestrator for pentest scoping.")]
pub struct CommandLine {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Discover and enumerate an engagement scope
    #[command(alias = "r")]
    Run(RunArgs),
    /// List the available discovery and enumeration modules
    #[command(alias = "m")]
    Modules,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Engagement name, all results are stored under it
    #[arg(short, long)]
    pub name: String,

    /// File with one in-scope IP address per line
    #[arg(short, long)]
    pub ips: Option<PathBuf>,

    /// File with one root domain per line
    #[arg(short, long)]
    pub domains: Option<PathBuf>,

    /// File with one subdomain per line
    #[arg(short, long)]
    pub subdomains: Option<PathBuf>,

    /// Comma separated module names (see `scopr modules`)
    #[arg(short, long)]
    pub modules: Option<String>,

    /// Proxy for HTTP providers, e.g. socks5://localhost:9080
    #[arg(short, long)]
    pub proxy: Option<String>,

    /// Ask before adding newly discovered root domains
    #[arg(short, long)]
    pub ask: bool,

    /// Store snapshot to resume from and save to (defaults to $SCOPR_STATE)
    #[arg(long)]
    pub state: Option<PathBuf>,

    /// Directory for the JSON report
    #[arg(short, long, default_value = "/tmp")]
    pub output: PathBuf,

    /// DNS server used for resolution
    #[arg(long, default_value_t = DEFAULT_NAMESERVER)]
    pub nameserver: SocketAddr,

    /// Less output, repeat for even less
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub quiet: u8,
}

impl CommandLine {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    pub fn quiet(&self) -> u8 {
        match &self.command {
            Commands::Run(args) => args.quiet,
            Commands::Modules => 0,
        }
    }
}

impl RunArgs {
    /// Builds the run configuration. API keys and the default state file come from the environment.
    pub fn into_config(self) -> RunConfig {
        let mut cfg = RunConfig::new(self.name);
        cfg.seeds = SeedFiles {
            ips: self.ips,
            domains: self.domains,
            subdomains: self.subdomains,
        };
        cfg.modules = self
            .modules
            .as_deref()
            .map(RunConfig::parse_modules)
            .unwrap_or_default();
        cfg.proxy = self.proxy;
        cfg.ask = self.ask;
        cfg.state_file = self.state.or_else(|| env_var("SCOPR_STATE").map(PathBuf::from));
        cfg.output_dir = self.output;
        cfg.nameserver = self.nameserver;
        cfg.quiet = self.quiet;
        cfg.api_keys = ApiKeys {
            shodan: env_var("SHODAN_API_KEY"),
            viewdns: env_var("VIEWDNS_API_KEY"),
        };
        cfg
    }
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_flags_map_onto_the_config() {
        let cli = CommandLine::try_parse_from([
            "scopr", "run", "-n", "acme", "-d", "domains.txt", "-m", "reverse_ip,fuzz_dns", "-a", "-qq",
            "--state", "state.json", "-p", "socks5://localhost:9080",
        ])
        .unwrap();
        assert_eq!(cli.quiet(), 2);

        let Commands::Run(args) = cli.command else {
            panic!("expected the run command");
        };
        let cfg = args.into_config();
        assert_eq!(cfg.name, "acme");
        assert_eq!(cfg.seeds.domains, Some(PathBuf::from("domains.txt")));
        assert_eq!(cfg.modules, vec!["reverse_ip", "fuzz_dns"]);
        assert!(cfg.ask);
        assert_eq!(cfg.state_file, Some(PathBuf::from("state.json")));
        assert_eq!(cfg.output_dir, PathBuf::from("/tmp"));
        assert_eq!(cfg.nameserver, DEFAULT_NAMESERVER);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn name_is_required() {
        assert!(CommandLine::try_parse_from(["scopr", "run", "-d", "domains.txt"]).is_err());
    }
}
