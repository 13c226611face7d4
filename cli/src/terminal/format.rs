use colored::*;
use scopr_core::export::{Node, NodeKind};
use serde_json::Value;

use crate::terminal::colors;

type Detail = (String, ColoredString);

/// Key/value lines shown under a host or domain head.
pub fn node_details(node: &Node) -> Vec<Detail> {
    let mut details: Vec<Detail> = Vec::new();

    if let Some(ip) = node.details.get("ip").and_then(Value::as_str) {
        details.push(("IP".to_string(), ip.color(colors::HOST)));
    }
    if let Some(org) = whois_name(node) {
        details.push(("Owner".to_string(), org.normal()));
    }
    if let Some(ports) = shodan_ports(node) {
        details.push(("Ports".to_string(), ports.color(colors::ACCENT)));
    }
    if let Some(history) = node.details.get("ip_history").and_then(Value::as_array) {
        details.push(("History".to_string(), format!("{} addresses", history.len()).normal()));
    }

    let linked: usize = node.count(NodeKind::Subdomain);
    if node.kind == NodeKind::Host {
        details.push(("Names".to_string(), linked.to_string().color(colors::SUBDOMAIN)));
    }

    if details.is_empty() {
        details.push(("Info".to_string(), "not enumerated".dimmed()));
    }
    details
}

/// One-line label of a subdomain or webpage node.
pub fn node_label(node: &Node) -> String {
    match node.kind {
        NodeKind::Subdomain => {
            let flag: ColoredString = match node.details.get("in_scope_ip").and_then(Value::as_bool) {
                Some(true) => "in scope".color(colors::IN_SCOPE),
                _ => "outside".color(colors::OUT_OF_SCOPE),
            };
            format!("{} {}", node.name.color(colors::SUBDOMAIN), format!("({flag})").dimmed())
        }
        NodeKind::Webpage => {
            let archived: usize = node
                .details
                .get("archived_urls")
                .and_then(Value::as_array)
                .map_or(0, Vec::len);
            match archived {
                0 => format!("{}", node.name.color(colors::WEBPAGE)),
                n => format!("{} {}", node.name.color(colors::WEBPAGE), format!("[{n} snapshots]").dimmed()),
            }
        }
        NodeKind::Host => format!("{}", node.name.color(colors::HOST)),
        NodeKind::Domain => format!("{}", node.name.color(colors::DOMAIN)),
        NodeKind::Scope | NodeKind::Group => node.name.clone(),
    }
}

fn whois_name(node: &Node) -> Option<String> {
    let whois: &Value = node.details.get("whois")?;
    whois
        .get("name")
        .or_else(|| whois.get("handle"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn shodan_ports(node: &Node) -> Option<String> {
    let ports: &Vec<Value> = node.details.get("shodan")?.get("ports")?.as_array()?;
    let joined: String = ports
        .iter()
        .filter_map(Value::as_u64)
        .map(|p| p.to_string())
        .collect::<Vec<String>>()
        .join(", ");
    (!joined.is_empty()).then_some(joined)
}
