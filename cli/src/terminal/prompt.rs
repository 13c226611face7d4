use async_trait::async_trait;
use dialoguer::Confirm;
use scopr_common::ports::DomainApproval;
use tracing_indicatif::suspend_tracing_indicatif;

/// Asks the operator on the terminal before a new root domain joins the scope.
pub struct PromptApproval;

#[async_trait]
impl DomainApproval for PromptApproval {
    async fn approve(&self, domain: &str, found_via: &str) -> bool {
        let question: String = format!("Add {domain} (found via {found_via}) to the scope?");

        tokio::task::spawn_blocking(move || {
            suspend_tracing_indicatif(|| {
                Confirm::new()
                    .with_prompt(question)
                    .default(false)
                    .interact()
                    .unwrap_or(false)
            })
        })
        .await
        .unwrap_or(false)
    }
}
