use std::path::PathBuf;

use anyhow::Context;
use anyhow::Result;
use clap::Args;
use research_runtime::DomainCheck;
use research_runtime::ResearchConfig;

#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// TOML config file; defaults apply when omitted
    #[arg(long)]
    pub file: Option<PathBuf>,

    /// Override the research question
    #[arg(long)]
    pub question: Option<String>,

    /// Override the domain (applied before `RESEARCH_DOMAIN`)
    #[arg(long)]
    pub domain: Option<String>,
}

/// Build the effective config: file, then flags, then environment.
pub fn resolve<F>(raw: Option<&str>, args: &ConfigArgs, lookup: F) -> Result<(ResearchConfig, DomainCheck)>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match raw {
        Some(raw) => ResearchConfig::from_toml_str(raw)?,
        None => ResearchConfig::default(),
    };
    if let Some(question) = &args.question {
        config.research_question.clone_from(question);
    }
    if let Some(domain) = &args.domain {
        config.domain.clone_from(domain);
    }
    config.apply_env_overrides(lookup)?;
    let check = config.validate()?;
    Ok((config, check))
}

pub async fn execute(args: ConfigArgs) -> Result<()> {
    let raw = match &args.file {
        Some(path) => Some(
            tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("failed to read config {}", path.display()))?,
        ),
        None => None,
    };
    let (config, check) = resolve(raw.as_deref(), &args, |key| std::env::var(key).ok())
        .context("invalid research configuration")?;

    if check == DomainCheck::Unrecognized {
        eprintln!(
            "warning: domain `{}` is not one of: {}",
            config.domain,
            config.enabled_domains.join(", ")
        );
    }
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}
