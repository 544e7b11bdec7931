use anyhow::Result;
use clap::Args;
use research_runtime::ExperimentType;
use research_templates::TemplateMetadata;
use research_templates::TemplateRegistry;
use research_templates::default_registry;

#[derive(Args, Debug)]
pub struct TemplatesArgs {
    /// Only templates for this domain (general-purpose ones always match)
    #[arg(long)]
    pub domain: Option<String>,

    /// Only templates of this experiment type
    #[arg(long = "type")]
    pub experiment_type: Option<ExperimentType>,

    /// Print registry statistics instead of the listing
    #[arg(long)]
    pub stats: bool,

    /// Emit JSON
    #[arg(long)]
    pub json: bool,
}

pub fn select<'a>(registry: &'a TemplateRegistry, args: &TemplatesArgs) -> Vec<&'a TemplateMetadata> {
    registry
        .list_metadata()
        .into_iter()
        .filter(|meta| {
            args.experiment_type
                .is_none_or(|t| meta.experiment_type == t)
        })
        .filter(|meta| match (&args.domain, &meta.domain) {
            (Some(wanted), Some(domain)) => domain.eq_ignore_ascii_case(wanted.trim()),
            _ => true,
        })
        .collect()
}

fn render_line(meta: &TemplateMetadata) -> String {
    format!(
        "{:<24} {:<20} {:<10} rigor {:.2}  {}",
        meta.name,
        meta.experiment_type,
        meta.domain.as_deref().unwrap_or("general"),
        meta.rigor_score,
        meta.title
    )
}

pub fn execute(args: TemplatesArgs) -> Result<()> {
    let registry = default_registry()?;

    if args.stats {
        println!("{}", serde_json::to_string_pretty(&registry.statistics())?);
        return Ok(());
    }

    let selected = select(&registry, &args);
    tracing::debug!(count = selected.len(), "selected templates");
    if args.json {
        println!("{}", serde_json::to_string_pretty(&selected)?);
    } else if selected.is_empty() {
        println!("no matching templates");
    } else {
        for meta in selected {
            println!("{}", render_line(meta));
        }
    }
    Ok(())
}
