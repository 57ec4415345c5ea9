//! Afflictor Engine - command line entry point.
//!
//! `afflictor-engine parse <file> [--locale en|zh]` prints the parsed
//! definition as JSON. Text without stages is reported and skipped.

use anyhow::{bail, Context};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use afflictor_engine::infrastructure::settings::EngineSettings;
use afflictor_engine::parsing::{parse_with_locale, Locale, ParseOutcome};

const USAGE: &str = "usage: afflictor-engine parse <file> [--locale en|zh]";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv_from_repo_root();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "afflictor_engine=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let settings = EngineSettings::from_env();
    let mut args = std::env::args().skip(1);
    match args.next().as_deref() {
        Some("parse") => {}
        _ => bail!(USAGE),
    }

    let mut path = None;
    let mut locale = settings.locale;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--locale" => {
                let value = args.next().context("--locale needs a value")?;
                locale = value.parse::<Locale>()?;
            }
            _ if path.is_none() => path = Some(arg),
            other => bail!("unexpected argument {other}\n{USAGE}"),
        }
    }
    let path = path.context(USAGE)?;

    let raw = tokio::fs::read_to_string(&path)
        .await
        .with_context(|| format!("reading {path}"))?;
    tracing::debug!(%path, %locale, bytes = raw.len(), "Parsing affliction source");

    match parse_with_locale(&raw, locale, None)? {
        ParseOutcome::Parsed(definition) => {
            tracing::info!(
                affliction = %definition.name,
                stages = definition.stages.len(),
                key = %definition.definition_key,
                "Parsed affliction"
            );
            println!("{}", serde_json::to_string_pretty(&definition)?);
        }
        ParseOutcome::Skip => {
            tracing::warn!(%path, "No affliction stages found, skipping");
        }
    }
    Ok(())
}

fn load_dotenv_from_repo_root() {
    let repo_root = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..");

    for filename in [".env.local", ".env"] {
        let path = repo_root.join(filename);
        if path.exists() {
            let _ = dotenvy::from_path(path);
        }
    }
}
