use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use toolscout::{
    config::Config,
    dedup::CatalogSnapshot,
    normalizer::FormatHint,
    pipeline::{IngestOptions, Pipeline},
};

/// Existing catalog keys, exported by the store for incremental runs.
#[derive(Debug, Default, Deserialize)]
struct SnapshotFile {
    #[serde(default)]
    tools: Vec<String>,
    #[serde(default)]
    articles: Vec<String>,
}

struct Args {
    file: PathBuf,
    format: FormatHint,
    community: Option<String>,
    source_name: Option<String>,
    since: Option<DateTime<Utc>>,
    snapshot: Option<PathBuf>,
    dry_run: bool,
    no_fetch: bool,
    no_sanitize: bool,
}

const USAGE: &str = "usage: ingest <export-file> \
[--format auto|slack-json|slack-text|whatsapp] [--community SLUG] \
[--source-name NAME] [--since RFC3339] [--snapshot FILE] \
[--dry-run] [--no-fetch] [--no-sanitize]";

fn parse_args() -> Result<Args> {
    let mut args = std::env::args().skip(1);
    let mut file = None;
    let mut format = FormatHint::Auto;
    let mut community = None;
    let mut source_name = None;
    let mut since = None;
    let mut snapshot = None;
    let mut dry_run = false;
    let mut no_fetch = false;
    let mut no_sanitize = false;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--format" => {
                let value = args.next().context("--format needs a value")?;
                format = FormatHint::parse(&value)
                    .with_context(|| format!("unknown format {value:?}"))?;
            }
            "--community" => community = Some(args.next().context("--community needs a value")?),
            "--source-name" => {
                source_name = Some(args.next().context("--source-name needs a value")?)
            }
            "--since" => {
                let value = args.next().context("--since needs a value")?;
                let parsed = DateTime::parse_from_rfc3339(&value)
                    .with_context(|| format!("--since expects an RFC 3339 timestamp, got {value:?}"))?;
                since = Some(parsed.with_timezone(&Utc));
            }
            "--snapshot" => {
                snapshot = Some(PathBuf::from(args.next().context("--snapshot needs a value")?))
            }
            "--dry-run" => dry_run = true,
            "--no-fetch" => no_fetch = true,
            "--no-sanitize" => no_sanitize = true,
            "--help" | "-h" => bail!("{USAGE}"),
            other if file.is_none() && !other.starts_with('-') => {
                file = Some(PathBuf::from(other))
            }
            other => bail!("unexpected argument {other:?}\n{USAGE}"),
        }
    }

    Ok(Args {
        file: file.with_context(|| USAGE.to_string())?,
        format,
        community,
        source_name,
        since,
        snapshot,
        dry_run,
        no_fetch,
        no_sanitize,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = Config::from_env()?;
    let args = parse_args()?;

    // Exports are occasionally not clean UTF-8; decode lossily rather
    // than refusing the file.
    let bytes = std::fs::read(&args.file)
        .with_context(|| format!("failed to read {}", args.file.display()))?;
    let raw = String::from_utf8_lossy(&bytes);

    let snapshot = match &args.snapshot {
        Some(path) => {
            let data = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let file: SnapshotFile =
                serde_json::from_str(&data).context("snapshot file is not valid JSON")?;
            CatalogSnapshot::from_urls(
                file.tools.iter().map(String::as_str),
                file.articles.iter().map(String::as_str),
            )
        }
        None => CatalogSnapshot::default(),
    };

    let mut opts = IngestOptions::new(
        args.community
            .unwrap_or_else(|| config.community().to_string()),
    );
    opts.source_name = args
        .source_name
        .or_else(|| config.source_name().map(str::to_string));
    opts.format = args.format;
    opts.sanitize = !args.no_sanitize;
    opts.fetch_metadata = !args.no_fetch;
    opts.since = args.since;
    opts.dry_run = args.dry_run;
    opts.fetch_concurrency = config.fetch_concurrency();

    let pipeline = Pipeline::new(opts);
    let batch = pipeline.run(&raw, &snapshot).await?;

    println!("{}", serde_json::to_string_pretty(&batch)?);
    Ok(())
}
