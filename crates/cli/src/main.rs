//! Command-line front end for competitor feature analysis.
//!
//! Usage:
//!     rivalmap analyze --input extraction.json --main-product Acme
//!     rivalmap analyze --input extraction.json --main-product Acme --weights weights.json --format json
//!     rivalmap matrix --input extraction.json
//!     rivalmap check --input extraction.json
//!     rivalmap fingerprint --input extraction.json --main-product Acme

mod render;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use rivalmap_explain::{explain_entry, summarize_ranking, Explanation};
use rivalmap_ingest::{parse_extraction_str, parse_weights_str, Extraction};
use rivalmap_matrix::{build_matrix, reconcile, ReconcileConfig};
use rivalmap_model::{AnalysisInput, AnalysisResult, WeightTable};
use rivalmap_rank::analyze;
use rivalmap_store::{analyze_cached, CacheStatus, FileStore, FileStoreConfig, Fingerprint};
use rivalmap_weighting::weighted_matrix;
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "rivalmap")]
#[command(about = "Rank competitor products by weighted feature coverage")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score and rank products from an extraction file
    Analyze {
        /// Extraction JSON (`features` + `product_features`)
        #[arg(short, long)]
        input: PathBuf,

        /// Your own product's name, exactly as in the extraction
        #[arg(short, long)]
        main_product: String,

        /// Weight overrides JSON (`{"feature": weight}`)
        #[arg(short, long)]
        weights: Option<PathBuf>,

        /// Reuse and store results in this directory
        #[arg(long, env = "RIVALMAP_STORE_DIR")]
        store_dir: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Print the coverage matrix
    Matrix {
        #[arg(short, long)]
        input: PathBuf,

        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Report coverage names that match no catalog feature
    Check {
        #[arg(short, long)]
        input: PathBuf,

        /// Maximum edit distance for spelling suggestions
        #[arg(long, default_value = "2")]
        max_edit_distance: usize,

        /// Disable phonetic suggestions
        #[arg(long)]
        no_phonetic: bool,
    },

    /// Print the cache key for an analysis input
    Fingerprint {
        #[arg(short, long)]
        input: PathBuf,

        #[arg(short, long)]
        main_product: String,

        #[arg(short, long)]
        weights: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Serialize)]
struct AnalyzeReport<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    fingerprint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cached: Option<bool>,
    summary: &'a str,
    result: &'a AnalysisResult,
    explanations: &'a [Explanation],
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so JSON output stays clean
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("rivalmap=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            input,
            main_product,
            weights,
            store_dir,
            format,
        } => {
            let input = load_input(&input, main_product, weights.as_deref()).await?;
            run_analyze(input, store_dir, format).await?;
        }
        Commands::Matrix { input, format } => {
            run_matrix(&input, format).await?;
        }
        Commands::Check {
            input,
            max_edit_distance,
            no_phonetic,
        } => {
            let config = ReconcileConfig {
                max_edit_distance,
                phonetic: !no_phonetic,
            };
            run_check(&input, &config).await?;
        }
        Commands::Fingerprint {
            input,
            main_product,
            weights,
        } => {
            let input = load_input(&input, main_product, weights.as_deref()).await?;
            println!("{}", Fingerprint::of(&input)?);
        }
    }

    Ok(())
}

async fn load_extraction(path: &Path) -> Result<Extraction> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading extraction {}", path.display()))?;
    let extraction =
        parse_extraction_str(&text).with_context(|| format!("parsing extraction {}", path.display()))?;
    Ok(extraction)
}

async fn load_weights(path: &Path) -> Result<WeightTable> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading weights {}", path.display()))?;
    let weights = parse_weights_str(&text).with_context(|| format!("parsing weights {}", path.display()))?;
    Ok(weights)
}

async fn load_input(path: &Path, main_product: String, weights: Option<&Path>) -> Result<AnalysisInput> {
    let Extraction { catalog, coverage } = load_extraction(path).await?;
    let mut input = AnalysisInput::new(main_product, catalog, coverage);
    if let Some(weights) = weights {
        input = input.with_weights(load_weights(weights).await?);
    }
    Ok(input)
}

async fn run_analyze(input: AnalysisInput, store_dir: Option<PathBuf>, format: OutputFormat) -> Result<()> {
    let (result, fingerprint, cached) = match store_dir {
        Some(root) => {
            let store = FileStore::open(FileStoreConfig { root }).await?;
            let (result, status) = analyze_cached(&store, &input).await?;
            let key = Fingerprint::of(&input)?;
            (result, Some(key.to_string()), Some(status == CacheStatus::Hit))
        }
        None => (analyze(&input)?, None, None),
    };

    let weighted = weighted_matrix(&result.matrix, &result.weights);
    let explanations: Vec<Explanation> = result
        .ranking
        .iter()
        .map(|entry| explain_entry(entry, &weighted))
        .collect();
    let summary = summarize_ranking(&result.ranking);

    match format {
        OutputFormat::Json => {
            let report = AnalyzeReport {
                fingerprint,
                cached,
                summary: &summary,
                result: &result,
                explanations: &explanations,
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Text => {
            print!("{}", render::render_analysis(&result, &explanations, &summary));
            if let (Some(key), Some(cached)) = (fingerprint, cached) {
                println!("Cache: {} ({})", if cached { "hit" } else { "miss" }, key);
            }
        }
    }

    Ok(())
}

async fn run_matrix(path: &Path, format: OutputFormat) -> Result<()> {
    let extraction = load_extraction(path).await?;
    let matrix = build_matrix(&extraction.catalog, &extraction.coverage)?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&matrix)?),
        OutputFormat::Text => print!("{}", render::render_matrix(&matrix)),
    }

    Ok(())
}

async fn run_check(path: &Path, config: &ReconcileConfig) -> Result<()> {
    let extraction = load_extraction(path).await?;
    let unmatched = reconcile(&extraction.catalog, &extraction.coverage, config);

    print!("{}", render::render_unmatched(&unmatched));

    if !unmatched.is_empty() {
        std::process::exit(1);
    }
    Ok(())
}
