use anyhow::{Context, Result};
use anyk::index::build::{build_index, BuildParams, ClusterSpec, DEFAULT_WAND_BLOCK_SIZE};
use anyk::index::clusters::read_selected_clusters;
use anyk::index::stats::show_stats;
use anyk::index::{InvertedIndex, WandData};
use anyk::output::print_output;
use anyk::query::{
    read_queries, read_thresholds, QueryExecutor, Scorer, ScorerKind, ScorerParams, Strategy,
    Tunables,
};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser)]
#[command(name = "anyk")]
#[command(about = "Anytime top-k ranked retrieval over a clustered inverted index")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build an index from a plain-text collection
    Build {
        /// Collection file: one document per line, whitespace-separated term ids
        #[arg(short, long)]
        collection: PathBuf,

        /// Output index directory
        #[arg(short, long)]
        output: PathBuf,

        /// Partition the docid space into this many equal clusters
        #[arg(long, default_value = "1", conflicts_with = "cluster_ranges")]
        num_clusters: u32,

        /// Read cluster ranges from a file of `start end` lines instead
        #[arg(long)]
        cluster_ranges: Option<PathBuf>,

        /// Postings per wand-data block
        #[arg(long, default_value_t = DEFAULT_WAND_BLOCK_SIZE)]
        wand_block_size: usize,

        /// Scorer: bm25 or quantized
        #[arg(long, default_value = "bm25")]
        scorer: String,

        /// BM25 k1 parameter
        #[arg(long, default_value = "0.9")]
        k1: f32,

        /// BM25 b parameter
        #[arg(long, default_value = "0.4")]
        b: f32,
    },
    /// Run queries against an index
    Query {
        /// Index directory
        #[arg(short, long)]
        index: PathBuf,

        /// Queries file: `query_id<TAB>term term ...`
        #[arg(short, long)]
        queries: PathBuf,

        /// Retrieval strategy (e.g. wand, block_max_wand_boundsum, maxscore)
        #[arg(short, long)]
        algorithm: String,

        /// Number of results per query
        #[arg(short, default_value = "10")]
        k: usize,

        /// Thresholds file: one float per line, aligned with the queries
        #[arg(long)]
        thresholds: Option<PathBuf>,

        /// Cluster-selection file: `query_id : cluster cluster ...`
        #[arg(long)]
        clusters: Option<PathBuf>,

        /// Timeout in microseconds for *_boundsum_timeout strategies
        #[arg(long, default_value = "0")]
        timeout: u64,

        /// Risk factor for the timeout prediction
        #[arg(long, default_value = "1.0")]
        risk: f32,

        /// Maximum clusters to visit (0 = unlimited)
        #[arg(long, default_value = "0")]
        max_clusters: usize,

        /// Rerun with threshold 0 when pruning returned fewer than k results
        #[arg(long)]
        safe: bool,

        /// Scorer: bm25 or quantized
        #[arg(long, default_value = "bm25")]
        scorer: String,

        /// BM25 k1 parameter
        #[arg(long, default_value = "0.9")]
        k1: f32,

        /// BM25 b parameter
        #[arg(long, default_value = "0.4")]
        b: f32,

        /// Print per-query latencies to stderr
        #[arg(long)]
        timings: bool,
    },
    /// Show index statistics
    Stats {
        /// Index directory
        #[arg(default_value = ".")]
        index: PathBuf,
    },
}

fn scorer_params(name: &str, k1: f32, b: f32) -> Result<ScorerParams> {
    let kind = ScorerKind::from_name(name)
        .with_context(|| format!("unknown scorer `{}` (expected bm25 or quantized)", name))?;
    Ok(ScorerParams { kind, k1, b })
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Build {
            collection,
            output,
            num_clusters,
            cluster_ranges,
            wand_block_size,
            scorer,
            k1,
            b,
        } => {
            let params = BuildParams {
                wand_block_size,
                clusters: match cluster_ranges {
                    Some(path) => ClusterSpec::File(path),
                    None => ClusterSpec::Even(num_clusters),
                },
                scorer: scorer_params(&scorer, k1, b)?,
            };
            let meta = build_index(&collection, &output, &params)?;
            eprintln!(
                "indexed {} documents, {} terms, {} postings into {} clusters",
                meta.num_docs, meta.num_terms, meta.total_postings, meta.num_clusters
            );
            Ok(())
        }
        Commands::Query {
            index,
            queries,
            algorithm,
            k,
            thresholds,
            clusters,
            timeout,
            risk,
            max_clusters,
            safe,
            scorer,
            k1,
            b,
            timings,
        } => {
            let strategy = Strategy::from_name(&algorithm)?;
            let inverted = InvertedIndex::open(&index)?;

            let wand_path = index.join("wand.bin");
            let wand = if wand_path.exists() {
                Some(WandData::open(&wand_path)?)
            } else {
                None
            };

            let queries = read_queries(&queries)?;
            let thresholds = match thresholds {
                Some(path) => read_thresholds(&path, queries.len())?,
                None => vec![0.0; queries.len()],
            };
            let selected = match clusters {
                Some(path) => read_selected_clusters(&path)?,
                None => Default::default(),
            };

            let scorer = Scorer::from_index(scorer_params(&scorer, k1, b)?, &inverted);
            let mut executor = QueryExecutor::new(
                &inverted,
                wand.as_ref(),
                scorer,
                strategy,
                Tunables {
                    k,
                    max_clusters,
                    timeout_micros: timeout,
                    risk_factor: risk,
                    safe,
                },
            )?;

            eprintln!("running {} queries with {}", queries.len(), strategy.name());

            let stdout = std::io::stdout();
            let mut out = std::io::BufWriter::new(stdout.lock());
            let empty: Vec<u32> = Vec::new();
            let mut latencies = Vec::with_capacity(queries.len());

            for (idx, query) in queries.iter().enumerate() {
                let selection = selected.get(&query.id).unwrap_or(&empty);

                let started = Instant::now();
                let result = executor.execute(query, thresholds[idx], selection)?;
                let micros = started.elapsed().as_micros() as u64;
                latencies.push(micros);

                if timings {
                    eprintln!("{}\t{}", query.id, micros);
                }
                print_output(&mut out, &query.id, &result)?;
            }
            out.flush()?;

            report_latencies(&mut latencies);
            Ok(())
        }
        Commands::Stats { index } => show_stats(&index),
    }
}

/// Latency summary over all queries, on stderr
fn report_latencies(latencies: &mut [u64]) {
    if latencies.is_empty() {
        return;
    }
    latencies.sort_unstable();
    let mean = latencies.iter().sum::<u64>() / latencies.len() as u64;
    let q = |p: usize| latencies[p * latencies.len() / 100];
    eprintln!("mean latency: {} us", mean);
    eprintln!("50% quantile: {} us", latencies[latencies.len() / 2]);
    eprintln!("90% quantile: {} us", q(90));
    eprintln!("95% quantile: {} us", q(95));
    eprintln!("99% quantile: {} us", q(99));
}
