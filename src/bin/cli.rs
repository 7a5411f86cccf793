//! chronicle CLI
//!
//! Local entry point for crawl, cache, and buffer operations.

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use chrono::{NaiveDate, NaiveDateTime, Utc};
use clap::{Parser, Subcommand};
use chronicle::{
    codec::{DecodeStream, Value},
    config::Config,
    error::{AppError, Result},
    index,
    models::{BOUND_FORMAT, CrawlFilters, Entity},
    pipeline::{self, CrawlContext, JsonlSource},
    storage::{FileSeenSource, JobStore, SeenCaches},
};

/// chronicle - social-media and news indexing pipeline
#[derive(Parser, Debug)]
#[command(
    name = "chronicle",
    version,
    about = "Crawl, buffer, and index social-media and news content"
)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "data/config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl an entity and push the result to the search index
    Crawl {
        /// Entity display name
        #[arg(long)]
        name: String,

        /// Handle on the crawl source, without the "@"
        #[arg(long)]
        handle: String,

        /// Entity kind, recorded as the indexed source type
        #[arg(long, default_value = "organization")]
        kind: String,

        /// JSON-lines file served as the crawl source. Without it the
        /// existing buffer files are replayed (cached mode).
        #[arg(long)]
        posts_file: Option<PathBuf>,

        /// Lower bound, "YYYY-MM-DD" or "YYYY-MM-DD HH:MM:SS"
        #[arg(long)]
        since: Option<String>,

        /// Upper bound, "YYYY-MM-DD" or "YYYY-MM-DD HH:MM:SS"
        #[arg(long)]
        until: Option<String>,

        /// Maximum items to fetch
        #[arg(long)]
        limit: Option<usize>,

        /// Crawl only this mode (true = mentions, false = own timeline);
        /// omit to run both
        #[arg(long)]
        mentions: Option<bool>,
    },

    /// Rebuild a named seen-cache from a file of identifiers
    RefreshSeen {
        /// Cache name under the configured cache root
        #[arg(long)]
        name: String,

        /// File with one identifier per line
        #[arg(long)]
        ids_file: PathBuf,

        /// Only consider the last N hours of data
        #[arg(long)]
        since_hours: Option<i64>,
    },

    /// Decode a buffer file and summarize its contents
    Inspect {
        /// Buffer file to decode
        file: PathBuf,
    },

    /// Validate the configuration file
    Validate,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Parse a date bound, accepting a bare date or a full timestamp.
fn parse_bound(input: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(input, BOUND_FORMAT)
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(input, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
        .ok_or_else(|| AppError::validation(format!("invalid date bound '{input}'")))
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = Config::load_or_default(&cli.config);

    match cli.command {
        Command::Crawl {
            name,
            handle,
            kind,
            posts_file,
            since,
            until,
            limit,
            mentions,
        } => {
            config.validate()?;
            let filters = CrawlFilters {
                limit,
                since: since.as_deref().map(parse_bound).transpose()?,
                until: until.as_deref().map(parse_bound).transpose()?,
                mentions,
                only_cached: posts_file.is_none(),
            };
            if filters.only_cached {
                log::info!("no posts file given, replaying existing buffers");
            }

            let entity = Entity::new(name, handle, kind);
            let source =
                JsonlSource::new(posts_file.unwrap_or_else(|| PathBuf::from("posts.jsonl")));
            let jobs = JobStore::new(&config.jobs.dir);
            let client = index::connect(&config.index)?;
            let ctx = CrawlContext {
                config: &config,
                jobs: &jobs,
                source: &source,
                sink: client,
            };
            pipeline::run_crawl(&ctx, &entity, &filters).await?;

            log::info!("crawl for '{}' complete", entity.name);
        }

        Command::RefreshSeen {
            name,
            ids_file,
            since_hours,
        } => {
            let mut caches = SeenCaches::new(&config.cache.root);
            caches.register(&name, Box::new(FileSeenSource::new(ids_file)));

            let since = since_hours.map(|h| Utc::now() - chrono::Duration::hours(h));
            let count = caches.refresh(&name, since).await?;
            log::info!("cache '{}' refreshed, {} ids upserted", name, count);
        }

        Command::Inspect { file } => {
            let stream = DecodeStream::new(BufReader::new(File::open(&file)?))?;
            let mut batches = 0usize;
            let mut posts = 0usize;
            let mut strays = 0usize;
            for value in stream {
                match value {
                    Value::List(items) => {
                        batches += 1;
                        posts += items.len();
                    }
                    Value::Map(_) => {
                        batches += 1;
                        posts += 1;
                    }
                    _ => strays += 1,
                }
            }
            log::info!(
                "{}: {} batches, {} posts, {} stray values",
                file.display(),
                batches,
                posts,
                strays
            );
        }

        Command::Validate => {
            log::info!("Validating configuration...");
            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!("All validations passed!");
        }
    }

    Ok(())
}
