// src/pipeline/crawl.rs

//! Crawl orchestrator.
//!
//! Drives one crawl job per mode: compute the job signature, look up its
//! persisted state, crawl into the buffer if needed, then replay and push
//! to the index if needed. Each phase is guarded by its completion flag,
//! so re-running after a crash resumes at the first incomplete phase
//! instead of redoing work.

use std::time::Duration;

use crate::config::Config;
use crate::error::Result;
use crate::index::{BulkSink, IndexedPost};
use crate::models::{CrawlFilters, CrawlParams, Entity};
use crate::pipeline::buffer::{CrawlBuffer, CrawlSource};
use crate::pipeline::push::BulkPusher;
use crate::storage::{JobStore, SeenSet};
use crate::utils::retry::RetryPolicy;

/// Collaborators for a crawl run.
pub struct CrawlContext<'a> {
    pub config: &'a Config,
    pub jobs: &'a JobStore,
    pub source: &'a dyn CrawlSource,
    pub sink: &'a dyn BulkSink,
}

/// Run the crawl/index pipeline for one entity.
///
/// `filters.mentions = None` runs both modes in sequence: the entity's own
/// timeline first, then posts mentioning it. Safe to call repeatedly for
/// the same parameters.
pub async fn run_crawl(
    ctx: &CrawlContext<'_>,
    entity: &Entity,
    filters: &CrawlFilters,
) -> Result<()> {
    for mentions in filters.modes() {
        run_mode(ctx, entity, filters, mentions).await?;
    }
    Ok(())
}

async fn run_mode(
    ctx: &CrawlContext<'_>,
    entity: &Entity,
    filters: &CrawlFilters,
    mentions: bool,
) -> Result<()> {
    let mut params = CrawlParams::new(&entity.handle, mentions, filters);
    if mentions {
        params.language = Some(ctx.config.crawler.mention_language.clone());
    }

    let state = ctx.jobs.load_or_create(&entity.name, &params)?;
    let signature = state.signature.clone();

    if state.is_crawled {
        log::info!("job '{}' is already crawled", signature);
    } else {
        log::info!("starting crawl for job '{}'", signature);
        let mut buffer = new_buffer(ctx, &params, None);
        buffer.start_crawl(ctx.source).await?;
        buffer.close()?;
        ctx.jobs.mark_crawled(&signature)?;
    }

    let state = ctx.jobs.load_or_create(&entity.name, &params)?;
    if state.is_indexed {
        log::info!("job '{}' is already indexed", signature);
        return Ok(());
    }

    log::info!("indexing job '{}'", signature);
    let buffer = new_buffer(ctx, &params.cached(), open_seen(ctx)?);
    let pusher = BulkPusher::new(ctx.sink, &ctx.config.index);
    let own_entity = (!mentions).then(|| entity.clone());
    let records = buffer.replay()?.map(move |post| match &own_entity {
        Some(entity) => IndexedPost::own_timeline(post, entity),
        None => IndexedPost::mention(post),
    });
    let stats = pusher.push(records).await?;
    log::info!(
        "job '{}': {} documents indexed, {} duplicates",
        signature,
        stats.indexed,
        stats.duplicates
    );
    ctx.jobs.mark_indexed(&signature)?;
    Ok(())
}

fn new_buffer(ctx: &CrawlContext<'_>, params: &CrawlParams, seen: Option<SeenSet>) -> CrawlBuffer {
    CrawlBuffer::new(
        &ctx.config.buffer.dir,
        params,
        ctx.config.buffer.capacity,
        seen,
    )
    .with_retry_policy(RetryPolicy::fixed(
        ctx.config.crawler.crawl_attempts,
        Duration::from_secs(ctx.config.crawler.crawl_retry_delay_secs),
    ))
}

/// Open the dedup cache configured for replay filtering. Disabled means
/// every replayed post is treated as unseen.
fn open_seen(ctx: &CrawlContext<'_>) -> Result<Option<SeenSet>> {
    if !ctx.config.cache.enabled {
        return Ok(None);
    }
    let path = ctx.config.cache.root.join(&ctx.config.cache.name);
    Ok(Some(SeenSet::open(path)?))
}
