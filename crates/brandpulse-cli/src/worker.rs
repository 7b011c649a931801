//! Background worker that rebuilds insights snapshots on a schedule.
//!
//! Each cron tick runs the pipeline for every configured brand and writes the
//! result to `<output_dir>/<brand>.json`. The annotation cache lives as long
//! as the worker, so later ticks only score and consolidate mentions that are
//! new or have expired. Ad creative is left to on-demand `insights` runs.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Context;
use brandpulse_core::{AppConfig, BrandConfig};
use brandpulse_insights::{
    BrandInsights, Collaborators, InsightsPipeline, MemoryAnnotationCache, PipelineOptions,
};
use tokio_cron_scheduler::{Job, JobScheduler};

use crate::brands::resolve_brand;

/// Clears the running flag when a tick finishes, even on panic.
struct TickGuard(Arc<AtomicBool>);

impl Drop for TickGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Claim the tick slot; `None` if a previous tick is still running.
fn try_start_tick(running: &Arc<AtomicBool>) -> Option<TickGuard> {
    running
        .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
        .ok()
        .map(|_| TickGuard(Arc::clone(running)))
}

/// Lowercase ASCII alphanumerics with every other run collapsed to `-`.
fn snapshot_file_stem(brand: &str) -> String {
    let mut stem = String::with_capacity(brand.len());
    for c in brand.chars() {
        if c.is_ascii_alphanumeric() {
            stem.push(c.to_ascii_lowercase());
        } else if !stem.is_empty() && !stem.ends_with('-') {
            stem.push('-');
        }
    }
    let trimmed = stem.trim_end_matches('-');
    if trimmed.is_empty() {
        "brand".to_owned()
    } else {
        trimmed.to_owned()
    }
}

/// Write `insights` to `<dir>/<stem>.json` through a temp file and rename, so
/// readers never see a half-written snapshot.
fn write_snapshot(dir: &Path, insights: &BrandInsights) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create {}", dir.display()))?;
    let stem = snapshot_file_stem(&insights.brand);
    let path = dir.join(format!("{stem}.json"));
    let tmp = dir.join(format!(".{stem}.json.tmp"));

    let json = serde_json::to_vec_pretty(insights)?;
    std::fs::write(&tmp, json).with_context(|| format!("failed to write {}", tmp.display()))?;
    std::fs::rename(&tmp, &path)
        .with_context(|| format!("failed to move snapshot into {}", path.display()))?;
    Ok(path)
}

/// Rebuild every brand once. Per-brand failures are logged and skipped.
async fn refresh_all(pipeline: &InsightsPipeline, brands: &[BrandConfig], output_dir: &Path) {
    for brand in brands {
        let insights = match pipeline.run(brand).await {
            Ok(insights) => insights,
            Err(e) => {
                tracing::error!(brand = %brand.name, error = %e, "worker: run failed");
                continue;
            }
        };
        match write_snapshot(output_dir, &insights) {
            Ok(path) => tracing::info!(
                brand = %brand.name,
                path = %path.display(),
                mentions = insights.mentions.len(),
                score = insights.general_sentiment.score,
                "worker: snapshot written"
            ),
            Err(e) => tracing::error!(
                brand = %brand.name,
                error = %e,
                "worker: snapshot write failed"
            ),
        }
    }
}

/// Run the worker until ctrl-c.
///
/// # Errors
///
/// Returns an error if a brand cannot be resolved, the schedule does not
/// parse, or the scheduler fails to start or stop.
pub(crate) async fn run_worker(
    config: &AppConfig,
    brand_names: &[String],
    schedule: &str,
    output_dir: &Path,
) -> anyhow::Result<()> {
    let brands: Arc<[BrandConfig]> = brand_names
        .iter()
        .map(|name| resolve_brand(&config.brands_path, name))
        .collect::<anyhow::Result<Vec<_>>>()?
        .into();

    let collaborators =
        Collaborators::from_config(config, Arc::new(MemoryAnnotationCache::new()))?;
    let pipeline = Arc::new(InsightsPipeline::new(
        collaborators,
        PipelineOptions {
            skip_creative: true,
            ..PipelineOptions::from_config(config)
        },
    ));
    let output_dir: Arc<Path> = Arc::from(output_dir);
    let running = Arc::new(AtomicBool::new(false));

    let job_output_dir = Arc::clone(&output_dir);

    let mut scheduler = JobScheduler::new().await?;
    let job = Job::new_async(schedule, move |_uuid, _lock| {
        let pipeline = Arc::clone(&pipeline);
        let brands = Arc::clone(&brands);
        let output_dir = Arc::clone(&job_output_dir);
        let running = Arc::clone(&running);

        Box::pin(async move {
            let Some(_guard) = try_start_tick(&running) else {
                tracing::warn!("worker: previous refresh still running, skipping tick");
                return;
            };
            tracing::info!(brands = brands.len(), "worker: starting refresh");
            refresh_all(&pipeline, &brands, &output_dir).await;
            tracing::info!("worker: refresh complete");
        })
    })?;
    scheduler.add(job).await?;
    scheduler.start().await?;
    tracing::info!(
        schedule,
        brands = brand_names.len(),
        output_dir = %output_dir.display(),
        "worker: scheduler started"
    );

    tokio::signal::ctrl_c().await?;
    tracing::info!("worker: received shutdown signal");
    scheduler.shutdown().await?;
    Ok(())
}
