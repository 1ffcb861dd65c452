//! Renders a `PipelineRunner`'s event stream as a progress bar, grounded on
//! the teacher's `DownloadProgress` (same `indicatif::MultiProgress` +
//! `ProgressStyle` idiom), simplified to a single bar per stage since
//! pipeline stages run one at a time rather than as concurrent workers.

use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::mpsc;

use idp_core::work_queue::PipelineEvent;

/// Drains `rx` to completion, rendering one progress bar per stage.
pub async fn drain(mut rx: mpsc::Receiver<PipelineEvent>) {
    let mut bar: Option<ProgressBar> = None;

    while let Some(event) = rx.recv().await {
        match event {
            PipelineEvent::StageStarted { stage, total_items } => {
                let pb = ProgressBar::new(total_items);
                pb.set_style(
                    ProgressStyle::default_bar()
                        .template("{spinner:.green} {msg} [{bar:30.cyan/blue}] {pos}/{len}")
                        .unwrap_or_else(|_| ProgressStyle::default_bar())
                        .progress_chars("█▓░"),
                );
                pb.set_message(stage);
                bar = Some(pb);
            }
            PipelineEvent::ItemStarted { label, .. } => {
                if let Some(pb) = &bar {
                    pb.set_message(label);
                }
            }
            PipelineEvent::ItemCompleted { .. } | PipelineEvent::ItemSkipped { .. } => {
                if let Some(pb) = &bar {
                    pb.inc(1);
                }
            }
            PipelineEvent::ItemFailed { item_id, error, .. } => {
                if let Some(pb) = &bar {
                    pb.inc(1);
                    pb.println(format!("failed: {item_id}: {error}"));
                }
            }
            PipelineEvent::StageCompleted { stage, succeeded, failed, skipped, remaining } => {
                if let Some(pb) = bar.take() {
                    pb.finish_with_message(format!(
                        "{stage}: {succeeded} succeeded, {failed} failed, {skipped} skipped ({remaining} remaining)"
                    ));
                }
            }
        }
    }
}
