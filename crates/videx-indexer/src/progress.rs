//! Per-video progress/outcome reporting (spec §4.11, §7: "UI presents
//! non-fatal degradations distinctly from failures").

use videx_models::VideoId;

#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    LayerStarted { video_id: VideoId, layer: &'static str },
    LayerCompleted { video_id: VideoId, layer: &'static str },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Completed { requires_force_sync: bool },
    Skipped { reason: String },
    Failed { error: String },
    Cancelled,
}

pub type ProgressCallback<'a> = dyn Fn(ProgressEvent) + Send + Sync + 'a;
