//! The per-video state machine (spec §4.9): pre-pipeline guards, then four
//! monotonic layers (metadata, visual vectors, STT, descriptions +
//! embeddings).

use std::path::Path;

use chrono::Utc;
use tracing::warn;
use videx_media::content_hash::quick_hash;
use videx_media::scene_detector::{SceneDetectionResult, SceneDetector};
use videx_media::{AudioExtractor, AudioExtractorConfig, KeyframeExtractor, KeyframeExtractorConfig};
use videx_models::{ClipDraft, IndexLayer, IndexStatus, Video};
use videx_stt::{cleanup, clip_mapping, language_id, subtitle, LidOutcome, SttEngine};
use videx_store::{orphan, FolderStore, GlobalStore, SyncEngine};
use videx_vision::{merge_fields, EmbeddingCoordinator, EmbeddingProvider, VisionEngine, VisionFields};

use crate::capabilities::ImageEmbeddingProvider;
use crate::config::IndexerConfig;
use crate::error::{IndexerError, IndexerResult};
use crate::result::IndexResult;

/// Cancellation is a signal, not an error (spec §9): callers poll this
/// before/after each boundary and the layer flushes pending work before
/// re-raising as `IndexerError::Cancelled`.
pub trait CancellationToken: Send + Sync {
    fn is_cancelled(&self) -> bool;
}

pub struct NeverCancelled;
impl CancellationToken for NeverCancelled {
    fn is_cancelled(&self) -> bool {
        false
    }
}

/// Engines the indexer drives but does not own; absent capabilities mean
/// the corresponding layer is skipped (spec §4.9 Non-goals: actual model
/// implementations are pluggable).
pub struct Engines<'a> {
    pub stt_high_accuracy: Option<&'a dyn SttEngine>,
    pub stt_fast: Option<&'a dyn SttEngine>,
    pub local_vision: Option<&'a dyn VisionEngine>,
    pub cloud_vision: Option<&'a dyn VisionEngine>,
    pub image_embedding: Option<&'a dyn ImageEmbeddingProvider>,
    pub text_embedding: Option<&'a dyn EmbeddingProvider>,
    pub rate_limiter: Option<&'a videx_ratelimit::RateLimiterHandle>,
}

impl<'a> Engines<'a> {
    pub fn stt_unavailable(&self) -> bool {
        !self.stt_high_accuracy.map(|e| e.is_available()).unwrap_or(false)
            && !self.stt_fast.map(|e| e.is_available()).unwrap_or(false)
    }

    pub fn remote_vision_available(&self) -> bool {
        self.cloud_vision.is_some()
    }
}

/// Entry point: `index_video` (spec §4.9).
pub async fn index_video(
    video_path: &str,
    folder_path: &str,
    folder_store: &FolderStore,
    global_store: Option<&GlobalStore>,
    config: &IndexerConfig,
    engines: &Engines<'_>,
    cancel: &dyn CancellationToken,
) -> IndexerResult<IndexResult> {
    let mut result = IndexResult::default();

    let metadata = tokio::fs::metadata(video_path).await?;
    let size_bytes = metadata.len();
    let modified_at: chrono::DateTime<Utc> = metadata.modified().map(chrono::DateTime::from).unwrap_or_else(|_| Utc::now());
    let filename = Path::new(video_path)
        .file_name()
        .map(|f| f.to_string_lossy().to_string())
        .unwrap_or_else(|| video_path.to_string());

    let mut video = match folder_store.get_video_by_path(video_path)? {
        Some(v) => v,
        None => {
            let fresh = Video::new_pending(videx_models::FolderId::new(1), video_path, &filename, size_bytes, modified_at);
            let id = folder_store.insert_video(&fresh)?;
            folder_store.get_video_by_id(id)?.expect("just inserted")
        }
    };

    if let Some(guard_result) = run_pre_pipeline_guards(
        &mut video,
        folder_store,
        size_bytes,
        modified_at,
        &filename,
        video_path,
        &mut result,
    )
    .await?
    {
        return Ok(guard_result);
    }

    let starting_layer = video.index_layer;

    for layer in [IndexLayer::Metadata, IndexLayer::VisualVectors, IndexLayer::Stt, IndexLayer::Descriptions] {
        if layer < starting_layer {
            continue;
        }
        if config.layer_is_skipped(layer) {
            continue;
        }
        if cancel.is_cancelled() {
            return Err(IndexerError::Cancelled);
        }

        let outcome = match layer {
            IndexLayer::Metadata => run_metadata_layer(&mut video, video_path, folder_store).await,
            IndexLayer::VisualVectors => {
                run_visual_vectors_layer(&mut video, video_path, folder_path, config, folder_store, global_store, engines, &mut result).await
            }
            IndexLayer::Stt => run_stt_layer(&mut video, video_path, config, folder_store, engines, &mut result).await,
            IndexLayer::Descriptions => {
                run_descriptions_layer(&mut video, config, folder_store, engines, cancel, &mut result).await
            }
        };

        match outcome {
            Ok(()) => {
                video.index_layer = layer;
                folder_store.update_video(&video)?;
            }
            Err(IndexerError::Cancelled) => return Err(IndexerError::Cancelled),
            Err(e) => {
                video.index_status = IndexStatus::Failed;
                video.last_error = Some(e.to_string());
                folder_store.update_video(&video)?;
                return Err(e);
            }
        }
    }

    if let Some(global) = global_store {
        if !config.skip_sync {
            let engine = SyncEngine::new(folder_store, global, folder_path);
            result.sync_result = Some(engine.sync_incremental()?);
        }
    }

    Ok(result)
}

/// Pre-pipeline guards (spec §4.9): fast-skip on unchanged file, orphan
/// recompute, and pending-hash-absent recovery. Returns `Some(result)` when
/// the guard short-circuits the layer pipeline entirely.
async fn run_pre_pipeline_guards(
    video: &mut Video,
    folder_store: &FolderStore,
    size_bytes: u64,
    modified_at: chrono::DateTime<Utc>,
    filename: &str,
    video_path: &str,
    result: &mut IndexResult,
) -> IndexerResult<Option<IndexResult>> {
    if video.index_status == IndexStatus::Completed {
        if video.size_bytes == size_bytes && video.modified_at == modified_at {
            return Ok(Some(result.clone()));
        }

        let current_hash = quick_hash(video_path).await?;
        match &video.file_hash {
            Some(stored) if *stored == current_hash => {
                video.size_bytes = size_bytes;
                video.modified_at = modified_at;
                folder_store.update_video(video)?;
                return Ok(Some(result.clone()));
            }
            Some(_) => {
                video.file_hash = None;
                video.last_processed_clip = None;
                video.index_status = IndexStatus::Pending;
                video.index_layer = IndexLayer::Metadata;
                folder_store.update_video(video)?;
            }
            None if video.size_bytes != size_bytes => {
                video.index_status = IndexStatus::Pending;
                video.index_layer = IndexLayer::Metadata;
                folder_store.update_video(video)?;
            }
            None => {
                video.file_hash = Some(current_hash);
                video.size_bytes = size_bytes;
                video.modified_at = modified_at;
                folder_store.update_video(video)?;
                return Ok(Some(result.clone()));
            }
        }
    }

    if video.index_status == IndexStatus::Orphaned {
        let current_hash = quick_hash(video_path).await?;
        if video.file_hash.as_deref() == Some(current_hash.as_str()) {
            video.index_status = IndexStatus::Completed;
            video.orphaned_at = None;
            video.path = video_path.to_string();
            video.filename = filename.to_string();
            video.size_bytes = size_bytes;
            video.modified_at = modified_at;
            folder_store.update_video(video)?;
            result.requires_force_sync = true;
            return Ok(Some(result.clone()));
        }
        video.index_status = IndexStatus::Pending;
        video.index_layer = IndexLayer::Metadata;
        video.orphaned_at = None;
        folder_store.update_video(video)?;
    }

    if video.index_status == IndexStatus::Pending && video.file_hash.is_none() {
        let current_hash = quick_hash(video_path).await?;
        if let Some(outcome) = orphan::attempt_recovery(
            folder_store,
            &current_hash,
            video_path,
            filename,
            size_bytes,
            modified_at,
            video.id,
        )? {
            *video = folder_store
                .get_video_by_id(outcome.recovered_video_id)?
                .expect("recovery just restored this row");
            result.requires_force_sync = true;
            result.clips_created = outcome.clip_count;
            return Ok(Some(result.clone()));
        }
        video.file_hash = Some(current_hash);
        folder_store.update_video(video)?;
    }

    Ok(None)
}

async fn run_metadata_layer(video: &mut Video, video_path: &str, folder_store: &FolderStore) -> IndexerResult<()> {
    let detector = SceneDetector::new(Default::default());
    let duration = detector.probe_duration_only(video_path).await?;
    video.duration_secs = Some(duration);
    video.index_status = IndexStatus::MetadataDone;
    folder_store.update_video(video)?;
    Ok(())
}

async fn run_visual_vectors_layer(
    video: &mut Video,
    video_path: &str,
    folder_path: &str,
    config: &IndexerConfig,
    folder_store: &FolderStore,
    global_store: Option<&GlobalStore>,
    engines: &Engines<'_>,
    result: &mut IndexResult,
) -> IndexerResult<()> {
    let detector = SceneDetector::new(Default::default());
    let audio_sidecar = if !engines.stt_unavailable() {
        Some(format!("{}/video_{}.wav", config.tmp_dir(), video.id.get()))
    } else {
        None
    };
    if let Some(dir) = Path::new(&config.tmp_dir()).to_str() {
        tokio::fs::create_dir_all(dir).await.ok();
    }

    let SceneDetectionResult { segments, duration, .. } = detector.detect(video_path, audio_sidecar.as_deref()).await?;
    let segments = if segments.is_empty() { uniform_interval_fallback(duration) } else { segments };

    // The global-store mirror lives in a separate database file from the
    // folder store, so it cannot join the folder-store transaction below;
    // remove it first and propagate any failure instead of swallowing it.
    if let Some(global) = global_store {
        SyncEngine::new(folder_store, global, folder_path).remove_video_mirror(video.id.get())?;
    }

    let thumb_root = format!("{}/video_{}", config.thumbnails_dir(), video.id.get());
    let keyframe_extractor = KeyframeExtractor::new(KeyframeExtractorConfig::default());
    let image_provider = engines.image_embedding;

    let mut drafts = Vec::with_capacity(segments.len());
    let mut frames_by_index = Vec::with_capacity(segments.len());
    for (scene_index, segment) in segments.iter().enumerate() {
        let frames = keyframe_extractor.extract_scene(video_path, segment, scene_index, &thumb_root).await.unwrap_or_default();
        let thumbnail = frames.first().cloned();
        let mut draft = ClipDraft::new(segment.start, segment.end);
        draft.thumbnail_path = thumbnail;
        drafts.push(draft);
        frames_by_index.push(frames);
    }

    // Delete prior clips and insert the new ones in a single transaction
    // (spec §4.9 Layer 1).
    let new_ids = folder_store.replace_clips(video.id, &drafts)?;
    let clip_ids: Vec<(videx_models::ClipId, Vec<String>)> = new_ids.into_iter().zip(frames_by_index).collect();
    result.clips_created = clip_ids.len();

    if let Some(local_engine) = engines.local_vision {
        let mut persisted = folder_store.list_clips_for_video(video.id)?;
        for (clip_id, frames) in &clip_ids {
            let Some(first_frame) = frames.first() else { continue };
            let Ok(bytes) = tokio::fs::read(first_frame).await else { continue };
            match local_engine.analyze(&bytes).await {
                Ok(fields) => {
                    if let Some(clip) = persisted.iter_mut().find(|c| c.id == *clip_id) {
                        apply_vision_fields(clip, &fields, local_engine.provider().as_str());
                        folder_store.update_clip(clip)?;
                    }
                }
                Err(e) => warn!(clip = clip_id.get(), error = %e, "local vision analysis failed, non-fatal"),
            }
        }
    }

    if let Some(provider) = image_provider {
        let mut persisted = folder_store.list_clips_for_video(video.id)?;
        for (clip_id, frames) in &clip_ids {
            let Some(first_frame) = frames.first() else { continue };
            let Ok(bytes) = tokio::fs::read(first_frame).await else { continue };
            match provider.embed_image(&bytes).await {
                Ok(vector) => {
                    if let Some(clip) = persisted.iter_mut().find(|c| c.id == *clip_id) {
                        clip.image_embedding = Some(crate::capabilities::serialize_vector(&vector));
                        clip.image_embedding_model = Some(provider.model_name().to_string());
                        folder_store.update_clip(clip)?;
                    }
                }
                Err(e) => warn!(clip = clip_id.get(), error = %e, "image embedding failed, non-fatal"),
            }
        }
    }

    video.index_status = IndexStatus::VectorsDone;
    folder_store.update_video(video)?;

    if let Some(global) = global_store {
        if !config.skip_sync {
            SyncEngine::new(folder_store, global, folder_path).sync_incremental()?;
        }
    }

    Ok(())
}

/// An empty scene-detection result with positive duration falls back to
/// uniform sampling at a fixed interval (spec §4.2 tie-break/edge cases).
const UNIFORM_FALLBACK_INTERVAL_SECS: f64 = 10.0;

fn uniform_interval_fallback(duration: f64) -> Vec<videx_media::Segment> {
    if duration <= 0.0 {
        return vec![videx_media::Segment { start: 0.0, end: duration.max(0.0) }];
    }
    let mut segments = Vec::new();
    let mut cursor = 0.0;
    while cursor < duration {
        let end = (cursor + UNIFORM_FALLBACK_INTERVAL_SECS).min(duration);
        segments.push(videx_media::Segment { start: cursor, end });
        cursor += UNIFORM_FALLBACK_INTERVAL_SECS;
    }
    segments
}

async fn run_stt_layer(
    video: &mut Video,
    video_path: &str,
    config: &IndexerConfig,
    folder_store: &FolderStore,
    engines: &Engines<'_>,
    result: &mut IndexResult,
) -> IndexerResult<()> {
    if engines.stt_unavailable() {
        video.index_status = IndexStatus::SttDone;
        folder_store.update_video(video)?;
        result.stt_skipped_no_audio = true;
        return Ok(());
    }

    let wav_path = format!("{}/video_{}.wav", config.tmp_dir(), video.id.get());
    let wav_existed = tokio::fs::try_exists(&wav_path).await.unwrap_or(false);
    if !wav_existed {
        tokio::fs::create_dir_all(config.tmp_dir()).await.ok();
        let extractor = AudioExtractor::new(AudioExtractorConfig::default());
        extractor.extract(video_path, &wav_path).await?;
    }

    let stt_result = run_stt_pipeline(video, &wav_path, folder_store, engines, config).await;

    if !wav_existed {
        tokio::fs::remove_file(&wav_path).await.ok();
    }

    match stt_result {
        Ok(stt_skipped) => {
            result.stt_skipped_no_audio = stt_skipped;
            video.index_status = IndexStatus::SttDone;
            folder_store.update_video(video)?;
        }
        Err(e) => {
            warn!(video = video.id.get(), error = %e, "STT failed, non-fatal, advancing anyway");
            video.index_status = IndexStatus::SttDone;
            folder_store.update_video(video)?;
        }
    }

    Ok(())
}

async fn run_stt_pipeline(
    video: &mut Video,
    wav_path: &str,
    folder_store: &FolderStore,
    engines: &Engines<'_>,
    config: &IndexerConfig,
) -> IndexerResult<bool> {
    use videx_media::silence_probe::{SilenceProbe, SilenceProbeConfig};

    let clips = folder_store.list_clips_for_video(video.id)?;
    let scene_starts: Vec<f64> = clips.iter().map(|c| c.start_time).collect();

    let high = engines.stt_high_accuracy.filter(|e| e.is_available());
    let fast = engines.stt_fast.filter(|e| e.is_available());
    let selected = videx_stt::select_engine(config.stt_preference, high, fast)?;

    let lid = if let Some(outcome) = language_id::vote_across_windows(selected, wav_path, &scene_starts, 15.0).await? {
        outcome
    } else {
        let probe = SilenceProbe::new(SilenceProbeConfig::default());
        language_id::speech_probe_fallback(selected, &probe, wav_path).await?
    };

    let language = match lid {
        LidOutcome::Detected(lang) => lang,
        LidOutcome::SilentSkip => return Ok(true),
    };

    let raw_segments = selected.transcribe(wav_path, None, Some(&language)).await?;
    let stripped = cleanup::strip_decorators(raw_segments);
    let merged = cleanup::merge_cjk_fragments(&language, stripped);

    if merged.is_empty() {
        return Ok(true);
    }

    for clip in &clips {
        let scene = videx_media::Segment { start: clip.start_time, end: clip.end_time };
        if let Some(text) = clip_mapping::transcript_for_clip(&merged, &scene) {
            let mut updated = clip.clone();
            updated.transcript = Some(text);
            folder_store.update_clip(&updated)?;
        }
    }

    let srt_text = subtitle::render_srt(&merged);
    let primary_path = std::path::Path::new(&video.path).with_extension("srt");
    let fallback_dir = std::path::Path::new(&config.srt_fallback_dir());
    let write_result = subtitle::write_subtitle(&video.path, &primary_path, fallback_dir, &srt_text).await?;
    video.subtitle_path = Some(write_result.path.to_string_lossy().to_string());

    Ok(false)
}

async fn run_descriptions_layer(
    video: &mut Video,
    config: &IndexerConfig,
    folder_store: &FolderStore,
    engines: &Engines<'_>,
    cancel: &dyn CancellationToken,
    result: &mut IndexResult,
) -> IndexerResult<()> {
    if !engines.remote_vision_available() && engines.local_vision.is_none() {
        video.index_status = IndexStatus::Completed;
        folder_store.update_video(video)?;
        return Ok(());
    }

    let clips = folder_store.list_clips_for_video(video.id)?;
    let last_processed = video.last_processed_clip.unwrap_or(0);
    let pending: Vec<_> = clips.into_iter().filter(|c| c.id.get() > last_processed).collect();

    let mut batch = Vec::new();
    for clip in pending {
        if cancel.is_cancelled() {
            flush_batch(folder_store, video, &batch)?;
            return Err(IndexerError::Cancelled);
        }

        let Some(local_provider) = engines.cloud_vision.or(engines.local_vision) else {
            break;
        };

        if engines.cloud_vision.is_some() {
            if let Some(limiter) = engines.rate_limiter {
                if limiter.wait_for_permission().await.is_err() {
                    break;
                }
            }
        }

        let Some(thumb) = &clip.thumbnail_path else { continue };
        let Ok(bytes) = tokio::fs::read(thumb).await else { continue };

        match local_provider.analyze(&bytes).await {
            Ok(remote_fields) => {
                if let Some(limiter) = engines.rate_limiter {
                    limiter.report_success().await;
                }
                let local_fields = vision_fields_from_clip(&clip);
                let merged = merge_fields(local_fields, remote_fields);
                let mut updated = clip.clone();
                apply_vision_fields(&mut updated, &merged, local_provider.provider().as_str());
                batch.push(updated);
                result.clips_analyzed += 1;
            }
            Err(videx_vision::VisionError::RateLimited) => {
                if let Some(limiter) = engines.rate_limiter {
                    limiter.report_rate_limit().await;
                }
                break;
            }
            Err(e) => {
                warn!(clip = clip.id.get(), error = %e, "vision call failed, non-fatal");
            }
        }

        if batch.len() >= config.vision_batch_size {
            flush_batch(folder_store, video, &batch)?;
            batch.clear();
        }
    }
    flush_batch(folder_store, video, &batch)?;

    if let Some(embedder) = engines.text_embedding {
        let clips = folder_store.list_clips_for_video(video.id)?;
        let (embeddable, texts): (Vec<_>, Vec<String>) = clips
            .iter()
            .filter_map(|c| {
                let text = videx_vision::compose_embedding_text(&vision_fields_from_clip(c));
                if text.is_empty() { None } else { Some((c, text)) }
            })
            .unzip();
        let coordinator = EmbeddingCoordinator::new(embedder);
        let embedded = coordinator.embed_all(&texts).await;
        for (clip, vector) in embeddable.into_iter().zip(embedded.into_iter()) {
            if let Some(v) = vector {
                let mut updated = clip.clone();
                updated.text_embedding = Some(v.bytes);
                updated.text_embedding_model = Some(v.model);
                folder_store.update_clip(&updated)?;
                result.clips_embedded += 1;
            }
        }
    }

    video.index_status = IndexStatus::Completed;
    folder_store.update_video(video)?;
    Ok(())
}

fn flush_batch(folder_store: &FolderStore, video: &mut Video, batch: &[videx_models::Clip]) -> IndexerResult<()> {
    if batch.is_empty() {
        return Ok(());
    }
    let max_id = batch.iter().map(|c| c.id.get()).max();
    for clip in batch {
        folder_store.update_clip(clip)?;
    }
    if let Some(max_id) = max_id {
        video.last_processed_clip = Some(video.last_processed_clip.map_or(max_id, |cur| cur.max(max_id)));
        folder_store.update_video(video)?;
    }
    Ok(())
}

fn vision_fields_from_clip(clip: &videx_models::Clip) -> VisionFields {
    VisionFields {
        scene: clip.scene.clone(),
        subjects: clip.subjects.clone(),
        actions: clip.actions.clone(),
        objects: clip.objects.clone(),
        mood: clip.mood.clone(),
        shot_type: clip.shot_type.clone(),
        lighting: clip.lighting.clone(),
        colors: clip.colors.clone(),
        description: clip.description.clone(),
    }
}

fn apply_vision_fields(clip: &mut videx_models::Clip, fields: &VisionFields, provider: &str) {
    clip.scene = fields.scene.clone();
    clip.subjects = fields.subjects.clone();
    clip.actions = fields.actions.clone();
    clip.objects = fields.objects.clone();
    clip.mood = fields.mood.clone();
    clip.shot_type = fields.shot_type.clone();
    clip.lighting = fields.lighting.clone();
    clip.colors = fields.colors.clone();
    clip.description = fields.description.clone();
    clip.vision_provider = Some(provider.to_string());
}

#[cfg(test)]
mod tests {
    use super::*;
    use videx_models::{Folder, FolderId};

    fn open_temp() -> (tempfile::TempDir, FolderStore) {
        let dir = tempfile::tempdir().unwrap();
        let folder = Folder::new(dir.path().to_str().unwrap());
        let store = FolderStore::open(dir.path().join("index.sqlite").to_str().unwrap(), &folder).unwrap();
        (dir, store)
    }

    async fn write_video_file(dir: &tempfile::TempDir, name: &str, content: &[u8]) -> String {
        let path = dir.path().join(name);
        tokio::fs::write(&path, content).await.unwrap();
        path.to_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn unchanged_completed_video_is_a_fast_noop() {
        let (dir, store) = open_temp();
        let video_path = write_video_file(&dir, "a.mp4", b"hello world").await;
        let metadata = tokio::fs::metadata(&video_path).await.unwrap();
        let modified_at: chrono::DateTime<Utc> = metadata.modified().unwrap().into();

        let mut video = Video::new_pending(FolderId::new(1), &video_path, "a.mp4", metadata.len(), modified_at);
        video.index_status = IndexStatus::Completed;
        video.file_hash = Some(quick_hash(&video_path).await.unwrap());
        let id = store.insert_video(&video).unwrap();
        video.id = id;

        let mut result = IndexResult::default();
        let guard = run_pre_pipeline_guards(&mut video, &store, metadata.len(), modified_at, "a.mp4", &video_path, &mut result)
            .await
            .unwrap();
        assert!(guard.is_some());
        assert_eq!(video.index_status, IndexStatus::Completed);
    }

    #[tokio::test]
    async fn completed_video_with_same_content_different_mtime_updates_in_place() {
        let (dir, store) = open_temp();
        let video_path = write_video_file(&dir, "a.mp4", b"hello world").await;
        let stored_hash = quick_hash(&video_path).await.unwrap();

        let mut video = Video::new_pending(FolderId::new(1), &video_path, "a.mp4", 1, Utc::now());
        video.index_status = IndexStatus::Completed;
        video.file_hash = Some(stored_hash);
        let id = store.insert_video(&video).unwrap();
        video.id = id;

        let metadata = tokio::fs::metadata(&video_path).await.unwrap();
        let new_modified_at: chrono::DateTime<Utc> = metadata.modified().unwrap().into();
        let mut result = IndexResult::default();
        let guard = run_pre_pipeline_guards(&mut video, &store, metadata.len(), new_modified_at, "a.mp4", &video_path, &mut result)
            .await
            .unwrap();
        assert!(guard.is_some());
        assert_eq!(video.size_bytes, metadata.len());
        assert_eq!(video.index_status, IndexStatus::Completed);
    }

    #[tokio::test]
    async fn completed_video_with_changed_content_resets_to_pending() {
        let (dir, store) = open_temp();
        let video_path = write_video_file(&dir, "a.mp4", b"hello world").await;

        let mut video = Video::new_pending(FolderId::new(1), &video_path, "a.mp4", 1, Utc::now());
        video.index_status = IndexStatus::Completed;
        video.file_hash = Some("stale-hash-that-will-not-match".to_string());
        let id = store.insert_video(&video).unwrap();
        video.id = id;

        tokio::fs::write(&video_path, b"totally different content now").await.unwrap();
        let metadata = tokio::fs::metadata(&video_path).await.unwrap();
        let new_modified_at: chrono::DateTime<Utc> = metadata.modified().unwrap().into();

        let mut result = IndexResult::default();
        let guard = run_pre_pipeline_guards(&mut video, &store, metadata.len(), new_modified_at, "a.mp4", &video_path, &mut result)
            .await
            .unwrap();
        assert!(guard.is_none());
        assert_eq!(video.index_status, IndexStatus::Pending);
        assert_eq!(video.index_layer, IndexLayer::Metadata);
        assert!(video.file_hash.is_none());
    }

    #[tokio::test]
    async fn orphan_with_matching_hash_is_restored_in_place_and_requires_force_sync() {
        let (dir, store) = open_temp();
        let video_path = write_video_file(&dir, "a.mp4", b"orphan content").await;
        let hash = quick_hash(&video_path).await.unwrap();

        let mut video = Video::new_pending(FolderId::new(1), &video_path, "a.mp4", 1, Utc::now());
        video.index_status = IndexStatus::Orphaned;
        video.orphaned_at = Some(Utc::now());
        video.file_hash = Some(hash);
        let id = store.insert_video(&video).unwrap();
        video.id = id;

        let metadata = tokio::fs::metadata(&video_path).await.unwrap();
        let modified_at: chrono::DateTime<Utc> = metadata.modified().unwrap().into();
        let mut result = IndexResult::default();
        let guard = run_pre_pipeline_guards(&mut video, &store, metadata.len(), modified_at, "a.mp4", &video_path, &mut result)
            .await
            .unwrap();
        assert!(guard.is_some());
        assert_eq!(video.index_status, IndexStatus::Completed);
        assert!(video.orphaned_at.is_none());
        assert!(result.requires_force_sync);
    }

    #[tokio::test]
    async fn pending_video_with_absent_hash_and_no_orphan_match_just_computes_hash() {
        let (dir, store) = open_temp();
        let video_path = write_video_file(&dir, "a.mp4", b"fresh content").await;

        let mut video = Video::new_pending(FolderId::new(1), &video_path, "a.mp4", 1, Utc::now());
        let id = store.insert_video(&video).unwrap();
        video.id = id;

        let metadata = tokio::fs::metadata(&video_path).await.unwrap();
        let modified_at: chrono::DateTime<Utc> = metadata.modified().unwrap().into();
        let mut result = IndexResult::default();
        let guard = run_pre_pipeline_guards(&mut video, &store, metadata.len(), modified_at, "a.mp4", &video_path, &mut result)
            .await
            .unwrap();
        assert!(guard.is_none());
        assert!(video.file_hash.is_some());
    }
}
