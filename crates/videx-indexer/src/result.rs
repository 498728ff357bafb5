use videx_store::SyncResult;

/// Outcome of one `index_video` call (spec §4.9).
#[derive(Debug, Clone, Default)]
pub struct IndexResult {
    pub clips_created: usize,
    pub clips_analyzed: usize,
    pub clips_embedded: usize,
    pub subtitle_path: Option<String>,
    pub sync_result: Option<SyncResult>,
    pub requires_force_sync: bool,
    pub stt_skipped_no_audio: bool,
}
