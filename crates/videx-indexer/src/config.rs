use videx_models::IndexLayer;

/// Per-call indexing configuration (spec §4.9, §6).
#[derive(Debug, Clone)]
pub struct IndexerConfig {
    pub skip_layers: Vec<IndexLayer>,
    pub skip_sync: bool,
    pub vision_batch_size: usize,
    pub retention_days: i64,
    pub stt_preference: videx_stt::EnginePreference,
    /// `<folderPath>/.clip-index` by convention; callers may override for tests.
    pub folder_index_dir: String,
    /// App-support directory for the subtitle fallback and search store.
    pub app_support_dir: String,
}

impl IndexerConfig {
    pub fn new(folder_path: &str, app_support_dir: &str) -> Self {
        Self {
            skip_layers: Vec::new(),
            skip_sync: false,
            vision_batch_size: 10,
            retention_days: 30,
            stt_preference: videx_stt::EnginePreference::Auto,
            folder_index_dir: format!("{folder_path}/.clip-index"),
            app_support_dir: app_support_dir.to_string(),
        }
    }

    pub fn thumbnails_dir(&self) -> String {
        format!("{}/thumbnails", self.folder_index_dir)
    }

    pub fn tmp_dir(&self) -> String {
        format!("{}/tmp", self.folder_index_dir)
    }

    pub fn srt_fallback_dir(&self) -> String {
        format!("{}/srt", self.app_support_dir)
    }

    pub fn layer_is_skipped(&self, layer: IndexLayer) -> bool {
        self.skip_layers.contains(&layer)
    }

    /// Builds a config from environment variables, falling back to the same
    /// defaults as [`IndexerConfig::new`] for anything unset.
    pub fn from_env(folder_path: &str) -> Self {
        let app_support_dir = std::env::var("VIDEX_APP_SUPPORT_DIR")
            .unwrap_or_else(|_| "/tmp/videx".to_string());
        let mut config = Self::new(folder_path, &app_support_dir);

        if let Some(size) = std::env::var("VIDEX_VISION_BATCH_SIZE")
            .ok()
            .and_then(|s| s.parse().ok())
        {
            config.vision_batch_size = size;
        }
        if let Some(days) = std::env::var("VIDEX_RETENTION_DAYS")
            .ok()
            .and_then(|s| s.parse().ok())
        {
            config.retention_days = days;
        }
        if std::env::var("VIDEX_SKIP_SYNC").ok().as_deref() == Some("1") {
            config.skip_sync = true;
        }
        config
    }
}
