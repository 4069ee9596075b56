use std::path::Path;
use std::time::Duration;

/// Knobs shared by the dispatcher and the startup sweep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncSettings {
    /// Events for a path closer together than this are dropped, and accepted
    /// writes wait this long before syncing.
    pub debounce: Duration,
    /// Extension (without the dot) of tracked documents.
    pub extension: String,
    /// Walk subdirectories during the startup sweep.
    pub recursive: bool,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            debounce: Duration::from_secs(2),
            extension: "md".to_string(),
            recursive: false,
        }
    }
}

impl SyncSettings {
    /// Whether `path` names a tracked document.
    ///
    /// Hidden files (editor swap and lock files) are never tracked.
    pub fn tracks(&self, path: &Path) -> bool {
        let hidden = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_none_or(|name| name.starts_with('.'));

        !hidden
            && path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case(&self.extension))
    }
}
