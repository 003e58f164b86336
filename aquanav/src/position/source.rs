//! Platform location sources.
//!
//! A [`LocationSource`] is the seam between the engine and whatever the host
//! platform offers for geolocation. It is dyn-compatible (futures are boxed)
//! so hosts can plug in their own implementation behind an `Arc`.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::debug;

use super::sample::RawFix;
use super::PositionError;

/// Boxed future type for dyn-compatible async methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Accuracy hint passed to the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccuracyProfile {
    /// Cell/wifi grade, cheap on battery.
    Balanced,
    /// GPS grade.
    High,
    /// Best available, for turn-by-turn navigation.
    #[default]
    Navigation,
}

impl AccuracyProfile {
    /// Parses the config-file spelling.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "balanced" => Some(Self::Balanced),
            "high" => Some(Self::High),
            "navigation" => Some(Self::Navigation),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Balanced => "balanced",
            Self::High => "high",
            Self::Navigation => "navigation",
        }
    }
}

/// Outcome of the foreground location permission prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStatus {
    Granted,
    Denied,
}

/// Platform geolocation API.
pub trait LocationSource: Send + Sync + 'static {
    /// Prompts for foreground location permission. May wait indefinitely
    /// on user action.
    fn request_permission(&self) -> BoxFuture<'_, PermissionStatus>;

    /// Acquires a single fix.
    fn current_fix(&self, profile: AccuracyProfile) -> BoxFuture<'_, Result<RawFix, PositionError>>;

    /// Opens a continuous stream of fixes. The stream ends when the receiver
    /// is dropped or the platform stops delivering.
    fn watch(
        &self,
        profile: AccuracyProfile,
    ) -> Result<mpsc::UnboundedReceiver<RawFix>, PositionError>;
}

// =============================================================================
// Manual source
// =============================================================================

#[derive(Debug)]
struct ManualShared {
    permission: PermissionStatus,
    initial_fix: Option<RawFix>,
    watchers: Vec<mpsc::UnboundedSender<RawFix>>,
}

/// A location source driven by the host through a [`ManualController`].
///
/// Used when the platform pushes fixes into the engine (e.g. from a mobile
/// host over FFI) and by tests that need precise control over timing.
#[derive(Debug, Clone)]
pub struct ManualSource {
    shared: Arc<Mutex<ManualShared>>,
}

/// Host-side handle for a [`ManualSource`].
#[derive(Debug, Clone)]
pub struct ManualController {
    shared: Arc<Mutex<ManualShared>>,
}

impl ManualSource {
    /// Creates a source with permission granted and no initial fix.
    pub fn new() -> (Self, ManualController) {
        let shared = Arc::new(Mutex::new(ManualShared {
            permission: PermissionStatus::Granted,
            initial_fix: None,
            watchers: Vec::new(),
        }));
        (
            Self {
                shared: Arc::clone(&shared),
            },
            ManualController { shared },
        )
    }
}

impl ManualController {
    pub fn set_permission(&self, status: PermissionStatus) {
        self.shared.lock().permission = status;
    }

    /// Sets the fix returned by `current_fix`.
    pub fn set_initial_fix(&self, fix: RawFix) {
        self.shared.lock().initial_fix = Some(fix);
    }

    /// Pushes a fix to every open watch stream.
    ///
    /// Returns the number of streams that received it.
    pub fn push(&self, fix: RawFix) -> usize {
        let mut shared = self.shared.lock();
        shared.watchers.retain(|tx| tx.send(fix).is_ok());
        shared.watchers.len()
    }

    /// Number of watch streams still open.
    pub fn active_watchers(&self) -> usize {
        let mut shared = self.shared.lock();
        shared.watchers.retain(|tx| !tx.is_closed());
        shared.watchers.len()
    }
}

impl LocationSource for ManualSource {
    fn request_permission(&self) -> BoxFuture<'_, PermissionStatus> {
        let status = self.shared.lock().permission;
        Box::pin(async move { status })
    }

    fn current_fix(&self, _profile: AccuracyProfile) -> BoxFuture<'_, Result<RawFix, PositionError>> {
        let fix = self.shared.lock().initial_fix;
        Box::pin(async move {
            fix.ok_or_else(|| PositionError::FixUnavailable("no fix reported".to_string()))
        })
    }

    fn watch(
        &self,
        _profile: AccuracyProfile,
    ) -> Result<mpsc::UnboundedReceiver<RawFix>, PositionError> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.shared.lock().watchers.push(tx);
        Ok(rx)
    }
}

// =============================================================================
// Replay source
// =============================================================================

/// Replays a recorded track at a fixed interval.
///
/// The first fix answers `current_fix`; the watch stream then delivers the
/// remaining fixes, one per interval.
#[derive(Debug, Clone)]
pub struct ReplaySource {
    fixes: Arc<Vec<RawFix>>,
    interval: Duration,
}

impl ReplaySource {
    pub fn new(fixes: Vec<RawFix>, interval: Duration) -> Self {
        Self {
            fixes: Arc::new(fixes),
            interval,
        }
    }

    /// Loads a JSON array of fixes.
    pub fn from_json_file(path: &Path, interval: Duration) -> Result<Self, PositionError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| PositionError::InvalidTrack(format!("{}: {}", path.display(), e)))?;
        let fixes: Vec<RawFix> = serde_json::from_str(&contents)
            .map_err(|e| PositionError::InvalidTrack(format!("{}: {}", path.display(), e)))?;
        if fixes.is_empty() {
            return Err(PositionError::InvalidTrack(format!(
                "{}: track has no fixes",
                path.display()
            )));
        }
        Ok(Self::new(fixes, interval))
    }

    pub fn len(&self) -> usize {
        self.fixes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fixes.is_empty()
    }
}

impl LocationSource for ReplaySource {
    fn request_permission(&self) -> BoxFuture<'_, PermissionStatus> {
        Box::pin(async { PermissionStatus::Granted })
    }

    fn current_fix(&self, _profile: AccuracyProfile) -> BoxFuture<'_, Result<RawFix, PositionError>> {
        let first = self.fixes.first().copied();
        Box::pin(async move {
            first.ok_or_else(|| PositionError::FixUnavailable("empty track".to_string()))
        })
    }

    fn watch(
        &self,
        _profile: AccuracyProfile,
    ) -> Result<mpsc::UnboundedReceiver<RawFix>, PositionError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let fixes = Arc::clone(&self.fixes);
        let interval = self.interval;

        tokio::spawn(async move {
            for fix in fixes.iter().skip(1) {
                tokio::time::sleep(interval).await;
                if tx.send(*fix).is_err() {
                    debug!("Replay watcher dropped, stopping replay");
                    return;
                }
            }
            debug!(fixes = fixes.len(), "Replay finished");
        });

        Ok(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_accuracy_profile_parse() {
        assert_eq!(AccuracyProfile::parse("High"), Some(AccuracyProfile::High));
        assert_eq!(
            AccuracyProfile::parse(" navigation "),
            Some(AccuracyProfile::Navigation)
        );
        assert_eq!(AccuracyProfile::parse("precise"), None);
    }

    #[tokio::test]
    async fn test_manual_source_permission_and_fix() {
        let (source, controller) = ManualSource::new();
        assert_eq!(source.request_permission().await, PermissionStatus::Granted);
        assert!(source.current_fix(AccuracyProfile::High).await.is_err());

        controller.set_permission(PermissionStatus::Denied);
        controller.set_initial_fix(RawFix::at(-6.2, 106.8));
        assert_eq!(source.request_permission().await, PermissionStatus::Denied);
        assert!(source.current_fix(AccuracyProfile::High).await.is_ok());
    }

    #[tokio::test]
    async fn test_manual_source_push_reaches_watchers() {
        let (source, controller) = ManualSource::new();
        let mut rx = source.watch(AccuracyProfile::Navigation).unwrap();

        assert_eq!(controller.push(RawFix::at(1.0, 2.0)), 1);
        let fix = rx.recv().await.unwrap();
        assert_eq!(fix.latitude, 1.0);

        drop(rx);
        assert_eq!(controller.push(RawFix::at(1.0, 2.0)), 0);
        assert_eq!(controller.active_watchers(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_replay_source_skips_first_fix_in_stream() {
        let fixes = vec![
            RawFix::at(1.0, 1.0),
            RawFix::at(2.0, 2.0),
            RawFix::at(3.0, 3.0),
        ];
        let source = ReplaySource::new(fixes, Duration::from_secs(1));

        let first = source.current_fix(AccuracyProfile::High).await.unwrap();
        assert_eq!(first.latitude, 1.0);

        let mut rx = source.watch(AccuracyProfile::High).unwrap();
        assert_eq!(rx.recv().await.unwrap().latitude, 2.0);
        assert_eq!(rx.recv().await.unwrap().latitude, 3.0);
        assert!(rx.recv().await.is_none());
    }

    #[test]
    fn test_replay_from_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"latitude": -6.2088, "longitude": 106.8456, "timestamp": "2024-03-01T08:00:00Z"}}]"#
        )
        .unwrap();

        let source = ReplaySource::from_json_file(file.path(), Duration::from_secs(1)).unwrap();
        assert_eq!(source.len(), 1);
    }

    #[test]
    fn test_replay_rejects_empty_track() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "[]").unwrap();

        let err = ReplaySource::from_json_file(file.path(), Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, PositionError::InvalidTrack(_)));
    }
}
