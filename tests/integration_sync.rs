use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tempfile::TempDir;
use tokio::sync::Semaphore;
use tokio_test::{assert_pending, assert_ready, task};

use caltray::alerts::NotificationScheduler;
use caltray::calendar::CalendarSource;
use caltray::error::{AppError, AppResult};
use caltray::notify::Notifier;
use caltray::storage::{BlobStore, FileStore};
use caltray::tray::{Launcher, TrayItem, TrayRenderer};
use caltray::{
    AppState, CalendarEvent, Chime, Effects, EventStore, EventTime, NotifyPolicy, Reconciler,
    SoundClip,
};

/// Calendar source that replays a scripted list of fetch results.
struct ScriptedSource {
    responses: Mutex<VecDeque<AppResult<Vec<CalendarEvent>>>>,
}

impl ScriptedSource {
    fn new(responses: Vec<AppResult<Vec<CalendarEvent>>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
        }
    }
}

#[async_trait]
impl CalendarSource for ScriptedSource {
    async fn fetch_events(
        &self,
        _time_min: DateTime<Utc>,
        _max_results: u32,
    ) -> AppResult<Vec<CalendarEvent>> {
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}

/// Calendar source that parks every fetch until the test opens the gate.
struct GatedSource {
    gate: Arc<Semaphore>,
    events: Vec<CalendarEvent>,
}

#[async_trait]
impl CalendarSource for GatedSource {
    async fn fetch_events(
        &self,
        _time_min: DateTime<Utc>,
        _max_results: u32,
    ) -> AppResult<Vec<CalendarEvent>> {
        let _permit = self
            .gate
            .acquire()
            .await
            .map_err(|_| AppError::fetch("gate closed"))?;
        Ok(self.events.clone())
    }
}

#[derive(Default)]
struct RecordingNotifier {
    messages: Mutex<Vec<(String, String)>>,
}

impl RecordingNotifier {
    fn titles(&self) -> Vec<String> {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .map(|(title, _)| title.clone())
            .collect()
    }

    fn bodies_for(&self, title: &str) -> Vec<String> {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .filter(|(t, _)| t == title)
            .map(|(_, body)| body.clone())
            .collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, title: &str, body: &str) {
        self.messages
            .lock()
            .unwrap()
            .push((title.to_string(), body.to_string()));
    }
}

#[derive(Default)]
struct RecordingTray {
    snapshots: Mutex<Vec<Vec<TrayItem>>>,
}

impl RecordingTray {
    fn latest(&self) -> Option<Vec<TrayItem>> {
        self.snapshots.lock().unwrap().last().cloned()
    }
}

impl TrayRenderer for RecordingTray {
    fn render(&self, items: &[TrayItem]) {
        self.snapshots.lock().unwrap().push(items.to_vec());
    }
}

#[derive(Default)]
struct RecordingChime {
    clips: Mutex<Vec<SoundClip>>,
}

impl Chime for RecordingChime {
    fn play(&self, clip: SoundClip) {
        self.clips.lock().unwrap().push(clip);
    }
}

#[derive(Default)]
struct RecordingLauncher {
    urls: Mutex<Vec<String>>,
}

impl Launcher for RecordingLauncher {
    fn open(&self, url: &str) {
        self.urls.lock().unwrap().push(url.to_string());
    }
}

/// In-memory blob store for tests that do not care about real files.
#[derive(Default)]
struct MemoryBlobs {
    blobs: Mutex<std::collections::HashMap<String, Vec<u8>>>,
}

impl MemoryBlobs {
    fn snapshot(&self) -> std::collections::HashMap<String, Vec<u8>> {
        self.blobs.lock().unwrap().clone()
    }
}

impl BlobStore for MemoryBlobs {
    fn load(&self, key: &str) -> AppResult<Option<Vec<u8>>> {
        Ok(self.blobs.lock().unwrap().get(key).cloned())
    }

    fn save(&self, key: &str, bytes: &[u8]) -> AppResult<()> {
        self.blobs
            .lock()
            .unwrap()
            .insert(key.to_string(), bytes.to_vec());
        Ok(())
    }
}

struct Harness {
    state: Arc<AppState>,
    notifier: Arc<RecordingNotifier>,
    tray: Arc<RecordingTray>,
    chime: Arc<RecordingChime>,
    launcher: Arc<RecordingLauncher>,
    blobs: Arc<MemoryBlobs>,
}

fn build_harness(policy: NotifyPolicy) -> Harness {
    let notifier = Arc::new(RecordingNotifier::default());
    let tray = Arc::new(RecordingTray::default());
    let chime = Arc::new(RecordingChime::default());
    let launcher = Arc::new(RecordingLauncher::default());
    let blobs = Arc::new(MemoryBlobs::default());

    let effects = Effects {
        notifier: notifier.clone(),
        chime: chime.clone(),
        tray: tray.clone(),
        blobs: blobs.clone(),
        launcher: launcher.clone(),
    };
    let state = Arc::new(AppState::new(
        EventStore::new(),
        NotificationScheduler::new(policy),
        effects,
    ));

    Harness {
        state,
        notifier,
        tray,
        chime,
        launcher,
        blobs,
    }
}

fn reconciler_for(harness: &Harness, responses: Vec<AppResult<Vec<CalendarEvent>>>) -> Reconciler {
    Reconciler::new(Arc::new(ScriptedSource::new(responses)), harness.state.clone(), 10)
}

fn test_event(id: &str, etag: &str, minutes_from_now: i64) -> CalendarEvent {
    let now = Utc::now();
    CalendarEvent {
        id: id.to_string(),
        etag: etag.to_string(),
        summary: Some(format!("Meeting {}", id)),
        location: None,
        description: None,
        start: EventTime::timed(now + Duration::minutes(minutes_from_now)),
        end: EventTime::timed(now + Duration::minutes(minutes_from_now + 30)),
        html_link: Some(format!("https://calendar.google.com/event?eid={}", id)),
    }
}

#[tokio::test]
async fn test_first_cycle_populates_store_and_tray() {
    let soon = test_event("a", "a1", 3);
    let later = test_event("b", "b1", 30);
    let harness = build_harness(NotifyPolicy::PerMilestone);
    let reconciler = reconciler_for(&harness, vec![Ok(vec![later.clone(), soon.clone()])]);

    let outcome = reconciler.run_cycle().await;

    assert!(outcome.success);
    assert_eq!(outcome.added, 2);
    assert_eq!(harness.state.core.lock().unwrap().store.len(), 2);

    // One batch announcement naming both events.
    let batches = harness.notifier.bodies_for("New events fetched");
    assert_eq!(batches.len(), 1);
    assert!(batches[0].contains("Meeting a") && batches[0].contains("Meeting b"));

    // The event three minutes out gets an immediate milestone alert; the
    // one half an hour out does not.
    let milestone_titles: Vec<String> = harness
        .notifier
        .titles()
        .into_iter()
        .filter(|t| t.contains("Event starting"))
        .collect();
    assert_eq!(milestone_titles.len(), 1);
    assert_eq!(outcome.alerts_fired, 1);
    assert_eq!(harness.chime.clips.lock().unwrap().as_slice(), &[SoundClip::Upcoming]);

    // Tray menu lists both, soonest first.
    let items = harness.tray.latest().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].key, "a1");
    assert_eq!(items[1].key, "b1");
}

#[tokio::test]
async fn test_revised_event_is_updated_not_removed() {
    let original = test_event("a", "e1", 3);
    let mut revised = test_event("a", "e2", 10);
    revised.summary = Some("Meeting a (moved)".to_string());

    let harness = build_harness(NotifyPolicy::PerMilestone);
    let reconciler = reconciler_for(
        &harness,
        vec![Ok(vec![original.clone()]), Ok(vec![revised.clone()])],
    );

    let first = reconciler.run_cycle().await;
    assert_eq!(first.added, 1);
    assert_eq!(first.alerts_fired, 1);

    let second = reconciler.run_cycle().await;
    assert_eq!(second.added, 0);
    assert_eq!(second.removed, 0);
    assert_eq!(second.updated, 1);
    assert!(second.changed);

    // A rescheduled event is an update, never a removal.
    assert!(!harness.notifier.titles().iter().any(|t| t == "Event removed"));

    // The cache and tray hold the revision.
    let items = harness.tray.latest().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].key, "e2");
    assert!(items[0].title.contains("Meeting a (moved)"));
}

#[tokio::test]
async fn test_failed_fetch_preserves_cached_events() {
    let event = test_event("a", "e1", 30);
    let harness = build_harness(NotifyPolicy::PerMilestone);
    let reconciler = reconciler_for(
        &harness,
        vec![Ok(vec![event.clone()]), Err(AppError::fetch("connection reset"))],
    );

    assert!(reconciler.run_cycle().await.success);
    let persisted_before = harness.blobs.snapshot();
    let renders_before = harness.tray.snapshots.lock().unwrap().len();

    let failed = reconciler.run_cycle().await;

    assert!(!failed.success);
    assert!(failed.error_message.unwrap().contains("connection reset"));
    let errors = harness.notifier.bodies_for("Error while fetching events");
    assert_eq!(errors.len(), 1);

    // Cache, persisted snapshot and tray are all untouched.
    assert_eq!(harness.state.core.lock().unwrap().store.len(), 1);
    assert_eq!(harness.blobs.snapshot(), persisted_before);
    assert_eq!(harness.tray.snapshots.lock().unwrap().len(), renders_before);
}

#[test]
fn test_tick_fires_while_fetch_is_parked() {
    let harness = build_harness(NotifyPolicy::PerMilestone);
    {
        let mut core = harness.state.core.lock().unwrap();
        core.store = EventStore::from_events(vec![test_event("a", "e1", 3)]);
    }

    let gate = Arc::new(Semaphore::new(0));
    let source = Arc::new(GatedSource {
        gate: gate.clone(),
        events: vec![test_event("a", "e1", 3), test_event("b", "e2", 60)],
    });
    let reconciler = Reconciler::new(source, harness.state.clone(), 10);

    // Drive the cycle until it parks inside the fetch.
    let mut cycle = task::spawn(reconciler.run_cycle());
    assert_pending!(cycle.poll());

    // The pending fetch holds no lock, so the scheduler can still tick
    // and deliver the alert for the event three minutes out.
    {
        let mut core = harness
            .state
            .core
            .try_lock()
            .expect("core lock is free during a pending fetch");
        let core = &mut *core;
        let fired = core.scheduler.run_tick(
            &core.store,
            Utc::now(),
            harness.state.effects.notifier.as_ref(),
            harness.state.effects.chime.as_ref(),
        );
        assert_eq!(fired, 1);
    }
    assert!(harness
        .notifier
        .titles()
        .iter()
        .any(|t| t.contains("Event starting in")));
    assert_eq!(
        harness.chime.clips.lock().unwrap().as_slice(),
        &[SoundClip::Upcoming]
    );

    // Opening the gate lets the cycle finish normally.
    gate.add_permits(1);
    assert!(cycle.is_woken());
    let outcome = assert_ready!(cycle.poll());
    assert!(outcome.success);
    assert_eq!(outcome.added, 1);
    // The mid-fetch tick already covered the near event, so the post-merge
    // tick has nothing left to announce.
    assert_eq!(outcome.alerts_fired, 0);
    assert_eq!(harness.state.core.lock().unwrap().store.len(), 2);
}

#[tokio::test]
async fn test_removed_event_is_announced_once() {
    let keep = test_event("keep", "k1", 60);
    let gone = test_event("gone", "g1", 90);
    let harness = build_harness(NotifyPolicy::PerMilestone);
    let reconciler = reconciler_for(
        &harness,
        vec![
            Ok(vec![keep.clone(), gone.clone()]),
            Ok(vec![keep.clone()]),
            Ok(vec![keep.clone()]),
        ],
    );

    reconciler.run_cycle().await;
    let second = reconciler.run_cycle().await;
    let third = reconciler.run_cycle().await;

    assert_eq!(second.removed, 1);
    assert_eq!(third.removed, 0);
    let removals = harness.notifier.bodies_for("Event removed");
    assert_eq!(removals, vec!["Meeting gone".to_string()]);
    assert_eq!(harness.tray.latest().unwrap().len(), 1);
}

#[tokio::test]
async fn test_once_only_policy_silences_removal_of_alerted_event() {
    // Under once-only the first alert adds the event id to the ignore set,
    // so its later disappearance is not announced either.
    let event = test_event("a", "e1", 2);
    let harness = build_harness(NotifyPolicy::OnceOnly);
    let reconciler = reconciler_for(&harness, vec![Ok(vec![event.clone()]), Ok(Vec::new())]);

    let first = reconciler.run_cycle().await;
    assert_eq!(first.alerts_fired, 1);

    let second = reconciler.run_cycle().await;
    assert_eq!(second.removed, 0);
    assert!(!harness.notifier.titles().iter().any(|t| t == "Event removed"));
    assert!(harness.state.core.lock().unwrap().store.is_empty());
}

#[tokio::test]
async fn test_snapshot_round_trip_through_file_store() {
    let temp_dir = TempDir::new().unwrap();
    let file_store = Arc::new(FileStore::new(temp_dir.path()).unwrap());

    let notifier = Arc::new(RecordingNotifier::default());
    let state = Arc::new(AppState::new(
        EventStore::new(),
        NotificationScheduler::new(NotifyPolicy::PerMilestone),
        Effects {
            notifier: notifier.clone(),
            chime: Arc::new(RecordingChime::default()),
            tray: Arc::new(RecordingTray::default()),
            blobs: file_store.clone(),
            launcher: Arc::new(RecordingLauncher::default()),
        },
    ));
    let source = ScriptedSource::new(vec![Ok(vec![
        test_event("a", "e1", 60),
        test_event("b", "e2", 120),
    ])]);
    let reconciler = Reconciler::new(Arc::new(source), state, 10);

    assert!(reconciler.run_cycle().await.success);

    // A fresh process sees the snapshot the cycle wrote.
    let reloaded = EventStore::load(file_store.as_ref());
    assert_eq!(reloaded.len(), 2);
    assert!(reloaded.find_by_id("a").is_some());
    assert!(reloaded.find_by_id("b").is_some());
}

#[tokio::test]
async fn test_tray_click_launches_meeting_link() {
    let mut with_link = test_event("a", "e1", 30);
    with_link.description = Some("Join: https://meet.google.com/abc-defg-hij".to_string());
    let without_link = test_event("b", "e2", 60);

    let harness = build_harness(NotifyPolicy::PerMilestone);
    let reconciler = reconciler_for(&harness, vec![Ok(vec![with_link, without_link])]);
    reconciler.run_cycle().await;

    harness.state.handle_tray_click("e1");
    harness.state.handle_tray_click("e2");
    harness.state.handle_tray_click("stale-key");

    let opened = harness.launcher.urls.lock().unwrap().clone();
    assert_eq!(
        opened,
        vec![
            "https://meet.google.com/abc-defg-hij".to_string(),
            // No meeting link, so the browser falls back to the event page.
            "https://calendar.google.com/event?eid=b".to_string(),
        ]
    );
}
