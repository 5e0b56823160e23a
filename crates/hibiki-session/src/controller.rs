use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use hibiki_api::traits::{EpisodeCatalog, SkipTimeService, SourceResolver};
use hibiki_core::config::AppConfig;
use hibiki_core::models::{
    pair_segments, EpisodeIdentity, EpisodeInfo, SeriesIds, SkipKind, SkipSegment,
    SourceDescriptor,
};
use hibiki_player::{
    seek_controls, ControlAction, Highlight, PlayerConfig, PlayerEvent, PlayerFactory,
    PlayerHandle, SourceLoad,
};

use crate::db::DbHandle;
use crate::events::SessionEvent;

/// Failures that cross the session boundary.
///
/// Everything else (skip-time lookups, progress writes, catalog fetches)
/// degrades to "feature not available this session" and is only logged.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("no playable source for {identity} (quality {quality})")]
    NotFound {
        identity: EpisodeIdentity,
        quality: String,
    },

    #[error("player error: {0}")]
    Player(String),
}

/// What the caller wants to play.
///
/// The episode number is a request: stored progress for the series, when
/// present, decides which episode actually plays.
#[derive(Debug, Clone)]
pub struct BindRequest {
    pub series_id: String,
    pub ids: SeriesIds,
    pub episode: u32,
    /// Exact quality label to play; `None` means the configured default.
    pub quality: Option<String>,
    pub title: String,
    pub poster: Option<String>,
}

/// State the bind path, the event pump and the overlay task all touch.
struct SessionShared {
    /// Episode a progress checkpoint would write. Starts as the bound
    /// episode; moves forward when `ended` advances the series.
    episode: AtomicU32,
    /// Last observed playback position, stored as f64 bits.
    position_bits: AtomicU64,
    episodes: Mutex<Option<Vec<EpisodeInfo>>>,
    segments: Mutex<Vec<SkipSegment>>,
}

impl SessionShared {
    fn new(episode: u32) -> Self {
        Self {
            episode: AtomicU32::new(episode),
            position_bits: AtomicU64::new(0f64.to_bits()),
            episodes: Mutex::new(None),
            segments: Mutex::new(Vec::new()),
        }
    }

    fn episode(&self) -> u32 {
        self.episode.load(Ordering::SeqCst)
    }

    fn position(&self) -> f64 {
        f64::from_bits(self.position_bits.load(Ordering::SeqCst))
    }

    fn set_position(&self, seconds: f64) {
        self.position_bits.store(seconds.to_bits(), Ordering::SeqCst);
    }

    fn advance_to(&self, episode: u32) {
        self.episode.store(episode, Ordering::SeqCst);
        self.set_position(0.0);
    }

    fn set_episodes(&self, episodes: Vec<EpisodeInfo>) {
        if let Ok(mut slot) = self.episodes.lock() {
            *slot = Some(episodes);
        }
    }

    fn episode_total(&self) -> Option<u32> {
        self.episodes
            .lock()
            .ok()
            .and_then(|slot| slot.as_ref().map(|eps| eps.len() as u32))
    }

    fn episode_image(&self, number: u32) -> Option<String> {
        self.episodes.lock().ok().and_then(|slot| {
            slot.as_ref().and_then(|eps| {
                eps.iter()
                    .find(|ep| ep.number == number)
                    .and_then(|ep| ep.image.clone())
            })
        })
    }

    fn set_segments(&self, segments: Vec<SkipSegment>) {
        if let Ok(mut slot) = self.segments.lock() {
            *slot = segments;
        }
    }

    fn segments(&self) -> Vec<SkipSegment> {
        self.segments.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

struct ActiveSession<P> {
    identity: EpisodeIdentity,
    player: Arc<P>,
    descriptor: SourceDescriptor,
    shared: Arc<SessionShared>,
}

/// Owns the lifecycle of one player instance bound to one episode.
///
/// Three independently arriving inputs (player lifecycle events, the stored
/// watch progress, the skip-time lookup) are reconciled here. Any of them
/// may fail or arrive late; the generation counter discards completions that
/// belong to a superseded bind.
pub struct SessionController<F, R, C, K>
where
    F: PlayerFactory,
    R: SourceResolver,
    C: EpisodeCatalog,
    K: SkipTimeService,
{
    db: DbHandle,
    factory: F,
    resolver: Arc<R>,
    catalog: Arc<C>,
    skip: Arc<K>,
    config: AppConfig,
    generation: Arc<AtomicU64>,
    active: Option<ActiveSession<F::Player>>,
    events_tx: mpsc::UnboundedSender<SessionEvent>,
}

impl<F, R, C, K> SessionController<F, R, C, K>
where
    F: PlayerFactory,
    R: SourceResolver + 'static,
    C: EpisodeCatalog + 'static,
    K: SkipTimeService + 'static,
{
    pub fn new(
        db: DbHandle,
        factory: F,
        resolver: R,
        catalog: C,
        skip: K,
        config: AppConfig,
    ) -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        (
            Self {
                db,
                factory,
                resolver: Arc::new(resolver),
                catalog: Arc::new(catalog),
                skip: Arc::new(skip),
                config,
                generation: Arc::new(AtomicU64::new(0)),
                active: None,
                events_tx,
            },
            events_rx,
        )
    }

    /// Bind the controller to an episode, creating a fresh player instance.
    ///
    /// Idempotent per identical resolved identity. Returns the identity that
    /// actually plays, which may differ from the requested episode when
    /// stored progress redirects.
    pub async fn bind(&mut self, request: BindRequest) -> Result<EpisodeIdentity, SessionError> {
        let requested = request.episode.max(1);

        let stored = match self.db.watch_state(&request.series_id).await {
            Ok(state) => state,
            Err(e) => {
                warn!(error = %e, series = %request.series_id, "watch state lookup failed, using requested episode");
                None
            }
        };
        let resolved = stored.as_ref().map(|s| s.episode).unwrap_or(requested);
        if resolved != requested {
            info!(series = %request.series_id, requested, resolved, "redirecting to last-played episode");
            let _ = self
                .events_tx
                .send(SessionEvent::EpisodeRedirected { requested, resolved });
        }

        let identity = EpisodeIdentity::new(request.series_id.clone(), resolved);

        if self.active.as_ref().is_some_and(|a| a.identity == identity) {
            debug!(%identity, "already bound");
            return Ok(identity);
        }

        // Supersede in-flight completions, then tear the old instance down.
        // Its event stream closes on destroy, which releases the listeners.
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(old) = self.active.take() {
            info!(identity = %old.identity, "tearing down previous session");
            old.player.destroy();
        }

        let playback_rate = match self.db.playback_rate().await {
            Ok(rate) => rate.unwrap_or(1.0),
            Err(e) => {
                warn!(error = %e, "playback rate lookup failed, using 1.0");
                1.0
            }
        };

        let player = self
            .factory
            .create(PlayerConfig {
                autoplay: self.config.playback.autoplay,
                playback_rate,
            })
            .map_err(|e| SessionError::Player(e.to_string()))?;
        let player = Arc::new(player);
        let events = player.subscribe();

        let shared = Arc::new(SessionShared::new(identity.episode));
        self.spawn_catalog_fetch(request.ids.anilist, generation, shared.clone());

        let quality = request
            .quality
            .unwrap_or_else(|| self.config.playback.default_quality.clone());
        let descriptor = match self
            .resolver
            .resolve(&identity.series, identity.episode)
            .await
        {
            Ok(descriptor) => descriptor,
            Err(e) => {
                debug!(error = %e, %identity, "source resolution failed");
                player.destroy();
                return Err(SessionError::NotFound { identity, quality });
            }
        };
        let Some(variant) = descriptor.select(&quality) else {
            debug!(%identity, quality = %quality, "no source with requested quality");
            player.destroy();
            return Err(SessionError::NotFound { identity, quality });
        };
        let src = variant.url.clone();

        if let Some(url) = descriptor.download.clone() {
            let _ = self.events_tx.send(SessionEvent::DownloadAvailable { url });
        }

        player.install_controls(seek_controls(self.config.playback.seek_step_seconds));

        let load = SourceLoad {
            src,
            poster: shared.episode_image(identity.episode).or(request.poster),
            title: format!("{} / Episode {}", request.title, identity.episode),
        };
        if let Err(e) = player.change_source(load).await {
            player.destroy();
            return Err(SessionError::Player(e.to_string()));
        }
        info!(%identity, quality = %quality, "source loaded");

        tokio::spawn(run_event_pump(
            player.clone(),
            events,
            self.db.clone(),
            identity.clone(),
            shared.clone(),
        ));

        let _ = self.events_tx.send(SessionEvent::SourceLoaded {
            identity: identity.clone(),
        });

        // Only after the load has been requested; a rebind in the meantime
        // makes the completion stale.
        self.spawn_skip_overlay(
            request.ids.anilist,
            identity.episode,
            generation,
            player.clone(),
            shared.clone(),
        );

        self.active = Some(ActiveSession {
            identity: identity.clone(),
            player,
            descriptor,
            shared,
        });
        Ok(identity)
    }

    /// Tear down the active session, checkpointing progress first.
    pub async fn shutdown(&mut self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(active) = self.active.take() {
            let episode = active.shared.episode();
            let position = active.shared.position();
            if let Err(e) = self
                .db
                .set_watch_state(&active.identity.series, episode, position)
                .await
            {
                warn!(error = %e, "final progress checkpoint failed");
            }
            active.player.destroy();
        }
    }

    /// Identity currently bound, if any.
    pub fn identity(&self) -> Option<&EpisodeIdentity> {
        self.active.as_ref().map(|a| &a.identity)
    }

    /// Sources resolved for the active identity.
    pub fn source_descriptor(&self) -> Option<&SourceDescriptor> {
        self.active.as_ref().map(|a| &a.descriptor)
    }

    /// Skip segments applied to the active session.
    pub fn active_segments(&self) -> Vec<SkipSegment> {
        self.active
            .as_ref()
            .map(|a| a.shared.segments())
            .unwrap_or_default()
    }

    /// Number of catalog episodes, once the catalog lookup has resolved.
    pub fn episode_total(&self) -> Option<u32> {
        self.active.as_ref().and_then(|a| a.shared.episode_total())
    }

    fn spawn_catalog_fetch(
        &self,
        anilist_id: Option<u64>,
        generation: u64,
        shared: Arc<SessionShared>,
    ) {
        let Some(anilist_id) = anilist_id else {
            return;
        };
        let catalog = self.catalog.clone();
        let current = self.generation.clone();
        tokio::spawn(async move {
            match catalog.episodes(anilist_id).await {
                Ok(episodes) => {
                    if current.load(Ordering::SeqCst) == generation {
                        shared.set_episodes(episodes);
                    } else {
                        debug!(anilist_id, "episode catalog resolved for a superseded session");
                    }
                }
                Err(e) => debug!(error = %e, anilist_id, "episode catalog fetch failed"),
            }
        });
    }

    fn spawn_skip_overlay(
        &self,
        anilist_id: Option<u64>,
        episode: u32,
        generation: u64,
        player: Arc<F::Player>,
        shared: Arc<SessionShared>,
    ) {
        let Some(anilist_id) = anilist_id else {
            debug!("series has no anilist id, skipping skip-times lookup");
            return;
        };
        let skip = self.skip.clone();
        let current = self.generation.clone();
        let events_tx = self.events_tx.clone();
        tokio::spawn(async move {
            let boundaries = match skip.skip_times(anilist_id, episode).await {
                Ok(boundaries) => boundaries,
                Err(e) => {
                    debug!(error = %e, anilist_id, episode, "skip-times fetch failed, no segments this session");
                    return;
                }
            };
            let segments = pair_segments(&boundaries);
            if segments.is_empty() {
                return;
            }
            // A completion for a superseded bind must not touch the player.
            if current.load(Ordering::SeqCst) != generation {
                debug!(anilist_id, episode, "skip times resolved for a superseded session, discarding");
                return;
            }

            let (openings, endings) = boundary_times(&segments);
            let highlights = segment_highlights(&segments);
            shared.set_segments(segments);
            let _ = events_tx.send(SessionEvent::SegmentsChanged { openings, endings });
            player.set_highlights(highlights);
        });
    }
}

/// React to one player instance's events until its stream closes.
async fn run_event_pump<P: PlayerHandle>(
    player: Arc<P>,
    mut events: mpsc::UnboundedReceiver<PlayerEvent>,
    db: DbHandle,
    identity: EpisodeIdentity,
    shared: Arc<SessionShared>,
) {
    while let Some(event) = events.recv().await {
        match event {
            PlayerEvent::TimeUpdate { seconds } => shared.set_position(seconds),
            PlayerEvent::Pause | PlayerEvent::Abort => {
                checkpoint(&db, &identity.series, shared.episode(), shared.position());
            }
            PlayerEvent::Destroyed => {
                checkpoint(&db, &identity.series, shared.episode(), shared.position());
                break;
            }
            PlayerEvent::Ended => {
                let episode = shared.episode();
                let position = shared.position();
                // Wrap to the first episode when the catalog says this was
                // the last one. An unresolved catalog means a plain advance.
                let next = match shared.episode_total() {
                    Some(total) if episode == total => 1,
                    _ => episode + 1,
                };
                shared.advance_to(next);

                let db = db.clone();
                let series = identity.series.clone();
                tokio::spawn(async move {
                    if let Err(e) = db.set_watch_state(&series, episode, position).await {
                        warn!(error = %e, series = %series, "progress checkpoint failed");
                    }
                    if let Err(e) = db.set_watch_state(&series, next, 0.0).await {
                        warn!(error = %e, series = %series, "episode advance write failed");
                    }
                });
            }
            PlayerEvent::ControlActivated(action) => {
                let now = player.current_time();
                let target = match action {
                    ControlAction::SeekForward(step) => now + f64::from(step),
                    ControlAction::SeekBackward(step) => now - f64::from(step),
                };
                player.seek(target);
            }
            PlayerEvent::RateChanged(rate) => {
                let db = db.clone();
                tokio::spawn(async move {
                    if let Err(e) = db.set_playback_rate(rate).await {
                        warn!(error = %e, "playback rate persist failed");
                    }
                });
            }
        }
    }
    debug!(%identity, "player event stream closed");
}

/// Fire-and-forget progress write. Losing one checkpoint is acceptable;
/// blocking playback on it is not.
fn checkpoint(db: &DbHandle, series: &str, episode: u32, position: f64) {
    let db = db.clone();
    let series = series.to_string();
    tokio::spawn(async move {
        if let Err(e) = db.set_watch_state(&series, episode, position).await {
            warn!(error = %e, series = %series, "progress checkpoint failed");
        }
    });
}

fn boundary_times(segments: &[SkipSegment]) -> (Vec<f64>, Vec<f64>) {
    let mut openings = Vec::new();
    let mut endings = Vec::new();
    for segment in segments {
        let times = match segment.kind {
            SkipKind::Opening => &mut openings,
            SkipKind::Ending => &mut endings,
        };
        times.push(segment.start_seconds);
        times.push(segment.end_seconds);
    }
    (openings, endings)
}

fn segment_highlights(segments: &[SkipSegment]) -> Vec<Highlight> {
    segments
        .iter()
        .flat_map(|segment| {
            let text = segment.kind.label().to_string();
            [
                Highlight {
                    time: segment.start_seconds,
                    text: text.clone(),
                },
                Highlight {
                    time: segment.end_seconds,
                    text,
                },
            ]
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::AtomicBool;
    use std::time::Duration;

    use tokio::sync::Semaphore;

    use hibiki_core::models::{SkipBoundary, SourceVariant};
    use hibiki_player::ControlDescriptor;

    #[derive(Debug, thiserror::Error)]
    #[error("{0}")]
    struct TestError(String);

    // ── Mock player ─────────────────────────────────────────────

    struct PlayerState {
        tx: Mutex<Option<mpsc::UnboundedSender<PlayerEvent>>>,
        rx: Mutex<Option<mpsc::UnboundedReceiver<PlayerEvent>>>,
        loads: Mutex<Vec<SourceLoad>>,
        seeks: Mutex<Vec<f64>>,
        highlights: Mutex<Vec<Highlight>>,
        controls: Mutex<Vec<ControlDescriptor>>,
        time: Mutex<f64>,
        destroyed: AtomicBool,
    }

    impl PlayerState {
        fn new() -> Arc<Self> {
            let (tx, rx) = mpsc::unbounded_channel();
            Arc::new(Self {
                tx: Mutex::new(Some(tx)),
                rx: Mutex::new(Some(rx)),
                loads: Mutex::new(Vec::new()),
                seeks: Mutex::new(Vec::new()),
                highlights: Mutex::new(Vec::new()),
                controls: Mutex::new(Vec::new()),
                time: Mutex::new(0.0),
                destroyed: AtomicBool::new(false),
            })
        }

        fn emit(&self, event: PlayerEvent) {
            if let Some(tx) = self.tx.lock().unwrap().as_ref() {
                let _ = tx.send(event);
            }
        }

        fn set_time(&self, seconds: f64) {
            *self.time.lock().unwrap() = seconds;
        }

        fn is_destroyed(&self) -> bool {
            self.destroyed.load(Ordering::SeqCst)
        }

        fn destroy(&self) {
            self.destroyed.store(true, Ordering::SeqCst);
            // Emit the final event, then close the stream.
            if let Some(tx) = self.tx.lock().unwrap().take() {
                let _ = tx.send(PlayerEvent::Destroyed);
            }
        }
    }

    struct MockPlayer {
        state: Arc<PlayerState>,
    }

    impl PlayerHandle for MockPlayer {
        type Error = TestError;

        fn subscribe(&self) -> mpsc::UnboundedReceiver<PlayerEvent> {
            self.state
                .rx
                .lock()
                .unwrap()
                .take()
                .unwrap_or_else(|| mpsc::unbounded_channel().1)
        }

        async fn change_source(&self, load: SourceLoad) -> Result<(), TestError> {
            self.state.loads.lock().unwrap().push(load);
            Ok(())
        }

        fn seek(&self, seconds: f64) {
            self.state.seeks.lock().unwrap().push(seconds);
        }

        fn current_time(&self) -> f64 {
            *self.state.time.lock().unwrap()
        }

        fn set_highlights(&self, highlights: Vec<Highlight>) {
            *self.state.highlights.lock().unwrap() = highlights;
        }

        fn install_controls(&self, controls: Vec<ControlDescriptor>) {
            self.state.controls.lock().unwrap().extend(controls);
        }

        fn destroy(&self) {
            self.state.destroy();
        }
    }

    #[derive(Default)]
    struct FactoryState {
        created: Mutex<Vec<Arc<PlayerState>>>,
        configs: Mutex<Vec<PlayerConfig>>,
    }

    #[derive(Clone, Default)]
    struct MockFactory {
        state: Arc<FactoryState>,
    }

    impl PlayerFactory for MockFactory {
        type Player = MockPlayer;
        type Error = TestError;

        fn create(&self, config: PlayerConfig) -> Result<MockPlayer, TestError> {
            let state = PlayerState::new();
            self.state.created.lock().unwrap().push(state.clone());
            self.state.configs.lock().unwrap().push(config);
            Ok(MockPlayer { state })
        }
    }

    // ── Mock services ───────────────────────────────────────────

    #[derive(Clone)]
    struct MockResolver {
        sources: Vec<SourceVariant>,
        download: Option<String>,
        fail: bool,
    }

    impl SourceResolver for MockResolver {
        type Error = TestError;

        async fn resolve(
            &self,
            _series_id: &str,
            _episode: u32,
        ) -> Result<SourceDescriptor, TestError> {
            if self.fail {
                return Err(TestError("provider unreachable".into()));
            }
            Ok(SourceDescriptor {
                sources: self.sources.clone(),
                download: self.download.clone(),
            })
        }
    }

    #[derive(Clone)]
    struct MockCatalog {
        episodes: Vec<EpisodeInfo>,
    }

    impl EpisodeCatalog for MockCatalog {
        type Error = TestError;

        async fn episodes(&self, _anilist_id: u64) -> Result<Vec<EpisodeInfo>, TestError> {
            Ok(self.episodes.clone())
        }
    }

    struct MockSkip {
        boundaries: Vec<SkipBoundary>,
        fail: bool,
        /// Blocks the fetch for the given episode until a permit is added.
        gate: Option<(u32, Arc<Semaphore>)>,
        called: Arc<AtomicBool>,
    }

    impl SkipTimeService for MockSkip {
        type Error = TestError;

        async fn skip_times(
            &self,
            _anilist_id: u64,
            episode: u32,
        ) -> Result<Vec<SkipBoundary>, TestError> {
            self.called.store(true, Ordering::SeqCst);
            if let Some((gated, semaphore)) = &self.gate {
                if *gated == episode {
                    let permit = semaphore
                        .acquire()
                        .await
                        .map_err(|e| TestError(e.to_string()))?;
                    permit.forget();
                }
            }
            if self.fail {
                return Err(TestError("skip service down".into()));
            }
            Ok(self.boundaries.clone())
        }
    }

    // ── Harness ─────────────────────────────────────────────────

    struct Harness {
        controller: SessionController<MockFactory, MockResolver, MockCatalog, MockSkip>,
        events: mpsc::UnboundedReceiver<SessionEvent>,
        factory: MockFactory,
        db: DbHandle,
    }

    impl Harness {
        fn player(&self, idx: usize) -> Arc<PlayerState> {
            self.factory.state.created.lock().unwrap()[idx].clone()
        }

        fn created_count(&self) -> usize {
            self.factory.state.created.lock().unwrap().len()
        }

        fn config(&self, idx: usize) -> PlayerConfig {
            self.factory.state.configs.lock().unwrap()[idx].clone()
        }
    }

    fn harness(resolver: MockResolver, catalog: MockCatalog, skip: MockSkip) -> Harness {
        let db = DbHandle::open_memory().unwrap();
        let factory = MockFactory::default();
        let (controller, events) = SessionController::new(
            db.clone(),
            factory.clone(),
            resolver,
            catalog,
            skip,
            AppConfig::default(),
        );
        Harness {
            controller,
            events,
            factory,
            db,
        }
    }

    fn default_sources() -> MockResolver {
        MockResolver {
            sources: vec![SourceVariant {
                quality: "default".into(),
                url: "https://cdn.example/ep.m3u8".into(),
            }],
            download: None,
            fail: false,
        }
    }

    fn catalog_of(n: u32) -> MockCatalog {
        MockCatalog {
            episodes: (1..=n)
                .map(|number| EpisodeInfo {
                    number,
                    title: None,
                    image: None,
                })
                .collect(),
        }
    }

    fn no_skip() -> MockSkip {
        MockSkip {
            boundaries: Vec::new(),
            fail: false,
            gate: None,
            called: Arc::new(AtomicBool::new(false)),
        }
    }

    fn op_boundaries() -> Vec<SkipBoundary> {
        vec![
            SkipBoundary {
                kind: SkipKind::Opening,
                start: Some(5.0),
                end: None,
            },
            SkipBoundary {
                kind: SkipKind::Opening,
                start: None,
                end: Some(95.0),
            },
        ]
    }

    fn request(series: &str, episode: u32) -> BindRequest {
        BindRequest {
            series_id: series.into(),
            ids: SeriesIds {
                anilist: Some(21),
                mal: Some(20),
            },
            episode,
            quality: None,
            title: "Sousou no Frieren".into(),
            poster: None,
        }
    }

    async fn eventually(mut cond: impl FnMut() -> bool, what: &str) {
        for _ in 0..200 {
            if cond() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("timed out waiting for {what}");
    }

    async fn eventually_watch_state(db: &DbHandle, series: &str, episode: u32, position: f64) {
        for _ in 0..200 {
            if let Ok(Some(state)) = db.watch_state(series).await {
                if state.episode == episode && (state.position_seconds - position).abs() < 1e-9 {
                    return;
                }
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("watch state never reached ep {episode} @ {position}");
    }

    async fn next_event(events: &mut mpsc::UnboundedReceiver<SessionEvent>) -> SessionEvent {
        tokio::time::timeout(Duration::from_secs(2), events.recv())
            .await
            .expect("timed out waiting for session event")
            .expect("event channel closed")
    }

    fn drain_events(events: &mut mpsc::UnboundedReceiver<SessionEvent>) -> Vec<SessionEvent> {
        let mut out = Vec::new();
        while let Ok(event) = events.try_recv() {
            out.push(event);
        }
        out
    }

    // ── Binding ─────────────────────────────────────────────────

    #[tokio::test]
    async fn test_bind_loads_selected_source() {
        let mut h = harness(default_sources(), catalog_of(12), no_skip());

        let identity = h.controller.bind(request("frieren", 3)).await.unwrap();
        assert_eq!(identity.episode, 3);
        assert_eq!(h.controller.identity(), Some(&identity));

        assert_eq!(h.created_count(), 1);
        let player = h.player(0);
        let loads = player.loads.lock().unwrap().clone();
        assert_eq!(loads.len(), 1);
        assert_eq!(loads[0].src, "https://cdn.example/ep.m3u8");
        assert_eq!(loads[0].title, "Sousou no Frieren / Episode 3");

        // Seek affordances attached exactly once.
        assert_eq!(player.controls.lock().unwrap().len(), 2);

        assert_eq!(
            next_event(&mut h.events).await,
            SessionEvent::SourceLoaded { identity }
        );
    }

    #[tokio::test]
    async fn test_bind_missing_quality_is_not_found() {
        let resolver = MockResolver {
            sources: vec![SourceVariant {
                quality: "480p".into(),
                url: "https://cdn.example/480.m3u8".into(),
            }],
            download: None,
            fail: false,
        };
        let mut h = harness(resolver, catalog_of(12), no_skip());

        let mut req = request("series-42", 3);
        req.quality = Some("1080p".into());
        let err = h.controller.bind(req).await.unwrap_err();
        assert!(matches!(err, SessionError::NotFound { .. }));

        // The fresh instance is torn down and nothing was loaded into it.
        let player = h.player(0);
        assert!(player.is_destroyed());
        assert!(player.loads.lock().unwrap().is_empty());
        assert!(h.controller.identity().is_none());
    }

    #[tokio::test]
    async fn test_bind_empty_sources_is_not_found() {
        let resolver = MockResolver {
            sources: Vec::new(),
            download: None,
            fail: false,
        };
        let mut h = harness(resolver, catalog_of(12), no_skip());

        let err = h.controller.bind(request("frieren", 1)).await.unwrap_err();
        assert!(matches!(err, SessionError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_resolver_failure_is_not_found() {
        let resolver = MockResolver {
            sources: Vec::new(),
            download: None,
            fail: true,
        };
        let mut h = harness(resolver, catalog_of(12), no_skip());

        let err = h.controller.bind(request("frieren", 1)).await.unwrap_err();
        assert!(matches!(err, SessionError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_bind_redirects_to_stored_episode() {
        let mut h = harness(default_sources(), catalog_of(12), no_skip());
        h.db.set_watch_state("frieren", 7, 0.0).await.unwrap();

        let identity = h.controller.bind(request("frieren", 3)).await.unwrap();
        assert_eq!(identity.episode, 7);

        assert_eq!(
            next_event(&mut h.events).await,
            SessionEvent::EpisodeRedirected {
                requested: 3,
                resolved: 7
            }
        );
    }

    #[tokio::test]
    async fn test_rebind_same_identity_is_noop() {
        let mut h = harness(default_sources(), catalog_of(12), no_skip());

        h.controller.bind(request("frieren", 3)).await.unwrap();
        h.controller.bind(request("frieren", 3)).await.unwrap();

        assert_eq!(h.created_count(), 1);
        assert!(!h.player(0).is_destroyed());
    }

    #[tokio::test]
    async fn test_rebind_tears_down_previous_player() {
        let mut h = harness(default_sources(), catalog_of(12), no_skip());

        h.controller.bind(request("frieren", 3)).await.unwrap();
        h.db.set_watch_state("frieren", 5, 0.0).await.unwrap();
        h.controller.bind(request("frieren", 5)).await.unwrap();

        assert_eq!(h.created_count(), 2);
        assert!(h.player(0).is_destroyed());
        assert!(!h.player(1).is_destroyed());
        // No duplicated controls on either instance.
        assert_eq!(h.player(0).controls.lock().unwrap().len(), 2);
        assert_eq!(h.player(1).controls.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_bind_normalizes_zero_episode() {
        let mut h = harness(default_sources(), catalog_of(12), no_skip());
        let identity = h.controller.bind(request("frieren", 0)).await.unwrap();
        assert_eq!(identity.episode, 1);
    }

    #[tokio::test]
    async fn test_download_link_published() {
        let resolver = MockResolver {
            download: Some("https://cdn.example/ep3.mp4".into()),
            ..default_sources()
        };
        let mut h = harness(resolver, catalog_of(12), no_skip());

        h.controller.bind(request("frieren", 3)).await.unwrap();
        let events = drain_events(&mut h.events);
        assert!(events.contains(&SessionEvent::DownloadAvailable {
            url: "https://cdn.example/ep3.mp4".into()
        }));
    }

    // ── Progress persistence ────────────────────────────────────

    #[tokio::test]
    async fn test_pause_checkpoints_position() {
        let mut h = harness(default_sources(), catalog_of(12), no_skip());
        h.controller.bind(request("frieren", 3)).await.unwrap();

        let player = h.player(0);
        player.emit(PlayerEvent::TimeUpdate { seconds: 30.0 });
        player.emit(PlayerEvent::Pause);

        eventually_watch_state(&h.db, "frieren", 3, 30.0).await;
    }

    #[tokio::test]
    async fn test_abort_checkpoints_progress() {
        let mut h = harness(default_sources(), catalog_of(12), no_skip());
        h.controller.bind(request("frieren", 3)).await.unwrap();

        let player = h.player(0);
        player.emit(PlayerEvent::TimeUpdate { seconds: 12.5 });
        player.emit(PlayerEvent::Abort);

        eventually_watch_state(&h.db, "frieren", 3, 12.5).await;
    }

    #[tokio::test]
    async fn test_ended_advances_to_next_episode() {
        let mut h = harness(default_sources(), catalog_of(12), no_skip());
        h.controller.bind(request("series-42", 3)).await.unwrap();

        h.player(0).emit(PlayerEvent::Ended);

        eventually_watch_state(&h.db, "series-42", 4, 0.0).await;
    }

    #[tokio::test]
    async fn test_ended_wraps_on_last_episode() {
        let mut h = harness(default_sources(), catalog_of(12), no_skip());
        h.controller.bind(request("series-42", 12)).await.unwrap();

        // The wrap decision needs the catalog; wait for it to land.
        eventually(
            || h.controller.episode_total() == Some(12),
            "episode catalog",
        )
        .await;
        h.player(0).emit(PlayerEvent::Ended);

        eventually_watch_state(&h.db, "series-42", 1, 0.0).await;
    }

    #[tokio::test]
    async fn test_destroy_checkpoints_progress() {
        let mut h = harness(default_sources(), catalog_of(12), no_skip());
        h.controller.bind(request("frieren", 3)).await.unwrap();

        let player = h.player(0);
        player.emit(PlayerEvent::TimeUpdate { seconds: 77.0 });
        player.destroy();

        eventually_watch_state(&h.db, "frieren", 3, 77.0).await;
    }

    #[tokio::test]
    async fn test_shutdown_checkpoints_and_destroys() {
        let mut h = harness(default_sources(), catalog_of(12), no_skip());
        h.controller.bind(request("frieren", 3)).await.unwrap();

        let player = h.player(0);
        player.emit(PlayerEvent::TimeUpdate { seconds: 99.0 });
        // Let the pump observe the position before shutting down.
        tokio::time::sleep(Duration::from_millis(50)).await;

        h.controller.shutdown().await;
        assert!(player.is_destroyed());
        assert!(h.controller.identity().is_none());
        eventually_watch_state(&h.db, "frieren", 3, 99.0).await;
    }

    // ── Skip-segment overlay ────────────────────────────────────

    #[tokio::test]
    async fn test_skip_segments_published() {
        let skip = MockSkip {
            boundaries: op_boundaries(),
            ..no_skip()
        };
        let mut h = harness(default_sources(), catalog_of(12), skip);
        h.controller.bind(request("frieren", 1)).await.unwrap();

        assert!(matches!(
            next_event(&mut h.events).await,
            SessionEvent::SourceLoaded { .. }
        ));
        match next_event(&mut h.events).await {
            SessionEvent::SegmentsChanged { openings, endings } => {
                assert_eq!(openings, vec![5.0, 95.0]);
                assert!(endings.is_empty());
            }
            other => panic!("expected SegmentsChanged, got {other:?}"),
        }

        let highlights = h.player(0).highlights.lock().unwrap().clone();
        assert_eq!(
            highlights,
            vec![
                Highlight {
                    time: 5.0,
                    text: "OP".into()
                },
                Highlight {
                    time: 95.0,
                    text: "OP".into()
                },
            ]
        );
        assert_eq!(h.controller.active_segments().len(), 1);
    }

    #[tokio::test]
    async fn test_skip_fetch_failure_degrades_silently() {
        let skip = MockSkip {
            fail: true,
            ..no_skip()
        };
        let mut h = harness(default_sources(), catalog_of(12), skip);
        h.controller.bind(request("frieren", 1)).await.unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(h.player(0).highlights.lock().unwrap().is_empty());
        assert!(h.controller.active_segments().is_empty());
        let events = drain_events(&mut h.events);
        assert!(!events
            .iter()
            .any(|e| matches!(e, SessionEvent::SegmentsChanged { .. })));
    }

    #[tokio::test]
    async fn test_zero_segments_publish_no_effects() {
        let mut h = harness(default_sources(), catalog_of(12), no_skip());
        h.controller.bind(request("frieren", 1)).await.unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(h.player(0).highlights.lock().unwrap().is_empty());
        assert!(h.controller.active_segments().is_empty());
    }

    #[tokio::test]
    async fn test_no_anilist_id_skips_lookup() {
        let skip = no_skip();
        let called = skip.called.clone();
        let mut h = harness(default_sources(), catalog_of(12), skip);

        let mut req = request("frieren", 1);
        req.ids = SeriesIds::default();
        h.controller.bind(req).await.unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!called.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_stale_skip_fetch_discarded() {
        let gate = Arc::new(Semaphore::new(0));
        let skip = MockSkip {
            boundaries: op_boundaries(),
            gate: Some((1, gate.clone())),
            ..no_skip()
        };
        let mut h = harness(default_sources(), catalog_of(12), skip);

        h.controller.bind(request("frieren", 1)).await.unwrap();

        // Supersede the identity while episode 1's fetch is still pending.
        h.db.set_watch_state("frieren", 2, 0.0).await.unwrap();
        h.controller.bind(request("frieren", 2)).await.unwrap();

        // Episode 2's fetch is ungated; wait for its effects.
        eventually(
            || !h.player(1).highlights.lock().unwrap().is_empty(),
            "fresh highlights",
        )
        .await;

        // Now let the stale fetch resolve.
        gate.add_permits(1);
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(h.player(0).highlights.lock().unwrap().is_empty());
        let events = drain_events(&mut h.events);
        let segment_events = events
            .iter()
            .filter(|e| matches!(e, SessionEvent::SegmentsChanged { .. }))
            .count();
        assert_eq!(segment_events, 1);
    }

    // ── Seek affordances & settings ─────────────────────────────

    #[tokio::test]
    async fn test_forward_skip_seeks_once() {
        let mut h = harness(default_sources(), catalog_of(12), no_skip());
        h.controller.bind(request("frieren", 1)).await.unwrap();

        let player = h.player(0);
        player.set_time(30.0);
        player.emit(PlayerEvent::ControlActivated(ControlAction::SeekForward(10)));

        eventually(
            || !player.seeks.lock().unwrap().is_empty(),
            "forward seek",
        )
        .await;
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(player.seeks.lock().unwrap().clone(), vec![40.0]);
    }

    #[tokio::test]
    async fn test_backward_skip_seeks() {
        let mut h = harness(default_sources(), catalog_of(12), no_skip());
        h.controller.bind(request("frieren", 1)).await.unwrap();

        let player = h.player(0);
        player.set_time(30.0);
        player.emit(PlayerEvent::ControlActivated(ControlAction::SeekBackward(
            10,
        )));

        eventually(
            || !player.seeks.lock().unwrap().is_empty(),
            "backward seek",
        )
        .await;
        assert_eq!(player.seeks.lock().unwrap().clone(), vec![20.0]);
    }

    #[tokio::test]
    async fn test_rate_change_persists_and_applies() {
        let mut h = harness(default_sources(), catalog_of(12), no_skip());
        h.controller.bind(request("frieren", 1)).await.unwrap();
        assert_eq!(h.config(0).playback_rate, 1.0);

        h.player(0).emit(PlayerEvent::RateChanged(1.5));
        for _ in 0..200 {
            if h.db.playback_rate().await.ok().flatten() == Some(1.5) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(h.db.playback_rate().await.unwrap(), Some(1.5));

        // The next instance starts at the stored rate.
        h.db.set_watch_state("frieren", 2, 0.0).await.unwrap();
        h.controller.bind(request("frieren", 2)).await.unwrap();
        assert_eq!(h.config(1).playback_rate, 1.5);
    }
}
