//! Session controller: run state, spawn timer, sheep count and tone ownership.
//!
//! All mutation happens from one event loop. Time is passed in explicitly so
//! the lifecycle is deterministic under test.

use std::collections::HashSet;
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::audio::{AmbientTone, Teardown, ToneSource};
use crate::params::SessionTiming;

/// Identity of one spawned sheep
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SheepId(pub u64);

impl fmt::Display for SheepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sheep#{}", self.0)
    }
}

/// Session lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunState {
    /// Never started: no timer, no audio
    #[default]
    Idle,
    /// Spawning on a timer, tone sounding
    Running,
    /// Timer cancelled, sheep frozen, tone fading out
    Paused,
}

/// Presentation layer for sheep sprites
pub trait Presentation {
    fn spawn(&mut self, id: SheepId);
    fn freeze_all(&mut self);
    fn resume_all(&mut self);
    fn remove(&mut self, id: SheepId);
}

/// Receives the formatted count whenever it changes
pub trait CountDisplay {
    fn show(&mut self, text: &str);
}

/// Messages the session reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    StartRequested,
    StopRequested,
    UnitCompleted(SheepId),
}

/// Text shown for a given count
pub fn count_label(count: u64) -> String {
    format!("Sheep Count: {}", count)
}

/// Repeating timer polled by the event loop
#[derive(Debug, Clone)]
struct SpawnTimer {
    period: Duration,
    next_due: Instant,
}

impl SpawnTimer {
    fn armed(period: Duration, now: Instant) -> Self {
        Self {
            period,
            next_due: now + period,
        }
    }

    /// Number of periods elapsed since the last poll
    fn take_due(&mut self, now: Instant) -> u32 {
        let mut fired = 0;
        while self.next_due <= now {
            self.next_due += self.period;
            fired += 1;
        }
        fired
    }
}

/// Owns run state, the spawn timer, the count and the ambient tone
pub struct SessionController<P, D, S: ToneSource> {
    presentation: P,
    display: D,
    tones: Option<S>,
    timing: SessionTiming,

    state: RunState,
    timer: Option<SpawnTimer>,
    count: u64,
    next_id: u64,
    live: HashSet<SheepId>,

    tone: Option<S::Tone>,
    /// Teardown handed off by the last `stop()`
    fading: Option<Teardown>,
    /// Tone construction waiting for `fading` to finish
    tone_deferred: bool,
}

impl<P, D, S> SessionController<P, D, S>
where
    P: Presentation,
    D: CountDisplay,
    S: ToneSource,
{
    /// Create an idle session; `tones` of `None` runs visual-only
    pub fn new(presentation: P, display: D, tones: Option<S>, timing: SessionTiming) -> Self {
        Self {
            presentation,
            display,
            tones,
            timing,
            state: RunState::Idle,
            timer: None,
            count: 0,
            next_id: 0,
            live: HashSet::new(),
            tone: None,
            fading: None,
            tone_deferred: false,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    /// Number of spawned sheep that have not completed
    pub fn live_units(&self) -> usize {
        self.live.len()
    }

    pub fn has_tone(&self) -> bool {
        self.tone.is_some()
    }

    pub fn presentation(&self) -> &P {
        &self.presentation
    }

    pub fn presentation_mut(&mut self) -> &mut P {
        &mut self.presentation
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    /// Dispatch one event
    pub fn handle(&mut self, event: SessionEvent, now: Instant) {
        match event {
            SessionEvent::StartRequested => self.on_start_requested(now),
            SessionEvent::StopRequested => self.on_stop_requested(),
            SessionEvent::UnitCompleted(id) => self.on_unit_completed(id),
        }
    }

    /// User start action: start, then wake a suspended output
    pub fn on_start_requested(&mut self, now: Instant) {
        self.start(now);
        if let Some(tone) = self.tone.as_mut() {
            tone.resume();
        }
    }

    /// User stop action
    pub fn on_stop_requested(&mut self) {
        self.stop();
    }

    /// Begin (or resume) spawning and sound the tone
    pub fn start(&mut self, now: Instant) {
        if self.state == RunState::Running {
            return;
        }

        if self.state == RunState::Paused {
            self.presentation.resume_all();
        }
        self.state = RunState::Running;
        info!(count = self.count, "counting started");

        self.spawn_unit();
        self.timer = Some(SpawnTimer::armed(self.timing.spawn_period(), now));

        self.tone_deferred = true;
        self.ensure_tone();
    }

    /// Cancel spawning, freeze sheep in place and fade the tone out
    pub fn stop(&mut self) {
        if self.timer.take().is_some() {
            debug!("spawn timer cancelled");
        }
        if self.state != RunState::Running {
            return;
        }

        self.state = RunState::Paused;
        self.presentation.freeze_all();
        self.tone_deferred = false;

        if let Some(tone) = self.tone.take() {
            self.fading = Some(tone.stop());
            debug!("lullaby handed off for teardown");
        }
        info!(count = self.count, live = self.live.len(), "counting paused");
    }

    /// Fire due spawn ticks and retry a deferred tone
    pub fn tick(&mut self, now: Instant) {
        let due = self.timer.as_mut().map_or(0, |timer| timer.take_due(now));
        for _ in 0..due {
            self.spawn_unit();
        }

        if self.tone_deferred {
            self.ensure_tone();
        }
    }

    /// A sheep finished crossing
    pub fn on_unit_completed(&mut self, id: SheepId) {
        if !self.live.remove(&id) {
            debug!(%id, "ignoring completion for unknown sheep");
            return;
        }

        self.presentation.remove(id);
        self.count += 1;
        let label = count_label(self.count);
        info!("{}", label);
        self.display.show(&label);
    }

    fn spawn_unit(&mut self) {
        let id = SheepId(self.next_id);
        self.next_id += 1;
        self.live.insert(id);
        self.presentation.spawn(id);
        debug!(%id, "spawned");
    }

    /// Open a tone unless one exists, audio is off, or a teardown is still in flight
    fn ensure_tone(&mut self) {
        if self.tone.is_some() {
            self.tone_deferred = false;
            return;
        }
        let Some(source) = self.tones.as_mut() else {
            self.tone_deferred = false;
            return;
        };

        if let Some(fading) = &self.fading {
            if !fading.is_complete() {
                debug!("previous lullaby still tearing down; deferring");
                return;
            }
            self.fading = None;
        }

        self.tone_deferred = false;
        match source.open() {
            Ok(tone) => self.tone = Some(tone),
            Err(e) => warn!("Unable to start lullaby audio: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{AudioError, TeardownSignal};
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        Spawn(SheepId),
        FreezeAll,
        ResumeAll,
        Remove(SheepId),
    }

    #[derive(Default)]
    struct RecordingPresentation {
        calls: Vec<Call>,
    }

    impl RecordingPresentation {
        fn spawned(&self) -> Vec<SheepId> {
            self.calls
                .iter()
                .filter_map(|c| match c {
                    Call::Spawn(id) => Some(*id),
                    _ => None,
                })
                .collect()
        }

        fn count_of(&self, call: &Call) -> usize {
            self.calls.iter().filter(|c| *c == call).count()
        }
    }

    impl Presentation for RecordingPresentation {
        fn spawn(&mut self, id: SheepId) {
            self.calls.push(Call::Spawn(id));
        }
        fn freeze_all(&mut self) {
            self.calls.push(Call::FreezeAll);
        }
        fn resume_all(&mut self) {
            self.calls.push(Call::ResumeAll);
        }
        fn remove(&mut self, id: SheepId) {
            self.calls.push(Call::Remove(id));
        }
    }

    #[derive(Default)]
    struct RecordingDisplay {
        shown: Vec<String>,
    }

    impl CountDisplay for RecordingDisplay {
        fn show(&mut self, text: &str) {
            self.shown.push(text.to_string());
        }
    }

    /// Shared log of what fake tones were asked to do
    #[derive(Default)]
    struct ToneLog {
        opened: usize,
        stopped: usize,
        resumed: usize,
        pending: Vec<TeardownSignal>,
    }

    struct FakeTone {
        log: Rc<RefCell<ToneLog>>,
    }

    impl AmbientTone for FakeTone {
        fn stop(self) -> Teardown {
            let (teardown, signal) = Teardown::pending();
            let mut log = self.log.borrow_mut();
            log.stopped += 1;
            log.pending.push(signal);
            teardown
        }

        fn resume(&mut self) {
            self.log.borrow_mut().resumed += 1;
        }
    }

    struct FakeSource {
        log: Rc<RefCell<ToneLog>>,
        fail: bool,
    }

    impl ToneSource for FakeSource {
        type Tone = FakeTone;

        fn open(&mut self) -> Result<FakeTone, AudioError> {
            if self.fail {
                return Err(AudioError::NoDevice);
            }
            self.log.borrow_mut().opened += 1;
            Ok(FakeTone {
                log: Rc::clone(&self.log),
            })
        }
    }

    type TestSession = SessionController<RecordingPresentation, RecordingDisplay, FakeSource>;

    fn session(fail_audio: bool) -> (TestSession, Rc<RefCell<ToneLog>>) {
        let log = Rc::new(RefCell::new(ToneLog::default()));
        let source = FakeSource {
            log: Rc::clone(&log),
            fail: fail_audio,
        };
        let controller = SessionController::new(
            RecordingPresentation::default(),
            RecordingDisplay::default(),
            Some(source),
            SessionTiming::default(),
        );
        (controller, log)
    }

    fn finish_teardowns(log: &Rc<RefCell<ToneLog>>) {
        for signal in log.borrow_mut().pending.drain(..) {
            signal.complete();
        }
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_initial_state() {
        let (session, log) = session(false);
        assert_eq!(session.state(), RunState::Idle);
        assert_eq!(session.count(), 0);
        assert!(!session.has_tone());
        assert_eq!(log.borrow().opened, 0);
    }

    #[test]
    fn test_start_spawns_immediately_and_opens_tone() {
        let (mut session, log) = session(false);
        let t0 = Instant::now();

        session.start(t0);
        assert_eq!(session.state(), RunState::Running);
        assert_eq!(session.presentation().spawned(), vec![SheepId(0)]);
        assert!(session.has_tone());
        assert_eq!(log.borrow().opened, 1);
    }

    #[test]
    fn test_spawns_once_per_period() {
        let (mut session, _log) = session(false);
        let t0 = Instant::now();
        session.start(t0);

        session.tick(t0 + ms(1999));
        assert_eq!(session.presentation().spawned().len(), 1);
        session.tick(t0 + ms(2000));
        assert_eq!(session.presentation().spawned().len(), 2);
        session.tick(t0 + ms(2500));
        assert_eq!(session.presentation().spawned().len(), 2);

        // A long frame catches up on every missed tick
        session.tick(t0 + ms(8000));
        assert_eq!(session.presentation().spawned().len(), 5);
    }

    #[test]
    fn test_duplicate_start_arms_no_extra_timer() {
        let (mut session, log) = session(false);
        let t0 = Instant::now();
        session.start(t0);
        session.start(t0 + ms(500));
        session.on_start_requested(t0 + ms(900));

        session.tick(t0 + ms(6000));
        // Initial spawn plus ticks at 2000, 4000, 6000
        assert_eq!(session.presentation().spawned().len(), 4);
        assert_eq!(log.borrow().opened, 1);
        assert_eq!(log.borrow().resumed, 1);
    }

    #[test]
    fn test_stop_freezes_and_cancels_timer() {
        let (mut session, log) = session(false);
        let t0 = Instant::now();
        session.start(t0);
        session.tick(t0 + ms(2000));

        session.stop();
        assert_eq!(session.state(), RunState::Paused);
        assert_eq!(session.presentation().count_of(&Call::FreezeAll), 1);
        assert!(!session.has_tone());
        assert_eq!(log.borrow().stopped, 1);

        session.tick(t0 + ms(20_000));
        assert_eq!(session.presentation().spawned().len(), 2);
    }

    #[test]
    fn test_duplicate_stop_has_no_effect() {
        let (mut session, log) = session(false);
        let t0 = Instant::now();

        // Stop before any start is a no-op
        session.stop();
        assert_eq!(session.state(), RunState::Idle);
        assert!(session.presentation().calls.is_empty());

        session.start(t0);
        session.stop();
        let calls_after_first_stop = session.presentation().calls.len();
        session.stop();
        session.on_stop_requested();

        assert_eq!(session.presentation().calls.len(), calls_after_first_stop);
        assert_eq!(log.borrow().stopped, 1);
    }

    #[test]
    fn test_completion_counts_once() {
        let (mut session, _log) = session(false);
        let t0 = Instant::now();
        session.start(t0);

        session.on_unit_completed(SheepId(0));
        session.on_unit_completed(SheepId(0));
        session.on_unit_completed(SheepId(42));

        assert_eq!(session.count(), 1);
        assert_eq!(session.display().shown, vec!["Sheep Count: 1"]);
        assert_eq!(session.presentation().count_of(&Call::Remove(SheepId(0))), 1);
    }

    #[test]
    fn test_completion_after_stop_is_safe() {
        let (mut session, _log) = session(false);
        let t0 = Instant::now();
        session.start(t0);
        session.stop();

        session.handle(SessionEvent::UnitCompleted(SheepId(0)), t0 + ms(20));
        assert_eq!(session.count(), 1);
        assert_eq!(session.live_units(), 0);
    }

    #[test]
    fn test_audio_failure_keeps_spawning() {
        let (mut session, _log) = session(true);
        let t0 = Instant::now();
        session.start(t0);

        assert!(!session.has_tone());
        session.tick(t0 + ms(4000));
        assert_eq!(session.presentation().spawned().len(), 3);

        // No retry on later ticks or stop
        session.tick(t0 + ms(4100));
        session.stop();
        assert_eq!(session.state(), RunState::Paused);
    }

    #[test]
    fn test_visual_only_without_source() {
        let mut session: TestSession = SessionController::new(
            RecordingPresentation::default(),
            RecordingDisplay::default(),
            None,
            SessionTiming::default(),
        );
        let t0 = Instant::now();
        session.start(t0);
        session.stop();
        session.start(t0 + ms(2));
        assert!(!session.has_tone());
        assert_eq!(session.presentation().spawned().len(), 2);
    }

    #[test]
    fn test_restart_waits_for_previous_teardown() {
        let (mut session, log) = session(false);
        let t0 = Instant::now();

        session.start(t0);
        session.stop();
        session.start(t0 + ms(200));

        // Old tone still fading: no second generator yet
        assert!(!session.has_tone());
        assert_eq!(log.borrow().opened, 1);
        session.tick(t0 + ms(1000));
        assert_eq!(log.borrow().opened, 1);

        finish_teardowns(&log);
        session.tick(t0 + ms(2300));
        assert!(session.has_tone());
        assert_eq!(log.borrow().opened, 2);
    }

    #[test]
    fn test_abandoned_teardown_counts_as_released() {
        let (mut session, log) = session(false);
        let t0 = Instant::now();

        session.start(t0);
        session.stop();
        session.start(t0 + ms(200));
        assert!(!session.has_tone());

        // Audio thread died without completing its teardown
        log.borrow_mut().pending.clear();
        session.tick(t0 + ms(400));
        assert!(session.has_tone());
        assert_eq!(log.borrow().opened, 2);
    }

    #[test]
    fn test_stop_during_deferred_restart_opens_nothing() {
        let (mut session, log) = session(false);
        let t0 = Instant::now();

        session.start(t0);
        session.stop();
        session.start(t0 + ms(200));
        session.stop();

        finish_teardowns(&log);
        session.tick(t0 + ms(3000));
        assert!(!session.has_tone());
        assert_eq!(log.borrow().opened, 1);
        assert_eq!(log.borrow().stopped, 1);
    }

    #[test]
    fn test_end_to_end_scenario() {
        let (mut session, _log) = session(false);
        let t0 = Instant::now();

        session.handle(SessionEvent::StartRequested, t0);
        session.tick(t0 + ms(5000));
        let spawned = session.presentation().spawned();
        assert_eq!(spawned.len(), 3);
        assert_eq!(session.live_units(), 3);

        for id in spawned {
            session.handle(SessionEvent::UnitCompleted(id), t0 + ms(5000));
        }
        assert_eq!(session.count(), 3);
        assert_eq!(
            session.display().shown.last().map(String::as_str),
            Some("Sheep Count: 3")
        );

        session.tick(t0 + ms(6000));
        session.handle(SessionEvent::StopRequested, t0 + ms(6500));
        session.tick(t0 + ms(12_000));
        assert_eq!(session.presentation().spawned().len(), 4);

        session.handle(SessionEvent::StartRequested, t0 + ms(13_000));
        assert_eq!(session.state(), RunState::Running);
        assert_eq!(session.presentation().count_of(&Call::ResumeAll), 1);
        assert_eq!(session.presentation().spawned().len(), 5);

        // Count never went backwards
        assert_eq!(session.count(), 3);
    }
}
