//! Frame scheduling state machine
//!
//! `Uninitialized -> Loading -> Running <-> Idle -> TornDown`. The scheduler never sees a
//! clock of its own: every call takes `now`, so the time policies below are testable.

use std::time::{Duration, Instant};

use super::playback::PlaybackState;

/// Paused with nothing changing for this long stops the frame loop
pub const IDLE_TIMEOUT: Duration = Duration::from_millis(3500);

/// Minimum spacing between processed frames on constrained devices
pub const MOBILE_INTERVAL: Duration = Duration::from_millis(33);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Uninitialized,
    /// Waiting for the tables
    Loading,
    Running,
    /// Suspended until something wakes it
    Idle,
    TornDown,
}

/// The playback fields idle detection compares between frames
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObservedPlayback {
    pub is_playing: bool,
    pub current_position: f32,
    pub is_hover_seek_active: bool,
    pub hover_angle: Option<f32>,
}

impl From<&PlaybackState> for ObservedPlayback {
    fn from(state: &PlaybackState) -> Self {
        Self {
            is_playing: state.is_playing,
            current_position: state.current_position,
            is_hover_seek_active: state.is_hover_seek_active,
            hover_angle: state.hover_angle,
        }
    }
}

/// Outcome of one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameDecision {
    /// Run the pipeline and draw
    Render,
    /// Throttled, skip this tick
    Drop,
    /// Went idle on this tick; stop ticking until woken
    Suspend,
    /// Not running
    Inactive,
}

/// Host events that resume an idle scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WakeReason {
    Resize,
    Visible,
    PlaybackChanged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Throttle to `min_interval`
    pub constrained: bool,
    pub idle_timeout: Duration,
    pub min_interval: Duration,
}

impl SchedulerConfig {
    pub fn new(constrained: bool) -> Self {
        Self {
            constrained,
            ..Self::default()
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            constrained: false,
            idle_timeout: IDLE_TIMEOUT,
            min_interval: MOBILE_INTERVAL,
        }
    }
}

#[derive(Debug)]
pub struct FrameScheduler {
    phase: Phase,
    config: SchedulerConfig,
    last_frame: Option<Instant>,
    /// Set while paused and unchanged; `None` means not idling
    idle_since: Option<Instant>,
    last_observed: Option<ObservedPlayback>,
}

impl FrameScheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            phase: Phase::Uninitialized,
            config,
            last_frame: None,
            idle_since: None,
            last_observed: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        self.phase == Phase::Running
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// `Uninitialized -> Loading`; false if already started
    pub fn begin_loading(&mut self) -> bool {
        if self.phase != Phase::Uninitialized {
            return false;
        }
        self.phase = Phase::Loading;
        true
    }

    /// `Loading -> Running` once the tables are in place
    pub fn tables_ready(&mut self, now: Instant) -> bool {
        if self.phase != Phase::Loading {
            return false;
        }
        log::debug!("Tables ready, scheduler running");
        self.phase = Phase::Running;
        self.reset_markers(now);
        true
    }

    /// Decide what to do on this tick
    pub fn decide(&mut self, now: Instant, observed: ObservedPlayback) -> FrameDecision {
        if self.phase != Phase::Running {
            return FrameDecision::Inactive;
        }

        let throttled = self.config.constrained
            && self
                .last_frame
                .is_some_and(|last| now.saturating_duration_since(last) < self.config.min_interval);
        if throttled {
            return FrameDecision::Drop;
        }

        let changed = self.last_observed != Some(observed);
        if observed.is_playing {
            self.idle_since = None;
        } else {
            match self.idle_since {
                Some(since)
                    if !changed
                        && now.saturating_duration_since(since) > self.config.idle_timeout =>
                {
                    log::debug!(
                        "Idle for {:?}, suspending",
                        now.saturating_duration_since(since)
                    );
                    self.phase = Phase::Idle;
                    return FrameDecision::Suspend;
                }
                Some(_) if !changed => {}
                _ => self.idle_since = Some(now),
            }
        }

        self.last_observed = Some(observed);
        self.last_frame = Some(now);
        FrameDecision::Render
    }

    /// Resume from Idle; true if the frame loop has to be restarted
    pub fn wake(&mut self, reason: WakeReason, now: Instant) -> bool {
        if self.phase != Phase::Idle {
            return false;
        }
        log::debug!("Waking scheduler: {:?}", reason);
        self.phase = Phase::Running;
        self.reset_markers(now);
        true
    }

    /// Surface hidden: `Running -> Idle`
    pub fn hide(&mut self) -> bool {
        if self.phase != Phase::Running {
            return false;
        }
        log::debug!("Surface hidden, suspending");
        self.phase = Phase::Idle;
        true
    }

    /// Final state; calling it again does nothing
    pub fn tear_down(&mut self) -> bool {
        if self.phase == Phase::TornDown {
            return false;
        }
        self.phase = Phase::TornDown;
        self.last_observed = None;
        self.idle_since = None;
        true
    }

    fn reset_markers(&mut self, now: Instant) {
        // The first frame after (re)starting is never throttled
        self.last_frame = None;
        self.idle_since = Some(now);
        self.last_observed = None;
    }
}
