//! Playback state supplied by the host and playback-head interpolation

use std::f32::consts::TAU;
use std::time::Instant;

/// Host-owned playback state, read once per frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackState {
    pub is_playing: bool,
    /// Seconds, as of `previous_timestamp`
    pub current_position: f32,
    /// Seconds
    pub duration: f32,
    /// Wall-clock time of the last authoritative position update
    pub previous_timestamp: Instant,
    /// 0.0-1.0
    pub volume: f32,
    pub is_hover_seek_active: bool,
    /// Radians, 0 = top, clockwise
    pub hover_angle: Option<f32>,
}

impl PlaybackState {
    /// Nothing loaded: paused at 0 with full volume
    pub fn stopped(now: Instant) -> Self {
        Self {
            is_playing: false,
            current_position: 0.0,
            duration: 0.0,
            previous_timestamp: now,
            volume: 1.0,
            is_hover_seek_active: false,
            hover_angle: None,
        }
    }

    /// Hover angle to draw, only while a seek preview is active
    pub fn active_hover_angle(&self) -> Option<f32> {
        self.hover_angle.filter(|_| self.is_hover_seek_active)
    }
}

/// Position extrapolated from the last authoritative update
///
/// While playing, the wall-clock time elapsed since `previous_timestamp` is added to the
/// reported position; the result never runs past the track duration.
pub fn interpolated_position(state: &PlaybackState, now: Instant) -> f32 {
    let elapsed = if state.is_playing {
        now.saturating_duration_since(state.previous_timestamp)
            .as_secs_f32()
    } else {
        0.0
    };
    let position = state.current_position + elapsed;
    if state.duration > 0.0 {
        position.clamp(0.0, state.duration)
    } else {
        position.max(0.0)
    }
}

/// Playback head angle in radians, 0 at the top
pub fn playback_angle(state: &PlaybackState, now: Instant) -> f32 {
    if state.duration <= 0.0 {
        return 0.0;
    }
    TAU * interpolated_position(state, now) / state.duration
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn playing(now: Instant, position: f32) -> PlaybackState {
        PlaybackState {
            is_playing: true,
            current_position: position,
            duration: 100.0,
            ..PlaybackState::stopped(now)
        }
    }

    #[test]
    fn test_extrapolates_while_playing() {
        let t0 = Instant::now();
        let state = playing(t0, 10.0);
        let later = t0 + Duration::from_millis(1500);
        assert!((interpolated_position(&state, later) - 11.5).abs() < 1e-4);
        let expected = TAU * 11.5 / 100.0;
        assert!((playback_angle(&state, later) - expected).abs() < 1e-4);
    }

    #[test]
    fn test_paused_does_not_advance() {
        let t0 = Instant::now();
        let state = PlaybackState {
            is_playing: false,
            ..playing(t0, 25.0)
        };
        let later = t0 + Duration::from_secs(5);
        assert_eq!(interpolated_position(&state, later), 25.0);
        assert!((playback_angle(&state, later) - TAU / 4.0).abs() < 1e-5);
    }

    #[test]
    fn test_clamped_to_duration() {
        let t0 = Instant::now();
        let state = playing(t0, 99.0);
        let later = t0 + Duration::from_secs(10);
        assert_eq!(interpolated_position(&state, later), 100.0);
        assert!((playback_angle(&state, later) - TAU).abs() < 1e-5);
    }

    #[test]
    fn test_unknown_duration_draws_at_top() {
        let t0 = Instant::now();
        assert_eq!(playback_angle(&PlaybackState::stopped(t0), t0), 0.0);
    }

    #[test]
    fn test_timestamp_in_future_is_not_negative() {
        let t0 = Instant::now();
        let state = playing(t0 + Duration::from_secs(1), 10.0);
        assert_eq!(interpolated_position(&state, t0), 10.0);
    }

    #[test]
    fn test_hover_angle_requires_active_seek() {
        let t0 = Instant::now();
        let mut state = PlaybackState {
            hover_angle: Some(1.0),
            ..PlaybackState::stopped(t0)
        };
        assert_eq!(state.active_hover_angle(), None);
        state.is_hover_seek_active = true;
        assert_eq!(state.active_hover_angle(), Some(1.0));
    }
}
