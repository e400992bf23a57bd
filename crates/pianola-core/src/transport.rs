use pianola_ports::playback::TransportState;
use pianola_ports::types::{Seconds, WallClockMs};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlaybackCursor {
    pub logical_time: Seconds,
    /// Wall-clock reading at which `logical_time` was zero, while anchored.
    pub origin_wall_clock: Option<WallClockMs>,
}

impl Default for PlaybackCursor {
    fn default() -> Self {
        Self {
            logical_time: 0.0,
            origin_wall_clock: None,
        }
    }
}

/// Maps host wall-clock readings onto logical playback time.
#[derive(Clone, Debug, Default)]
pub struct TransportClock {
    cursor: PlaybackCursor,
}

impl TransportClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cursor(&self) -> PlaybackCursor {
        self.cursor
    }

    pub fn logical_time(&self) -> Seconds {
        self.cursor.logical_time
    }

    pub fn is_anchored(&self) -> bool {
        self.cursor.origin_wall_clock.is_some()
    }

    /// Pins the origin so that `now_ms` maps to the current logical time.
    pub fn anchor(&mut self, now_ms: WallClockMs) {
        self.cursor.origin_wall_clock = Some(now_ms - self.cursor.logical_time * 1000.0);
    }

    /// Keeps the logical time, stops following the wall clock.
    pub fn freeze(&mut self) {
        self.cursor.origin_wall_clock = None;
    }

    pub fn reset(&mut self) {
        self.cursor = PlaybackCursor::default();
    }

    pub fn seek(&mut self, position: Seconds, now_ms: Option<WallClockMs>) {
        self.cursor.logical_time = position.max(0.0);
        match now_ms {
            Some(now_ms) => self.anchor(now_ms),
            None => self.freeze(),
        }
    }

    /// Follows the wall clock while anchored. Never moves backwards on its own.
    pub fn advance_to(&mut self, now_ms: WallClockMs) -> Seconds {
        if let Some(origin) = self.cursor.origin_wall_clock {
            let elapsed = (now_ms - origin) / 1000.0;
            if elapsed > self.cursor.logical_time {
                self.cursor.logical_time = elapsed;
            }
        }
        self.cursor.logical_time
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransportCommand {
    Play,
    Pause,
    Reset,
    Seek,
}

#[derive(Clone, Debug)]
pub struct Transport {
    state: TransportState,
    clock: TransportClock,
}

impl Transport {
    pub fn new() -> Self {
        Self {
            state: TransportState::Stopped,
            clock: TransportClock::new(),
        }
    }

    pub fn state(&self) -> TransportState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == TransportState::Playing
    }

    pub fn logical_time(&self) -> Seconds {
        self.clock.logical_time()
    }

    pub fn clock(&self) -> &TransportClock {
        &self.clock
    }

    /// Returns false when already playing.
    pub fn play(&mut self, now_ms: WallClockMs) -> bool {
        if self.state == TransportState::Playing {
            return false;
        }
        self.clock.anchor(now_ms);
        self.transition(TransportCommand::Play, TransportState::Playing);
        true
    }

    /// Returns false unless playing.
    pub fn pause(&mut self) -> bool {
        if self.state != TransportState::Playing {
            return false;
        }
        self.clock.freeze();
        self.transition(TransportCommand::Pause, TransportState::Paused);
        true
    }

    pub fn reset(&mut self) {
        self.clock.reset();
        self.transition(TransportCommand::Reset, TransportState::Stopped);
    }

    /// A stopped transport that is moved becomes paused at the new position.
    pub fn seek(&mut self, position: Seconds, now_ms: WallClockMs) {
        match self.state {
            TransportState::Playing => self.clock.seek(position, Some(now_ms)),
            TransportState::Paused => self.clock.seek(position, None),
            TransportState::Stopped => {
                self.clock.seek(position, None);
                self.transition(TransportCommand::Seek, TransportState::Paused);
            }
        }
    }

    pub fn advance_to(&mut self, now_ms: WallClockMs) -> Seconds {
        if self.state != TransportState::Playing {
            return self.clock.logical_time();
        }
        self.clock.advance_to(now_ms)
    }

    fn transition(&mut self, command: TransportCommand, next: TransportState) {
        log::debug!(
            "transport {:?}: {:?} -> {:?} at {:.3}s",
            command,
            self.state,
            next,
            self.clock.logical_time()
        );
        self.state = next;
    }
}

impl Default for Transport {
    fn default() -> Self {
        Self::new()
    }
}
