//! Cancellable, restartable countdown for Bingo Hall rooms.
//!
//! A room paces its game with one countdown at a time: the delay before a
//! number is revealed, the pause after it, the idle time after a win. The
//! [`RoomTimer`] owns that countdown and is driven from inside the room
//! actor's `tokio::select!` loop:
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         Some(cmd) = cmd_rx.recv() => { /* may call timer.start / cancel */ }
//!         event = timer.wait() => match event {
//!             TimerEvent::Tick { remaining, .. } => { /* countdown broadcast */ }
//!             TimerEvent::Expired { .. } => { /* advance the state machine */ }
//!         }
//!     }
//! }
//! ```
//!
//! Because start, cancel and expiry are all handled by the one task that
//! owns the timer, they are totally ordered: an expiry that `wait` already
//! returned has happened, and a cancel processed first means the expiry
//! never fires.
//!
//! # Idle mode
//!
//! When nothing is armed, [`RoomTimer::wait`] pends forever, the same way
//! an event-driven tick scheduler does, so `select!` just serves the other
//! branches.

use std::time::Duration;

use tokio::time::{self, Instant};
use tracing::{debug, trace};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Timer settings.
#[derive(Debug, Clone, Default)]
pub struct TimerConfig {
    /// Emit [`TimerEvent::Tick`] this often while a countdown runs.
    /// `None` (the default) means only [`TimerEvent::Expired`] is emitted.
    pub tick_interval: Option<Duration>,
}

impl TimerConfig {
    /// Shortest tick interval accepted. Anything below is raised to this.
    pub const MIN_TICK_INTERVAL: Duration = Duration::from_millis(10);

    /// Config that ticks every `interval`.
    pub fn with_ticks(interval: Duration) -> Self {
        Self {
            tick_interval: Some(interval),
        }
    }

    /// Raises a too-small tick interval to [`Self::MIN_TICK_INTERVAL`].
    pub fn validated(mut self) -> Self {
        if let Some(interval) = self.tick_interval {
            if interval < Self::MIN_TICK_INTERVAL {
                debug!(
                    interval_ms = interval.as_millis() as u64,
                    "tick interval below minimum, raising"
                );
                self.tick_interval = Some(Self::MIN_TICK_INTERVAL);
            }
        }
        self
    }
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Identifies one `start` call. Events carry the generation of the run
/// that produced them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerGeneration(u64);

impl TimerGeneration {
    /// The raw counter value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

/// What [`RoomTimer::wait`] resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    /// The countdown is still running; `remaining` is left until expiry.
    Tick {
        generation: TimerGeneration,
        remaining: Duration,
    },
    /// The countdown reached zero. Fires once per `start`.
    Expired { generation: TimerGeneration },
}

// ---------------------------------------------------------------------------
// Timer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
struct Countdown {
    generation: TimerGeneration,
    deadline: Instant,
    next_tick: Option<Instant>,
}

/// A single countdown slot.
///
/// One `RoomTimer` per room. Starting a new countdown discards the old one.
#[derive(Debug)]
pub struct RoomTimer {
    tick_interval: Option<Duration>,
    armed: Option<Countdown>,
    generation: u64,
}

impl RoomTimer {
    /// Creates an idle timer.
    pub fn new(config: TimerConfig) -> Self {
        let config = config.validated();
        Self {
            tick_interval: config.tick_interval,
            armed: None,
            generation: 0,
        }
    }

    /// Arms a countdown of `duration`, replacing any countdown in progress.
    ///
    /// The replaced run produces no further events.
    pub fn start(&mut self, duration: Duration) -> TimerGeneration {
        if let Some(prev) = self.armed.take() {
            trace!(generation = prev.generation.0, "countdown replaced");
        }
        self.generation += 1;
        let generation = TimerGeneration(self.generation);
        let now = Instant::now();
        let deadline = now + duration;
        let next_tick = self
            .tick_interval
            .map(|interval| now + interval)
            .filter(|tick| *tick < deadline);

        self.armed = Some(Countdown {
            generation,
            deadline,
            next_tick,
        });
        debug!(
            generation = generation.0,
            duration_ms = duration.as_millis() as u64,
            "countdown started"
        );
        generation
    }

    /// Disarms the current countdown. Safe to call any number of times.
    ///
    /// Returns `true` if a countdown was running.
    pub fn cancel(&mut self) -> bool {
        match self.armed.take() {
            Some(countdown) => {
                debug!(generation = countdown.generation.0, "countdown cancelled");
                true
            }
            None => false,
        }
    }

    /// Whether a countdown is running.
    pub fn is_armed(&self) -> bool {
        self.armed.is_some()
    }

    /// Time left on the running countdown.
    pub fn remaining(&self) -> Option<Duration> {
        self.armed
            .map(|c| c.deadline.saturating_duration_since(Instant::now()))
    }

    /// Generation of the running countdown.
    pub fn generation(&self) -> Option<TimerGeneration> {
        self.armed.map(|c| c.generation)
    }

    /// Waits for the next tick or the expiry of the running countdown.
    ///
    /// Pends forever while idle. Cancel-safe: the timer's state only changes
    /// after the sleep completes, so dropping this future (e.g. because
    /// another `select!` branch won) loses nothing.
    pub async fn wait(&mut self) -> TimerEvent {
        let Some(countdown) = self.armed else {
            std::future::pending::<()>().await;
            unreachable!("pending never resolves")
        };

        let wake_at = match countdown.next_tick {
            Some(tick) if tick < countdown.deadline => tick,
            _ => countdown.deadline,
        };
        time::sleep_until(wake_at).await;

        let now = Instant::now();
        if now >= countdown.deadline {
            self.armed = None;
            trace!(generation = countdown.generation.0, "countdown expired");
            return TimerEvent::Expired {
                generation: countdown.generation,
            };
        }

        // Tick: schedule the following one, or none if it would land at or
        // past the deadline.
        let next_tick = self
            .tick_interval
            .map(|interval| wake_at + interval)
            .filter(|tick| *tick < countdown.deadline);
        self.armed = Some(Countdown {
            next_tick,
            ..countdown
        });

        TimerEvent::Tick {
            generation: countdown.generation,
            remaining: countdown.deadline - now,
        }
    }
}

impl Default for RoomTimer {
    fn default() -> Self {
        Self::new(TimerConfig::default())
    }
}
