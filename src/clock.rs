//! Frame pacing.
//!
//! One clock per loop: `delta_ms` feeds the simulation, `throttle` sleeps
//! away whatever is left of the tick so an idle match does not spin.

use std::thread;
use std::time::{Duration, Instant};

/// Wall-clock source for one game loop
#[derive(Debug)]
pub struct GameClock {
    start: Instant,
    last_tick: Instant,
}

impl GameClock {
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            start: now,
            last_tick: now,
        }
    }

    /// Seconds since the clock was created
    pub fn elapsed_secs(&self) -> f32 {
        self.start.elapsed().as_secs_f32()
    }

    /// Milliseconds since the previous call, capped so a stall (debugger,
    /// suspended terminal) does not slam the simulation forward
    pub fn delta_ms(&mut self) -> u32 {
        const MAX_DELTA_MS: u128 = 250;

        let now = Instant::now();
        let delta = now.duration_since(self.last_tick).as_millis().min(MAX_DELTA_MS);
        self.last_tick = now;
        delta as u32
    }

    /// Sleep out the remainder of a tick that started at the previous
    /// `delta_ms` call
    pub fn throttle(&self, tick_ms: u32) {
        let spent = self.last_tick.elapsed();
        let budget = Duration::from_millis(tick_ms as u64);
        if let Some(remaining) = budget.checked_sub(spent) {
            thread::sleep(remaining);
        }
    }
}

impl Default for GameClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delta_accumulates_between_calls() {
        let mut clock = GameClock::new();
        thread::sleep(Duration::from_millis(15));
        let delta = clock.delta_ms();
        assert!(delta >= 10, "delta was {delta}");
        // Second call right away reads near zero.
        assert!(clock.delta_ms() < 10);
    }

    #[test]
    fn delta_is_capped_after_a_stall() {
        let mut clock = GameClock::new();
        clock.last_tick = Instant::now() - Duration::from_secs(5);
        assert_eq!(clock.delta_ms(), 250);
    }

    #[test]
    fn throttle_returns_quickly_when_budget_is_spent() {
        let mut clock = GameClock::new();
        thread::sleep(Duration::from_millis(5));
        clock.delta_ms();
        let before = Instant::now();
        clock.throttle(0);
        assert!(before.elapsed() < Duration::from_millis(20));
    }
}
