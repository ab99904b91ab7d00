// Copyright (C) 2025  Tom Waddington
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published
// by the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Poll loop for padcast
//!
//! Stands in for the host: asks the sequencer for a frame once per poll
//! interval and hands it to a sink, until the tick limit or Ctrl-C.

use anyhow::Result;
use rand::Rng;
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::time::Duration;
use tokio::time::{Instant, sleep_until};
use tracing::info;

use crate::sequencer::Sequencer;
use crate::sink::FrameSink;
use crate::types::PlaybackConfig;

pub struct Transport<S: FrameSink> {
    sink: S,
    config: PlaybackConfig,
    running: Arc<AtomicBool>,
}

impl<S: FrameSink> Transport<S> {
    /// Installs the Ctrl-C handler. Only one transport per process may do so.
    pub fn new(sink: S, config: PlaybackConfig) -> Result<Self> {
        let running = Arc::new(AtomicBool::new(true));

        let r = running.clone();
        ctrlc::set_handler(move || {
            eprintln!("\nReceived Ctrl-C, stopping playback...");
            r.store(false, Ordering::SeqCst);
        })?;

        Ok(Self::with_stop_flag(sink, config, running))
    }

    /// Uses a caller-owned flag; clearing it stops the loop before the next tick.
    pub fn with_stop_flag(sink: S, config: PlaybackConfig, running: Arc<AtomicBool>) -> Self {
        Self {
            sink,
            config,
            running,
        }
    }

    fn should_continue(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn calculate_delay(&self) -> Duration {
        let mut rng = rand::rng();
        let base_us = self.config.poll_interval.as_micros() as u64;
        let jitter_us = (base_us as f64 * self.config.jitter) as u64;

        if jitter_us > 0 {
            let variation = rng.random_range(0..=jitter_us * 2);
            let delay = base_us.saturating_add(variation).saturating_sub(jitter_us);
            Duration::from_micros(delay)
        } else {
            Duration::from_micros(base_us)
        }
    }

    /// Runs until `limit` ticks have been delivered, or forever when `None`.
    ///
    /// Returns the number of ticks delivered.
    pub async fn run(&mut self, sequencer: &mut Sequencer, limit: Option<u64>) -> Result<u64> {
        let poll_ms = self.config.poll_interval.as_secs_f64() * 1000.0;
        info!(
            poll_ms,
            jitter = self.config.jitter,
            phases = sequencer.program().len(),
            "playback started"
        );

        // Deadlines are absolute so sink and engine time never accumulates
        let mut deadline = Instant::now();
        let mut ticks = 0u64;
        while self.should_continue() && limit.is_none_or(|limit| ticks < limit) {
            let tick = sequencer.next_tick();
            self.sink.send(&tick)?;
            ticks += 1;

            let delay = self.calculate_delay();
            if delay.is_zero() {
                // Let the stop flag's writer and other tasks run
                tokio::task::yield_now().await;
            } else {
                deadline += delay;
                sleep_until(deadline).await;
            }
        }

        self.sink.finish()?;
        info!(
            ticks,
            phase = sequencer.state().phase(),
            slot = sequencer.state().slot(),
            "playback stopped"
        );
        Ok(ticks)
    }

    pub fn into_sink(self) -> S {
        self.sink
    }
}
