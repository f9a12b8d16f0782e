//! Review carousel rotation.
//!
//! `Carousel` is the index/autoplay state machine; `Autoplay` owns the timer
//! task that ticks it and cancels that task on `stop` or drop.

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use tokio::{
    task::JoinHandle,
    time::{interval_at, Instant, MissedTickBehavior},
};
use tracing::{debug, trace};

pub const DEFAULT_AUTOPLAY_PERIOD: Duration = Duration::from_secs(7);
/// Horizontal drag distance a swipe must exceed.
pub const SWIPE_THRESHOLD_PX: f32 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoplayState {
    Idle,
    Running,
    /// Suspended by an interaction; resumes when it ends.
    Paused,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwipeDirection {
    /// Finger moved left: show the next item.
    Left,
    Right,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Carousel {
    index: Option<usize>,
    len: usize,
    autoplay: AutoplayState,
    /// Set by `start`, cleared by `stop`. Survives stretches with too few
    /// items to rotate.
    wants_autoplay: bool,
    touch_origin: Option<f32>,
}

impl Carousel {
    pub fn new(len: usize) -> Self {
        Self {
            index: (len > 0).then_some(0),
            len,
            autoplay: AutoplayState::Idle,
            wants_autoplay: false,
            touch_origin: None,
        }
    }

    /// `None` when there is nothing to show.
    pub fn index(&self) -> Option<usize> {
        self.index
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn autoplay(&self) -> AutoplayState {
        self.autoplay
    }

    /// Navigation and autoplay need at least two items.
    pub fn is_navigable(&self) -> bool {
        self.len > 1
    }

    pub fn set_len(&mut self, len: usize) {
        self.len = len;
        self.index = match (len, self.index) {
            (0, _) => None,
            (_, Some(index)) if index < len => Some(index),
            _ => Some(0),
        };
        if !self.is_navigable() {
            self.autoplay = AutoplayState::Idle;
        } else if self.wants_autoplay && self.autoplay == AutoplayState::Idle {
            self.autoplay = AutoplayState::Running;
        }
    }

    /// Turns autoplay on. With fewer than two items the carousel stays
    /// `Idle` until `set_len` grows it.
    pub fn start(&mut self) {
        self.wants_autoplay = true;
        if self.is_navigable() {
            self.autoplay = AutoplayState::Running;
        }
    }

    pub fn stop(&mut self) {
        self.wants_autoplay = false;
        self.autoplay = AutoplayState::Idle;
    }

    fn pause(&mut self) {
        if self.autoplay == AutoplayState::Running {
            self.autoplay = AutoplayState::Paused;
        }
    }

    fn resume(&mut self) {
        if self.autoplay == AutoplayState::Paused {
            self.autoplay = AutoplayState::Running;
        }
    }

    fn step(&mut self, forward: bool) -> bool {
        let Some(index) = self.index.filter(|_| self.is_navigable()) else {
            return false;
        };
        let next = if forward {
            (index + 1) % self.len
        } else {
            (index + self.len - 1) % self.len
        };
        self.index = Some(next);
        true
    }

    /// Timer callback. Advances with wrap-around only while running.
    pub fn tick(&mut self) -> bool {
        if self.autoplay != AutoplayState::Running {
            return false;
        }
        let moved = self.step(true);
        trace!(index = ?self.index, moved, "carousel tick");
        moved
    }

    pub fn go_to_next(&mut self) {
        self.pause();
        self.step(true);
    }

    pub fn go_to_previous(&mut self) {
        self.pause();
        self.step(false);
    }

    /// Out-of-range indices are ignored.
    pub fn go_to_index(&mut self, index: usize) {
        if index >= self.len || !self.is_navigable() {
            return;
        }
        self.pause();
        self.index = Some(index);
    }

    pub fn pointer_enter(&mut self) {
        self.pause();
    }

    pub fn pointer_leave(&mut self) {
        self.resume();
    }

    pub fn touch_start(&mut self, x: f32) {
        self.touch_origin = Some(x);
        self.pause();
    }

    pub fn touch_end(&mut self, x: f32) -> Option<SwipeDirection> {
        let swiped = self
            .touch_origin
            .take()
            .and_then(|origin| self.swipe(x - origin));
        self.resume();
        swiped
    }

    /// Applies a horizontal drag. Negative `delta_x` is a drag to the left.
    /// Drags within the threshold are ignored.
    pub fn swipe(&mut self, delta_x: f32) -> Option<SwipeDirection> {
        if !self.is_navigable() || delta_x.abs() <= SWIPE_THRESHOLD_PX {
            return None;
        }
        let direction = if delta_x < 0.0 {
            SwipeDirection::Left
        } else {
            SwipeDirection::Right
        };
        self.step(direction == SwipeDirection::Left);
        debug!(?direction, index = ?self.index, "carousel swiped");
        Some(direction)
    }
}

/// Ticks a shared carousel on a fixed period from a spawned task.
#[derive(Debug)]
pub struct Autoplay {
    carousel: Arc<Mutex<Carousel>>,
    task: Option<JoinHandle<()>>,
}

impl Autoplay {
    /// Sets the carousel running and spawns the timer. The timer keeps
    /// ticking until `stop` or drop, so a carousel that is empty now starts
    /// rotating once it has items. Must be called within a tokio runtime.
    pub fn start(carousel: Arc<Mutex<Carousel>>, period: Duration) -> Self {
        if let Ok(mut guard) = carousel.lock() {
            guard.start();
        }
        let shared = Arc::clone(&carousel);
        let task = tokio::spawn(async move {
            let mut timer = interval_at(Instant::now() + period, period);
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                timer.tick().await;
                let Ok(mut guard) = shared.lock() else {
                    break;
                };
                guard.tick();
            }
            debug!("carousel autoplay finished");
        });
        Self {
            carousel,
            task: Some(task),
        }
    }

    pub fn is_active(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        if let Ok(mut guard) = self.carousel.lock() {
            guard.stop();
        }
    }
}

impl Drop for Autoplay {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
#[path = "tests/carousel_tests.rs"]
mod tests;
