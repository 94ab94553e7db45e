//! Cancellable delayed and periodic tasks owned by the controller.
//!
//! Nothing here spawns: the event loop sleeps until [`Scheduler::next_due`]
//! and then drains [`Scheduler::pop_due`]. Cancelling a group removes its
//! entries immediately, so a cancelled task can never run.

use std::time::Duration;
use tokio::time::Instant;

/// Lifetime bucket for a scheduled task. Track-scoped groups are cancelled
/// together whenever the current track is abandoned or stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskGroup {
    Progress,
    Loop,
    Fade,
    Transition,
    Notification,
    Recovery,
}

impl TaskGroup {
    pub const TRACK_SCOPED: [TaskGroup; 5] =
        [Self::Progress, Self::Loop, Self::Fade, Self::Transition, Self::Recovery];
}

#[derive(Debug, Clone, PartialEq)]
pub enum Task {
    ProgressTick,
    LoopCheck,
    FadeStep,
    /// Swap to `index` once the fade-out has had time to finish.
    SwapTrack { index: usize, resume: bool, faded: bool },
    /// Start playback of a freshly loaded track.
    StartPlayback { fade_in: bool },
    StartFadeIn,
    SkipAfterError,
    ReloadAfterError { index: usize },
    OpenExternal { url: String },
    DismissNotification,
    InAppLoad,
    InAppPlay,
    InAppVerify,
    AutoRestart,
    UnmuteCheck,
}

#[derive(Debug)]
struct Entry {
    seq: u64,
    due: Instant,
    period: Option<Duration>,
    group: TaskGroup,
    task: Task,
}

#[derive(Debug, Default)]
pub struct Scheduler {
    entries: Vec<Entry>,
    seq: u64,
}

impl Scheduler {
    fn push(&mut self, group: TaskGroup, due: Instant, period: Option<Duration>, task: Task) {
        self.seq += 1;
        self.entries.push(Entry { seq: self.seq, due, period, group, task });
    }

    /// Runs `task` once after `delay`.
    pub fn schedule(&mut self, group: TaskGroup, delay: Duration, task: Task) {
        self.push(group, Instant::now() + delay, None, task);
    }

    /// Runs `task` every `period`, first after one full period.
    pub fn schedule_every(&mut self, group: TaskGroup, period: Duration, task: Task) {
        self.push(group, Instant::now() + period, Some(period), task);
    }

    pub fn cancel_group(&mut self, group: TaskGroup) {
        self.entries.retain(|e| e.group != group);
    }

    pub fn cancel_groups(&mut self, groups: &[TaskGroup]) {
        self.entries.retain(|e| !groups.contains(&e.group));
    }

    pub fn cancel_all(&mut self) {
        self.entries.clear();
    }

    pub fn is_scheduled(&self, group: TaskGroup) -> bool {
        self.entries.iter().any(|e| e.group == group)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn next_due(&self) -> Option<Instant> {
        self.entries.iter().map(|e| e.due).min()
    }

    /// Removes and returns the earliest task due at `now`, ties broken by
    /// scheduling order. Periodic tasks are re-armed before being returned.
    pub fn pop_due(&mut self, now: Instant) -> Option<Task> {
        let pos = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.due <= now)
            .min_by_key(|(_, e)| (e.due, e.seq))
            .map(|(pos, _)| pos)?;

        match self.entries[pos].period {
            Some(period) => {
                let entry = &mut self.entries[pos];
                let next = entry.due + period;
                entry.due = if next <= now { now + period } else { next };
                Some(entry.task.clone())
            }
            None => Some(self.entries.swap_remove(pos).task),
        }
    }
}
