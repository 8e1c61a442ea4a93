//! Cancellable delayed tasks
//!
//! Each ability instance keeps at most one duration task and one cooldown
//! task. Scheduling returns immediately; the owning session pops due tasks on
//! a later tick and routes them back to the instance, which ignores any handle
//! it no longer holds. Duration and cooldown handles are independent:
//! cancelling one never touches the other.

use super::ability_config::AbilityKind;

/// Opaque id of a scheduled task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskHandle(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    Duration,
    Cooldown,
}

/// A task whose delay has elapsed
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DueTask {
    pub handle: TaskHandle,
    pub owner: AbilityKind,
    pub kind: TimerKind,
    /// Exact time the task was due, which may be earlier than the tick time
    pub due_at: f64,
}

#[derive(Debug, Clone)]
struct ScheduledTask {
    handle: TaskHandle,
    owner: AbilityKind,
    kind: TimerKind,
    due_at: f64,
}

#[derive(Debug, Default)]
pub struct TaskScheduler {
    next_id: u64,
    tasks: Vec<ScheduledTask>,
}

impl TaskScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, owner: AbilityKind, kind: TimerKind, now: f64, delay: f64) -> TaskHandle {
        self.next_id += 1;
        let handle = TaskHandle(self.next_id);
        self.tasks.push(ScheduledTask {
            handle,
            owner,
            kind,
            due_at: now + delay.max(0.0),
        });
        handle
    }

    /// Cancel a pending task. Returns false if it already fired or was cancelled.
    pub fn cancel(&mut self, handle: TaskHandle) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.handle != handle);
        self.tasks.len() != before
    }

    pub fn is_pending(&self, handle: TaskHandle) -> bool {
        self.tasks.iter().any(|t| t.handle == handle)
    }

    pub fn due_at(&self, handle: TaskHandle) -> Option<f64> {
        self.tasks.iter().find(|t| t.handle == handle).map(|t| t.due_at)
    }

    pub fn remaining(&self, handle: TaskHandle, now: f64) -> Option<f64> {
        self.due_at(handle).map(|due| (due - now).max(0.0))
    }

    pub fn pending_count(&self, owner: AbilityKind, kind: TimerKind) -> usize {
        self.tasks
            .iter()
            .filter(|t| t.owner == owner && t.kind == kind)
            .count()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Remove and return the earliest task due at or before `now`.
    ///
    /// Ties resolve in scheduling order so callbacks replay deterministically.
    pub fn pop_due(&mut self, now: f64) -> Option<DueTask> {
        let index = self
            .tasks
            .iter()
            .enumerate()
            .filter(|(_, t)| t.due_at <= now)
            .min_by(|(_, a), (_, b)| {
                a.due_at
                    .total_cmp(&b.due_at)
                    .then_with(|| a.handle.cmp(&b.handle))
            })
            .map(|(i, _)| i)?;
        let task = self.tasks.remove(index);
        Some(DueTask {
            handle: task.handle,
            owner: task.owner,
            kind: task.kind,
            due_at: task.due_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_not_due_before_delay() {
        let mut scheduler = TaskScheduler::new();
        scheduler.schedule(AbilityKind::Barrier, TimerKind::Duration, 0.0, 3.0);
        assert!(scheduler.pop_due(2.999).is_none());
        let due = scheduler.pop_due(3.0).expect("due at exactly 3s");
        assert_eq!(due.due_at, 3.0);
        assert!(scheduler.is_empty());
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let mut scheduler = TaskScheduler::new();
        let handle = scheduler.schedule(AbilityKind::Barrier, TimerKind::Cooldown, 0.0, 1.0);
        assert!(scheduler.cancel(handle));
        assert!(!scheduler.cancel(handle));
        assert!(!scheduler.is_pending(handle));
    }

    #[test]
    fn test_cancelling_duration_keeps_cooldown() {
        let mut scheduler = TaskScheduler::new();
        let duration = scheduler.schedule(AbilityKind::Barrier, TimerKind::Duration, 0.0, 3.0);
        let cooldown = scheduler.schedule(AbilityKind::Barrier, TimerKind::Cooldown, 0.0, 20.0);
        scheduler.cancel(duration);
        assert!(scheduler.is_pending(cooldown));
    }

    #[test]
    fn test_pop_due_orders_by_time_then_schedule_order() {
        let mut scheduler = TaskScheduler::new();
        let late = scheduler.schedule(AbilityKind::Barrier, TimerKind::Duration, 0.0, 5.0);
        let first = scheduler.schedule(AbilityKind::Resupply, TimerKind::Duration, 0.0, 2.0);
        let second = scheduler.schedule(AbilityKind::Shockwave, TimerKind::Cooldown, 0.0, 2.0);

        assert_eq!(scheduler.pop_due(10.0).map(|t| t.handle), Some(first));
        assert_eq!(scheduler.pop_due(10.0).map(|t| t.handle), Some(second));
        assert_eq!(scheduler.pop_due(10.0).map(|t| t.handle), Some(late));
        assert!(scheduler.pop_due(10.0).is_none());
    }

    #[test]
    fn test_remaining_and_cancel() {
        let mut scheduler = TaskScheduler::new();
        let cooldown = scheduler.schedule(AbilityKind::Adrenaline, TimerKind::Cooldown, 10.0, 25.0);
        assert_eq!(scheduler.remaining(cooldown, 20.0), Some(15.0));
        let duration = scheduler.schedule(AbilityKind::Adrenaline, TimerKind::Duration, 10.0, 6.0);
        scheduler.cancel(cooldown);
        assert_eq!(scheduler.remaining(cooldown, 20.0), None);
        scheduler.cancel(duration);
        assert!(scheduler.is_empty());
    }
}
