//! Cosmetic build progress.
//!
//! The backend gives no progress signal while a build runs, so a timer chain
//! walks a fixed table of [`BuildStep`]s and appends each label to a shared
//! [`ProgressLog`]. The chain is purely paced; it never looks at the backend.
//!
//! Cancellation is epoch based: every chain remembers the log epoch it was
//! started in and only appends while that epoch is current. Canceling a
//! handle, clearing the log or force-filling it all advance the epoch under
//! the log's lock, so once any of them returns the old chain can no longer
//! write.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::orchestrator::BuildObserver;

/// One synthetic build step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildStep {
    pub label: &'static str,
    /// Delay before the next step fires.
    pub duration: Duration,
}

impl BuildStep {
    pub const fn new(label: &'static str, millis: u64) -> Self {
        Self {
            label,
            duration: Duration::from_millis(millis),
        }
    }
}

/// The steps shown during every build, in order.
pub const BUILD_STEPS: [BuildStep; 10] = [
    BuildStep::new("Validating app request", 1500),
    BuildStep::new("Provisioning workspace", 3000),
    BuildStep::new("Processing reference images", 2500),
    BuildStep::new("Planning app structure", 4000),
    BuildStep::new("Designing data model", 3500),
    BuildStep::new("Generating components", 5000),
    BuildStep::new("Wiring backend services", 4500),
    BuildStep::new("Running build", 4000),
    BuildStep::new("Deploying preview", 3500),
    BuildStep::new("Finalizing app", 2000),
];

/// Sum of all delays between the first and last firing.
pub fn total_duration(steps: &[BuildStep]) -> Duration {
    steps
        .iter()
        .take(steps.len().saturating_sub(1))
        .map(|s| s.duration)
        .sum()
}

#[derive(Debug, Default)]
struct LogInner {
    labels: Vec<String>,
    capacity: usize,
    epoch: u64,
}

/// Ordered list of completed step labels, shared between the animator and
/// whoever renders it. Never grows beyond its capacity.
#[derive(Debug, Clone, Default)]
pub struct ProgressLog {
    inner: Arc<Mutex<LogInner>>,
}

impl ProgressLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(LogInner {
                labels: Vec::with_capacity(capacity),
                capacity,
                epoch: 0,
            })),
        }
    }

    pub fn for_steps(steps: &[BuildStep]) -> Self {
        Self::new(steps.len())
    }

    fn lock(&self) -> MutexGuard<'_, LogInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn len(&self) -> usize {
        self.lock().labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().labels.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.lock().capacity
    }

    pub fn snapshot(&self) -> Vec<String> {
        self.lock().labels.clone()
    }

    /// Empty the log and retire any chain still writing to it.
    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.labels.clear();
        inner.epoch += 1;
    }

    /// Replace the contents with every label of `steps`, retiring any running
    /// chain. Returns the `(index, label)` pairs that were not present before.
    pub fn fill_from(&self, steps: &[BuildStep]) -> Vec<(usize, &'static str)> {
        let mut inner = self.lock();
        inner.epoch += 1;
        let already = inner.labels.len();
        let capacity = inner.capacity;
        inner.labels = steps
            .iter()
            .take(capacity)
            .map(|s| s.label.to_string())
            .collect();
        steps
            .iter()
            .take(capacity)
            .enumerate()
            .skip(already)
            .map(|(i, s)| (i, s.label))
            .collect()
    }

    fn epoch(&self) -> u64 {
        self.lock().epoch
    }

    fn is_live(&self, epoch: u64) -> bool {
        self.lock().epoch == epoch
    }

    fn retire(&self, epoch: u64) {
        let mut inner = self.lock();
        if inner.epoch == epoch {
            inner.epoch += 1;
        }
    }

    /// Append on behalf of the chain started in `epoch`. Returns the index
    /// written, or `None` if the chain is retired or the log is full.
    ///
    /// `on_push` runs before the lock is released, so a concurrent `cancel`,
    /// `clear` or `fill_from` either precedes the append or follows the
    /// notification.
    fn push_in_epoch(
        &self,
        epoch: u64,
        label: &str,
        on_push: impl FnOnce(usize),
    ) -> Option<usize> {
        let mut inner = self.lock();
        if inner.epoch != epoch || inner.labels.len() >= inner.capacity {
            return None;
        }
        inner.labels.push(label.to_string());
        let index = inner.labels.len() - 1;
        on_push(index);
        Some(index)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimatorState {
    Stopped,
    Running,
}

/// Schedules the step chain.
#[derive(Debug, Clone)]
pub struct ProgressAnimator {
    steps: Arc<[BuildStep]>,
}

impl Default for ProgressAnimator {
    fn default() -> Self {
        Self::new(&BUILD_STEPS)
    }
}

impl ProgressAnimator {
    pub fn new(steps: &[BuildStep]) -> Self {
        Self {
            steps: steps.into(),
        }
    }

    pub fn steps(&self) -> &[BuildStep] {
        &self.steps
    }

    /// Start the chain on the current tokio runtime.
    ///
    /// Step 0 fires immediately; step `n + 1` fires `steps[n].duration` after
    /// step `n`. The chain ends on its own after the last step.
    pub fn start(&self, log: ProgressLog, observer: Arc<dyn BuildObserver>) -> AnimatorHandle {
        let epoch = log.epoch();
        let steps = Arc::clone(&self.steps);
        let chain_log = log.clone();

        let task = tokio::spawn(async move {
            for (n, step) in steps.iter().enumerate() {
                let pushed = chain_log.push_in_epoch(epoch, step.label, |index| {
                    observer.on_step(index, step.label)
                });
                if pushed.is_none() {
                    return;
                }
                if n + 1 < steps.len() {
                    tokio::time::sleep(step.duration).await;
                }
            }
            tracing::debug!("progress chain finished");
        });

        AnimatorHandle { log, epoch, task }
    }
}

/// Cancelable handle to one running chain. Dropping it cancels the chain.
#[derive(Debug)]
pub struct AnimatorHandle {
    log: ProgressLog,
    epoch: u64,
    task: JoinHandle<()>,
}

impl AnimatorHandle {
    /// Stop the chain. Idempotent; valid whether or not it already finished.
    /// No label is appended by this chain after `cancel` returns.
    pub fn cancel(&self) {
        self.log.retire(self.epoch);
        self.task.abort();
    }

    pub fn state(&self) -> AnimatorState {
        if self.log.is_live(self.epoch) && !self.task.is_finished() {
            AnimatorState::Running
        } else {
            AnimatorState::Stopped
        }
    }
}

impl Drop for AnimatorHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::NoopObserver;

    #[derive(Default)]
    struct Recorder {
        steps: Mutex<Vec<(usize, String)>>,
    }

    impl BuildObserver for Recorder {
        fn on_step(&self, index: usize, label: &str) {
            self.steps.lock().unwrap().push((index, label.to_string()));
        }
    }

    fn all_labels() -> Vec<String> {
        BUILD_STEPS.iter().map(|s| s.label.to_string()).collect()
    }

    #[test]
    fn step_table_is_well_formed() {
        assert_eq!(BUILD_STEPS.len(), 10);
        assert!(BUILD_STEPS.iter().all(|s| !s.duration.is_zero()));
        let mut labels = all_labels();
        labels.sort();
        labels.dedup();
        assert_eq!(labels.len(), 10);
    }

    #[test]
    fn total_duration_skips_last_step() {
        let steps = [BuildStep::new("a", 10), BuildStep::new("b", 20), BuildStep::new("c", 99)];
        assert_eq!(total_duration(&steps), Duration::from_millis(30));
        assert_eq!(total_duration(&[]), Duration::ZERO);
    }

    #[test]
    fn fill_from_reports_only_new_labels() {
        let log = ProgressLog::for_steps(&BUILD_STEPS);
        let epoch = log.epoch();
        log.push_in_epoch(epoch, BUILD_STEPS[0].label, |_| {});
        log.push_in_epoch(epoch, BUILD_STEPS[1].label, |_| {});

        let added = log.fill_from(&BUILD_STEPS);
        assert_eq!(added.len(), 8);
        assert_eq!(added[0], (2, BUILD_STEPS[2].label));
        assert_eq!(log.snapshot(), all_labels());
        // Fill retired the epoch.
        assert!(log.push_in_epoch(epoch, "late", |_| {}).is_none());
    }

    #[test]
    fn push_respects_capacity() {
        let log = ProgressLog::new(1);
        let epoch = log.epoch();
        assert_eq!(log.push_in_epoch(epoch, "one", |_| {}), Some(0));
        assert_eq!(log.push_in_epoch(epoch, "two", |_| {}), None);
        assert_eq!(log.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn full_run_appends_every_label_in_order() {
        let log = ProgressLog::for_steps(&BUILD_STEPS);
        let recorder = Arc::new(Recorder::default());
        let handle = ProgressAnimator::default().start(log.clone(), recorder.clone());

        tokio::time::sleep(total_duration(&BUILD_STEPS) + Duration::from_secs(1)).await;

        assert_eq!(log.snapshot(), all_labels());
        assert_eq!(handle.state(), AnimatorState::Stopped);
        let seen = recorder.steps.lock().unwrap();
        assert_eq!(seen.len(), 10);
        assert!(seen.iter().enumerate().all(|(i, (idx, _))| i == *idx));
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_between_second_and_third_firing_freezes_log() {
        let log = ProgressLog::for_steps(&BUILD_STEPS);
        let handle = ProgressAnimator::default().start(log.clone(), Arc::new(NoopObserver));

        // Step 0 at t=0, step 1 at d0, step 2 at d0 + d1.
        let mid = BUILD_STEPS[0].duration + BUILD_STEPS[1].duration / 2;
        tokio::time::sleep(mid).await;
        assert_eq!(log.len(), 2);
        assert_eq!(handle.state(), AnimatorState::Running);

        handle.cancel();
        assert_eq!(handle.state(), AnimatorState::Stopped);

        tokio::time::sleep(total_duration(&BUILD_STEPS) * 2).await;
        assert_eq!(log.len(), 2);
        assert_eq!(log.snapshot(), all_labels()[..2].to_vec());
    }

    /// Records whether the log was still locked when each step was reported.
    struct LockWitness {
        log: ProgressLog,
        held: Mutex<Vec<bool>>,
    }

    impl BuildObserver for LockWitness {
        fn on_step(&self, _index: usize, _label: &str) {
            let held = self.log.inner.try_lock().is_err();
            self.held.lock().unwrap().push(held);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn steps_are_reported_before_the_log_is_released() {
        let steps = [BuildStep::new("one", 10), BuildStep::new("two", 10)];
        let log = ProgressLog::for_steps(&steps);
        let witness = Arc::new(LockWitness {
            log: log.clone(),
            held: Mutex::new(Vec::new()),
        });
        let _handle = ProgressAnimator::new(&steps).start(log.clone(), witness.clone());

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(*witness.held.lock().unwrap(), vec![true, true]);
    }

    #[tokio::test(start_paused = true)]
    async fn no_step_is_reported_after_cancel() {
        let log = ProgressLog::for_steps(&BUILD_STEPS);
        let recorder = Arc::new(Recorder::default());
        let handle = ProgressAnimator::default().start(log.clone(), recorder.clone());
        tokio::time::sleep(BUILD_STEPS[0].duration / 2).await;

        handle.cancel();
        let reported = recorder.steps.lock().unwrap().len();
        tokio::time::sleep(total_duration(&BUILD_STEPS)).await;
        assert_eq!(recorder.steps.lock().unwrap().len(), reported);
        assert_eq!(reported, log.len());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_is_idempotent_and_safe_after_completion() {
        let steps = [BuildStep::new("only", 5)];
        let log = ProgressLog::for_steps(&steps);
        let handle = ProgressAnimator::new(&steps).start(log.clone(), Arc::new(NoopObserver));
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(handle.state(), AnimatorState::Stopped);
        handle.cancel();
        handle.cancel();
        assert_eq!(log.snapshot(), vec!["only".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_handle_cancels() {
        let log = ProgressLog::for_steps(&BUILD_STEPS);
        let handle = ProgressAnimator::default().start(log.clone(), Arc::new(NoopObserver));
        tokio::time::sleep(Duration::from_millis(10)).await;
        drop(handle);
        tokio::time::sleep(total_duration(&BUILD_STEPS)).await;
        assert_eq!(log.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn clearing_retires_old_chain_but_not_new_one() {
        let log = ProgressLog::for_steps(&BUILD_STEPS);
        let animator = ProgressAnimator::default();
        let old = animator.start(log.clone(), Arc::new(NoopObserver));
        tokio::time::sleep(Duration::from_millis(10)).await;

        log.clear();
        let new = animator.start(log.clone(), Arc::new(NoopObserver));
        // Canceling the stale handle must not touch the new chain.
        old.cancel();
        assert_eq!(new.state(), AnimatorState::Running);

        tokio::time::sleep(total_duration(&BUILD_STEPS) + Duration::from_secs(1)).await;
        assert_eq!(log.snapshot(), all_labels());
    }
}
