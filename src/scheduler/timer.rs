use parking_lot::Mutex;
use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

const MIN_PERIOD: Duration = Duration::from_secs(1);

/// Recurring collection trigger. One task at most; start/stop/replace share one lock.
#[derive(Debug, Default)]
pub struct CollectTimer {
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl CollectTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Starts the timer unless one is already running. Returns whether it started.
    pub fn start_if_needed<F, Fut>(&self, initial_delay: Duration, period: Duration, tick: F) -> bool
    where
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut guard = self.handle.lock();
        if guard.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return false;
        }
        *guard = Some(spawn_timer(initial_delay, period, tick));
        tracing::info!(
            "[Scheduler] Collection timer started (first run in {:?}, then every {:?})",
            initial_delay,
            period.max(MIN_PERIOD)
        );
        true
    }

    /// Swaps in a new timer, aborting the previous one.
    pub fn replace<F, Fut>(&self, initial_delay: Duration, period: Duration, tick: F)
    where
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut guard = self.handle.lock();
        if let Some(old) = guard.take() {
            old.abort();
            tracing::debug!("[Scheduler] Aborted previous collection timer");
        }
        *guard = Some(spawn_timer(initial_delay, period, tick));
    }

    pub fn stop(&self) -> bool {
        let Some(handle) = self.handle.lock().take() else {
            return false;
        };
        handle.abort();
        tracing::info!("[Scheduler] Collection timer stopped");
        true
    }
}

impl Drop for CollectTimer {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.get_mut().take() {
            handle.abort();
        }
    }
}

fn spawn_timer<F, Fut>(initial_delay: Duration, period: Duration, tick: F) -> JoinHandle<()>
where
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let period = period.max(MIN_PERIOD);
    tokio::spawn(async move {
        let start = tokio::time::Instant::now() + initial_delay;
        let mut interval = tokio::time::interval_at(start, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            // Ticks never wait for the previous cycle; the cycle gate arbitrates.
            tokio::spawn(tick());
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counting_tick(counter: Arc<AtomicUsize>) -> impl Fn() -> std::future::Ready<()> + Send {
        move || {
            counter.fetch_add(1, Ordering::SeqCst);
            std::future::ready(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn fires_after_initial_delay_then_periodically() {
        let timer = CollectTimer::new();
        let counter = Arc::new(AtomicUsize::new(0));
        assert!(timer.start_if_needed(
            Duration::from_secs(30),
            Duration::from_secs(60),
            counting_tick(counter.clone())
        ));

        tokio::time::sleep(Duration::from_secs(29)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 3);
        assert!(timer.stop());
    }

    #[tokio::test(start_paused = true)]
    async fn start_is_idempotent_and_stop_halts_ticks() {
        let timer = CollectTimer::new();
        let counter = Arc::new(AtomicUsize::new(0));
        assert!(timer.start_if_needed(Duration::ZERO, Duration::from_secs(10), counting_tick(counter.clone())));
        assert!(!timer.start_if_needed(Duration::ZERO, Duration::from_secs(10), counting_tick(counter.clone())));
        assert!(timer.is_running());

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        assert!(timer.stop());
        assert!(!timer.is_running());
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert!(!timer.stop());
    }

    #[tokio::test(start_paused = true)]
    async fn replace_swaps_the_running_timer() {
        let timer = CollectTimer::new();
        let old = Arc::new(AtomicUsize::new(0));
        let new = Arc::new(AtomicUsize::new(0));
        timer.start_if_needed(Duration::from_secs(5), Duration::from_secs(5), counting_tick(old.clone()));
        timer.replace(Duration::from_secs(1), Duration::from_secs(5), counting_tick(new.clone()));

        tokio::time::sleep(Duration::from_secs(7)).await;
        assert_eq!(old.load(Ordering::SeqCst), 0);
        assert_eq!(new.load(Ordering::SeqCst), 2);
    }
}
