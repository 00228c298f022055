/// ScheduleCore: single-owner loop that keeps the display current.
///
/// Owns the refresh timer, the retry bookkeeping and the one fetch cycle that
/// may be in flight.  A cycle runs as its own task (fetch → select → format,
/// with 2s/4s/8s backoff between failed attempts) and reports back over an
/// internal channel tagged with its cycle id.  Only the core publishes, so
/// display updates are strictly ordered; reports from a superseded cycle are
/// dropped on arrival.
///
/// Phases:
///   Idle -> Fetching -> (Backoff -> Fetching)* -> Idle | Cooldown
///   Cooldown -> Fetching once the cooldown has elapsed and the timer ticks
///
/// During cooldown the timer runs at the short check period and each tick
/// publishes the remaining wait.  The cycle that ends the cooldown puts the
/// timer back on the normal period; failing again shortens it once more.
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use tokio::sync::{broadcast, mpsc};
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use voicehub_proto::config::Config;
use voicehub_proto::presenter::{cooldown_wait_message, failure_message, present, retry_message};
use voicehub_proto::selector::select;
use voicehub_proto::state::{DisplayState, DisplayStore};

use crate::source::{FetchError, ScheduleSource};

// ── Inputs ────────────────────────────────────────────────────────────────────

/// Requests from the host (HTTP API, signals).
#[derive(Debug)]
pub enum ScheduleEvent {
    /// Fetch now, unless a cooldown is running.
    Refresh,
}

#[derive(Debug)]
enum CycleReport {
    Backoff { attempt: u32, delay: Duration, error: FetchError },
    Loaded(DisplayState),
    Exhausted(FetchError),
}

#[derive(Debug)]
struct CycleMessage {
    id: u64,
    report: CycleReport,
}

// ── Settings & bookkeeping ────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct PolicySettings {
    pub url: String,
    pub request_timeout: Duration,
    pub max_retries: u32,
    pub cooldown: Duration,
    pub interval: Duration,
    pub cooldown_check: Duration,
    pub label: String,
}

impl PolicySettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            url: config.source.effective_url().to_string(),
            request_timeout: config.source.request_timeout(),
            max_retries: config.retry.max_retries,
            cooldown: config.retry.cooldown(),
            interval: config.refresh.interval(),
            cooldown_check: config.refresh.cooldown_check(),
            label: config.display.label.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Fetching,
    Backoff,
    Cooldown,
}

/// Reset to the default on every successful fetch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetryState {
    pub attempt: u32,
    pub last_failure: Option<Instant>,
}

/// Delay before retry number `attempt + 1`: 2s, 4s, 8s, …
pub fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_secs(2u64.saturating_pow(attempt.saturating_add(1)))
}

pub type TodayFn = Arc<dyn Fn() -> NaiveDate + Send + Sync>;

struct ActiveCycle {
    id: u64,
    cancel: CancellationToken,
    handle: tokio::task::JoinHandle<()>,
}

// ── ScheduleCore ──────────────────────────────────────────────────────────────

pub struct ScheduleCore<S: ScheduleSource> {
    settings: PolicySettings,
    source: Arc<S>,
    today: TodayFn,
    store: Arc<DisplayStore>,
    broadcast_tx: broadcast::Sender<DisplayState>,
    shutdown: CancellationToken,
    report_tx: mpsc::UnboundedSender<CycleMessage>,
    report_rx: mpsc::UnboundedReceiver<CycleMessage>,
    phase: Phase,
    retry: RetryState,
    timer_period: Duration,
    /// Restart the refresh timer at `timer_period` after the current event.
    reschedule: bool,
    cycle: Option<ActiveCycle>,
    next_cycle_id: u64,
}

impl<S: ScheduleSource> ScheduleCore<S> {
    pub fn new(
        settings: PolicySettings,
        source: Arc<S>,
        store: Arc<DisplayStore>,
        broadcast_tx: broadcast::Sender<DisplayState>,
        shutdown: CancellationToken,
    ) -> Self {
        let (report_tx, report_rx) = mpsc::unbounded_channel();
        let timer_period = settings.interval;
        Self {
            settings,
            source,
            today: Arc::new(|| chrono::Local::now().date_naive()),
            store,
            broadcast_tx,
            shutdown,
            report_tx,
            report_rx,
            phase: Phase::Idle,
            retry: RetryState::default(),
            timer_period,
            reschedule: false,
            cycle: None,
            next_cycle_id: 0,
        }
    }

    /// Override the calendar used to pick "today" (useful for testing).
    #[cfg(test)]
    pub fn with_today(mut self, today: TodayFn) -> Self {
        self.today = today;
        self
    }

    /// Run until `shutdown` is cancelled or the host event channel closes.
    /// The first timer tick fires immediately, so this also performs the
    /// startup fetch.
    pub async fn run(mut self, mut event_rx: mpsc::Receiver<ScheduleEvent>) {
        info!(
            "ScheduleCore: starting, url={} interval={:?}",
            self.settings.url, self.settings.interval
        );
        let mut timer = new_timer(Instant::now(), self.timer_period);

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    info!("ScheduleCore: shutdown requested");
                    break;
                }
                _ = timer.tick() => {
                    self.on_trigger("timer").await;
                }
                evt = event_rx.recv() => match evt {
                    None => {
                        info!("ScheduleCore: event channel closed, shutting down");
                        break;
                    }
                    Some(ScheduleEvent::Refresh) => self.on_trigger("refresh").await,
                },
                Some(msg) = self.report_rx.recv() => {
                    self.on_report(msg).await;
                }
            }

            if std::mem::take(&mut self.reschedule) {
                info!("ScheduleCore: next refresh in {:?}", self.timer_period);
                timer = new_timer(Instant::now() + self.timer_period, self.timer_period);
            }
        }

        self.cancel_cycle();
    }

    async fn on_trigger(&mut self, trigger: &str) {
        if let Some(last_failure) = self.retry.last_failure {
            let elapsed = last_failure.elapsed();
            if elapsed < self.settings.cooldown {
                let remaining = self.settings.cooldown - elapsed;
                debug!("ScheduleCore: {} during cooldown, {:?} left", trigger, remaining);
                self.publish(DisplayState::NetworkError(cooldown_wait_message(remaining)))
                    .await;
                return;
            }
            info!("ScheduleCore: cooldown elapsed");
            self.retry = RetryState::default();
            self.phase = Phase::Idle;
            // Check ticks must not restart the attempt that ends the cooldown.
            self.timer_period = self.settings.interval;
            self.reschedule = true;
        }

        debug!("ScheduleCore: {} starts a fetch cycle", trigger);
        self.start_cycle().await;
    }

    async fn start_cycle(&mut self) {
        self.cancel_cycle();

        self.next_cycle_id += 1;
        let id = self.next_cycle_id;
        let cancel = self.shutdown.child_token();
        let ctx = CycleContext {
            id,
            url: self.settings.url.clone(),
            request_timeout: self.settings.request_timeout,
            max_retries: self.settings.max_retries,
            label: self.settings.label.clone(),
            today: Arc::clone(&self.today),
        };
        let handle = tokio::spawn(run_cycle(
            ctx,
            Arc::clone(&self.source),
            cancel.clone(),
            self.report_tx.clone(),
        ));

        self.cycle = Some(ActiveCycle { id, cancel, handle });
        self.phase = Phase::Fetching;
        self.retry.attempt = 0;
        self.publish(DisplayState::Loading).await;
    }

    fn cancel_cycle(&mut self) {
        if let Some(stale) = self.cycle.take() {
            if !stale.handle.is_finished() {
                info!("ScheduleCore: cancelling cycle {}", stale.id);
            }
            stale.cancel.cancel();
            stale.handle.abort();
        }
    }

    async fn on_report(&mut self, msg: CycleMessage) {
        if self.cycle.as_ref().map(|c| c.id) != Some(msg.id) {
            debug!("ScheduleCore: dropping report from stale cycle {}", msg.id);
            return;
        }

        match msg.report {
            CycleReport::Backoff { attempt, delay, error } => {
                warn!(
                    "ScheduleCore: fetch failed ({}), retry {}/{} in {:?}",
                    error, attempt, self.settings.max_retries, delay
                );
                self.phase = Phase::Backoff;
                self.retry.attempt = attempt;
                self.publish(DisplayState::NetworkError(retry_message(
                    attempt,
                    self.settings.max_retries,
                )))
                .await;
            }
            CycleReport::Loaded(state) => {
                self.cycle = None;
                self.phase = Phase::Idle;
                self.retry = RetryState::default();
                if self.timer_period != self.settings.interval {
                    self.timer_period = self.settings.interval;
                    self.reschedule = true;
                }
                info!("ScheduleCore: schedule loaded ({})", state.mode_label());
                self.publish(state).await;
            }
            CycleReport::Exhausted(error) => {
                self.cycle = None;
                self.phase = Phase::Cooldown;
                self.retry.last_failure = Some(Instant::now());
                self.timer_period = self.settings.cooldown_check;
                self.reschedule = true;
                warn!(
                    "ScheduleCore: giving up after {} retries ({}), cooling down for {:?}",
                    self.retry.attempt, error, self.settings.cooldown
                );
                self.publish(DisplayState::NetworkError(failure_message(
                    error.kind(),
                    self.settings.cooldown,
                )))
                .await;
            }
        }
    }

    async fn publish(&self, state: DisplayState) {
        let rev = self.store.set(state.clone()).await;
        debug!("ScheduleCore: publish rev={} phase={:?} {:?}", rev, self.phase, state);
        // No receivers is fine; the store still has the latest state.
        let _ = self.broadcast_tx.send(state);
    }
}

fn new_timer(start: Instant, period: Duration) -> Interval {
    let mut timer = interval_at(start, period);
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
    timer
}

// ── Fetch cycle task ──────────────────────────────────────────────────────────

struct CycleContext {
    id: u64,
    url: String,
    request_timeout: Duration,
    max_retries: u32,
    label: String,
    today: TodayFn,
}

/// One fetch → select → format cycle with bounded retries. Returns silently
/// when cancelled.
async fn run_cycle<S: ScheduleSource>(
    ctx: CycleContext,
    source: Arc<S>,
    cancel: CancellationToken,
    report_tx: mpsc::UnboundedSender<CycleMessage>,
) {
    let send = |report: CycleReport| {
        let _ = report_tx.send(CycleMessage { id: ctx.id, report });
    };
    let mut attempt: u32 = 0;

    loop {
        let result = tokio::select! {
            _ = cancel.cancelled() => {
                debug!("cycle {}: cancelled during fetch", ctx.id);
                return;
            }
            r = tokio::time::timeout(ctx.request_timeout, source.fetch(&ctx.url)) => {
                r.unwrap_or(Err(FetchError::Timeout))
            }
        };

        match result {
            Ok(feed) => {
                let selection = select(&feed, (ctx.today)());
                debug!("cycle {}: {} entries fetched", ctx.id, feed.len());
                send(CycleReport::Loaded(present(&ctx.label, &selection)));
                return;
            }
            Err(error) if attempt < ctx.max_retries => {
                let delay = backoff_delay(attempt);
                attempt += 1;
                send(CycleReport::Backoff { attempt, delay, error });
                tokio::select! {
                    _ = cancel.cancelled() => {
                        debug!("cycle {}: cancelled during backoff", ctx.id);
                        return;
                    }
                    _ = tokio::time::sleep(delay) => {}
                }
            }
            Err(error) => {
                send(CycleReport::Exhausted(error));
                return;
            }
        }
    }
}
