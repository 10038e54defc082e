use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDateTime, Timelike};
use ekiboard_core::time::local_now;
use ekiboard_fetch::{
    fetch_departure, fetch_first_last, fetch_operation, fetch_weather, FetchContext, TaskReport,
};
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::daily::DailyFlag;
use crate::renderer::Renderer;
use crate::trigger::{evaluate, Decision, TriggerInput};
use crate::types::{CycleFinished, CycleTask, SchedulerState, TickOutcome};

/// Source of local wall-clock time. Swappable so tests can drive the loop.
pub type Clock = Arc<dyn Fn() -> NaiveDateTime + Send + Sync>;

/// Capacity of the cycle-completion channel. At most one cycle runs at a time.
const DONE_CHANNEL_CAPACITY: usize = 4;

/// Control loop: decides when to search, runs search cycles in the
/// background and keeps the renderer alive.
pub struct SchedulerEngine {
    ctx: FetchContext,
    state: SchedulerState,
    renderer: Option<Renderer>,
    clock: Clock,
    done_tx: mpsc::Sender<CycleFinished>,
    done_rx: mpsc::Receiver<CycleFinished>,
}

impl SchedulerEngine {
    pub fn new(ctx: FetchContext) -> Self {
        let renderer = ctx
            .config
            .renderer
            .enabled
            .then(|| Renderer::new(&ctx.config.renderer));
        let (done_tx, done_rx) = mpsc::channel(DONE_CHANNEL_CAPACITY);
        Self {
            ctx,
            state: SchedulerState::default(),
            renderer,
            clock: Arc::new(local_now),
            done_tx,
            done_rx,
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn state(&self) -> &SchedulerState {
        &self.state
    }

    /// Main event loop. Runs until `shutdown` broadcasts `true`.
    ///
    /// Startup order: first/last refresh (awaited), first search cycle
    /// (background), renderer launch, daily flag initialisation.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!("scheduler engine started");
        let now = (self.clock)();

        let report = fetch_first_last(&self.ctx, now).await;
        info!(report = report.as_str(), "startup first/last refresh");
        self.start_cycle();
        self.check_renderer();

        let schedule = &self.ctx.config.schedule;
        self.state.daily = DailyFlag::initial(now.hour(), schedule.daily_reset_hour);

        let mut interval = tokio::time::interval(Duration::from_secs(schedule.tick_secs));
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let now = (self.clock)();
                    self.tick(now);
                }
                Some(done) = self.done_rx.recv() => self.finish_cycle(done),
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("scheduler engine shutting down");
                        break;
                    }
                }
            }
        }

        if let Some(renderer) = self.renderer.as_mut() {
            renderer.stop().await;
        }
        info!("scheduler engine stopped");
    }

    /// One pass of the control loop at `now`.
    ///
    /// Never blocks on network I/O: cycles and the daily refresh are spawned.
    pub fn tick(&mut self, now: NaiveDateTime) -> TickOutcome {
        let renderer_restarted = self.check_renderer();

        let schedule = &self.ctx.config.schedule;
        let daily_refresh = self.state.daily.advance(
            now.hour(),
            schedule.daily_reset_hour,
            schedule.daily_run_hour,
        );
        if daily_refresh {
            self.spawn_first_last(now);
        }

        let departures = self.ctx.store.read_departure();
        let decision = evaluate(
            TriggerInput {
                now,
                departures: departures.as_ref(),
                last_search: self.state.last_search,
                in_flight: self.state.in_flight,
            },
            schedule,
        );

        let cycle_started = match &decision {
            Decision::Fetch(reason) => {
                info!(%reason, "search triggered");
                self.start_cycle();
                true
            }
            Decision::Wait(why) => {
                debug!(?why, "no search this tick");
                false
            }
        };

        TickOutcome {
            decision,
            cycle_started,
            daily_refresh,
            renderer_restarted,
        }
    }

    /// Wait for the running cycle to report back and apply its completion.
    pub async fn next_completion(&mut self) -> Option<CycleFinished> {
        let done = self.done_rx.recv().await?;
        self.finish_cycle(done.clone());
        Some(done)
    }

    fn start_cycle(&mut self) {
        self.state.in_flight = true;
        let ctx = self.ctx.clone();
        let clock = self.clock.clone();
        let done = self.done_tx.clone();
        tokio::spawn(run_search_cycle(ctx, clock, done));
    }

    fn finish_cycle(&mut self, done: CycleFinished) {
        self.state.in_flight = false;
        self.state.last_search = Some(done.finished_at);
        debug!(cycle_id = %done.cycle_id, finished_at = %done.finished_at, "cycle completion applied");
    }

    fn spawn_first_last(&self, now: NaiveDateTime) {
        let ctx = self.ctx.clone();
        tokio::spawn(
            async move {
                let report = fetch_first_last(&ctx, now).await;
                info!(report = report.as_str(), "daily first/last refresh finished");
            }
            .instrument(info_span!("daily_refresh")),
        );
    }

    /// Returns true when the renderer was (re)launched.
    fn check_renderer(&mut self) -> bool {
        let Some(renderer) = self.renderer.as_mut() else {
            return false;
        };
        match renderer.ensure_running() {
            Ok(relaunched) => relaunched,
            Err(e) => {
                error!("renderer launch failed: {e}");
                false
            }
        }
    }
}

/// Departure, then operation, then weather. Each task runs in its own
/// spawned task so a panic in one still lets the rest run and the cycle
/// always reports completion.
async fn run_search_cycle(ctx: FetchContext, clock: Clock, done: mpsc::Sender<CycleFinished>) {
    let cycle_id = Uuid::now_v7();
    async move {
        info!("search cycle started");
        let mut reports = Vec::with_capacity(CycleTask::ORDER.len());
        for task in CycleTask::ORDER {
            let report = run_contained(task, &ctx, clock()).await;
            reports.push((task, report));
        }

        let finished_at = clock();
        let summary: Vec<String> = reports
            .iter()
            .map(|(task, report)| format!("{}={}", task.as_str(), report.as_str()))
            .collect();
        info!(%finished_at, reports = %summary.join(" "), "search cycle finished");

        let message = CycleFinished {
            cycle_id,
            finished_at,
            reports,
        };
        if done.send(message).await.is_err() {
            warn!("engine gone; cycle completion dropped");
        }
    }
    .instrument(info_span!("search_cycle", %cycle_id))
    .await
}

async fn run_contained(task: CycleTask, ctx: &FetchContext, now: NaiveDateTime) -> TaskReport {
    let ctx = ctx.clone();
    let handle = tokio::spawn(
        async move {
            match task {
                CycleTask::Departure => fetch_departure(&ctx, now).await,
                CycleTask::Operation => fetch_operation(&ctx, now).await,
                CycleTask::Weather => fetch_weather(&ctx, now).await,
            }
        }
        .in_current_span(),
    );
    match handle.await {
        Ok(report) => report,
        Err(e) => {
            error!(task = task.as_str(), "task aborted: {e}");
            TaskReport::Skipped
        }
    }
}
