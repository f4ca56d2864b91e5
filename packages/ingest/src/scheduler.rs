//! Cadence-driven scheduler.
//!
//! A single cooperative loop: every tick, the tasks whose interval has
//! elapsed run one after another. A failing task is logged and the loop
//! carries on.
//!
//! The primary weather report (`P-7A`) is skipped while the Open-Meteo
//! feed is fresh. That check runs at most once per clock hour; the decision
//! is reused for the rest of the hour.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, TimeDelta, Timelike as _};
use grid_ingest_database_models::ScrapingJob;
use grid_ingest_source::SourceConfig;

use crate::clock::Clock;
use crate::config::SchedulerSettings;
use crate::pipeline::Pipeline;
use crate::IngestError;

/// Work the scheduler hands off.
#[async_trait(?Send)]
pub trait TaskRunner {
    /// Forced scrape of one report for one day.
    async fn scrape_report(
        &mut self,
        report_code: &str,
        date: NaiveDate,
    ) -> Result<ScrapingJob, IngestError>;

    /// Open-Meteo weather fetch.
    async fn run_weather(&mut self) -> Result<Option<ScrapingJob>, IngestError>;

    /// Non-forced catch-up over the last `days` days.
    async fn run_recent(&mut self, days: i64) -> Vec<ScrapingJob>;

    /// When Open-Meteo weather was last written.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError`] if the lookup fails.
    fn latest_weather_write(&self) -> Result<Option<NaiveDateTime>, IngestError>;
}

#[async_trait(?Send)]
impl TaskRunner for Pipeline {
    async fn scrape_report(
        &mut self,
        report_code: &str,
        date: NaiveDate,
    ) -> Result<ScrapingJob, IngestError> {
        self.scrape_date(report_code, date, true).await
    }

    async fn run_weather(&mut self) -> Result<Option<ScrapingJob>, IngestError> {
        self.scrape_openmeteo_weather().await
    }

    async fn run_recent(&mut self, days: i64) -> Vec<ScrapingJob> {
        self.scrape_recent(days, None, false).await
    }

    fn latest_weather_write(&self) -> Result<Option<NaiveDateTime>, IngestError> {
        Ok(self.latest_openmeteo_write()?)
    }
}

/// Identifies a scheduled task.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TaskId {
    /// Scrape of one registered report.
    Report(String),
    /// The Open-Meteo fetch.
    OpenMeteoWeather,
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Report(code) => f.write_str(code),
            Self::OpenMeteoWeather => f.write_str("openmeteo-weather"),
        }
    }
}

/// A task and how often it runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledTask {
    pub id: TaskId,
    pub interval: TimeDelta,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct WeatherCheck {
    hour: NaiveDateTime,
    skip: bool,
}

/// Runs tasks on their cadence against a [`TaskRunner`].
pub struct Scheduler<R> {
    runner: R,
    clock: Arc<dyn Clock>,
    settings: SchedulerSettings,
    tasks: Vec<ScheduledTask>,
    last_run: HashMap<TaskId, NaiveDateTime>,
    weather_check: Option<WeatherCheck>,
}

impl<R> std::fmt::Debug for Scheduler<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("tasks", &self.tasks)
            .field("last_run", &self.last_run)
            .finish_non_exhaustive()
    }
}

impl<R: TaskRunner> Scheduler<R> {
    /// Schedules every source with a known cadence, plus the hourly
    /// Open-Meteo task.
    pub fn new<'a>(
        runner: R,
        clock: Arc<dyn Clock>,
        settings: SchedulerSettings,
        sources: impl IntoIterator<Item = &'a SourceConfig>,
    ) -> Self {
        let mut tasks = Vec::new();

        for source in sources {
            match source.cadence().poll_interval() {
                Some(interval) => {
                    log::info!(
                        "Scheduling {} every {} min ({})",
                        source.report_code,
                        interval.num_minutes(),
                        source.cadence()
                    );
                    tasks.push(ScheduledTask {
                        id: TaskId::Report(source.report_code.clone()),
                        interval,
                    });
                }
                None => log::warn!(
                    "{}: no schedulable update frequency ({:?}), not scheduled",
                    source.report_code,
                    source.update_frequency
                ),
            }
        }

        tasks.push(ScheduledTask {
            id: TaskId::OpenMeteoWeather,
            interval: TimeDelta::hours(1),
        });

        Self {
            runner,
            clock,
            settings,
            tasks,
            last_run: HashMap::new(),
            weather_check: None,
        }
    }

    /// The task list.
    #[must_use]
    pub fn tasks(&self) -> &[ScheduledTask] {
        &self.tasks
    }

    /// The wrapped runner.
    #[must_use]
    pub const fn runner(&self) -> &R {
        &self.runner
    }

    /// Tasks that have never run or whose interval has elapsed at `now`.
    #[must_use]
    pub fn due_tasks(&self, now: NaiveDateTime) -> Vec<TaskId> {
        self.tasks
            .iter()
            .filter(|task| {
                self.last_run
                    .get(&task.id)
                    .is_none_or(|last| now - *last >= task.interval)
            })
            .map(|task| task.id.clone())
            .collect()
    }

    /// Runs every due task once, in order.
    pub async fn tick(&mut self) {
        let now = self.clock.now();
        let due = self.due_tasks(now);

        if due.is_empty() {
            log::trace!("No tasks due at {now}");
            return;
        }

        for id in due {
            self.run_task(&id).await;
            self.last_run.insert(id, now);
        }
    }

    /// Runs every task immediately, regardless of cadence.
    pub async fn run_once(&mut self) {
        let now = self.clock.now();
        let ids: Vec<TaskId> = self.tasks.iter().map(|t| t.id.clone()).collect();

        log::info!("Running all {} tasks once", ids.len());

        for id in ids {
            self.run_task(&id).await;
            self.last_run.insert(id, now);
        }
    }

    /// Runs the tick loop until `shutdown` resolves.
    ///
    /// With `run_immediately`, a one-day catch-up runs first. A task in
    /// progress when `shutdown` resolves is finished before returning.
    pub async fn start(&mut self, run_immediately: bool, shutdown: impl Future<Output = ()>) {
        tokio::pin!(shutdown);

        if run_immediately {
            log::info!("Running initial catch-up");
            let jobs = self.runner.run_recent(1).await;
            log::info!("Initial catch-up finished with {} jobs", jobs.len());
        }

        let mut interval =
            tokio::time::interval(Duration::from_secs(self.settings.tick_secs.max(1)));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        log::info!(
            "Scheduler started with {} tasks, ticking every {}s",
            self.tasks.len(),
            self.settings.tick_secs
        );

        loop {
            tokio::select! {
                _ = interval.tick() => self.tick().await,
                () = &mut shutdown => {
                    log::info!("Scheduler stopping");
                    break;
                }
            }
        }
    }

    async fn run_task(&mut self, id: &TaskId) {
        match id {
            TaskId::OpenMeteoWeather => match self.runner.run_weather().await {
                Ok(Some(job)) => log::info!("{id}: job {} {}", job.id, job.status),
                Ok(None) => log::debug!("{id}: not configured"),
                Err(e) => log::error!("{id}: {e}"),
            },
            TaskId::Report(code) => {
                if *code == self.settings.weather_report_code && self.should_skip_weather() {
                    return;
                }

                let date = self.clock.today();
                match self.runner.scrape_report(code, date).await {
                    Ok(job) => log::info!(
                        "{id}: job {} {} ({} inserted, {} updated)",
                        job.id,
                        job.status,
                        job.rows_inserted,
                        job.rows_updated
                    ),
                    Err(e) => log::error!("{id}: {e}"),
                }
            }
        }
    }

    /// Whether the primary weather report should be skipped this hour.
    fn should_skip_weather(&mut self) -> bool {
        let now = self.clock.now();
        let hour = truncate_to_hour(now);

        if let Some(check) = self.weather_check
            && check.hour == hour
        {
            if check.skip {
                log::debug!("{}: still skipped this hour", self.settings.weather_report_code);
            }
            return check.skip;
        }

        let window = TimeDelta::hours(self.settings.weather_skip_window_hours);
        let skip = match self.runner.latest_weather_write() {
            Ok(Some(latest)) => now - latest < window,
            Ok(None) => false,
            Err(e) => {
                log::warn!("Open-Meteo freshness check failed: {e}");
                false
            }
        };

        if skip {
            log::info!(
                "Skipping {}: Open-Meteo weather written within the last {}h",
                self.settings.weather_report_code,
                self.settings.weather_skip_window_hours
            );
        } else {
            log::info!(
                "Open-Meteo weather is stale or missing; running {}",
                self.settings.weather_report_code
            );
        }

        self.weather_check = Some(WeatherCheck { hour, skip });
        skip
    }
}

fn truncate_to_hour(at: NaiveDateTime) -> NaiveDateTime {
    at.date()
        .and_hms_opt(at.hour(), 0, 0)
        .unwrap_or(at)
}
