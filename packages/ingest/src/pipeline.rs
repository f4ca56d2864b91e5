//! One-report-one-date ingestion and the batch entry points built on it.

use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use duckdb::Connection;
use grid_ingest_database::facts::{WeatherWriter, latest_weather_write};
use grid_ingest_database::{DbError, jobs, sources, store, writer};
use grid_ingest_database_models::{LogLevel, ScrapingJob, UpsertCounts};
use grid_ingest_scraper::openmeteo::OpenMeteoClient;
use grid_ingest_scraper::{Downloader, HttpClient, ReqwestClient};
use grid_ingest_source::locations::all_locations;
use grid_ingest_source::{SourceConfig, SourceRegistry, WeatherLocation};
use grid_ingest_transform::DateFormats;
use grid_ingest_transform::openmeteo::{OPENMETEO_SOURCE, parse_weather_response};
use grid_ingest_transform::parse::parse_with_formats;

use crate::clock::{Clock, SystemClock};
use crate::config::IngestConfig;
use crate::routes::ReportRoutes;
use crate::tracker::JobTracker;
use crate::IngestError;

/// Report code jobs for the Open-Meteo source are filed under.
pub const OPENMETEO_REPORT_CODE: &str = "OPENMETEO-WEATHER";

/// Data source row for the Open-Meteo weather feed.
#[must_use]
pub fn openmeteo_source() -> SourceConfig {
    SourceConfig {
        data_type: "weather".to_string(),
        report_code: OPENMETEO_REPORT_CODE.to_string(),
        dataset_name: "openmeteo_weather".to_string(),
        filename_pattern: String::new(),
        direct_url_template: "https://customer-api.open-meteo.com/v1/forecast".to_string(),
        archive_url_template: String::new(),
        category: Some("Weather".to_string()),
        update_frequency: Some("hourly".to_string()),
        description: Some(
            "Open Meteo API weather data (temperature, humidity, irradiance, wind speed)"
                .to_string(),
        ),
    }
}

/// Downloads, transforms, and stores reports, one job per (report, date).
pub struct Pipeline {
    conn: Connection,
    registry: SourceRegistry,
    downloader: Downloader,
    routes: ReportRoutes,
    date_formats: DateFormats,
    weather: Option<OpenMeteoClient>,
    locations: Vec<WeatherLocation>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("sources", &self.registry.len())
            .field("downloader", &self.downloader)
            .field("weather", &self.weather.is_some())
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    /// Creates a pipeline without the Open-Meteo source.
    #[must_use]
    pub fn new(
        conn: Connection,
        registry: SourceRegistry,
        downloader: Downloader,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            conn,
            registry,
            downloader,
            routes: ReportRoutes::standard(),
            date_formats: DateFormats::default(),
            weather: None,
            locations: all_locations(),
            clock,
        }
    }

    /// Uses `formats` when parsing report dates.
    #[must_use]
    pub fn with_date_formats(mut self, formats: DateFormats) -> Self {
        self.date_formats = formats;
        self
    }

    /// Enables the Open-Meteo source.
    #[must_use]
    pub fn with_openmeteo(mut self, client: OpenMeteoClient) -> Self {
        self.weather = Some(client);
        self
    }

    /// Replaces the Open-Meteo sampling points.
    #[must_use]
    pub fn with_locations(mut self, locations: Vec<WeatherLocation>) -> Self {
        self.locations = locations;
        self
    }

    /// Builds the production pipeline: opens the database, loads the
    /// registry, and syncs it into `data_sources`.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError`] if the registry cannot be loaded, the HTTP
    /// client cannot be built, or the database cannot be opened.
    pub fn from_config(config: &IngestConfig) -> Result<Self, IngestError> {
        let registry = config.registry()?;
        let conn = store::open(&config.database_path())?;

        let http: Arc<dyn HttpClient> =
            Arc::new(ReqwestClient::new(&config.downloader.user_agent)?);
        let downloader = Downloader::new(Arc::clone(&http), config.downloader_config());

        let mut pipeline = Self::new(conn, registry, downloader, Arc::new(SystemClock))
            .with_date_formats(config.date_formats()?);

        match config.openmeteo_config() {
            Some(openmeteo) => {
                pipeline = pipeline.with_openmeteo(OpenMeteoClient::new(http, openmeteo));
            }
            None => log::warn!("OPENMETEO_API_KEY not set; Open-Meteo weather is disabled"),
        }

        pipeline.sync_sources()?;

        Ok(pipeline)
    }

    /// The open database.
    #[must_use]
    pub const fn connection(&self) -> &Connection {
        &self.conn
    }

    /// The loaded registry.
    #[must_use]
    pub const fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    /// The time source.
    #[must_use]
    pub fn clock(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.clock)
    }

    /// Writes every registry entry into `data_sources`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a write fails.
    pub fn sync_sources(&self) -> Result<usize, DbError> {
        sources::sync_sources(
            &self.conn,
            self.registry.list_configs(),
            self.clock.now(),
        )
    }

    /// Ingests `report_code` for `date`.
    ///
    /// Unless `force` is set, a completed job for the same report and day is
    /// returned as-is without touching the network. Download, parse, and
    /// write failures end up in the returned job's `failed` state.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError`] if the report code is unknown or job
    /// bookkeeping itself fails.
    pub async fn scrape_date(
        &mut self,
        report_code: &str,
        date: NaiveDate,
        force: bool,
    ) -> Result<ScrapingJob, IngestError> {
        let config = self.registry.get_config(report_code)?.clone();
        let source_id = sources::ensure_source(&self.conn, &config, self.clock.now())?;

        if !force
            && let Some(job) = jobs::find_completed_job(&self.conn, source_id, date)?
        {
            log::info!(
                "{report_code} {date}: already completed by job {}, skipping",
                job.id
            );
            return Ok(job);
        }

        let tracker = JobTracker::begin(&self.conn, self.clock(), source_id, date)?;

        match self.run_report(&tracker, &config, date).await {
            Ok(counts) => Ok(tracker.complete(&self.conn, counts)?),
            Err(e) => Ok(tracker.fail(&self.conn, &e.job_message())?),
        }
    }

    async fn run_report(
        &mut self,
        tracker: &JobTracker,
        config: &SourceConfig,
        date: NaiveDate,
    ) -> Result<UpsertCounts, IngestError> {
        let code = config.report_code.as_str();

        tracker.log(
            &self.conn,
            LogLevel::Info,
            &format!("Starting scrape: {}", config.direct_url(date)),
        )?;

        let text = self.downloader.fetch(config, date).await?;

        let rows = text.lines().count().saturating_sub(1);
        tracker.set_rows_scraped(&self.conn, rows)?;
        tracker.log(&self.conn, LogLevel::Info, &format!("Downloaded {rows} rows"))?;

        let table = parse_with_formats(&text, &self.date_formats)?;
        let records = self.routes.transform(&table, code)?;
        tracker.log(
            &self.conn,
            LogLevel::Info,
            &format!("Parsed {} records", records.len()),
        )?;

        let counts = self
            .routes
            .upsert(&mut self.conn, code, &records, self.clock.now())?;

        Ok(counts)
    }

    /// Ingests `report_code` for every day in `start..=end`.
    ///
    /// Days that fail outside the job (unknown code, database errors) are
    /// logged and left out of the result.
    pub async fn scrape_date_range(
        &mut self,
        report_code: &str,
        start: NaiveDate,
        end: NaiveDate,
        force: bool,
    ) -> Vec<ScrapingJob> {
        let mut results = Vec::new();

        for date in start.iter_days().take_while(|d| *d <= end) {
            match self.scrape_date(report_code, date, force).await {
                Ok(job) => results.push(job),
                Err(e) => log::error!("{report_code} {date}: {e}"),
            }
        }

        results
    }

    /// Ingests the last `days` days (plus today) for one report or, with
    /// `report_code` unset, every registered report.
    pub async fn scrape_recent(
        &mut self,
        days: i64,
        report_code: Option<&str>,
        force: bool,
    ) -> Vec<ScrapingJob> {
        let end = self.clock.today();
        let start = end - TimeDelta::days(days.max(0));
        let codes = self.report_codes(report_code);

        log::info!(
            "Scraping {} report(s) from {start} to {end}",
            codes.len()
        );

        let mut results = Vec::new();
        for code in codes {
            results.extend(self.scrape_date_range(&code, start, end, force).await);
        }
        results
    }

    /// Ingests `date` for one report or, with `report_code` unset, every
    /// registered report.
    ///
    /// Reports that fail outside the job are logged and left out of the
    /// result; the remaining reports still run.
    pub async fn scrape_day(
        &mut self,
        date: NaiveDate,
        report_code: Option<&str>,
        force: bool,
    ) -> Vec<ScrapingJob> {
        let codes = self.report_codes(report_code);
        log::info!("Scraping {} report(s) for {date}", codes.len());

        let mut results = Vec::new();
        for code in codes {
            match self.scrape_date(&code, date, force).await {
                Ok(job) => results.push(job),
                Err(e) => log::error!("{code} {date}: {e}"),
            }
        }
        results
    }

    fn report_codes(&self, report_code: Option<&str>) -> Vec<String> {
        match report_code {
            Some(code) => vec![code.to_string()],
            None => self
                .registry
                .list_configs()
                .iter()
                .map(|c| c.report_code.clone())
                .collect(),
        }
    }

    /// Fetches the next 24 hours of Open-Meteo weather for every sampling
    /// point and stores it as one job.
    ///
    /// Returns `Ok(None)` when no API key is configured. Individual
    /// locations may fail; the job fails only when all of them do.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError`] if job bookkeeping fails.
    pub async fn scrape_openmeteo_weather(&mut self) -> Result<Option<ScrapingJob>, IngestError> {
        let Some(client) = self.weather.clone() else {
            log::warn!("OPENMETEO_API_KEY not set; skipping Open-Meteo weather");
            return Ok(None);
        };

        let local_now = self.clock.local_now();
        let source_id = sources::ensure_source(&self.conn, &openmeteo_source(), self.clock.now())?;
        let tracker = JobTracker::begin(&self.conn, self.clock(), source_id, local_now.date())?;

        let total = self.locations.len();
        tracker.log(
            &self.conn,
            LogLevel::Info,
            &format!("Starting Open-Meteo fetch for {total} locations"),
        )?;

        let mut records = Vec::new();
        let mut failed = Vec::new();
        for location in &self.locations {
            match client.fetch_next_day(location, local_now).await {
                Ok(response) => records.extend(parse_weather_response(
                    &response,
                    location.name,
                    location.zone,
                    local_now,
                )),
                Err(e) => {
                    log::warn!("Open-Meteo {} ({}): {e}", location.name, location.zone);
                    failed.push(location.name);
                }
            }
        }

        if failed.len() == total {
            return Ok(Some(
                tracker.fail(&self.conn, &format!("All {total} locations failed"))?,
            ));
        }
        if !failed.is_empty() {
            tracker.log(
                &self.conn,
                LogLevel::Warning,
                &format!(
                    "{} of {total} locations failed: {}",
                    failed.len(),
                    failed.join(", ")
                ),
            )?;
        }

        tracker.set_rows_scraped(&self.conn, records.len())?;
        tracker.log(
            &self.conn,
            LogLevel::Info,
            &format!("Parsed {} records", records.len()),
        )?;

        let job = match writer::upsert_batch_at(
            &mut self.conn,
            &WeatherWriter,
            &records,
            self.clock.now(),
        ) {
            Ok(counts) => tracker.complete(&self.conn, counts)?,
            Err(e) => tracker.fail(&self.conn, &IngestError::from(e).job_message())?,
        };

        Ok(Some(job))
    }

    /// When Open-Meteo weather was last written.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the query fails.
    pub fn latest_openmeteo_write(&self) -> Result<Option<NaiveDateTime>, DbError> {
        latest_weather_write(&self.conn, OPENMETEO_SOURCE)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::time::Duration;

    use grid_ingest_database_models::JobStatus;
    use grid_ingest_scraper::DownloaderConfig;
    use grid_ingest_scraper::openmeteo::OpenMeteoConfig;
    use grid_ingest_scraper::retry::RetryPolicy;
    use grid_ingest_scraper::scripted::{Reply, ScriptedClient};
    use serde_json::json;

    use super::*;
    use crate::clock::tests::FakeClock;

    const LBMP_URL: &str = "http://mis.nyiso.com/public/csv/realtime/20251113realtime_zone.csv";

    const LBMP_CSV: &str = "Time Stamp,Name,PTID,LBMP ($/MWHr)\n\
                            11/13/2025 00:05:00,WEST,61752,25.10\n\
                            11/13/2025 00:05:00,CAPITL,61757,31.02\n";

    pub fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 11, 13).unwrap()
    }

    pub fn fake_clock() -> Arc<FakeClock> {
        Arc::new(FakeClock::at(day().and_hms_opt(14, 0, 0).unwrap()))
    }

    pub fn pipeline(client: &Arc<ScriptedClient>, clock: Arc<FakeClock>) -> Pipeline {
        pipeline_with(client, clock, SourceRegistry::embedded().unwrap())
    }

    fn pipeline_with(
        client: &Arc<ScriptedClient>,
        clock: Arc<FakeClock>,
        registry: SourceRegistry,
    ) -> Pipeline {
        let downloader = Downloader::new(
            Arc::clone(client) as Arc<dyn HttpClient>,
            DownloaderConfig {
                retry: RetryPolicy {
                    max_retries: 1,
                    retry_delay: Duration::ZERO,
                    timeout: Duration::from_secs(1),
                },
                ..DownloaderConfig::default()
            },
        );
        let pipeline = Pipeline::new(
            store::open_in_memory().unwrap(),
            registry,
            downloader,
            clock,
        );
        pipeline.sync_sources().unwrap();
        pipeline
    }

    fn log_messages(pipeline: &Pipeline, job_id: i64) -> Vec<String> {
        jobs::logs_for_job(pipeline.connection(), job_id)
            .unwrap()
            .into_iter()
            .map(|l| l.message)
            .collect()
    }

    #[tokio::test]
    async fn scrapes_and_stores_a_report() {
        let client = Arc::new(ScriptedClient::new().with(LBMP_URL, Reply::csv(LBMP_CSV)));
        let mut pipeline = pipeline(&client, fake_clock());

        let job = pipeline.scrape_date("P-24A", day(), false).await.unwrap();

        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.rows_scraped, 2);
        assert_eq!(job.rows_inserted, 2);
        assert_eq!(job.rows_updated, 0);
        assert_eq!(
            log_messages(&pipeline, job.id),
            [
                format!("Starting scrape: {LBMP_URL}"),
                "Downloaded 2 rows".to_string(),
                "Parsed 2 records".to_string(),
                "Completed: 2 inserted, 0 updated".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn date_only_scrape_covers_every_registered_report() {
        let instructions = "Data Type,Report Code,Dataset Name,Filename Pattern,Direct CSV URL,Archive ZIP URL\n\
            Real-Time Zonal LBMP,P-24A,realtime_zone,{YYYYMMDD}realtime_zone.csv,\
            http://mis.nyiso.com/public/csv/realtime/{YYYYMMDD}realtime_zone.csv,\
            http://mis.nyiso.com/public/csv/realtime/{YYYYMM01}realtime_zone_csv.zip\n\
            Real-Time Actual Load,P-58B,pal,{YYYYMMDD}pal.csv,\
            http://mis.nyiso.com/public/csv/pal/{YYYYMMDD}pal.csv,\
            http://mis.nyiso.com/public/csv/pal/{YYYYMM01}pal_csv.zip\n";
        let lookup = "Report Code,Category,Update Frequency,Description\n";
        let registry =
            SourceRegistry::from_readers(instructions.as_bytes(), lookup.as_bytes()).unwrap();

        let client = Arc::new(ScriptedClient::new().with(LBMP_URL, Reply::csv(LBMP_CSV)));
        let mut pipeline = pipeline_with(&client, fake_clock(), registry);

        let jobs = pipeline.scrape_day(day(), None, false).await;

        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].status, JobStatus::Completed);
        assert_eq!(jobs[0].rows_inserted, 2);
        assert_eq!(jobs[1].status, JobStatus::Failed);
        assert!(
            client
                .requests()
                .iter()
                .any(|url| url.ends_with("20251113pal.csv"))
        );
    }

    #[tokio::test]
    async fn date_scrape_with_code_runs_only_that_report() {
        let client = Arc::new(ScriptedClient::new().with(LBMP_URL, Reply::csv(LBMP_CSV)));
        let mut pipeline = pipeline(&client, fake_clock());

        let jobs = pipeline.scrape_day(day(), Some("P-24A"), false).await;

        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].status, JobStatus::Completed);
        assert!(client.requests().iter().all(|url| url.contains("realtime")));
    }

    #[tokio::test]
    async fn completed_job_short_circuits_unless_forced() {
        let client = Arc::new(ScriptedClient::new().with(LBMP_URL, Reply::csv(LBMP_CSV)));
        let mut pipeline = pipeline(&client, fake_clock());

        let first = pipeline.scrape_date("P-24A", day(), false).await.unwrap();
        let requests = client.requests().len();

        let second = pipeline.scrape_date("P-24A", day(), false).await.unwrap();
        assert_eq!(second.id, first.id);
        assert_eq!(client.requests().len(), requests);

        let forced = pipeline.scrape_date("P-24A", day(), true).await.unwrap();
        assert_ne!(forced.id, first.id);
        assert_eq!(forced.status, JobStatus::Completed);
        assert_eq!(forced.rows_inserted, 0);
        assert_eq!(forced.rows_updated, 2);
        assert!(client.requests().len() > requests);
    }

    #[tokio::test]
    async fn download_failure_fails_the_job() {
        let client = Arc::new(ScriptedClient::new());
        let mut pipeline = pipeline(&client, fake_clock());

        let job = pipeline.scrape_date("P-24A", day(), false).await.unwrap();

        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.rows_inserted, 0);
        assert!(
            job.error_message
                .as_deref()
                .unwrap()
                .starts_with("Download failed: ")
        );
        assert!(
            jobs::find_completed_job(pipeline.connection(), job.data_source_id, day())
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn empty_report_fails_at_parse() {
        let client = Arc::new(
            ScriptedClient::new().with(LBMP_URL, Reply::csv("Time Stamp,Name,LBMP ($/MWHr)\n")),
        );
        let mut pipeline = pipeline(&client, fake_clock());

        let job = pipeline.scrape_date("P-24A", day(), false).await.unwrap();

        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.rows_scraped, 0);
        assert_eq!(
            job.error_message.as_deref(),
            Some("Parse failed: CSV file is empty")
        );
    }

    #[tokio::test]
    async fn unknown_report_code_is_an_error() {
        let client = Arc::new(ScriptedClient::new());
        let mut pipeline = pipeline(&client, fake_clock());

        let result = pipeline.scrape_date("P-999", day(), false).await;
        assert!(matches!(result, Err(IngestError::Source(_))));
        assert!(client.requests().is_empty());
    }

    #[tokio::test]
    async fn date_range_is_inclusive() {
        let client = Arc::new(ScriptedClient::new());
        let mut pipeline = pipeline(&client, fake_clock());

        let jobs = pipeline
            .scrape_date_range("P-2A", day() - TimeDelta::days(2), day(), false)
            .await;

        let dates: Vec<NaiveDate> = jobs.iter().map(|j| j.target_date.date()).collect();
        assert_eq!(
            dates,
            [day() - TimeDelta::days(2), day() - TimeDelta::days(1), day()]
        );
    }

    fn weather_pipeline(client: &Arc<ScriptedClient>) -> Pipeline {
        let openmeteo = OpenMeteoClient::new(
            Arc::clone(client) as Arc<dyn HttpClient>,
            OpenMeteoConfig {
                retry_delay: Duration::ZERO,
                ..OpenMeteoConfig::with_api_key("key")
            },
        );
        let locations = all_locations().into_iter().take(2).collect();
        pipeline(client, fake_clock())
            .with_openmeteo(openmeteo)
            .with_locations(locations)
    }

    #[tokio::test]
    async fn weather_without_api_key_is_skipped() {
        let client = Arc::new(ScriptedClient::new());
        let mut pipeline = pipeline(&client, fake_clock());

        assert!(pipeline.scrape_openmeteo_weather().await.unwrap().is_none());
        assert!(client.requests().is_empty());
    }

    #[tokio::test]
    async fn weather_completes_when_some_locations_succeed() {
        let buffalo = all_locations()[0];
        let weather = OpenMeteoClient::new(
            Arc::new(ScriptedClient::new()),
            OpenMeteoConfig::with_api_key("key"),
        );
        let url = weather.request_url(&buffalo, day(), day() + TimeDelta::days(1));

        let response = json!({
            "hourly": {
                "time": ["2025-11-13T14:00", "2025-11-13T15:00"],
                "temperature_2m": [10.0, 11.0],
                "relativehumidity_2m": [55, 60],
                "direct_normal_irradiance": [120.0, 90.0],
                "wind_speed_10m": [2.0, 3.0]
            }
        });
        let client = Arc::new(ScriptedClient::new().with(&url, Reply::json(&response)));
        let mut pipeline = weather_pipeline(&client);

        let job = pipeline.scrape_openmeteo_weather().await.unwrap().unwrap();

        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.rows_scraped, 2);
        assert_eq!(job.rows_inserted, 2);
        assert!(
            log_messages(&pipeline, job.id)
                .iter()
                .any(|m| m.starts_with("1 of 2 locations failed"))
        );
        assert_eq!(
            pipeline.latest_openmeteo_write().unwrap(),
            Some(fake_clock().now())
        );
        assert!(
            sources::source_id(pipeline.connection(), OPENMETEO_REPORT_CODE)
                .unwrap()
                .is_some()
        );
    }

    #[tokio::test]
    async fn weather_fails_when_every_location_fails() {
        let client = Arc::new(ScriptedClient::new());
        let mut pipeline = weather_pipeline(&client);

        let job = pipeline.scrape_openmeteo_weather().await.unwrap().unwrap();

        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.error_message.as_deref(), Some("All 2 locations failed"));
        assert_eq!(pipeline.latest_openmeteo_write().unwrap(), None);
    }
}
