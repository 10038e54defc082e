use std::path::PathBuf;

use chrono::NaiveTime;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

// Scheduling constants. Empirically tuned; kept as named defaults.
pub const DEFAULT_TICK_SECS: u64 = 10;
pub const DEFAULT_COOLDOWN_SECS: u64 = 60;
pub const DEFAULT_LOOKAHEAD_MINS: i64 = 14;
pub const DEFAULT_STALE_AFTER_MINS: i64 = 60;
pub const DEFAULT_SEARCH_BASE_OFFSET_MINS: i64 = 10;
pub const DEFAULT_SEARCH_EXTRA_OFFSET_MINS: i64 = 15;
pub const DEFAULT_ROLLOVER_DEPARTURE_BEFORE: &str = "03:00";
pub const DEFAULT_ROLLOVER_NOW_AFTER: &str = "21:00";
pub const DEFAULT_DAILY_RESET_HOUR: u32 = 2;
pub const DEFAULT_DAILY_RUN_HOUR: u32 = 3;
pub const DEFAULT_FIRST_LAST_DAY_SHIFT_HOURS: i64 = 3;

// Weather (JMA) constants.
pub const DEFAULT_AREA_CODE: &str = "130000"; // Tokyo
pub const DEFAULT_WEATHER_CACHE_TTL_MINS: i64 = 60;
pub const DEFAULT_FORECAST_BASE_URL: &str = "https://www.jma.go.jp/bosai/forecast/data/forecast";
pub const DEFAULT_LATEST_TIME_URL: &str = "https://www.jma.go.jp/bosai/amedas/data/latest_time.txt";

// Transit site constants.
pub const DEFAULT_TRANSIT_BASE_URL: &str = "https://transit.yahoo.co.jp/search/result";
pub const DEFAULT_DELAY_BOARD_BASE_URL: &str = "https://transit.yahoo.co.jp/diainfo/area";
pub const DEFAULT_DELAY_BOARD_AREA: u32 = 4; // Kanto
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_WEATHER_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/100.0.0.0 Safari/537.36";

/// Top-level config (ekiboard.toml + EKIBOARD_* env overrides).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EkiboardConfig {
    #[serde(default)]
    pub stations: StationsConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub weather: WeatherConfig,
    #[serde(default)]
    pub sources: SourcesConfig,
    #[serde(default)]
    pub renderer: RendererConfig,
}

/// Origin station plus one example destination per direction of travel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StationsConfig {
    pub origin: String,
    pub destinations: Vec<String>,
}

impl Default for StationsConfig {
    fn default() -> Self {
        Self {
            origin: "登戸".to_string(),
            destinations: vec!["新宿".to_string(), "町田".to_string()],
        }
    }
}

/// Where snapshot files live. The renderer reads the same directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_storage_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_operation_file")]
    pub operation_file: String,
    #[serde(default = "default_departure_file")]
    pub departure_file: String,
    #[serde(default = "default_first_last_file")]
    pub first_last_file: String,
    #[serde(default = "default_weather_file")]
    pub weather_file: String,
    #[serde(default = "default_weather_raw_file")]
    pub weather_raw_file: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dir: default_storage_dir(),
            operation_file: default_operation_file(),
            departure_file: default_departure_file(),
            first_last_file: default_first_last_file(),
            weather_file: default_weather_file(),
            weather_raw_file: default_weather_raw_file(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Control loop period.
    #[serde(default = "default_tick_secs")]
    pub tick_secs: u64,
    /// Minimum gap between two search cycles.
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,
    /// A search is triggered this long before the earliest cached departure.
    #[serde(default = "default_lookahead_mins")]
    pub lookahead_mins: i64,
    /// A cached departure further in the past than this forces a search.
    #[serde(default = "default_stale_after_mins")]
    pub stale_after_mins: i64,
    /// Live searches ask for trains leaving `base + extra` minutes from now.
    #[serde(default = "default_search_base_offset_mins")]
    pub search_base_offset_mins: i64,
    #[serde(default = "default_search_extra_offset_mins")]
    pub search_extra_offset_mins: i64,
    /// Departures before this time of day seen after `rollover_now_after`
    /// belong to the next calendar day.
    #[serde(default = "default_rollover_departure_before")]
    pub rollover_departure_before: NaiveTime,
    #[serde(default = "default_rollover_now_after")]
    pub rollover_now_after: NaiveTime,
    #[serde(default = "default_daily_reset_hour")]
    pub daily_reset_hour: u32,
    #[serde(default = "default_daily_run_hour")]
    pub daily_run_hour: u32,
    /// First/last searches run for the service day of `now - shift`.
    #[serde(default = "default_first_last_day_shift_hours")]
    pub first_last_day_shift_hours: i64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            tick_secs: DEFAULT_TICK_SECS,
            cooldown_secs: DEFAULT_COOLDOWN_SECS,
            lookahead_mins: DEFAULT_LOOKAHEAD_MINS,
            stale_after_mins: DEFAULT_STALE_AFTER_MINS,
            search_base_offset_mins: DEFAULT_SEARCH_BASE_OFFSET_MINS,
            search_extra_offset_mins: DEFAULT_SEARCH_EXTRA_OFFSET_MINS,
            rollover_departure_before: default_rollover_departure_before(),
            rollover_now_after: default_rollover_now_after(),
            daily_reset_hour: DEFAULT_DAILY_RESET_HOUR,
            daily_run_hour: DEFAULT_DAILY_RUN_HOUR,
            first_last_day_shift_hours: DEFAULT_FIRST_LAST_DAY_SHIFT_HOURS,
        }
    }
}

impl ScheduleConfig {
    pub fn cooldown(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.cooldown_secs as i64)
    }

    pub fn lookahead(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.lookahead_mins)
    }

    pub fn stale_after(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.stale_after_mins)
    }

    /// Total offset added to "now" for a live departure search.
    pub fn search_offset(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.search_base_offset_mins + self.search_extra_offset_mins)
    }

    pub fn first_last_day_shift(&self) -> chrono::Duration {
        chrono::Duration::hours(self.first_last_day_shift_hours)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    #[serde(default = "default_area_code")]
    pub area_code: String,
    #[serde(default = "default_weather_cache_ttl_mins")]
    pub cache_ttl_mins: i64,
    #[serde(default = "default_forecast_base_url")]
    pub forecast_base_url: String,
    #[serde(default = "default_latest_time_url")]
    pub latest_time_url: String,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            area_code: default_area_code(),
            cache_ttl_mins: DEFAULT_WEATHER_CACHE_TTL_MINS,
            forecast_base_url: default_forecast_base_url(),
            latest_time_url: default_latest_time_url(),
        }
    }
}

impl WeatherConfig {
    pub fn cache_ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.cache_ttl_mins)
    }

    /// Full forecast document URL for the configured area.
    pub fn forecast_url(&self) -> String {
        format!(
            "{}/{}.json",
            self.forecast_base_url.trim_end_matches('/'),
            self.area_code
        )
    }
}

/// Upstream endpoints for transit and delay-board pages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesConfig {
    #[serde(default = "default_transit_base_url")]
    pub transit_base_url: String,
    #[serde(default = "default_delay_board_base_url")]
    pub delay_board_base_url: String,
    #[serde(default = "default_delay_board_area")]
    pub delay_board_area: u32,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_weather_timeout_secs")]
    pub weather_timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            transit_base_url: default_transit_base_url(),
            delay_board_base_url: default_delay_board_base_url(),
            delay_board_area: DEFAULT_DELAY_BOARD_AREA,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            weather_timeout_secs: DEFAULT_WEATHER_TIMEOUT_SECS,
            user_agent: default_user_agent(),
        }
    }
}

/// The external display process supervised by the scheduler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RendererConfig {
    /// When false the scheduler runs headless.
    #[serde(default = "bool_true")]
    pub enabled: bool,
    /// Program followed by its arguments.
    #[serde(default = "default_renderer_command")]
    pub command: Vec<String>,
    /// Run with the renderer's pid appended to stop it. The renderer runs
    /// under `sudo`, so signalling our direct child is not enough. Empty
    /// means kill the child directly.
    #[serde(default = "default_renderer_stop_command")]
    pub stop_command: Vec<String>,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            command: default_renderer_command(),
            stop_command: default_renderer_stop_command(),
        }
    }
}

fn bool_true() -> bool {
    true
}
fn default_storage_dir() -> PathBuf {
    PathBuf::from("information_json_files")
}
fn default_operation_file() -> String {
    "operation.json".to_string()
}
fn default_departure_file() -> String {
    "departure.json".to_string()
}
fn default_first_last_file() -> String {
    "first_last_train.json".to_string()
}
fn default_weather_file() -> String {
    "weather_forecast.json".to_string()
}
fn default_weather_raw_file() -> String {
    "jma_forecast_raw.json".to_string()
}
fn default_tick_secs() -> u64 {
    DEFAULT_TICK_SECS
}
fn default_cooldown_secs() -> u64 {
    DEFAULT_COOLDOWN_SECS
}
fn default_lookahead_mins() -> i64 {
    DEFAULT_LOOKAHEAD_MINS
}
fn default_stale_after_mins() -> i64 {
    DEFAULT_STALE_AFTER_MINS
}
fn default_search_base_offset_mins() -> i64 {
    DEFAULT_SEARCH_BASE_OFFSET_MINS
}
fn default_search_extra_offset_mins() -> i64 {
    DEFAULT_SEARCH_EXTRA_OFFSET_MINS
}
fn default_rollover_departure_before() -> NaiveTime {
    NaiveTime::parse_from_str(DEFAULT_ROLLOVER_DEPARTURE_BEFORE, "%H:%M").unwrap_or(NaiveTime::MIN)
}
fn default_rollover_now_after() -> NaiveTime {
    NaiveTime::parse_from_str(DEFAULT_ROLLOVER_NOW_AFTER, "%H:%M").unwrap_or(NaiveTime::MIN)
}
fn default_daily_reset_hour() -> u32 {
    DEFAULT_DAILY_RESET_HOUR
}
fn default_daily_run_hour() -> u32 {
    DEFAULT_DAILY_RUN_HOUR
}
fn default_first_last_day_shift_hours() -> i64 {
    DEFAULT_FIRST_LAST_DAY_SHIFT_HOURS
}
fn default_area_code() -> String {
    DEFAULT_AREA_CODE.to_string()
}
fn default_weather_cache_ttl_mins() -> i64 {
    DEFAULT_WEATHER_CACHE_TTL_MINS
}
fn default_forecast_base_url() -> String {
    DEFAULT_FORECAST_BASE_URL.to_string()
}
fn default_latest_time_url() -> String {
    DEFAULT_LATEST_TIME_URL.to_string()
}
fn default_transit_base_url() -> String {
    DEFAULT_TRANSIT_BASE_URL.to_string()
}
fn default_delay_board_base_url() -> String {
    DEFAULT_DELAY_BOARD_BASE_URL.to_string()
}
fn default_delay_board_area() -> u32 {
    DEFAULT_DELAY_BOARD_AREA
}
fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}
fn default_weather_timeout_secs() -> u64 {
    DEFAULT_WEATHER_TIMEOUT_SECS
}
fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}
fn default_renderer_command() -> Vec<String> {
    vec!["sudo".to_string(), "./draw_matrix".to_string()]
}
fn default_renderer_stop_command() -> Vec<String> {
    vec!["sudo".to_string(), "kill".to_string()]
}

impl EkiboardConfig {
    /// Load config from a TOML file with EKIBOARD_* env var overrides.
    ///
    /// Checks in order:
    ///   1. Explicit path argument
    ///   2. ./ekiboard.toml
    ///
    /// Nested keys use a double underscore, e.g.
    /// `EKIBOARD_SCHEDULE__TICK_SECS=5`.
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        let config: EkiboardConfig = Figment::from(Serialized::defaults(EkiboardConfig::default()))
            .merge(Toml::file(&path))
            .merge(Env::prefixed("EKIBOARD_").split("__"))
            .extract()
            .map_err(|e| crate::error::CoreError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> crate::error::Result<()> {
        if self.stations.destinations.is_empty() {
            return Err(crate::error::CoreError::Config(
                "stations.destinations must not be empty".to_string(),
            ));
        }
        if self.schedule.tick_secs == 0 {
            return Err(crate::error::CoreError::Config(
                "schedule.tick_secs must be > 0".to_string(),
            ));
        }
        if self.schedule.daily_reset_hour > 23 || self.schedule.daily_run_hour > 23 {
            return Err(crate::error::CoreError::Config(
                "schedule daily hours must be in 0..=23".to_string(),
            ));
        }
        if self.renderer.enabled && self.renderer.command.is_empty() {
            return Err(crate::error::CoreError::Config(
                "renderer.command must name a program when the renderer is enabled".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_config_path() -> String {
    "ekiboard.toml".to_string()
}
