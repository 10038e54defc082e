//! `ekiboard-scheduler`: the control loop that keeps the snapshot files
//! current and the renderer running.
//!
//! # Overview
//!
//! Every tick the [`engine::SchedulerEngine`]:
//!
//! | Step | Action                                                     |
//! |------|------------------------------------------------------------|
//! | 1    | relaunch the renderer if it exited                         |
//! | 2    | advance the daily first/last flag, refreshing if due       |
//! | 3    | evaluate the trigger against `departure.json`              |
//! | 4    | spawn a search cycle (departure → operation → weather)     |
//!
//! At most one search cycle is in flight, and a new one waits for the
//! cooldown after the previous one finished.

pub mod daily;
pub mod engine;
pub mod error;
pub mod renderer;
pub mod trigger;
pub mod types;

pub use daily::DailyFlag;
pub use engine::{Clock, SchedulerEngine};
pub use error::{Result, SchedulerError};
pub use renderer::Renderer;
pub use trigger::{evaluate, Decision, FetchReason, TriggerInput, WaitReason};
pub use types::{CycleFinished, CycleTask, SchedulerState, TickOutcome};
