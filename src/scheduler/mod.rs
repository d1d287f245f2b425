//! Cron-driven triggering of backup runs.

use chrono::{DateTime, Local};
use cron::Schedule;
use std::future::Future;
use std::str::FromStr;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use crate::errors::{AppError, Result};

/// A parsed cron expression.
///
/// Accepts crontab-style 5-field expressions (minute first) as well as 6 and
/// 7-field ones with a leading seconds field. Numeric day-of-week values
/// follow crontab conventions: 0 and 7 are Sunday, 1 is Monday.
#[derive(Debug, Clone)]
pub struct CronSchedule {
    expression: String,
    schedule: Schedule,
}

impl CronSchedule {
    pub fn parse(expression: &str) -> Result<Self> {
        let mut fields: Vec<String> = expression.split_whitespace().map(str::to_string).collect();
        let day_of_week = match fields.len() {
            5 => {
                fields.insert(0, "0".to_string());
                5
            }
            6 | 7 => 5,
            n => {
                return Err(AppError::Schedule(format!(
                    "'{}' has {} fields, expected 5, 6 or 7",
                    expression, n
                )));
            }
        };
        fields[day_of_week] = translate_day_of_week(&fields[day_of_week]);

        let schedule = Schedule::from_str(&fields.join(" "))
            .map_err(|e| AppError::Schedule(format!("'{}': {}", expression, e)))?;

        Ok(CronSchedule {
            expression: expression.trim().to_string(),
            schedule,
        })
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// First firing strictly after `after`.
    pub fn next_after(&self, after: DateTime<Local>) -> Option<DateTime<Local>> {
        self.schedule.after(&after).next()
    }
}

// The cron crate numbers weekdays 1 (Sunday) to 7 (Saturday).
fn translate_day_of_week(field: &str) -> String {
    field
        .split(',')
        .map(translate_day_of_week_item)
        .collect::<Vec<_>>()
        .join(",")
}

fn translate_day_of_week_item(item: &str) -> String {
    let (range, step) = match item.split_once('/') {
        Some((range, step)) => (range, Some(step)),
        None => (item, None),
    };

    let translated = match range.split_once('-') {
        Some((start, end)) => match (parse_day(start), parse_day(end)) {
            (Some(0), Some(7)) => "1-7".to_string(),
            // A range ending on Sunday-as-7 wraps past Saturday.
            (Some(start), Some(7)) if step.is_none() => return format!("{}-7,1", start + 1),
            (Some(start), Some(end)) => format!("{}-{}", start % 7 + 1, end % 7 + 1),
            _ => range.to_string(),
        },
        None => match parse_day(range) {
            Some(day) => (day % 7 + 1).to_string(),
            None => range.to_string(),
        },
    };

    match step {
        Some(step) => format!("{}/{}", translated, step),
        None => translated,
    }
}

fn parse_day(value: &str) -> Option<u8> {
    value.parse::<u8>().ok().filter(|day| *day <= 7)
}

/// Fires `job` at every upcoming time of `schedule` until `shutdown` is
/// cancelled. Each firing runs on its own task in `tracker`, so a slow job
/// never delays the next trigger and callers can wait for firings in flight.
pub fn spawn_cron<F, Fut>(
    schedule: CronSchedule,
    shutdown: CancellationToken,
    tracker: TaskTracker,
    job: F,
) -> JoinHandle<()>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        info!("⏰ Backup scheduled with cron expression: {}", schedule.expression());
        let mut after = Local::now();

        loop {
            let Some(next) = schedule.next_after(after) else {
                warn!("Cron expression {} has no upcoming firings, scheduler stopping", schedule.expression());
                break;
            };
            let wait = (next - Local::now()).to_std().unwrap_or_default();
            debug!("Next scheduled backup at {}", next);

            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Scheduler stopped");
                    break;
                }
                _ = tokio::time::sleep(wait) => {
                    tracker.spawn(job());
                    // Missed firings (e.g. after a suspend) are not replayed.
                    after = next.max(Local::now());
                }
            }
        }
    })
}

/// Runs the agent's trigger loop: an optional immediate run, then cron
/// firings until `shutdown` is cancelled. Returns once every run it started
/// has finished.
///
/// Without a schedule it returns as soon as the startup run (if any) is done.
pub async fn serve<F, Fut>(
    schedule: Option<CronSchedule>,
    run_on_startup: bool,
    shutdown: CancellationToken,
    job: F,
) -> Result<()>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let tracker = TaskTracker::new();

    if run_on_startup {
        info!("RUN_ON_STARTUP enabled, starting backup now...");
        tracker.spawn(job());
    }

    match schedule {
        Some(schedule) => {
            let cron_task = spawn_cron(schedule, shutdown.clone(), tracker.clone(), job);
            shutdown.cancelled().await;
            cron_task
                .await
                .map_err(|e| AppError::Schedule(format!("scheduler task failed: {}", e)))?;
        }
        None if !run_on_startup => {
            warn!("Neither CRON nor RUN_ON_STARTUP is set, nothing to do.");
        }
        None => {}
    }

    tracker.close();
    if !tracker.is_empty() {
        info!("Waiting for {} backup run(s) in progress to stop", tracker.len());
    }
    tracker.wait().await;
    Ok(())
}
