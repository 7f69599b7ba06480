use crate::error::{ConfigError, SchedulerError};
use crate::snapshotter::Snapshotter;
use chrono::{DateTime, Local, TimeZone, Utc};
use chrono_tz::Tz;
use cron::Schedule;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

const WEEKDAY_NAMES: [&str; 8] = ["SUN", "MON", "TUE", "WED", "THU", "FRI", "SAT", "SUN"];

/// A parsed cron expression.
///
/// Accepts the standard five-field form (minute resolution, weekdays 0-7
/// with 0 and 7 both Sunday) as well as the six and seven-field forms with
/// leading seconds, which use the `cron` crate's own dialect.
#[derive(Debug, Clone)]
pub struct CronSchedule {
    expression: String,
    schedule: Schedule,
}

impl CronSchedule {
    pub fn parse(expression: &str) -> Result<Self, ConfigError> {
        let expression = expression.trim();
        let fields: Vec<&str> = expression.split_whitespace().collect();
        let normalized = match fields.as_slice() {
            [minute, hour, day, month, weekday] => {
                format!("0 {minute} {hour} {day} {month} {}", weekday_names(weekday)?)
            }
            _ => expression.to_string(),
        };
        let schedule = Schedule::from_str(&normalized).map_err(|e| {
            ConfigError::InvalidValue(format!("cron schedule {expression:?}: {e}"))
        })?;

        Ok(Self {
            expression: expression.to_string(),
            schedule,
        })
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// The first firing strictly after `after`, in `after`'s timezone.
    pub fn next_after<Z: TimeZone>(&self, after: &DateTime<Z>) -> Option<DateTime<Z>> {
        self.schedule.after(after).next()
    }
}

/// Rewrites a standard cron day-of-week field with day names, since the
/// `cron` crate numbers weekdays from 1 (Sunday) rather than 0.
fn weekday_names(field: &str) -> Result<String, ConfigError> {
    let items = field
        .split(',')
        .map(|item| {
            let (range, step) = match item.split_once('/') {
                Some((range, step)) => (range, format!("/{step}")),
                None => (item, String::new()),
            };
            Ok(match range.split_once('-') {
                Some((start, end)) => {
                    let start = weekday_or_raw(start)?;
                    match end {
                        // Sunday sorts before Saturday in the crate's numbering.
                        "7" if start == "SUN" => format!("SUN-SAT{step}"),
                        "7" => format!("{start}-SAT{step},SUN"),
                        _ => format!("{start}-{}{step}", weekday_or_raw(end)?),
                    }
                }
                None => format!("{}{step}", weekday_or_raw(range)?),
            })
        })
        .collect::<Result<Vec<_>, ConfigError>>()?;
    Ok(items.join(","))
}

fn weekday_or_raw(value: &str) -> Result<&str, ConfigError> {
    match value.parse::<usize>() {
        Ok(n) => WEEKDAY_NAMES
            .get(n)
            .copied()
            .ok_or_else(|| ConfigError::InvalidValue(format!("cron day of week {value:?}"))),
        Err(_) => Ok(value),
    }
}

/// Timezone a schedule is evaluated in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleZone {
    Local,
    Named(Tz),
}

impl ScheduleZone {
    pub fn from_option(tz: Option<Tz>) -> Self {
        tz.map_or(ScheduleZone::Local, ScheduleZone::Named)
    }

    pub fn next_run(&self, schedule: &CronSchedule, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            ScheduleZone::Local => schedule
                .next_after(&now.with_timezone(&Local))
                .map(|t| t.with_timezone(&Utc)),
            ScheduleZone::Named(tz) => schedule
                .next_after(&now.with_timezone(tz))
                .map(|t| t.with_timezone(&Utc)),
        }
    }
}

impl fmt::Display for ScheduleZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScheduleZone::Local => write!(f, "Local"),
            ScheduleZone::Named(tz) => write!(f, "{}", tz.name()),
        }
    }
}

/// Background task running a snapshot cycle at every cron firing.
pub struct SnapshotScheduler {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl SnapshotScheduler {
    pub fn start(schedule: CronSchedule, zone: ScheduleZone, snapshotter: Arc<Snapshotter>) -> Self {
        let token = CancellationToken::new();
        info!(location = %zone, schedule = schedule.expression(), "Scheduler created");

        match zone.next_run(&schedule, Utc::now()) {
            Some(next_run) => info!(next_run = %next_run, "Cron scheduler started"),
            None => warn!("Cron schedule has no upcoming runs"),
        }

        let handle = tokio::spawn(run_schedule(schedule, zone, snapshotter, token.clone()));
        Self { token, handle }
    }

    /// Stops the scheduler. A cycle already in progress runs to completion
    /// first.
    pub async fn shutdown(self) -> Result<(), SchedulerError> {
        self.token.cancel();
        self.handle
            .await
            .map_err(|e| SchedulerError::Shutdown(e.to_string()))
    }
}

async fn run_schedule(
    schedule: CronSchedule,
    zone: ScheduleZone,
    snapshotter: Arc<Snapshotter>,
    token: CancellationToken,
) {
    loop {
        let now = Utc::now();
        let Some(next_run) = zone.next_run(&schedule, now) else {
            break;
        };
        let wait = (next_run - now).to_std().unwrap_or_default();

        tokio::select! {
            _ = token.cancelled() => break,
            _ = tokio::time::sleep(wait) => {}
        }

        if let Err(e) = snapshotter.save_snapshots().await {
            error!(error = %e, "Error saving snapshots");
        }
    }
}
