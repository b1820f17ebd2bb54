//! Teacher availability: weekly rules, blackouts and their expansion into
//! concrete UTC windows.
//!
//! Recurring rules are written in the teacher's local time. Expansion walks
//! the teacher's calendar days covering the requested range (starting one day
//! early so rules crossing midnight are caught), turns each matching rule into
//! a UTC window, then subtracts blackouts and occupied sessions, clips to the
//! range and merges.
//!
//! Local times are mapped to UTC as follows:
//!
//! - ambiguous times (clocks going back) take the earliest instant
//! - nonexistent times (clocks going forward) are read with the offset in
//!   force before the transition, which lands them just after the gap

use chrono::{
    DateTime, Datelike, Duration, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, Offset,
    TimeZone, Utc,
};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::{Validate, ValidationError};

use crate::ids::{AvailabilityId, TeacherId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "availability_kind", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AvailabilityKind {
    Recurring,
    Blackout,
}

/// One availability row. Recurring rows use the weekday/time columns,
/// blackout rows the UTC instants.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct TeacherAvailability {
    pub id: AvailabilityId,
    pub teacher_id: TeacherId,
    pub kind: AvailabilityKind,
    /// 0 = Sunday … 6 = Saturday
    pub weekday: Option<i16>,
    #[schema(value_type = Option<String>, example = "09:00:00")]
    pub start_time: Option<NaiveTime>,
    #[schema(value_type = Option<String>, example = "17:00:00")]
    pub end_time: Option<NaiveTime>,
    pub start_at: Option<DateTime<Utc>>,
    pub end_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl TeacherAvailability {
    pub fn weekly_rule(&self) -> Option<WeeklyRule> {
        if self.kind != AvailabilityKind::Recurring || !self.is_active {
            return None;
        }
        Some(WeeklyRule {
            weekday: u32::try_from(self.weekday?).ok()?,
            start_time: self.start_time?,
            end_time: self.end_time?,
        })
    }

    pub fn blackout(&self) -> Option<AvailabilityWindow> {
        if self.kind != AvailabilityKind::Blackout || !self.is_active {
            return None;
        }
        Some(AvailabilityWindow::new(self.start_at?, self.end_at?))
    }
}

/// A recurring weekly slot in local time. `end_time <= start_time` means the
/// slot runs past midnight into the next day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeeklyRule {
    pub weekday: u32,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

impl WeeklyRule {
    pub fn crosses_midnight(&self) -> bool {
        self.end_time <= self.start_time
    }
}

fn validate_availability(dto: &CreateAvailabilityDto) -> Result<(), ValidationError> {
    match dto.kind {
        AvailabilityKind::Recurring => {
            let (Some(weekday), Some(start), Some(end)) = (dto.weekday, dto.start_time, dto.end_time)
            else {
                return Err(ValidationError::new("recurring")
                    .with_message("recurring rules need weekday, start_time and end_time".into()));
            };
            if !(0..=6).contains(&weekday) {
                return Err(ValidationError::new("weekday")
                    .with_message("weekday must be between 0 (Sunday) and 6 (Saturday)".into()));
            }
            if start == end {
                return Err(ValidationError::new("recurring")
                    .with_message("start_time and end_time must differ".into()));
            }
        }
        AvailabilityKind::Blackout => {
            let (Some(start), Some(end)) = (dto.start_at, dto.end_at) else {
                return Err(ValidationError::new("blackout")
                    .with_message("blackouts need start_at and end_at".into()));
            };
            if end <= start {
                return Err(ValidationError::new("blackout")
                    .with_message("end_at must be after start_at".into()));
            }
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[validate(schema(function = "validate_availability"))]
pub struct CreateAvailabilityDto {
    pub kind: AvailabilityKind,
    pub weekday: Option<i16>,
    #[schema(value_type = Option<String>, example = "09:00:00")]
    pub start_time: Option<NaiveTime>,
    #[schema(value_type = Option<String>, example = "17:00:00")]
    pub end_time: Option<NaiveTime>,
    pub start_at: Option<DateTime<Utc>>,
    pub end_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AvailabilityQuery {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    /// Keep windows already taken by the teacher's sessions
    #[serde(default)]
    pub include_occupied: bool,
}

/// Half-open UTC interval `[start_at, end_at)`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, FromRow, ToSchema,
)]
pub struct AvailabilityWindow {
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
}

impl AvailabilityWindow {
    pub fn new(start_at: DateTime<Utc>, end_at: DateTime<Utc>) -> Self {
        Self { start_at, end_at }
    }

    pub fn is_empty(&self) -> bool {
        self.end_at <= self.start_at
    }

    pub fn contains(&self, start_at: DateTime<Utc>, end_at: DateTime<Utc>) -> bool {
        self.start_at <= start_at && end_at <= self.end_at
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TeacherAvailabilityResponse {
    pub teacher_id: TeacherId,
    pub timezone: String,
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub windows: Vec<AvailabilityWindow>,
}

/// Map a local wall-clock time in `tz` to UTC.
pub fn local_to_utc(tz: Tz, local: NaiveDateTime) -> DateTime<Utc> {
    match tz.from_local_datetime(&local) {
        LocalResult::Single(dt) => dt.with_timezone(&Utc),
        LocalResult::Ambiguous(earliest, _) => earliest.with_timezone(&Utc),
        LocalResult::None => {
            let before = tz
                .offset_from_utc_datetime(&(local - Duration::hours(24)))
                .fix()
                .local_minus_utc();
            let utc = local - Duration::seconds(i64::from(before));
            Utc.from_utc_datetime(&utc)
        }
    }
}

/// Expand weekly rules into UTC windows for every local day touching
/// `[from, to)`. Output is unclipped and unmerged.
pub fn expand_weekly_rules(
    tz: Tz,
    rules: &[WeeklyRule],
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Vec<AvailabilityWindow> {
    let first: NaiveDate = from.with_timezone(&tz).date_naive() - Duration::days(1);
    let last: NaiveDate = to.with_timezone(&tz).date_naive();

    let mut windows = Vec::new();
    for day in first.iter_days().take_while(|d| *d <= last) {
        let weekday = day.weekday().num_days_from_sunday();
        for rule in rules.iter().filter(|r| r.weekday == weekday) {
            let end_day = if rule.crosses_midnight() {
                day + Duration::days(1)
            } else {
                day
            };
            let window = AvailabilityWindow::new(
                local_to_utc(tz, day.and_time(rule.start_time)),
                local_to_utc(tz, end_day.and_time(rule.end_time)),
            );
            if !window.is_empty() {
                windows.push(window);
            }
        }
    }
    windows
}

/// Sort and coalesce overlapping or touching windows, dropping empty ones.
pub fn merge_windows(mut windows: Vec<AvailabilityWindow>) -> Vec<AvailabilityWindow> {
    windows.retain(|w| !w.is_empty());
    windows.sort();

    let mut merged: Vec<AvailabilityWindow> = Vec::with_capacity(windows.len());
    for window in windows {
        match merged.last_mut() {
            Some(last) if window.start_at <= last.end_at => {
                last.end_at = last.end_at.max(window.end_at);
            }
            _ => merged.push(window),
        }
    }
    merged
}

/// Remove every `cut` from `windows`, splitting windows a cut lands inside.
pub fn subtract_windows(
    windows: Vec<AvailabilityWindow>,
    cuts: &[AvailabilityWindow],
) -> Vec<AvailabilityWindow> {
    let cuts = merge_windows(cuts.to_vec());
    let mut out = Vec::with_capacity(windows.len());

    for window in windows {
        let mut cursor = window.start_at;
        for cut in &cuts {
            if cut.end_at <= cursor || cut.start_at >= window.end_at {
                continue;
            }
            if cut.start_at > cursor {
                out.push(AvailabilityWindow::new(cursor, cut.start_at));
            }
            cursor = cursor.max(cut.end_at);
            if cursor >= window.end_at {
                break;
            }
        }
        if cursor < window.end_at {
            out.push(AvailabilityWindow::new(cursor, window.end_at));
        }
    }
    out
}

pub fn clip_windows(
    windows: Vec<AvailabilityWindow>,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Vec<AvailabilityWindow> {
    windows
        .into_iter()
        .map(|w| AvailabilityWindow::new(w.start_at.max(from), w.end_at.min(to)))
        .filter(|w| !w.is_empty())
        .collect()
}

/// Full expansion: rules, minus blackouts, minus occupied time, clipped to
/// `[from, to)` and merged.
pub fn expand_availability(
    tz: Tz,
    rules: &[WeeklyRule],
    blackouts: &[AvailabilityWindow],
    occupied: &[AvailabilityWindow],
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Vec<AvailabilityWindow> {
    let windows = merge_windows(expand_weekly_rules(tz, rules, from, to));
    let windows = subtract_windows(windows, blackouts);
    let windows = subtract_windows(windows, occupied);
    merge_windows(clip_windows(windows, from, to))
}

/// Whether `[start_at, end_at)` fits entirely inside one window.
pub fn covers(windows: &[AvailabilityWindow], start_at: DateTime<Utc>, end_at: DateTime<Utc>) -> bool {
    windows.iter().any(|w| w.contains(start_at, end_at))
}
