//! Signup velocity: how fast a course is gaining enrollments compared with
//! the previous day.

use std::cmp::Ordering;

use chrono::{DateTime, Duration, Utc};

use pathwise_shared::constants::{COLD_START_VELOCITY, VELOCITY_WINDOW_HOURS};
use pathwise_store::TrendingEntry;

use crate::providers::CourseInfo;

/// Signups in the last window and the one before it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WindowCounts {
    /// Start time in `(now - 24h, now]`.
    pub current: u32,
    /// Start time in `(now - 48h, now - 24h]`.
    pub previous: u32,
}

impl WindowCounts {
    pub fn velocity(&self) -> f64 {
        velocity(self.current, self.previous)
    }
}

/// Earliest instant (exclusive) that can fall in either window.
pub fn lookback_start(now: DateTime<Utc>) -> DateTime<Utc> {
    now - Duration::hours(2 * VELOCITY_WINDOW_HOURS)
}

pub fn window_counts(timestamps: &[DateTime<Utc>], now: DateTime<Utc>) -> WindowCounts {
    let day_ago = now - Duration::hours(VELOCITY_WINDOW_HOURS);
    let two_days_ago = lookback_start(now);

    timestamps.iter().fold(WindowCounts::default(), |mut acc, ts| {
        if *ts > day_ago && *ts <= now {
            acc.current += 1;
        } else if *ts > two_days_ago && *ts <= day_ago {
            acc.previous += 1;
        }
        acc
    })
}

/// `current / previous`, with a fixed boost when there is no baseline.
pub fn velocity(current: u32, previous: u32) -> f64 {
    if previous > 0 {
        f64::from(current) / f64::from(previous)
    } else if current > 0 {
        COLD_START_VELOCITY
    } else {
        0.0
    }
}

/// Rank courses by velocity into a fresh snapshot.
///
/// Courses without a signup in the current window are dropped.  Ties are
/// broken by current signups, then by course id, so the ranking is stable.
pub fn build_snapshot(
    samples: Vec<(CourseInfo, WindowCounts)>,
    now: DateTime<Utc>,
) -> Vec<TrendingEntry> {
    let mut scored: Vec<_> = samples
        .into_iter()
        .filter(|(_, counts)| counts.current > 0)
        .map(|(course, counts)| (course, counts, counts.velocity()))
        .collect();

    scored.sort_by(|(a_course, a_counts, a_vel), (b_course, b_counts, b_vel)| {
        b_vel
            .partial_cmp(a_vel)
            .unwrap_or(Ordering::Equal)
            .then_with(|| b_counts.current.cmp(&a_counts.current))
            .then_with(|| a_course.id.cmp(&b_course.id))
    });

    scored
        .into_iter()
        .enumerate()
        .map(|(idx, (course, counts, velocity))| TrendingEntry {
            item_id: course.id,
            velocity,
            signups_24h: counts.current,
            signups_previous_24h: counts.previous,
            rank: idx as u32 + 1,
            category: course.category,
            calculated_at: now,
        })
        .collect()
}
