//! Participant × week attendance matrix for display.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::model::{ABSENT_MARK, PRESENT_MARK, Participant, WeekNumber, WeeklySubmissions};
use crate::normalize::normalize_identity;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Status {
    Present,
    Absent,
}

impl Status {
    pub fn mark(&self) -> &'static str {
        match self {
            Self::Present => PRESENT_MARK,
            Self::Absent => ABSENT_MARK,
        }
    }
}

/// One participant's row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParticipantAttendance {
    pub nickname: String,
    pub weeks: BTreeMap<WeekNumber, Status>,
}

impl ParticipantAttendance {
    pub fn attended(&self) -> usize {
        self.weeks.values().filter(|s| **s == Status::Present).count()
    }

    /// Share of reported weeks attended, 0.0 when there are none.
    pub fn rate(&self) -> f64 {
        if self.weeks.is_empty() {
            return 0.0;
        }
        self.attended() as f64 / self.weeks.len() as f64
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AttendanceReport {
    pub weeks: Vec<WeekNumber>,
    pub rows: Vec<ParticipantAttendance>,
}

impl AttendanceReport {
    /// Status of every roster participant for every week that has submissions.
    pub fn build(submissions: &WeeklySubmissions, roster: &[Participant]) -> Self {
        Self::over_weeks(submissions, roster, submissions.weeks())
    }

    /// Same as [`build`](Self::build) over a fixed set of weeks, such as a
    /// whole challenge period. Weeks without submissions count as absent.
    pub fn over_weeks(
        submissions: &WeeklySubmissions,
        roster: &[Participant],
        weeks: impl IntoIterator<Item = WeekNumber>,
    ) -> Self {
        let weeks: Vec<WeekNumber> = weeks.into_iter().collect::<BTreeSet<_>>().into_iter().collect();
        let rows = roster
            .iter()
            .map(|p| {
                let nickname = normalize_identity(&p.nickname);
                let statuses = weeks
                    .iter()
                    .map(|&week| {
                        let status = if submissions.contains(week, &nickname) {
                            Status::Present
                        } else {
                            Status::Absent
                        };
                        (week, status)
                    })
                    .collect();
                ParticipantAttendance {
                    nickname,
                    weeks: statuses,
                }
            })
            .collect();
        Self { weeks, rows }
    }

    pub fn row(&self, nickname: &str) -> Option<&ParticipantAttendance> {
        self.rows.iter().find(|r| r.nickname == nickname)
    }
}
