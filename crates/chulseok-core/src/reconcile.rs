//! Turning submissions into positive-only cell writes.

use std::collections::HashSet;
use std::fmt;

use tracing::{info, warn};

use crate::locate::{SheetSnapshot, participant_row, week_column};
use crate::model::{CellUpdate, Participant, WeekNumber, WeeklySubmissions};
use crate::normalize::normalize_identity;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnresolvedReason {
    MissingWeekColumn,
    MissingParticipantRow,
}

/// A submission that could not be placed on the sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciliationWarning {
    pub week: WeekNumber,
    pub identity: String,
    /// Whether the identity is a roster nickname.
    pub known: bool,
    pub reason: UnresolvedReason,
}

impl fmt::Display for ReconciliationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let who = if self.known { "participant" } else { "unknown author" };
        match self.reason {
            UnresolvedReason::MissingWeekColumn => write!(
                f,
                "{who} {:?}: no column for week {}",
                self.identity, self.week
            ),
            UnresolvedReason::MissingParticipantRow => write!(
                f,
                "{who} {:?}: no row for week {}",
                self.identity, self.week
            ),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    pub updates: Vec<CellUpdate>,
    pub warnings: Vec<ReconciliationWarning>,
}

/// Map every submitted (week, identity) pair to a cell write.
///
/// Pairs that cannot be located are reported as warnings and skipped. Cells
/// of weeks or participants absent from `submissions` are never touched, and
/// the only value ever emitted is the present mark.
pub fn reconcile(
    submissions: &WeeklySubmissions,
    roster: &[Participant],
    sheet: &SheetSnapshot,
) -> Reconciliation {
    let known: HashSet<String> = roster
        .iter()
        .map(|p| normalize_identity(&p.nickname))
        .filter(|n| !n.is_empty())
        .collect();

    let mut out = Reconciliation::default();
    for (week, identity) in submissions.pairs() {
        let column = week_column(week, sheet);
        let row = participant_row(identity, sheet);
        match (row, column) {
            (Some(row), Some(col)) => out.updates.push(CellUpdate::present(sheet.address(row, col))),
            (_, None) => out.warnings.push(unresolved(
                week,
                identity,
                &known,
                UnresolvedReason::MissingWeekColumn,
            )),
            (None, Some(_)) => out.warnings.push(unresolved(
                week,
                identity,
                &known,
                UnresolvedReason::MissingParticipantRow,
            )),
        }
    }

    for warning in &out.warnings {
        warn!(%warning, "unresolved attendance update");
    }
    info!(
        updates = out.updates.len(),
        unresolved = out.warnings.len(),
        "reconciled submissions against sheet"
    );
    out
}

fn unresolved(
    week: WeekNumber,
    identity: &str,
    known: &HashSet<String>,
    reason: UnresolvedReason,
) -> ReconciliationWarning {
    ReconciliationWarning {
        week,
        identity: identity.to_string(),
        known: known.contains(identity),
        reason,
    }
}
