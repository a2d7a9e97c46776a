//! Domain checks on aggregated submissions before anything is written.

use std::fmt;

use tracing::{info, warn};

use crate::model::{MAX_WEEK, MIN_WEEK, WeekNumber, WeeklySubmissions};

/// Shortest identity accepted, counted in characters.
pub const MIN_IDENTITY_CHARS: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    Empty,
    WeekOutOfRange { week: WeekNumber },
    IdentityTooShort { week: WeekNumber, identity: String },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "no submissions were extracted"),
            Self::WeekOutOfRange { week } => {
                write!(f, "week {week} is outside {MIN_WEEK}..={MAX_WEEK}")
            }
            Self::IdentityTooShort { week, identity } => {
                write!(f, "week {week} has too short an identity {identity:?}")
            }
        }
    }
}

/// Every issue found in one pass; empty means the submissions may proceed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn passed(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Run all checks without stopping at the first failure.
pub fn inspect(submissions: &WeeklySubmissions) -> ValidationReport {
    let mut issues = Vec::new();

    if submissions.is_empty() {
        issues.push(ValidationIssue::Empty);
    }

    for week in submissions.weeks() {
        if !(MIN_WEEK..=MAX_WEEK).contains(&week) {
            issues.push(ValidationIssue::WeekOutOfRange { week });
        }
    }

    for (week, identities) in submissions.iter() {
        for identity in identities {
            if identity.trim().chars().count() < MIN_IDENTITY_CHARS {
                issues.push(ValidationIssue::IdentityTooShort {
                    week,
                    identity: identity.clone(),
                });
            }
        }
    }

    for issue in &issues {
        warn!(%issue, "submission validation issue");
    }
    if issues.is_empty() {
        info!("submission validation passed");
    }
    ValidationReport { issues }
}

/// Pass/fail gate in front of reconciliation.
pub fn validate(submissions: &WeeklySubmissions) -> bool {
    inspect(submissions).passed()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subs(entries: &[(WeekNumber, &str)]) -> WeeklySubmissions {
        entries.iter().map(|(w, id)| (*w, *id)).collect()
    }

    #[test]
    fn empty_fails() {
        let report = inspect(&WeeklySubmissions::new());
        assert_eq!(report.issues, vec![ValidationIssue::Empty]);
        assert!(!validate(&WeeklySubmissions::new()));
    }

    #[test]
    fn week_zero_fails() {
        assert!(!validate(&subs(&[(0, "ab")])));
    }

    #[test]
    fn week_above_range_fails() {
        assert!(!validate(&subs(&[(53, "ab")])));
        assert!(validate(&subs(&[(52, "ab")])));
    }

    #[test]
    fn short_identity_fails() {
        assert!(!validate(&subs(&[(1, "a")])));
    }

    #[test]
    fn two_korean_characters_pass() {
        assert!(validate(&subs(&[(1, "상현")])));
    }

    #[test]
    fn valid_submissions_pass() {
        assert!(validate(&subs(&[(1, "ab"), (1, "cd")])));
    }

    #[test]
    fn reports_every_failing_check() {
        let report = inspect(&subs(&[(0, "a"), (60, "ok"), (3, "b")]));
        assert!(!report.passed());
        assert!(report.issues.contains(&ValidationIssue::WeekOutOfRange { week: 0 }));
        assert!(report.issues.contains(&ValidationIssue::WeekOutOfRange { week: 60 }));
        assert!(report.issues.contains(&ValidationIssue::IdentityTooShort {
            week: 0,
            identity: "a".into()
        }));
        assert!(report.issues.contains(&ValidationIssue::IdentityTooShort {
            week: 3,
            identity: "b".into()
        }));
        assert_eq!(report.issues.len(), 4);
    }
}
