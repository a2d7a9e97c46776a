//! Participant roster file, as JSON or CSV.
//!
//! ```json
//! {
//!   "challenge_info": { "name": "봄 챌린지", "start_week": 1, "end_week": 12 },
//!   "participants": [
//!     { "name": "김상현", "nickname": "김상현", "active": true }
//!   ]
//! }
//! ```
//!
//! A `.csv` roster has a header row with `name`, `nickname`, `email` and
//! `active` columns (or 이름, 닉네임, 이메일, 활성) and no challenge info.

use std::path::Path;

use chulseok_core::{Participant, WeekNumber, normalize_identity};
use csv::{ReaderBuilder, Trim};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::LocalStoreError;

/// Challenge period covered by the roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeInfo {
    pub name: String,
    pub start_week: WeekNumber,
    pub end_week: WeekNumber,
    #[serde(default)]
    pub current_week: Option<WeekNumber>,
}

impl ChallengeInfo {
    fn check(&self) -> Result<(), LocalStoreError> {
        if self.start_week < 1 {
            return Err(LocalStoreError::InvalidRoster(
                "start_week must be at least 1".into(),
            ));
        }
        if self.end_week < self.start_week {
            return Err(LocalStoreError::InvalidRoster(format!(
                "end_week {} precedes start_week {}",
                self.end_week, self.start_week
            )));
        }
        if let Some(current) = self.current_week
            && !(self.start_week..=self.end_week).contains(&current)
        {
            return Err(LocalStoreError::InvalidRoster(format!(
                "current_week {current} is outside {}..={}",
                self.start_week, self.end_week
            )));
        }
        Ok(())
    }

    pub fn total_weeks(&self) -> u32 {
        self.end_week - self.start_week + 1
    }

    pub fn weeks(&self) -> impl Iterator<Item = WeekNumber> {
        self.start_week..=self.end_week
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roster {
    #[serde(default)]
    pub challenge_info: Option<ChallengeInfo>,
    #[serde(default)]
    pub participants: Vec<Participant>,
}

impl Roster {
    /// Load and check a roster file. `.csv` files are read as CSV,
    /// everything else as JSON.
    pub fn load(path: &Path) -> Result<Self, LocalStoreError> {
        if !path.exists() {
            return Err(LocalStoreError::NotFound(path.to_path_buf()));
        }
        let text = std::fs::read_to_string(path)?;
        let is_csv = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
        let roster = if is_csv {
            Self::from_csv(&text)?
        } else {
            Self::from_json(&text)?
        };
        info!(
            path = %path.display(),
            participants = roster.participants.len(),
            "loaded roster"
        );
        Ok(roster)
    }

    pub fn from_json(text: &str) -> Result<Self, LocalStoreError> {
        let roster: Self = serde_json::from_str(text)?;
        roster.check()?;
        Ok(roster)
    }

    /// Parse a CSV roster. A leading byte-order mark is ignored, and a blank
    /// `active` cell counts as active.
    pub fn from_csv(text: &str) -> Result<Self, LocalStoreError> {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        let mut reader = ReaderBuilder::new()
            .trim(Trim::All)
            .from_reader(text.as_bytes());
        let participants = reader
            .deserialize::<CsvParticipant>()
            .map(|row| row.map(Participant::from))
            .collect::<Result<Vec<_>, _>>()?;
        let roster = Self {
            challenge_info: None,
            participants,
        };
        roster.check()?;
        Ok(roster)
    }

    fn check(&self) -> Result<(), LocalStoreError> {
        for (idx, p) in self.participants.iter().enumerate() {
            if p.name.trim().is_empty() {
                return Err(LocalStoreError::InvalidRoster(format!(
                    "participant #{} has an empty name",
                    idx + 1
                )));
            }
            if p.nickname.trim().is_empty() {
                return Err(LocalStoreError::InvalidRoster(format!(
                    "participant {:?} has an empty nickname",
                    p.name
                )));
            }
        }
        if let Some(info) = &self.challenge_info {
            info.check()?;
        }
        Ok(())
    }

    pub fn active(&self) -> Vec<Participant> {
        self.participants.iter().filter(|p| p.active).cloned().collect()
    }

    /// Participant whose normalized nickname equals the normalized input.
    pub fn by_nickname(&self, nickname: &str) -> Option<&Participant> {
        let wanted = normalize_identity(nickname);
        self.participants
            .iter()
            .find(|p| normalize_identity(&p.nickname) == wanted)
    }
}

/// One CSV row; headers may be English or Korean.
#[derive(Deserialize)]
struct CsvParticipant {
    #[serde(default, alias = "이름")]
    name: String,
    #[serde(default, alias = "닉네임")]
    nickname: String,
    #[serde(default, alias = "이메일")]
    email: Option<String>,
    #[serde(default, alias = "활성")]
    active: Option<String>,
}

impl From<CsvParticipant> for Participant {
    fn from(row: CsvParticipant) -> Self {
        Self {
            name: row.name,
            nickname: row.nickname,
            email: row.email.filter(|e| !e.is_empty()),
            active: row
                .active
                .is_none_or(|v| v.is_empty() || v.eq_ignore_ascii_case("true")),
        }
    }
}
