use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Maturity tier an agent has earned through audited performance history.
///
/// Levels are strictly ordered and promotion moves one step at a time:
/// `Student -> Intern -> Supervised -> Autonomous`. Skipping or reversing
/// is rejected by the graduation engine, never silently clamped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaturityLevel {
    Student,
    Intern,
    Supervised,
    Autonomous,
}

impl MaturityLevel {
    /// Ordinal used when comparing against an action's required tier.
    pub fn ordinal(self) -> u8 {
        match self {
            Self::Student => 0,
            Self::Intern => 1,
            Self::Supervised => 2,
            Self::Autonomous => 3,
        }
    }

    /// The only legal promotion target from this level, if any.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Student => Some(Self::Intern),
            Self::Intern => Some(Self::Supervised),
            Self::Supervised => Some(Self::Autonomous),
            Self::Autonomous => None,
        }
    }

    /// All levels in ascending order.
    pub fn all() -> [Self; 4] {
        [
            Self::Student,
            Self::Intern,
            Self::Supervised,
            Self::Autonomous,
        ]
    }
}

impl fmt::Display for MaturityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Student => write!(f, "STUDENT"),
            Self::Intern => write!(f, "INTERN"),
            Self::Supervised => write!(f, "SUPERVISED"),
            Self::Autonomous => write!(f, "AUTONOMOUS"),
        }
    }
}

impl FromStr for MaturityLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "student" => Ok(Self::Student),
            "intern" => Ok(Self::Intern),
            "supervised" => Ok(Self::Supervised),
            "autonomous" => Ok(Self::Autonomous),
            _ => Err(anyhow::anyhow!("Invalid maturity level: {s}")),
        }
    }
}

/// Agent identity with its current trust tier.
///
/// Maturity is mutated only by the graduation engine's promotion step;
/// the permission gate reads it when computing fresh verdicts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    /// Platform-assigned identifier (e.g. "intern-agent", "billing-bot-2").
    pub id: String,

    /// Human-readable name for operator tooling.
    pub display_name: String,

    /// Current trust tier.
    pub maturity: MaturityLevel,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Agent {
    /// Create a new agent at the lowest trust tier.
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            display_name: display_name.into(),
            maturity: MaturityLevel::Student,
            created_at: now,
            updated_at: now,
        }
    }

    /// Create an agent at a specific level (seeding, tests).
    pub fn with_maturity(mut self, maturity: MaturityLevel) -> Self {
        self.maturity = maturity;
        self
    }

    /// Whether this agent's tier satisfies the given required tier.
    pub fn satisfies(&self, required: MaturityLevel) -> bool {
        self.maturity.ordinal() >= required.ordinal()
    }
}
