//! Episode entities: the evidentiary basis for promotion.
//!
//! Episodes are produced by the execution runtime and are read-only here.
//! Segment payloads are a closed set of tagged variants validated at the
//! ingestion boundary rather than free-form JSON.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Terminal status of a completed unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EpisodeStatus {
    Completed,
    Failed,
    Aborted,
}

impl fmt::Display for EpisodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
            Self::Aborted => write!(f, "aborted"),
        }
    }
}

impl FromStr for EpisodeStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "aborted" => Ok(Self::Aborted),
            _ => Err(anyhow::anyhow!("Invalid episode status: {s}")),
        }
    }
}

/// One recorded step within an episode. Closed set; unknown payload shapes
/// are rejected at ingestion instead of being carried as raw maps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EpisodeSegment {
    /// Something the agent observed in its environment.
    Observation { content: String },
    /// A tool invocation and its one-line result summary.
    ToolCall { tool: String, summary: String },
    /// A conversational turn with a human or another agent.
    Dialogue { role: String, content: String },
    /// A human correction or block applied mid-episode.
    Correction { reason: String },
}

impl EpisodeSegment {
    /// Text used by the retrieval engine's scorers.
    pub fn text(&self) -> String {
        match self {
            Self::Observation { content } => content.clone(),
            Self::ToolCall { tool, summary } => format!("{tool} {summary}"),
            Self::Dialogue { role, content } => format!("{role}: {content}"),
            Self::Correction { reason } => reason.clone(),
        }
    }

    /// Whether this segment carries interaction context richer than a bare
    /// observation. Rich segments feed the graduation context bonus.
    pub fn is_rich_context(&self) -> bool {
        matches!(self, Self::ToolCall { .. } | Self::Dialogue { .. })
    }
}

/// One completed unit of agent work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Episode {
    pub id: Uuid,
    pub agent_id: String,
    pub title: String,
    pub summary: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub status: EpisodeStatus,
    /// Compliance value for this episode, in [0.0, 1.0].
    pub constitutional_score: f64,
    /// Logged constitutional violations. Any non-zero count hard-gates
    /// promotion regardless of the aggregate score.
    pub violation_count: u32,
    pub segments: Vec<EpisodeSegment>,
}

impl Episode {
    pub fn new(agent_id: impl Into<String>, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            agent_id: agent_id.into(),
            title: title.into(),
            summary: String::new(),
            started_at: now,
            ended_at: now,
            status: EpisodeStatus::Completed,
            constitutional_score: 1.0,
            violation_count: 0,
            segments: Vec::new(),
        }
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = summary.into();
        self
    }

    pub fn with_status(mut self, status: EpisodeStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_constitutional_score(mut self, score: f64) -> Self {
        self.constitutional_score = score;
        self
    }

    pub fn with_violations(mut self, count: u32) -> Self {
        self.violation_count = count;
        self
    }

    pub fn with_segment(mut self, segment: EpisodeSegment) -> Self {
        self.segments.push(segment);
        self
    }

    pub fn with_ended_at(mut self, ended_at: DateTime<Utc>) -> Self {
        self.ended_at = ended_at;
        self
    }

    /// Full text for the reranking scorer: title, summary, and segments.
    pub fn full_text(&self) -> String {
        let mut text = format!("{} {}", self.title, self.summary);
        for segment in &self.segments {
            text.push(' ');
            text.push_str(&segment.text());
        }
        text
    }

    /// Coarse text for the first-pass scorer: title and summary only.
    pub fn coarse_text(&self) -> String {
        format!("{} {}", self.title, self.summary)
    }

    /// Whether any segment carries rich interaction context.
    pub fn has_rich_context(&self) -> bool {
        self.segments.iter().any(EpisodeSegment::is_rich_context)
    }

    /// Ingestion-boundary validation.
    pub fn validate(&self) -> Result<(), String> {
        if self.agent_id.is_empty() {
            return Err("episode agent_id cannot be empty".to_string());
        }
        if self.title.is_empty() {
            return Err("episode title cannot be empty".to_string());
        }
        if !(0.0..=1.0).contains(&self.constitutional_score) {
            return Err(format!(
                "constitutional_score {} outside [0.0, 1.0]",
                self.constitutional_score
            ));
        }
        if self.ended_at < self.started_at {
            return Err("episode ended before it started".to_string());
        }
        Ok(())
    }
}

/// A recorded correction or block during an episode. Only the aggregate
/// count per window feeds graduation; the struct exists for ingestion and
/// audit tooling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Intervention {
    pub id: Uuid,
    pub agent_id: String,
    pub episode_id: Option<Uuid>,
    pub reason: String,
    pub occurred_at: DateTime<Utc>,
}

impl Intervention {
    pub fn new(agent_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            agent_id: agent_id.into(),
            episode_id: None,
            reason: reason.into(),
            occurred_at: Utc::now(),
        }
    }

    pub fn for_episode(mut self, episode_id: Uuid) -> Self {
        self.episode_id = Some(episode_id);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_tagged_serialization() {
        let segment = EpisodeSegment::ToolCall {
            tool: "shell".to_string(),
            summary: "ls ok".to_string(),
        };
        let json = serde_json::to_value(&segment).unwrap();
        assert_eq!(json["kind"], "tool_call");

        let back: EpisodeSegment = serde_json::from_value(json).unwrap();
        assert_eq!(back, segment);
    }

    #[test]
    fn test_unknown_segment_kind_rejected() {
        let raw = serde_json::json!({"kind": "mystery", "content": "x"});
        assert!(serde_json::from_value::<EpisodeSegment>(raw).is_err());
    }

    #[test]
    fn test_rich_context_detection() {
        let plain = Episode::new("a", "t").with_segment(EpisodeSegment::Observation {
            content: "saw a thing".to_string(),
        });
        assert!(!plain.has_rich_context());

        let rich = Episode::new("a", "t").with_segment(EpisodeSegment::Dialogue {
            role: "user".to_string(),
            content: "please stop".to_string(),
        });
        assert!(rich.has_rich_context());
    }

    #[test]
    fn test_validate_bounds() {
        let episode = Episode::new("agent-1", "deploy").with_constitutional_score(1.5);
        assert!(episode.validate().is_err());

        let episode = Episode::new("agent-1", "deploy").with_constitutional_score(0.9);
        assert!(episode.validate().is_ok());

        let episode = Episode::new("", "deploy");
        assert!(episode.validate().is_err());
    }

    #[test]
    fn test_full_text_includes_segments() {
        let episode = Episode::new("a", "refund")
            .with_summary("processed refund")
            .with_segment(EpisodeSegment::ToolCall {
                tool: "payments".to_string(),
                summary: "refund issued".to_string(),
            });
        let text = episode.full_text();
        assert!(text.contains("refund issued"));
        assert!(text.contains("processed refund"));
    }
}
