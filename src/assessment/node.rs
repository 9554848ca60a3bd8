use serde::{Deserialize, Serialize};

/// A single node in the assessment's decision graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// Unique identifier for this node (e.g. "start", "geographicScope", "notMajor").
    pub id: String,
    /// Prose shown when the assessment reaches this node. May contain a simple
    /// inline link, which only the terminal renderer interprets.
    pub text: String,
    // Question, scored question, evaluation point or outcome
    #[serde(flatten)]
    pub kind: NodeKind,
    /// Choices in presentation order.
    pub options: Vec<Choice>,
}

impl Node {
    pub fn is_outcome(&self) -> bool {
        matches!(self.kind, NodeKind::Outcome { .. })
    }

    pub fn classification(&self) -> Option<Classification> {
        match self.kind {
            NodeKind::Outcome { classification } => Some(classification),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeKind {
    // Plain routing question, its answers do not count
    Question,
    // One of the threshold questions, both answers carry `counts_as_yes`
    ScoredQuestion,
    /// Control point. Its single option's `next` is ignored: the accumulated
    /// score picks `met` (score >= threshold) or `not_met`.
    Evaluate { met: String, not_met: String },
    // Terminal classification, offers only a restart
    Outcome { classification: Classification },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    MajorSecurityIncident,
    MajorOperationalIncident,
    NotMajor,
}

impl Classification {
    /// One-line verdict used for announcements and the exported log.
    pub fn summary(&self) -> &'static str {
        match self {
            Classification::MajorSecurityIncident => {
                "This is a MAJOR SECURITY INCIDENT under DORA"
            }
            Classification::MajorOperationalIncident => {
                "This is a MAJOR OPERATIONAL INCIDENT under DORA"
            }
            Classification::NotMajor => "This is NOT a major incident under DORA",
        }
    }
}

/// A choice offered by a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    /// Button text, e.g. "Yes", "Continue", "Start New Assessment".
    pub label: String,
    // ID of an existing node
    pub next: String,
    /// Present only on the answers of scored questions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub counts_as_yes: Option<bool>,
    #[serde(default)]
    pub action: ChoiceAction,
}

impl Choice {
    pub fn advance(label: impl Into<String>, next: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            next: next.into(),
            counts_as_yes: None,
            action: ChoiceAction::Advance,
        }
    }

    pub fn scored(label: impl Into<String>, next: impl Into<String>, counts_as_yes: bool) -> Self {
        Self {
            counts_as_yes: Some(counts_as_yes),
            ..Self::advance(label, next)
        }
    }

    pub fn restart(next: impl Into<String>) -> Self {
        Self {
            action: ChoiceAction::Restart,
            ..Self::advance(RESTART_LABEL, next)
        }
    }

    pub fn is_restart(&self) -> bool {
        self.action == ChoiceAction::Restart
    }
}

pub const RESTART_LABEL: &str = "Start New Assessment";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChoiceAction {
    #[default]
    Advance,
    /// Wipes the session and returns to the start node.
    Restart,
}
