use chrono::Local;
use log::{debug, info};

use crate::assessment::node::{Choice, Node, NodeKind};
use crate::assessment::tree::DecisionGraph;
use crate::error::ConfigurationError;
use crate::history::{History, Record};
use crate::markup::plain_text;

/// Yes answers among the scored questions needed for a major operational incident.
pub const MAJOR_THRESHOLD: u32 = 2;

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

/// Receives the engine's notifications. The engine does not care how they
/// are delivered.
pub trait Announcer {
    /// A message for assistive technology.
    fn announce(&mut self, message: &str);

    /// Called once per choice, after the session has been updated.
    fn display_changed(&mut self) {}
}

// ---------------------------------------------------------------------------
// Session state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Session {
    pub current_node_id: String,
    /// Scored questions answered "yes" since the last evaluation or restart.
    pub score: u32,
    pub history: History,
}

impl Session {
    fn new(start: &str) -> Self {
        Self {
            current_node_id: start.to_string(),
            score: 0,
            history: History::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Walks one session through a decision graph.
pub struct Engine<A> {
    graph: DecisionGraph,
    session: Session,
    announcer: A,
}

impl<A: Announcer> Engine<A> {
    pub fn new(graph: DecisionGraph, announcer: A) -> Self {
        let session = Session::new(graph.start_id());
        Self {
            graph,
            session,
            announcer,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn announcer_mut(&mut self) -> &mut A {
        &mut self.announcer
    }

    pub fn current_node(&self) -> &Node {
        // Session only ever moves to ids checked against the graph
        self.graph
            .get(&self.session.current_node_id)
            .unwrap_or_else(|| {
                unreachable!("current node '{}' left the graph", self.session.current_node_id)
            })
    }

    pub fn history(&self) -> &[Record] {
        self.session.history.records()
    }

    pub fn render_entries(&self) -> impl Iterator<Item = String> + '_ {
        self.session.history.render_entries(&self.graph)
    }

    pub fn export_log(&self) -> String {
        self.session
            .history
            .serialize_log(&self.graph, &self.session.current_node_id)
    }

    /// Screen-reader label for the node on display.
    pub fn current_label(&self) -> String {
        format!("Current Question: {}", plain_text(&self.current_node().text))
    }

    /// Apply a choice offered by the current node and move to the next node.
    ///
    /// Restart is accepted from any node and wipes the session without
    /// recording itself. Any other choice must be offered by the current
    /// node. Leaving an evaluation node ignores the choice's `next` and
    /// routes on the score. The destination is resolved before anything
    /// changes, so an error leaves the session as it was.
    pub fn choose_option(&mut self, choice: &Choice) -> Result<(), ConfigurationError> {
        let leaving = self.current_node().clone();

        if choice.is_restart() {
            let start = self.graph.start_id().to_string();
            self.session.history.clear();
            self.session.score = 0;
            self.announcer.announce("Starting a new assessment");
            self.advance(&leaving.id, start, &choice.label);
            return Ok(());
        }

        if !leaving.options.contains(choice) {
            return Err(ConfigurationError::ForeignChoice {
                node: leaving.id,
                label: choice.label.clone(),
            });
        }

        let score = self.session.score + u32::from(choice.counts_as_yes == Some(true));
        let (next, verdict) = match &leaving.kind {
            NodeKind::Evaluate { met, not_met } => {
                let target = if score >= MAJOR_THRESHOLD { met } else { not_met };
                let classification = self
                    .graph
                    .get(target)
                    .and_then(Node::classification)
                    .ok_or_else(|| ConfigurationError::MalformedEvaluation {
                        node: leaving.id.clone(),
                        reason: format!("'{target}' is not an outcome node"),
                    })?;
                (target.clone(), Some(classification))
            }
            _ => (choice.next.clone(), None),
        };
        if !self.graph.contains(&next) {
            return Err(ConfigurationError::UnknownNode {
                from: leaving.id,
                next,
            });
        }

        self.session.history.push(Record {
            node_id: leaving.id.clone(),
            label: choice.label.clone(),
            timestamp: Local::now(),
        });
        self.announcer.announce(&format!(
            "Selected {} for: {}",
            choice.label,
            plain_text(&leaving.text)
        ));

        if score != self.session.score {
            debug!("Score for {}: {}", leaving.id, score);
        }
        self.session.score = score;

        if let Some(classification) = verdict {
            info!("Evaluated {score} yes answer(s) against threshold {MAJOR_THRESHOLD}: {next}");
            self.session.score = 0;
            self.announcer.announce(classification.summary());
        }

        self.advance(&leaving.id, next, &choice.label);
        Ok(())
    }

    /// Start a new assessment from wherever the session is.
    pub fn restart(&mut self) -> Result<(), ConfigurationError> {
        let restart = Choice::restart(self.graph.start_id());
        self.choose_option(&restart)
    }

    fn advance(&mut self, from: &str, next: String, label: &str) {
        info!("Transition: {from} -> {next} (choice: {label})");
        self.session.current_node_id = next;
        self.announcer.display_changed();
    }

    /// Choose by label, as typed or clicked.
    pub fn choose_label(&mut self, label: &str) -> Result<(), ConfigurationError> {
        let choice = self
            .current_node()
            .options
            .iter()
            .find(|c| c.label.eq_ignore_ascii_case(label))
            .cloned()
            .ok_or_else(|| ConfigurationError::ForeignChoice {
                node: self.session.current_node_id.clone(),
                label: label.to_string(),
            })?;
        self.choose_option(&choice)
    }
}
