//! Decision history for one assessment and the plain-text log built from it.

use chrono::{DateTime, Local};

use crate::assessment::tree::DecisionGraph;
use crate::markup::plain_text;

const LOG_HEADER: &str = "DORA Major Incident Assessment Log";

/// One answered node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub node_id: String,
    pub label: String,
    pub timestamp: DateTime<Local>,
}

impl Record {
    /// Date, time and UTC offset, e.g. `2024-05-01 14:03:22 (+02:00)`.
    pub fn formatted_timestamp(&self) -> String {
        self.timestamp.format("%Y-%m-%d %H:%M:%S (%:z)").to_string()
    }
}

/// Append-only log of the current assessment. Only a restart clears it.
#[derive(Debug, Clone, Default)]
pub struct History {
    records: Vec<Record>,
}

impl History {
    pub fn push(&mut self, record: Record) {
        self.records.push(record);
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Screen-reader label for the history panel.
    pub fn label(&self) -> String {
        if self.is_empty() {
            "No decisions made yet".to_string()
        } else {
            format!("Decision history with {} entries", self.len())
        }
    }

    /// One line per record: `n. [timestamp] question → answer`.
    ///
    /// Lines are built lazily on every call, so the iterator always reflects
    /// the records as they are now.
    pub fn render_entries<'a>(
        &'a self,
        graph: &'a DecisionGraph,
    ) -> impl Iterator<Item = String> + 'a {
        self.records.iter().enumerate().map(move |(i, record)| {
            // Records only ever name nodes of the graph they were taken from
            let text = graph
                .get(&record.node_id)
                .map_or_else(|| record.node_id.clone(), |node| plain_text(&node.text));
            format!(
                "{}. [{}] {} → {}",
                i + 1,
                record.formatted_timestamp(),
                text,
                record.label
            )
        })
    }

    /// The exportable log. Ends with an `OUTCOME:` line when `current_node_id`
    /// is an outcome node.
    pub fn serialize_log(&self, graph: &DecisionGraph, current_node_id: &str) -> String {
        let mut log = format!("{LOG_HEADER}\n\n");
        for line in self.render_entries(graph) {
            log.push_str(&line);
            log.push_str("\n\n");
        }

        if let Some(classification) = graph.get(current_node_id).and_then(|n| n.classification()) {
            log.push_str(&format!("\nOUTCOME: {}.", classification.summary()));
        }
        log
    }
}
