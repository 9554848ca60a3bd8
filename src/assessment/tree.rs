use std::collections::{HashMap, HashSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::assessment::node::{Choice, Classification, Node, NodeKind};
use crate::error::ConfigurationError;

/// Node ids of the built-in DORA graph.
pub mod ids {
    pub const START: &str = "start";
    pub const DATA_IMPACT: &str = "dataImpact";
    pub const MALICIOUS_INTRUSION: &str = "maliciousIntrusion";
    pub const CLIENTS: &str = "clientsFinancialCounterpartsTransactions";
    pub const REPUTATIONAL_IMPACT: &str = "reputationalImpact";
    pub const DURATION: &str = "durationServiceDowntime";
    pub const GEOGRAPHIC_SCOPE: &str = "geographicScope";
    pub const ECONOMIC_IMPACT: &str = "economicImpact";
    pub const EVALUATE: &str = "evaluateOutcome";
    pub const MAJOR_SECURITY: &str = "majorSecurityIncident";
    pub const MAJOR_OPERATIONAL: &str = "majorOperationalIncident";
    pub const NOT_MAJOR: &str = "notMajor";

    /// The five threshold questions, in asking order.
    #[cfg(test)]
    pub const SCORED: [&str; 5] = [
        CLIENTS,
        REPUTATIONAL_IMPACT,
        DURATION,
        GEOGRAPHIC_SCOPE,
        ECONOMIC_IMPACT,
    ];
}

/// On-disk shape of a graph: the start id plus nodes in authoring order.
#[derive(Debug, Serialize, Deserialize)]
struct GraphFile {
    start: String,
    nodes: Vec<Node>,
}

/// The full decision graph: a validated, immutable map of node-id -> Node.
#[derive(Debug, Clone)]
pub struct DecisionGraph {
    nodes: Vec<Node>,
    index: HashMap<String, usize>,
    start: String,
}

impl DecisionGraph {
    /// Build a graph from a start id and its nodes, rejecting any table that
    /// breaks the routing rules.
    pub fn new(start: impl Into<String>, nodes: Vec<Node>) -> Result<Self, ConfigurationError> {
        let start = start.into();
        let mut index = HashMap::with_capacity(nodes.len());
        for (i, node) in nodes.iter().enumerate() {
            if index.insert(node.id.clone(), i).is_some() {
                return Err(ConfigurationError::DuplicateNode(node.id.clone()));
            }
        }

        let graph = Self {
            nodes,
            index,
            start,
        };
        graph.validate()?;
        Ok(graph)
    }

    /// Build a graph without validation, for exercising the engine's own
    /// configuration checks.
    #[cfg(test)]
    pub(crate) fn unchecked(start: &str, nodes: Vec<Node>) -> Self {
        let index = nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.id.clone(), i))
            .collect();
        Self {
            nodes,
            index,
            start: start.to_string(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigurationError> {
        let file: GraphFile = serde_json::from_str(json)?;
        Self::new(file.start, file.nodes)
    }

    pub fn to_json(&self) -> Result<String, ConfigurationError> {
        let file = GraphFile {
            start: self.start.clone(),
            nodes: self.nodes().cloned().collect(),
        };
        Ok(serde_json::to_string_pretty(&file)?)
    }

    pub fn get(&self, id: &str) -> Option<&Node> {
        self.index.get(id).map(|&i| &self.nodes[i])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn start_id(&self) -> &str {
        &self.start
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    /// Node ids that no path from the start node ever visits, in authoring order.
    pub fn unreachable_nodes(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([self.start.as_str()]);
        while let Some(id) = queue.pop_front() {
            if !seen.insert(id) {
                continue;
            }
            let Some(node) = self.get(id) else {
                continue;
            };
            if let NodeKind::Evaluate { met, not_met } = &node.kind {
                queue.push_back(met.as_str());
                queue.push_back(not_met.as_str());
            } else {
                queue.extend(node.options.iter().map(|c| c.next.as_str()));
            }
        }

        self.nodes
            .iter()
            .map(|n| n.id.as_str())
            .filter(|id| !seen.contains(id))
            .collect()
    }

    fn validate(&self) -> Result<(), ConfigurationError> {
        if !self.contains(&self.start) {
            return Err(ConfigurationError::MissingStart(self.start.clone()));
        }

        for node in &self.nodes {
            if node.options.is_empty() {
                return Err(ConfigurationError::NoOptions(node.id.clone()));
            }
            for choice in &node.options {
                self.check_target(&node.id, &choice.next)?;
                self.check_scoring(node, choice)?;
                if choice.is_restart() && !node.is_outcome() {
                    return Err(ConfigurationError::MisplacedRestart {
                        node: node.id.clone(),
                    });
                }
            }

            match &node.kind {
                NodeKind::Evaluate { met, not_met } => self.check_evaluation(node, met, not_met)?,
                NodeKind::Outcome { .. } => self.check_outcome(node)?,
                NodeKind::Question | NodeKind::ScoredQuestion => {}
            }
        }
        Ok(())
    }

    fn check_target(&self, from: &str, next: &str) -> Result<(), ConfigurationError> {
        if self.contains(next) {
            Ok(())
        } else {
            Err(ConfigurationError::UnknownNode {
                from: from.to_string(),
                next: next.to_string(),
            })
        }
    }

    fn check_scoring(&self, node: &Node, choice: &Choice) -> Result<(), ConfigurationError> {
        let scored = node.kind == NodeKind::ScoredQuestion;
        let reason = match (scored, choice.counts_as_yes.is_some()) {
            (true, false) => "scored question answers must say whether they count as yes",
            (false, true) => "only scored questions may count towards the threshold",
            _ => return Ok(()),
        };
        Err(ConfigurationError::ScoringAttribute {
            node: node.id.clone(),
            label: choice.label.clone(),
            reason,
        })
    }

    fn check_evaluation(&self, node: &Node, met: &str, not_met: &str) -> Result<(), ConfigurationError> {
        let malformed = |reason: String| ConfigurationError::MalformedEvaluation {
            node: node.id.clone(),
            reason,
        };

        if node.options.len() != 1 {
            return Err(malformed(format!(
                "expected a single continue option, found {}",
                node.options.len()
            )));
        }
        for target in [met, not_met] {
            self.check_target(&node.id, target)?;
            if !self.get(target).is_some_and(Node::is_outcome) {
                return Err(malformed(format!("'{target}' is not an outcome node")));
            }
        }
        Ok(())
    }

    fn check_outcome(&self, node: &Node) -> Result<(), ConfigurationError> {
        match node.options.as_slice() {
            [only] if only.is_restart() && only.next == self.start => Ok(()),
            _ => Err(ConfigurationError::MalformedOutcome {
                node: node.id.clone(),
                reason: "must offer exactly one restart back to the start node".into(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// DORA major incident scenario
// ---------------------------------------------------------------------------

const PLAYBOOK_LINK: &str =
    "For more information, see the <a href='https://www.eba.europa.eu' target='_blank'>Playbook</a>.";

/// The built-in DORA major incident classification graph.
///
/// Thresholds follow Commission Delegated Regulation (EU) 2024/1772.
pub fn dora_assessment() -> Result<DecisionGraph, ConfigurationError> {
    let yes_no = |yes: &str, no: &str| vec![Choice::advance("Yes", yes), Choice::advance("No", no)];
    let scored = |next: &str| vec![Choice::scored("Yes", next, true), Choice::scored("No", next, false)];
    let outcome = |id: &str, classification: Classification, text: String| Node {
        id: id.into(),
        text,
        kind: NodeKind::Outcome { classification },
        options: vec![Choice::restart(ids::START)],
    };

    let nodes = vec![
        Node {
            id: ids::START.into(),
            text: "Does the incident affect critical services supporting critical functions?\n\n\
                   Consult the Software Catalog to identify whether the service is in Tier 1 or Tier 2."
                .into(),
            kind: NodeKind::Question,
            options: yes_no(ids::MALICIOUS_INTRUSION, ids::NOT_MAJOR),
        },
        // Not wired from any other node. Kept as inert data until the regulatory
        // source confirms where it belongs.
        Node {
            id: ids::DATA_IMPACT.into(),
            text: "Has there been, or will there be, an impact on the availability, authenticity, integrity or\n\
                   confidentiality of data which could have an adverse impact on the implementation of our\n\
                   business objectives or our ability to meet regulatory requirements?"
                .into(),
            kind: NodeKind::Question,
            options: yes_no(ids::MAJOR_OPERATIONAL, ids::MALICIOUS_INTRUSION),
        },
        Node {
            id: ids::MALICIOUS_INTRUSION.into(),
            text: "Has there been, or will there be, an impact on the availability, authenticity, integrity or\n\
                   confidentiality of data which could have an adverse impact on the implementation of our\n\
                   business objectives or our ability to meet regulatory requirements?\n\n or \n\n\
                   Has there been a malicious and successful intrusion likely to place data at risk?\n\n\
                   Consider:\n\
                   • Unauthorized access to systems\n\
                   • Data breaches\n\
                   • Ransomware attacks\n\
                   • Other security incidents"
                .into(),
            kind: NodeKind::Question,
            options: yes_no(ids::MAJOR_SECURITY, ids::CLIENTS),
        },
        Node {
            id: ids::CLIENTS.into(),
            text: "Question 1: Clients, Financial Counterparts and Transactions?\n\n\
                   Has the incident affected any of the following:\n\n\
                   a) >10% of all clients using the affected service\n\
                   b) >100 000 clients using the affected service\n\
                   c) >30% of all financial counterparts used by the FE\n\
                   d) >10% of the daily average number of transactions\n\
                   e) >10% of the daily average amount of transactions\n\
                   f) any identified impact on clients or financial counterpart identified by the FE as relevant"
                .into(),
            kind: NodeKind::ScoredQuestion,
            options: scored(ids::REPUTATIONAL_IMPACT),
        },
        Node {
            id: ids::REPUTATIONAL_IMPACT.into(),
            text: "Question 2: Reputational Impact?\n\
                   There has been a reputational impact if one or more of the following criteria are met:\n\n\
                   • The incident has been reflected in the media\n\
                   • We will not be able to, or will be unlikely to be able to, meet regulatory requirements as a result of the incident\n\
                   • The incident has resulted in repetitive complaints from different clients or financial counterparts on client-facing services or critical business relationships\n\
                   • We will, or are likely to, lose clients or financial counterparts with a material impact on our business as a result of the incident"
                .into(),
            kind: NodeKind::ScoredQuestion,
            options: scored(ids::DURATION),
        },
        Node {
            id: ids::DURATION.into(),
            text: "Question 3: Duration and Service Downtime?\n\n\
                   Is the service downtime more than two hours, \n or \n\
                   Is the incident duration longer than 24 hours\n"
                .into(),
            kind: NodeKind::ScoredQuestion,
            options: scored(ids::GEOGRAPHIC_SCOPE),
        },
        Node {
            id: ids::GEOGRAPHIC_SCOPE.into(),
            text: "Question 4: Has the incident affected services in multiple EU member states?\n\n\
                   The United Kingdom should not be considered a member state:\n"
                .into(),
            kind: NodeKind::ScoredQuestion,
            options: scored(ids::ECONOMIC_IMPACT),
        },
        Node {
            id: ids::ECONOMIC_IMPACT.into(),
            text: "Question 5: Has the incident caused significant economic impact or financial losses?\n\n\
                   We will have met this criterion if the incident has EUR 100 000 or more of financial impact across the following categories:\n\
                   a) expropriated funds or financial assets liability, including theft;\n\
                   b) replacement or relocation costs;\n\
                   c) staff costs;\n\
                   d) contract non-compliance fees;\n\
                   e) customer redress and compensation costs;\n\
                   f) forgone revenues;\n\
                   g) communication costs;\n\
                   h) advisory costs (based on available data at the time of reporting)"
                .into(),
            kind: NodeKind::ScoredQuestion,
            options: scored(ids::EVALUATE),
        },
        Node {
            id: ids::EVALUATE.into(),
            text: "Evaluating your answers...".into(),
            kind: NodeKind::Evaluate {
                met: ids::MAJOR_OPERATIONAL.into(),
                not_met: ids::NOT_MAJOR.into(),
            },
            options: vec![Choice::advance("Continue", ids::START)],
        },
        // --- Outcomes ---
        outcome(
            ids::MAJOR_SECURITY,
            Classification::MajorSecurityIncident,
            format!(
                "This is a MAJOR SECURITY INCIDENT under DORA. You must:\n\
                 1. Activate the Security Incident Response Plan Playbook NOW\n\
                 2. Mark the incident as a security incident in the incident management tool\n\
                 3. Mark the incident as a DORA major incident in the incident management tool\n\
                 4. Activate your major incident response plan\n\
                 5. Follow security incident response procedures\n\n\
                 {PLAYBOOK_LINK}"
            ),
        ),
        outcome(
            ids::MAJOR_OPERATIONAL,
            Classification::MajorOperationalIncident,
            format!(
                "This is a MAJOR OPERATIONAL INCIDENT under DORA. You must:\n\
                 1. Activate the Major Incident Response Plan Playbook NOW\n\
                 2. Mark the incident as a security incident in the incident management tool\n\
                 3. Submit a final notification within 72 hours\n\
                 4. Activate your major incident response plan\n\
                 5. Follow operational incident response procedures\n\n\
                 {PLAYBOOK_LINK}"
            ),
        ),
        outcome(
            ids::NOT_MAJOR,
            Classification::NotMajor,
            "This is NOT a major incident under DORA. Continue with normal incident management procedures.\n\n\
             Remember to:\n\
             • Document the incident\n\
             • Implement appropriate remediation measures\n\
             • Review and update incident response procedures if needed"
                .into(),
        ),
    ];

    DecisionGraph::new(ids::START, nodes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assessment::node::ChoiceAction;

    fn graph() -> DecisionGraph {
        dora_assessment().unwrap()
    }

    #[test]
    fn test_builtin_graph_is_valid() {
        let g = graph();
        assert_eq!(g.start_id(), ids::START);
        assert_eq!(g.nodes().count(), 12);
    }

    #[test]
    fn test_only_scored_questions_carry_counts() {
        let g = graph();
        for node in g.nodes() {
            let scored = ids::SCORED.contains(&node.id.as_str());
            assert_eq!(node.kind == NodeKind::ScoredQuestion, scored, "{}", node.id);
            for choice in &node.options {
                assert_eq!(choice.counts_as_yes.is_some(), scored, "{}", node.id);
            }
        }
    }

    #[test]
    fn test_scored_questions_chain_to_evaluation() {
        let g = graph();
        let mut expected_next = ids::SCORED[1..].to_vec();
        expected_next.push(ids::EVALUATE);
        for (id, next) in ids::SCORED.iter().zip(expected_next) {
            let node = g.get(id).unwrap();
            assert!(node.options.iter().all(|c| c.next == next));
            assert_eq!(node.options[0].counts_as_yes, Some(true));
            assert_eq!(node.options[1].counts_as_yes, Some(false));
        }
    }

    #[test]
    fn test_outcomes_offer_single_restart() {
        let g = graph();
        let outcomes: Vec<_> = g.nodes().filter(|n| n.is_outcome()).collect();
        assert_eq!(outcomes.len(), 3);
        for node in outcomes {
            assert_eq!(node.options.len(), 1);
            assert_eq!(node.options[0].action, ChoiceAction::Restart);
            assert_eq!(node.options[0].next, ids::START);
        }
    }

    #[test]
    fn test_data_impact_is_unreachable() {
        assert_eq!(graph().unreachable_nodes(), vec![ids::DATA_IMPACT]);
    }

    #[test]
    fn test_json_round_trip_preserves_graph() {
        let g = graph();
        let json = g.to_json().unwrap();
        assert!(json.contains("\"kind\": \"scored_question\""));
        let loaded = DecisionGraph::from_json(&json).unwrap();
        assert_eq!(loaded.start_id(), g.start_id());
        assert!(g.nodes().eq(loaded.nodes()));
    }

    #[test]
    fn test_rejects_unknown_target() {
        let nodes = vec![Node {
            id: "start".into(),
            text: "Q".into(),
            kind: NodeKind::Question,
            options: vec![Choice::advance("Yes", "nowhere")],
        }];
        let err = DecisionGraph::new("start", nodes).unwrap_err();
        assert!(matches!(err, ConfigurationError::UnknownNode { ref next, .. } if next == "nowhere"));
    }

    #[test]
    fn test_rejects_missing_start() {
        let err = DecisionGraph::new("start", vec![]).unwrap_err();
        assert!(matches!(err, ConfigurationError::MissingStart(_)));
    }

    #[test]
    fn test_rejects_count_on_plain_question() {
        let nodes = vec![Node {
            id: "start".into(),
            text: "Q".into(),
            kind: NodeKind::Question,
            options: vec![Choice::scored("Yes", "start", true)],
        }];
        let err = DecisionGraph::new("start", nodes).unwrap_err();
        assert!(matches!(err, ConfigurationError::ScoringAttribute { .. }));
    }

    #[test]
    fn test_rejects_evaluation_routing_to_question() {
        let nodes = vec![
            Node {
                id: "start".into(),
                text: "Q".into(),
                kind: NodeKind::Question,
                options: vec![Choice::advance("Go", "eval")],
            },
            Node {
                id: "eval".into(),
                text: "E".into(),
                kind: NodeKind::Evaluate {
                    met: "start".into(),
                    not_met: "start".into(),
                },
                options: vec![Choice::advance("Continue", "start")],
            },
        ];
        let err = DecisionGraph::new("start", nodes).unwrap_err();
        assert!(matches!(err, ConfigurationError::MalformedEvaluation { .. }));
    }

    #[test]
    fn test_rejects_restart_outside_outcome() {
        let nodes = vec![Node {
            id: "start".into(),
            text: "Q".into(),
            kind: NodeKind::Question,
            options: vec![Choice::restart("start")],
        }];
        let err = DecisionGraph::new("start", nodes).unwrap_err();
        assert!(matches!(err, ConfigurationError::MisplacedRestart { .. }));
    }

    fn question(id: &str, options: Vec<Choice>) -> Node {
        Node {
            id: id.into(),
            text: "Q".into(),
            kind: NodeKind::Question,
            options,
        }
    }

    fn not_major(options: Vec<Choice>) -> Node {
        Node {
            id: "done".into(),
            text: "O".into(),
            kind: NodeKind::Outcome {
                classification: Classification::NotMajor,
            },
            options,
        }
    }

    #[test]
    fn test_rejects_duplicate_node() {
        let nodes = vec![
            question("start", vec![Choice::advance("Yes", "start")]),
            question("start", vec![Choice::advance("No", "start")]),
        ];
        let err = DecisionGraph::new("start", nodes).unwrap_err();
        assert!(matches!(err, ConfigurationError::DuplicateNode(ref id) if id == "start"));
    }

    #[test]
    fn test_rejects_node_without_options() {
        let nodes = vec![
            question("start", vec![Choice::advance("Go", "empty")]),
            question("empty", vec![]),
        ];
        let err = DecisionGraph::new("start", nodes).unwrap_err();
        assert!(matches!(err, ConfigurationError::NoOptions(ref id) if id == "empty"));
    }

    #[test]
    fn test_rejects_scored_answer_without_count() {
        let nodes = vec![Node {
            id: "start".into(),
            text: "Q".into(),
            kind: NodeKind::ScoredQuestion,
            options: vec![
                Choice::scored("Yes", "start", true),
                Choice::advance("No", "start"),
            ],
        }];
        let err = DecisionGraph::new("start", nodes).unwrap_err();
        assert!(matches!(
            err,
            ConfigurationError::ScoringAttribute { ref label, .. } if label == "No"
        ));
    }

    #[test]
    fn test_rejects_outcome_with_two_options() {
        let nodes = vec![
            question("start", vec![Choice::advance("Go", "done")]),
            not_major(vec![Choice::restart("start"), Choice::restart("start")]),
        ];
        let err = DecisionGraph::new("start", nodes).unwrap_err();
        assert!(matches!(err, ConfigurationError::MalformedOutcome { ref node, .. } if node == "done"));
    }

    #[test]
    fn test_rejects_outcome_with_advance_option() {
        let nodes = vec![
            question("start", vec![Choice::advance("Go", "done")]),
            not_major(vec![Choice::advance("Start New Assessment", "start")]),
        ];
        let err = DecisionGraph::new("start", nodes).unwrap_err();
        assert!(matches!(err, ConfigurationError::MalformedOutcome { .. }));
    }

    #[test]
    fn test_rejects_outcome_restarting_elsewhere() {
        let nodes = vec![
            question("start", vec![Choice::advance("Go", "other")]),
            question("other", vec![Choice::advance("Go", "done")]),
            not_major(vec![Choice::restart("other")]),
        ];
        let err = DecisionGraph::new("start", nodes).unwrap_err();
        assert!(matches!(err, ConfigurationError::MalformedOutcome { .. }));
    }

    #[test]
    fn test_rejects_invalid_json() {
        let err = DecisionGraph::from_json("{\"start\": 1}").unwrap_err();
        assert!(matches!(err, ConfigurationError::Json(_)));
    }
}
