pub mod node;
pub mod tree;

use std::fs;
use std::io::{BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use log::{debug, info, warn};

use crate::engine::{Announcer, Engine};
use crate::markup::terminal_text;
use self::tree::DecisionGraph;

// ---------------------------------------------------------------------------
// Shell configuration
// ---------------------------------------------------------------------------

pub struct ShellConfig {
    /// Where the `copy` command writes the assessment log.
    pub export_path: PathBuf,
    /// Decision graph in JSON. The built-in DORA graph when absent.
    pub tree_path: Option<PathBuf>,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            export_path: PathBuf::from("dora-assessment-log.txt"),
            tree_path: None,
        }
    }
}

impl ShellConfig {
    pub fn load_graph(&self) -> Result<DecisionGraph> {
        match &self.tree_path {
            Some(path) => {
                let json = fs::read_to_string(path)
                    .with_context(|| format!("failed to read decision graph {}", path.display()))?;
                DecisionGraph::from_json(&json)
                    .with_context(|| format!("invalid decision graph {}", path.display()))
            }
            None => tree::dora_assessment().context("built-in decision graph is invalid"),
        }
    }
}

// ---------------------------------------------------------------------------
// Terminal announcer
// ---------------------------------------------------------------------------

/// Queues announcements until the shell prints them after each choice.
#[derive(Debug, Default)]
struct TerminalAnnouncer {
    pending: Vec<String>,
    dirty: bool,
}

impl Announcer for TerminalAnnouncer {
    fn announce(&mut self, message: &str) {
        debug!("Announce: {message}");
        self.pending.push(message.to_string());
    }

    fn display_changed(&mut self) {
        self.dirty = true;
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

fn show_node(out: &mut impl Write, engine: &Engine<TerminalAnnouncer>) -> Result<()> {
    let node = engine.current_node();
    debug!("{}", engine.current_label());
    writeln!(out, "\n----------------------------------------")?;
    writeln!(out, "{}", terminal_text(&node.text))?;
    writeln!(out)?;
    for (i, choice) in node.options.iter().enumerate() {
        writeln!(out, "  [{}] {}", i + 1, choice.label)?;
    }
    writeln!(out, "\n  [h] History    [c] Copy log    [n] New assessment    [q] Quit")?;
    Ok(())
}

fn show_history(out: &mut impl Write, engine: &Engine<TerminalAnnouncer>) -> Result<()> {
    writeln!(out, "\n{}", engine.session().history.label())?;
    for line in engine.render_entries() {
        writeln!(out, "  {line}")?;
    }
    Ok(())
}

/// Write the log to the export file. Failures are reported, never retried.
fn copy_log(out: &mut impl Write, engine: &Engine<TerminalAnnouncer>, config: &ShellConfig) -> Result<()> {
    let log = engine.export_log();
    match fs::write(&config.export_path, log) {
        Ok(()) => {
            info!(
                "Exported log ({} entries) to {}",
                engine.history().len(),
                config.export_path.display()
            );
            writeln!(out, "(Copied log to {})", config.export_path.display())?;
        }
        Err(e) => {
            warn!("Failed to export log to {}: {e}", config.export_path.display());
            writeln!(out, "(Failed to copy log: {e})")?;
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

enum Command {
    Choose(String),
    History,
    Copy,
    Restart,
    Quit,
}

fn parse_command(input: &str, engine: &Engine<TerminalAnnouncer>) -> Option<Command> {
    let options = &engine.current_node().options;
    match input.to_lowercase().as_str() {
        "h" | "history" => return Some(Command::History),
        "c" | "copy" => return Some(Command::Copy),
        "n" | "new" => return Some(Command::Restart),
        "q" | "quit" | "exit" => return Some(Command::Quit),
        _ => {}
    }

    if let Ok(n) = input.parse::<usize>() {
        return n
            .checked_sub(1)
            .and_then(|i| options.get(i))
            .map(|c| Command::Choose(c.label.clone()));
    }
    options
        .iter()
        .find(|c| c.label.eq_ignore_ascii_case(input))
        .map(|c| Command::Choose(c.label.clone()))
}

// ---------------------------------------------------------------------------
// Public entry point — runs assessments until the user quits
// ---------------------------------------------------------------------------

pub fn run(config: &ShellConfig, input: &mut impl BufRead, out: &mut impl Write) -> Result<()> {
    let graph = config.load_graph()?;
    for id in graph.unreachable_nodes() {
        warn!("Node '{id}' is not reachable from '{}'", graph.start_id());
    }

    let mut engine = Engine::new(graph, TerminalAnnouncer::default());
    info!("Assessment started. Initial node: {}", engine.session().current_node_id);

    writeln!(out, "\n========================================")?;
    writeln!(out, "   DORA MAJOR INCIDENT ASSESSMENT")?;
    writeln!(out, "========================================")?;
    writeln!(out, "Answer each question by number or label.")?;
    show_node(out, &engine)?;

    loop {
        write!(out, "\n> ")?;
        out.flush()?;
        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            info!("Input closed");
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match parse_command(line, &engine) {
            Some(Command::Choose(label)) => engine
                .choose_label(&label)
                .context("decision graph routed to an unknown node")?,
            Some(Command::History) => show_history(out, &engine)?,
            Some(Command::Copy) => copy_log(out, &engine, config)?,
            Some(Command::Restart) => engine
                .restart()
                .context("decision graph has no start node")?,
            Some(Command::Quit) => break,
            None => writeln!(out, "  Pick one of the listed options.")?,
        }

        let announcer = engine.announcer_mut();
        let messages = std::mem::take(&mut announcer.pending);
        let dirty = std::mem::take(&mut announcer.dirty);
        for message in messages {
            writeln!(out, "({message})")?;
        }
        if dirty {
            show_node(out, &engine)?;
        }
    }

    writeln!(out, "Assessment closed.")?;
    Ok(())
}
