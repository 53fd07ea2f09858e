//! Net topology snapshots and rendering.
//!
//! A [`Topology`] is a plain description of a net (places with their
//! resident token counts, events with their arcs). Visualizers turn it
//! into a diagram; they never touch a running net.

use std::fmt::{self, Display, Formatter};
use std::io;
use std::path::Path;

/// A place as shown in a diagram.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct PlaceInfo {
    pub name: String,
    pub kind: String,
    /// Resident tokens when the snapshot was taken.
    pub tokens: usize,
}

/// An event and its arcs, by place name.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct EventInfo {
    pub name: String,
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
    pub observes: Vec<String>,
}

/// Snapshot of a net's structure, taken with `Net::topology`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct Topology {
    pub places: Vec<PlaceInfo>,
    pub events: Vec<EventInfo>,
}

#[cfg(feature = "serialize")]
impl Topology {
    /// Serialize to pretty-printed JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}

// ── Visualizer ────────────────────────────────────────────────────────

/// Renders a topology into some textual diagram format.
pub trait Visualizer {
    fn render(&self, topology: &Topology) -> String;

    /// Write the rendered diagram to `path`.
    fn save_layout(&self, topology: &Topology, path: &Path) -> io::Result<()> {
        std::fs::write(path, self.render(topology))
    }
}

/// Graphviz DOT output: places are circles, events are boxes, observed
/// places are linked with dashed edges.
#[derive(Debug, Clone)]
pub struct DotVisualizer {
    title: String,
}

impl DotVisualizer {
    pub fn new(title: &str) -> Self {
        DotVisualizer {
            title: title.to_string(),
        }
    }
}

impl Default for DotVisualizer {
    fn default() -> Self {
        DotVisualizer::new("net")
    }
}

impl Visualizer for DotVisualizer {
    fn render(&self, topology: &Topology) -> String {
        Dot {
            title: &self.title,
            topology,
        }
        .to_string()
    }
}

struct Dot<'a> {
    title: &'a str,
    topology: &'a Topology,
}

impl Display for Dot<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "digraph \"{}\" {{", escape(self.title))?;
        writeln!(f, "    rankdir=LR;")?;

        for place in &self.topology.places {
            writeln!(
                f,
                "    \"p:{0}\" [shape=circle, label=\"{0}\\n{1}\"];",
                escape(&place.name),
                tokens_label(place.tokens)
            )?;
        }
        for event in &self.topology.events {
            writeln!(
                f,
                "    \"e:{0}\" [shape=box, label=\"{0}\"];",
                escape(&event.name)
            )?;
        }

        for event in &self.topology.events {
            let e = escape(&event.name);
            for p in &event.inputs {
                writeln!(f, "    \"p:{}\" -> \"e:{}\";", escape(p), e)?;
            }
            for p in &event.outputs {
                writeln!(f, "    \"e:{}\" -> \"p:{}\";", e, escape(p))?;
            }
            for p in &event.observes {
                writeln!(f, "    \"p:{}\" -> \"e:{}\" [style=dashed];", escape(p), e)?;
            }
        }

        write!(f, "}}")
    }
}

fn tokens_label(n: usize) -> String {
    match n {
        1 => "1 token".into(),
        n => format!("{} tokens", n),
    }
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}
