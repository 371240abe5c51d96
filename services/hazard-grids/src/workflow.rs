//! Impact-forecasting workflow diagram in Graphviz DOT.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result};
use clap::ValueEnum;
use tracing::info;

use crate::config::Domain;

/// Default file name of the written diagram source.
pub const DEFAULT_DIAGRAM_FILE: &str = "impact_workflow.gv";

/// Output format of the workflow diagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum DiagramFormat {
    /// Graphviz DOT source only
    #[default]
    Dot,
    /// DOT source plus an SVG rendered by Graphviz `dot`
    Svg,
    /// DOT source plus a PNG rendered by Graphviz `dot`
    Png,
}

impl DiagramFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagramFormat::Dot => "dot",
            DiagramFormat::Svg => "svg",
            DiagramFormat::Png => "png",
        }
    }
}

type Attrs = Vec<(String, String)>;

fn attrs(pairs: &[(&str, &str)]) -> Attrs {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

const SOURCE: &[(&str, &str)] = &[("shape", "invhouse"), ("style", "filled"), ("fillcolor", "green")];
const PRODUCT: &[(&str, &str)] = &[
    ("shape", "invhouse"),
    ("style", "filled"),
    ("fillcolor", "red"),
    ("fontname", "Arial"),
    ("penwidth", "2"),
];
const ATTRIBUTE: &[(&str, &str)] = &[
    ("shape", "Mrecord"),
    ("style", "filled"),
    ("fillcolor", "white"),
    ("fontname", "Arial"),
    ("fontsize", "10"),
];
const SUBPROCESS: &[(&str, &str)] = &[
    ("shape", "box3d"),
    ("style", "filled"),
    ("penwidth", "2"),
    ("fillcolor", "aquamarine3"),
    ("fontname", "Arial"),
    ("fontsize", "9"),
];
const PROCESS: &[(&str, &str)] = &[
    ("shape", "box3d"),
    ("style", "filled"),
    ("penwidth", "2"),
    ("fillcolor", "aquamarine3"),
];
const DATA: &[(&str, &str)] = &[("shape", "box"), ("style", "filled"), ("fillcolor", "royalblue")];
const TEMPLATE: &[(&str, &str)] = &[("shape", "tab"), ("fontname", "Arial"), ("fontsize", "10")];

#[derive(Debug, Clone)]
struct Node {
    id: String,
    attrs: Attrs,
}

#[derive(Debug, Clone)]
struct Edge {
    from: String,
    to: String,
    attrs: Attrs,
}

/// A directed graph or one of its clusters.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    name: String,
    attrs: Attrs,
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    subgraphs: Vec<Graph>,
}

impl Graph {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn attr(&mut self, key: &str, value: &str) -> &mut Self {
        self.attrs.push((key.to_string(), value.to_string()));
        self
    }

    /// Add a node; `label` defaults to the id.
    pub fn node(&mut self, id: &str, label: Option<&str>, style: &[(&str, &str)]) -> &mut Self {
        let mut node_attrs = Attrs::new();
        if let Some(label) = label {
            node_attrs.push(("label".to_string(), label.to_string()));
        }
        node_attrs.extend(attrs(style));
        self.nodes.push(Node {
            id: id.to_string(),
            attrs: node_attrs,
        });
        self
    }

    pub fn edge(&mut self, from: &str, to: &str) -> &mut Self {
        self.edge_with(from, to, &[])
    }

    pub fn edge_with(&mut self, from: &str, to: &str, style: &[(&str, &str)]) -> &mut Self {
        self.edges.push(Edge {
            from: from.to_string(),
            to: to.to_string(),
            attrs: attrs(style),
        });
        self
    }

    pub fn subgraph(&mut self, graph: Graph) -> &mut Self {
        self.subgraphs.push(graph);
        self
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len() + self.subgraphs.iter().map(Graph::node_count).sum::<usize>()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len() + self.subgraphs.iter().map(Graph::edge_count).sum::<usize>()
    }

    fn write_body(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        let indent = "\t".repeat(depth);
        for (k, v) in &self.attrs {
            writeln!(f, "{}{}={}", indent, k, quote(v))?;
        }
        for graph in &self.subgraphs {
            writeln!(f, "{}subgraph {} {{", indent, quote(&graph.name))?;
            graph.write_body(f, depth + 1)?;
            writeln!(f, "{}}}", indent)?;
        }
        for node in &self.nodes {
            writeln!(f, "{}{}{}", indent, quote(&node.id), attr_list(&node.attrs))?;
        }
        for edge in &self.edges {
            writeln!(
                f,
                "{}{} -> {}{}",
                indent,
                quote(&edge.from),
                quote(&edge.to),
                attr_list(&edge.attrs)
            )?;
        }
        Ok(())
    }
}

impl fmt::Display for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "digraph {} {{", quote(&self.name))?;
        self.write_body(f, 1)?;
        writeln!(f, "}}")
    }
}

/// Quote a DOT identifier, escaping quotes and newlines.
fn quote(s: &str) -> String {
    let escaped = s.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n");
    format!("\"{}\"", escaped)
}

fn attr_list(attrs: &Attrs) -> String {
    if attrs.is_empty() {
        return String::new();
    }
    let parts: Vec<String> = attrs.iter().map(|(k, v)| format!("{}={}", k, quote(v))).collect();
    format!(" [{}]", parts.join(", "))
}

/// The hazard-to-impact workflow for a forecast domain and hazard variable.
pub fn impact_workflow(domain: Domain, variable: &str) -> Graph {
    let mut g = Graph::new("Impact forecasting workflow");
    g.attr("rankdir", "UD")
        .attr("compound", "true")
        .attr("labeljust", "l")
        .attr("fontname", "Arial");

    let mut extraction = Graph::new("cluster_haz_extraction");
    extraction
        .attr("label", "Extraction")
        .attr("fontname", "Arial")
        .attr("fontsize", "10")
        .node("Hazard layer", None, DATA)
        .node(
            "Extract var",
            Some(format!("Extract variable\n'{}'", variable).as_str()),
            SUBPROCESS,
        )
        .edge("Extract var", "Hazard layer");

    let mut hazard = Graph::new("cluster_haz");
    hazard
        .attr("label", "Hazard information")
        .node("ACCESS-City data", None, SOURCE)
        .node("Forecast time", None, ATTRIBUTE)
        .node(
            "Forecast domain",
            Some(format!("Forecast domain\n \"{}\"", domain).as_str()),
            ATTRIBUTE,
        )
        .node(
            "HazImp wind template",
            Some("HazImp template\n\"template: wind_nc\""),
            TEMPLATE,
        )
        .subgraph(extraction)
        .edge_with(
            "ACCESS-City data",
            "Extract var",
            &[("lhead", "cluster_haz_extraction")],
        )
        .edge("ACCESS-City data", "Forecast time")
        .edge("ACCESS-City data", "Forecast domain");

    let mut aggregation = Graph::new("cluster_agg");
    aggregation
        .node("AggSource", Some("Aggregation boundaries"), SOURCE)
        .node("AggBdyFile", Some("Aggregation boundary file name"), ATTRIBUTE)
        .node("AggBdyField", Some("Aggregation boundary field name"), ATTRIBUTE)
        .edge("AggSource", "AggBdyFile")
        .edge("AggSource", "AggBdyField")
        .attr("label", "Aggregation information");

    g.subgraph(hazard).subgraph(aggregation);

    g.node("ga-aws-tcrm-hazimp-nonprod", Some("Exposure data"), SOURCE)
        .node("NEXIS extraction", None, PROCESS)
        .edge("Forecast domain", "NEXIS extraction")
        .edge("ga-aws-tcrm-hazimp-nonprod", "NEXIS extraction")
        .node("Output file name", None, ATTRIBUTE);

    let mut configuration = Graph::new("cluster_config");
    configuration
        .attr("label", "HazImp Configuration")
        .attr("style", "filled")
        .attr("fillcolor", "lightblue")
        .attr("labeljust", "l")
        .node(
            "Configuration file",
            None,
            &[
                ("shape", "component"),
                ("style", "filled"),
                ("fontname", "Arial"),
                ("fontsize", "10"),
                ("fillcolor", "grey"),
            ],
        )
        .edge("AggBdyFile", "Configuration file")
        .edge("AggBdyField", "Configuration file")
        .edge("HazImp wind template", "Configuration file");
    g.subgraph(configuration);

    g.node("HazImp", Some("HazImp engine"), PROCESS)
        .edge("Forecast time", "Output file name")
        .edge("Forecast domain", "Output file name")
        .edge("Output file name", "Configuration file")
        .edge("NEXIS extraction", "HazImp")
        .edge("Hazard layer", "HazImp")
        .edge("Configuration file", "HazImp");

    let mut output = Graph::new("cluster_output");
    output
        .attr("label", "HazImp output files")
        .node("Shape file", None, &[])
        .node("GeoJSON", None, &[])
        .node("PROV XML", None, &[]);
    g.subgraph(output);

    for file in ["Shape file", "GeoJSON", "PROV XML"] {
        g.edge_with("HazImp", file, &[("lhead", "cluster_output")]);
    }

    g.node("Delivery", None, PRODUCT)
        .edge("GeoJSON", "Delivery")
        .edge("Shape file", "Delivery");

    g
}

/// Path of the rendered image for a DOT file: the format is appended as a
/// further extension (`impact_workflow.gv` -> `impact_workflow.gv.svg`).
pub fn rendered_path(source: &Path, format: DiagramFormat) -> PathBuf {
    let mut name = source.as_os_str().to_os_string();
    name.push(".");
    name.push(format.as_str());
    PathBuf::from(name)
}

/// Write the DOT source to `path` and, unless `format` is
/// [`DiagramFormat::Dot`], render it with Graphviz `dot`.
///
/// Returns the files written.
pub fn write_diagram(graph: &Graph, path: &Path, format: DiagramFormat) -> Result<Vec<PathBuf>> {
    write_diagram_with(graph, path, format, "dot")
}

/// As [`write_diagram`], running `program` as the Graphviz renderer.
pub fn write_diagram_with(
    graph: &Graph,
    path: &Path,
    format: DiagramFormat,
    program: &str,
) -> Result<Vec<PathBuf>> {
    std::fs::write(path, graph.to_string())
        .with_context(|| format!("Failed to write {}", path.display()))?;
    let mut written = vec![path.to_path_buf()];

    if format != DiagramFormat::Dot {
        let image = rendered_path(path, format);
        let output = Command::new(program)
            .arg(format!("-T{}", format.as_str()))
            .arg("-o")
            .arg(&image)
            .arg(path)
            .output()
            .with_context(|| format!("Failed to run {}", program))?;

        if !output.status.success() {
            anyhow::bail!(
                "{} failed: {}",
                program,
                String::from_utf8_lossy(&output.stderr)
            );
        }
        info!(path = %image.display(), format = format.as_str(), "Workflow diagram rendered");
        written.push(image);
    }

    Ok(written)
}
