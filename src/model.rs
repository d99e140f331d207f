//! SPM Model - the external snapshot of a stringer-panel model

use std::cmp::Ordering;
use std::collections::HashMap;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::elements::{Constraint, CrossSection, Node, NodeKind, Point, POSITION_TOLERANCE};
use crate::error::{InputError, SpmResult};
use crate::loads::Force;
use crate::material::{UniaxialReinforcement, WebReinforcement};

/// Stringer record of a model snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StringerData {
    /// Number (1-based)
    pub number: usize,
    /// Node numbers of the start, middle and end grips
    pub grips: [usize; 3],
    /// Cross-section
    #[serde(default)]
    pub section: CrossSection,
    /// Longitudinal bars
    #[serde(default)]
    pub reinforcement: Option<UniaxialReinforcement>,
}

/// Panel record of a model snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanelData {
    /// Number (1-based)
    pub number: usize,
    /// Node numbers of the grips at the edge midpoints
    pub grips: [usize; 4],
    /// Vertices, edge `k` runs from vertex `k` to `k + 1`
    pub vertices: [Point; 4],
    /// Thickness in mm
    pub width: f64,
    /// Web bars
    #[serde(default)]
    pub reinforcement: WebReinforcement,
}

/// Ordered, numbered snapshot of a stringer-panel model
///
/// Node numbers fix the DOF indices, so the ordering is part of the
/// contract with the model provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpmModel {
    /// Nodes, numbered 1..N
    pub nodes: Vec<Node>,
    /// Stringers
    pub stringers: Vec<StringerData>,
    /// Panels
    #[serde(default)]
    pub panels: Vec<PanelData>,
}

impl SpmModel {
    /// Create an empty model
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a model from JSON
    pub fn from_json(json: &str) -> SpmResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize the model to pretty JSON
    pub fn to_json(&self) -> SpmResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Get a node by number
    pub fn node(&self, number: usize) -> Option<&Node> {
        self.nodes.iter().find(|n| n.number == number)
    }

    /// Number of analysed nodes
    pub fn num_nodes(&self) -> usize {
        self.nodes.iter().filter(|n| n.kind != NodeKind::Displaced).count()
    }
}

/// Position rounded to the comparison tolerance, used as a map key
type PositionKey = (i64, i64);

fn position_key(p: &Point) -> PositionKey {
    (
        (p.x / POSITION_TOLERANCE).round() as i64,
        (p.y / POSITION_TOLERANCE).round() as i64,
    )
}

/// Ascending Y, then ascending X
fn compare_positions(a: &Point, b: &Point) -> Ordering {
    a.y.total_cmp(&b.y).then(a.x.total_cmp(&b.x))
}

#[derive(Debug, Clone)]
struct StringerEntry {
    start: Point,
    end: Point,
    section: CrossSection,
    reinforcement: Option<UniaxialReinforcement>,
}

#[derive(Debug, Clone)]
struct PanelEntry {
    vertices: [Point; 4],
    width: f64,
    reinforcement: WebReinforcement,
}

/// Builds a numbered [`SpmModel`] from element geometry
///
/// Nodes are created at stringer ends (external) and at stringer and panel
/// edge midpoints (internal). Nodes are numbered by ascending Y then X,
/// stringers by their start and end positions and panels by their centers.
#[derive(Debug, Clone, Default)]
pub struct ModelBuilder {
    stringers: Vec<StringerEntry>,
    panels: Vec<PanelEntry>,
    constraints: Vec<(Point, Constraint)>,
    forces: Vec<(Point, Force)>,
}

impl ModelBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a stringer between two points
    pub fn add_stringer(
        &mut self,
        start: Point,
        end: Point,
        section: CrossSection,
        reinforcement: Option<UniaxialReinforcement>,
    ) -> &mut Self {
        // Start at the end that comes first in node order
        let (start, end) = if compare_positions(&end, &start) == Ordering::Less {
            (end, start)
        } else {
            (start, end)
        };

        self.stringers.push(StringerEntry {
            start,
            end,
            section,
            reinforcement,
        });
        self
    }

    /// Add a panel by its four vertices
    pub fn add_panel(&mut self, vertices: [Point; 4], width: f64, reinforcement: WebReinforcement) -> &mut Self {
        self.panels.push(PanelEntry {
            vertices,
            width,
            reinforcement,
        });
        self
    }

    /// Support the node at a point
    pub fn add_constraint(&mut self, at: Point, constraint: Constraint) -> &mut Self {
        self.constraints.push((at, constraint));
        self
    }

    /// Load the node at a point; forces at the same node add up
    pub fn add_force(&mut self, at: Point, force: Force) -> &mut Self {
        self.forces.push((at, force));
        self
    }

    /// Number the nodes and elements and resolve supports and forces
    pub fn build(&self) -> Result<SpmModel, InputError> {
        if self.stringers.is_empty() {
            return Err(InputError::NoStringers);
        }

        let mut points: HashMap<PositionKey, (Point, NodeKind)> = HashMap::new();
        let mut insert = |p: Point, kind: NodeKind| {
            let entry = points.entry(position_key(&p)).or_insert((p, kind));
            if kind == NodeKind::External {
                entry.1 = NodeKind::External;
            }
        };

        for s in &self.stringers {
            insert(s.start, NodeKind::External);
            insert(s.end, NodeKind::External);
            insert(s.start.midpoint(&s.end), NodeKind::Internal);
        }
        for p in &self.panels {
            for k in 0..4 {
                insert(p.vertices[k].midpoint(&p.vertices[(k + 1) % 4]), NodeKind::Internal);
            }
        }

        let mut sorted: Vec<(Point, NodeKind)> = points.into_values().collect();
        sorted.sort_by(|a, b| compare_positions(&a.0, &b.0));

        let mut numbers: HashMap<PositionKey, usize> = HashMap::new();
        let mut nodes = Vec::with_capacity(sorted.len());
        for (i, (position, kind)) in sorted.into_iter().enumerate() {
            numbers.insert(position_key(&position), i + 1);
            nodes.push(Node::new(i + 1, position, kind));
        }

        let number_at = |p: &Point| {
            numbers.get(&position_key(p)).copied().ok_or_else(|| {
                InputError::InvalidGeometry(format!("No node at ({}, {})", p.x, p.y))
            })
        };

        for (at, constraint) in &self.constraints {
            let node = &mut nodes[number_at(at)? - 1];
            if node.kind != NodeKind::External {
                return Err(InputError::InternalNodeLoad { node: node.number, what: "a constraint" });
            }
            node.constraint = *constraint;
        }

        for (at, force) in &self.forces {
            let node = &mut nodes[number_at(at)? - 1];
            if node.kind != NodeKind::External {
                return Err(InputError::InternalNodeLoad { node: node.number, what: "a force" });
            }
            node.force = node.force + *force;
        }

        let mut stringers = self.stringers.clone();
        stringers.sort_by(|a, b| {
            compare_positions(&a.start, &b.start).then(compare_positions(&a.end, &b.end))
        });

        let mut stringer_data = Vec::with_capacity(stringers.len());
        for (i, s) in stringers.iter().enumerate() {
            let grips = [
                number_at(&s.start)?,
                number_at(&s.start.midpoint(&s.end))?,
                number_at(&s.end)?,
            ];

            if stringer_data.iter().any(|d: &StringerData| d.grips == grips) {
                return Err(InputError::InvalidGeometry(format!(
                    "Duplicate stringer from ({}, {}) to ({}, {})",
                    s.start.x, s.start.y, s.end.x, s.end.y
                )));
            }

            stringer_data.push(StringerData {
                number: i + 1,
                grips,
                section: s.section,
                reinforcement: s.reinforcement,
            });
        }

        let mut panels = self.panels.clone();
        panels.sort_by(|a, b| compare_positions(&center(&a.vertices), &center(&b.vertices)));

        let mut panel_data = Vec::with_capacity(panels.len());
        for (i, p) in panels.iter().enumerate() {
            let mut grips = [0; 4];
            for (k, grip) in grips.iter_mut().enumerate() {
                *grip = number_at(&p.vertices[k].midpoint(&p.vertices[(k + 1) % 4]))?;
            }

            panel_data.push(PanelData {
                number: i + 1,
                grips,
                vertices: p.vertices,
                width: p.width,
                reinforcement: p.reinforcement,
            });
        }

        info!(
            "Built model with {} nodes, {} stringers and {} panels",
            nodes.len(),
            stringer_data.len(),
            panel_data.len()
        );
        debug!("Node order: {:?}", nodes.iter().map(|n| (n.number, n.position)).collect::<Vec<_>>());

        Ok(SpmModel {
            nodes,
            stringers: stringer_data,
            panels: panel_data,
        })
    }
}

fn center(vertices: &[Point; 4]) -> Point {
    let x = vertices.iter().map(|p| p.x).sum::<f64>() / 4.0;
    let y = vertices.iter().map(|p| p.y).sum::<f64>() / 4.0;
    Point::new(x, y)
}
