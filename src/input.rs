//! Analysis input built from a model snapshot

use log::{debug, info};

use crate::elements::{
    panel_dof_continuity, Behavior, Displacement, Element, FailureMode, Node, NodeKind, Panel, Stringer,
};
use crate::error::InputError;
use crate::loads::Force;
use crate::material::Concrete;
use crate::math::Vec as SpmVec;
use crate::model::SpmModel;

/// Distance (mm) allowed between a grip node and the point it must lie on
const GRIP_TOLERANCE: f64 = 1e-3;

/// Ordered nodes and elements, force vector and constrained DOFs of one analysis
///
/// Topology is fixed for the lifetime of the value; elements own their
/// material state.
#[derive(Debug, Clone)]
pub struct InputData {
    /// Nodes ordered by number
    pub nodes: Vec<Node>,
    /// Stringers ordered by number
    pub stringers: Vec<Stringer>,
    /// Panels ordered by number
    pub panels: Vec<Panel>,
    /// Applied forces, size `2 * nodes`
    pub forces: SpmVec,
    /// Constrained DOF indices in ascending order
    pub constraints: Vec<usize>,
    /// Concrete shared by all elements
    pub concrete: Concrete,
}

impl InputData {
    /// Build the analysis input from a model snapshot
    pub fn new(model: &SpmModel, concrete: Concrete) -> Result<Self, InputError> {
        concrete.parameters.validate()?;

        let mut nodes: Vec<Node> = model
            .nodes
            .iter()
            .filter(|n| n.kind != NodeKind::Displaced)
            .cloned()
            .collect();
        nodes.sort_by_key(|n| n.number);

        if nodes.is_empty() {
            return Err(InputError::NoNodes);
        }
        if model.stringers.is_empty() {
            return Err(InputError::NoStringers);
        }

        for (i, node) in nodes.iter().enumerate() {
            if node.number != i + 1 {
                return Err(InputError::NodeNumbering {
                    expected: i + 1,
                    found: node.number,
                });
            }
            if node.kind == NodeKind::Internal {
                if node.constraint.is_supported() {
                    return Err(InputError::InternalNodeLoad { node: node.number, what: "a constraint" });
                }
                if !node.force.is_zero() {
                    return Err(InputError::InternalNodeLoad { node: node.number, what: "a force" });
                }
            }
        }

        let mut forces = SpmVec::zeros(2 * nodes.len());
        let mut constraints = Vec::new();
        for node in &nodes {
            let [x, y] = node.dof_indices();
            forces[x] = node.force.x;
            forces[y] = node.force.y;
            constraints.extend(node.constraint.restrained_dofs().into_iter().map(|d| 2 * (node.number - 1) + d));
        }
        constraints.sort_unstable();

        let stringers = build_stringers(model, &nodes, concrete)?;
        let panels = build_panels(model, &nodes, concrete)?;

        info!(
            "Input: {} nodes ({} DOFs), {} stringers, {} panels, {} constrained DOFs",
            nodes.len(),
            forces.len(),
            stringers.len(),
            panels.len(),
            constraints.len()
        );

        Ok(Self {
            nodes,
            stringers,
            panels,
            forces,
            constraints,
            concrete,
        })
    }

    /// Number of DOFs
    pub fn num_dofs(&self) -> usize {
        2 * self.nodes.len()
    }

    /// Get a node by number
    pub fn node(&self, number: usize) -> Option<&Node> {
        number.checked_sub(1).and_then(|i| self.nodes.get(i))
    }

    /// Node owning a DOF and the direction (0 = X, 1 = Y)
    pub fn node_of_dof(&self, dof: usize) -> Option<(&Node, usize)> {
        self.nodes.get(dof / 2).map(|n| (n, dof % 2))
    }

    pub fn is_constrained(&self, dof: usize) -> bool {
        self.constraints.binary_search(&dof).is_ok()
    }

    /// Clear element states and switch every element to a behavior
    pub fn reset(&mut self, behavior: Behavior) {
        for element in self.elements_mut() {
            element.reset(behavior);
        }
        for node in &mut self.nodes {
            node.displacement = Displacement::default();
            node.reaction = Force::default();
        }
    }

    /// All elements, stringers first
    pub fn elements(&self) -> impl Iterator<Item = &dyn Element> + '_ {
        self.stringers
            .iter()
            .map(|s| s as &dyn Element)
            .chain(self.panels.iter().map(|p| p as &dyn Element))
    }

    pub fn elements_mut(&mut self) -> impl Iterator<Item = &mut dyn Element> + '_ {
        self.stringers
            .iter_mut()
            .map(|s| s as &mut dyn Element)
            .chain(self.panels.iter_mut().map(|p| p as &mut dyn Element))
    }

    /// Update every element from the global displacements
    pub fn update_elements(&mut self, displacements: &SpmVec) {
        for element in self.elements_mut() {
            element.analysis(displacements);
        }
    }

    pub fn commit_elements(&mut self) {
        for element in self.elements_mut() {
            element.commit();
        }
    }

    /// First element that failed, with its failure mode
    pub fn first_failure(&self) -> Option<(String, FailureMode)> {
        self.elements().find_map(|e| e.failure().map(|mode| (e.label(), mode)))
    }

    /// Store displacements and reactions in the nodes
    pub fn set_nodal_results(&mut self, displacements: &SpmVec, reactions: &SpmVec) {
        for node in &mut self.nodes {
            let [x, y] = node.dof_indices();
            node.displacement = Displacement::new(displacements[x], displacements[y]);
            node.reaction = Force::new(reactions[x], reactions[y]);
        }
    }

    /// Pairs of stringer numbers that continue each other in a straight line
    pub fn stringer_continuity(&self) -> Vec<(usize, usize)> {
        let mut pairs = Vec::new();
        for (i, a) in self.stringers.iter().enumerate() {
            for b in &self.stringers[i + 1..] {
                if a.is_continued_by(b) {
                    pairs.push((a.number, b.number));
                }
            }
        }
        pairs
    }

    /// Panel DOFs shared with a neighbouring panel
    pub fn panel_continuity(&self) -> Vec<(usize, usize)> {
        panel_dof_continuity(&self.panels)
    }
}

fn lookup<'a>(nodes: &'a [Node], element: &str, number: usize) -> Result<&'a Node, InputError> {
    number
        .checked_sub(1)
        .and_then(|i| nodes.get(i))
        .ok_or_else(|| InputError::UnknownNode {
            element: element.to_string(),
            node: number,
        })
}

fn check_kind(element: &str, grip: usize, node: &Node, expected: NodeKind) -> Result<(), InputError> {
    if node.kind != expected {
        return Err(InputError::GripKind {
            element: element.to_string(),
            grip,
            node: node.number,
            expected: expected.name(),
            found: node.kind.name(),
        });
    }
    Ok(())
}

fn build_stringers(model: &SpmModel, nodes: &[Node], concrete: Concrete) -> Result<Vec<Stringer>, InputError> {
    let mut data: Vec<_> = model.stringers.iter().collect();
    data.sort_by_key(|s| s.number);

    data.into_iter()
        .map(|s| {
            let label = format!("Stringer {}", s.number);
            let grips = [
                lookup(nodes, &label, s.grips[0])?,
                lookup(nodes, &label, s.grips[1])?,
                lookup(nodes, &label, s.grips[2])?,
            ];

            check_kind(&label, 1, grips[0], NodeKind::External)?;
            check_kind(&label, 2, grips[1], NodeKind::Internal)?;
            check_kind(&label, 3, grips[2], NodeKind::External)?;

            let (start, end) = (grips[0].position, grips[2].position);
            if grips[1].position.distance_to(&start.midpoint(&end)) > GRIP_TOLERANCE {
                return Err(InputError::InvalidGeometry(format!(
                    "{} middle grip (node {}) is not at its midpoint",
                    label, grips[1].number
                )));
            }

            Stringer::new(s.number, s.grips, start, end, s.section, s.reinforcement, concrete)
        })
        .collect()
}

fn build_panels(model: &SpmModel, nodes: &[Node], concrete: Concrete) -> Result<Vec<Panel>, InputError> {
    let mut data: Vec<_> = model.panels.iter().collect();
    data.sort_by_key(|p| p.number);

    data.into_iter()
        .map(|p| {
            let label = format!("Panel {}", p.number);
            for (k, &grip) in p.grips.iter().enumerate() {
                check_kind(&label, k + 1, lookup(nodes, &label, grip)?, NodeKind::Internal)?;
            }

            let panel = Panel::new(p.number, p.grips, p.vertices, p.width, p.reinforcement, concrete)?;

            for (k, midpoint) in panel.edge_midpoints().iter().enumerate() {
                let node = lookup(nodes, &label, panel.grips[k])?;
                if node.position.distance_to(midpoint) > GRIP_TOLERANCE {
                    return Err(InputError::InvalidGeometry(format!(
                        "{} grip node {} is not at the midpoint of edge {}",
                        label,
                        node.number,
                        k + 1
                    )));
                }
            }

            debug!("{}: area {:.1} mm², width {} mm", label, panel.area(), panel.width);
            Ok(panel)
        })
        .collect()
}
