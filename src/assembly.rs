//! Global stiffness and force assembly

use log::{debug, warn};
use thiserror::Error;

use crate::elements::{Element, NodeKind};
use crate::input::InputData;
use crate::math::{coerce_small_matrix, coerce_small_vector, Mat, Vec as SpmVec};

/// A DOF whose stiffness row is empty after assembly
#[derive(Error, Debug, Clone, PartialEq)]
#[error("node {node} ({kind}) has no stiffness in the {direction} direction")]
pub struct UnsupportedDof {
    pub dof: usize,
    pub node: usize,
    pub kind: &'static str,
    pub direction: char,
}

/// Simplified global system ready to be solved
#[derive(Debug, Clone)]
pub struct GlobalSystem {
    /// Stiffness with constrained and fixed rows replaced by identity rows
    pub stiffness: Mat,
    /// Forces with zero entries at constrained and fixed DOFs
    pub forces: SpmVec,
    /// Internal-node DOFs fixed because nothing stiffens them
    pub fixed_dofs: Vec<usize>,
}

impl GlobalSystem {
    /// Assemble and simplify the stiffness for the current element states
    pub fn new(input: &InputData, forces: &SpmVec, fix_unsupported_internal_dofs: bool) -> Result<Self, UnsupportedDof> {
        let mut stiffness = full_stiffness(input);
        let mut forces = forces.clone();
        let fixed_dofs = simplify(input, &mut stiffness, Some(&mut forces), fix_unsupported_internal_dofs)?;

        Ok(Self {
            stiffness,
            forces,
            fixed_dofs,
        })
    }

    /// DOFs that carry no unknown: constrained and fixed ones
    pub fn is_locked(&self, input: &InputData, dof: usize) -> bool {
        input.is_constrained(dof) || self.fixed_dofs.contains(&dof)
    }
}

/// Scatter one element's global stiffness into the global matrix
fn add_element(k: &mut Mat, element: &dyn Element) {
    let ke = element.global_stiffness();
    let dofs = element.dof_indices();

    for (a, &i) in dofs.iter().enumerate() {
        for (b, &j) in dofs.iter().enumerate() {
            k[(i, j)] += ke[(a, b)];
        }
    }
}

/// Unsimplified global stiffness of the current element states
pub fn full_stiffness(input: &InputData) -> Mat {
    let n = input.num_dofs();
    let mut k = Mat::zeros(n, n);

    for element in input.elements() {
        add_element(&mut k, element);
    }

    coerce_small_matrix(&mut k);
    k
}

/// Impose the constraints and handle DOFs without stiffness
///
/// Constrained rows and columns become identity rows with a zero force.
/// A remaining empty row at an internal node is fixed the same way when
/// `fix_internal` is set; any other empty row is reported.
/// Returns the fixed internal DOFs.
pub fn simplify(
    input: &InputData,
    k: &mut Mat,
    mut forces: Option<&mut SpmVec>,
    fix_internal: bool,
) -> Result<Vec<usize>, UnsupportedDof> {
    let n = k.nrows();

    for &dof in &input.constraints {
        k.row_mut(dof).fill(0.0);
        k.column_mut(dof).fill(0.0);
        k[(dof, dof)] = 1.0;
        if let Some(f) = forces.as_deref_mut() {
            f[dof] = 0.0;
        }
    }

    let mut fixed = Vec::new();
    for dof in 0..n {
        if k.row(dof).iter().any(|&x| x != 0.0) {
            continue;
        }

        let Some((node, direction)) = input.node_of_dof(dof) else {
            continue;
        };

        if node.kind == NodeKind::Internal && fix_internal {
            k[(dof, dof)] = 1.0;
            if let Some(f) = forces.as_deref_mut() {
                f[dof] = 0.0;
            }
            fixed.push(dof);
            continue;
        }

        return Err(UnsupportedDof {
            dof,
            node: node.number,
            kind: node.kind.name(),
            direction: if direction == 0 { 'X' } else { 'Y' },
        });
    }

    if !fixed.is_empty() {
        debug!("Fixed {} internal DOFs without stiffness: {:?}", fixed.len(), fixed);
    }

    if let Some(f) = forces {
        coerce_small_vector(f);
    }
    coerce_small_matrix(k);
    Ok(fixed)
}

/// Global stiffness, optionally simplified, with the force vector simplified alongside
///
/// `fix_internal` is passed on to [`simplify`].
pub fn assemble_stiffness(
    input: &InputData,
    simplified: bool,
    fix_internal: bool,
    forces: Option<&mut SpmVec>,
) -> Result<Mat, UnsupportedDof> {
    let mut k = full_stiffness(input);

    if simplified {
        let fixed = simplify(input, &mut k, forces, fix_internal)?;
        if !fixed.is_empty() {
            warn!(
                "{} internal DOFs have no stiffness and were fixed to zero displacement",
                fixed.len()
            );
        }
    }

    Ok(k)
}

/// Internal forces of the current element states, cleared at the `locked` DOFs
pub fn internal_forces(input: &InputData, locked: Option<&[usize]>) -> SpmVec {
    let mut f = SpmVec::zeros(input.num_dofs());

    for element in input.elements() {
        let fe = element.internal_forces();
        for (a, &i) in element.dof_indices().iter().enumerate() {
            f[i] += fe[a];
        }
    }

    if let Some(locked) = locked {
        for &dof in locked {
            f[dof] = 0.0;
        }
    }

    f
}

/// Nodal forces `F = K u` and the reactions at the constrained DOFs
pub fn forces_and_reactions(displacements: &SpmVec, full_stiffness: &Mat, constraints: &[usize]) -> (SpmVec, SpmVec) {
    let mut forces = full_stiffness * displacements;
    coerce_small_vector(&mut forces);

    let mut reactions = SpmVec::zeros(forces.len());
    for &dof in constraints {
        reactions[dof] = forces[dof];
    }

    (forces, reactions)
}
