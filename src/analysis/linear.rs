//! Linear elastic solution

use log::{debug, info};

use super::{AnalysisSettings, AnalysisType};
use crate::assembly::{forces_and_reactions, full_stiffness, simplify};
use crate::elements::Behavior;
use crate::error::{SpmError, SpmResult};
use crate::input::InputData;
use crate::math::{coerce_small_vector, Factorization};
use crate::results::AnalysisOutput;

fn singular(detail: impl ToString) -> SpmError {
    SpmError::SingularMatrix {
        step: 0,
        iteration: 0,
        detail: detail.to_string(),
    }
}

/// Solve `K u = λ F` with the uncracked stiffness and recover element results
pub fn solve_linear(input: &mut InputData, settings: &AnalysisSettings) -> SpmResult<AnalysisOutput> {
    input.reset(Behavior::Linear);

    let k_full = full_stiffness(input);
    let mut k = k_full.clone();
    let mut f = &input.forces * settings.load_factor;

    let fixed = simplify(input, &mut k, Some(&mut f), settings.fix_unsupported_internal_dofs).map_err(singular)?;

    let factorization = Factorization::new(&k, settings.solver).map_err(singular)?;
    let mut u = factorization
        .solve(&f)
        .ok_or_else(|| singular("solution is not finite"))?;
    coerce_small_vector(&mut u);

    debug!("Max displacement: {:.6e} mm", u.amax());

    input.update_elements(&u);
    input.commit_elements();

    let (forces, reactions) = forces_and_reactions(&u, &k_full, &input.constraints);
    input.set_nodal_results(&u, &reactions);

    info!("Linear analysis finished ({} DOFs)", u.len());

    let mut output = AnalysisOutput::from_input(AnalysisType::Linear, input, &u, &forces);
    output.fixed_dofs = fixed;
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::{Constraint, CrossSection, Point};
    use crate::loads::Force;
    use crate::material::Concrete;
    use crate::model::ModelBuilder;
    use approx::assert_relative_eq;

    #[test]
    fn test_axial_cantilever() {
        let mut builder = ModelBuilder::new();
        builder
            .add_stringer(Point::new(0.0, 0.0), Point::new(2000.0, 0.0), CrossSection::rectangular(100.0, 200.0), None)
            .add_constraint(Point::new(0.0, 0.0), Constraint::XY)
            .add_constraint(Point::new(2000.0, 0.0), Constraint::Y)
            .add_force(Point::new(2000.0, 0.0), Force::fx(10_000.0));

        let mut input = InputData::new(&builder.build().unwrap(), Concrete::default()).unwrap();
        let ea = input.stringers[0].initial_axial_stiffness();
        let output = solve_linear(&mut input, &AnalysisSettings::linear()).unwrap();

        assert_relative_eq!(output.displacements[4], 10_000.0 * 2000.0 / ea, max_relative = 1e-6);
        assert_relative_eq!(output.displacements[2], 0.5 * output.displacements[4], max_relative = 1e-6);
        assert_relative_eq!(output.node(1).unwrap().reaction.x, -10_000.0, max_relative = 1e-6);
        assert_relative_eq!(output.stringers[0].normal_forces[1], 10_000.0, max_relative = 1e-6);
        assert_eq!(output.fixed_dofs, vec![3]);
    }

    #[test]
    fn test_load_factor_scales_response() {
        let mut builder = ModelBuilder::new();
        builder
            .add_stringer(Point::new(0.0, 0.0), Point::new(0.0, 1000.0), CrossSection::default(), None)
            .add_constraint(Point::new(0.0, 0.0), Constraint::XY)
            .add_constraint(Point::new(0.0, 1000.0), Constraint::X)
            .add_force(Point::new(0.0, 1000.0), Force::fy(-5000.0));

        let model = builder.build().unwrap();
        let mut input = InputData::new(&model, Concrete::default()).unwrap();

        let unit = solve_linear(&mut input, &AnalysisSettings::linear()).unwrap();
        let doubled = solve_linear(&mut input, &AnalysisSettings::linear().with_load_factor(2.0)).unwrap();

        assert!(unit.displacements[5] < 0.0);
        assert_relative_eq!(doubled.displacements[5], 2.0 * unit.displacements[5], max_relative = 1e-12);
    }
}
