use approx::assert_relative_eq;
use spm_solver::assembly::{full_stiffness, simplify};
use spm_solver::math::{is_symmetric, Factorization};
use spm_solver::prelude::*;

fn point(x: f64, y: f64) -> Point {
    Point::new(x, y)
}

/// Wall of `columns` x `rows` square panels bordered by stringers, fixed at the base
/// and pushed horizontally at the top left corner
fn wall(columns: usize, rows: usize, push: f64) -> SpmModel {
    let size = 500.0;
    let section = CrossSection::rectangular(100.0, 150.0);
    let bars = UniaxialReinforcement::new(2, 10.0, Steel::ca50());
    let web = WebReinforcement::orthogonal(WebDirection::new(8.0, 200.0, Steel::ca50()));
    let at = |i: usize, j: usize| point(i as f64 * size, j as f64 * size);

    let mut builder = ModelBuilder::new();
    for j in 0..=rows {
        for i in 0..columns {
            builder.add_stringer(at(i, j), at(i + 1, j), section, Some(bars));
        }
    }
    for j in 0..rows {
        for i in 0..=columns {
            builder.add_stringer(at(i, j), at(i, j + 1), section, Some(bars));
        }
        for i in 0..columns {
            builder.add_panel([at(i, j), at(i + 1, j), at(i + 1, j + 1), at(i, j + 1)], 100.0, web);
        }
    }
    for i in 0..=columns {
        builder.add_constraint(at(i, 0), Constraint::XY);
    }
    builder.add_force(at(0, rows), Force::fx(push));

    builder.build().unwrap()
}

/// Single panel bordered by stringers, fixed at the base, held vertically at the top
/// corners and sheared at the top left corner
fn shear_panel(push: f64) -> SpmModel {
    let section = CrossSection::rectangular(100.0, 150.0);
    let bars = UniaxialReinforcement::new(2, 10.0, Steel::ca50());
    let web = WebReinforcement::orthogonal(WebDirection::new(10.0, 100.0, Steel::ca50()));
    let corners = [point(0.0, 0.0), point(500.0, 0.0), point(500.0, 500.0), point(0.0, 500.0)];

    let mut builder = ModelBuilder::new();
    for k in 0..4 {
        builder.add_stringer(corners[k], corners[(k + 1) % 4], section, Some(bars));
    }
    builder
        .add_panel(corners, 100.0, web)
        .add_constraint(corners[0], Constraint::XY)
        .add_constraint(corners[1], Constraint::XY)
        .add_constraint(corners[2], Constraint::Y)
        .add_constraint(corners[3], Constraint::Y)
        .add_force(corners[3], Force::fx(push));
    builder.build().unwrap()
}

/// Horizontal stringer fixed at the left end and loaded axially at the right end
fn tie(length: f64, force: f64, reinforcement: Option<UniaxialReinforcement>) -> SpmModel {
    let mut builder = ModelBuilder::new();
    builder
        .add_stringer(point(0.0, 0.0), point(length, 0.0), CrossSection::rectangular(150.0, 150.0), reinforcement)
        .add_constraint(point(0.0, 0.0), Constraint::XY)
        .add_constraint(point(length, 0.0), Constraint::Y)
        .add_force(point(length, 0.0), Force::fx(force));
    builder.build().unwrap()
}

#[test]
fn test_wall_stiffness_symmetric_with_identity_constraint_rows() {
    let model = wall(2, 2, 50_000.0);
    let input = InputData::new(&model, Concrete::mcft(30.0)).unwrap();

    let mut k = full_stiffness(&input);
    assert!(is_symmetric(&k, 1e-6));

    let mut f = input.forces.clone();
    let fixed = simplify(&input, &mut k, Some(&mut f), false).unwrap();
    assert!(fixed.is_empty(), "every internal DOF of a closed wall is stiffened");
    assert!(is_symmetric(&k, 1e-6));
    assert!(Factorization::new(&k, SolverKind::Lu).is_ok());
    assert!(Factorization::new(&k, SolverKind::Skyline).is_ok());

    for &dof in &input.constraints {
        assert_eq!(k[(dof, dof)], 1.0);
        assert!(k.row(dof).iter().enumerate().all(|(j, &v)| j == dof || v == 0.0));
        assert_eq!(f[dof], 0.0);
    }
    assert!(k.iter().all(|&v| v == 0.0 || v.abs() >= 1e-9));
}

#[test]
fn test_axial_tie_matches_closed_form() {
    let model = tie(3000.0, 25_000.0, Some(UniaxialReinforcement::new(4, 12.0, Steel::ca50())));
    let mut input = InputData::new(&model, Concrete::mcft(30.0)).unwrap();
    let ea = input.stringers[0].initial_axial_stiffness();

    let output = solve_linear(&mut input, &AnalysisSettings::linear()).unwrap();

    let tip = output.node(3).unwrap();
    assert_relative_eq!(tip.displacement.x, 25_000.0 * 3000.0 / ea, max_relative = 1e-6);
    assert_relative_eq!(output.node(1).unwrap().reaction.x, -25_000.0, max_relative = 1e-6);
    for &n in &output.stringers[0].normal_forces {
        assert_relative_eq!(n, 25_000.0, max_relative = 1e-6);
    }
}

#[test]
fn test_wall_reactions_balance_push() {
    let output = analyze(&wall(2, 2, 80_000.0), Concrete::mcft(30.0), &AnalysisSettings::linear()).unwrap();

    let (rx, ry): (f64, f64) = output
        .nodes
        .iter()
        .fold((0.0, 0.0), |(x, y), n| (x + n.reaction.x, y + n.reaction.y));
    assert_relative_eq!(rx, -80_000.0, max_relative = 1e-6);
    assert!(ry.abs() < 1e-3);

    // Pushed to the right, the top sways the same way
    let top_left = output.nodes.iter().find(|n| n.position == point(0.0, 1000.0)).unwrap();
    assert!(top_left.displacement.x > 0.0);
    assert!(output.panels.iter().all(|p| p.shear_stress.abs() > 0.0));
}

#[test]
fn test_single_panel_wall_is_solvable() {
    let output = analyze(&wall(1, 1, 10_000.0), Concrete::mcft(30.0), &AnalysisSettings::linear()).unwrap();

    let top_left = output.nodes.iter().find(|n| n.position == point(0.0, 500.0)).unwrap();
    assert!(top_left.displacement.x > 0.0);
    assert!(output.displacements.iter().all(|u| u.is_finite()));
    assert!(output.max_displacement() >= top_left.displacement.x);
    assert!(output.panels[0].shear_stress > 0.0);
}

#[test]
fn test_uncracked_wall_nonlinear_matches_linear() {
    let model = wall(2, 2, 10_000.0);
    let concrete = Concrete::new(
        ConcreteParameters::new(30.0, ParameterModel::MCFT, AggregateType::Quartzite),
        ConstitutiveModel::Mcft,
    );

    let linear = analyze(&model, concrete, &AnalysisSettings::linear()).unwrap();
    let nonlinear = analyze(&model, concrete, &AnalysisSettings::nonlinear().with_load_steps(5)).unwrap();

    assert!(nonlinear.stop_reason.is_none());
    assert!(nonlinear.all_converged());
    assert!(nonlinear.panels.iter().all(|p| p.crack_opening == 0.0));
    for (a, b) in nonlinear.displacements.iter().zip(&linear.displacements) {
        assert_relative_eq!(*a, *b, epsilon = 1e-6, max_relative = 1e-2);
    }
}

#[test]
fn test_cracked_panel_softer_than_linear() {
    let model = shear_panel(120_000.0);
    let concrete = Concrete::mcft(30.0);

    let linear = analyze(&model, concrete, &AnalysisSettings::linear()).unwrap();
    let settings = AnalysisSettings::nonlinear()
        .with_load_steps(20)
        .with_non_convergence(NonConvergencePolicy::Continue);
    let nonlinear = analyze(&model, concrete, &settings).unwrap();

    assert!(nonlinear.stop_reason.is_none());
    assert_eq!(nonlinear.steps.len(), 20);
    assert_relative_eq!(nonlinear.final_load_factor(), 1.0, epsilon = 1e-12);

    let panel = &nonlinear.panels[0];
    assert!(panel.crack_opening > 0.0);
    assert!(panel.principal_strains[0] > Concrete::mcft(30.0).parameters.cracking_strain());

    let sway = |output: &AnalysisOutput| {
        output.nodes.iter().find(|n| n.position == point(0.0, 500.0)).unwrap().displacement.x
    };
    assert!(sway(&nonlinear) > sway(&linear));
}

#[test]
fn test_solvers_agree() {
    let model = wall(3, 2, 60_000.0);
    let lu = analyze(&model, Concrete::mcft(30.0), &AnalysisSettings::linear()).unwrap();
    let skyline = analyze(
        &model,
        Concrete::mcft(30.0),
        &AnalysisSettings::linear().with_solver(SolverKind::Skyline),
    )
    .unwrap();

    for (a, b) in lu.displacements.iter().zip(&skyline.displacements) {
        assert_relative_eq!(*a, *b, epsilon = 1e-9, max_relative = 1e-6);
    }
}

#[test]
fn test_vanishing_load_matches_linear() {
    let model = tie(1000.0, 500.0, None);
    let concrete = Concrete::mcft(30.0);

    let linear = analyze(&model, concrete, &AnalysisSettings::linear()).unwrap();
    let nonlinear = analyze(&model, concrete, &AnalysisSettings::nonlinear().with_load_steps(10)).unwrap();

    assert!(nonlinear.stop_reason.is_none());
    assert_relative_eq!(nonlinear.displacements[4], linear.displacements[4], max_relative = 1e-3);

    // First step carries a tenth of the load
    let first = nonlinear.monitored[0];
    assert_relative_eq!(first.load_factor, 0.1, epsilon = 1e-12);
    assert_relative_eq!(first.displacement, 0.1 * linear.displacements[4], max_relative = 1e-3);
}

#[test]
fn test_converged_steps_within_tolerance() {
    let settings = AnalysisSettings::nonlinear().with_load_steps(10).with_tolerance(1e-4);
    let output = analyze(&tie(1000.0, 20_000.0, None), Concrete::mcft(30.0), &settings).unwrap();

    assert_eq!(output.steps.len(), 10);
    for report in &output.steps {
        assert!(report.converged);
        assert!(report.iterations >= settings.min_iterations);
        assert_eq!(report.history.len(), report.iterations);
        assert!(report.convergence <= 1e-4);
        assert_eq!(report.history.last().copied(), Some(report.convergence));

        // Below cracking the residual only shrinks once the minimum iterations are done
        for pair in report.history[settings.min_iterations - 1..].windows(2) {
            assert!(pair[1] <= pair[0] + 1e-12);
        }
    }
}

#[test]
fn test_cracked_tie_softer_than_linear() {
    let bars = UniaxialReinforcement::new(4, 12.0, Steel::ca50());
    let model = tie(1000.0, 120_000.0, Some(bars));
    let concrete = Concrete::mcft(30.0);

    let linear = analyze(&model, concrete, &AnalysisSettings::linear()).unwrap();
    let settings = AnalysisSettings::nonlinear().with_non_convergence(NonConvergencePolicy::Continue);
    let nonlinear = analyze(&model, concrete, &settings).unwrap();

    assert_eq!(nonlinear.steps.len(), 50);
    assert!(nonlinear.displacements[4] > 1.2 * linear.displacements[4]);
    assert!(nonlinear.stringers[0].crack_openings.iter().any(|&w| w > 0.0));
}

#[test]
fn test_stringer_and_panel_continuity() {
    let input = InputData::new(&wall(2, 1, 10_000.0), Concrete::mcft(30.0)).unwrap();

    // Bottom and top chords continue across the middle column; columns do not
    let pairs = input.stringer_continuity();
    assert_eq!(pairs.len(), 2);
    for (a, b) in pairs {
        let (sa, sb) = (&input.stringers[a - 1], &input.stringers[b - 1]);
        assert_relative_eq!(sa.angle(), sb.angle(), epsilon = 1e-12);
    }

    // The shared vertical edge links one grip of each panel
    let shared = input.panel_continuity();
    assert_eq!(shared.len(), 4);
    assert!(shared.iter().any(|&(panel, _)| panel == 1));
    assert!(shared.iter().any(|&(panel, _)| panel == 2));

    // Chords and columns meet at right angles
    let chord = &input.stringers[0];
    let column = input
        .stringers
        .iter()
        .find(|s| s.grips[0] == chord.grips[0] && s.number != chord.number)
        .unwrap();
    assert!(!chord.is_continued_by(column));
}

#[test]
fn test_isolated_panel_has_no_continuity() {
    let input = InputData::new(&wall(1, 1, 10_000.0), Concrete::mcft(30.0)).unwrap();
    assert!(input.panel_continuity().is_empty());
    assert!(input.stringer_continuity().is_empty());
}

#[test]
fn test_nonconvergent_run_reports_step() {
    let settings = AnalysisSettings::nonlinear()
        .with_tolerance(1e-12)
        .with_max_iter(1)
        .with_non_convergence(NonConvergencePolicy::Abort);

    let result = analyze(&tie(1000.0, 1000.0, None), Concrete::mcft(30.0), &settings);
    match result {
        Err(SpmError::NonConvergence { step, iterations, .. }) => {
            assert_eq!(step, 1);
            assert_eq!(iterations, 1);
        }
        other => panic!("expected non-convergence, got {:?}", other.map(|o| o.message)),
    }
}

#[test]
fn test_unsupported_model_is_singular() {
    // Nothing restrains the tie along its axis
    let mut builder = ModelBuilder::new();
    builder
        .add_stringer(point(0.0, 0.0), point(1000.0, 0.0), CrossSection::default(), None)
        .add_constraint(point(0.0, 0.0), Constraint::Y)
        .add_constraint(point(1000.0, 0.0), Constraint::Y)
        .add_force(point(1000.0, 0.0), Force::fx(1000.0));
    let model = builder.build().unwrap();

    let result = analyze(&model, Concrete::mcft(30.0), &AnalysisSettings::linear());
    assert!(matches!(result, Err(SpmError::SingularMatrix { step: 0, .. })));
}

#[test]
fn test_strict_internal_dofs_reported() {
    let settings = AnalysisSettings::linear().strict_internal_dofs();
    let result = analyze(&tie(1000.0, 1000.0, None), Concrete::mcft(30.0), &settings);

    match result {
        Err(SpmError::SingularMatrix { detail, .. }) => assert!(detail.contains("node 2")),
        other => panic!("expected singular matrix, got {:?}", other.map(|o| o.message)),
    }
}

#[test]
fn test_cancelled_analysis() {
    let token = CancellationToken::new();
    let settings = AnalysisSettings::nonlinear().with_cancellation(token.clone());
    token.cancel();

    let result = analyze(&wall(1, 1, 10_000.0), Concrete::mcft(30.0), &settings);
    assert!(matches!(result, Err(SpmError::Cancelled { step: 1, iteration: 1 })));
}

#[test]
fn test_simulation_stops_at_crushing() {
    let mut builder = ModelBuilder::new();
    builder
        .add_stringer(point(0.0, 0.0), point(0.0, 1000.0), CrossSection::rectangular(150.0, 150.0), None)
        .add_constraint(point(0.0, 0.0), Constraint::XY)
        .add_constraint(point(0.0, 1000.0), Constraint::X)
        .add_force(point(0.0, 1000.0), Force::fy(-1_000_000.0));
    let model = builder.build().unwrap();

    let settings = AnalysisSettings::simulation()
        .with_load_steps(20)
        .with_non_convergence(NonConvergencePolicy::Continue);
    let output = analyze(&model, Concrete::mcft(30.0), &settings).unwrap();

    assert!(matches!(
        output.stop_reason,
        Some(StopReason::Failure { mode: FailureMode::ConcreteCrushing, .. })
    ));
    assert_eq!(output.analysis_type, AnalysisType::Simulation);
    assert!(output.final_load_factor() < 1.0);
    assert_eq!(output.stringers[0].failure, Some(FailureMode::ConcreteCrushing));
    assert!(output.message.unwrap().contains("concrete crushing"));
}

#[test]
fn test_model_json_round_trip_analyses_identically() {
    let model = wall(1, 2, 30_000.0);
    let restored = SpmModel::from_json(&model.to_json().unwrap()).unwrap();

    let a = analyze(&model, Concrete::mcft(30.0), &AnalysisSettings::linear()).unwrap();
    let b = analyze(&restored, Concrete::mcft(30.0), &AnalysisSettings::linear()).unwrap();
    assert_eq!(a.displacements, b.displacements);
}
