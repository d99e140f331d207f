//! SPM Solver Example - Two-storey shear wall

use spm_solver::prelude::*;

fn main() {
    env_logger::init();

    println!("=== SPM Solver Example: Shear Wall ===\n");

    //  (0,2000) ---- (1000,2000)  <- F
    //     |   Panel 2   |
    //  (0,1000) ---- (1000,1000)
    //     |   Panel 1   |
    //  (0,0) ------- (1000,0)
    //     ^             ^
    //   Fixed         Fixed
    let (width, storey) = (1000.0, 1000.0);
    let section = CrossSection::rectangular(100.0, 200.0);
    let bars = UniaxialReinforcement::new(2, 10.0, Steel::ca50());
    let web = WebReinforcement::orthogonal(WebDirection::new(8.0, 150.0, Steel::ca50()));

    let mut builder = ModelBuilder::new();
    for level in 0..3 {
        let y = level as f64 * storey;
        builder.add_stringer(Point::new(0.0, y), Point::new(width, y), section, Some(bars));
    }
    for level in 0..2 {
        let (y0, y1) = (level as f64 * storey, (level + 1) as f64 * storey);
        builder
            .add_stringer(Point::new(0.0, y0), Point::new(0.0, y1), section, Some(bars))
            .add_stringer(Point::new(width, y0), Point::new(width, y1), section, Some(bars))
            .add_panel(
                [
                    Point::new(0.0, y0),
                    Point::new(width, y0),
                    Point::new(width, y1),
                    Point::new(0.0, y1),
                ],
                100.0,
                web,
            );
    }
    builder
        .add_constraint(Point::new(0.0, 0.0), Constraint::XY)
        .add_constraint(Point::new(width, 0.0), Constraint::XY)
        .add_force(Point::new(0.0, 2.0 * storey), Force::fx(100_000.0));

    let model = builder.build().expect("Failed to build model");
    let concrete = Concrete::mcft(30.0);

    println!(
        "Model: {} nodes, {} stringers, {} panels\n",
        model.num_nodes(),
        model.stringers.len(),
        model.panels.len()
    );

    // Linear analysis
    println!("Running linear analysis...\n");
    let linear = analyze(&model, concrete, &AnalysisSettings::linear()).expect("Linear analysis failed");

    println!("Node Displacements:");
    for node in &linear.nodes {
        if node.kind == NodeKind::External {
            println!(
                "  {:>2}: DX={:.4}mm, DY={:.4}mm",
                node.number, node.displacement.x, node.displacement.y
            );
        }
    }

    println!("Max displacement: {:.4}mm", linear.max_displacement());

    println!("\nSupport Reactions:");
    for node in linear.nodes.iter().filter(|n| n.reaction.magnitude() > 0.0) {
        println!(
            "  {:>2}: FX={:.2}kN, FY={:.2}kN",
            node.number,
            node.reaction.x / 1000.0,
            node.reaction.y / 1000.0
        );
    }

    println!("\nStringer Forces:");
    for s in &linear.stringers {
        println!("  Stringer {}: N={:.2}kN", s.number, s.max_normal_force() / 1000.0);
    }

    println!("\nPanel Shear Stresses:");
    for p in &linear.panels {
        println!("  Panel {}: tau={:.3}MPa", p.number, p.shear_stress);
    }

    // Nonlinear analysis to failure
    println!("\n=== Nonlinear Simulation ===\n");
    let settings = AnalysisSettings::simulation().with_load_steps(20);
    let nonlinear = analyze(&model, concrete, &settings).expect("Nonlinear analysis failed");

    println!("Load-displacement curve (DOF {:?}):", nonlinear.monitored_dof);
    for point in &nonlinear.monitored {
        println!("  lf={:.3}  u={:.4}mm", point.load_factor, point.displacement);
    }

    if let Some(message) = &nonlinear.message {
        println!("\n{}", message);
    }
    println!("Final load factor: {:.3}", nonlinear.final_load_factor());
    println!("Max displacement: {:.4}mm", nonlinear.max_displacement());

    println!("\n=== Analysis Complete ===");
}
