//! Incremental secant-stiffness solution
//!
//! The load is applied in equal increments. Each increment is equilibrated
//! by iterating `u += K⁻¹ (Fs - Fi)` until
//! `Σ Fr² / (1 + Σ Fs²)` drops below the tolerance, where `Fs` is the
//! applied load of the step and `Fi` the internal forces of the trial
//! element states.

use log::{debug, info, warn};
use thiserror::Error;

use super::{AnalysisSettings, AnalysisType, NonConvergencePolicy, StiffnessUpdate, StopCondition};
use crate::assembly::{internal_forces, GlobalSystem, UnsupportedDof};
use crate::elements::Behavior;
use crate::error::{InputError, SpmError, SpmResult};
use crate::input::InputData;
use crate::math::{Factorization, FactorizationError, Vec as SpmVec};
use crate::results::{AnalysisOutput, LoadStepReport, MonitoredPoint, StopReason};

/// Why the secant system could not be prepared
#[derive(Error, Debug)]
enum SecantError {
    #[error(transparent)]
    Unsupported(#[from] UnsupportedDof),
    #[error(transparent)]
    Singular(#[from] FactorizationError),
}

/// Assembled, simplified and factorized secant system
struct SecantSystem {
    system: GlobalSystem,
    factorization: Factorization,
    locked: Vec<usize>,
}

impl SecantSystem {
    fn new(input: &InputData, forces: &SpmVec, settings: &AnalysisSettings) -> Result<Self, SecantError> {
        let system = GlobalSystem::new(input, forces, settings.fix_unsupported_internal_dofs)?;
        let factorization = Factorization::new(&system.stiffness, settings.solver)?;

        let mut locked: Vec<usize> = input.constraints.iter().chain(&system.fixed_dofs).copied().collect();
        locked.sort_unstable();

        Ok(Self {
            system,
            factorization,
            locked,
        })
    }

    fn solve(&self, rhs: &SpmVec) -> Option<SpmVec> {
        self.factorization.solve(rhs)
    }
}

fn singular(step: usize, iteration: usize, detail: impl ToString) -> SpmError {
    SpmError::SingularMatrix {
        step,
        iteration,
        detail: detail.to_string(),
    }
}

/// DOF with the largest applied force
fn largest_force_dof(forces: &SpmVec) -> usize {
    forces.iamax()
}

/// Trace the load path with secant stiffness until the stop condition is met
pub fn solve_nonlinear(input: &mut InputData, settings: &AnalysisSettings) -> SpmResult<AnalysisOutput> {
    input.reset(Behavior::Nonlinear);

    let num_dofs = input.num_dofs();
    let monitored_dof = match settings.monitored_dof {
        Some(dof) if dof >= num_dofs => return Err(InputError::InvalidDof { dof, count: num_dofs }.into()),
        Some(dof) => dof,
        None => largest_force_dof(&input.forces),
    };

    let increments = settings.load_steps.max(1);
    let stop_condition = settings.effective_stop_condition();
    let last_step = match stop_condition {
        StopCondition::AfterLoadSteps(steps) => steps,
        StopCondition::AtFailure { max_steps } => max_steps,
    };

    let total = &input.forces * settings.load_factor;
    let mut secant = SecantSystem::new(input, &total, settings).map_err(|e| singular(0, 0, e))?;

    info!(
        "Nonlinear analysis: {} DOFs, {} increments, stop {:?}, monitoring DOF {}",
        num_dofs, increments, stop_condition, monitored_dof
    );

    let mut u = secant
        .solve(&(&secant.system.forces / increments as f64))
        .ok_or_else(|| singular(0, 0, "initial solution is not finite"))?;
    let mut u_converged = SpmVec::zeros(num_dofs);

    let mut monitored = Vec::new();
    let mut reports = Vec::new();
    let mut stop_reason = None;

    for step in 1..=last_step {
        let load_factor = step as f64 / increments as f64;
        let applied = &secant.system.forces * load_factor;
        let applied_norm = applied.norm_squared();

        let mut history = Vec::new();
        let mut convergence = f64::INFINITY;
        let mut converged = false;
        let mut iteration = 0;

        while iteration < settings.max_iterations {
            iteration += 1;

            if settings.cancellation.is_cancelled() {
                warn!("Analysis cancelled at step {}, iteration {}", step, iteration);
                return Err(SpmError::Cancelled { step, iteration });
            }

            input.update_elements(&u);

            let residual = &applied - internal_forces(input, Some(&secant.locked));
            convergence = residual.norm_squared() / (1.0 + applied_norm);
            history.push(convergence);
            debug!("Step {} iteration {}: convergence {:.3e}", step, iteration, convergence);

            if convergence <= settings.tolerance && iteration >= settings.min_iterations {
                converged = true;
                break;
            }

            if settings.stiffness_update == StiffnessUpdate::PerIteration && iteration > 1 {
                secant = SecantSystem::new(input, &total, settings).map_err(|e| singular(step, iteration, e))?;
            }

            let du = secant
                .solve(&residual)
                .ok_or_else(|| singular(step, iteration, "correction is not finite"))?;
            u += du;
        }

        reports.push(LoadStepReport {
            step,
            load_factor,
            iterations: iteration,
            convergence,
            converged,
            history,
        });

        if !converged {
            warn!(
                "Step {} did not converge after {} iterations (convergence {:.3e})",
                step, iteration, convergence
            );

            match settings.non_convergence {
                NonConvergencePolicy::Abort => {
                    return Err(SpmError::NonConvergence {
                        step,
                        iterations: iteration,
                        convergence,
                    })
                }
                NonConvergencePolicy::Stop => {
                    u.copy_from(&u_converged);
                    input.update_elements(&u);
                    stop_reason = Some(StopReason::NonConvergence {
                        step,
                        iterations: iteration,
                        convergence,
                    });
                    break;
                }
                NonConvergencePolicy::Continue => {}
            }
        } else {
            debug!("Step {} converged in {} iterations", step, iteration);
        }

        input.commit_elements();
        monitored.push(MonitoredPoint {
            displacement: u[monitored_dof],
            load_factor,
        });
        u_converged.copy_from(&u);

        if let Some((element, mode)) = input.first_failure() {
            info!("{} failed by {} at step {} (load factor {:.3})", element, mode, step, load_factor);
            stop_reason = Some(StopReason::Failure {
                step,
                load_factor,
                element,
                mode,
            });
            break;
        }

        if step == last_step {
            if let StopCondition::AtFailure { max_steps } = stop_condition {
                warn!("No failure after {} load steps", max_steps);
                stop_reason = Some(StopReason::StepLimit { steps: max_steps });
            }
            break;
        }

        secant = match SecantSystem::new(input, &total, settings) {
            Ok(secant) => secant,
            Err(err) => match stop_condition {
                StopCondition::AtFailure { .. } => {
                    warn!("Stiffness singular after step {}: {}", step, err);
                    stop_reason = Some(StopReason::SingularStiffness {
                        step,
                        detail: err.to_string(),
                    });
                    break;
                }
                StopCondition::AfterLoadSteps(_) => return Err(singular(step, 0, err)),
            },
        };
    }

    let forces = internal_forces(input, None);
    let mut reactions = SpmVec::zeros(num_dofs);
    for &dof in &input.constraints {
        reactions[dof] = forces[dof];
    }
    input.set_nodal_results(&u, &reactions);

    info!(
        "Nonlinear analysis finished after {} steps, final load factor {:.3}",
        reports.len(),
        monitored.last().map_or(0.0, |p: &MonitoredPoint| p.load_factor)
    );

    let analysis_type = match settings.analysis_type {
        AnalysisType::Simulation => AnalysisType::Simulation,
        AnalysisType::Linear | AnalysisType::Nonlinear => AnalysisType::Nonlinear,
    };
    let mut output = AnalysisOutput::from_input(analysis_type, input, &u, &forces);
    output.fixed_dofs = secant.system.fixed_dofs.clone();
    output.monitored_dof = Some(monitored_dof);
    output.monitored = monitored;
    output.steps = reports;
    Ok(output.with_stop_reason(stop_reason))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{solve_linear, CancellationToken};
    use crate::elements::{Constraint, CrossSection, Point};
    use crate::loads::Force;
    use crate::material::Concrete;
    use crate::model::ModelBuilder;
    use approx::assert_relative_eq;

    /// Horizontal stringer fixed at the left end, pulled at the right end
    fn tie(force: f64) -> InputData {
        let mut builder = ModelBuilder::new();
        builder
            .add_stringer(Point::new(0.0, 0.0), Point::new(1000.0, 0.0), CrossSection::rectangular(150.0, 150.0), None)
            .add_constraint(Point::new(0.0, 0.0), Constraint::XY)
            .add_constraint(Point::new(1000.0, 0.0), Constraint::Y)
            .add_force(Point::new(1000.0, 0.0), Force::fx(force));
        InputData::new(&builder.build().unwrap(), Concrete::mcft(30.0)).unwrap()
    }

    #[test]
    fn test_small_load_matches_linear() {
        let mut input = tie(1000.0);
        let linear = solve_linear(&mut input, &AnalysisSettings::linear()).unwrap();
        let nonlinear = solve_nonlinear(&mut input, &AnalysisSettings::nonlinear().with_load_steps(5)).unwrap();

        assert!(nonlinear.stop_reason.is_none());
        assert!(nonlinear.all_converged());
        assert_eq!(nonlinear.steps.len(), 5);
        assert_relative_eq!(nonlinear.displacements[4], linear.displacements[4], max_relative = 1e-3);
        assert_relative_eq!(nonlinear.final_load_factor(), 1.0);
    }

    #[test]
    fn test_monitored_dof_defaults_to_largest_force() {
        let mut input = tie(1000.0);
        let output = solve_nonlinear(&mut input, &AnalysisSettings::nonlinear().with_load_steps(4)).unwrap();

        assert_eq!(output.monitored_dof, Some(4));
        assert_eq!(output.monitored.len(), 4);
        assert!(output
            .monitored
            .windows(2)
            .all(|w| w[1].displacement > w[0].displacement && w[1].load_factor > w[0].load_factor));
    }

    #[test]
    fn test_invalid_monitored_dof() {
        let mut input = tie(1000.0);
        let result = solve_nonlinear(&mut input, &AnalysisSettings::nonlinear().with_monitored_dof(6));
        assert!(matches!(result, Err(SpmError::Input(InputError::InvalidDof { dof: 6, count: 6 }))));
    }

    #[test]
    fn test_stop_after_fewer_steps() {
        let mut input = tie(1000.0);
        let settings = AnalysisSettings::nonlinear()
            .with_load_steps(10)
            .with_stop_condition(StopCondition::AfterLoadSteps(3));
        let output = solve_nonlinear(&mut input, &settings).unwrap();

        assert_eq!(output.steps.len(), 3);
        assert_relative_eq!(output.final_load_factor(), 0.3, epsilon = 1e-12);
    }

    #[test]
    fn test_step_limit_without_failure() {
        let mut input = tie(1000.0);
        let settings = AnalysisSettings::simulation()
            .with_load_steps(10)
            .with_stop_condition(StopCondition::AtFailure { max_steps: 4 });
        let output = solve_nonlinear(&mut input, &settings).unwrap();

        assert_eq!(output.stop_reason, Some(StopReason::StepLimit { steps: 4 }));
        assert!(output.message.is_some());
        assert_eq!(output.analysis_type, AnalysisType::Simulation);
    }

    #[test]
    fn test_non_convergence_policies() {
        let settings = AnalysisSettings::nonlinear().with_max_iter(1).with_min_iter(2);

        let mut input = tie(1000.0);
        let stopped = solve_nonlinear(&mut input, &settings).unwrap();
        assert!(matches!(
            stopped.stop_reason,
            Some(StopReason::NonConvergence { step: 1, iterations: 1, .. })
        ));
        assert!(stopped.monitored.is_empty());
        assert!(stopped.displacements.iter().all(|&d| d == 0.0));

        let mut input = tie(1000.0);
        let aborted = solve_nonlinear(&mut input, &settings.clone().with_non_convergence(NonConvergencePolicy::Abort));
        assert!(matches!(aborted, Err(SpmError::NonConvergence { step: 1, iterations: 1, .. })));

        let mut input = tie(1000.0);
        let continued = solve_nonlinear(
            &mut input,
            &settings.with_load_steps(3).with_non_convergence(NonConvergencePolicy::Continue),
        )
        .unwrap();
        assert_eq!(continued.steps.len(), 3);
        assert!(!continued.all_converged());
        assert!(continued.stop_reason.is_none());
    }

    #[test]
    fn test_cancelled_before_first_iteration() {
        let token = CancellationToken::new();
        token.cancel();

        let mut input = tie(1000.0);
        let result = solve_nonlinear(&mut input, &AnalysisSettings::nonlinear().with_cancellation(token));
        assert!(matches!(result, Err(SpmError::Cancelled { step: 1, iteration: 1 })));
    }

    #[test]
    fn test_per_iteration_update_converges() {
        let mut input = tie(1000.0);
        let settings = AnalysisSettings::nonlinear()
            .with_load_steps(2)
            .with_stiffness_update(StiffnessUpdate::PerIteration);
        let output = solve_nonlinear(&mut input, &settings).unwrap();

        assert!(output.all_converged());
        assert_relative_eq!(output.node(1).unwrap().reaction.x, -1000.0, max_relative = 1e-2);
    }
}
