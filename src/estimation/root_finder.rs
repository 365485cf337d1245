//! Damped Newton solver with a finite-difference Jacobian, and the residual
//! function that balances species volumes against the layer diameter.

use nalgebra::{DMatrix, DVector};
use tracing::debug;

use super::volume::whole_stem_volume_per_tree_f64;
use crate::coefficients::Coefficients;
use crate::config::SolverOptions;
use crate::error::StandError;
use crate::models::PI_40K;

/// Step halvings tried before a Newton step is taken as is.
const MAX_HALVINGS: usize = 10;

/// Solves `F(x) = goal` for a residual function without analytic derivatives.
#[derive(Debug, Clone)]
pub struct NewtonSolver {
    options: SolverOptions,
}

impl NewtonSolver {
    pub fn new(options: SolverOptions) -> Self {
        Self { options }
    }

    fn residual<F>(f: &mut F, x: &DVector<f64>, goal: &DVector<f64>) -> Result<DVector<f64>, StandError>
    where
        F: FnMut(&DVector<f64>) -> Result<DVector<f64>, StandError>,
    {
        Ok(f(x)? - goal)
    }

    fn jacobian<F>(&self, f: &mut F, x: &DVector<f64>, fx: &DVector<f64>) -> Result<DMatrix<f64>, StandError>
    where
        F: FnMut(&DVector<f64>) -> Result<DVector<f64>, StandError>,
    {
        let n = x.len();
        let mut jacobian = DMatrix::zeros(fx.len(), n);
        for j in 0..n {
            let h = self.options.step * x[j].abs().max(1.0);
            let mut forward = x.clone();
            forward[j] += h;
            let column = if self.options.symmetric {
                let mut backward = x.clone();
                backward[j] -= h;
                (f(&forward)? - f(&backward)?) / (2.0 * h)
            } else {
                (f(&forward)? - fx) / h
            };
            jacobian.set_column(j, &column);
        }
        Ok(jacobian)
    }

    /// Iterate from `x0` until the residual norm drops below the tolerance.
    pub fn solve<F>(
        &self,
        x0: DVector<f64>,
        goal: &DVector<f64>,
        mut f: F,
    ) -> Result<DVector<f64>, StandError>
    where
        F: FnMut(&DVector<f64>) -> Result<DVector<f64>, StandError>,
    {
        let mut x = x0;
        let mut residual = Self::residual(&mut f, &x, goal)?;

        for iteration in 0..self.options.max_iterations {
            let norm = residual.norm();
            if norm < self.options.tolerance {
                debug!(iteration, norm, "Newton solver converged");
                return Ok(x);
            }

            let fx = &residual + goal;
            let jacobian = self.jacobian(&mut f, &x, &fx)?;
            let step = jacobian.lu().solve(&(-&residual)).ok_or_else(|| {
                StandError::ProcessingFailure("singular Jacobian in root finder".to_string())
            })?;

            let mut scale = 1.0;
            let mut accepted = None;
            for _ in 0..MAX_HALVINGS {
                let candidate = &x + &step * scale;
                if let Ok(r) = Self::residual(&mut f, &candidate, goal) {
                    if r.norm() < norm {
                        accepted = Some((candidate, r));
                        break;
                    }
                }
                scale /= 2.0;
            }
            let (next, next_residual) = match accepted {
                Some(found) => found,
                None => {
                    let candidate = &x + &step * scale;
                    let r = Self::residual(&mut f, &candidate, goal)?;
                    (candidate, r)
                }
            };
            x = next;
            residual = next_residual;
        }

        if residual.norm() < self.options.tolerance {
            return Ok(x);
        }
        Err(StandError::ProcessingFailure(format!(
            "root finder did not converge in {} iterations (residual {})",
            self.options.max_iterations,
            residual.norm()
        )))
    }
}

/// A species as seen by [`StandRootFunction`].
#[derive(Debug, Clone, Copy)]
pub struct RootSpecies {
    /// Diameter before the common shift is applied
    pub base_dq: f32,
    pub lorey_height: f32,
    pub volume_coefficients: Coefficients<9>,
}

/// Per-species values at a point of [`StandRootFunction`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeciesComponents {
    pub percent: f64,
    pub basal_area: f64,
    pub quad_mean_diameter: f64,
    pub trees_per_hectare: f64,
    pub whole_stem_volume: f64,
}

/// Maps basal-area percents and a shared diameter shift to volume shares and
/// the layer diameter.
///
/// A point holds the basal-area percents of every species but the last (which
/// takes the remainder), followed by the diameter shift. The output holds the
/// whole-stem volume percents of the same species, followed by the layer
/// diameter implied by the total trees per hectare.
#[derive(Debug, Clone)]
pub struct StandRootFunction<'a> {
    layer_basal_area: f64,
    species: &'a [RootSpecies],
}

impl<'a> StandRootFunction<'a> {
    pub fn new(layer_basal_area: f32, species: &'a [RootSpecies]) -> Self {
        Self {
            layer_basal_area: f64::from(layer_basal_area),
            species,
        }
    }

    /// The starting point: input percents and no diameter shift.
    pub fn initial_point(percents: &[f32]) -> DVector<f64> {
        let n = percents.len();
        DVector::from_iterator(
            n,
            percents
                .iter()
                .take(n.saturating_sub(1))
                .map(|p| f64::from(*p))
                .chain(std::iter::once(0.0)),
        )
    }

    /// The target: input percents and the layer diameter.
    pub fn goal(percents: &[f32], layer_dq: f32) -> DVector<f64> {
        let n = percents.len();
        DVector::from_iterator(
            n,
            percents
                .iter()
                .take(n.saturating_sub(1))
                .map(|p| f64::from(*p))
                .chain(std::iter::once(f64::from(layer_dq))),
        )
    }

    pub fn components(&self, x: &DVector<f64>) -> Result<Vec<SpeciesComponents>, StandError> {
        let n = self.species.len();
        if x.len() != n || n < 2 {
            return Err(StandError::IllegalArgument(format!(
                "root function over {n} species evaluated at a point of size {}",
                x.len()
            )));
        }
        let shift = (x[n - 1] / 20.0).exp();
        let assigned: f64 = x.rows(0, n - 1).sum();
        let pi_40k = f64::from(PI_40K);

        self.species
            .iter()
            .enumerate()
            .map(|(j, sp)| {
                let percent = if j < n - 1 { x[j] } else { 100.0 - assigned };
                let dq = 7.5 + (f64::from(sp.base_dq) - 7.5) * shift;
                let basal_area = self.layer_basal_area * percent / 100.0;
                let tph = basal_area / (pi_40k * dq * dq);
                let per_tree = whole_stem_volume_per_tree_f64(
                    &sp.volume_coefficients,
                    f64::from(sp.lorey_height),
                    dq,
                );
                Ok(SpeciesComponents {
                    percent,
                    basal_area,
                    quad_mean_diameter: dq,
                    trees_per_hectare: tph,
                    whole_stem_volume: tph * per_tree,
                })
            })
            .collect()
    }

    pub fn evaluate(&self, x: &DVector<f64>) -> Result<DVector<f64>, StandError> {
        let components = self.components(x)?;
        let n = components.len();
        let total_volume: f64 = components.iter().map(|c| c.whole_stem_volume).sum();
        let total_tph: f64 = components.iter().map(|c| c.trees_per_hectare).sum();
        if !(total_volume > 0.0) || !(total_tph > 0.0) {
            return Err(StandError::ProcessingFailure(format!(
                "root function left no volume ({total_volume}) or trees ({total_tph})"
            )));
        }
        let layer_dq = (self.layer_basal_area / total_tph / f64::from(PI_40K)).sqrt();
        Ok(DVector::from_iterator(
            n,
            components
                .iter()
                .take(n - 1)
                .map(|c| 100.0 * c.whole_stem_volume / total_volume)
                .chain(std::iter::once(layer_dq)),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solver() -> NewtonSolver {
        NewtonSolver::new(SolverOptions::default())
    }

    #[test]
    fn test_solves_linear_system() {
        // x + y = 3, x - y = 1
        let goal = DVector::from_vec(vec![3.0, 1.0]);
        let x = solver()
            .solve(DVector::from_vec(vec![0.0, 0.0]), &goal, |x| {
                Ok(DVector::from_vec(vec![x[0] + x[1], x[0] - x[1]]))
            })
            .unwrap();
        assert!((x[0] - 2.0).abs() < 1e-6);
        assert!((x[1] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_solves_nonlinear_with_forward_differences() {
        let options = SolverOptions {
            symmetric: false,
            tolerance: 1e-8,
            ..SolverOptions::default()
        };
        let goal = DVector::from_vec(vec![2.0]);
        let x = NewtonSolver::new(options)
            .solve(DVector::from_vec(vec![1.0]), &goal, |x| {
                Ok(DVector::from_vec(vec![x[0] * x[0]]))
            })
            .unwrap();
        assert!((x[0] - std::f64::consts::SQRT_2).abs() < 1e-6);
    }

    #[test]
    fn test_singular_jacobian() {
        let goal = DVector::from_vec(vec![1.0, 2.0]);
        let result = solver().solve(DVector::from_vec(vec![0.0, 0.0]), &goal, |x| {
            let s = x[0] + x[1];
            Ok(DVector::from_vec(vec![s, s]))
        });
        assert!(matches!(result, Err(StandError::ProcessingFailure(_))));
    }

    #[test]
    fn test_iteration_cap() {
        let options = SolverOptions {
            max_iterations: 1,
            tolerance: 1e-12,
            ..SolverOptions::default()
        };
        let goal = DVector::from_vec(vec![0.0]);
        let result = NewtonSolver::new(options).solve(DVector::from_vec(vec![5.0]), &goal, |x| {
            Ok(DVector::from_vec(vec![x[0].atan()]))
        });
        assert!(result.is_err());
    }

    fn five_species() -> Vec<RootSpecies> {
        let coe = Coefficients::new([-9.5, 1.9, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        [(31.70, 20.0), (26.45, 25.0), (33.97, 30.0), (21.43, 22.0), (34.46, 28.0)]
            .into_iter()
            .map(|(base_dq, lorey_height)| RootSpecies {
                base_dq,
                lorey_height,
                volume_coefficients: coe,
            })
            .collect()
    }

    #[test]
    fn test_stand_root_function_fixed_point() {
        let species = five_species();
        let percents = [1.0, 7.0, 74.0, 9.0, 9.0];
        let function = StandRootFunction::new(44.6249847, &species);
        let goal = StandRootFunction::goal(&percents, 30.2601795);
        let x0 = StandRootFunction::initial_point(&percents);
        assert_eq!(x0.as_slice(), &[1.0, 7.0, 74.0, 9.0, 0.0]);

        let solution = solver()
            .solve(x0, &goal, |x| function.evaluate(x))
            .unwrap();
        let reached = function.evaluate(&solution).unwrap();
        assert!((reached - &goal).norm() < 2.0e-3);

        let components = function.components(&solution).unwrap();
        let basal_area: f64 = components.iter().map(|c| c.basal_area).sum();
        assert!((basal_area - 44.6249847).abs() < 1e-6);
        let tph: f64 = components.iter().map(|c| c.trees_per_hectare).sum();
        assert!((tph - 620.504883).abs() < 1.0);
    }

    #[test]
    fn test_root_function_rejects_wrong_size() {
        let species = five_species();
        let function = StandRootFunction::new(40.0, &species);
        assert!(matches!(
            function.evaluate(&DVector::from_vec(vec![1.0, 2.0])),
            Err(StandError::IllegalArgument(_))
        ));
    }
}
