//! Design variables describing the L-unit cross-section and their bounds.

use nalgebra::SVector;
use serde::{Deserialize, Serialize};

/// Number of design variables seen by the solver.
pub const VARIABLE_COUNT: usize = 6;

/// Six dimensions of an L-shaped retaining unit, all in metres.
///
/// The slice and vector order used by the solver is `[bw, bt, uh, ut, dc, l]`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DesignVariables {
    /// Base width, toe to heel.
    pub bw: f64,
    /// Base thickness.
    pub bt: f64,
    /// Upstand height above the base.
    pub uh: f64,
    /// Upstand thickness.
    pub ut: f64,
    /// Chamfer diameter.
    pub dc: f64,
    /// Unit length along the wall.
    pub l: f64,
}

impl DesignVariables {
    /// Create a [`DesignVariables`] with explicit dimensions.
    #[must_use]
    pub const fn new(bw: f64, bt: f64, uh: f64, ut: f64, dc: f64, l: f64) -> Self {
        Self {
            bw,
            bt,
            uh,
            ut,
            dc,
            l,
        }
    }

    /// Read variables from a solver slice in `[bw, bt, uh, ut, dc, l]` order.
    ///
    /// Returns `None` when the slice does not hold exactly six values.
    #[must_use]
    pub fn from_slice(values: &[f64]) -> Option<Self> {
        if values.len() != VARIABLE_COUNT {
            return None;
        }
        Some(SVector::<f64, VARIABLE_COUNT>::from_column_slice(values).into())
    }

    /// Convert the variables into an algebraic vector.
    #[must_use]
    pub fn to_vector(self) -> SVector<f64, VARIABLE_COUNT> {
        SVector::<f64, VARIABLE_COUNT>::new(self.bw, self.bt, self.uh, self.ut, self.dc, self.l)
    }

    /// Total height of the unit, base plus upstand.
    #[must_use]
    pub fn height(&self) -> f64 {
        self.bt + self.uh
    }

    /// Clear width of the heel behind the upstand.
    #[must_use]
    pub fn heel_width(&self) -> f64 {
        self.bw - self.ut
    }

    /// Whether every dimension is a finite number.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.to_vector().iter().all(|value| value.is_finite())
    }

    /// Named `(label, value)` pairs in solver order, used for parameter tables.
    #[must_use]
    pub fn labelled(&self) -> [(&'static str, f64); VARIABLE_COUNT] {
        [
            ("Base Width", self.bw),
            ("Base Thickness", self.bt),
            ("Upstand Height", self.uh),
            ("Upstand Thickness", self.ut),
            ("Chamfer Width", self.dc),
            ("Length", self.l),
        ]
    }
}

impl From<SVector<f64, VARIABLE_COUNT>> for DesignVariables {
    fn from(value: SVector<f64, VARIABLE_COUNT>) -> Self {
        Self::new(value[0], value[1], value[2], value[3], value[4], value[5])
    }
}

impl From<DesignVariables> for SVector<f64, VARIABLE_COUNT> {
    fn from(value: DesignVariables) -> Self {
        value.to_vector()
    }
}

/// Lower and upper limits for each design variable.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct VariableBounds {
    /// Smallest admissible value of each variable.
    pub lower: DesignVariables,
    /// Largest admissible value of each variable.
    pub upper: DesignVariables,
}

impl Default for VariableBounds {
    fn default() -> Self {
        Self {
            lower: DesignVariables::new(1.0, 0.3, 0.5, 0.3, 0.05, 0.5),
            upper: DesignVariables::new(10.0, 0.75, 5.0, 0.5, 0.2, 10.0),
        }
    }
}

impl VariableBounds {
    /// Bounds as `(lower, upper)` pairs in solver order.
    #[must_use]
    pub fn pairs(&self) -> Vec<(f64, f64)> {
        self.lower
            .to_vector()
            .iter()
            .zip(self.upper.to_vector().iter())
            .map(|(&lower, &upper)| (lower, upper))
            .collect()
    }

    /// Largest distance by which `variables` lie outside the bounds, zero when inside.
    #[must_use]
    pub fn violation(&self, variables: &DesignVariables) -> f64 {
        let value = variables.to_vector();
        let below = self.lower.to_vector() - value;
        let above = value - self.upper.to_vector();
        below
            .iter()
            .chain(above.iter())
            .fold(0.0_f64, |worst, &excess| worst.max(excess))
    }
}

/// Starting point handed to the solver.
///
/// # Examples
/// ```
/// use lunitx::initial_guess;
///
/// let start = initial_guess();
/// assert_eq!(start.l, 2.0);
/// ```
#[must_use]
pub const fn initial_guess() -> DesignVariables {
    DesignVariables::new(1.0, 0.3, 0.5, 0.3, 0.1, 2.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vector_roundtrip_keeps_solver_order() {
        let variables = DesignVariables::new(1.0, 2.0, 3.0, 4.0, 5.0, 6.0);
        let vector: SVector<f64, VARIABLE_COUNT> = variables.into();
        assert_eq!(vector[2], 3.0);
        assert_eq!(DesignVariables::from(vector), variables);
        assert_eq!(
            DesignVariables::from_slice(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]),
            Some(variables)
        );
        assert_eq!(DesignVariables::from_slice(&[1.0, 2.0]), None);
    }

    #[test]
    fn bounds_report_worst_violation() {
        let bounds = VariableBounds::default();
        assert_eq!(bounds.violation(&initial_guess()), 0.0);

        let outside = DesignVariables::new(12.0, 0.1, 0.5, 0.3, 0.05, 0.5);
        assert!((bounds.violation(&outside) - 2.0).abs() < 1.0e-12);
        assert_eq!(bounds.pairs()[1], (0.3, 0.75));
    }

    #[test]
    fn derived_dimensions() {
        let variables = DesignVariables::new(2.0, 0.3, 1.7, 0.3, 0.05, 2.0);
        assert!((variables.height() - 2.0).abs() < 1.0e-12);
        assert!((variables.heel_width() - 1.7).abs() < 1.0e-12);
        assert!(variables.is_finite());
        assert!(!DesignVariables::new(f64::NAN, 0.3, 1.7, 0.3, 0.05, 2.0).is_finite());
    }
}
