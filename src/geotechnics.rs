//! Closed-form stability model for an L-shaped gravity retaining unit.
//!
//! Every function here is pure arithmetic. Invalid geometry is not rejected; NaN and
//! infinities flow through to the caller, which is expected to validate inputs and
//! check the returned values.
//!
//! Sign convention: moments are taken about the toe, the front edge of the base.
//! Lateral earth pressure uses the coefficient `k_s = 1 - sin(phi)` described at
//! <https://en.wikipedia.org/wiki/Lateral_earth_pressure#At-rest_pressure>.

use serde::Serialize;

use crate::geometry::DesignVariables;
use crate::inputs::DesignInputs;

/// Soil horizontal coefficient for a friction angle given in degrees.
///
/// # Examples
/// ```
/// use lunitx::geotechnics::soil_coefficient;
///
/// let k_s = soil_coefficient(20.0);
/// assert!((k_s - 0.658).abs() < 1.0e-3);
/// ```
#[must_use]
pub fn soil_coefficient(phi: f64) -> f64 {
    1.0 - phi.to_radians().sin()
}

/// A load acting on the unit together with its lever arm about the toe.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LoadEntry {
    /// Description of the load source.
    pub name: &'static str,
    /// Magnitude in kN.
    pub load: f64,
    /// Lever arm about the toe in metres.
    pub lever: f64,
    /// Factor converting the load into a horizontal sliding force.
    pub friction: f64,
}

impl LoadEntry {
    /// Horizontal force contributed to the sliding check, in kN.
    #[must_use]
    pub fn sliding_force(&self) -> f64 {
        self.load * self.friction
    }

    /// Moment about the toe, in kNm.
    #[must_use]
    pub fn moment(&self) -> f64 {
        self.load * self.lever
    }
}

/// Loads split into the groups resisting and driving failure.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LoadBreakdown {
    /// Self-weight of the soil on the heel and of the concrete unit.
    pub stabilising: Vec<LoadEntry>,
    /// Retained soil, surcharge and accidental impact.
    pub destabilising: Vec<LoadEntry>,
}

impl LoadBreakdown {
    /// Ratio of driving to resisting horizontal force.
    #[must_use]
    pub fn sliding_ratio(&self) -> f64 {
        total(&self.destabilising, LoadEntry::sliding_force)
            / total(&self.stabilising, LoadEntry::sliding_force)
    }

    /// Ratio of driving to resisting moment about the toe.
    #[must_use]
    pub fn overturning_ratio(&self) -> f64 {
        total(&self.destabilising, LoadEntry::moment) / total(&self.stabilising, LoadEntry::moment)
    }
}

/// Sum one column of a load group.
fn total(entries: &[LoadEntry], column: fn(&LoadEntry) -> f64) -> f64 {
    entries.iter().map(column).sum()
}

/// Lateral thrust of the retained soil over the full height, in kN.
fn retained_soil_thrust(vars: &DesignVariables, inputs: &DesignInputs) -> f64 {
    let m = &inputs.materials;
    0.5 * vars.height().powi(2) * m.p_s * vars.l * soil_coefficient(m.phi)
}

/// Lateral thrust of the surcharge over the full height, in kN.
fn surcharge_thrust(vars: &DesignVariables, inputs: &DesignInputs) -> f64 {
    vars.l * vars.height() * inputs.q * soil_coefficient(inputs.materials.phi)
}

/// Weight of the soil column standing on the heel, in kN.
fn heel_soil_weight(vars: &DesignVariables, inputs: &DesignInputs) -> f64 {
    vars.uh * vars.heel_width() * vars.l * inputs.materials.p_s
}

/// Lever arm of the heel soil about the toe, in metres.
fn heel_soil_lever(vars: &DesignVariables) -> f64 {
    vars.ut + 0.5 * vars.heel_width()
}

/// Concrete self-weight without the chamfer allowance, in kN.
fn concrete_weight(vars: &DesignVariables, inputs: &DesignInputs) -> f64 {
    (vars.bw * vars.bt + vars.uh * vars.ut) * inputs.materials.p_c * vars.l
}

/// Restoring moment of the concrete about the toe, in kNm.
fn concrete_moment(vars: &DesignVariables, inputs: &DesignInputs) -> f64 {
    (vars.bw * vars.bt * vars.bw / 2.0 + vars.uh * vars.ut * vars.ut / 2.0)
        * inputs.materials.p_c
        * vars.l
}

/// Utilisation against overturning about the toe.
///
/// Driving moment from the impact load, retained soil and surcharge divided by the
/// restoring moment of the unit and the soil on its heel. The design satisfies the
/// check when the ratio stays below the utilisation limit.
#[must_use]
pub fn overturning_ratio(vars: &DesignVariables, inputs: &DesignInputs) -> f64 {
    let height = vars.height();
    let driving = inputs.p_a * height
        + retained_soil_thrust(vars, inputs) * height / 3.0
        + surcharge_thrust(vars, inputs) * height / 2.0;
    let restoring =
        concrete_moment(vars, inputs) + heel_soil_weight(vars, inputs) * heel_soil_lever(vars);
    driving / restoring
}

/// Utilisation against sliding along the base.
///
/// Horizontal thrust divided by the friction capacity of the vertical load.
#[must_use]
pub fn sliding_ratio(vars: &DesignVariables, inputs: &DesignInputs) -> f64 {
    let driving =
        inputs.p_a + retained_soil_thrust(vars, inputs) + surcharge_thrust(vars, inputs);
    let capacity = (concrete_weight(vars, inputs) + heel_soil_weight(vars, inputs))
        * inputs.materials.fr;
    driving / capacity
}

/// Weight of the unit in kN, including the chamfer allowance `dc²/2`.
///
/// This is the quantity the optimiser minimises.
#[must_use]
pub fn unit_weight(vars: &DesignVariables, inputs: &DesignInputs) -> f64 {
    (vars.bw * vars.bt + vars.uh * vars.ut + vars.dc.powi(2) / 2.0)
        * inputs.materials.p_c
        * vars.l
}

/// Signed difference between the unit height and the retained height.
#[must_use]
pub fn height_residual(vars: &DesignVariables, inputs: &DesignInputs) -> f64 {
    vars.height() - inputs.h
}

/// Unit height over base width.
#[must_use]
pub fn height_width_ratio(vars: &DesignVariables) -> f64 {
    vars.height() / vars.bw
}

/// Unit height over unit length.
#[must_use]
pub fn height_length_ratio(vars: &DesignVariables) -> f64 {
    vars.height() / vars.l
}

/// Itemised loads and lever arms for the stability report.
#[must_use]
pub fn load_breakdown(vars: &DesignVariables, inputs: &DesignInputs) -> LoadBreakdown {
    let fr = inputs.materials.fr;
    let height = vars.height();
    let unit = concrete_weight(vars, inputs);
    LoadBreakdown {
        stabilising: vec![
            LoadEntry {
                name: "Soil Selfweight on Heel",
                load: heel_soil_weight(vars, inputs),
                lever: heel_soil_lever(vars),
                friction: fr,
            },
            LoadEntry {
                name: "Concrete Unit Selfweight",
                load: unit,
                lever: concrete_moment(vars, inputs) / unit,
                friction: fr,
            },
        ],
        destabilising: vec![
            LoadEntry {
                name: "Retained Soil Selfweight",
                load: retained_soil_thrust(vars, inputs),
                lever: height / 3.0,
                friction: 1.0,
            },
            LoadEntry {
                name: "Retained Soil Surcharge",
                load: surcharge_thrust(vars, inputs),
                lever: height / 2.0,
                friction: 1.0,
            },
            LoadEntry {
                name: "Accidental Impact Load",
                load: inputs.p_a,
                lever: height,
                friction: 1.0,
            },
        ],
    }
}
