//! Caller-supplied loading and material parameters.

use serde::{Deserialize, Serialize};

use crate::errors::InputError;

/// Soil and concrete properties used by every stability check.
///
/// Missing fields fall back to the defaults when deserialised, so a configuration file
/// only needs to name the values it changes.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MaterialParameters {
    /// Concrete unit weight in kN/m3.
    pub p_c: f64,
    /// Soil unit weight in kN/m3.
    pub p_s: f64,
    /// Soil friction angle in degrees.
    pub phi: f64,
    /// Friction coefficient between the base and the founding soil.
    pub fr: f64,
    /// Length of the chamfer at the upstand/base junction in metres.
    pub ch: f64,
}

impl Default for MaterialParameters {
    fn default() -> Self {
        Self {
            p_c: 23.0,
            p_s: 18.0,
            phi: 20.0,
            fr: 0.5,
            ch: 0.15,
        }
    }
}

impl MaterialParameters {
    /// Check that every property is finite and physically meaningful.
    ///
    /// # Errors
    ///
    /// Returns the [`InputError`] variant for the first offending field.
    pub fn validate(&self) -> Result<(), InputError> {
        finite("p_c", self.p_c)?;
        finite("p_s", self.p_s)?;
        finite("phi", self.phi)?;
        finite("fr", self.fr)?;
        finite("ch", self.ch)?;
        if self.p_c <= 0.0 {
            return Err(InputError::NonPositiveConcreteWeight {
                unit_weight: self.p_c,
            });
        }
        if self.p_s <= 0.0 {
            return Err(InputError::NonPositiveSoilWeight {
                unit_weight: self.p_s,
            });
        }
        if !(0.0..90.0).contains(&self.phi) {
            return Err(InputError::FrictionAngleOutOfRange { angle: self.phi });
        }
        if self.fr <= 0.0 || self.fr > 1.0 {
            return Err(InputError::BaseFrictionOutOfRange {
                coefficient: self.fr,
            });
        }
        if self.ch < 0.0 {
            return Err(InputError::NegativeChamfer { length: self.ch });
        }
        Ok(())
    }
}

/// Loading case and materials for a single design.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DesignInputs {
    /// Retained height in metres.
    pub h: f64,
    /// Accidental impact load in kN, applied at the top of the upstand.
    pub p_a: f64,
    /// Surcharge on the retained soil in kN/m2.
    pub q: f64,
    /// Soil and concrete properties.
    pub materials: MaterialParameters,
}

impl Default for DesignInputs {
    fn default() -> Self {
        Self {
            h: 2.0,
            p_a: 150.0,
            q: 10.0,
            materials: MaterialParameters::default(),
        }
    }
}

impl DesignInputs {
    /// Create a validated set of inputs.
    ///
    /// # Errors
    ///
    /// Returns an [`InputError`] when any value lies outside its physical domain.
    ///
    /// # Examples
    /// ```
    /// use lunitx::{DesignInputs, MaterialParameters};
    ///
    /// let inputs = DesignInputs::new(2.0, 150.0, 10.0, MaterialParameters::default())
    ///     .expect("default loading is valid");
    /// assert_eq!(inputs.materials.p_c, 23.0);
    /// ```
    pub fn new(
        h: f64,
        p_a: f64,
        q: f64,
        materials: MaterialParameters,
    ) -> Result<Self, InputError> {
        let inputs = Self { h, p_a, q, materials };
        inputs.validate()?;
        Ok(inputs)
    }

    /// Check the loading case and the materials.
    ///
    /// # Errors
    ///
    /// Returns the [`InputError`] variant for the first offending field.
    pub fn validate(&self) -> Result<(), InputError> {
        finite("h", self.h)?;
        finite("p_a", self.p_a)?;
        finite("q", self.q)?;
        if self.h <= 0.0 {
            return Err(InputError::NonPositiveHeight { height: self.h });
        }
        if self.p_a < 0.0 {
            return Err(InputError::NegativeImpactLoad { load: self.p_a });
        }
        if self.q < 0.0 {
            return Err(InputError::NegativeSurcharge { surcharge: self.q });
        }
        self.materials.validate()
    }
}

/// Reject NaN and infinite values.
fn finite(field: &'static str, value: f64) -> Result<(), InputError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(InputError::NonFinite { field })
    }
}
