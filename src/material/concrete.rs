//! Concrete parameters and constitutive laws
//!
//! Stresses are in MPa, strains are dimensionless, tension positive.
//! The compressive strength `strength` is stored as a positive number while
//! the plastic and ultimate strains are negative.

use log::trace;
use serde::{Deserialize, Serialize};

use crate::error::InputError;

/// Coarse aggregate type (scales the MC2010 elastic modulus)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AggregateType {
    Basalt,
    #[default]
    Quartzite,
    Limestone,
    Sandstone,
}

impl AggregateType {
    /// MC2010 factor αE applied to the elastic modulus
    pub fn factor(&self) -> f64 {
        match self {
            Self::Basalt => 1.2,
            Self::Quartzite => 1.0,
            Self::Limestone => 0.9,
            Self::Sandstone => 0.7,
        }
    }
}

/// Standard used to derive the concrete parameters from its strength
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ParameterModel {
    /// fib Model Code 2010
    #[default]
    MC2010,
    /// Parameters used with the Modified Compression Field Theory
    MCFT,
    /// Parameters used with the Disturbed Stress Field Model
    DSFM,
    /// Every parameter given by the user
    Custom,
}

/// Material constants of a concrete
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConcreteParameters {
    /// Standard the parameters were derived with
    pub model: ParameterModel,
    /// Compressive strength fc in MPa (positive)
    pub strength: f64,
    /// Coarse aggregate type
    pub aggregate_type: AggregateType,
    /// Tensile (cracking) strength fcr in MPa
    pub tensile_strength: f64,
    /// Initial elastic modulus Ec in MPa
    pub initial_module: f64,
    /// Strain at peak compressive stress ec (negative)
    pub plastic_strain: f64,
    /// Ultimate compressive strain ecu (negative)
    pub ultimate_strain: f64,
    /// Fracture energy Gf in N/mm
    pub fracture_parameter: f64,
}

impl ConcreteParameters {
    /// Derive the parameters of a concrete with strength `fc` (MPa)
    ///
    /// `ParameterModel::Custom` has no formulas and falls back to MC2010
    /// values; use [`ConcreteParameters::custom`] to give every value.
    pub fn new(strength: f64, model: ParameterModel, aggregate_type: AggregateType) -> Self {
        let fc = strength;

        let (tensile_strength, initial_module, plastic_strain, ultimate_strain, fracture_parameter) =
            match model {
                ParameterModel::MCFT | ParameterModel::DSFM => {
                    let ec = -0.002;
                    (0.33 * fc.sqrt(), -2.0 * fc / ec, ec, -0.0035, 0.075)
                }
                ParameterModel::MC2010 | ParameterModel::Custom => {
                    let fcm = fc + 8.0;
                    let fcr = if fc <= 50.0 {
                        0.3 * fc.powf(2.0 / 3.0)
                    } else {
                        2.12 * (1.0 + 0.1 * fcm).ln()
                    };
                    let ec = -1.6e-3 * (fcm / 10.0).powf(0.25);
                    let ecu = if fc <= 50.0 {
                        -3.5e-3
                    } else {
                        -(2.8 + 27.0 * ((98.0 - fcm) / 100.0).powi(4)) * 1e-3
                    };
                    let eci = 21_500.0 * aggregate_type.factor() * (fcm / 10.0).cbrt();
                    (fcr, eci, ec, ecu, 0.073 * fcm.powf(0.18))
                }
            };

        Self {
            model,
            strength,
            aggregate_type,
            tensile_strength,
            initial_module,
            plastic_strain,
            ultimate_strain,
            fracture_parameter,
        }
    }

    /// Parameters given explicitly
    pub fn custom(
        strength: f64,
        tensile_strength: f64,
        initial_module: f64,
        plastic_strain: f64,
        ultimate_strain: f64,
    ) -> Self {
        Self {
            model: ParameterModel::Custom,
            strength,
            aggregate_type: AggregateType::default(),
            tensile_strength,
            initial_module,
            plastic_strain,
            ultimate_strain,
            fracture_parameter: 0.075,
        }
    }

    /// Set the fracture energy
    pub fn with_fracture_parameter(mut self, gf: f64) -> Self {
        self.fracture_parameter = gf;
        self
    }

    /// Cracking strain `fcr / Ec`
    pub fn cracking_strain(&self) -> f64 {
        self.tensile_strength / self.initial_module
    }

    /// Secant modulus at the peak compressive stress
    pub fn secant_module(&self) -> f64 {
        self.strength / self.plastic_strain.abs()
    }

    /// Check that the parameters describe a usable concrete
    pub fn validate(&self) -> Result<(), InputError> {
        let positive = [
            ("strength", self.strength),
            ("tensile strength", self.tensile_strength),
            ("initial modulus", self.initial_module),
            ("fracture parameter", self.fracture_parameter),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(InputError::InvalidMaterial(format!(
                    "concrete {} must be positive, got {}",
                    name, value
                )));
            }
        }

        if !(self.plastic_strain < 0.0 && self.ultimate_strain <= self.plastic_strain) {
            return Err(InputError::InvalidMaterial(format!(
                "concrete strains must satisfy ecu <= ec < 0, got ec = {}, ecu = {}",
                self.plastic_strain, self.ultimate_strain
            )));
        }

        Ok(())
    }
}

impl Default for ConcreteParameters {
    fn default() -> Self {
        Self::new(30.0, ParameterModel::MC2010, AggregateType::Quartzite)
    }
}

/// Constitutive behavior of cracked concrete
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ConstitutiveModel {
    /// Modified Compression Field Theory
    Mcft,
    /// Disturbed Stress Field Model
    Dsfm {
        /// Whether crack slip is considered in the compression softening
        crack_slip: bool,
    },
}

impl ConstitutiveModel {
    /// Compression softening coefficient Cs
    fn slip_coefficient(&self) -> f64 {
        match self {
            Self::Mcft => 1.0,
            Self::Dsfm { crack_slip: true } => 0.55,
            Self::Dsfm { crack_slip: false } => 1.0,
        }
    }
}

impl Default for ConstitutiveModel {
    fn default() -> Self {
        Self::Mcft
    }
}

/// Reinforcement layer crossing a crack
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CrossingReinforcement {
    /// Reinforcement ratio
    pub ratio: f64,
    /// Bar diameter in mm
    pub bar_diameter: f64,
    /// Cosine of the angle between the crack normal and the bars
    pub cos_theta: f64,
    /// Yield stress of the bars
    pub yield_stress: f64,
    /// Current (average) stress in the bars
    pub stress: f64,
}

impl CrossingReinforcement {
    /// Tension stiffening coefficient `4ρ/φ |cos θ|`
    pub fn tension_stiffening(&self) -> f64 {
        if self.bar_diameter <= 0.0 {
            return 0.0;
        }
        4.0 * self.ratio / self.bar_diameter * self.cos_theta.abs()
    }

    /// Stress this layer can still transmit across the crack
    pub fn transmissible_stress(&self) -> f64 {
        self.ratio * (self.yield_stress - self.stress).max(0.0) * self.cos_theta.powi(2)
    }
}

/// Crack information consumed by the DSFM tensile law
#[derive(Debug, Clone, Copy, Default)]
pub struct CrackContext<'a> {
    /// Length used to regularize tension softening
    pub reference_length: f64,
    /// Reinforcement crossing the crack
    pub crossings: &'a [CrossingReinforcement],
}

/// Concrete parameters together with the constitutive law they feed
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Concrete {
    pub parameters: ConcreteParameters,
    pub model: ConstitutiveModel,
}

fn finite_or_zero(value: f64, law: &str, strain: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        trace!("{} produced {} at strain {:.3e}; using zero stress", law, value, strain);
        0.0
    }
}

impl Concrete {
    /// Create a concrete from parameters and a constitutive model
    pub fn new(parameters: ConcreteParameters, model: ConstitutiveModel) -> Self {
        Self { parameters, model }
    }

    /// Concrete with MC2010 parameters following MCFT
    pub fn mcft(strength: f64) -> Self {
        Self::new(
            ConcreteParameters::new(strength, ParameterModel::MC2010, AggregateType::Quartzite),
            ConstitutiveModel::Mcft,
        )
    }

    /// Concrete with MC2010 parameters following DSFM
    pub fn dsfm(strength: f64) -> Self {
        Self::new(
            ConcreteParameters::new(strength, ParameterModel::MC2010, AggregateType::Quartzite),
            ConstitutiveModel::Dsfm { crack_slip: true },
        )
    }

    /// Initial elastic modulus
    pub fn elastic_module(&self) -> f64 {
        self.parameters.initial_module
    }

    /// Whether a principal tensile strain is past cracking
    pub fn is_cracked(&self, strain: f64) -> bool {
        strain > self.parameters.cracking_strain()
    }

    /// Whether a compressive strain is past the ultimate strain
    pub fn is_crushed(&self, strain: f64) -> bool {
        strain <= self.parameters.ultimate_strain
    }

    /// Tensile stress for a positive principal strain
    pub fn tensile_stress(&self, strain: f64, crack: &CrackContext) -> f64 {
        let p = &self.parameters;
        let ecr = p.cracking_strain();

        if strain <= ecr {
            return p.initial_module * strain;
        }

        let fcr = p.tensile_strength;
        let stress = match self.model {
            ConstitutiveModel::Mcft => fcr / (1.0 + (500.0 * strain).sqrt()),
            ConstitutiveModel::Dsfm { .. } => {
                let ets = 2.0 * p.fracture_parameter / (fcr * crack.reference_length);
                let softening = if ets > ecr {
                    (fcr * (1.0 - (strain - ecr) / (ets - ecr))).max(0.0)
                } else {
                    0.0
                };

                let inv_m: f64 = crack.crossings.iter().map(|c| c.tension_stiffening()).sum();
                let stiffening = if inv_m > 0.0 {
                    fcr / (1.0 + (2.2 * strain / inv_m).sqrt())
                } else {
                    0.0
                };

                let stress = softening.max(stiffening);
                if crack.crossings.iter().any(|c| c.ratio > 0.0) {
                    let cap: f64 = crack.crossings.iter().map(|c| c.transmissible_stress()).sum();
                    stress.min(cap)
                } else {
                    stress
                }
            }
        };

        finite_or_zero(stress, "tensile law", strain)
    }

    /// DSFM compression softening coefficient Cd for a principal strain pair
    pub fn softening_coefficient(ec1: f64, ec2: f64) -> f64 {
        let ratio = -ec1 / ec2;

        if !ratio.is_finite() {
            return 1.0;
        }
        if ratio <= 0.28 {
            return 0.0;
        }
        0.35 * (ratio - 0.28).powf(0.8)
    }

    /// Compressive stress for the principal pair `(ec1, ec2)` with `ec2 < 0`
    ///
    /// `ec1` is the transverse (tensile) principal strain that softens the
    /// compressive response.
    pub fn compressive_stress(&self, ec1: f64, ec2: f64) -> f64 {
        if ec2 >= 0.0 {
            return 0.0;
        }

        let p = &self.parameters;
        let (fc, ec) = (p.strength, p.plastic_strain);

        let stress = match self.model {
            ConstitutiveModel::Mcft => {
                let f2max = (-fc / (0.8 - 0.34 * ec1.max(0.0) / ec)).max(-fc);
                let n = ec2 / ec;
                (f2max * (2.0 * n - n * n)).min(0.0)
            }
            ConstitutiveModel::Dsfm { .. } => {
                let cd = Self::softening_coefficient(ec1, ec2);
                let beta_d = (1.0 / (1.0 + self.model.slip_coefficient() * cd)).min(1.0);
                let fp = -beta_d * fc;
                let ep = beta_d * ec;

                let n = 0.8 - fp / 17.0;
                let k = if ec2 < ep { 0.67 - fp / 62.0 } else { 1.0 };
                let x = ec2 / ep;

                fp * n * x / (n - 1.0 + x.powf(n * k))
            }
        };

        finite_or_zero(stress, "compressive law", ec2)
    }

    /// Stress of concrete strained in one direction only
    pub fn uniaxial_stress(&self, strain: f64, crack: &CrackContext) -> f64 {
        if strain > 0.0 {
            self.tensile_stress(strain, crack)
        } else {
            self.compressive_stress(0.0, strain)
        }
    }

    /// Principal stresses `(f1, f2)` for principal strains `e1 >= e2`
    pub fn principal_stresses(&self, e1: f64, e2: f64, crack: &CrackContext) -> (f64, f64) {
        let f1 = if e1 > 0.0 {
            self.tensile_stress(e1, crack)
        } else {
            self.compressive_stress(0.0, e1)
        };

        let f2 = if e2 > 0.0 {
            self.tensile_stress(e2, crack)
        } else {
            self.compressive_stress(e1.max(0.0), e2)
        };

        (f1, f2)
    }

    /// Secant modulus of a principal direction, the elastic modulus at zero strain
    pub fn secant_module(&self, stress: f64, strain: f64) -> f64 {
        let ec = self.parameters.initial_module;
        if strain.abs() < 1e-12 {
            return ec;
        }

        let module = stress / strain;
        if module.is_finite() {
            module.max(1e-6 * ec)
        } else {
            ec
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn no_crack() -> CrackContext<'static> {
        CrackContext {
            reference_length: 1000.0,
            crossings: &[],
        }
    }

    #[test]
    fn test_mcft_parameters() {
        let p = ConcreteParameters::new(30.0, ParameterModel::MCFT, AggregateType::Quartzite);
        assert_relative_eq!(p.tensile_strength, 0.33 * 30.0_f64.sqrt());
        assert_relative_eq!(p.initial_module, 30_000.0);
        assert_relative_eq!(p.plastic_strain, -0.002);
        assert!(p.validate().is_ok());
    }

    #[test]
    fn test_mc2010_parameters() {
        let p = ConcreteParameters::new(30.0, ParameterModel::MC2010, AggregateType::Quartzite);
        assert_relative_eq!(p.tensile_strength, 0.3 * 30.0_f64.powf(2.0 / 3.0));
        assert_relative_eq!(p.initial_module, 21_500.0 * 3.8_f64.cbrt(), epsilon = 1e-9);
        assert_relative_eq!(p.ultimate_strain, -3.5e-3);

        let basalt = ConcreteParameters::new(30.0, ParameterModel::MC2010, AggregateType::Basalt);
        assert_relative_eq!(basalt.initial_module, 1.2 * p.initial_module, epsilon = 1e-9);
    }

    #[test]
    fn test_invalid_parameters_are_rejected() {
        let p = ConcreteParameters::custom(30.0, 2.0, 30_000.0, 0.002, -0.0035);
        assert!(matches!(p.validate(), Err(InputError::InvalidMaterial(_))));
    }

    #[test]
    fn test_tensile_stress_is_linear_before_cracking() {
        let concrete = Concrete::mcft(30.0);
        let ecr = concrete.parameters.cracking_strain();
        let stress = concrete.tensile_stress(0.5 * ecr, &no_crack());
        assert_relative_eq!(stress, 0.5 * concrete.parameters.tensile_strength, epsilon = 1e-12);
    }

    #[test]
    fn test_mcft_tensile_stress_after_cracking() {
        let concrete = Concrete::mcft(30.0);
        let fcr = concrete.parameters.tensile_strength;
        let stress = concrete.tensile_stress(0.002, &no_crack());
        assert_relative_eq!(stress, fcr / (1.0 + 1.0_f64.sqrt()), epsilon = 1e-12);
    }

    #[test]
    fn test_dsfm_tension_stiffening_and_cap() {
        let concrete = Concrete::dsfm(30.0);
        let fcr = concrete.parameters.tensile_strength;
        let strain = 0.004;

        let layer = CrossingReinforcement {
            ratio: 0.01,
            bar_diameter: 10.0,
            cos_theta: 1.0,
            yield_stress: 500.0,
            stress: 100.0,
        };
        let crossings = [layer];
        let crack = CrackContext {
            reference_length: 1000.0,
            crossings: &crossings,
        };

        let m = 1.0 / layer.tension_stiffening();
        let expected = fcr / (1.0 + (2.2 * m * strain).sqrt());
        assert_relative_eq!(concrete.tensile_stress(strain, &crack), expected, epsilon = 1e-12);

        // Yielded crossing steel cannot transmit any more stress
        let yielded = [CrossingReinforcement { stress: 500.0, ..layer }];
        let crack = CrackContext {
            reference_length: 1000.0,
            crossings: &yielded,
        };
        assert_eq!(concrete.tensile_stress(strain, &crack), 0.0);
    }

    #[test]
    fn test_mcft_compression_peak() {
        let concrete = Concrete::mcft(30.0);
        let ec = concrete.parameters.plastic_strain;
        assert_relative_eq!(concrete.compressive_stress(0.0, ec), -30.0, epsilon = 1e-12);

        // Transverse tension softens the response
        let softened = concrete.compressive_stress(0.002, ec);
        assert!(softened > -30.0 && softened < 0.0);
    }

    #[test]
    fn test_dsfm_compression_peak_without_softening() {
        let concrete = Concrete::dsfm(30.0);
        let ec = concrete.parameters.plastic_strain;
        assert_relative_eq!(concrete.compressive_stress(0.0, ec), -30.0, epsilon = 1e-9);
    }

    #[test]
    fn test_dsfm_softened_compression_peak() {
        let concrete = Concrete::dsfm(30.0);
        let (fc, ec) = (concrete.parameters.strength, concrete.parameters.plastic_strain);
        let ec1 = 0.002;
        let beta = |ec2: f64| 1.0 / (1.0 + 0.55 * Concrete::softening_coefficient(ec1, ec2));

        // The peak strain depends on the softening it produces
        let mut ep = ec;
        for _ in 0..200 {
            ep = beta(ep) * ec;
        }
        let beta_d = beta(ep);
        assert!(beta_d < 1.0);

        let peak = concrete.compressive_stress(ec1, ep);
        assert_relative_eq!(peak, -beta_d * fc, max_relative = 1e-9);
        assert!(peak.abs() < fc);
        assert!(concrete.compressive_stress(ec1, ec).abs() < fc);
    }

    #[test]
    fn test_dsfm_tension_softening_governs_short_cracks() {
        let concrete = Concrete::dsfm(30.0);
        let p = concrete.parameters;
        let (fcr, ecr) = (p.tensile_strength, p.cracking_strain());
        let strain = 0.001;

        let layer = CrossingReinforcement {
            ratio: 0.01,
            bar_diameter: 32.0,
            cos_theta: 1.0,
            yield_stress: 500.0,
            stress: 0.0,
        };
        let crossings = [layer];
        let crack = CrackContext {
            reference_length: 10.0,
            crossings: &crossings,
        };

        let ets = 2.0 * p.fracture_parameter / (fcr * 10.0);
        let softening = fcr * (1.0 - (strain - ecr) / (ets - ecr));
        let stiffening = fcr / (1.0 + (2.2 * strain / layer.tension_stiffening()).sqrt());
        assert!(softening > stiffening);

        assert_relative_eq!(concrete.tensile_stress(strain, &crack), softening, epsilon = 1e-12);
    }

    #[test]
    fn test_degenerate_softening_ratio_defaults() {
        assert_eq!(Concrete::softening_coefficient(0.001, 0.0), 1.0);
        assert_eq!(Concrete::softening_coefficient(0.0, 0.0), 1.0);
        assert_eq!(Concrete::softening_coefficient(0.0001, -0.001), 0.0);

        let concrete = Concrete::dsfm(30.0);
        assert!(concrete.compressive_stress(f64::NAN, -0.001).is_finite());
    }

    #[test]
    fn test_secant_module_fallbacks() {
        let concrete = Concrete::mcft(30.0);
        let ec = concrete.elastic_module();
        assert_eq!(concrete.secant_module(0.0, 0.0), ec);
        assert_eq!(concrete.secant_module(f64::NAN, 1e-3), ec);
        assert_relative_eq!(concrete.secant_module(0.0, 1e-3), 1e-6 * ec);
    }
}
