//! Litter records and the per-size-class state exchanged with the kernel.
//!
//! Litter is described by its mass and by five chemical fractions
//! (acid, water, ethanol and non-soluble extractives plus humus).
//! Fractions are given in percent of the mass; every quantity carries a
//! standard deviation that the Monte Carlo driver uses when drawing samples.
//!
//! Records are grouped by [`SizeClass`]: `0` is non-woody litter, any
//! positive value is woody litter with the given diameter in cm.

use crate::errors::{YassoError, YassoResult};
use crate::FloatValue;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::ops::{Add, AddAssign};

/// Number of columns in a litter row (12 estimates + size class)
pub const LITTER_COLUMNS: usize = 13;
/// Number of columns in a timed litter row (time tag + litter row)
pub const TIMED_LITTER_COLUMNS: usize = 14;

/// A mean value together with its standard deviation
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Estimate {
    pub mean: FloatValue,
    pub std: FloatValue,
}

impl Estimate {
    pub const ZERO: Estimate = Estimate {
        mean: 0.0,
        std: 0.0,
    };

    pub fn new(mean: FloatValue, std: FloatValue) -> Self {
        Self { mean, std }
    }

    /// An estimate without uncertainty
    pub fn exact(mean: FloatValue) -> Self {
        Self { mean, std: 0.0 }
    }
}

/// Litter size class.
///
/// `0.0` denotes non-woody litter.
/// Positive values denote woody litter, the value being the diameter in cm.
///
/// Size classes are ordered with [`f64::total_cmp`] so they can key ordered maps.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SizeClass(FloatValue);

impl SizeClass {
    pub const NON_WOODY: SizeClass = SizeClass(0.0);

    pub fn new(diameter: FloatValue) -> Self {
        Self(diameter)
    }

    /// Diameter in cm (0 for non-woody litter)
    pub fn diameter(&self) -> FloatValue {
        self.0
    }

    pub fn is_woody(&self) -> bool {
        self.0 > 0.0
    }
}

impl PartialEq for SizeClass {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SizeClass {}

impl PartialOrd for SizeClass {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SizeClass {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl fmt::Display for SizeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Mass and chemical composition of the litter in one size class.
///
/// Fractions are percentages of the mass.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SizeClassState {
    pub mass: Estimate,
    pub acid: Estimate,
    pub water: Estimate,
    pub ethanol: Estimate,
    pub non_soluble: Estimate,
    pub humus: Estimate,
}

/// Size class states keyed by size class
pub type SizeClassMap = BTreeMap<SizeClass, SizeClassState>;

impl SizeClassState {
    pub const ZERO: SizeClassState = SizeClassState {
        mass: Estimate::ZERO,
        acid: Estimate::ZERO,
        water: Estimate::ZERO,
        ethanol: Estimate::ZERO,
        non_soluble: Estimate::ZERO,
        humus: Estimate::ZERO,
    };

    /// Converts component masses (e.g. a kernel end state) into a state.
    ///
    /// The mass is the sum of the components and each fraction is the share of
    /// the component in percent. Standard deviations are zero: uncertainty is not
    /// carried from one timestep to the next.
    /// A state without mass has all fractions set to zero.
    pub fn from_masses(masses: &ComponentMasses) -> Self {
        let mass = masses.total();
        let percent = |component: FloatValue| {
            if mass == 0.0 {
                Estimate::ZERO
            } else {
                Estimate::exact(100.0 * component / mass)
            }
        };

        Self {
            mass: Estimate::exact(mass),
            acid: percent(masses.acid),
            water: percent(masses.water),
            ethanol: percent(masses.ethanol),
            non_soluble: percent(masses.non_soluble),
            humus: percent(masses.humus),
        }
    }

    /// Flat representation:
    /// `(mass, mass_std, acid, acid_std, water, water_std, ethanol, ethanol_std,
    /// non_soluble, non_soluble_std, humus, humus_std)`
    pub fn to_array(&self) -> [FloatValue; 12] {
        [
            self.mass.mean,
            self.mass.std,
            self.acid.mean,
            self.acid.std,
            self.water.mean,
            self.water.std,
            self.ethanol.mean,
            self.ethanol.std,
            self.non_soluble.mean,
            self.non_soluble.std,
            self.humus.mean,
            self.humus.std,
        ]
    }

    pub fn from_array(values: [FloatValue; 12]) -> Self {
        Self {
            mass: Estimate::new(values[0], values[1]),
            acid: Estimate::new(values[2], values[3]),
            water: Estimate::new(values[4], values[5]),
            ethanol: Estimate::new(values[6], values[7]),
            non_soluble: Estimate::new(values[8], values[9]),
            humus: Estimate::new(values[10], values[11]),
        }
    }
}

/// Masses of the five decomposing compartments.
///
/// The kernel works on these as the flat vector
/// `[acid, water, ethanol, non_soluble, humus]`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ComponentMasses {
    pub acid: FloatValue,
    pub water: FloatValue,
    pub ethanol: FloatValue,
    pub non_soluble: FloatValue,
    pub humus: FloatValue,
}

impl ComponentMasses {
    pub const ZERO: ComponentMasses = ComponentMasses {
        acid: 0.0,
        water: 0.0,
        ethanol: 0.0,
        non_soluble: 0.0,
        humus: 0.0,
    };

    pub fn from_array(values: [FloatValue; 5]) -> Self {
        let [acid, water, ethanol, non_soluble, humus] = values;
        Self {
            acid,
            water,
            ethanol,
            non_soluble,
            humus,
        }
    }

    pub fn to_array(&self) -> [FloatValue; 5] {
        [
            self.acid,
            self.water,
            self.ethanol,
            self.non_soluble,
            self.humus,
        ]
    }

    /// Total organic matter
    pub fn total(&self) -> FloatValue {
        self.acid + self.water + self.ethanol + self.non_soluble + self.humus
    }

    pub fn scaled(&self, factor: FloatValue) -> Self {
        Self::from_array(self.to_array().map(|v| v * factor))
    }
}

impl Add for ComponentMasses {
    type Output = ComponentMasses;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            acid: self.acid + rhs.acid,
            water: self.water + rhs.water,
            ethanol: self.ethanol + rhs.ethanol,
            non_soluble: self.non_soluble + rhs.non_soluble,
            humus: self.humus + rhs.humus,
        }
    }
}

impl AddAssign for ComponentMasses {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

/// A litter record as entered by the user.
///
/// Fractions are percentages of the mass and do not need to sum to 100.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LitterComponent {
    pub mass: FloatValue,
    #[serde(default)]
    pub mass_std: FloatValue,
    #[serde(default)]
    pub acid: FloatValue,
    #[serde(default)]
    pub acid_std: FloatValue,
    #[serde(default)]
    pub water: FloatValue,
    #[serde(default)]
    pub water_std: FloatValue,
    #[serde(default)]
    pub ethanol: FloatValue,
    #[serde(default)]
    pub ethanol_std: FloatValue,
    #[serde(default)]
    pub non_soluble: FloatValue,
    #[serde(default)]
    pub non_soluble_std: FloatValue,
    #[serde(default)]
    pub humus: FloatValue,
    #[serde(default)]
    pub humus_std: FloatValue,
    #[serde(default)]
    pub size_class: FloatValue,
}

impl LitterComponent {
    /// Parse a row of [`LITTER_COLUMNS`] values:
    /// `mass, mass_std, acid, acid_std, water, water_std, ethanol, ethanol_std,
    /// non_soluble, non_soluble_std, humus, humus_std, size_class`
    pub fn from_row(values: &[FloatValue], origin: &str) -> YassoResult<Self> {
        if values.len() != LITTER_COLUMNS {
            return Err(YassoError::data_format(
                origin,
                format!(
                    "litter components should contain {} values (mass, mass std, acid, acid std, \
                     water, water std, ethanol, ethanol std, non soluble, non soluble std, humus, \
                     humus std, size class), got {}",
                    LITTER_COLUMNS,
                    values.len()
                ),
            ));
        }
        let mut state = [0.0; 12];
        state.copy_from_slice(&values[..12]);
        Ok(Self::from_state(
            &SizeClassState::from_array(state),
            SizeClass::new(values[12]),
        ))
    }

    pub fn to_row(&self) -> Vec<FloatValue> {
        let mut row = self.state().to_array().to_vec();
        row.push(self.size_class);
        row
    }

    pub fn from_state(state: &SizeClassState, size_class: SizeClass) -> Self {
        Self {
            mass: state.mass.mean,
            mass_std: state.mass.std,
            acid: state.acid.mean,
            acid_std: state.acid.std,
            water: state.water.mean,
            water_std: state.water.std,
            ethanol: state.ethanol.mean,
            ethanol_std: state.ethanol.std,
            non_soluble: state.non_soluble.mean,
            non_soluble_std: state.non_soluble.std,
            humus: state.humus.mean,
            humus_std: state.humus.std,
            size_class: size_class.diameter(),
        }
    }

    pub fn size_class(&self) -> SizeClass {
        SizeClass::new(self.size_class)
    }

    /// Mass and composition of this record
    pub fn state(&self) -> SizeClassState {
        SizeClassState {
            mass: Estimate::new(self.mass, self.mass_std),
            acid: Estimate::new(self.acid, self.acid_std),
            water: Estimate::new(self.water, self.water_std),
            ethanol: Estimate::new(self.ethanol, self.ethanol_std),
            non_soluble: Estimate::new(self.non_soluble, self.non_soluble_std),
            humus: Estimate::new(self.humus, self.humus_std),
        }
    }

    /// Checks value ranges, returning a description of the first problem found
    pub fn check(&self) -> Result<(), String> {
        let values = self.to_row();
        if values.iter().any(|v| !v.is_finite()) {
            return Err("litter values must be finite".to_string());
        }
        if self.mass < 0.0 {
            return Err(format!("negative litter mass {}", self.mass));
        }
        if self.size_class < 0.0 {
            return Err(format!("negative size class {}", self.size_class));
        }
        let state = self.state();
        let fractions = [
            ("acid", state.acid),
            ("water", state.water),
            ("ethanol", state.ethanol),
            ("non soluble", state.non_soluble),
            ("humus", state.humus),
        ];
        for (name, fraction) in fractions {
            if !(0.0..=100.0).contains(&fraction.mean) {
                return Err(format!(
                    "{} fraction {} is outside 0..100 percent",
                    name, fraction.mean
                ));
            }
        }
        if [state.mass, state.acid, state.water, state.ethanol]
            .iter()
            .chain([state.non_soluble, state.humus].iter())
            .any(|e| e.std < 0.0)
        {
            return Err("standard deviations must not be negative".to_string());
        }
        Ok(())
    }
}

/// A litter record tagged with the year or month it applies to.
///
/// Tags count from the start of the simulation: tag 1 is the first year
/// (or month), tag 0 is reserved for the litter used to compute a steady state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimedLitterComponent {
    pub timestep: u32,
    #[serde(flatten)]
    pub litter: LitterComponent,
}

impl TimedLitterComponent {
    pub fn new(timestep: u32, litter: LitterComponent) -> Self {
        Self { timestep, litter }
    }

    /// Parse a row of [`TIMED_LITTER_COLUMNS`] values: the time tag followed by a litter row
    pub fn from_row(values: &[FloatValue], origin: &str) -> YassoResult<Self> {
        if values.len() != TIMED_LITTER_COLUMNS {
            return Err(YassoError::data_format(
                origin,
                format!(
                    "timed litter components should contain {} values (timestep followed by a \
                     litter row), got {}",
                    TIMED_LITTER_COLUMNS,
                    values.len()
                ),
            ));
        }
        let timestep = parse_time_tag(values[0], origin)?;
        let litter = LitterComponent::from_row(&values[1..], origin)?;
        Ok(Self { timestep, litter })
    }

    pub fn to_row(&self) -> Vec<FloatValue> {
        let mut row = vec![self.timestep as FloatValue];
        row.extend(self.litter.to_row());
        row
    }
}

/// Interpret a numeric column as a non-negative integral time tag
pub(crate) fn parse_time_tag(value: FloatValue, origin: &str) -> YassoResult<u32> {
    if value.is_finite() && value >= 0.0 && value.fract() == 0.0 && value <= u32::MAX as f64 {
        Ok(value as u32)
    } else {
        Err(YassoError::data_format(
            origin,
            format!("time tag {} is not a non-negative whole number", value),
        ))
    }
}
