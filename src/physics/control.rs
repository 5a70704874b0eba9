use std::fmt;
use std::sync::Arc;

/// Shared time-dependent setpoint.
pub type ProfileFn = Arc<dyn Fn(f64) -> f64 + Send + Sync>;

/// Setpoint of a control mode as a function of step time [s].
#[derive(Clone)]
pub enum Profile {
    Constant(f64),
    Function(ProfileFn),
}

impl Profile {
    pub fn function(f: impl Fn(f64) -> f64 + Send + Sync + 'static) -> Self {
        Profile::Function(Arc::new(f))
    }

    pub fn value(&self, t: f64) -> f64 {
        match self {
            Profile::Constant(v) => *v,
            Profile::Function(f) => f(t),
        }
    }
}

impl From<f64> for Profile {
    fn from(v: f64) -> Self {
        Profile::Constant(v)
    }
}

impl fmt::Debug for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Profile::Constant(v) => write!(f, "Constant({v})"),
            Profile::Function(_) => write!(f, "Function(..)"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CurrentUnits {
    Amperes,
    CRate,
}

/// Boundary condition at the cathode current collector.
///
/// Positive currents and powers charge the cell, negative values discharge.
#[derive(Clone, Debug)]
pub enum ControlMode {
    Current { units: CurrentUnits, profile: Profile },
    Voltage(Profile),
    Power(Profile),
}

impl ControlMode {
    /// Open circuit, zero applied current.
    pub fn rest() -> Self {
        Self::amperes(0.0)
    }

    pub fn amperes(profile: impl Into<Profile>) -> Self {
        ControlMode::Current {
            units: CurrentUnits::Amperes,
            profile: profile.into(),
        }
    }

    pub fn c_rate(profile: impl Into<Profile>) -> Self {
        ControlMode::Current {
            units: CurrentUnits::CRate,
            profile: profile.into(),
        }
    }

    pub fn voltage(profile: impl Into<Profile>) -> Self {
        ControlMode::Voltage(profile.into())
    }

    pub fn power(profile: impl Into<Profile>) -> Self {
        ControlMode::Power(profile.into())
    }

    /// Applied current density [A/m2] when the mode prescribes it.
    pub fn current_density(&self, t: f64, cap: f64, area: f64) -> Option<f64> {
        match self {
            ControlMode::Current {
                units: CurrentUnits::Amperes,
                profile,
            } => Some(profile.value(t) / area),
            ControlMode::Current {
                units: CurrentUnits::CRate,
                profile,
            } => Some(profile.value(t) * cap / area),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn current_density_conversions() {
        assert_eq!(ControlMode::amperes(2.0).current_density(0.0, 4.0, 0.5), Some(4.0));
        assert_eq!(ControlMode::c_rate(-2.0).current_density(0.0, 4.0, 0.5), Some(-16.0));
        assert_eq!(ControlMode::voltage(3.0).current_density(0.0, 4.0, 0.5), None);
    }

    #[test]
    fn function_profiles_follow_time() {
        let mode = ControlMode::amperes(Profile::function(|t| 0.5 * t));
        assert_eq!(mode.current_density(4.0, 1.0, 1.0), Some(2.0));
        assert_eq!(format!("{:?}", Profile::from(1.5)), "Constant(1.5)");
    }
}
