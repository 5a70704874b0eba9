//! Zero-crossing event definitions.
//!
//! An [`EventFunction`] packs any number of scalar event expressions into
//! one vector that is filled in place. Detection, localization and the
//! terminal policy are handled by the integrator.

use std::fmt;
use std::str::FromStr;

use crate::config::ConfigError;

/// Cell-level quantity a limit can be placed on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Quantity {
    TimeS,
    TimeMin,
    TimeH,
    CurrentA,
    CurrentC,
    VoltageV,
    PowerW,
}

impl Quantity {
    pub fn name(&self) -> &'static str {
        match self {
            Quantity::TimeS => "time_s",
            Quantity::TimeMin => "time_min",
            Quantity::TimeH => "time_h",
            Quantity::CurrentA => "current_A",
            Quantity::CurrentC => "current_C",
            Quantity::VoltageV => "voltage_V",
            Quantity::PowerW => "power_W",
        }
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Quantity {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "time_s" => Ok(Quantity::TimeS),
            "time_min" => Ok(Quantity::TimeMin),
            "time_h" => Ok(Quantity::TimeH),
            "current_A" => Ok(Quantity::CurrentA),
            "current_C" => Ok(Quantity::CurrentC),
            "voltage_V" => Ok(Quantity::VoltageV),
            "power_W" => Ok(Quantity::PowerW),
            _ => Err(ConfigError::invalid("limit", format!("unknown quantity `{s}`"))),
        }
    }
}

/// Which sign changes of an event expression count.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Direction {
    /// From negative to non-negative.
    Increasing,
    /// From positive to non-positive.
    Decreasing,
    #[default]
    Either,
}

impl Direction {
    /// True when the change from `before` to `after` is a crossing that
    /// this filter accepts.
    pub fn accepts(&self, before: f64, after: f64) -> bool {
        let up = before < 0.0 && after >= 0.0;
        let down = before > 0.0 && after <= 0.0;
        match self {
            Direction::Increasing => up,
            Direction::Decreasing => down,
            Direction::Either => up || down,
        }
    }
}

/// What the integrator does once an event fires.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Terminal {
    /// Stop at the first occurrence.
    #[default]
    Stop,
    /// Stop at the `n`-th occurrence, record the earlier ones.
    StopAfter(u32),
    /// Record every occurrence, never stop.
    Record,
}

impl Terminal {
    /// Whether occurrence number `count` (starting at 1) ends integration.
    pub fn stops_at(&self, count: u32) -> bool {
        match self {
            Terminal::Stop => true,
            Terminal::StopAfter(n) => count >= *n,
            Terminal::Record => false,
        }
    }
}

/// A limit on one cell-level quantity. The event value is
/// `quantity - value`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Limit {
    pub quantity: Quantity,
    pub value: f64,
    pub direction: Direction,
    pub terminal: Terminal,
}

impl Limit {
    pub fn new(quantity: Quantity, value: f64) -> Self {
        Self {
            quantity,
            value,
            direction: Direction::Either,
            terminal: Terminal::Stop,
        }
    }

    /// Limit from a `(name, value)` pair such as `("voltage_V", 3.0)`.
    pub fn parse(name: &str, value: f64) -> Result<Self, ConfigError> {
        Ok(Self::new(name.parse()?, value))
    }

    pub fn direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    pub fn terminal(mut self, terminal: Terminal) -> Self {
        self.terminal = terminal;
        self
    }
}

/// Vector of event expressions evaluated by the integrator.
pub trait EventFunction {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn direction(&self, i: usize) -> Direction;

    fn terminal(&self, i: usize) -> Terminal;

    /// Fill `out` with every event value at `(t, y, yp)`.
    fn evaluate(&self, t: f64, y: &[f64], yp: &[f64], out: &mut [f64]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantity_names_round_trip() {
        for q in [
            Quantity::TimeS,
            Quantity::TimeMin,
            Quantity::TimeH,
            Quantity::CurrentA,
            Quantity::CurrentC,
            Quantity::VoltageV,
            Quantity::PowerW,
        ] {
            assert_eq!(q.name().parse::<Quantity>().unwrap(), q);
        }
        assert!("voltage".parse::<Quantity>().is_err());
    }

    #[test]
    fn direction_filters() {
        assert!(Direction::Increasing.accepts(-1.0, 0.5));
        assert!(!Direction::Increasing.accepts(1.0, -0.5));
        assert!(Direction::Decreasing.accepts(1.0, 0.0));
        assert!(Direction::Either.accepts(1.0, -1.0));
        assert!(!Direction::Either.accepts(1.0, 2.0));
        assert!(!Direction::Either.accepts(0.0, 1.0));
    }

    #[test]
    fn terminal_policies() {
        assert!(Terminal::Stop.stops_at(1));
        assert!(!Terminal::StopAfter(3).stops_at(2));
        assert!(Terminal::StopAfter(3).stops_at(3));
        assert!(!Terminal::Record.stops_at(100));
    }

    #[test]
    fn limit_builder() {
        let l = Limit::parse("current_A", 1.0)
            .unwrap()
            .direction(Direction::Increasing)
            .terminal(Terminal::Record);
        assert_eq!(l.quantity, Quantity::CurrentA);
        assert_eq!(l.terminal, Terminal::Record);
    }
}
