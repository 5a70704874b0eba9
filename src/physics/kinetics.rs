//! Butler-Volmer interfacial kinetics.

use super::constants::{F, R};

/// Overpotential `phis - phie - (Eeq + H)`.
///
/// The grouping matches how rested potentials are constructed, so a rested
/// state evaluates to exactly zero.
#[inline]
pub fn overpotential(phis: f64, phie: f64, eeq: f64, hyst: f64) -> f64 {
    phis - (phie + (eeq + hyst))
}

/// Li+ production rate at the particle surface [kmol/m2/s].
#[inline]
pub fn butler_volmer(i0: f64, eta: f64, alpha_a: f64, alpha_c: f64, temp: f64) -> f64 {
    let f_rt = F / (R * temp);
    i0 / F * ((alpha_a * f_rt * eta).exp() - (-alpha_c * f_rt * eta).exp())
}

/// Sign with an explicit zero, unlike [`f64::signum`].
#[inline]
pub fn sign(v: f64) -> f64 {
    if v > 0.0 {
        1.0
    } else if v < 0.0 {
        -1.0
    } else {
        0.0
    }
}
