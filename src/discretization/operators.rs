//! Finite-volume difference operators on 1D grids.
//!
//! Gradients map `n` center values to `n - 1` interior interface values.
//! Divergences map `n + 1` interface fluxes to `n` volume values, one fewer
//! than their input, matching the interface/center counts of [`Mesh`].
//!
//! [`Mesh`]: crate::discretization::mesh::Mesh

use std::f64::consts::PI;

/// Cartesian gradient between neighboring centers.
pub fn grad_x(x: &[f64], f: &[f64]) -> Vec<f64> {
    debug_assert_eq!(x.len(), f.len());
    x.windows(2)
        .zip(f.windows(2))
        .map(|(xw, fw)| (fw[1] - fw[0]) / (xw[1] - xw[0]))
        .collect()
}

/// Radial gradient between neighboring centers. Same stencil as [`grad_x`].
pub fn grad_r(r: &[f64], f: &[f64]) -> Vec<f64> {
    grad_x(r, f)
}

/// Cartesian divergence of interface fluxes `f` (length `n + 1`).
pub fn div_x(xm: &[f64], xp: &[f64], f: &[f64]) -> Vec<f64> {
    debug_assert_eq!(f.len(), xm.len() + 1);
    xm.iter()
        .zip(xp)
        .zip(f.windows(2))
        .map(|((m, p), fw)| (fw[1] - fw[0]) / (p - m))
        .collect()
}

/// Spherical divergence of interface fluxes `f` (length `n + 1`).
pub fn div_r(rm: &[f64], rp: &[f64], f: &[f64]) -> Vec<f64> {
    debug_assert_eq!(f.len(), rm.len() + 1);
    rm.iter()
        .zip(rp)
        .zip(f.windows(2))
        .map(|((m, p), fw)| {
            let r = 0.5 * (m + p);
            (p * p * fw[1] - m * m * fw[0]) / (r * r * (p - m))
        })
        .collect()
}

/// Integral over a Cartesian grid, per unit cross-section.
pub fn int_x(xm: &[f64], xp: &[f64], f: &[f64]) -> f64 {
    xm.iter()
        .zip(xp)
        .zip(f)
        .map(|((m, p), v)| v * (p - m))
        .sum()
}

/// Integral over a spherical particle.
///
/// Uses the same `r²` evaluation point as [`div_r`], so integrating a
/// discrete divergence telescopes to the surface flux exactly.
pub fn int_r(rm: &[f64], rp: &[f64], f: &[f64]) -> f64 {
    rm.iter()
        .zip(rp)
        .zip(f)
        .map(|((m, p), v)| {
            let r = 0.5 * (m + p);
            4.0 * PI * r * r * v * (p - m)
        })
        .sum()
}

/// Distance-weighted harmonic mean of a transport coefficient at an interface.
///
/// Equivalent to two resistances in series, so the less conductive side
/// limits the flux.
#[inline]
pub fn harmonic_face(wt_m: f64, k_m: f64, wt_p: f64, k_p: f64) -> f64 {
    1.0 / (wt_m / k_m + wt_p / k_p)
}

/// Distance-weighted arithmetic mean, used for intensive non-transport
/// properties.
#[inline]
pub fn arithmetic_face(wt_m: f64, v_m: f64, wt_p: f64, v_p: f64) -> f64 {
    wt_m * v_m + wt_p * v_p
}
