use super::mesh::Mesh;
use crate::config::ConfigError;

/// Build a uniform grid of `n` control volumes over `[origin, origin + length]`.
///
/// Interfaces are computed once and shared between neighbors, and the two
/// end points are set exactly so stacked domains line up without drift.
pub fn uniform_mesh(length: f64, n: usize, origin: f64) -> Result<Mesh, ConfigError> {
    if n == 0 {
        return Err(ConfigError::invalid("n", "at least one control volume is required"));
    }
    if !(length.is_finite() && length > 0.0) {
        return Err(ConfigError::invalid("length", format!("must be positive, got {length}")));
    }
    if !origin.is_finite() {
        return Err(ConfigError::invalid("origin", "must be finite"));
    }

    let mut faces: Vec<f64> = (0..=n)
        .map(|i| origin + length * i as f64 / n as f64)
        .collect();
    faces[0] = origin;
    faces[n] = origin + length;

    let minus = faces[..n].to_vec();
    let plus = faces[1..].to_vec();
    let centers = minus
        .iter()
        .zip(&plus)
        .map(|(m, p)| 0.5 * (m + p))
        .collect();

    Ok(Mesh {
        minus,
        plus,
        centers,
    })
}

/// Build the three macroscopic meshes of a cell so that global x is
/// continuous from the anode collector to the cathode collector.
pub fn stacked_x_meshes(
    anode: (f64, usize),
    separator: (f64, usize),
    cathode: (f64, usize),
) -> Result<[Mesh; 3], ConfigError> {
    let an = uniform_mesh(anode.0, anode.1, 0.0)?;
    let sep = uniform_mesh(separator.0, separator.1, an.end())?;
    let ca = uniform_mesh(cathode.0, cathode.1, sep.end())?;
    Ok([an, sep, ca])
}
