use crate::models::p2d::StepSolution;
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

/// Column headers written by [`write_steps`].
pub const STEP_HEADERS: [&str; 6] = ["step", "time_s", "t_step_s", "current_A", "voltage_V", "power_W"];

/// Write data to CSV file with headers
pub fn write_csv<P: AsRef<Path>>(path: P, headers: &[&str], data: &[Vec<f64>]) -> io::Result<()> {
    if !headers.is_empty() && !data.is_empty() && headers.len() != data.len() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!(
                "Headers count ({}) doesn't match data columns ({})",
                headers.len(),
                data.len()
            ),
        ));
    }

    let mut file = File::create(path)?;

    writeln!(file, "{}", headers.join(","))?;

    let n_rows = data.iter().map(|col| col.len()).max().unwrap_or(0);

    for i in 0..n_rows {
        let row: Vec<String> = data
            .iter()
            .map(|col| {
                if i < col.len() {
                    format!("{:.15e}", col[i])
                } else {
                    String::new()
                }
            })
            .collect();
        writeln!(file, "{}", row.join(","))?;
    }

    Ok(())
}

/// Cell-level time series of consecutive steps in one table.
pub fn write_steps<P: AsRef<Path>>(path: P, steps: &[StepSolution]) -> io::Result<()> {
    let mut columns = vec![Vec::new(); STEP_HEADERS.len()];
    for (i, step) in steps.iter().enumerate() {
        columns[0].extend(std::iter::repeat_n(i as f64, step.len()));
        columns[1].extend_from_slice(&step.time_s);
        columns[2].extend_from_slice(&step.t);
        columns[3].extend_from_slice(&step.current_a);
        columns[4].extend_from_slice(&step.voltage_v);
        columns[5].extend_from_slice(&step.power_w);
    }
    write_csv(path, &STEP_HEADERS, &columns)
}

/// Profile of one variable over a mesh, e.g. `c_e` against `x`.
pub fn write_xy<P: AsRef<Path>>(
    path: P,
    x_header: &str,
    y_header: &str,
    x_data: &[f64],
    y_data: &[f64],
) -> io::Result<()> {
    if x_data.len() != y_data.len() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!(
                "X and Y data lengths don't match ({} vs {})",
                x_data.len(),
                y_data.len()
            ),
        ));
    }
    write_csv(
        path,
        &[x_header, y_header],
        &[x_data.to_vec(), y_data.to_vec()],
    )
}
