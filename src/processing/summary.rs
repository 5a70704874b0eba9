use crate::models::p2d::{Electrode, P2dCell, StepSolution};
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

/// Mesh and unknown counts of one domain.
pub struct DomainSummary {
    pub name: &'static str,
    pub nx: usize,
    /// Radial volumes per particle, zero for the separator.
    pub nr: usize,
    pub thickness: f64,
    pub dx: f64,
    pub unknowns: usize,
    pub pointer_range: (usize, usize),
}

pub struct BuildSummary {
    pub domains: Vec<DomainSummary>,
    pub unknowns: usize,
    pub algebraic: usize,
    pub lband: usize,
    pub uband: usize,
    pub nnz: usize,
    pub density: f64,

    // Rested state
    pub rested_voltage: f64,
    pub anode_x0: f64,
    pub cathode_x0: f64,

    // Run info, filled after steps are solved
    pub steps_run: usize,
    pub steps_failed: usize,
    pub total_time: Option<f64>,
    pub final_voltage: Option<f64>,
    pub residual_calls: usize,
    pub jacobian_calls: usize,
}

impl BuildSummary {
    pub fn from_cell(cell: &P2dCell) -> Self {
        let electrode = |ed: &Electrode| DomainSummary {
            name: ed.kind.name(),
            nx: ed.nx(),
            nr: ed.nr(),
            thickness: ed.thick,
            dx: ed.x_mesh.width(0),
            unknowns: ed.ptr.len(),
            pointer_range: (ed.ptr.start, ed.ptr.end),
        };
        let sep = &cell.separator;
        let domains = vec![
            electrode(&cell.anode),
            DomainSummary {
                name: sep.ptr.domain.name(),
                nx: sep.nx(),
                nr: 0,
                thickness: sep.thick,
                dx: sep.x_mesh.width(0),
                unknowns: sep.ptr.len(),
                pointer_range: (sep.ptr.start, sep.ptr.end),
            },
            electrode(&cell.cathode),
        ];

        let ca = &cell.cathode;
        Self {
            domains,
            unknowns: cell.len(),
            algebraic: cell.algebraic_idx.len(),
            lband: cell.lband(),
            uband: cell.uband(),
            nnz: cell.pattern.nnz(),
            density: cell.pattern.density(),
            rested_voltage: cell.y0[ca.phis_idx[ca.nx() - 1]],
            anode_x0: cell.anode.x_0,
            cathode_x0: ca.x_0,
            steps_run: 0,
            steps_failed: 0,
            total_time: None,
            final_voltage: None,
            residual_calls: 0,
            jacobian_calls: 0,
        }
    }

    pub fn add_steps(&mut self, steps: &[StepSolution]) {
        for step in steps {
            self.steps_run += 1;
            if !step.success {
                self.steps_failed += 1;
            }
            self.residual_calls += step.stats.nfev;
            self.jacobian_calls += step.stats.njev;
            if let (Some(&t), Some(&v)) = (step.time_s.last(), step.voltage_v.last()) {
                self.total_time = Some(t);
                self.final_voltage = Some(v);
            }
        }
    }

    pub fn write_to_file<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let mut file = File::create(path)?;

        writeln!(file, "{}", "=".repeat(60))?;
        writeln!(file, "P2D CELL SUMMARY")?;
        writeln!(file, "{}", "=".repeat(60))?;
        writeln!(file)?;

        writeln!(file, "MESH AND POINTERS")?;
        writeln!(file, "{}", "-".repeat(60))?;
        for d in &self.domains {
            writeln!(file, "{}:", d.name)?;
            writeln!(file, "  Thickness:         {:.6e} m", d.thickness)?;
            writeln!(file, "  Control volumes:   {} (dx = {:.6e} m)", d.nx, d.dx)?;
            if d.nr > 0 {
                writeln!(file, "  Radial volumes:    {}", d.nr)?;
            }
            writeln!(
                file,
                "  Unknowns:          {} at [{}, {})",
                d.unknowns, d.pointer_range.0, d.pointer_range.1
            )?;
        }
        writeln!(file)?;

        writeln!(file, "SYSTEM")?;
        writeln!(file, "{}", "-".repeat(60))?;
        writeln!(file, "Unknowns:            {}", self.unknowns)?;
        writeln!(file, "Algebraic:           {}", self.algebraic)?;
        writeln!(file, "Lower bandwidth:     {}", self.lband)?;
        writeln!(file, "Upper bandwidth:     {}", self.uband)?;
        writeln!(
            file,
            "Jacobian nonzeros:   {} ({:.2}% dense)",
            self.nnz,
            100.0 * self.density
        )?;
        writeln!(file)?;

        writeln!(file, "RESTED STATE")?;
        writeln!(file, "{}", "-".repeat(60))?;
        writeln!(file, "Voltage:             {:.4} V", self.rested_voltage)?;
        writeln!(file, "Anode x0:            {:.4}", self.anode_x0)?;
        writeln!(file, "Cathode x0:          {:.4}", self.cathode_x0)?;
        writeln!(file)?;

        if self.steps_run > 0 {
            writeln!(file, "RUN")?;
            writeln!(file, "{}", "-".repeat(60))?;
            writeln!(
                file,
                "Steps:               {} ({} failed)",
                self.steps_run, self.steps_failed
            )?;
            if let (Some(t), Some(v)) = (self.total_time, self.final_voltage) {
                writeln!(file, "Total time:          {:.3} s", t)?;
                writeln!(file, "Final voltage:       {:.4} V", v)?;
            }
            writeln!(file, "Residual calls:      {}", self.residual_calls)?;
            writeln!(file, "Jacobian calls:      {}", self.jacobian_calls)?;
            writeln!(file)?;
        }

        writeln!(file, "{}", "=".repeat(60))?;

        Ok(())
    }

    pub fn print_to_console(&self) {
        println!("\n{}", "=".repeat(60));
        println!("P2D CELL SUMMARY");
        println!("{}", "=".repeat(60));
        let mesh: Vec<String> = self
            .domains
            .iter()
            .map(|d| match d.nr {
                0 => format!("{} {}", d.name, d.nx),
                nr => format!("{} {}x{}", d.name, d.nx, nr),
            })
            .collect();
        println!("Mesh:          {}", mesh.join(", "));
        println!(
            "Unknowns:      {} ({} algebraic)",
            self.unknowns, self.algebraic
        );
        println!("Bandwidth:     lower={}, upper={}", self.lband, self.uband);
        println!("Rested V:      {:.4} V", self.rested_voltage);
        if self.steps_run > 0 {
            println!(
                "Steps:         {} run, {} failed",
                self.steps_run, self.steps_failed
            );
        }
        if let Some(v) = self.final_voltage {
            println!("Final V:       {:.4} V", v);
        }
        println!("{}\n", "=".repeat(60));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CellConfig;
    use std::fs;

    #[test]
    fn summary_counts_match_the_cell() {
        let cell = P2dCell::build(&CellConfig::default().with_discretization(3, 2)).unwrap();
        let mut summary = BuildSummary::from_cell(&cell);
        assert_eq!(summary.domains.len(), 3);
        assert_eq!(
            summary.domains.iter().map(|d| d.unknowns).sum::<usize>(),
            summary.unknowns
        );
        assert_eq!(summary.domains[0].pointer_range.0, 0);
        assert_eq!(summary.domains[2].pointer_range.1, cell.len());

        summary.add_steps(&[StepSolution {
            success: false,
            ..StepSolution::default()
        }]);
        assert_eq!(summary.steps_failed, 1);

        let path = std::env::temp_dir().join("p2d_summary_test.txt");
        summary.write_to_file(&path).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("Lower bandwidth"));
        assert!(content.contains("1 failed"));
        fs::remove_file(path).ok();
    }
}
