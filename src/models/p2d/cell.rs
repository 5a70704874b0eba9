use tracing::debug;

use super::domains::{Battery, Electrode, Electrolyte, Separator, SEPARATOR_VARS};
use crate::config::{CellConfig, ConfigError, LinearSolverChoice, SolverConfig};
use crate::discretization::generator::stacked_x_meshes;
use crate::discretization::mesh::Mesh;
use crate::discretization::pointer::{DomainKind, DomainLayout, PointerMap};
use crate::numerics::bandwidth::JacobianPattern;
use crate::numerics::integrator::{InitialCondition, IntegratorOptions, LinearSolver};
use crate::physics::control::ControlMode;
use crate::physics::residual::ResidualAssembler;

/// A fully built cell. Immutable; change parameters by building a new one.
#[derive(Clone, Debug)]
pub struct P2dCell {
    pub battery: Battery,
    pub electrolyte: Electrolyte,
    pub anode: Electrode,
    pub separator: Separator,
    pub cathode: Electrode,
    /// Macroscopic mesh from the anode to the cathode collector.
    pub x_mesh: Mesh,
    pub wt_m: Vec<f64>,
    pub wt_p: Vec<f64>,
    pub ptr: PointerMap,
    /// Electrolyte unknowns and properties over the whole cell.
    pub ce_idx: Vec<usize>,
    pub phie_idx: Vec<usize>,
    pub eps_el_x: Vec<f64>,
    /// Bruggeman factor `eps_el^p_liq` of every control volume.
    pub brug_x: Vec<f64>,
    /// Specific surface area, zero in the separator.
    pub a_s_x: Vec<f64>,
    pub algebraic_idx: Vec<usize>,
    /// Rested state.
    pub y0: Vec<f64>,
    pub yp0: Vec<f64>,
    pub pattern: JacobianPattern,
    pub solver: SolverConfig,
}

impl P2dCell {
    pub fn build(config: &CellConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let (an, sep, ca) = (&config.anode, &config.separator, &config.cathode);

        let [an_x, sep_x, ca_x] =
            stacked_x_meshes((an.thick, an.nx), (sep.thick, sep.nx), (ca.thick, ca.nx))?;

        let ptr = PointerMap::build(&[
            DomainLayout {
                domain: DomainKind::Anode,
                vars: Electrode::declarations(an),
                nx: an.nx,
                nr: an.nr,
            },
            DomainLayout {
                domain: DomainKind::Separator,
                vars: &SEPARATOR_VARS,
                nx: sep.nx,
                nr: 0,
            },
            DomainLayout {
                domain: DomainKind::Cathode,
                vars: Electrode::declarations(ca),
                nx: ca.nx,
                nr: ca.nr,
            },
        ])?;
        let domain_ptr = |kind: DomainKind| {
            ptr.domain(kind)
                .cloned()
                .ok_or_else(|| ConfigError::invalid(kind.name(), "missing from the pointer map"))
        };

        let anode = Electrode::new(DomainKind::Anode, an, an_x, domain_ptr(DomainKind::Anode)?)?;
        let separator = Separator::new(sep, sep_x, domain_ptr(DomainKind::Separator)?)?;
        let cathode = Electrode::new(DomainKind::Cathode, ca, ca_x, domain_ptr(DomainKind::Cathode)?)?;

        let x_mesh = Mesh::concat(&[&anode.x_mesh, &separator.x_mesh, &cathode.x_mesh]);
        let (wt_m, wt_p) = x_mesh.interface_weights();

        let ce_idx = [anode.ce_idx.as_slice(), &separator.ce_idx, &cathode.ce_idx].concat();
        let phie_idx = [anode.phie_idx.as_slice(), &separator.phie_idx, &cathode.phie_idx].concat();

        let mut eps_el_x = Vec::with_capacity(x_mesh.len());
        let mut brug_x = Vec::with_capacity(x_mesh.len());
        let mut a_s_x = Vec::with_capacity(x_mesh.len());
        for (nx, eps_el, p_liq, a_s) in [
            (anode.nx(), anode.eps_el, anode.p_liq, anode.a_s),
            (separator.nx(), separator.eps_el, separator.p_liq, 0.0),
            (cathode.nx(), cathode.eps_el, cathode.p_liq, cathode.a_s),
        ] {
            eps_el_x.extend(std::iter::repeat_n(eps_el, nx));
            brug_x.extend(std::iter::repeat_n(eps_el.powf(p_liq), nx));
            a_s_x.extend(std::iter::repeat_n(a_s, nx));
        }

        let mut algebraic_idx = [anode.phis_idx.as_slice(), &cathode.phis_idx, &phie_idx].concat();
        algebraic_idx.sort_unstable();

        let n = ptr.len;
        let mut cell = Self {
            battery: Battery::from(&config.battery),
            electrolyte: Electrolyte::from_config(&config.electrolyte)?,
            anode,
            separator,
            cathode,
            x_mesh,
            wt_m,
            wt_p,
            ptr,
            ce_idx,
            phie_idx,
            eps_el_x,
            brug_x,
            a_s_x,
            algebraic_idx,
            y0: vec![0.0; n],
            yp0: vec![0.0; n],
            pattern: JacobianPattern::empty(),
            solver: config.solver.clone(),
        };

        let (y0, yp0) = cell.rested_state();
        cell.y0 = y0;
        cell.yp0 = yp0;
        let pattern = {
            let rest = cell.assembler(ControlMode::rest());
            JacobianPattern::analyze(&rest, 0.0, &cell.y0, &cell.yp0)
        };
        cell.pattern = pattern;

        debug!(
            unknowns = n,
            algebraic = cell.algebraic_idx.len(),
            lband = cell.pattern.lband,
            uband = cell.pattern.uband,
            "built P2D cell"
        );
        Ok(cell)
    }

    pub fn len(&self) -> usize {
        self.ptr.len
    }

    pub fn is_empty(&self) -> bool {
        self.ptr.len == 0
    }

    pub fn lband(&self) -> usize {
        self.pattern.lband
    }

    pub fn uband(&self) -> usize {
        self.pattern.uband
    }

    /// Residual assembler for `mode`, starting at zero elapsed time.
    pub fn assembler(&self, mode: ControlMode) -> ResidualAssembler<'_> {
        ResidualAssembler::new(self, mode)
    }

    /// Equilibrium state with uniform concentrations.
    ///
    /// The anode solid potential is the reference. Electrolyte and cathode
    /// potentials follow from zero overpotential at the initial surface
    /// fractions, which makes the residual vanish exactly.
    pub fn rested_state(&self) -> (Vec<f64>, Vec<f64>) {
        let temp = self.battery.temp;
        let mut y = vec![0.0; self.len()];
        let yp = vec![0.0; self.len()];

        for ed in [&self.anode, &self.cathode] {
            for &k in &ed.xs_idx {
                y[k] = ed.x_0;
            }
            if let (Some(h), Some(idx)) = (&ed.hysteresis, &ed.hyst_idx) {
                for &k in idx {
                    y[k] = h.hyst0;
                }
            }
        }
        for &k in &self.ce_idx {
            y[k] = self.electrolyte.li_0;
        }

        let hyst0 = |ed: &Electrode| ed.hysteresis.map_or(0.0, |h| h.hyst0);
        let (eeq_an, h_an) = self.anode.open_circuit(self.anode.x_0, hyst0(&self.anode), temp);
        let phie = -(eeq_an + h_an);
        let (eeq_ca, h_ca) = self.cathode.open_circuit(self.cathode.x_0, hyst0(&self.cathode), temp);
        let phis_ca = phie + (eeq_ca + h_ca);

        for &k in &self.anode.phis_idx {
            y[k] = 0.0;
        }
        for &k in &self.phie_idx {
            y[k] = phie;
        }
        for &k in &self.cathode.phis_idx {
            y[k] = phis_ca;
        }
        (y, yp)
    }

    /// Integrator settings derived from the `[solver]` table and the
    /// discovered bandwidths.
    pub fn integrator_options(&self) -> IntegratorOptions {
        let linear_solver = match self.solver.linear_solver {
            LinearSolverChoice::Dense => LinearSolver::Dense,
            LinearSolverChoice::Banded => LinearSolver::Banded {
                lband: self.lband(),
                uband: self.uband(),
            },
        };
        IntegratorOptions {
            rtol: self.solver.rtol,
            atol: self.solver.atol,
            linear_solver,
            algebraic_idx: self.algebraic_idx.clone(),
            initial_condition: InitialCondition::Yp0,
            max_step: (self.solver.max_step > 0.0).then_some(self.solver.max_step),
            ..IntegratorOptions::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HysteresisConfig;

    #[test]
    fn layout_and_algebraic_set() {
        let cell = P2dCell::build(&CellConfig::default().with_discretization(4, 3)).unwrap();
        assert_eq!(cell.len(), 2 * 4 * (3 + 3) + 2 * 4);
        assert_eq!(cell.x_mesh.len(), 12);
        assert_eq!(cell.ce_idx.len(), 12);
        assert_eq!(cell.algebraic_idx.len(), 4 + 4 + 12);
        assert!(cell.algebraic_idx.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(cell.a_s_x[5], 0.0);
        assert!(cell.a_s_x[0] > 0.0);
    }

    #[test]
    fn rested_potentials() {
        let cell = P2dCell::build(&CellConfig::default()).unwrap();
        let v = cell.y0[*cell.cathode.phis_idx.last().unwrap()];
        assert!(v > 3.5 && v < 4.3, "rested voltage {v}");
        assert!(cell.yp0.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn hysteresis_adds_one_variable_per_node() {
        let mut config = CellConfig::default().with_discretization(3, 2);
        config.anode.hysteresis = Some(HysteresisConfig {
            g_hyst: 20.0,
            hyst0: 1.0,
        });
        let cell = P2dCell::build(&config).unwrap();
        assert_eq!(cell.len(), 3 * (2 + 4) + 3 * (2 + 3) + 2 * 3);
        let idx = cell.anode.hyst_idx.as_ref().unwrap();
        assert!(idx.iter().all(|&k| cell.y0[k] == 1.0));
        assert!(cell.cathode.hyst_idx.is_none());
    }

    #[test]
    fn options_follow_solver_table() {
        let mut config = CellConfig::default().with_discretization(3, 2);
        config.solver.linear_solver = LinearSolverChoice::Dense;
        config.solver.max_step = 10.0;
        let opts = P2dCell::build(&config).unwrap().integrator_options();
        assert_eq!(opts.linear_solver, LinearSolver::Dense);
        assert_eq!(opts.max_step, Some(10.0));
        assert_eq!(opts.initial_condition, InitialCondition::Yp0);
    }

    #[test]
    fn invalid_config_fails_before_building() {
        let mut config = CellConfig::default();
        config.battery.area = -1.0;
        assert!(P2dCell::build(&config).is_err());
    }
}
