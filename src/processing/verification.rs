//! Post-run balance checks on solved states.
//!
//! At a converged state the integrated reaction current of the anode is
//! `-i_ext`, that of the cathode is `+i_ext`, and lithium moves between
//! phases without being created. These hold for any mesh, so they are a
//! cheap check on a finished run.

use std::f64::consts::PI;

use crate::discretization::operators::int_r;
use crate::models::p2d::{Electrode, P2dCell, StepSolution};
use crate::physics::constants::F;
use crate::physics::residual::ResidualAssembler;

/// Integrated reaction currents at one state [A/m2].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ReactionBalance {
    pub i_ext: f64,
    /// `sum(a_s * F * sdot * dx)` over the anode.
    pub anode: f64,
    pub cathode: f64,
}

impl ReactionBalance {
    /// Largest deviation from `anode = -i_ext` and `cathode = i_ext`.
    pub fn error(&self) -> f64 {
        (self.anode + self.i_ext)
            .abs()
            .max((self.cathode - self.i_ext).abs())
    }
}

pub fn reaction_balance(
    assembler: &ResidualAssembler<'_>,
    t: f64,
    y: &[f64],
    yp: &[f64],
) -> ReactionBalance {
    let cell = assembler.cell();
    let diag = assembler.diagnostics(t, y, yp);
    let integrate = |ed: &Electrode, sdot: &[f64]| {
        sdot.iter()
            .enumerate()
            .map(|(k, s)| ed.a_s * F * s * ed.x_mesh.width(k))
            .sum::<f64>()
    };
    ReactionBalance {
        i_ext: diag.i_ext,
        anode: integrate(&cell.anode, &diag.sdot_an),
        cathode: integrate(&cell.cathode, &diag.sdot_ca),
    }
}

/// Li+ held by the electrolyte [kmol/m2].
pub fn electrolyte_inventory(cell: &P2dCell, y: &[f64]) -> f64 {
    cell.ce_idx
        .iter()
        .enumerate()
        .map(|(k, &i)| cell.eps_el_x[k] * y[i] * cell.x_mesh.width(k))
        .sum()
}

/// Lithium held by the active material of one electrode [kmol/m2].
///
/// Particles are averaged with the `r²` measure of [`int_r`], which is the
/// quantity the radial discretization conserves. On a coarse particle this
/// differs from the exact shell volumes by `O(1/nr²)`.
pub fn solid_inventory(ed: &Electrode, y: &[f64]) -> f64 {
    let r = &ed.r_mesh;
    let volume = 4.0 * PI * ed.r_s.powi(3) / 3.0;
    let mut xs = vec![0.0; ed.nr()];

    (0..ed.nx())
        .map(|ix| {
            for (ir, v) in xs.iter_mut().enumerate() {
                *v = y[ed.xs_at(ix, ir)];
            }
            let mean = int_r(&r.minus, &r.plus, &xs) / volume;
            ed.eps_am * ed.li_max * mean * ed.x_mesh.width(ix)
        })
        .sum()
}

/// Lithium in both electrodes and the electrolyte [kmol/m2].
pub fn lithium_inventory(cell: &P2dCell, y: &[f64]) -> f64 {
    solid_inventory(&cell.anode, y) + solid_inventory(&cell.cathode, y) + electrolyte_inventory(cell, y)
}

/// Worst balances over every saved point of a step.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StepBalance {
    /// Largest reaction balance error [A/m2].
    pub reaction_error: f64,
    /// Largest relative change of the electrolyte inventory.
    pub electrolyte_drift: f64,
    /// Largest relative change of the total lithium inventory.
    pub lithium_drift: f64,
}

impl StepBalance {
    pub fn within(&self, current_tol: f64, inventory_tol: f64) -> bool {
        self.reaction_error <= current_tol
            && self.electrolyte_drift <= inventory_tol
            && self.lithium_drift <= inventory_tol
    }
}

/// Check every saved point of `solution` against its first point.
///
/// `assembler` must carry the control mode and offset the step ran with.
pub fn check_step(assembler: &ResidualAssembler<'_>, solution: &StepSolution) -> StepBalance {
    let cell = assembler.cell();
    let Some(y_first) = solution.y.first() else {
        return StepBalance::default();
    };
    let el0 = electrolyte_inventory(cell, y_first);
    let li0 = lithium_inventory(cell, y_first);

    let mut balance = StepBalance::default();
    for ((t, y), yp) in solution.t.iter().zip(&solution.y).zip(&solution.yp) {
        let rx = reaction_balance(assembler, *t, y, yp);
        balance.reaction_error = balance.reaction_error.max(rx.error());
        let el = (electrolyte_inventory(cell, y) - el0).abs() / el0;
        let li = (lithium_inventory(cell, y) - li0).abs() / li0;
        balance.electrolyte_drift = balance.electrolyte_drift.max(el);
        balance.lithium_drift = balance.lithium_drift.max(li);
    }
    balance
}
