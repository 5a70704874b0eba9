use approx::assert_relative_eq;

use p2d_rs::config::CellConfig;
use p2d_rs::models::p2d::{P2dCell, Simulation, Step};
use p2d_rs::numerics::events::{Direction, Limit, Quantity};
use p2d_rs::physics::control::ControlMode;
use p2d_rs::processing::verification::{check_step, lithium_inventory, reaction_balance};

const CUTOFF: f64 = 3.0;

fn test_cell() -> P2dCell {
    let mut config = CellConfig::default();
    config.anode.nx = 5;
    config.anode.nr = 3;
    config.separator.nx = 3;
    config.cathode.nx = 5;
    config.cathode.nr = 3;
    config.solver.rtol = 1e-5;
    config.solver.atol = 1e-8;
    P2dCell::build(&config).unwrap()
}

fn cutoff() -> Limit {
    Limit::new(Quantity::VoltageV, CUTOFF).direction(Direction::Decreasing)
}

#[test]
fn two_c_discharge_from_rest() {
    let cell = test_cell();
    let mut sim = Simulation::new(&cell);
    let step = Step::new(ControlMode::c_rate(-2.0), 1350.0)
        .points(150)
        .limit(cutoff());
    let sol = sim.run_step(&step);

    assert!(sol.success, "{}", sol.message);
    assert!(sol.len() >= 2);
    if !sol.on_event {
        assert_eq!(sol.len(), 150);
    }

    for w in sol.voltage_v.windows(2) {
        assert!(w[1] < w[0], "voltage rose from {} to {}", w[0], w[1]);
    }
    let v_end = *sol.voltage_v.last().unwrap();
    if !sol.on_event {
        assert!(v_end > CUTOFF, "final voltage {v_end}");
    }

    // -2C on a 2.5 A*h cell
    for i in &sol.current_a {
        assert_relative_eq!(*i, -5.0, max_relative = 1e-12);
    }

    let assembler = cell.assembler(step.mode.clone());
    let balance = check_step(&assembler, &sol);
    assert!(
        balance.within(0.01 * 50.0, 1e-4),
        "balances off: {balance:?}"
    );
}

#[test]
fn lithium_is_conserved_with_unequal_particle_meshes() {
    let mut config = CellConfig::default();
    config.anode.nx = 4;
    config.anode.nr = 3;
    config.separator.nx = 2;
    config.cathode.nx = 4;
    config.cathode.nr = 8;
    let cell = P2dCell::build(&config).unwrap();

    let mut sim = Simulation::new(&cell);
    let step = Step::new(ControlMode::c_rate(-2.0), 900.0)
        .points(31)
        .limit(cutoff());
    let sol = sim.run_step(&step);
    assert!(sol.success, "{}", sol.message);

    let li0 = lithium_inventory(&cell, &cell.y0);
    for y in &sol.y {
        let drift = (lithium_inventory(&cell, y) - li0).abs() / li0;
        assert!(drift < 1e-10, "lithium drift {drift:e}");
    }

    let assembler = cell.assembler(step.mode.clone());
    assert!(check_step(&assembler, &sol).lithium_drift < 1e-10);
}

#[test]
fn electrolyte_current_ends_match_the_collectors() {
    let cell = test_cell();
    let mut sim = Simulation::new(&cell);
    let step = Step::new(ControlMode::c_rate(-1.0), 120.0).points(5);
    let sol = sim.run_step(&step);
    assert!(sol.success, "{}", sol.message);

    let assembler = cell.assembler(step.mode.clone());
    let (y, yp) = sol.final_state().unwrap();
    let t = *sol.t.last().unwrap();
    let diag = assembler.diagnostics(t, y, yp);

    // no ionic current through the collectors
    assert_eq!(diag.i_el_x[0], 0.0);
    assert_eq!(*diag.i_el_x.last().unwrap(), 0.0);

    // the separator carries the whole cell current in the electrolyte
    let n_an = cell.anode.nx();
    for k in n_an..n_an + cell.separator.nx() {
        assert_relative_eq!(diag.sum_ip[k], -diag.i_ext, max_relative = 1e-3);
    }

    let rx = reaction_balance(&assembler, t, y, yp);
    assert_relative_eq!(rx.anode, -rx.i_ext, max_relative = 1e-3);
    assert_relative_eq!(rx.cathode, rx.i_ext, max_relative = 1e-3);
}

#[test]
fn steps_chain_through_rest_and_voltage_hold() {
    let cell = test_cell();
    let mut sim = Simulation::new(&cell);

    let discharge = sim.run_step(&Step::new(ControlMode::c_rate(-1.0), 300.0).points(11));
    assert!(discharge.success, "{}", discharge.message);
    let v_loaded = *discharge.voltage_v.last().unwrap();

    let rest = sim.run_step(&Step::rest(300.0).points(11));
    assert!(rest.success, "{}", rest.message);
    assert_eq!(rest.t_offset, 300.0);
    assert_relative_eq!(rest.time_s[0], 300.0);
    // the first point is the relaxed-current state, voltage recovers from there
    assert!(rest.voltage_v[0] > v_loaded);
    assert!(rest.voltage_v.last().unwrap() >= &rest.voltage_v[1]);
    for i in &rest.current_a {
        assert_eq!(*i, 0.0);
    }

    let v_hold = rest.voltage_v.last().unwrap() - 0.05;
    let hold = sim.run_step(&Step::new(ControlMode::voltage(v_hold), 60.0).points(7));
    assert!(hold.success, "{}", hold.message);
    for v in &hold.voltage_v[1..] {
        assert_relative_eq!(*v, v_hold, max_relative = 1e-6);
    }
    // holding below the rested voltage draws a discharge current
    assert!(hold.current_a.iter().skip(1).all(|&i| i < 0.0));
    assert_relative_eq!(sim.t_offset(), 660.0, max_relative = 1e-12);
}

#[test]
fn power_mode_tracks_the_setpoint() {
    let cell = test_cell();
    let mut sim = Simulation::new(&cell);
    let sol = sim.run_step(&Step::new(ControlMode::power(-10.0), 120.0).points(5));
    assert!(sol.success, "{}", sol.message);

    for p in &sol.power_w {
        assert_relative_eq!(*p, -10.0, max_relative = 1e-4);
    }
    assert!(sol.current_a.iter().all(|&i| i < 0.0));
    let n = sol.len();
    assert!(sol.current_a[n - 1] < sol.current_a[0], "current magnitude grows as V sags");
}
