use approx::assert_abs_diff_eq;

use p2d_rs::config::CellConfig;
use p2d_rs::models::p2d::{LimitEvents, P2dCell, Simulation, Step};
use p2d_rs::numerics::events::{Direction, EventFunction, Limit, Quantity, Terminal};
use p2d_rs::physics::control::{ControlMode, Profile};

/// 2 A at t = 0, down through 1 A at t = 2 s, back up through 1 A at t = 5 s.
fn dipping_current() -> ControlMode {
    ControlMode::amperes(Profile::function(|t| 1.0 + 0.1 * (t - 2.0) * (t - 5.0)))
}

/// Steps are capped well below the 3 s between the two crossings so that
/// no single step jumps over both.
fn small_cell() -> P2dCell {
    let mut config = CellConfig::default().with_discretization(3, 2);
    config.solver.max_step = 0.5;
    P2dCell::build(&config).unwrap()
}

#[test]
fn event_values_follow_the_profile() {
    let cell = small_cell();
    let assembler = cell.assembler(dipping_current());
    let limits = [Limit::new(Quantity::CurrentA, 1.0)];
    let events = LimitEvents::new(&assembler, &limits);

    let mut out = [0.0];
    for (t, expected) in [(0.0, 1.0), (2.0, 0.0), (3.5, -0.225), (5.0, 0.0)] {
        events.evaluate(t, &cell.y0, &cell.yp0, &mut out);
        assert_abs_diff_eq!(out[0], expected, epsilon = 1e-12);
    }
}

#[test]
fn increasing_filter_fires_on_the_upward_crossing_only() {
    let cell = small_cell();
    let mut sim = Simulation::new(&cell);
    let step = Step::new(dipping_current(), 10.0).limit(
        Limit::new(Quantity::CurrentA, 1.0).direction(Direction::Increasing),
    );
    let sol = sim.run_step(&step);

    assert!(sol.success, "{}", sol.message);
    assert!(sol.on_event);
    assert_eq!(sol.t_events.len(), 1);
    assert_abs_diff_eq!(sol.t_events[0], 5.0, epsilon = 1e-3);
    assert_abs_diff_eq!(*sol.t.last().unwrap(), 5.0, epsilon = 1e-3);
    assert_abs_diff_eq!(*sol.current_a.last().unwrap(), 1.0, epsilon = 1e-3);
}

#[test]
fn decreasing_filter_fires_on_the_downward_crossing() {
    let cell = small_cell();
    let mut sim = Simulation::new(&cell);
    let step = Step::new(dipping_current(), 10.0).limit(
        Limit::new(Quantity::CurrentA, 1.0).direction(Direction::Decreasing),
    );
    let sol = sim.run_step(&step);

    assert!(sol.on_event);
    assert_abs_diff_eq!(sol.t_events[0], 2.0, epsilon = 1e-3);
}

#[test]
fn recorded_events_do_not_stop_the_step() {
    let cell = small_cell();
    let mut sim = Simulation::new(&cell);
    let step = Step::new(dipping_current(), 8.0)
        .points(9)
        .limit(Limit::new(Quantity::CurrentA, 1.0).terminal(Terminal::Record));
    let sol = sim.run_step(&step);

    assert!(sol.success, "{}", sol.message);
    assert!(!sol.on_event);
    assert_eq!(sol.len(), 9);
    assert_eq!(sol.t_events.len(), 2);
    assert_abs_diff_eq!(sol.t_events[0], 2.0, epsilon = 1e-3);
    assert_abs_diff_eq!(sol.t_events[1], 5.0, epsilon = 1e-3);
    assert_eq!(sol.i_events, vec![0, 0]);
}

#[test]
fn stop_after_waits_for_the_second_crossing() {
    let cell = small_cell();
    let mut sim = Simulation::new(&cell);
    let step = Step::new(dipping_current(), 10.0)
        .limit(Limit::new(Quantity::CurrentA, 1.0).terminal(Terminal::StopAfter(2)));
    let sol = sim.run_step(&step);

    assert!(sol.on_event);
    assert_eq!(sol.t_events.len(), 2);
    assert_abs_diff_eq!(*sol.t.last().unwrap(), 5.0, epsilon = 1e-3);
}

#[test]
fn time_limits_use_the_total_time() {
    let cell = small_cell();
    let mut sim = Simulation::new(&cell);
    sim.run_step(&Step::rest(30.0));

    let step = Step::rest(60.0).limit(Limit::new(Quantity::TimeMin, 1.0));
    let sol = sim.run_step(&step);
    assert!(sol.on_event);
    assert_abs_diff_eq!(*sol.t.last().unwrap(), 30.0, epsilon = 1e-6);
    assert_abs_diff_eq!(sim.t_offset(), 60.0, epsilon = 1e-6);
}
