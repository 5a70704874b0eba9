use p2d_rs::config::{CellConfig, HysteresisConfig};
use p2d_rs::discretization::pointer::DomainKind;
use p2d_rs::materials::{ActiveMaterial, GraphiteFast, Nmc532Fast};
use p2d_rs::models::p2d::{P2dCell, Simulation, Step};
use p2d_rs::physics::control::ControlMode;
use p2d_rs::processing::csv_writer::write_xy;

fn max_abs(v: &[f64]) -> f64 {
    v.iter().fold(0.0, |m, x| m.max(x.abs()))
}

#[test]
fn rested_residual_vanishes_for_every_discretization() {
    let sizes = [1, 2, 5];
    let hysteresis = [
        None,
        Some(HysteresisConfig {
            g_hyst: 15.0,
            hyst0: -0.5,
        }),
    ];

    for &n_an in &sizes {
        for &n_sep in &sizes {
            for &n_ca in &sizes {
                for &nr in &sizes {
                    for hyst in &hysteresis {
                        let mut config = CellConfig::default();
                        config.anode.nx = n_an;
                        config.anode.nr = nr;
                        config.separator.nx = n_sep;
                        config.cathode.nx = n_ca;
                        config.cathode.nr = nr;
                        config.anode.hysteresis = hyst.clone();
                        config.cathode.hysteresis = hyst.clone();

                        let cell = P2dCell::build(&config).unwrap();
                        assert!(cell.ptr.is_bijection());

                        let rest = cell.assembler(ControlMode::rest());
                        let mut res = vec![1.0; cell.len()];
                        rest.residual(0.0, &cell.y0, &cell.yp0, &mut res);
                        let err = max_abs(&res);
                        assert!(
                            err <= 1e-8,
                            "an={n_an} sep={n_sep} ca={n_ca} nr={nr} hyst={} -> {err:.3e}",
                            hyst.is_some()
                        );
                    }
                }
            }
        }
    }
}

#[test]
fn rested_cell_is_also_a_fixed_point_in_voltage_mode() {
    let cell = P2dCell::build(&CellConfig::default().with_discretization(4, 3)).unwrap();
    let v0 = cell.y0[*cell.cathode.phis_idx.last().unwrap()];
    let hold = cell.assembler(ControlMode::voltage(v0));
    let mut res = vec![0.0; cell.len()];
    hold.residual(0.0, &cell.y0, &cell.yp0, &mut res);
    assert!(max_abs(&res) <= 1e-8);
}

#[test]
fn bandwidth_regression() {
    let cell = P2dCell::build(&CellConfig::default().with_discretization(10, 5)).unwrap();
    assert_eq!(cell.lband(), 9);
    assert_eq!(cell.uband(), 9);

    let an = cell.ptr.domain(DomainKind::Anode).unwrap();
    assert_eq!(an.x_stride, 5 + 3);
    assert_eq!(cell.len(), 2 * 10 * 8 + 10 * 2);
}

#[test]
fn toml_cell_builds_with_requested_mesh() {
    let config = CellConfig::from_toml_str(
        r#"
        [battery]
        cap = 2.0
        temp = 298.15
        area = 0.08

        [anode]
        nx = 4
        nr = 6
        thick = 80e-6
        r_s = 5e-6
        eps_s = 0.58
        eps_el = 0.32
        eps_cbd = 0.04
        li_max = 30.53
        x_0 = 0.75
        material = "graphite"

        [anode.hysteresis]
        g_hyst = 20.0
        hyst0 = 0.0

        [solver]
        rtol = 1e-5
        linear_solver = "dense"
        "#,
    )
    .unwrap();
    let cell = P2dCell::build(&config).unwrap();

    assert_eq!(cell.anode.nr(), 6);
    assert!(cell.anode.hyst_idx.is_some());
    assert_eq!(cell.cathode.nx(), 10);
    assert_eq!(cell.battery.area, 0.08);
    assert_eq!(cell.integrator_options().rtol, 1e-5);
}

#[test]
fn inconsistent_configs_are_rejected() {
    let mut config = CellConfig::default();
    config.cathode.eps_s = 0.8;
    config.cathode.eps_el = 0.3;
    assert!(P2dCell::build(&config).is_err());

    let mut config = CellConfig::default();
    config.anode.material = "unobtainium".to_string();
    assert!(P2dCell::build(&config).is_err());

    assert!(CellConfig::from_toml_str("[battery]\ncap = \"big\"").is_err());
}

fn sample_table(path: &std::path::Path, material: &dyn ActiveMaterial, lo: f64, hi: f64, n: usize) {
    let xs: Vec<f64> = (0..n).map(|k| lo + (hi - lo) * k as f64 / (n - 1) as f64).collect();
    let vs: Vec<f64> = xs.iter().map(|&x| material.equilibrium_potential(x, 298.15)).collect();
    write_xy(path, "x", "V", &xs, &vs).unwrap();
}

#[test]
fn tabulated_materials_build_and_run() {
    let dir = std::env::temp_dir().join("p2d_tabulated_cell");
    std::fs::create_dir_all(&dir).unwrap();
    let graphite_csv = dir.join("graphite.csv");
    let nmc_csv = dir.join("nmc532.csv");
    sample_table(&graphite_csv, &GraphiteFast::new(0.5, 0.5, 30.53), 0.05, 0.95, 91);
    sample_table(&nmc_csv, &Nmc532Fast::new(0.5, 0.5), 0.30, 0.95, 66);

    let fast = P2dCell::build(&CellConfig::default().with_discretization(3, 3)).unwrap();

    let mut config = CellConfig::default().with_discretization(3, 3);
    config.anode.material = "graphiteslowextrap".into();
    config.anode.ocv_table = Some(graphite_csv);
    config.cathode.material = "nmc532slow".into();
    config.cathode.ocv_table = Some(nmc_csv);
    let cell = P2dCell::build(&config).unwrap();

    let rest = cell.assembler(ControlMode::rest());
    let mut res = vec![1.0; cell.len()];
    rest.residual(0.0, &cell.y0, &cell.yp0, &mut res);
    assert!(max_abs(&res) <= 1e-8);

    let v = |c: &P2dCell| c.y0[*c.cathode.phis_idx.last().unwrap()];
    assert!((v(&cell) - v(&fast)).abs() < 1e-3, "{} vs {}", v(&cell), v(&fast));

    let mut sim = Simulation::new(&cell);
    let sol = sim.run_step(&Step::new(ControlMode::c_rate(-1.0), 60.0).points(4));
    assert!(sol.success, "{}", sol.message);
    assert!(sol.voltage_v[3] < sol.voltage_v[0]);
}

#[test]
fn tabulated_material_without_readable_table_fails_to_build() {
    let mut config = CellConfig::default().with_discretization(2, 2);
    config.cathode.material = "nmc532slow".into();
    assert!(P2dCell::build(&config).is_err());

    config.cathode.ocv_table = Some(std::env::temp_dir().join("p2d_no_such_table.csv"));
    assert!(P2dCell::build(&config).is_err());
}
