//! Optional wall-clock instrumentation of the integrator hot paths.
//!
//! Everything here compiles to a pass-through unless the `timing` feature
//! is enabled.

#![allow(unused)]
use std::cell::RefCell;
use std::time::Duration;

#[derive(Default, Clone)]
pub struct TimingStats {
    pub residual_time: Duration,
    pub residual_calls: usize,
    pub jacobian_times: Vec<Duration>,
    pub linear_solve_times: Vec<Duration>,
    pub total_time: Duration,
}

impl TimingStats {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(feature = "timing")]
    pub fn print_summary(&self) {
        if self.residual_calls == 0 {
            return;
        }

        let total_jacobian: Duration = self.jacobian_times.iter().sum();
        let total_linear: Duration = self.linear_solve_times.iter().sum();
        let overhead = self
            .total_time
            .saturating_sub(total_jacobian + total_linear);

        println!("\n{}", "=".repeat(60));
        println!("{:^60}", "INTEGRATOR TIMING SUMMARY");
        println!("{}", "=".repeat(60));
        println!(
            "Total integration time:        {:.3}s",
            self.total_time.as_secs_f64()
        );
        println!("{}", "-".repeat(60));
        println!("Component breakdown:");
        println!(
            "  Residual evaluations:      {:>9.3}ms  ({} calls, avg: {:>7.3}us)",
            self.residual_time.as_secs_f64() * 1000.0,
            self.residual_calls,
            self.residual_time.as_secs_f64() * 1e6 / self.residual_calls as f64
        );
        println!(
            "  Jacobian assembly:         {:>9.3}ms  (avg: {:>9.3}ms)",
            total_jacobian.as_secs_f64() * 1000.0,
            total_jacobian.as_secs_f64() * 1000.0 / self.jacobian_times.len().max(1) as f64
        );
        println!(
            "  Linear solve:              {:>9.3}ms  (avg: {:>9.3}ms)",
            total_linear.as_secs_f64() * 1000.0,
            total_linear.as_secs_f64() * 1000.0 / self.linear_solve_times.len().max(1) as f64
        );
        println!("{}", "=".repeat(60));
        println!(
            "Overhead/Other:                {:>9.3}ms\n",
            overhead.as_secs_f64() * 1000.0
        );
    }

    #[cfg(not(feature = "timing"))]
    pub fn print_summary(&self) {}
}

#[cfg(feature = "timing")]
thread_local! {
    static TIMING_STATS: RefCell<TimingStats> = RefCell::new(TimingStats::new());
}

#[cfg(feature = "timing")]
pub fn reset_timing() {
    TIMING_STATS.with(|stats| {
        *stats.borrow_mut() = TimingStats::new();
    });
}

#[cfg(not(feature = "timing"))]
pub fn reset_timing() {}

#[cfg(feature = "timing")]
pub fn record_residual<F, R>(f: F) -> R
where
    F: FnOnce() -> R,
{
    let start = std::time::Instant::now();
    let result = f();
    let elapsed = start.elapsed();
    TIMING_STATS.with(|stats| {
        let mut s = stats.borrow_mut();
        s.residual_time += elapsed;
        s.residual_calls += 1;
    });
    result
}

#[cfg(not(feature = "timing"))]
pub fn record_residual<F, R>(f: F) -> R
where
    F: FnOnce() -> R,
{
    f()
}

#[cfg(feature = "timing")]
pub fn record_jacobian<F, R>(f: F) -> R
where
    F: FnOnce() -> R,
{
    let start = std::time::Instant::now();
    let result = f();
    let elapsed = start.elapsed();
    TIMING_STATS.with(|stats| {
        stats.borrow_mut().jacobian_times.push(elapsed);
    });
    result
}

#[cfg(not(feature = "timing"))]
pub fn record_jacobian<F, R>(f: F) -> R
where
    F: FnOnce() -> R,
{
    f()
}

#[cfg(feature = "timing")]
pub fn record_linear_solve<F, R>(f: F) -> R
where
    F: FnOnce() -> R,
{
    let start = std::time::Instant::now();
    let result = f();
    let elapsed = start.elapsed();
    TIMING_STATS.with(|stats| {
        stats.borrow_mut().linear_solve_times.push(elapsed);
    });
    result
}

#[cfg(not(feature = "timing"))]
pub fn record_linear_solve<F, R>(f: F) -> R
where
    F: FnOnce() -> R,
{
    f()
}

#[cfg(feature = "timing")]
pub fn finalize_timing(total_time: Duration) -> TimingStats {
    TIMING_STATS.with(|stats| {
        let mut s = stats.borrow_mut();
        s.total_time = total_time;
        s.clone()
    })
}

#[cfg(not(feature = "timing"))]
pub fn finalize_timing(_total_time: Duration) -> TimingStats {
    TimingStats::new()
}

#[cfg(feature = "timing")]
pub fn finalize_and_print(total_time: Duration) {
    finalize_timing(total_time).print_summary();
}

#[cfg(not(feature = "timing"))]
pub fn finalize_and_print(_total_time: Duration) {}
