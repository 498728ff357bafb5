//! Periodic sampler recommending indexing concurrency from thermal state,
//! available memory, and low-power mode (spec §4.12). The monitor only
//! recommends; the scheduler is responsible for applying the recommendation.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

const SAMPLE_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThermalState {
    Nominal,
    Fair,
    Serious,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PerformanceMode {
    FullSpeed,
    Balanced,
    Background,
}

impl PerformanceMode {
    fn initial_concurrency(self) -> usize {
        match self {
            PerformanceMode::FullSpeed => 4,
            PerformanceMode::Balanced => 2,
            PerformanceMode::Background => 1,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ResourceSample {
    pub thermal_state: ThermalState,
    pub available_memory_bytes: u64,
    pub low_power_mode: bool,
}

/// Supplies the raw OS signals the monitor samples; the actual platform
/// query is pluggable (spec.md §1 Non-goals: OS integration out of scope).
pub trait ResourceSampler: Send + Sync {
    fn sample(&self) -> ResourceSample;
}

const LOW_MEMORY_THRESHOLD_BYTES: u64 = 512 * 1024 * 1024;

/// Current recommended concurrency, updated on a 5s tick and read by the
/// scheduler without blocking on the monitor task.
pub struct ResourceMonitor {
    mode: PerformanceMode,
    recommended: AtomicUsize,
}

impl ResourceMonitor {
    pub fn new(mode: PerformanceMode) -> Self {
        Self { mode, recommended: AtomicUsize::new(mode.initial_concurrency()) }
    }

    pub fn recommended_concurrency(&self) -> usize {
        self.recommended.load(Ordering::Relaxed)
    }

    fn recompute(&self, sample: ResourceSample) -> usize {
        let cap = recommend(self.mode, sample);
        self.recommended.store(cap, Ordering::Relaxed);
        cap
    }

    /// Runs the 5s sampling loop until `shutdown` resolves, invoking
    /// `on_tick` with the recomputed cap after every sample so a caller
    /// (the scheduler) can resize concurrency immediately rather than
    /// waiting for the loop to exit. Intended to be spawned as its own task
    /// alongside the scheduler.
    pub async fn run(
        &self,
        sampler: &dyn ResourceSampler,
        mut shutdown: tokio::sync::watch::Receiver<bool>,
        on_tick: impl Fn(usize),
    ) {
        let mut interval = tokio::time::interval(SAMPLE_INTERVAL);
        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                _ = interval.tick() => {
                    on_tick(self.recompute(sampler.sample()));
                }
            }
        }
    }
}

/// Pure recommendation function (spec §4.12): thermal serious/critical and
/// low available memory both monotonically reduce the cap, never raise it
/// above the performance mode's initial value.
fn recommend(mode: PerformanceMode, sample: ResourceSample) -> usize {
    if sample.available_memory_bytes < LOW_MEMORY_THRESHOLD_BYTES {
        return 1;
    }

    let initial = mode.initial_concurrency();
    let thermal_cap = match sample.thermal_state {
        ThermalState::Nominal | ThermalState::Fair => initial,
        ThermalState::Serious => (initial / 2).max(1),
        ThermalState::Critical => 1,
    };

    if sample.low_power_mode {
        thermal_cap.min(1)
    } else {
        thermal_cap
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(thermal: ThermalState, memory: u64, low_power: bool) -> ResourceSample {
        ResourceSample { thermal_state: thermal, available_memory_bytes: memory, low_power_mode: low_power }
    }

    #[test]
    fn nominal_thermal_uses_full_initial_concurrency() {
        let cap = recommend(PerformanceMode::FullSpeed, sample(ThermalState::Nominal, 2 * 1024 * 1024 * 1024, false));
        assert_eq!(cap, 4);
    }

    #[test]
    fn serious_thermal_halves_concurrency() {
        let cap = recommend(PerformanceMode::FullSpeed, sample(ThermalState::Serious, 2 * 1024 * 1024 * 1024, false));
        assert_eq!(cap, 2);
    }

    #[test]
    fn critical_thermal_forces_single_concurrency() {
        let cap = recommend(PerformanceMode::FullSpeed, sample(ThermalState::Critical, 2 * 1024 * 1024 * 1024, false));
        assert_eq!(cap, 1);
    }

    #[test]
    fn low_memory_pauses_admission_regardless_of_thermal() {
        let cap = recommend(PerformanceMode::FullSpeed, sample(ThermalState::Nominal, 10 * 1024 * 1024, false));
        assert_eq!(cap, 1);
    }

    #[test]
    fn low_power_mode_caps_at_one() {
        let cap = recommend(PerformanceMode::Balanced, sample(ThermalState::Nominal, 2 * 1024 * 1024 * 1024, true));
        assert_eq!(cap, 1);
    }

    #[tokio::test]
    async fn monitor_updates_recommended_value_on_recompute() {
        let monitor = ResourceMonitor::new(PerformanceMode::FullSpeed);
        assert_eq!(monitor.recommended_concurrency(), 4);
        monitor.recompute(sample(ThermalState::Critical, 2 * 1024 * 1024 * 1024, false));
        assert_eq!(monitor.recommended_concurrency(), 1);
    }
}
