//! Run statistics aggregated from simulation events

use log::info;
use std::collections::BTreeMap;

use super::apb::ApbOutcome;
use super::events::{CrashCause, SimEvent};

/// Counters collected over a whole simulation run
#[derive(Debug, Clone, Default)]
pub struct SimulationStats {
    pub total_cars_spawned: u32,
    pub total_cars_exited: u32,
    pub crashes: BTreeMap<String, u32>,
    pub uturns: u32,
    pub roundabout_exits: u32,
    pub roundabout_laps: u32,
    pub hits: u32,
    pub coins_earned: u32,
    pub runs_caught: u32,
    pub runs_evaded: u32,
    pub active_cars: usize,
    pub elapsed_time: f32,
}

impl SimulationStats {
    pub fn record(&mut self, events: &[SimEvent]) {
        for event in events {
            match event {
                SimEvent::VehicleSpawned { .. } => self.total_cars_spawned += 1,
                SimEvent::VehicleExited { .. } => self.total_cars_exited += 1,
                SimEvent::Crash { cause, .. } => {
                    *self.crashes.entry(crash_label(*cause).to_string()).or_default() += 1;
                }
                SimEvent::UTurn { .. } => self.uturns += 1,
                SimEvent::RoundaboutExit { laps, .. } => {
                    self.roundabout_exits += 1;
                    self.roundabout_laps += laps;
                }
                SimEvent::HitCredited { coins, .. } => {
                    self.hits += 1;
                    self.coins_earned += coins;
                }
                SimEvent::RunResolved(result) => {
                    self.coins_earned += result.bonus + result.evasion;
                    match result.result {
                        ApbOutcome::Caught => self.runs_caught += 1,
                        ApbOutcome::Evaded => self.runs_evaded += 1,
                    }
                }
                SimEvent::RunStarted { .. } | SimEvent::Captured { .. } => {}
            }
        }
    }

    pub fn total_crashes(&self) -> u32 {
        self.crashes.values().sum()
    }

    /// Log the end-of-run report
    pub fn log_report(&self) {
        info!("=== SIMULATION COMPLETE ===");
        info!("Elapsed time: {:.2}s", self.elapsed_time);
        info!("Total vehicles spawned: {}", self.total_cars_spawned);
        info!("Total vehicles exited: {}", self.total_cars_exited);
        info!("Active vehicles: {}", self.active_cars);
        info!("Total crashes: {}", self.total_crashes());
        for (cause, count) in &self.crashes {
            info!("  {}: {}", cause, count);
        }
        info!("U-turns: {}", self.uturns);
        info!(
            "Roundabout exits: {} (avg {:.1} laps)",
            self.roundabout_exits,
            if self.roundabout_exits > 0 {
                self.roundabout_laps as f32 / self.roundabout_exits as f32
            } else {
                0.0
            }
        );
        info!("APB runs: {} evaded, {} caught", self.runs_evaded, self.runs_caught);
        info!("APB hits: {} ({} coins earned)", self.hits, self.coins_earned);
    }
}

fn crash_label(cause: CrashCause) -> &'static str {
    match cause {
        CrashCause::RearEnd => "rear-end",
        CrashCause::Chaos => "chaos",
        CrashCause::DeadEnd => "dead-end",
        CrashCause::Boxed => "boxed",
    }
}
