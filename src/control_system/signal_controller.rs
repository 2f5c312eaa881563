use crate::control_system::config::{BucketTable, ConfigError, SignalConfig};
use crate::detection::count_source::TrafficCountSource;
use std::sync::Arc;

/// Scheduling mode. The controller starts `Fixed` and flips to `Adaptive`
/// exactly once, on the first phase-0 exit; it never reverts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerMode {
    Fixed,
    Adaptive,
}

/// One right-of-way assignment: which approach groups are green, and the
/// current target duration of the phase.
#[derive(Debug, Clone)]
pub struct SignalPhase {
    pub green: Vec<bool>,
    pub duration: f64,
}

/// Per-intersection signal controller. Owns phase geometry and timing
/// state; reads traffic counts through an injected [`TrafficCountSource`]
/// and is driven by one `tick(now)` call per simulation step.
pub struct SignalController {
    phases: Vec<SignalPhase>,
    bucket_tables: Vec<BucketTable>,
    phase_index: usize,
    mode: ControllerMode,
    adaptive_enabled: bool,
    phase_start: f64,
    correction_pending: bool,
    counts: Arc<dyn TrafficCountSource>,
    vehicles_passed: u64,
}

impl SignalController {
    pub fn new(
        config: SignalConfig,
        counts: Arc<dyn TrafficCountSource>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let phases = config
            .phases
            .iter()
            .zip(&config.initial_durations)
            .map(|(green, &duration)| SignalPhase {
                green: green.clone(),
                duration,
            })
            .collect();
        Ok(Self {
            phases,
            bucket_tables: config.bucket_tables,
            phase_index: 0,
            mode: ControllerMode::Fixed,
            adaptive_enabled: config.adaptive_enabled,
            phase_start: 0.0,
            correction_pending: false,
            counts,
            vehicles_passed: 0,
        })
    }

    /// Advances the state machine by one step. `now` must be monotonically
    /// non-decreasing across calls; a repeated `now` is a no-op.
    pub fn tick(&mut self, now: f64) {
        match self.mode {
            ControllerMode::Fixed => self.tick_fixed(now),
            ControllerMode::Adaptive => self.tick_adaptive(now),
        }
    }

    fn tick_fixed(&mut self, now: f64) {
        let elapsed = now - self.phase_start;
        if elapsed <= self.phases[self.phase_index].duration {
            return;
        }
        let leaving = self.phase_index;
        self.phase_index = (self.phase_index + 1) % self.phases.len();
        self.phase_start = now;
        self.correction_pending = false;
        if leaving == 0 && self.adaptive_enabled {
            // One-shot flip; no density computation on this transition.
            self.mode = ControllerMode::Adaptive;
            log::info!(
                "entering adaptive mode at t={:.1}, phase {}",
                now,
                self.phase_index
            );
        }
    }

    fn tick_adaptive(&mut self, now: f64) {
        let elapsed = now - self.phase_start;
        let current = self.phase_index;
        if elapsed > self.phases[current].duration {
            let next = (current + 1) % self.phases.len();
            let density = self.green_density(next);
            self.phases[next].duration = self.bucket_tables[next].duration_for(density);
            self.phase_index = next;
            self.phase_start = now;
            self.correction_pending = true;
            log::info!(
                "t={:.1}: phase {} green for {:.1}s (density {:.1})",
                now,
                next,
                self.phases[next].duration,
                density
            );
            return;
        }
        if self.correction_pending && elapsed > self.phases[current].duration / 2.0 {
            self.correct_midphase(now);
            self.correction_pending = false;
        }
    }

    /// The one permitted mid-phase correction: compare the density on the
    /// groups currently green against the density waiting on the cross
    /// groups, and rescale the remaining green accordingly.
    fn correct_midphase(&mut self, now: f64) {
        let current = self.phase_index;
        let next = (current + 1) % self.phases.len();
        let active = self.green_density(current);
        let cross = self.green_density(next);
        let before = self.phases[current].duration;
        if current == 0 {
            // The >= 0 guards are vestigial for non-negative counts but
            // intentionally kept: when both densities sit below 5 the two
            // scalings fire together and cancel, holding the duration
            // steady.
            if cross >= 0.0 && active < 5.0 {
                self.phases[current].duration /= 1.5;
            }
            if cross < 5.0 && active >= 0.0 {
                self.phases[current].duration *= 1.5;
            }
        } else {
            if cross >= 10.0 && active < 5.0 {
                self.phases[current].duration /= 1.5;
            } else if cross < 5.0 && active >= 10.0 {
                self.phases[current].duration *= 1.5;
            }
        }
        let after = self.phases[current].duration;
        if (after - before).abs() > f64::EPSILON {
            log::info!(
                "t={:.1}: mid-phase correction on phase {}: {:.1}s -> {:.1}s (active {:.1}, cross {:.1})",
                now,
                current,
                before,
                after,
                active,
                cross
            );
        }
    }

    /// Mean weighted density over the groups that are green in `phase`.
    fn green_density(&self, phase: usize) -> f64 {
        let groups: Vec<usize> = self.phases[phase]
            .green
            .iter()
            .enumerate()
            .filter_map(|(g, &on)| on.then_some(g))
            .collect();
        if groups.is_empty() {
            return 0.0;
        }
        let sum: f64 = groups
            .iter()
            .map(|&g| self.counts.counts(g).weighted())
            .sum();
        sum / groups.len() as f64
    }

    /// Right-of-way vector of the active phase, indexed by approach group.
    pub fn current_phase(&self) -> &[bool] {
        &self.phases[self.phase_index].green
    }

    pub fn is_group_green(&self, group: usize) -> bool {
        self.current_phase().get(group).copied().unwrap_or(false)
    }

    pub fn phase_index(&self) -> usize {
        self.phase_index
    }

    pub fn phase_count(&self) -> usize {
        self.phases.len()
    }

    pub fn group_count(&self) -> usize {
        self.phases[0].green.len()
    }

    pub fn mode(&self) -> ControllerMode {
        self.mode
    }

    /// Current target duration for the given phase, for observability.
    pub fn phase_duration(&self, phase: usize) -> f64 {
        self.phases[phase].duration
    }

    pub fn vehicles_passed(&self) -> u64 {
        self.vehicles_passed
    }

    /// Credited by the driver when a vehicle clears the intersection.
    /// Informational only; the scheduling logic never reads it.
    pub fn record_vehicle_passed(&mut self) {
        self.vehicles_passed += 1;
    }
}
