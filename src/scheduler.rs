//! Pass ordering and buffer swapping.
//!
//! A step is always:
//!
//! ```text
//! velocity pass → swap velocity → position pass → swap position
//! ```
//!
//! The scheduler owns that order; a [`SimulationBackend`] only knows how to
//! run a single pass and how to flip one grid's ping-pong pair.

use crate::config::FieldConfig;
use crate::error::{ConfigError, FieldError};
use crate::interaction::FrameParams;
use crate::state::GridLayout;
use crate::uniforms::SimUniforms;

/// One of the two per-step kernel passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pass {
    /// `pos[t-1], vel[t-1] → vel[t]`
    Velocity,
    /// `pos[t-1], vel[t] → pos[t]`
    Position,
}

impl Pass {
    pub fn label(&self) -> &'static str {
        match self {
            Pass::Velocity => "velocity",
            Pass::Position => "position",
        }
    }
}

/// Storage and execution for the two grids.
pub trait SimulationBackend {
    /// Run `pass`, reading the read slots and writing the write slot of the
    /// grid the pass produces.
    fn run_pass(&mut self, pass: Pass, uniforms: &SimUniforms) -> Result<(), FieldError>;

    /// Flip the ping-pong pair written by `pass`.
    fn swap(&mut self, pass: Pass);

    /// Slot (0 or 1) of the position grid holding the latest state.
    fn position_read_index(&self) -> usize;

    /// Slot (0 or 1) of the velocity grid holding the latest state.
    fn velocity_read_index(&self) -> usize;

    /// Free all four grid instances. Called at most once.
    fn release(&mut self);
}

/// Drives a backend one step at a time.
pub struct SimulationScheduler<B> {
    backend: B,
    config: FieldConfig,
    layout: GridLayout,
    frame: u64,
    disposed: bool,
}

impl<B: SimulationBackend> SimulationScheduler<B> {
    pub fn new(backend: B, config: FieldConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let layout = GridLayout::for_config(&config)?;
        Ok(Self {
            backend,
            config,
            layout,
            frame: 0,
            disposed: false,
        })
    }

    /// Advance the simulation by one step.
    ///
    /// Returns the slot index of the position grid written by this step.
    pub fn step(&mut self, frame: &FrameParams) -> Result<usize, FieldError> {
        if self.disposed {
            return Err(FieldError::Disposed);
        }

        let uniforms = SimUniforms::new(&self.config, self.layout.side(), frame);
        self.backend.run_pass(Pass::Velocity, &uniforms)?;
        self.backend.swap(Pass::Velocity);
        if let Err(err) = self.backend.run_pass(Pass::Position, &uniforms) {
            // Back to the previous step's velocity grid so state stays consistent.
            self.backend.swap(Pass::Velocity);
            return Err(err);
        }
        self.backend.swap(Pass::Position);
        self.frame += 1;

        log::trace!(
            "step {} t={:.3} dt={:.4} position slot {}",
            self.frame,
            uniforms.time,
            uniforms.delta_time,
            self.backend.position_read_index()
        );
        Ok(self.backend.position_read_index())
    }

    /// Slot of the most recently written position grid.
    #[inline]
    pub fn current_position_index(&self) -> usize {
        self.backend.position_read_index()
    }

    /// Number of completed steps.
    #[inline]
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Release the backend's grids. Safe to call more than once.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.backend.release();
        self.disposed = true;
        log::debug!("simulation disposed after {} steps", self.frame);
    }

    #[inline]
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    #[inline]
    pub fn config(&self) -> &FieldConfig {
        &self.config
    }

    #[inline]
    pub fn layout(&self) -> GridLayout {
        self.layout
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interaction::MAX_DELTA_TIME;

    #[derive(Debug, Clone, PartialEq)]
    enum Event {
        Run(Pass, f32),
        Swap(Pass),
        Release,
    }

    #[derive(Default)]
    struct Recording {
        events: Vec<Event>,
        position_read: usize,
        velocity_read: usize,
        fail_on: Option<Pass>,
    }

    impl SimulationBackend for Recording {
        fn run_pass(&mut self, pass: Pass, uniforms: &SimUniforms) -> Result<(), FieldError> {
            if self.fail_on == Some(pass) {
                return Err(FieldError::Disposed);
            }
            self.events.push(Event::Run(pass, uniforms.delta_time));
            Ok(())
        }

        fn swap(&mut self, pass: Pass) {
            self.events.push(Event::Swap(pass));
            match pass {
                Pass::Velocity => self.velocity_read = 1 - self.velocity_read,
                Pass::Position => self.position_read = 1 - self.position_read,
            }
        }

        fn position_read_index(&self) -> usize {
            self.position_read
        }

        fn velocity_read_index(&self) -> usize {
            self.velocity_read
        }

        fn release(&mut self) {
            self.events.push(Event::Release);
        }
    }

    fn scheduler() -> SimulationScheduler<Recording> {
        let config = FieldConfig::default().with_particle_count(16);
        SimulationScheduler::new(Recording::default(), config).unwrap()
    }

    #[test]
    fn test_step_runs_velocity_then_position_with_swaps() {
        let mut sim = scheduler();
        sim.step(&FrameParams::new(0.0, 0.016, None)).unwrap();
        assert_eq!(
            sim.backend().events,
            vec![
                Event::Run(Pass::Velocity, 0.016),
                Event::Swap(Pass::Velocity),
                Event::Run(Pass::Position, 0.016),
                Event::Swap(Pass::Position),
            ]
        );
        assert_eq!(sim.frame(), 1);
    }

    #[test]
    fn test_position_slot_alternates() {
        let mut sim = scheduler();
        let start = sim.current_position_index();
        let first = sim.step(&FrameParams::new(0.0, 0.016, None)).unwrap();
        let second = sim.step(&FrameParams::new(0.016, 0.016, None)).unwrap();
        assert_ne!(first, start);
        assert_eq!(second, start);
    }

    #[test]
    fn test_failed_pass_does_not_count_as_step() {
        let mut sim = scheduler();
        sim.backend_mut().fail_on = Some(Pass::Position);
        assert!(sim.step(&FrameParams::new(0.0, 0.016, None)).is_err());
        assert_eq!(sim.frame(), 0);
    }

    #[test]
    fn test_failed_position_pass_restores_velocity_slot() {
        let mut sim = scheduler();
        let velocity = sim.backend().velocity_read_index();
        let position = sim.backend().position_read_index();
        sim.backend_mut().fail_on = Some(Pass::Position);

        assert!(sim.step(&FrameParams::new(0.0, 0.016, None)).is_err());
        assert_eq!(sim.backend().velocity_read_index(), velocity);
        assert_eq!(sim.backend().position_read_index(), position);
    }

    #[test]
    fn test_hand_built_frame_is_clamped_before_kernels() {
        let mut sim = scheduler();
        let frame = FrameParams {
            time: 0.0,
            delta_time: 3.0,
            attractor: None,
        };
        sim.step(&frame).unwrap();
        assert_eq!(sim.backend().events[0], Event::Run(Pass::Velocity, MAX_DELTA_TIME));
        assert_eq!(sim.backend().events[2], Event::Run(Pass::Position, MAX_DELTA_TIME));
    }

    #[test]
    fn test_dispose_is_idempotent_and_blocks_steps() {
        let mut sim = scheduler();
        sim.dispose();
        sim.dispose();
        assert!(sim.is_disposed());
        assert_eq!(sim.backend().events, vec![Event::Release]);
        assert!(matches!(
            sim.step(&FrameParams::new(0.0, 0.016, None)),
            Err(FieldError::Disposed)
        ));
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = FieldConfig::default().with_particle_count(15);
        assert!(SimulationScheduler::new(Recording::default(), config).is_err());
    }
}
