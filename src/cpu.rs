//! Reference backend: both kernels as a parallel for-each over flat arrays.

use glam::Vec4;

use crate::config::FieldConfig;
use crate::error::{ConfigError, FieldError};
use crate::kernels::{position, velocity};
use crate::scheduler::{Pass, SimulationBackend};
use crate::state::ParticleState;
use crate::uniforms::SimUniforms;

/// Holds the grids in host memory; `None` once released.
#[derive(Debug, Clone)]
pub struct CpuBackend {
    state: Option<ParticleState>,
}

impl CpuBackend {
    pub fn new(config: &FieldConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            state: Some(ParticleState::seeded(config)?),
        })
    }

    /// Particle state, or `None` after release.
    pub fn state(&self) -> Option<&ParticleState> {
        self.state.as_ref()
    }

    pub fn state_mut(&mut self) -> Option<&mut ParticleState> {
        self.state.as_mut()
    }

    /// Latest `position+lifetime` grid.
    pub fn positions(&self) -> Option<&[Vec4]> {
        self.state.as_ref().map(ParticleState::positions)
    }

    /// Latest velocity grid.
    pub fn velocities(&self) -> Option<&[Vec4]> {
        self.state.as_ref().map(ParticleState::velocities)
    }
}

impl SimulationBackend for CpuBackend {
    fn run_pass(&mut self, pass: Pass, uniforms: &SimUniforms) -> Result<(), FieldError> {
        let state = self.state.as_mut().ok_or(FieldError::Disposed)?;
        match pass {
            Pass::Velocity => {
                let positions = state.position.read();
                let (velocities, out) = state.velocity.split();
                velocity::run(positions, velocities, out, uniforms);
            }
            Pass::Position => {
                let velocities = state.velocity.read();
                let (positions, out) = state.position.split();
                position::run(positions, velocities, out, uniforms);
            }
        }
        Ok(())
    }

    fn swap(&mut self, pass: Pass) {
        if let Some(state) = self.state.as_mut() {
            match pass {
                Pass::Velocity => state.velocity.swap(),
                Pass::Position => state.position.swap(),
            }
        }
    }

    fn position_read_index(&self) -> usize {
        self.state.as_ref().map_or(0, |s| s.position.read_index())
    }

    fn velocity_read_index(&self) -> usize {
        self.state.as_ref().map_or(0, |s| s.velocity.read_index())
    }

    fn release(&mut self) {
        self.state = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interaction::FrameParams;
    use crate::scheduler::SimulationScheduler;

    #[test]
    fn test_step_matches_kernels_applied_by_hand() {
        let config = FieldConfig::default().with_particle_count(8 * 8);
        let backend = CpuBackend::new(&config).unwrap();
        let before = backend.state().unwrap().clone();

        let mut sim = SimulationScheduler::new(backend, config.clone()).unwrap();
        let frame = FrameParams::new(0.5, 0.016, None);
        sim.step(&frame).unwrap();

        let u = SimUniforms::new(&config, 8, &frame);
        let after = sim.backend().state().unwrap();
        for i in 0..64u32 {
            let idx = i as usize;
            let v = velocity::velocity_texel(i, before.positions()[idx], before.velocities()[idx], &u);
            let p = position::position_texel(i, before.positions()[idx], v, &u);
            assert_eq!(after.velocities()[idx], v);
            assert_eq!(after.positions()[idx], p);
        }
    }

    #[test]
    fn test_released_backend_refuses_passes() {
        let config = FieldConfig::default().with_particle_count(16);
        let mut backend = CpuBackend::new(&config).unwrap();
        backend.release();
        assert!(backend.state().is_none());
        let u = SimUniforms::new(&config, 4, &FrameParams::new(0.0, 0.016, None));
        assert!(matches!(
            backend.run_pass(Pass::Velocity, &u),
            Err(FieldError::Disposed)
        ));
    }
}
