//! End-to-end tests of the simulation on the host backend.
//!
//! These drive full steps through the scheduler and check the properties the
//! renderer relies on: bounded lifetimes and speeds, respawning, stable grid
//! dimensions and ping-pong parity.

use flowfield::prelude::*;
use flowfield::{FrameParams, SimulationScheduler};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const DT: f32 = 1.0 / 60.0;

fn small_config() -> FieldConfig {
    FieldConfig::default()
        .with_particle_count(32 * 32)
        .with_seed(7)
}

fn scheduler(config: FieldConfig) -> SimulationScheduler<CpuBackend> {
    let backend = CpuBackend::new(&config).unwrap();
    SimulationScheduler::new(backend, config).unwrap()
}

fn run_steps(sim: &mut SimulationScheduler<CpuBackend>, steps: u32, attractor: Option<Vec3>) {
    for i in 0..steps {
        let frame = FrameParams::new(i as f32 * DT, DT, attractor);
        sim.step(&frame).unwrap();
    }
}

// ============================================================================
// Invariants over many steps
// ============================================================================

#[test]
fn test_lifetime_stays_normalized() {
    let mut sim = scheduler(small_config().with_lifetime_range(0.2, 0.5));
    for i in 0..240 {
        let frame = FrameParams::new(i as f32 * DT, DT, Some(Vec3::new(2.0, 0.0, 0.0)));
        sim.step(&frame).unwrap();
        let positions = sim.backend().positions().unwrap();
        assert!(
            positions.iter().all(|p| (0.0..=1.0).contains(&p.w)),
            "lifetime left [0, 1] at step {i}"
        );
    }
}

#[test]
fn test_speed_never_exceeds_max_velocity() {
    let config = small_config()
        .with_attractor(6.0, 200.0)
        .with_max_velocity(3.0);
    let mut sim = scheduler(config);
    run_steps(&mut sim, 120, Some(Vec3::ZERO));

    let velocities = sim.backend().velocities().unwrap();
    let fastest = velocities
        .iter()
        .map(|v| v.truncate().length())
        .fold(0.0f32, f32::max);
    assert!(fastest <= 3.0 + 1.0e-4, "fastest particle at {fastest}");
}

#[test]
fn test_particles_stay_near_bounds() {
    let config = small_config().with_bounds_radius(10.0);
    let mut sim = scheduler(config);
    run_steps(&mut sim, 300, None);

    let positions = sim.backend().positions().unwrap();
    assert!(positions.iter().all(|p| p.truncate().length() <= 15.0 + 1.0e-3));
}

#[test]
fn test_all_values_finite() {
    let mut sim = scheduler(small_config());
    run_steps(&mut sim, 100, Some(Vec3::new(0.0, 1.0, 0.0)));

    let state = sim.backend().state().unwrap();
    assert!(state.positions().iter().all(|p| p.is_finite()));
    assert!(state.velocities().iter().all(|v| v.is_finite()));
}

#[test]
fn test_invariants_hold_for_random_configs() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    for _ in 0..8 {
        let side: u32 = rng.gen_range(4..24);
        let lifetime_min = rng.gen_range(0.1..3.0);
        let max_velocity = rng.gen_range(0.5..10.0);
        let config = FieldConfig::default()
            .with_particle_count(side * side)
            .with_bounds_radius(rng.gen_range(2.0..20.0))
            .with_lifetime_range(lifetime_min, lifetime_min + rng.gen_range(0.0..5.0))
            .with_attractor(rng.gen_range(0.5..10.0), rng.gen_range(-50.0..50.0))
            .with_max_velocity(max_velocity)
            .with_seed(rng.gen());
        let mut sim = scheduler(config.clone());

        for i in 0..60 {
            let attractor = Vec3::new(
                rng.gen_range(-5.0..5.0),
                rng.gen_range(-5.0..5.0),
                0.0,
            );
            let dt = rng.gen_range(0.0..0.2);
            sim.step(&FrameParams::new(i as f32 * 0.016, dt, Some(attractor)))
                .unwrap();
        }

        let state = sim.backend().state().unwrap();
        assert_eq!(state.positions().len(), (side * side) as usize);
        assert!(state.positions().iter().all(|p| (0.0..=1.0).contains(&p.w)), "{config:?}");
        assert!(
            state
                .velocities()
                .iter()
                .all(|v| v.truncate().length() <= max_velocity + 1.0e-3),
            "{config:?}"
        );
    }
}

// ============================================================================
// Respawn
// ============================================================================

#[test]
fn test_expired_particle_respawns_near_origin() {
    let config = small_config().with_lifetime_range(1.0, 2.0);
    let bounds = config.bounds_radius;
    let mut sim = scheduler(config);
    sim.backend_mut()
        .state_mut()
        .unwrap()
        .set_particle(5, Vec3::new(4.0, 0.0, 0.0), Vec3::ZERO, 0.005);

    run_steps(&mut sim, 1, None);

    let particle = sim.backend().state().unwrap().particle(5);
    assert_eq!(particle.lifetime, 1.0);
    assert!(particle.position.length() <= bounds * 0.3 + 1.0e-4);
}

#[test]
fn test_escaped_particle_respawns() {
    let config = small_config().with_bounds_radius(12.0);
    let mut sim = scheduler(config);
    sim.backend_mut()
        .state_mut()
        .unwrap()
        .set_particle(9, Vec3::new(100.0, 0.0, 0.0), Vec3::ZERO, 0.9);

    run_steps(&mut sim, 1, None);

    let particle = sim.backend().state().unwrap().particle(9);
    assert_eq!(particle.lifetime, 1.0);
    assert!(particle.position.length() <= 12.0 * 0.3 + 1.0e-4);
}

#[test]
fn test_oversized_delta_in_frame_literal_is_clamped() {
    let config = small_config().with_lifetime_range(4.0, 10.0);
    let mut sim = scheduler(config);
    sim.backend_mut()
        .state_mut()
        .unwrap()
        .set_particle(11, Vec3::new(2.0, 0.0, 0.0), Vec3::ZERO, 0.9);

    let frame = FrameParams {
        time: 0.0,
        delta_time: 3.0,
        attractor: None,
    };
    sim.step(&frame).unwrap();

    // At most MAX_DELTA_TIME / lifetime_min of the lifetime can be used up.
    let lifetime = sim.backend().state().unwrap().particle(11).lifetime;
    assert!(lifetime >= 0.9 - 0.1 / 4.0 - 1.0e-6, "lifetime {lifetime}");
}

#[test]
fn test_live_particle_is_not_respawned() {
    let mut sim = scheduler(small_config());
    sim.backend_mut()
        .state_mut()
        .unwrap()
        .set_particle(3, Vec3::new(5.0, 0.0, 0.0), Vec3::ZERO, 0.5);

    run_steps(&mut sim, 1, None);

    let particle = sim.backend().state().unwrap().particle(3);
    assert!(particle.lifetime < 0.5 && particle.lifetime > 0.49);
    assert!((particle.position - Vec3::new(5.0, 0.0, 0.0)).length() < 0.1);
}

// ============================================================================
// Buffers
// ============================================================================

#[test]
fn test_ping_pong_returns_to_first_slot_after_two_steps() {
    let mut sim = scheduler(small_config());
    let initial = sim.backend().positions().unwrap().as_ptr();
    let initial_slot = sim.current_position_index();

    run_steps(&mut sim, 1, None);
    assert_ne!(sim.backend().positions().unwrap().as_ptr(), initial);
    assert_ne!(sim.current_position_index(), initial_slot);

    run_steps(&mut sim, 1, None);
    assert_eq!(sim.backend().positions().unwrap().as_ptr(), initial);
    assert_eq!(sim.current_position_index(), initial_slot);
}

#[test]
fn test_resize_keeps_grid_dimensions() {
    let mut field = CpuParticleField::cpu(small_config(), VisualConfig::default()).unwrap();
    let layout = field.layout();

    for (w, h) in [(640, 480), (1920, 1080), (1, 1), (0, 0)] {
        field.resize(w, h, 2.0);
        field.update(0.0, DT, 30.0).unwrap();
        assert_eq!(field.layout(), layout);
        assert_eq!(field.current_position_buffer().unwrap().len(), 32 * 32);
    }
}

#[test]
fn test_same_seed_is_deterministic() {
    let mut a = scheduler(small_config());
    let mut b = scheduler(small_config());
    run_steps(&mut a, 50, Some(Vec3::new(1.0, 2.0, 0.0)));
    run_steps(&mut b, 50, Some(Vec3::new(1.0, 2.0, 0.0)));

    let a = a.backend().state().unwrap();
    let b = b.backend().state().unwrap();
    assert_eq!(a.position_bytes(), b.position_bytes());
    assert_eq!(a.velocity_bytes(), b.velocity_bytes());
}

#[test]
fn test_different_seed_diverges() {
    let a = scheduler(small_config().with_seed(1));
    let b = scheduler(small_config().with_seed(2));
    assert_ne!(
        a.backend().state().unwrap().position_bytes(),
        b.backend().state().unwrap().position_bytes()
    );
}

// ============================================================================
// Attractor and lifecycle
// ============================================================================

#[test]
fn test_attractor_pulls_particles_closer() {
    let config = small_config()
        .with_flow_field(0.08, 0.12, 0.0)
        .with_turbulence(0.0, 0.6)
        .with_attractor(30.0, 10.0)
        .with_lifetime_range(100.0, 200.0);
    let target = Vec3::new(3.0, 0.0, 0.0);

    let mean_distance = |sim: &SimulationScheduler<CpuBackend>| {
        let positions = sim.backend().positions().unwrap();
        positions
            .iter()
            .map(|p| p.truncate().distance(target))
            .sum::<f32>()
            / positions.len() as f32
    };

    let mut sim = scheduler(config);
    let before = mean_distance(&sim);
    run_steps(&mut sim, 30, Some(target));
    assert!(mean_distance(&sim) < before);
}

#[test]
fn test_dispose_is_idempotent() {
    let mut field = CpuParticleField::cpu(small_config(), VisualConfig::default()).unwrap();
    field.update(0.0, DT, 30.0).unwrap();

    field.dispose();
    field.dispose();

    assert!(field.is_disposed());
    assert!(field.state().is_none());
    assert!(matches!(field.update(DT, DT, 30.0), Err(FieldError::Disposed)));
    assert_eq!(field.frame(), 1);
}

#[test]
fn test_non_square_count_is_rejected() {
    let result = CpuParticleField::cpu(
        FieldConfig::default().with_particle_count(1000),
        VisualConfig::default(),
    );
    assert!(matches!(result, Err(FieldError::Config(_))));
}
