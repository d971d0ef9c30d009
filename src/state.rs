//! Double-buffered particle state.
//!
//! Particles live in two `N×N` grids of 4-channel texels:
//!
//! | grid       | xyz        | w        |
//! |------------|------------|----------|
//! | `position` | position   | lifetime |
//! | `velocity` | velocity   | unused   |
//!
//! Each grid is a [`PingPong`] pair. A kernel pass reads the `read` slot,
//! writes the `write` slot, and the pair is swapped afterwards so the freshly
//! written slot becomes the next pass's input.

use glam::{Vec2, Vec3, Vec4};

use crate::config::FieldConfig;
use crate::error::ConfigError;
use crate::random::{particle_seed, rand, rand_in_sphere, rand_vec3, salt};

/// Speed scale of seeded and respawned velocities.
pub const SPAWN_SPEED: f32 = 0.1;

/// Mapping between linear particle indices and grid texels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridLayout {
    side: u32,
}

impl GridLayout {
    /// Layout for `particle_count`, which must be a perfect square.
    pub fn for_config(config: &FieldConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            side: config.grid_side()?,
        })
    }

    pub fn from_side(side: u32) -> Self {
        Self { side }
    }

    /// Grid side `N`.
    #[inline]
    pub fn side(&self) -> u32 {
        self.side
    }

    /// Number of texels (`N²`).
    #[inline]
    pub fn len(&self) -> usize {
        (self.side as usize) * (self.side as usize)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.side == 0
    }

    /// Texel of a particle, row-major.
    #[inline]
    pub fn texel(&self, index: u32) -> (u32, u32) {
        (index % self.side, index / self.side)
    }

    /// Linear index of a texel.
    #[inline]
    pub fn index(&self, x: u32, y: u32) -> u32 {
        y * self.side + x
    }

    /// Reference address of a particle: its texel center in `[0, 1)²`.
    pub fn reference_address(&self, index: u32) -> Vec2 {
        let (x, y) = self.texel(index);
        let n = self.side as f32;
        Vec2::new((x as f32 + 0.5) / n, (y as f32 + 0.5) / n)
    }

    /// Inverse of [`reference_address`](Self::reference_address).
    pub fn index_of_address(&self, address: Vec2) -> u32 {
        let n = self.side as f32;
        let x = ((address.x * n).floor() as u32).min(self.side - 1);
        let y = ((address.y * n).floor() as u32).min(self.side - 1);
        self.index(x, y)
    }

    /// Reference addresses of every particle, in index order.
    pub fn reference_addresses(&self) -> Vec<Vec2> {
        (0..self.len() as u32).map(|i| self.reference_address(i)).collect()
    }
}

/// Two buffer instances and the index of the one currently read.
#[derive(Debug, Clone)]
pub struct PingPong<T> {
    slots: [T; 2],
    read: usize,
}

impl<T> PingPong<T> {
    /// Both slots start with the same contents; slot 0 is read first.
    pub fn new(read: T, write: T) -> Self {
        Self {
            slots: [read, write],
            read: 0,
        }
    }

    /// Slot holding the most recently written data.
    #[inline]
    pub fn read(&self) -> &T {
        &self.slots[self.read]
    }

    /// Read view and write view at once; never the same instance.
    pub fn split(&mut self) -> (&T, &mut T) {
        let (first, second) = self.slots.split_at_mut(1);
        if self.read == 0 {
            (&first[0], &mut second[0])
        } else {
            (&second[0], &mut first[0])
        }
    }

    /// Index (0 or 1) of the read slot.
    #[inline]
    pub fn read_index(&self) -> usize {
        self.read
    }

    /// Access a slot by index regardless of role.
    #[inline]
    pub fn slot(&self, index: usize) -> &T {
        &self.slots[index]
    }

    /// Invert read and write roles.
    #[inline]
    pub fn swap(&mut self) {
        self.read = 1 - self.read;
    }

    pub fn slots_mut(&mut self) -> &mut [T; 2] {
        &mut self.slots
    }
}

/// One grid: a flat row-major array of texels.
pub type Grid = Vec<Vec4>;

/// CPU-resident particle state: both ping-pong grids.
#[derive(Debug, Clone)]
pub struct ParticleState {
    layout: GridLayout,
    pub position: PingPong<Grid>,
    pub velocity: PingPong<Grid>,
}

impl ParticleState {
    /// Seed both grids from `config`.
    pub fn seeded(config: &FieldConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let layout = GridLayout::for_config(config)?;
        let (positions, velocities) = seed_grids(layout, config);
        Ok(Self {
            layout,
            position: PingPong::new(positions.clone(), positions),
            velocity: PingPong::new(velocities.clone(), velocities),
        })
    }

    #[inline]
    pub fn layout(&self) -> GridLayout {
        self.layout
    }

    /// Latest `position+lifetime` grid.
    #[inline]
    pub fn positions(&self) -> &[Vec4] {
        self.position.read()
    }

    /// Latest velocity grid.
    #[inline]
    pub fn velocities(&self) -> &[Vec4] {
        self.velocity.read()
    }

    /// Decoded particle at `index`.
    pub fn particle(&self, index: u32) -> Particle {
        let pos = self.positions()[index as usize];
        let vel = self.velocities()[index as usize];
        Particle {
            position: pos.truncate(),
            velocity: vel.truncate(),
            lifetime: pos.w,
            reference_address: self.layout.reference_address(index),
        }
    }

    /// Overwrite the latest state of one particle (test and tooling hook).
    pub fn set_particle(&mut self, index: u32, position: Vec3, velocity: Vec3, lifetime: f32) {
        let i = index as usize;
        let read = self.position.read_index();
        self.position.slots_mut()[read][i] = position.extend(lifetime);
        let read = self.velocity.read_index();
        self.velocity.slots_mut()[read][i] = velocity.extend(0.0);
    }

    /// Raw bytes of the latest grids, for uploads and comparisons.
    pub fn position_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(self.positions())
    }

    pub fn velocity_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(self.velocities())
    }
}

/// A particle decoded from its texels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Particle {
    pub position: Vec3,
    pub velocity: Vec3,
    pub lifetime: f32,
    pub reference_address: Vec2,
}

/// Initial grids: uniform points in the bounds sphere, small random velocity
/// and a random lifetime so particles do not expire in lockstep.
pub fn seed_grids(layout: GridLayout, config: &FieldConfig) -> (Grid, Grid) {
    let count = layout.len() as u32;
    let positions = (0..count)
        .map(|i| {
            let p = rand_in_sphere(
                particle_seed(i, salt::SPAWN_POSITION, config.seed),
                config.bounds_radius,
            );
            let life = rand(particle_seed(i, salt::SPAWN_LIFETIME, config.seed));
            p.extend(life)
        })
        .collect();
    let velocities = (0..count)
        .map(|i| {
            let v = rand_vec3(particle_seed(i, salt::SPAWN_VELOCITY, config.seed)) * SPAWN_SPEED;
            v.extend(0.0)
        })
        .collect();
    (positions, velocities)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_addresses_are_row_major_and_inside_unit_square() {
        let layout = GridLayout::from_side(4);
        assert_eq!(layout.reference_address(0), Vec2::new(0.125, 0.125));
        assert_eq!(layout.reference_address(1), Vec2::new(0.375, 0.125));
        assert_eq!(layout.reference_address(4), Vec2::new(0.125, 0.375));
        for i in 0..16 {
            let a = layout.reference_address(i);
            assert!(a.x >= 0.0 && a.x < 1.0 && a.y >= 0.0 && a.y < 1.0);
            assert_eq!(layout.index_of_address(a), i);
        }
    }

    #[test]
    fn test_ping_pong_split_never_aliases() {
        let mut pair = PingPong::new(vec![1], vec![2]);
        {
            let (read, write) = pair.split();
            assert_eq!(read, &vec![1]);
            write[0] = 3;
        }
        pair.swap();
        assert_eq!(pair.read(), &vec![3]);
        let (read, write) = pair.split();
        assert_eq!(read, &vec![3]);
        assert_eq!(write, &mut vec![1]);
    }

    #[test]
    fn test_ping_pong_round_trip() {
        let mut pair = PingPong::new('a', 'b');
        let original = pair.read_index();
        pair.swap();
        assert_ne!(pair.read_index(), original);
        pair.swap();
        assert_eq!(pair.read_index(), original);
        assert_eq!(*pair.read(), 'a');
    }

    #[test]
    fn test_seeded_state_respects_invariants() {
        let config = FieldConfig::default().with_particle_count(32 * 32);
        let state = ParticleState::seeded(&config).unwrap();
        assert_eq!(state.layout().len(), 1024);
        assert_eq!(state.positions().len(), 1024);
        for i in 0..1024 {
            let p = state.particle(i);
            assert!((0.0..=1.0).contains(&p.lifetime));
            assert!(p.position.length() <= config.bounds_radius + 1.0e-3);
            assert!(p.velocity.length() <= SPAWN_SPEED * 3f32.sqrt() + 1.0e-6);
        }
    }

    #[test]
    fn test_seeded_lifetimes_are_spread() {
        let config = FieldConfig::default().with_particle_count(32 * 32);
        let state = ParticleState::seeded(&config).unwrap();
        let young = state.positions().iter().filter(|t| t.w > 0.5).count();
        assert!(young > 400 && young < 624, "{young}");
    }

    #[test]
    fn test_seeding_rejects_non_square() {
        let config = FieldConfig::default().with_particle_count(99);
        assert!(ParticleState::seeded(&config).is_err());
    }
}
