//! Stable per-particle pseudo-randomness.
//!
//! Every random quantity in the simulation is a pure function of the
//! particle's linear index, a purpose salt, the global seed and (for respawns)
//! the bits of the simulation time. The same functions exist in WGSL in
//! [`shader_utils::RANDOM_WGSL`](crate::shader_utils::RANDOM_WGSL); keep both
//! in sync.

use glam::Vec3;

/// Salts separating independent random streams of one particle.
pub mod salt {
    pub const SPAWN_POSITION: u32 = 0x9e37_79b9;
    pub const SPAWN_VELOCITY: u32 = 0x85eb_ca6b;
    pub const SPAWN_LIFETIME: u32 = 0xc2b2_ae35;
    pub const LIFESPAN: u32 = 0x27d4_eb2f;
    pub const RESPAWN_POSITION: u32 = 0x1656_67b1;
    pub const RESPAWN_VELOCITY: u32 = 0xd3a2_646c;
    pub const SIZE: u32 = 0xfd70_46c5;
    pub const PULSE: u32 = 0xb55a_4f09;
    pub const COLOR: u32 = 0x6a09_e667;
}

/// Hash a u32 to a pseudo-random u32.
#[inline]
pub fn hash(n: u32) -> u32 {
    let mut x = n;
    x ^= x >> 17;
    x = x.wrapping_mul(0xed5a_d4bb);
    x ^= x >> 11;
    x = x.wrapping_mul(0xac4c_1b51);
    x ^= x >> 15;
    x = x.wrapping_mul(0x3184_8bab);
    x ^= x >> 14;
    x
}

#[inline]
pub fn hash2(a: u32, b: u32) -> u32 {
    hash(a.wrapping_add(hash(b)))
}

#[inline]
pub fn hash3(a: u32, b: u32, c: u32) -> u32 {
    hash(a.wrapping_add(hash(b.wrapping_add(hash(c)))))
}

/// Seed for one random stream of one particle.
#[inline]
pub fn particle_seed(index: u32, salt: u32, seed: u32) -> u32 {
    hash3(index, salt, seed)
}

/// Seed that additionally changes every frame, for respawn draws.
#[inline]
pub fn frame_seed(index: u32, salt: u32, seed: u32, time: f32) -> u32 {
    hash3(index, salt, seed ^ hash(time.to_bits()))
}

/// Random float in `[0, 1]`.
#[inline]
pub fn rand(seed: u32) -> f32 {
    hash(seed) as f32 / 4_294_967_295.0
}

/// Random float in `[min, max]`.
#[inline]
pub fn rand_range(seed: u32, min: f32, max: f32) -> f32 {
    min + rand(seed) * (max - min)
}

/// Random vector with each component in `[-1, 1]`.
#[inline]
pub fn rand_vec3(seed: u32) -> Vec3 {
    Vec3::new(
        rand(seed) * 2.0 - 1.0,
        rand(seed.wrapping_add(1)) * 2.0 - 1.0,
        rand(seed.wrapping_add(2)) * 2.0 - 1.0,
    )
}

/// Point uniformly distributed inside a ball of `radius`.
///
/// Direction from a uniform `cos(theta)`/`phi` pair, distance from the cube
/// root of a uniform draw so volumetric density is constant.
pub fn rand_in_sphere(seed: u32, radius: f32) -> Vec3 {
    let cos_theta = rand(hash2(seed, 0)) * 2.0 - 1.0;
    let phi = rand(hash2(seed, 1)) * std::f32::consts::TAU;
    let w = rand(hash2(seed, 2)).max(1.0e-6);
    let sin_theta = (1.0 - cos_theta * cos_theta).max(0.0).sqrt();
    let dir = Vec3::new(sin_theta * phi.cos(), sin_theta * phi.sin(), cos_theta);
    dir * (radius * w.powf(1.0 / 3.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_stable() {
        // Pinned values; RANDOM_WGSL must produce the same stream.
        assert_eq!(hash(0), 0);
        assert_eq!(hash(1), 0x0427_41d6);
        assert_eq!(hash(12345), 0xf904_eb67);
        assert_eq!(hash(0xdead_beef), 0x0921_725e);
    }

    #[test]
    fn test_rand_range_bounds() {
        for i in 0..10_000 {
            let r = rand_range(hash(i), 2.0, 5.0);
            assert!((2.0..=5.0).contains(&r), "{r}");
        }
    }

    #[test]
    fn test_streams_are_independent_per_salt() {
        let a = particle_seed(17, salt::SIZE, 0);
        let b = particle_seed(17, salt::PULSE, 0);
        let c = particle_seed(17, salt::SIZE, 1);
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_frame_seed_changes_with_time() {
        let a = frame_seed(3, salt::RESPAWN_POSITION, 0, 1.0);
        let b = frame_seed(3, salt::RESPAWN_POSITION, 0, 1.016);
        assert_ne!(a, b);
        assert_eq!(a, frame_seed(3, salt::RESPAWN_POSITION, 0, 1.0));
    }

    #[test]
    fn test_rand_in_sphere_stays_inside() {
        for i in 0..10_000 {
            let p = rand_in_sphere(hash(i), 3.6);
            assert!(p.length() <= 3.6 + 1.0e-4, "{p:?}");
        }
    }

    #[test]
    fn test_rand_in_sphere_is_volumetric() {
        // Uniform volume density puts ~1/8 of samples inside half the radius.
        let inner = (0..20_000)
            .filter(|&i| rand_in_sphere(hash(i * 7 + 1), 1.0).length() < 0.5)
            .count();
        let fraction = inner as f32 / 20_000.0;
        assert!((fraction - 0.125).abs() < 0.02, "{fraction}");
    }
}
