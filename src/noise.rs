//! Coherent noise on the CPU.
//!
//! Same simplex variant, fractal sum and curl construction as the WGSL in
//! [`shader_utils::NOISE_WGSL`](crate::shader_utils::NOISE_WGSL), so the CPU
//! backend and the compute kernels evolve the same field.

use glam::{Vec3, Vec4};

/// Offsets decorrelating the three components of the flow potential.
pub const POTENTIAL_OFFSET_Y: Vec3 = Vec3::new(31.416, -47.853, 12.793);
pub const POTENTIAL_OFFSET_Z: Vec3 = Vec3::new(-233.145, -113.408, -185.31);

/// Offsets decorrelating the three turbulence components.
pub const TURBULENCE_OFFSET_Y: Vec3 = Vec3::new(19.19, 7.31, -3.17);
pub const TURBULENCE_OFFSET_Z: Vec3 = Vec3::new(-11.7, 27.3, 41.9);

/// Fractal sum parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fractal {
    pub octaves: u32,
    pub lacunarity: f32,
    pub gain: f32,
}

impl Default for Fractal {
    fn default() -> Self {
        Self {
            octaves: 3,
            lacunarity: 2.0,
            gain: 0.5,
        }
    }
}

#[inline]
fn mod289(x: f32) -> f32 {
    x - (x * (1.0 / 289.0)).floor() * 289.0
}

#[inline]
fn mod289_4(x: Vec4) -> Vec4 {
    Vec4::new(mod289(x.x), mod289(x.y), mod289(x.z), mod289(x.w))
}

#[inline]
fn permute4(x: Vec4) -> Vec4 {
    mod289_4((x * 34.0 + Vec4::ONE) * x)
}

#[inline]
fn taylor_inv_sqrt4(r: Vec4) -> Vec4 {
    Vec4::splat(1.792_842_9) - r * 0.853_734_7
}

/// WGSL `step(edge, x)`.
#[inline]
fn step(edge: f32, x: f32) -> f32 {
    if x >= edge {
        1.0
    } else {
        0.0
    }
}

#[inline]
fn step4(edge: Vec4, x: Vec4) -> Vec4 {
    Vec4::new(
        step(edge.x, x.x),
        step(edge.y, x.y),
        step(edge.z, x.z),
        step(edge.w, x.w),
    )
}

/// 3D simplex noise, roughly in `[-1, 1]`.
pub fn noise3(v: Vec3) -> f32 {
    const CX: f32 = 1.0 / 6.0;
    const CY: f32 = 1.0 / 3.0;

    // First corner
    let mut i = (v + Vec3::splat(v.dot(Vec3::splat(CY)))).floor();
    let x0 = v - i + Vec3::splat(i.dot(Vec3::splat(CX)));

    // Other corners
    let g = Vec3::new(step(x0.y, x0.x), step(x0.z, x0.y), step(x0.x, x0.z));
    let l = Vec3::ONE - g;
    let l_zxy = Vec3::new(l.z, l.x, l.y);
    let i1 = g.min(l_zxy);
    let i2 = g.max(l_zxy);

    let x1 = x0 - i1 + Vec3::splat(CX);
    let x2 = x0 - i2 + Vec3::splat(CY);
    let x3 = x0 - Vec3::splat(0.5);

    // Permutations
    i = Vec3::new(mod289(i.x), mod289(i.y), mod289(i.z));
    let p = permute4(
        permute4(
            permute4(Vec4::splat(i.z) + Vec4::new(0.0, i1.z, i2.z, 1.0))
                + Vec4::splat(i.y)
                + Vec4::new(0.0, i1.y, i2.y, 1.0),
        ) + Vec4::splat(i.x)
            + Vec4::new(0.0, i1.x, i2.x, 1.0),
    );

    // Gradients on a 7x7 grid over the octahedron
    let n_ = 1.0 / 7.0;
    let ns = Vec3::new(2.0 * n_, 0.5 * n_ - 1.0, n_);

    let j = p - 49.0 * (p * ns.z * ns.z).floor();
    let x_ = (j * ns.z).floor();
    let y_ = (j - 7.0 * x_).floor();

    let x = x_ * ns.x + Vec4::splat(ns.y);
    let y = y_ * ns.x + Vec4::splat(ns.y);
    let h = Vec4::ONE - x.abs() - y.abs();

    let b0 = Vec4::new(x.x, x.y, y.x, y.y);
    let b1 = Vec4::new(x.z, x.w, y.z, y.w);

    let s0 = b0.floor() * 2.0 + Vec4::ONE;
    let s1 = b1.floor() * 2.0 + Vec4::ONE;
    let sh = -step4(h, Vec4::ZERO);

    let a0 = Vec4::new(b0.x, b0.z, b0.y, b0.w)
        + Vec4::new(s0.x, s0.z, s0.y, s0.w) * Vec4::new(sh.x, sh.x, sh.y, sh.y);
    let a1 = Vec4::new(b1.x, b1.z, b1.y, b1.w)
        + Vec4::new(s1.x, s1.z, s1.y, s1.w) * Vec4::new(sh.z, sh.z, sh.w, sh.w);

    let mut p0 = Vec3::new(a0.x, a0.y, h.x);
    let mut p1 = Vec3::new(a0.z, a0.w, h.y);
    let mut p2 = Vec3::new(a1.x, a1.y, h.z);
    let mut p3 = Vec3::new(a1.z, a1.w, h.w);

    let norm = taylor_inv_sqrt4(Vec4::new(p0.dot(p0), p1.dot(p1), p2.dot(p2), p3.dot(p3)));
    p0 *= norm.x;
    p1 *= norm.y;
    p2 *= norm.z;
    p3 *= norm.w;

    // Mix final noise value
    let m = (Vec4::splat(0.6) - Vec4::new(x0.dot(x0), x1.dot(x1), x2.dot(x2), x3.dot(x3)))
        .max(Vec4::ZERO);
    let m = m * m;
    42.0 * (m * m).dot(Vec4::new(p0.dot(x0), p1.dot(x1), p2.dot(x2), p3.dot(x3)))
}

/// Fractal Brownian motion over [`noise3`].
pub fn fbm3(p: Vec3, fractal: Fractal) -> f32 {
    let mut value = 0.0;
    let mut amplitude = 0.5;
    let mut pos = p;
    for _ in 0..fractal.octaves {
        value += amplitude * noise3(pos);
        pos *= fractal.lacunarity;
        amplitude *= fractal.gain;
    }
    value
}

/// Three decorrelated fractal channels used as the curl's vector potential.
pub fn flow_potential(p: Vec3, fractal: Fractal) -> Vec3 {
    Vec3::new(
        fbm3(p, fractal),
        fbm3(p + POTENTIAL_OFFSET_Y, fractal),
        fbm3(p + POTENTIAL_OFFSET_Z, fractal),
    )
}

/// Divergence-free flow: curl of [`flow_potential`] by central differences.
pub fn curl_noise(p: Vec3, fractal: Fractal, epsilon: f32) -> Vec3 {
    let dx = Vec3::new(epsilon, 0.0, 0.0);
    let dy = Vec3::new(0.0, epsilon, 0.0);
    let dz = Vec3::new(0.0, 0.0, epsilon);

    let px0 = flow_potential(p - dx, fractal);
    let px1 = flow_potential(p + dx, fractal);
    let py0 = flow_potential(p - dy, fractal);
    let py1 = flow_potential(p + dy, fractal);
    let pz0 = flow_potential(p - dz, fractal);
    let pz1 = flow_potential(p + dz, fractal);

    // curl F = (dFz/dy - dFy/dz, dFx/dz - dFz/dx, dFy/dx - dFx/dy)
    Vec3::new(
        (py1.z - py0.z) - (pz1.y - pz0.y),
        (pz1.x - pz0.x) - (px1.z - px0.z),
        (px1.y - px0.y) - (py1.x - py0.x),
    ) / (2.0 * epsilon)
}

/// Raw (non-solenoidal) noise vector for turbulence.
pub fn noise_vec3(p: Vec3) -> Vec3 {
    Vec3::new(
        noise3(p),
        noise3(p + TURBULENCE_OFFSET_Y),
        noise3(p + TURBULENCE_OFFSET_Z),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noise_range_and_variation() {
        let mut min = f32::MAX;
        let mut max = f32::MIN;
        for i in 0..2000 {
            let t = i as f32 * 0.137;
            let n = noise3(Vec3::new(t, t * 0.71 + 3.0, -t * 1.3));
            assert!(n.is_finite());
            min = min.min(n);
            max = max.max(n);
        }
        assert!(min > -1.5 && max < 1.5, "{min} {max}");
        assert!(max - min > 0.5, "noise should vary: {min} {max}");
    }

    #[test]
    fn test_noise_is_continuous() {
        let p = Vec3::new(1.3, -2.7, 0.4);
        let a = noise3(p);
        let b = noise3(p + Vec3::splat(1.0e-3));
        assert!((a - b).abs() < 0.05);
    }

    #[test]
    fn test_fbm_single_octave_is_half_noise() {
        let p = Vec3::new(0.3, 0.8, -1.1);
        let f = Fractal { octaves: 1, ..Fractal::default() };
        assert!((fbm3(p, f) - 0.5 * noise3(p)).abs() < 1.0e-6);
    }

    #[test]
    fn test_curl_noise_is_divergence_free() {
        // Same step as the curl so the mixed differences cancel exactly.
        let fractal = Fractal::default();
        let h = 0.01;
        let mut largest = 0.0f32;
        for i in 0..12 {
            let s = i as f32;
            let p = Vec3::new(0.37 * s - 2.0, 0.11 * s + 0.5, 1.0 - 0.23 * s);
            largest = largest.max(curl_noise(p, fractal, 0.01).length());

            let ddx = curl_noise(p + Vec3::X * h, fractal, 0.01).x
                - curl_noise(p - Vec3::X * h, fractal, 0.01).x;
            let ddy = curl_noise(p + Vec3::Y * h, fractal, 0.01).y
                - curl_noise(p - Vec3::Y * h, fractal, 0.01).y;
            let ddz = curl_noise(p + Vec3::Z * h, fractal, 0.01).z
                - curl_noise(p - Vec3::Z * h, fractal, 0.01).z;
            let divergence = (ddx + ddy + ddz) / (2.0 * h);
            assert!(divergence.abs() < 0.05, "divergence {divergence} at {p:?}");
        }
        assert!(largest > 0.01, "curl field should not vanish");
    }
}
