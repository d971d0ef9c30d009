//! WGSL utility functions shared by the compute kernels and the renderer.
//!
//! # Available Functions
//!
//! ## Random & Hash
//! - `hash(n: u32) -> u32`, `hash2(a, b)`, `hash3(a, b, c)`
//! - `particle_seed(index, salt, seed) -> u32` - Fixed per-particle stream
//! - `frame_seed(index, salt, seed, time) -> u32` - Stream that changes every frame
//! - `rand(seed: u32) -> f32` - Returns random float in [0, 1]
//! - `rand_range(seed: u32, min: f32, max: f32) -> f32` - Random float in range
//! - `rand_vec3(seed: u32) -> vec3<f32>` - Components in [-1, 1]
//! - `rand_in_sphere(seed: u32, radius: f32) -> vec3<f32>` - Uniform point in a ball
//!
//! ## Noise
//! - `noise3(p: vec3<f32>) -> f32` - 3D simplex noise in [-1, 1]
//! - `fbm3(p, octaves, lacunarity, gain) -> f32` - Fractal Brownian motion
//! - `curl_noise(p, octaves, lacunarity, gain, eps) -> vec3<f32>` - Divergence-free flow
//! - `noise_vec3(p) -> vec3<f32>` - Three decorrelated noise channels
//!
//! Everything here mirrors [`crate::random`] and [`crate::noise`] line for line.

use crate::noise::{POTENTIAL_OFFSET_Y, POTENTIAL_OFFSET_Z, TURBULENCE_OFFSET_Y, TURBULENCE_OFFSET_Z};
use crate::random::salt;

/// WGSL code for random/hash functions.
pub const RANDOM_WGSL: &str = r#"
// Hash functions for pseudo-random number generation
fn hash(n: u32) -> u32 {
    var x = n;
    x = x ^ (x >> 17u);
    x = x * 0xed5ad4bbu;
    x = x ^ (x >> 11u);
    x = x * 0xac4c1b51u;
    x = x ^ (x >> 15u);
    x = x * 0x31848babu;
    x = x ^ (x >> 14u);
    return x;
}

fn hash2(a: u32, b: u32) -> u32 {
    return hash(a + hash(b));
}

fn hash3(a: u32, b: u32, c: u32) -> u32 {
    return hash(a + hash(b + hash(c)));
}

fn particle_seed(index: u32, salt: u32, seed: u32) -> u32 {
    return hash3(index, salt, seed);
}

fn frame_seed(index: u32, salt: u32, seed: u32, time: f32) -> u32 {
    return hash3(index, salt, seed ^ hash(bitcast<u32>(time)));
}

// Random float in [0, 1]
fn rand(seed: u32) -> f32 {
    return f32(hash(seed)) / 4294967295.0;
}

// Random float in [min, max]
fn rand_range(seed: u32, min_val: f32, max_val: f32) -> f32 {
    return min_val + rand(seed) * (max_val - min_val);
}

// Random vector, components in [-1, 1]
fn rand_vec3(seed: u32) -> vec3<f32> {
    return vec3<f32>(
        rand(seed) * 2.0 - 1.0,
        rand(seed + 1u) * 2.0 - 1.0,
        rand(seed + 2u) * 2.0 - 1.0
    );
}

// Uniform point inside a ball (cube-root radial distribution)
fn rand_in_sphere(seed: u32, radius: f32) -> vec3<f32> {
    let cos_theta = rand(hash2(seed, 0u)) * 2.0 - 1.0;
    let phi = rand(hash2(seed, 1u)) * 6.283185307;
    let w = max(rand(hash2(seed, 2u)), 1.0e-6);
    let sin_theta = sqrt(max(1.0 - cos_theta * cos_theta, 0.0));
    let dir = vec3<f32>(sin_theta * cos(phi), sin_theta * sin(phi), cos_theta);
    return dir * (radius * pow(w, 1.0 / 3.0));
}
"#;

/// WGSL code for gradient noise functions.
pub const NOISE_WGSL: &str = r#"
// Gradient noise helpers
fn mod289_3(x: vec3<f32>) -> vec3<f32> {
    return x - floor(x * (1.0 / 289.0)) * 289.0;
}

fn mod289_4(x: vec4<f32>) -> vec4<f32> {
    return x - floor(x * (1.0 / 289.0)) * 289.0;
}

fn permute4(x: vec4<f32>) -> vec4<f32> {
    return mod289_4(((x * 34.0) + 1.0) * x);
}

fn taylor_inv_sqrt4(r: vec4<f32>) -> vec4<f32> {
    return 1.79284291400159 - 0.85373472095314 * r;
}

// 3D Simplex noise
fn noise3(v: vec3<f32>) -> f32 {
    let C = vec2<f32>(1.0 / 6.0, 1.0 / 3.0);
    let D = vec4<f32>(0.0, 0.5, 1.0, 2.0);

    // First corner
    var i = floor(v + dot(v, vec3<f32>(C.y)));
    let x0 = v - i + dot(i, vec3<f32>(C.x));

    // Other corners
    let g = step(x0.yzx, x0.xyz);
    let l = 1.0 - g;
    let i1 = min(g.xyz, l.zxy);
    let i2 = max(g.xyz, l.zxy);

    let x1 = x0 - i1 + C.x;
    let x2 = x0 - i2 + C.y;
    let x3 = x0 - D.yyy;

    // Permutations
    i = mod289_3(i);
    let p = permute4(permute4(permute4(
        i.z + vec4<f32>(0.0, i1.z, i2.z, 1.0))
      + i.y + vec4<f32>(0.0, i1.y, i2.y, 1.0))
      + i.x + vec4<f32>(0.0, i1.x, i2.x, 1.0));

    // Gradients
    let n_ = 0.142857142857;
    let ns = n_ * D.wyz - D.xzx;

    let j = p - 49.0 * floor(p * ns.z * ns.z);

    let x_ = floor(j * ns.z);
    let y_ = floor(j - 7.0 * x_);

    let x = x_ * ns.x + ns.yyyy;
    let y = y_ * ns.x + ns.yyyy;
    let h = 1.0 - abs(x) - abs(y);

    let b0 = vec4<f32>(x.xy, y.xy);
    let b1 = vec4<f32>(x.zw, y.zw);

    let s0 = floor(b0) * 2.0 + 1.0;
    let s1 = floor(b1) * 2.0 + 1.0;
    let sh = -step(h, vec4<f32>(0.0));

    let a0 = b0.xzyw + s0.xzyw * sh.xxyy;
    let a1 = b1.xzyw + s1.xzyw * sh.zzww;

    var p0 = vec3<f32>(a0.xy, h.x);
    var p1 = vec3<f32>(a0.zw, h.y);
    var p2 = vec3<f32>(a1.xy, h.z);
    var p3 = vec3<f32>(a1.zw, h.w);

    // Normalize gradients
    let norm = taylor_inv_sqrt4(vec4<f32>(dot(p0, p0), dot(p1, p1), dot(p2, p2), dot(p3, p3)));
    p0 *= norm.x;
    p1 *= norm.y;
    p2 *= norm.z;
    p3 *= norm.w;

    // Mix final noise value
    var m = max(0.6 - vec4<f32>(dot(x0, x0), dot(x1, x1), dot(x2, x2), dot(x3, x3)), vec4<f32>(0.0));
    m = m * m;
    return 42.0 * dot(m * m, vec4<f32>(dot(p0, x0), dot(p1, x1), dot(p2, x2), dot(p3, x3)));
}

// Fractal Brownian Motion - 3D
fn fbm3(p: vec3<f32>, octaves: u32, lacunarity: f32, gain: f32) -> f32 {
    var value = 0.0;
    var amplitude = 0.5;
    var pos = p;
    for (var i = 0u; i < octaves; i++) {
        value += amplitude * noise3(pos);
        pos *= lacunarity;
        amplitude *= gain;
    }
    return value;
}

fn flow_potential(p: vec3<f32>, octaves: u32, lacunarity: f32, gain: f32) -> vec3<f32> {
    return vec3<f32>(
        fbm3(p, octaves, lacunarity, gain),
        fbm3(p + POTENTIAL_OFFSET_Y, octaves, lacunarity, gain),
        fbm3(p + POTENTIAL_OFFSET_Z, octaves, lacunarity, gain)
    );
}

// Curl of the fractal potential by central differences (divergence-free)
fn curl_noise(p: vec3<f32>, octaves: u32, lacunarity: f32, gain: f32, eps: f32) -> vec3<f32> {
    let dx = vec3<f32>(eps, 0.0, 0.0);
    let dy = vec3<f32>(0.0, eps, 0.0);
    let dz = vec3<f32>(0.0, 0.0, eps);

    let px0 = flow_potential(p - dx, octaves, lacunarity, gain);
    let px1 = flow_potential(p + dx, octaves, lacunarity, gain);
    let py0 = flow_potential(p - dy, octaves, lacunarity, gain);
    let py1 = flow_potential(p + dy, octaves, lacunarity, gain);
    let pz0 = flow_potential(p - dz, octaves, lacunarity, gain);
    let pz1 = flow_potential(p + dz, octaves, lacunarity, gain);

    // Curl = (dFz/dy - dFy/dz, dFx/dz - dFz/dx, dFy/dx - dFx/dy)
    return vec3<f32>(
        (py1.z - py0.z) - (pz1.y - pz0.y),
        (pz1.x - pz0.x) - (px1.z - px0.z),
        (px1.y - px0.y) - (py1.x - py0.x)
    ) / (2.0 * eps);
}

fn noise_vec3(p: vec3<f32>) -> vec3<f32> {
    return vec3<f32>(
        noise3(p),
        noise3(p + TURBULENCE_OFFSET_Y),
        noise3(p + TURBULENCE_OFFSET_Z)
    );
}
"#;

/// WGSL `const` declarations for the salts and noise offsets.
pub fn constants_wgsl() -> String {
    let vec3 = |v: glam::Vec3| format!("vec3<f32>({:?}, {:?}, {:?})", v.x, v.y, v.z);
    let salts = [
        ("SALT_SPAWN_POSITION", salt::SPAWN_POSITION),
        ("SALT_SPAWN_VELOCITY", salt::SPAWN_VELOCITY),
        ("SALT_SPAWN_LIFETIME", salt::SPAWN_LIFETIME),
        ("SALT_LIFESPAN", salt::LIFESPAN),
        ("SALT_RESPAWN_POSITION", salt::RESPAWN_POSITION),
        ("SALT_RESPAWN_VELOCITY", salt::RESPAWN_VELOCITY),
        ("SALT_SIZE", salt::SIZE),
        ("SALT_PULSE", salt::PULSE),
        ("SALT_COLOR", salt::COLOR),
    ];

    let mut code = String::from("// Shared constants\n");
    for (name, value) in salts {
        code.push_str(&format!("const {name}: u32 = {value}u;\n"));
    }
    for (name, value) in [
        ("POTENTIAL_OFFSET_Y", POTENTIAL_OFFSET_Y),
        ("POTENTIAL_OFFSET_Z", POTENTIAL_OFFSET_Z),
        ("TURBULENCE_OFFSET_Y", TURBULENCE_OFFSET_Y),
        ("TURBULENCE_OFFSET_Z", TURBULENCE_OFFSET_Z),
    ] {
        code.push_str(&format!("const {name}: vec3<f32> = {};\n", vec3(value)));
    }
    code
}

/// Get all built-in utility functions combined.
pub fn all_utils_wgsl() -> String {
    format!(
        "// Built-in utility functions\n{}\n{}\n{}\n",
        constants_wgsl(),
        RANDOM_WGSL,
        NOISE_WGSL
    )
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Validates WGSL code using naga.
    pub(crate) fn validate_wgsl(code: &str) -> Result<(), String> {
        let module = naga::front::wgsl::parse_str(code)
            .map_err(|e| format!("WGSL parse error: {}", e.emit_to_string(code)))?;

        let mut validator = naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::all(),
        );
        validator
            .validate(&module)
            .map_err(|e| format!("WGSL validation error: {:?}", e))?;

        Ok(())
    }

    #[test]
    fn test_constants_are_decimal_and_typed() {
        let code = constants_wgsl();
        assert!(code.contains(&format!("const SALT_SIZE: u32 = {}u;", salt::SIZE)));
        assert!(code.contains("const POTENTIAL_OFFSET_Y: vec3<f32> = vec3<f32>(31.416, -47.853, 12.793);"));
    }

    #[test]
    fn test_utils_validate() {
        let shader = format!(
            "{}\n@compute @workgroup_size(1)\nfn main() {{\n    let v = curl_noise(vec3<f32>(0.5), 3u, 2.0, 0.5, 0.01) + noise_vec3(vec3<f32>(1.0)) + rand_in_sphere(frame_seed(1u, SALT_RESPAWN_POSITION, 0u, 0.5), 1.0);\n}}\n",
            all_utils_wgsl()
        );
        validate_wgsl(&shader).expect("utility WGSL should be valid");
    }
}
