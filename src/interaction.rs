//! Forwarding of external state into kernel parameters.
//!
//! Input handling code (possibly on another thread) owns a clone of the
//! [`InteractionBridge`] and replaces the whole [`Interaction`] snapshot
//! whenever the pointer moves. The simulation reads one snapshot per step
//! through [`InteractionBridge::frame`].

use std::sync::{Arc, Mutex};

use glam::Vec3;

/// Largest delta time handed to the kernels, in seconds.
pub const MAX_DELTA_TIME: f32 = 0.1;

/// External state that influences the field.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Interaction {
    /// World-space pointer position, `None` when no pointer is active.
    pub attractor: Option<Vec3>,
}

/// Per-step inputs after clamping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameParams {
    pub time: f32,
    pub delta_time: f32,
    pub attractor: Option<Vec3>,
}

impl FrameParams {
    /// Build frame inputs, clamping `delta_time` into `[0, MAX_DELTA_TIME]`.
    pub fn new(time: f32, delta_time: f32, attractor: Option<Vec3>) -> Self {
        Self {
            time,
            delta_time: clamp_delta(delta_time),
            attractor,
        }
    }
}

/// Clamp a raw frame delta into `[0, MAX_DELTA_TIME]`; NaN becomes 0.
#[inline]
pub fn clamp_delta(delta_time: f32) -> f32 {
    if delta_time.is_nan() {
        return 0.0;
    }
    delta_time.clamp(0.0, MAX_DELTA_TIME)
}

/// Shared, cloneable handle onto the current [`Interaction`].
#[derive(Debug, Clone, Default)]
pub struct InteractionBridge {
    state: Arc<Mutex<Interaction>>,
}

impl InteractionBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the snapshot.
    pub fn replace(&self, interaction: Interaction) {
        match self.state.lock() {
            Ok(mut guard) => *guard = interaction,
            Err(poisoned) => *poisoned.into_inner() = interaction,
        }
    }

    /// Current snapshot.
    pub fn snapshot(&self) -> Interaction {
        match self.state.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    pub fn set_attractor_position(&self, position: Vec3) {
        self.replace(Interaction {
            attractor: Some(position),
        });
    }

    pub fn clear_attractor(&self) {
        self.replace(Interaction { attractor: None });
    }

    /// Kernel inputs for one step.
    pub fn frame(&self, elapsed: f32, delta_time: f32) -> FrameParams {
        FrameParams::new(elapsed, delta_time, self.snapshot().attractor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_delta_is_clamped() {
        assert_eq!(clamp_delta(0.016), 0.016);
        assert_eq!(clamp_delta(2.5), MAX_DELTA_TIME);
        assert_eq!(clamp_delta(-1.0), 0.0);
        assert_eq!(clamp_delta(f32::NAN), 0.0);
        assert_eq!(FrameParams::new(3.0, 10.0, None).delta_time, MAX_DELTA_TIME);
    }

    #[test]
    fn test_attractor_set_and_clear() {
        let bridge = InteractionBridge::new();
        assert_eq!(bridge.frame(0.0, 0.016).attractor, None);

        bridge.set_attractor_position(Vec3::new(1.0, 2.0, 0.0));
        assert_eq!(bridge.frame(0.0, 0.016).attractor, Some(Vec3::new(1.0, 2.0, 0.0)));

        bridge.clear_attractor();
        assert_eq!(bridge.frame(0.0, 0.016).attractor, None);
    }

    #[test]
    fn test_updates_from_another_thread_are_whole_snapshots() {
        let bridge = InteractionBridge::new();
        let writer = bridge.clone();
        let handle = thread::spawn(move || {
            for i in 0..1000 {
                let v = i as f32;
                writer.set_attractor_position(Vec3::splat(v));
            }
        });
        for _ in 0..1000 {
            if let Some(p) = bridge.snapshot().attractor {
                // All components come from the same write.
                assert_eq!(p.x, p.y);
                assert_eq!(p.y, p.z);
            }
        }
        handle.join().unwrap();
        assert_eq!(bridge.snapshot().attractor, Some(Vec3::splat(999.0)));
    }
}
