//! Quality tiers and change notification.
//!
//! A tier fixes the particle count and caps the pixel ratio. Changing tiers
//! goes through a [`QualityChannel`]; each subscriber gets every change on its
//! own receiver and decides whether it needs to rebuild (particle count
//! changed) or only update render parameters.

use crossbeam_channel::{Receiver, Sender};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum QualityTier {
    Low,
    #[default]
    Medium,
    High,
}

impl QualityTier {
    pub const ALL: [QualityTier; 3] = [QualityTier::Low, QualityTier::Medium, QualityTier::High];

    /// Grid side `N`; the tier runs `N²` particles.
    pub fn grid_side(self) -> u32 {
        match self {
            QualityTier::Low => 64,
            QualityTier::Medium => 128,
            QualityTier::High => 256,
        }
    }

    pub fn particle_count(self) -> u32 {
        self.grid_side() * self.grid_side()
    }

    /// Largest pixel ratio rendered at this tier.
    pub fn max_pixel_ratio(self) -> f32 {
        match self {
            QualityTier::Low => 1.0,
            QualityTier::Medium => 1.5,
            QualityTier::High => 2.0,
        }
    }

    /// Tier bound to keys `1`, `2`, `3`.
    pub fn from_digit(digit: u32) -> Option<Self> {
        match digit {
            1 => Some(QualityTier::Low),
            2 => Some(QualityTier::Medium),
            3 => Some(QualityTier::High),
            _ => None,
        }
    }
}

/// Broadcasts tier changes to any number of subscribers.
#[derive(Debug)]
pub struct QualityChannel {
    current: QualityTier,
    subscribers: Vec<Sender<QualityTier>>,
}

impl QualityChannel {
    pub fn new(initial: QualityTier) -> Self {
        Self {
            current: initial,
            subscribers: Vec::new(),
        }
    }

    #[inline]
    pub fn current(&self) -> QualityTier {
        self.current
    }

    /// New receiver for subsequent changes.
    pub fn subscribe(&mut self) -> Receiver<QualityTier> {
        let (tx, rx) = crossbeam_channel::unbounded();
        self.subscribers.push(tx);
        rx
    }

    /// Switch tiers. Returns `false` (and sends nothing) if `tier` is current.
    pub fn set(&mut self, tier: QualityTier) -> bool {
        if tier == self.current {
            return false;
        }
        log::info!("quality {:?} -> {:?}", self.current, tier);
        self.current = tier;
        self.subscribers.retain(|tx| tx.send(tier).is_ok());
        true
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

impl Default for QualityChannel {
    fn default() -> Self {
        Self::new(QualityTier::default())
    }
}

/// Latest tier waiting on `rx`, if any. Older pending changes are skipped.
pub fn latest(rx: &Receiver<QualityTier>) -> Option<QualityTier> {
    rx.try_iter().last()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tiers_are_perfect_squares() {
        for tier in QualityTier::ALL {
            let side = tier.grid_side();
            assert_eq!(tier.particle_count(), side * side);
        }
        assert_eq!(QualityTier::Medium.particle_count(), 16_384);
    }

    #[test]
    fn test_subscribers_receive_changes() {
        let mut channel = QualityChannel::new(QualityTier::Medium);
        let a = channel.subscribe();
        let b = channel.subscribe();

        assert!(!channel.set(QualityTier::Medium));
        assert!(a.try_recv().is_err());

        assert!(channel.set(QualityTier::High));
        assert!(channel.set(QualityTier::Low));
        assert_eq!(latest(&a), Some(QualityTier::Low));
        assert_eq!(b.try_recv().ok(), Some(QualityTier::High));
        assert_eq!(channel.current(), QualityTier::Low);
    }

    #[test]
    fn test_dropped_subscribers_are_pruned() {
        let mut channel = QualityChannel::default();
        let rx = channel.subscribe();
        drop(rx);
        channel.set(QualityTier::High);
        assert_eq!(channel.subscriber_count(), 0);
    }

    #[test]
    fn test_digit_keys() {
        assert_eq!(QualityTier::from_digit(1), Some(QualityTier::Low));
        assert_eq!(QualityTier::from_digit(3), Some(QualityTier::High));
        assert_eq!(QualityTier::from_digit(9), None);
    }
}
