// ==============================================================================
// health.rs — COLLISION DAMAGE
// ------------------------------------------------------------------------------
// on_impact(relative_speed, layer_bits, now):
//   ignored when dead, off-mask, inside the invulnerability window, or slower
//   than min_damage_speed. Otherwise
//
//      damage = clamp(floor((speed - min_damage_speed) * damage_scale),
//                     1, max_damage_per_hit)
//
// take_damage(amount):
//   health floors at 0. Reaching 0 emits Destroyed exactly once.
// ==============================================================================

use log::info;
use serde::{Deserialize, Serialize};

use crate::sensor::LayerMask;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    pub max_health: f32,
    pub damage_layer_mask: LayerMask,
    pub min_damage_speed: f32,   // m/s
    pub damage_scale: f32,       // damage per m/s above the minimum
    pub max_damage_per_hit: f32,
    pub invulnerability: f32,    // s after each accepted hit
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            max_health: 100.0,
            damage_layer_mask: LayerMask::ALL,
            min_damage_speed: 2.0,
            damage_scale: 10.0,
            max_damage_per_hit: 100.0,
            invulnerability: 0.25,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum HealthEvent {
    Damaged { amount: f32, remaining: f32 },
    Destroyed,
}

#[derive(Debug, Clone, Serialize)]
pub struct VehicleHealth {
    #[serde(skip)]
    config: HealthConfig,
    current: f32,
    dead: bool,
    #[serde(skip)]
    last_hit: Option<f64>,
}

impl VehicleHealth {
    pub fn new(config: HealthConfig) -> Self {
        Self {
            current: config.max_health,
            dead: config.max_health <= 0.0,
            config,
            last_hit: None,
        }
    }

    pub fn current(&self) -> f32 {
        self.current
    }

    pub fn max(&self) -> f32 {
        self.config.max_health
    }

    pub fn is_dead(&self) -> bool {
        self.dead
    }

    /// `now` is simulation time in seconds.
    pub fn on_impact(&mut self, relative_speed: f32, layer_bits: u32, now: f64) -> Option<HealthEvent> {
        let c = self.config;
        if self.dead || !c.damage_layer_mask.contains(layer_bits) {
            return None;
        }
        if let Some(t) = self.last_hit {
            if now - t < c.invulnerability as f64 {
                return None;
            }
        }
        if !(relative_speed >= c.min_damage_speed) {
            return None;
        }

        let raw = ((relative_speed - c.min_damage_speed) * c.damage_scale).floor();
        let damage = raw.clamp(1.0, c.max_damage_per_hit.max(1.0));

        self.last_hit = Some(now);
        self.take_damage(damage)
    }

    pub fn take_damage(&mut self, amount: f32) -> Option<HealthEvent> {
        if self.dead || !(amount > 0.0) {
            return None;
        }

        self.current = (self.current - amount).max(0.0);
        if self.current <= 0.0 {
            self.dead = true;
            info!("💥 vehicle destroyed (took {amount:.0})");
            Some(HealthEvent::Destroyed)
        } else {
            Some(HealthEvent::Damaged { amount, remaining: self.current })
        }
    }
}
