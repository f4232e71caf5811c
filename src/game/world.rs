//! The player's side of the scene: where they are and where the exit is.

use glam::{Vec2, Vec3};

use crate::constants::{CORRIDOR_WIDTH, GOAL_Z, SPAWN_POSITION, WALK_SPEED};

pub trait World {
    fn player_position(&self) -> Vec3;
    /// Distance from spawn to the exit along the corridor (z axis).
    fn goal_distance(&self) -> f32;
    fn reset_to_spawn(&mut self);
}

/// Kinematic corridor without rendering: the player walks along z between two walls.
#[derive(Debug, Clone)]
pub struct CorridorWorld {
    position: Vec3,
    spawn: Vec3,
    goal_z: f32,
    half_width: f32,
    speed: f32,
}

impl Default for CorridorWorld {
    fn default() -> Self {
        Self {
            position: SPAWN_POSITION,
            spawn: SPAWN_POSITION,
            goal_z: GOAL_Z,
            half_width: CORRIDOR_WIDTH / 2.0,
            speed: WALK_SPEED,
        }
    }
}

impl CorridorWorld {
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves by `input` for `dt` seconds. `input.x` strafes, `input.y` walks forward (+z).
    ///
    /// Diagonal input is normalized. The player is kept half a unit off the walls and cannot
    /// walk back past the spawn.
    pub fn walk(&mut self, input: Vec2, dt: f32) {
        let direction = input.normalize_or_zero();
        let step = direction * self.speed * dt;
        let limit = self.half_width - 0.5;

        self.position.x = (self.position.x + step.x).clamp(-limit, limit);
        self.position.z = (self.position.z + step.y).max(self.spawn.z);
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    pub fn spawn(&self) -> Vec3 {
        self.spawn
    }
}

impl World for CorridorWorld {
    fn player_position(&self) -> Vec3 {
        self.position
    }

    fn goal_distance(&self) -> f32 {
        self.goal_z
    }

    fn reset_to_spawn(&mut self) {
        self.position = self.spawn;
    }
}
