use bevy::prelude::*;
use crate::collision::{Aabb, Collider};
use crate::config::AgentSettings;
use crate::voxel::world::VoxelWorld;

/// Per-frame movement request produced by the input layer.
#[derive(Resource, Clone, Copy, Debug, Default, PartialEq)]
pub struct MovementIntent {
    /// Desired horizontal direction on (x, z); scaled by the move speed.
    pub horizontal: Vec2,
    /// Vertical direction for flying agents, ignored while walking.
    pub vertical: f32,
    pub jump: bool,
}

/// Box-shaped agent moving through the voxel field.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AgentBody {
    pub position: Vec3,
    pub velocity: Vec3,
    pub collider: Collider,
    pub grounded: bool,
}

impl AgentBody {
    pub fn new(position: Vec3, collider: Collider) -> Self {
        Self {
            position,
            velocity: Vec3::ZERO,
            collider,
            grounded: false,
        }
    }

    pub fn from_settings(settings: &AgentSettings) -> Self {
        Self::new(
            Vec3::from_array(settings.spawn),
            Collider::new(settings.half_width, settings.half_height),
        )
    }

    pub fn aabb(&self) -> Aabb {
        self.collider.aabb(self.position)
    }

    /// One fixed-rate tick: gravity and jump, collision-resolved move, grounded refresh.
    pub fn step(&mut self, world: &VoxelWorld, intent: &MovementIntent, dt: f32, settings: &AgentSettings) -> Vec3 {
        let horizontal = intent.horizontal * settings.move_speed * dt;

        let vertical = if settings.flying {
            self.velocity.y = 0.0;
            intent.vertical * settings.move_speed * dt
        } else {
            if intent.jump && self.grounded {
                self.velocity.y = settings.jump_speed;
            } else {
                self.velocity.y -= settings.gravity * dt;
            }
            self.velocity.y * dt
        };

        let delta = Vec3::new(horizontal.x, vertical, horizontal.y);
        let result = self.collider.resolve_move(world, self.position, delta, &mut self.velocity);
        self.position = result.position;
        self.grounded = self.collider.is_grounded(world, self.position);
        if self.grounded && self.velocity.y < 0.0 {
            self.velocity.y = 0.0;
        }
        self.position
    }
}
