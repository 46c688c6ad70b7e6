//! Box-vs-voxel collision.
//!
//! Voxel `v` occupies the unit cube centered on `v`. The agent is an axis
//! aligned box centered on its position. Occupancy comes from
//! [`VoxelWorld::query_occupied`], so chunks that are not resident count as
//! empty space.

use bevy::prelude::*;
use crate::constants::GROUND_PROBE;
use crate::voxel::world::VoxelWorld;

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    pub fn from_center(center: Vec3, half_extents: Vec3) -> Self {
        Self {
            min: center - half_extents,
            max: center + half_extents,
        }
    }

    /// Unit cube of the voxel at `pos`.
    pub fn voxel(pos: IVec3) -> Self {
        Self::from_center(pos.as_vec3(), Vec3::splat(0.5))
    }

    /// Open-interval overlap; boxes that only share a face do not intersect.
    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.cmplt(other.max).all() && self.max.cmpgt(other.min).all()
    }

    /// Integer voxels whose cubes could touch this box, padded by one cell.
    pub fn voxel_range(&self) -> (IVec3, IVec3) {
        (
            self.min.floor().as_ivec3() - IVec3::ONE,
            self.max.ceil().as_ivec3() + IVec3::ONE,
        )
    }
}

pub fn intersects_voxel(box_min: Vec3, box_max: Vec3, voxel: IVec3) -> bool {
    Aabb::new(box_min, box_max).intersects(&Aabb::voxel(voxel))
}

/// True when the box overlaps any occupied voxel.
pub fn box_collides(world: &VoxelWorld, aabb: &Aabb) -> bool {
    let (lo, hi) = aabb.voxel_range();
    for x in lo.x..=hi.x {
        for y in lo.y..=hi.y {
            for z in lo.z..=hi.z {
                let voxel = IVec3::new(x, y, z);
                if world.query_occupied(voxel) && intersects_voxel(aabb.min, aabb.max, voxel) {
                    return true;
                }
            }
        }
    }
    false
}

pub fn check_collision(world: &VoxelWorld, position: Vec3, half_width: f32, half_height: f32) -> bool {
    let aabb = Aabb::from_center(position, Vec3::new(half_width, half_height, half_width));
    box_collides(world, &aabb)
}

/// Probes a thin slab directly under the agent's feet.
pub fn is_grounded(world: &VoxelWorld, position: Vec3, half_width: f32, half_height: f32) -> bool {
    let probe_center = Vec3::new(
        position.x,
        position.y - half_height - GROUND_PROBE / 2.0,
        position.z,
    );
    check_collision(world, probe_center, half_width, GROUND_PROBE / 2.0)
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct MoveResult {
    pub position: Vec3,
    /// Axes whose delta was rejected.
    pub blocked: BVec3,
}

/// Sweeps X, then Z, then Y. Each axis delta is applied alone and kept only
/// if the box stays clear. A rejected Y move zeroes `velocity.y`.
pub fn resolve_move(
    world: &VoxelWorld,
    position: Vec3,
    delta: Vec3,
    half_width: f32,
    half_height: f32,
    velocity: &mut Vec3,
) -> MoveResult {
    let mut position = position;
    let mut blocked = [false; 3];

    for axis in [0, 2, 1] {
        let step = delta[axis];
        if step == 0.0 {
            continue;
        }
        let mut candidate = position;
        candidate[axis] += step;
        if check_collision(world, candidate, half_width, half_height) {
            blocked[axis] = true;
        } else {
            position = candidate;
        }
    }

    if blocked[1] {
        velocity.y = 0.0;
    }

    MoveResult {
        position,
        blocked: BVec3::from(blocked),
    }
}

/// Agent half extents: `half_width` on X and Z, `half_height` on Y.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Collider {
    pub half_width: f32,
    pub half_height: f32,
}

impl Collider {
    pub fn new(half_width: f32, half_height: f32) -> Self {
        Self { half_width, half_height }
    }

    pub fn half_extents(&self) -> Vec3 {
        Vec3::new(self.half_width, self.half_height, self.half_width)
    }

    pub fn aabb(&self, position: Vec3) -> Aabb {
        Aabb::from_center(position, self.half_extents())
    }

    pub fn collides(&self, world: &VoxelWorld, position: Vec3) -> bool {
        check_collision(world, position, self.half_width, self.half_height)
    }

    pub fn is_grounded(&self, world: &VoxelWorld, position: Vec3) -> bool {
        is_grounded(world, position, self.half_width, self.half_height)
    }

    pub fn resolve_move(&self, world: &VoxelWorld, position: Vec3, delta: Vec3, velocity: &mut Vec3) -> MoveResult {
        resolve_move(world, position, delta, self.half_width, self.half_height, velocity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorldConfig;

    fn world_with(voxels: &[IVec3]) -> VoxelWorld {
        let mut world = VoxelWorld::in_memory(&WorldConfig::empty()).unwrap();
        for v in voxels {
            world.set_voxel(*v, 2).unwrap();
        }
        world
    }

    fn floor(world_y: i32, extent: i32) -> Vec<IVec3> {
        let mut out = Vec::new();
        for x in -extent..=extent {
            for z in -extent..=extent {
                out.push(IVec3::new(x, world_y, z));
            }
        }
        out
    }

    #[test]
    fn test_box_inside_voxel_intersects() {
        let v = IVec3::new(3, -2, 7);
        let center = v.as_vec3();
        assert!(intersects_voxel(center - 0.2, center + 0.2, v));
    }

    #[test]
    fn test_box_outside_or_touching_does_not_intersect() {
        let v = IVec3::ZERO;
        assert!(!intersects_voxel(Vec3::new(2.0, 2.0, 2.0), Vec3::new(3.0, 3.0, 3.0), v));
        // Sharing the +X face only
        assert!(!intersects_voxel(Vec3::new(0.5, -0.5, -0.5), Vec3::new(1.5, 0.5, 0.5), v));
    }

    #[test]
    fn test_check_collision_against_world() {
        let world = world_with(&[IVec3::new(0, 0, 0)]);
        assert!(check_collision(&world, Vec3::ZERO, 0.1, 0.1));
        assert!(check_collision(&world, Vec3::new(0.0, 1.3, 0.0), 0.3, 0.9));
        assert!(!check_collision(&world, Vec3::new(0.0, 1.5, 0.0), 0.3, 0.9));
        assert!(!check_collision(&world, Vec3::new(5.0, 0.0, 5.0), 0.3, 0.9));
    }

    #[test]
    fn test_non_resident_chunks_never_collide() {
        let world = VoxelWorld::in_memory(&WorldConfig::default()).unwrap();
        assert!(!check_collision(&world, Vec3::new(0.0, 2.0, 0.0), 0.3, 0.9));
    }

    #[test]
    fn test_grounded_when_standing_on_voxel_top() {
        let world = world_with(&[IVec3::new(0, 0, 0)]);
        let collider = Collider::new(0.25, 0.75);
        // Feet exactly on the top face at y = 0.5
        assert!(collider.is_grounded(&world, Vec3::new(0.0, 1.25, 0.0)));
        assert!(!collider.is_grounded(&world, Vec3::new(0.0, 2.0, 0.0)));
        assert!(!collider.collides(&world, Vec3::new(0.0, 1.25, 0.0)));
    }

    #[test]
    fn test_falling_into_floor_keeps_y_and_zeroes_velocity() {
        let world = world_with(&floor(0, 2));
        let collider = Collider::new(0.25, 0.75);
        let start = Vec3::new(0.0, 1.5, 0.0);
        let mut velocity = Vec3::new(0.0, -10.0, 0.0);

        let result = collider.resolve_move(&world, start, Vec3::new(0.0, -0.5, 0.0), &mut velocity);
        assert_eq!(result.position.y, start.y);
        assert!(result.blocked.y);
        assert_eq!(velocity.y, 0.0);
    }

    #[test]
    fn test_upward_rejection_also_zeroes_velocity() {
        let world = world_with(&[IVec3::new(0, 3, 0)]);
        let collider = Collider::new(0.25, 0.75);
        let mut velocity = Vec3::new(0.0, 8.0, 0.0);
        let result = collider.resolve_move(&world, Vec3::new(0.0, 1.5, 0.0), Vec3::new(0.0, 0.5, 0.0), &mut velocity);
        assert_eq!(result.position.y, 1.5);
        assert_eq!(velocity.y, 0.0);
    }

    #[test]
    fn test_blocked_axis_does_not_stop_others() {
        // Wall along x = 1, floor under the agent
        let mut voxels = floor(0, 3);
        voxels.push(IVec3::new(1, 1, 0));
        voxels.push(IVec3::new(1, 2, 0));
        let world = world_with(&voxels);
        let collider = Collider::new(0.25, 0.75);
        let mut velocity = Vec3::ZERO;

        let start = Vec3::new(0.0, 1.25, 0.0);
        let result = collider.resolve_move(&world, start, Vec3::new(0.5, 0.0, 0.5), &mut velocity);
        assert!(result.blocked.x);
        assert!(!result.blocked.z);
        assert_eq!(result.position, Vec3::new(0.0, 1.25, 0.5));
    }

    #[test]
    fn test_free_move_applies_full_delta() {
        let world = world_with(&[]);
        let mut velocity = Vec3::new(1.0, -2.0, 0.0);
        let delta = Vec3::new(0.25, -0.5, -1.0);
        let result = resolve_move(&world, Vec3::new(0.0, 10.0, 0.0), delta, 0.3, 0.9, &mut velocity);
        assert_eq!(result.position, Vec3::new(0.25, 9.5, -1.0));
        assert_eq!(result.blocked, BVec3::FALSE);
        assert_eq!(velocity.y, -2.0);
    }
}
