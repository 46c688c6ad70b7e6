use bevy::prelude::*;
use crate::collision::Aabb;
use crate::voxel::types::BlockId;
use crate::voxel::world::{VoxelWorld, WorldError};

/// Raycast step size for block picking
const RAY_STEP: f32 = 0.05;

/// Places `id` at `pos` unless the voxel's cube would overlap the agent.
pub fn place_block(world: &mut VoxelWorld, pos: IVec3, id: BlockId, agent_box: &Aabb) -> Result<(), WorldError> {
    if !world.catalog().contains(id) {
        return Err(WorldError::UnknownBlockType(id));
    }
    // Can't place a block where the agent is standing
    if agent_box.intersects(&Aabb::voxel(pos)) {
        return Err(WorldError::PlacementBlocked(pos));
    }
    world.set_voxel(pos, id)?;
    debug!("Placed block {} at {:?}", id, pos);
    Ok(())
}

/// Removes the voxel at `pos`, returning what was there.
pub fn break_block(world: &mut VoxelWorld, pos: IVec3) -> Result<Option<BlockId>, WorldError> {
    let removed = world.remove_voxel(pos)?;
    if let Some(id) = removed {
        debug!("Broke block {} at {:?}", id, pos);
    }
    Ok(removed)
}

/// Marches along the ray and returns the first occupied voxel together with
/// the face normal it was entered through. Only resident chunks are tested.
pub fn raycast_blocks(
    origin: Vec3,
    direction: Vec3,
    world: &VoxelWorld,
    max_distance: f32,
) -> Option<(IVec3, IVec3)> {
    let direction = direction.try_normalize()?;
    let step = direction * RAY_STEP;
    let mut pos = origin;
    let mut prev_block = pos.round().as_ivec3();

    let steps = (max_distance / RAY_STEP) as i32;

    for _ in 0..steps {
        pos += step;
        let block_pos = pos.round().as_ivec3();

        if block_pos != prev_block {
            if world.query_occupied(block_pos) {
                let normal = (prev_block - block_pos).clamp(IVec3::NEG_ONE, IVec3::ONE);
                return Some((block_pos, normal));
            }
            prev_block = block_pos;
        }
    }

    None
}
