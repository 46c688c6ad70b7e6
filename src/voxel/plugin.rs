use std::path::Path;

use bevy::prelude::*;
use crate::agent::{AgentBody, MovementIntent};
use crate::config::{AgentSettings, WorldConfig, load_config_or_default};
use crate::voxel::world::{VoxelWorld, WorldError};

/// Chunks kept resident around the agent, in chunks per direction.
const LOAD_RADIUS: i32 = 1;

pub struct VoxelPlugin {
    pub config: WorldConfig,
}

impl VoxelPlugin {
    pub fn new(config: WorldConfig) -> Self {
        Self { config }
    }

    /// Reads the YAML config, falling back to defaults when it is missing or
    /// malformed. Values are validated when the plugin builds.
    pub fn from_config_file(path: impl AsRef<Path>) -> Self {
        Self::new(load_config_or_default(path))
    }
}

/// The walking agent driven by `MovementIntent`.
#[derive(Resource, Debug)]
pub struct PlayerAgent(pub AgentBody);

/// Agent tuning copied from the world config.
#[derive(Resource, Clone, Debug)]
pub struct AgentTuning(pub AgentSettings);

impl Plugin for VoxelPlugin {
    fn build(&self, app: &mut App) {
        let (world, agent) = open_world(&self.config);

        app
            .insert_resource(world)
            .insert_resource(PlayerAgent(AgentBody::from_settings(&agent)))
            .insert_resource(AgentTuning(agent))
            .init_resource::<MovementIntent>()
            .add_systems(Startup, setup_voxel_world)
            .add_systems(FixedUpdate, apply_movement_system)
            .add_systems(Last, save_world_system);
    }
}

/// Opens the configured world. A store that cannot be opened falls back to
/// memory; an invalid config falls back to the built-in defaults.
fn open_world(config: &WorldConfig) -> (VoxelWorld, AgentSettings) {
    let err = match VoxelWorld::from_config(config) {
        Ok(world) => return (world, config.agent.clone()),
        Err(WorldError::Persistence(err)) => {
            warn!("Failed to open world storage ({}), using in-memory storage", err);
            match VoxelWorld::in_memory(config) {
                Ok(world) => return (world, config.agent.clone()),
                Err(err) => err,
            }
        }
        Err(err) => err,
    };
    error!("Invalid world config ({}), using defaults", err);
    (VoxelWorld::default(), AgentSettings::default())
}

fn setup_voxel_world(mut world: ResMut<VoxelWorld>, agent: Res<PlayerAgent>) {
    let loaded = world.load_area(agent.0.position, LOAD_RADIUS);
    info!(
        "Voxel world ready: {} chunks, {} voxels around spawn {:?}",
        loaded,
        world.voxel_count(),
        agent.0.position
    );
}

/// Fixed-rate agent tick. Keeps the surrounding chunks resident so the
/// agent never walks into unloaded air, then consumes the intent.
pub fn apply_movement_system(
    time: Res<Time>,
    mut world: ResMut<VoxelWorld>,
    mut agent: ResMut<PlayerAgent>,
    mut intent: ResMut<MovementIntent>,
    tuning: Res<AgentTuning>,
) {
    let dt = time.delta_secs();
    if dt <= 0.0 {
        return;
    }
    world.load_area(agent.0.position, LOAD_RADIUS);
    agent.0.step(&world, &intent, dt, &tuning.0);
    intent.jump = false;
}

/// Retries any chunk writes that failed earlier in the frame.
pub fn save_world_system(mut world: ResMut<VoxelWorld>) {
    let unsaved = world.save_modified();
    if unsaved > 0 {
        warn!("{} chunks still have unsaved changes", unsaved);
    }
}
