use std::collections::BTreeSet;
use std::time::Duration;

use bevy::log::LogPlugin;
use bevy::prelude::*;
use voxel_sandbox::agent::MovementIntent;
use voxel_sandbox::constants::DEFAULT_CONFIG_PATH;
use voxel_sandbox::voxel::plugin::{PlayerAgent, VoxelPlugin};
use voxel_sandbox::voxel::types::Material;
use voxel_sandbox::voxel::world::VoxelWorld;

/// Frames the headless demo runs before exiting.
const DEMO_FRAMES: u32 = 300;

fn main() {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

    let mut app = App::new();
    app
        .add_plugins(MinimalPlugins)
        .add_plugins(LogPlugin::default())
        .add_plugins(VoxelPlugin::from_config_file(&config_path))
        .add_systems(Update, scripted_walk_system);
    app.finish();
    app.cleanup();

    for _ in 0..DEMO_FRAMES {
        app.update();
        std::thread::sleep(Duration::from_millis(16));
    }

    let agent = &app.world().resource::<PlayerAgent>().0;
    let world = app.world().resource::<VoxelWorld>();
    info!(
        "Finished at {:?} (grounded: {}), {} chunks resident, {} voxels",
        agent.position,
        agent.grounded,
        world.chunk_count(),
        world.voxel_count()
    );

    let mut draw_groups = 0;
    let mut indices = 0;
    let mut flat_colors = BTreeSet::new();
    for (_, mesh) in world.meshes() {
        draw_groups += mesh.groups.len();
        indices += mesh.indices.len();
        for group in &mesh.groups {
            if !matches!(group.material, Material::Texture(_)) {
                flat_colors.insert(group.material.fallback_color());
            }
        }
    }
    info!(
        "Meshes: {} draw groups, {} indices, {} untextured colors",
        draw_groups,
        indices,
        flat_colors.len()
    );
}

// Walks in a slow circle and hops every two seconds
fn scripted_walk_system(time: Res<Time>, mut intent: ResMut<MovementIntent>) {
    let t = time.elapsed_secs();
    intent.horizontal = Vec2::new((t * 0.5).cos(), (t * 0.5).sin());
    if (t % 2.0) < time.delta_secs() {
        intent.jump = true;
    }
}
