//! Voxel world core for a block sandbox: chunked sparse storage, per-material
//! chunk meshes, noise terrain, pluggable chunk persistence and box-vs-voxel
//! collision for a walking agent.

pub mod constants;
pub mod config;
pub mod voxel;
pub mod collision;
pub mod agent;
pub mod interaction;
