pub mod controller;

pub use controller::{AgentBody, MovementIntent};
