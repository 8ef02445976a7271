pub mod ecs;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod input;
pub mod iso;
pub mod renderer;
