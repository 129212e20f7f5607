pub mod build;
pub mod normalize;
pub mod render;
