pub mod bridge;
pub mod wire;
