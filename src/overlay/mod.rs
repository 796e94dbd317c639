pub mod impl_egui;
pub mod impl_fake;
pub mod interface;
pub mod renderer;
