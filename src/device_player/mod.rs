pub mod impl_clock;
pub mod impl_fake;
pub mod interface;
