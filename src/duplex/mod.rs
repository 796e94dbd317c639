pub mod impl_fake;
pub mod impl_websocket;
pub mod interface;
