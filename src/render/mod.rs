pub mod layout;
pub mod overlays;
