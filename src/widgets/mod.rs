pub mod bucket_dialog;
pub mod combine_menu;
pub mod controls;
pub mod debug;
pub mod quartiles_plot;
pub mod surface;
pub mod text_input;
pub mod text_overlay;
