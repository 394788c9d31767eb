pub mod api;
pub mod scripts;
pub mod ws;
