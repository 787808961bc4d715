pub mod file_handlers;
pub mod status_handlers;
