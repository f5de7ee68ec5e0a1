pub mod gate;
pub mod releases;
