//! Sheepcount library - sheep crossing a field to an ambient lullaby

pub mod audio;
pub mod cli;
pub mod field;
pub mod params;
pub mod rendering;
pub mod session;
