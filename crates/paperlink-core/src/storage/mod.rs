pub mod checkpoint;
pub mod dump;
pub mod json_file;
pub mod mapping;
