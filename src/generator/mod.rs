//! E2K file generator module.

mod e2k;

pub use e2k::{default_output_path, format_file_size, generate_e2k, GenerateE2kRequest};
