pub mod log;
pub mod reassembly;
