pub mod errors;
pub mod filter;
pub mod pipeline;
pub mod ports;
pub mod transform;
