//! Benchmark kernels. Each is a plain computation plus a driver that writes its output
//! to any [`std::io::Write`] sink.

pub mod fibonacci;
pub mod records;
pub mod series;


pub use records::{Record, RecordBatch};
