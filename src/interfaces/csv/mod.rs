//! Batch payment instructions in, results out.

pub mod instruction_reader;
pub mod result_writer;
