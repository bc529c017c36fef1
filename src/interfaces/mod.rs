pub mod cli;
pub mod csv;
