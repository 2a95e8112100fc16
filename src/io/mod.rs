//! Reading sampler output into chains, and writing chains back out.

pub mod discovery;
pub mod reader;

#[cfg(feature = "csv")]
pub mod csv;

pub use discovery::{discover_chain_files, read_chain_files, read_chain_files_with_progress};
pub use reader::{read_chain, read_chain_file, ChainReader};
