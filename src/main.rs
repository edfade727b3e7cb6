//! # pihash CLI
//!
//! Command-line interface for perceptual image hashing.
//!
//! ## Usage
//! ```bash
//! pihash photo.jpg
//! pihash -a -p photo.jpg other.jpg --output json
//! ```

mod cli;

use pihash::Result;
use std::process::ExitCode;

fn main() -> Result<ExitCode> {
    cli::run()
}
