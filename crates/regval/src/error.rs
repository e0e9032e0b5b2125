use thiserror::Error;

use crate::listing::ListingError;

/// Pipeline errors. Analysis failures are per function and reported as
/// diagnostics, not here.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("listing error: {0}")]
    Listing(#[from] ListingError),
    #[error("unknown {arch} register `{name}`")]
    UnknownRegister { arch: &'static str, name: String },
    #[error("observed values line {line}: {message}")]
    Observed { line: usize, message: String },
}

pub type Result<T> = std::result::Result<T, Error>;
