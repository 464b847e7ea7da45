use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    WorkerGone,
    DebugDisabled,
}

impl std::error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        use Error::*;
        match self {
            WorkerGone => write!(f, "the hub worker is no longer running"),
            DebugDisabled => write!(f, "the hub was not started in debug mode"),
        }
    }
}
