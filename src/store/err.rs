use std::fmt;

#[derive(Debug)]
pub enum Error {
    NotFound,
    PgPool(r2d2::Error),
    Pg(postgres::Error),
    Worker(String),
}

impl Error {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}

impl std::error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        use Error::*;
        match self {
            NotFound => write!(f, "record not found"),
            PgPool(e) => write!(f, "{}", e),
            Pg(e) => write!(f, "{}", e),
            Worker(e) => write!(f, "store task failed: {}", e),
        }
    }
}

impl From<r2d2::Error> for Error {
    fn from(e: r2d2::Error) -> Self {
        Self::PgPool(e)
    }
}
impl From<postgres::Error> for Error {
    fn from(e: postgres::Error) -> Self {
        Self::Pg(e)
    }
}

impl warp::reject::Reject for Error {}
