use std::{fmt, io};

use oauth2_introspection_auth::{auth, configuration};

#[derive(Debug)]
pub enum Error {
    IO(io::Error),
    Configuration(configuration::Error),
    Auth(auth::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::IO(err) => write!(f, "IO error: {err}"),
            Error::Configuration(err) => write!(f, "Configuration error: {err}"),
            Error::Auth(err) => write!(f, "Authentication setup error: {err}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::IO(err)
    }
}

impl From<configuration::Error> for Error {
    fn from(err: configuration::Error) -> Self {
        Error::Configuration(err)
    }
}

impl From<auth::Error> for Error {
    fn from(err: auth::Error) -> Self {
        Error::Auth(err)
    }
}
