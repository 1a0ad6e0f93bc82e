use failure::{Backtrace, Context, Fail};
use std::fmt;
use std::fmt::Display;

#[derive(Debug)]
pub struct Error {
    inner: Context<ErrorKind>,
}

#[allow(dead_code)]
#[derive(Clone, Eq, PartialEq, Debug, Fail)]
pub enum ErrorKind {
    #[fail(display = "http client error - bad request")]
    BadRequest,
    #[fail(display = "http client error - unauthorized")]
    Unauthorized,
    #[fail(display = "http client error - not found")]
    NotFound,
    #[fail(display = "http client error - unprocessable entity: {}", _0)]
    UnprocessableEntity(String),
    #[fail(display = "http client error - internal server error")]
    InternalServer,
    #[fail(display = "http client error - bad gateway")]
    BadGateway,
    #[fail(display = "http client error - service unavailable")]
    ServiceUnavailable,
    #[fail(display = "http client error - gateway timeout")]
    GatewayTimeout,
    #[fail(display = "http client error - unknown server error status")]
    UnknownServerError,
    #[fail(display = "http client error - internal error")]
    Internal,
}

impl ErrorKind {
    /// Transport failures and server side errors may go away on the next attempt,
    /// client errors won't
    pub fn is_retriable(&self) -> bool {
        match self {
            ErrorKind::Internal
            | ErrorKind::InternalServer
            | ErrorKind::BadGateway
            | ErrorKind::ServiceUnavailable
            | ErrorKind::GatewayTimeout
            | ErrorKind::UnknownServerError => true,
            _ => false,
        }
    }
}

#[allow(dead_code)]
#[derive(Copy, Clone, Eq, PartialEq, Debug, Fail)]
pub enum ErrorSource {
    #[fail(display = "http client source - error inside of Hyper library")]
    Hyper,
    #[fail(display = "http client source - server returned response with error")]
    Server,
}

derive_error_impls!();
