use std::fmt;
use std::fmt::Display;

use failure::{Backtrace, Context, Fail};

#[derive(Debug)]
pub struct Error {
    inner: Context<ErrorKind>,
}

#[allow(dead_code)]
#[derive(Clone, Debug, PartialEq, Eq, Fail)]
pub enum ErrorKind {
    #[fail(display = "lock error - not enough lock nodes are reachable")]
    Unavailable,
    #[fail(display = "lock error - internal error")]
    Internal,
}

#[allow(dead_code)]
#[derive(Copy, Clone, Eq, PartialEq, Debug, Fail)]
pub enum ErrorSource {
    #[fail(display = "lock source - error inside of Diesel library")]
    Diesel,
    #[fail(display = "lock source - error inside of r2d2 library")]
    R2D2,
}

#[allow(dead_code)]
#[derive(Copy, Clone, Eq, PartialEq, Debug, Fail)]
pub enum ErrorContext {
    #[fail(display = "lock context - quorum is not reachable")]
    Quorum,
}

derive_error_impls!();
