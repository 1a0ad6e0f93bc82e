use std::fmt;
use std::fmt::Display;

use failure::{Backtrace, Context, Fail};
use validator::ValidationErrors;

use client::gateway::ErrorKind as GatewayErrorKind;
use client::GatewayService;
use repos::{Error as ReposError, ErrorKind as ReposErrorKind};

#[derive(Debug)]
pub struct Error {
    inner: Context<ErrorKind>,
}

#[allow(dead_code)]
#[derive(Clone, Debug, Fail)]
pub enum ErrorKind {
    #[fail(display = "service error - invalid input, errors: {}", _0)]
    InvalidInput(ValidationErrors),
    #[fail(display = "service error - not found")]
    NotFound,
    #[fail(display = "service error - {} failed", _0)]
    Gateway(GatewayService),
    #[fail(display = "service error - internal error")]
    Internal,
}

#[allow(dead_code)]
#[derive(Copy, Clone, Eq, PartialEq, Debug, Fail)]
pub enum ErrorSource {
    #[fail(display = "service source - error inside of repos")]
    Repo,
    #[fail(display = "service source - error inside of remote gateway")]
    Gateway,
}

#[allow(dead_code)]
#[derive(Copy, Clone, Eq, PartialEq, Debug, Fail)]
pub enum ErrorContext {
    #[fail(display = "service context - wallet not found")]
    WalletNotFound,
    #[fail(display = "service context - no platform wallet with such address and currency")]
    PlatformWalletNotFound,
}

derive_error_impls!();

impl From<ReposErrorKind> for ErrorKind {
    fn from(kind: ReposErrorKind) -> Self {
        match kind {
            ReposErrorKind::Constraints(errors) => ErrorKind::InvalidInput(errors),
            ReposErrorKind::Internal => ErrorKind::Internal,
        }
    }
}

impl From<ReposError> for Error {
    fn from(e: ReposError) -> Self {
        ectx!(convert err e, ErrorSource::Repo)
    }
}

impl From<GatewayErrorKind> for ErrorKind {
    fn from(kind: GatewayErrorKind) -> Self {
        kind.service().map(ErrorKind::Gateway).unwrap_or(ErrorKind::Internal)
    }
}
