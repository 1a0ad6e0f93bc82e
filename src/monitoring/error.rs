use std::fmt;
use std::fmt::Display;

use failure::{Backtrace, Context, Fail};

use client::gateway::ErrorKind as GatewayErrorKind;
use client::notifier::ErrorKind as NotifierErrorKind;
use client::GatewayService;
use locks::ErrorKind as LocksErrorKind;
use repos::{Error as ReposError, ErrorKind as ReposErrorKind};

#[derive(Debug)]
pub struct Error {
    inner: Context<ErrorKind>,
}

#[allow(dead_code)]
#[derive(Clone, Debug, PartialEq, Eq, Fail)]
pub enum ErrorKind {
    #[fail(display = "monitoring error - lock backend is unavailable")]
    LockUnavailable,
    #[fail(display = "monitoring error - {} failed", _0)]
    Gateway(GatewayService),
    #[fail(display = "monitoring error - notification was not delivered")]
    Notification,
    #[fail(display = "monitoring error - cycle panicked: {}", _0)]
    Panic(String),
    #[fail(display = "monitoring error - internal error")]
    Internal,
}

#[allow(dead_code)]
#[derive(Copy, Clone, Eq, PartialEq, Debug, Fail)]
pub enum ErrorSource {
    #[fail(display = "monitoring source - error inside of repos")]
    Repo,
    #[fail(display = "monitoring source - error inside of lock manager")]
    Lock,
    #[fail(display = "monitoring source - error inside of remote gateway")]
    Gateway,
    #[fail(display = "monitoring source - error inside of notifier")]
    Notifier,
    #[fail(display = "monitoring source - error inside of tokio timer")]
    Timer,
}

derive_error_impls!();

impl From<ReposErrorKind> for ErrorKind {
    fn from(_: ReposErrorKind) -> Self {
        ErrorKind::Internal
    }
}

impl From<ReposError> for Error {
    fn from(e: ReposError) -> Self {
        ectx!(convert err e, ErrorSource::Repo)
    }
}

impl From<LocksErrorKind> for ErrorKind {
    fn from(kind: LocksErrorKind) -> Self {
        match kind {
            LocksErrorKind::Unavailable => ErrorKind::LockUnavailable,
            LocksErrorKind::Internal => ErrorKind::Internal,
        }
    }
}

impl From<GatewayErrorKind> for ErrorKind {
    fn from(kind: GatewayErrorKind) -> Self {
        kind.service().map(ErrorKind::Gateway).unwrap_or(ErrorKind::Internal)
    }
}

impl From<NotifierErrorKind> for ErrorKind {
    fn from(_: NotifierErrorKind) -> Self {
        ErrorKind::Notification
    }
}
