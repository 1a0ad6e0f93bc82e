use std::fmt;
use std::fmt::Display;

use failure::{Backtrace, Context, Fail};

use client::http_client::ErrorKind as HttpClientErrorKind;

#[derive(Debug)]
pub struct Error {
    inner: Context<ErrorKind>,
}

#[allow(dead_code)]
#[derive(Clone, Debug, PartialEq, Eq, Fail)]
pub enum ErrorKind {
    #[fail(display = "notifier error - mail service is unavailable")]
    Unavailable,
    #[fail(display = "notifier error - mail was rejected: {}", _0)]
    Rejected(String),
    #[fail(display = "notifier error - internal error")]
    Internal,
}

#[allow(dead_code)]
#[derive(Copy, Clone, Eq, PartialEq, Debug, Fail)]
pub enum ErrorSource {
    #[fail(display = "notifier source - error inside of http client")]
    HttpClient,
    #[fail(display = "notifier source - error encoding form")]
    SerdeQs,
}

impl From<HttpClientErrorKind> for ErrorKind {
    fn from(kind: HttpClientErrorKind) -> Self {
        if kind.is_retriable() {
            ErrorKind::Unavailable
        } else {
            ErrorKind::Rejected(format!("{}", kind))
        }
    }
}

derive_error_impls!();
