use std::fmt;
use std::fmt::Display;

use failure::{Backtrace, Context, Fail};

/// Remote service a gateway error comes from, so that callers can apply service specific fallback
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum GatewayService {
    BlockchainGateway,
    Currencies,
    Transactions,
    Exchanger,
}

impl Display for GatewayService {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            GatewayService::BlockchainGateway => "blockchain gateway",
            GatewayService::Currencies => "currencies service",
            GatewayService::Transactions => "transactions service",
            GatewayService::Exchanger => "exchanger service",
        };
        f.write_str(name)
    }
}

#[derive(Debug)]
pub struct Error {
    inner: Context<ErrorKind>,
}

#[allow(dead_code)]
#[derive(Clone, Debug, PartialEq, Eq, Fail)]
pub enum ErrorKind {
    #[fail(display = "gateway error - {} is unavailable", _0)]
    Unavailable(GatewayService),
    #[fail(display = "gateway error - {} timed out", _0)]
    Timeout(GatewayService),
    #[fail(display = "gateway error - bad response from {}: {}", _0, _1)]
    BadResponse(GatewayService, String),
    #[fail(display = "gateway error - malformed response from {}", _0)]
    Malformed(GatewayService),
    #[fail(display = "gateway error - internal error")]
    Internal,
}

impl ErrorKind {
    pub fn service(&self) -> Option<GatewayService> {
        match self {
            ErrorKind::Unavailable(service)
            | ErrorKind::Timeout(service)
            | ErrorKind::BadResponse(service, _)
            | ErrorKind::Malformed(service) => Some(*service),
            ErrorKind::Internal => None,
        }
    }

    /// Only transport failures and timeouts are worth another attempt
    pub fn is_retriable(&self) -> bool {
        match self {
            ErrorKind::Unavailable(_) | ErrorKind::Timeout(_) => true,
            _ => false,
        }
    }
}

#[allow(dead_code)]
#[derive(Copy, Clone, Eq, PartialEq, Debug, Fail)]
pub enum ErrorSource {
    #[fail(display = "gateway source - error inside of Hyper library")]
    Hyper,
    #[fail(display = "gateway source - error inside of http client")]
    HttpClient,
    #[fail(display = "gateway source - error parsing json")]
    Json,
    #[fail(display = "gateway source - error inside of tokio timer")]
    Timer,
}

#[allow(dead_code)]
#[derive(Copy, Clone, Eq, PartialEq, Debug, Fail)]
pub enum ErrorContext {
    #[fail(display = "gateway context - response status is not allowed")]
    UnexpectedStatus,
    #[fail(display = "gateway context - response has no status header")]
    MissingHeader,
}

derive_error_impls!();
