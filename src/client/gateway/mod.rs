//! Typed request / response calls to remote services.
//!
//! Every service answers with a json object carrying a status header
//! (`{"status": {"status": 0, "description": ""}, ...payload}`, some services name it `header`).
//! A call is retried on transport errors, server errors and timeouts, a status outside
//! of the caller's allow-list fails right away.

mod error;

use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use futures::future::{self, Loop};
use hyper::header::CONTENT_TYPE;
use hyper::{Body, Method, Request};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json;
use tokio::timer::Timeout;

pub use self::error::*;
use super::http_client::HttpClient;
use prelude::*;
use utils::read_body;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseHeader {
    pub status: i32,
    #[serde(default)]
    pub description: String,
}

/// Per service contract of a remote gateway
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub service: GatewayService,
    pub url: String,
    /// Name of the response field holding `ResponseHeader`
    pub header_field: &'static str,
    pub success_status: i32,
    /// Timeout of a single attempt
    pub timeout: Duration,
    pub attempts: usize,
}

#[derive(Clone)]
pub struct RemoteGateway {
    cli: Arc<HttpClient>,
    config: Arc<GatewayConfig>,
}

impl RemoteGateway {
    pub fn new(cli: Arc<HttpClient>, config: GatewayConfig) -> Self {
        Self {
            cli,
            config: Arc::new(config),
        }
    }

    pub fn service(&self) -> GatewayService {
        self.config.service
    }

    /// POSTs `request` as json to `path`. `allowed` lists response statuses treated as success,
    /// the ones other than the default success status are logged as warnings.
    pub fn call<Req, Resp>(&self, path: &str, request: &Req, allowed: &[i32]) -> Box<Future<Item = Resp, Error = Error> + Send>
    where
        Req: Serialize + Debug,
        Resp: DeserializeOwned + Send + 'static,
    {
        let service = self.config.service;
        let body = match serde_json::to_string(request) {
            Ok(body) => body,
            Err(e) => {
                let e: Error = ectx!(err e, ErrorSource::Json, ErrorKind::Internal => request);
                return Box::new(future::err(e));
            }
        };
        let url = format!("{}{}", self.config.url, path);
        let allowed = allowed.to_vec();
        let attempts = self.config.attempts.max(1);
        let gateway = self.clone();
        let gateway2 = self.clone();
        let url2 = url.clone();

        let fut = future::loop_fn(1usize, move |attempt| {
            let url = url.clone();
            gateway.attempt(url.clone(), body.clone()).then(move |res| match res {
                Ok(bytes) => Ok(Loop::Break(bytes)),
                Err(e) => {
                    if e.kind().is_retriable() && attempt < attempts {
                        warn!("{} call to {} failed on attempt {} of {}: {}", service, url, attempt, attempts, e);
                        Ok(Loop::Continue(attempt + 1))
                    } else {
                        Err(e)
                    }
                }
            })
        });

        Box::new(fut.and_then(move |bytes| gateway2.parse_response(&url2, &bytes, &allowed)))
    }

    fn attempt(&self, url: String, body: String) -> impl Future<Item = Vec<u8>, Error = Error> + Send {
        let service = self.config.service;
        let cli = self.cli.clone();
        let url2 = url.clone();
        let url3 = url.clone();
        let request: Result<Request<Body>, Error> = Request::builder()
            .uri(url.as_str())
            .method(Method::POST)
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .map_err(ectx!(try ErrorSource::Hyper, ErrorKind::Internal => url));
        let fut = request
            .into_future()
            .and_then(move |req| {
                cli.request(req).map_err(move |e| -> Error {
                    let kind = e.kind();
                    let gateway_kind = if kind.is_retriable() {
                        ErrorKind::Unavailable(service)
                    } else {
                        ErrorKind::BadResponse(service, format!("{}", kind))
                    };
                    ectx!(err e, ErrorSource::HttpClient, gateway_kind => url2)
                })
            }).and_then(move |resp| {
                read_body(resp.into_body()).map_err(ectx!(try ErrorSource::Hyper, ErrorKind::Unavailable(service) => url3))
            });
        Timeout::new(fut, self.config.timeout).map_err(move |e| -> Error {
            if e.is_elapsed() {
                ErrorKind::Timeout(service).into()
            } else if e.is_timer() {
                match e.into_timer() {
                    Some(timer_error) => ectx!(err timer_error, ErrorSource::Timer, ErrorKind::Internal),
                    None => ErrorKind::Internal.into(),
                }
            } else {
                e.into_inner().unwrap_or_else(|| ErrorKind::Internal.into())
            }
        })
    }

    fn parse_response<Resp: DeserializeOwned>(&self, url: &str, bytes: &[u8], allowed: &[i32]) -> Result<Resp, Error> {
        let service = self.config.service;
        let value: serde_json::Value = serde_json::from_slice(bytes)
            .map_err(ectx!(try ErrorSource::Json, ErrorKind::Malformed(service) => url, String::from_utf8_lossy(bytes)))?;
        let header = value
            .get(self.config.header_field)
            .cloned()
            .ok_or_else(|| ectx!(try err ErrorContext::MissingHeader, ErrorKind::Malformed(service) => url, value))?;
        let header: ResponseHeader =
            serde_json::from_value(header).map_err(ectx!(try ErrorSource::Json, ErrorKind::Malformed(service) => url))?;
        if !allowed.contains(&header.status) {
            let description = format!("Got status {}: {}", header.status, header.description.replace("\n", " "));
            return Err(ectx!(err ErrorContext::UnexpectedStatus, ErrorKind::BadResponse(service, description) => url, header));
        }
        if header.status != self.config.success_status {
            warn!("{} error, url: {}, status: {}, description: {}", service, url, header.status, header.description);
        }
        // decoded from the text again, `Value` loses the original form of numbers
        serde_json::from_slice(bytes).map_err(ectx!(ErrorSource::Json, ErrorKind::Malformed(service) => url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use client::http_client::mocks::{HttpClientMock, MockReply};
    use client::http_client::ErrorKind as HttpErrorKind;
    use models::Amount;
    use tokio::runtime::current_thread::Runtime;

    #[derive(Debug, Serialize)]
    struct Ping {
        id: u32,
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Pong {
        value: String,
    }

    fn gateway(cli: HttpClientMock, attempts: usize) -> RemoteGateway {
        RemoteGateway::new(
            Arc::new(cli),
            GatewayConfig {
                service: GatewayService::Exchanger,
                url: "http://exchanger".to_string(),
                header_field: "header",
                success_status: 0,
                timeout: Duration::from_millis(50),
                attempts,
            },
        )
    }

    fn ok_reply(status: i32) -> MockReply {
        MockReply::Json(format!(
            r#"{{"header": {{"status": {}, "description": "desc"}}, "value": "pong"}}"#,
            status
        ))
    }

    #[test]
    fn test_call_success() {
        let mut runtime = Runtime::new().unwrap();
        let cli = HttpClientMock::new(vec![ok_reply(0)]);
        let gateway = gateway(cli.clone(), 3);
        let pong: Pong = runtime.block_on(gateway.call("/ping", &Ping { id: 7 }, &[0])).unwrap();
        assert_eq!(pong.value, "pong");
        let requests = cli.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].uri, "http://exchanger/ping");
        assert_eq!(requests[0].body, r#"{"id":7}"#);
    }

    #[test]
    fn test_allowed_non_success_status_is_returned() {
        let mut runtime = Runtime::new().unwrap();
        let gateway = gateway(HttpClientMock::new(vec![ok_reply(2)]), 3);
        let pong: Pong = runtime.block_on(gateway.call("/ping", &Ping { id: 7 }, &[0, 2])).unwrap();
        assert_eq!(pong.value, "pong");
    }

    #[test]
    fn test_status_outside_allow_list_is_not_retried() {
        let mut runtime = Runtime::new().unwrap();
        let cli = HttpClientMock::new(vec![ok_reply(5)]);
        let gateway = gateway(cli.clone(), 3);
        let res: Result<Pong, Error> = runtime.block_on(gateway.call("/ping", &Ping { id: 7 }, &[0]));
        match res.unwrap_err().kind() {
            ErrorKind::BadResponse(GatewayService::Exchanger, description) => assert_eq!(description, "Got status 5: desc"),
            kind => panic!("unexpected error kind: {:?}", kind),
        }
        assert_eq!(cli.requests().len(), 1);
    }

    #[test]
    fn test_transport_errors_are_retried() {
        let mut runtime = Runtime::new().unwrap();
        let cli = HttpClientMock::new(vec![
            MockReply::Error(HttpErrorKind::Internal),
            MockReply::Error(HttpErrorKind::BadGateway),
            ok_reply(0),
        ]);
        let gateway = gateway(cli.clone(), 3);
        let pong: Pong = runtime.block_on(gateway.call("/ping", &Ping { id: 7 }, &[0])).unwrap();
        assert_eq!(pong.value, "pong");
        assert_eq!(cli.requests().len(), 3);
    }

    #[test]
    fn test_exhausted_attempts_give_typed_error() {
        let mut runtime = Runtime::new().unwrap();
        let cli = HttpClientMock::new(vec![MockReply::Error(HttpErrorKind::ServiceUnavailable)]);
        let gateway = gateway(cli.clone(), 2);
        let res: Result<Pong, Error> = runtime.block_on(gateway.call("/ping", &Ping { id: 7 }, &[0]));
        assert_eq!(res.unwrap_err().kind(), ErrorKind::Unavailable(GatewayService::Exchanger));
        assert_eq!(cli.requests().len(), 2);
    }

    #[test]
    fn test_client_errors_are_not_retried() {
        let mut runtime = Runtime::new().unwrap();
        let cli = HttpClientMock::new(vec![MockReply::Error(HttpErrorKind::BadRequest)]);
        let gateway = gateway(cli.clone(), 3);
        let res: Result<Pong, Error> = runtime.block_on(gateway.call("/ping", &Ping { id: 7 }, &[0]));
        assert_eq!(res.unwrap_err().kind().service(), Some(GatewayService::Exchanger));
        assert_eq!(cli.requests().len(), 1);
    }

    #[test]
    fn test_timeout_is_retried_then_reported() {
        let mut runtime = Runtime::new().unwrap();
        let cli = HttpClientMock::new(vec![MockReply::Hang]);
        let gateway = gateway(cli.clone(), 2);
        let res: Result<Pong, Error> = runtime.block_on(gateway.call("/ping", &Ping { id: 7 }, &[0]));
        assert_eq!(res.unwrap_err().kind(), ErrorKind::Timeout(GatewayService::Exchanger));
        assert_eq!(cli.requests().len(), 2);
    }

    #[test]
    fn test_json_numbers_keep_their_decimal_digits() {
        #[derive(Debug, Deserialize)]
        struct Balance {
            balance: Amount,
        }

        let mut runtime = Runtime::new().unwrap();
        let reply = MockReply::Json(r#"{"header": {"status": 0}, "balance": 1.25}"#.to_string());
        let gateway = gateway(HttpClientMock::new(vec![reply]), 3);
        let balance: Balance = runtime.block_on(gateway.call("/balance", &Ping { id: 7 }, &[0])).unwrap();
        assert_eq!(balance.balance, "1.25".parse().unwrap());
    }

    #[test]
    fn test_missing_header_is_malformed() {
        let mut runtime = Runtime::new().unwrap();
        let gateway = gateway(HttpClientMock::new(vec![MockReply::Json(r#"{"value": "pong"}"#.to_string())]), 3);
        let res: Result<Pong, Error> = runtime.block_on(gateway.call("/ping", &Ping { id: 7 }, &[0]));
        assert_eq!(res.unwrap_err().kind(), ErrorKind::Malformed(GatewayService::Exchanger));
    }
}
