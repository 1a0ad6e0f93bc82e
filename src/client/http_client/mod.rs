pub mod error;

use config::Config;
use failure::Fail;
use futures::future::{self, Either};
use futures::prelude::*;
use hyper;
use hyper::{client::HttpConnector, Body, Request, Response};
use hyper_tls::HttpsConnector;
use log::{self, Level};

pub use self::error::*;
use utils::read_body;

pub trait HttpClient: Send + Sync + 'static {
    fn request(&self, req: Request<Body>) -> Box<Future<Item = Response<Body>, Error = Error> + Send>;
}

#[derive(Clone)]
pub struct HttpClientImpl {
    cli: hyper::Client<HttpsConnector<HttpConnector>>,
}

impl HttpClientImpl {
    pub fn new(config: &Config) -> Self {
        let connector = HttpsConnector::new(config.client.dns_threads).unwrap_or_else(|e| panic!("Failed to create https connector: {}", e));
        let cli = hyper::Client::builder().build(connector);
        Self { cli }
    }
}

impl HttpClient for HttpClientImpl {
    fn request(&self, req: Request<Body>) -> Box<Future<Item = Response<Body>, Error = Error> + Send> {
        let cli = self.cli.clone();
        let level = log::max_level();
        let fut = if level == Level::Debug || level == Level::Trace {
            let (parts, body) = req.into_parts();
            Either::A(
                read_body(body)
                    .map_err(ectx!(ErrorSource::Hyper, ErrorKind::Internal))
                    .and_then(move |body| {
                        debug!(
                            "HttpClient, sent request {} {}, headers: {:#?}, body: {:?}",
                            parts.method,
                            parts.uri,
                            parts.headers,
                            String::from_utf8(body.clone()).ok()
                        );
                        let req = Request::from_parts(parts, body.into());
                        cli.request(req).map_err(ectx!(ErrorSource::Hyper, ErrorKind::Internal))
                    }).and_then(|resp| {
                        let (parts, body) = resp.into_parts();
                        read_body(body)
                            .map_err(ectx!(ErrorSource::Hyper, ErrorKind::Internal))
                            .map(|body| (parts, body))
                    }).map(|(parts, body)| {
                        debug!(
                            "HttpClient, received response with status {} headers: {:#?} and body: {:?}",
                            parts.status.as_u16(),
                            parts.headers,
                            String::from_utf8(body.clone()).ok()
                        );
                        Response::from_parts(parts, body.into())
                    }),
            )
        } else {
            Either::B(cli.request(req).map_err(ectx!(ErrorSource::Hyper, ErrorKind::Internal)))
        };

        Box::new(fut.and_then(check_status))
    }
}

fn check_status(resp: Response<Body>) -> impl Future<Item = Response<Body>, Error = Error> + Send {
    if !resp.status().is_client_error() && !resp.status().is_server_error() {
        return Either::B(future::ok(resp));
    }
    let status = resp.status().as_u16();
    Either::A(match status {
        422 => Either::A(read_body(resp.into_body()).then(|body| match body {
            Ok(b) => future::err(ectx!(err ErrorSource::Server, ErrorKind::UnprocessableEntity(String::from_utf8(b).unwrap_or_default()))),
            Err(_) => future::err(ectx!(err ErrorSource::Server, ErrorKind::UnknownServerError)),
        })),
        _ => {
            let kind = match status {
                400 => ErrorKind::BadRequest,
                401 => ErrorKind::Unauthorized,
                404 => ErrorKind::NotFound,
                500 => ErrorKind::InternalServer,
                502 => ErrorKind::BadGateway,
                503 => ErrorKind::ServiceUnavailable,
                504 => ErrorKind::GatewayTimeout,
                _ => ErrorKind::UnknownServerError,
            };
            Either::B(future::err(ectx!(err ErrorSource::Server, kind => status)))
        }
    })
}

#[cfg(test)]
pub mod mocks {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use futures::future;
    use hyper::{Body, Request, Response, StatusCode};

    use super::*;

    /// Scripted reply of `HttpClientMock`
    #[derive(Clone, Debug)]
    pub enum MockReply {
        /// 200 with json body
        Json(String),
        /// Transport level failure
        Error(ErrorKind),
        /// Never resolves, for timeouts
        Hang,
    }

    #[derive(Clone, Debug, PartialEq)]
    pub struct RecordedRequest {
        pub method: String,
        pub uri: String,
        pub headers: Vec<(String, String)>,
        pub body: String,
    }

    /// Replays scripted replies in order, the last one repeats
    #[derive(Clone, Default)]
    pub struct HttpClientMock {
        replies: Arc<Mutex<VecDeque<MockReply>>>,
        requests: Arc<Mutex<Vec<RecordedRequest>>>,
    }

    impl HttpClientMock {
        pub fn new(replies: Vec<MockReply>) -> Self {
            Self {
                replies: Arc::new(Mutex::new(replies.into_iter().collect())),
                requests: Default::default(),
            }
        }

        pub fn requests(&self) -> Vec<RecordedRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    impl HttpClient for HttpClientMock {
        fn request(&self, req: Request<Body>) -> Box<Future<Item = Response<Body>, Error = Error> + Send> {
            let reply = {
                let mut replies = self.replies.lock().unwrap();
                if replies.len() > 1 {
                    replies.pop_front()
                } else {
                    replies.front().cloned()
                }
            };
            let requests = self.requests.clone();
            let (parts, body) = req.into_parts();
            let headers = parts
                .headers
                .iter()
                .map(|(name, value)| (name.as_str().to_string(), value.to_str().unwrap_or_default().to_string()))
                .collect();
            Box::new(read_body(body).then(move |body| {
                requests.lock().unwrap().push(RecordedRequest {
                    method: parts.method.to_string(),
                    uri: parts.uri.to_string(),
                    headers,
                    body: String::from_utf8(body.unwrap_or_default()).unwrap_or_default(),
                });
                match reply {
                    Some(MockReply::Json(json)) => {
                        let resp = Response::builder().status(StatusCode::OK).body(Body::from(json)).unwrap();
                        Box::new(future::ok(resp)) as Box<Future<Item = Response<Body>, Error = Error> + Send>
                    }
                    Some(MockReply::Error(kind)) => {
                        let e: Error = ectx!(err ErrorSource::Server, kind);
                        Box::new(future::err(e))
                    }
                    Some(MockReply::Hang) => Box::new(future::empty::<Response<Body>, Error>()),
                    None => {
                        let e: Error = ectx!(err ErrorKind::Internal, ErrorKind::Internal);
                        Box::new(future::err(e))
                    }
                }
            }))
        }
    }
}
