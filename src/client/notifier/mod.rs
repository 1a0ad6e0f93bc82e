//! Delivery of rendered html notifications to operators through mailgun.

mod error;

use std::sync::Arc;

use base64;
use futures::future;
use hyper::header::{AUTHORIZATION, CONTENT_TYPE};
use hyper::{Body, Method, Request};
use serde_qs;

pub use self::error::*;
use super::HttpClient;
use config::Mail;
use prelude::*;

/// Notification channel, delivers `html` under `subject` to the configured recipients
pub trait Notifier: Send + Sync + 'static {
    fn send(&self, subject: String, html: String) -> Box<Future<Item = (), Error = Error> + Send>;
}

#[derive(Debug, Serialize)]
struct MailgunForm {
    from: String,
    to: String,
    subject: String,
    html: String,
}

#[derive(Clone)]
pub struct MailgunNotifier {
    cli: Arc<HttpClient>,
    config: Mail,
}

impl MailgunNotifier {
    pub fn new(config: Mail, cli: Arc<HttpClient>) -> Self {
        Self { cli, config }
    }

    fn build_request(&self, subject: String, html: String) -> Result<Request<Body>, Error> {
        let form = MailgunForm {
            from: self.config.from.clone(),
            to: self.config.to.join(","),
            subject,
            html,
        };
        let body = serde_qs::to_string(&form).map_err(|e| {
            let e = format_err!("{}", e);
            ectx!(try err e, ErrorSource::SerdeQs, ErrorKind::Internal => form)
        })?;
        let url = format!("{}/{}/messages", self.config.api_url.trim_right_matches('/'), self.config.domain);
        let credentials = base64::encode(&format!("api:{}", self.config.api_key));
        Request::builder()
            .method(Method::POST)
            .uri(url.as_str())
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header(AUTHORIZATION, format!("Basic {}", credentials))
            .body(Body::from(body))
            .map_err(ectx!(try ErrorKind::Internal => url))
    }
}

impl Notifier for MailgunNotifier {
    fn send(&self, subject: String, html: String) -> Box<Future<Item = (), Error = Error> + Send> {
        let req = match self.build_request(subject.clone(), html) {
            Ok(req) => req,
            Err(e) => return Box::new(future::err(e)),
        };
        Box::new(
            self.cli
                .request(req)
                .map_err(ectx!(convert ErrorSource::HttpClient => subject))
                .map(|_| ()),
        )
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use client::http_client::mocks::{HttpClientMock, MockReply};
    use client::http_client::ErrorKind as HttpClientErrorKind;
    use config::Config;
    use tokio_core::reactor::Core;

    #[test]
    fn test_send_posts_form_with_basic_auth() {
        let mut core = Core::new().unwrap();
        let mut config = Config::new().unwrap().mail;
        config.api_url = "https://api.mailgun.net/v3/".to_string();
        config.domain = "mg.example.com".to_string();
        config.api_key = "key-1".to_string();
        config.from = "wallets@example.com".to_string();
        config.to = vec!["a@example.com".to_string(), "b@example.com".to_string()];
        let cli = HttpClientMock::new(vec![MockReply::Json("{}".to_string())]);
        let notifier = MailgunNotifier::new(config, Arc::new(cli.clone()));
        core.run(notifier.send("Balances".to_string(), "<b>low</b>".to_string())).unwrap();

        let requests = cli.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, "POST");
        assert_eq!(requests[0].uri, "https://api.mailgun.net/v3/mg.example.com/messages");
        assert!(requests[0]
            .headers
            .contains(&("authorization".to_string(), format!("Basic {}", base64::encode("api:key-1")))));
        assert!(requests[0].body.contains("subject=Balances"));
        assert!(requests[0].body.contains("html="));
    }

    #[test]
    fn test_send_maps_server_errors_to_unavailable() {
        let mut core = Core::new().unwrap();
        let config = Config::new().unwrap().mail;
        let cli = HttpClientMock::new(vec![MockReply::Error(HttpClientErrorKind::ServiceUnavailable)]);
        let notifier = MailgunNotifier::new(config, Arc::new(cli));
        let err = core.run(notifier.send("s".to_string(), "h".to_string())).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unavailable);
    }
}
