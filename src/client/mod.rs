pub mod blockchain_gateway;
pub mod currencies;
pub mod exchanger;
pub mod gateway;
pub mod http_client;
pub mod notifier;
pub mod transactions_service;

pub use self::blockchain_gateway::*;
pub use self::currencies::*;
pub use self::exchanger::*;
pub use self::gateway::{GatewayService, RemoteGateway};
pub use self::http_client::*;
pub use self::notifier::{MailgunNotifier, Notifier};
pub use self::transactions_service::*;
