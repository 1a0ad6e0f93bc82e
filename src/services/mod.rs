//! Domain operations behind the inbound entry points of the service

mod error;
mod wallets;

pub use self::error::*;
pub use self::wallets::*;

use prelude::*;

pub type ServiceFuture<T> = Box<Future<Item = T, Error = Error> + Send>;
