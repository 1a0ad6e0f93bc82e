use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::{self, Either};

use super::error::*;
use super::{CycleReport, Monitor};
use client::{BlockchainGatewayClient, CurrenciesClient, Notifier};
use config::{Balances, Mail};
use models::*;
use prelude::*;
use utils::{log_error, log_warn};

pub const RATES_UNAVAILABLE_WARNING: &str = "Attention, service currencies is unavailable";

/// Row of the balances report
#[derive(Debug, Clone, PartialEq)]
pub struct BalanceRow {
    pub currency_slug: CurrencySlug,
    pub value: Amount,
    /// Currency `value` is expressed in
    pub current: String,
}

/// Emails balances of platform wallets that fell to their floor in the reference currency.
/// Without rates all balances are sent in their own currencies, with a warning, which is
/// sent even if there are no balances at all.
pub struct CheckWalletMonitor {
    period: Duration,
    balances: Balances,
    subject: String,
    blockchain_gateway: Arc<BlockchainGatewayClient>,
    currencies: Arc<CurrenciesClient>,
    notifier: Arc<Notifier>,
}

impl CheckWalletMonitor {
    pub fn new(
        period: Duration,
        balances: Balances,
        mail: &Mail,
        blockchain_gateway: Arc<BlockchainGatewayClient>,
        currencies: Arc<CurrenciesClient>,
        notifier: Arc<Notifier>,
    ) -> Self {
        Self {
            period,
            balances,
            subject: mail.balances_subject.clone(),
            blockchain_gateway,
            currencies,
            notifier,
        }
    }
}

impl Monitor for CheckWalletMonitor {
    fn name(&self) -> &'static str {
        "check_wallet"
    }

    fn period(&self) -> Duration {
        self.period
    }

    fn run_cycle(&self) -> Box<Future<Item = CycleReport, Error = Error> + Send> {
        let balances_config = self.balances.clone();
        let subject = self.subject.clone();
        let notifier = self.notifier.clone();
        let wallet_balances = self
            .blockchain_gateway
            .get_platform_wallets_balance()
            .map_err(ectx!(try convert ErrorSource::Gateway));
        let rates = self.currencies.get_rates().then(|res| -> Result<Option<Vec<CurrencyRate>>, Error> {
            match res {
                Ok(rates) => Ok(Some(rates)),
                Err(e) => {
                    log_warn(&e);
                    Ok(None)
                }
            }
        });
        Box::new(wallet_balances.join(rates).and_then(move |(wallet_balances, rates)| {
            let entities = wallet_balances.len();
            let (rows, warning) = match rates {
                Some(rates) => (rows_below_floor(wallet_balances, &rates, &balances_config), None),
                None => (raw_rows(wallet_balances), Some(RATES_UNAVAILABLE_WARNING)),
            };
            let report = CycleReport {
                entities,
                written: rows.len(),
                ..Default::default()
            };
            // the warning goes out even with nothing to list
            if rows.is_empty() && warning.is_none() {
                return Either::A(future::ok(report));
            }
            let html = render_balances(&rows, warning);
            Either::B(notifier.send(subject, html).then(move |res| {
                if let Err(e) = res {
                    log_error(&e);
                }
                Ok(report)
            }))
        }))
    }
}

/// Balances converted to the reference currency, only the ones at or below their floor.
/// A currency without a rate counts as zero.
pub fn rows_below_floor(wallet_balances: Vec<WalletBalance>, rates: &[CurrencyRate], balances: &Balances) -> Vec<BalanceRow> {
    let rates: HashMap<&CurrencySlug, Amount> = rates.iter().map(|rate| (&rate.slug, rate.rate)).collect();
    wallet_balances
        .into_iter()
        .filter_map(|balance| {
            let converted = rates
                .get(&balance.currency_slug)
                .and_then(|rate| balance.value.mul_rate(*rate))
                .and_then(|value| value.round_half_up(3))
                .unwrap_or_default();
            if converted <= balances.floor_for(&balance.currency_slug) {
                Some(BalanceRow {
                    currency_slug: balance.currency_slug,
                    value: converted,
                    current: balances.reference_currency.clone(),
                })
            } else {
                None
            }
        }).collect()
}

pub fn raw_rows(wallet_balances: Vec<WalletBalance>) -> Vec<BalanceRow> {
    wallet_balances
        .into_iter()
        .map(|balance| BalanceRow {
            current: balance.currency_slug.to_string(),
            currency_slug: balance.currency_slug,
            value: balance.value,
        }).collect()
}

pub fn render_balances(rows: &[BalanceRow], warning: Option<&str>) -> String {
    let mut html = String::from("<html><body>");
    if let Some(warning) = warning {
        html.push_str(&format!("<p><b>{}</b></p>", warning));
    }
    html.push_str("<table><tr><th>Currency</th><th>Balance</th></tr>");
    for row in rows {
        html.push_str(&format!(
            "<tr><td>{}</td><td>{} {}</td></tr>",
            row.currency_slug, row.value, row.current
        ));
    }
    html.push_str("</table></body></html>");
    html
}
