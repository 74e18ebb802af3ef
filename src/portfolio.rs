use crate::error::{AddStockError, QuoteError, ValidationError};
use crate::form::{parse_number, parse_positive, required, Field, ManualForm, QuoteForm, StockForm};
use crate::quote::{QuoteProvider, StockQuote};
use crate::stock::{normalize_ticker, StockEntry, StockId};
use crate::valuation::Valuation;
use serde::{Serialize, Serializer};
use tokio::sync::watch;
use tracing::{debug, info};

/// An entry together with its derived fields, as the table and chart see it.
#[derive(Debug, Clone, PartialEq)]
pub struct StockRow {
    pub entry: StockEntry,
    pub valuation: Valuation,
}

// One flat JSON object per row, with the resolved P/E in place of the
// stored one
impl Serialize for StockRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Flat<'a> {
            id: StockId,
            ticker: &'a str,
            name: &'a str,
            current_price: f64,
            eps: f64,
            #[serde(rename = "currentPE")]
            current_pe: f64,
            #[serde(rename = "targetPE")]
            target_pe: f64,
            target_price: f64,
            price_change: f64,
        }

        Flat {
            id: self.entry.get_id(),
            ticker: self.entry.get_ticker(),
            name: self.entry.get_name(),
            current_price: self.entry.get_current_price(),
            eps: self.entry.get_eps(),
            current_pe: self.valuation.current_pe,
            target_pe: self.entry.get_target_pe(),
            target_price: self.valuation.target_price,
            price_change: self.valuation.price_change,
        }
        .serialize(serializer)
    }
}

/// A validated live-quote request that is waiting for the provider.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingQuote {
    pub ticker: String,
    pub target_pe: f64,
}

/// The in-memory, ordered collection of tracked stocks.
///
/// Every observable change (entries, loading flag, error message) bumps a
/// revision counter which is published on a watch channel, so any front end
/// can redraw when it moves.
pub struct Portfolio {
    entries: Vec<StockEntry>,
    next_id: u64,
    loading: bool,
    error: Option<String>,
    revision: u64,
    changes: watch::Sender<u64>,
}

impl Default for Portfolio {
    fn default() -> Self {
        Self::new()
    }
}

impl Portfolio {
    pub fn new() -> Portfolio {
        Portfolio {
            entries: Vec::new(),
            next_id: 1,
            loading: false,
            error: None,
            revision: 0,
            changes: watch::Sender::new(0),
        }
    }

    /// The example portfolio the dashboard starts with.
    pub fn seeded() -> Portfolio {
        let mut portfolio = Portfolio::new();
        for (ticker, name, price, eps, pe, target) in [
            ("AAPL", "Apple Inc.", 175.50, 6.14, 28.58, 25.0),
            ("MSFT", "Microsoft Corp.", 390.27, 11.02, 35.42, 30.0),
            ("GOOGL", "Alphabet Inc.", 145.40, 5.80, 25.07, 25.0),
        ] {
            let id = portfolio.allocate_id();
            portfolio
                .entries
                .push(StockEntry::new(id, ticker, name, price, eps, Some(pe), target));
        }
        portfolio
    }

    pub fn entries(&self) -> &[StockEntry] {
        &self.entries
    }

    pub fn get(&self, id: StockId) -> Option<&StockEntry> {
        self.entries.iter().find(|e| e.get_id() == id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries with derived fields computed fresh.
    pub fn rows(&self) -> Vec<StockRow> {
        self.entries
            .iter()
            .map(|entry| StockRow {
                entry: entry.clone(),
                valuation: Valuation::of(entry),
            })
            .collect()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn clear_error(&mut self) {
        if self.error.take().is_some() {
            self.touch();
        }
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Receiver that sees the latest revision after every change.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.changes.subscribe()
    }

    fn touch(&mut self) {
        self.revision += 1;
        self.changes.send_replace(self.revision);
    }

    fn allocate_id(&mut self) -> StockId {
        let id = StockId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Admits a hand-typed entry and clears the form. On a validation
    /// failure nothing changes, not even the form.
    pub fn add_manual(&mut self, form: &mut ManualForm) -> Result<StockId, ValidationError> {
        let ticker = normalize_ticker(required(Field::Ticker, &form.ticker)?);
        let name = required(Field::Name, &form.name)?.to_string();
        let current_price = parse_positive(Field::CurrentPrice, &form.current_price)?;
        let eps = parse_number(Field::Eps, &form.eps)?;
        let target_pe = parse_positive(Field::TargetPe, &form.target_pe)?;
        if eps == 0.0 {
            return Err(ValidationError::ZeroEps);
        }

        let id = self.allocate_id();
        self.entries.push(StockEntry::new(
            id,
            &ticker,
            &name,
            current_price,
            eps,
            None,
            target_pe,
        ));
        form.clear();
        info!(%id, %ticker, "added stock from manual entry");
        self.touch();
        Ok(id)
    }

    /// First half of a live addition: validates the form and raises the
    /// loading flag. Refused while another fetch is outstanding.
    pub fn begin_quote(&mut self, form: &QuoteForm) -> Result<PendingQuote, ValidationError> {
        let validated = if self.loading {
            Err(ValidationError::FetchPending)
        } else {
            required(Field::Ticker, &form.ticker).and_then(|ticker| {
                let target_pe = parse_positive(Field::TargetPe, &form.target_pe)?;
                Ok(PendingQuote {
                    ticker: normalize_ticker(ticker),
                    target_pe,
                })
            })
        };

        match validated {
            Ok(pending) => {
                self.loading = true;
                self.error = None;
                debug!(ticker = %pending.ticker, "quote fetch started");
                self.touch();
                Ok(pending)
            }
            Err(e) => {
                self.error = Some(e.to_string());
                self.touch();
                Err(e)
            }
        }
    }

    /// Second half of a live addition. The loading flag comes down whatever
    /// the outcome; a failure is recorded as the visible error and leaves
    /// the entries untouched.
    pub fn complete_quote(
        &mut self,
        pending: PendingQuote,
        result: Result<StockQuote, QuoteError>,
    ) -> Result<StockId, QuoteError> {
        self.loading = false;
        let outcome = match result {
            Ok(quote) => {
                let id = self.allocate_id();
                self.entries.push(StockEntry::new(
                    id,
                    &pending.ticker,
                    &quote.name,
                    quote.current_price,
                    quote.eps,
                    Some(quote.current_pe),
                    pending.target_pe,
                ));
                self.error = None;
                info!(%id, ticker = %pending.ticker, "added stock from live quote");
                Ok(id)
            }
            Err(e) => {
                self.error = Some(e.to_string());
                Err(e)
            }
        };
        self.touch();
        outcome
    }

    /// Validates the form, fetches the quote and admits it. The form is
    /// cleared only when the entry was added.
    pub async fn add_from_quote<P: QuoteProvider>(
        &mut self,
        provider: &P,
        form: &mut QuoteForm,
    ) -> Result<StockId, AddStockError> {
        let pending = self.begin_quote(form)?;
        let result = provider.fetch_quote(&pending.ticker).await;
        let id = self.complete_quote(pending, result)?;
        form.clear();
        Ok(id)
    }

    /// Replaces the target multiple of one entry. Returns `Ok(false)` when
    /// no entry has that id.
    pub fn update_target_pe(&mut self, id: StockId, target_pe: f64) -> Result<bool, ValidationError> {
        if !target_pe.is_finite() {
            return Err(ValidationError::InvalidNumber {
                field: Field::TargetPe.label(),
                value: target_pe.to_string(),
            });
        }
        if target_pe <= 0.0 {
            return Err(ValidationError::NonPositive {
                field: Field::TargetPe.label(),
                value: target_pe,
            });
        }

        match self.entries.iter_mut().find(|e| e.get_id() == id) {
            Some(entry) => {
                entry.set_target_pe(target_pe);
                debug!(%id, target_pe, "target P/E updated");
                self.touch();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Deletes one entry. Returns whether anything was removed.
    pub fn remove(&mut self, id: StockId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.get_id() != id);
        let removed = self.entries.len() != before;
        if removed {
            info!(%id, "removed stock");
            self.touch();
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubProvider {
        result: fn(&str) -> Result<StockQuote, QuoteError>,
        calls: AtomicUsize,
    }

    impl StubProvider {
        fn new(result: fn(&str) -> Result<StockQuote, QuoteError>) -> StubProvider {
            StubProvider {
                result,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl QuoteProvider for StubProvider {
        async fn fetch_quote(&self, ticker: &str) -> Result<StockQuote, QuoteError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.result)(ticker)
        }
    }

    fn nvidia(ticker: &str) -> Result<StockQuote, QuoteError> {
        Ok(StockQuote {
            ticker: ticker.to_string(),
            name: "NVIDIA Corp".to_string(),
            current_price: 120.0,
            eps: 2.4,
            current_pe: 50.0,
        })
    }

    fn missing_price(ticker: &str) -> Result<StockQuote, QuoteError> {
        Err(QuoteError::DataQuality {
            ticker: ticker.to_string(),
            detail: "price is missing or not a number".to_string(),
        })
    }

    fn manual_form() -> ManualForm {
        ManualForm {
            ticker: "tsla".into(),
            name: "Tesla Inc.".into(),
            current_price: "250".into(),
            eps: "3.12".into(),
            target_pe: "60".into(),
        }
    }

    fn ids(portfolio: &Portfolio) -> Vec<StockId> {
        portfolio.entries().iter().map(|e| e.get_id()).collect()
    }

    #[test]
    fn test_seeded_portfolio() {
        let portfolio = Portfolio::seeded();
        assert_eq!(portfolio.len(), 3);
        assert_eq!(ids(&portfolio), vec![StockId(1), StockId(2), StockId(3)]);
        assert_eq!(portfolio.entries()[0].get_current_pe(), Some(28.58));
        assert!(!portfolio.is_loading());
        assert_eq!(portfolio.error(), None);
    }

    #[test]
    fn test_add_manual() {
        let mut portfolio = Portfolio::seeded();
        let mut form = manual_form();
        let id = portfolio.add_manual(&mut form).unwrap();

        assert_eq!(id, StockId(4));
        let entry = portfolio.get(id).unwrap();
        assert_eq!(entry.get_ticker(), "TSLA");
        assert_eq!(entry.get_current_pe(), None);
        assert!(form.is_blank());
    }

    #[test]
    fn test_add_manual_missing_eps_changes_nothing() {
        let mut portfolio = Portfolio::seeded();
        let revision = portfolio.revision();
        let mut form = manual_form();
        form.eps.clear();

        let err = portfolio.add_manual(&mut form).unwrap_err();
        assert_eq!(err, ValidationError::MissingField("EPS"));
        assert_eq!(portfolio.len(), 3);
        assert_eq!(portfolio.revision(), revision);
        assert_eq!(form.ticker, "tsla");
    }

    #[test]
    fn test_add_manual_rejects_bad_numbers() {
        let mut portfolio = Portfolio::new();

        let mut form = manual_form();
        form.eps = "0".into();
        assert_eq!(portfolio.add_manual(&mut form), Err(ValidationError::ZeroEps));

        let mut form = manual_form();
        form.current_price = "abc".into();
        assert!(matches!(
            portfolio.add_manual(&mut form),
            Err(ValidationError::InvalidNumber { .. })
        ));

        let mut form = manual_form();
        form.target_pe = "-5".into();
        assert!(matches!(
            portfolio.add_manual(&mut form),
            Err(ValidationError::NonPositive { .. })
        ));

        assert!(portfolio.is_empty());
    }

    #[test]
    fn test_ids_are_not_reused_after_removal() {
        let mut portfolio = Portfolio::seeded();
        assert!(portfolio.remove(StockId(3)));
        let id = portfolio.add_manual(&mut manual_form()).unwrap();
        assert_eq!(id, StockId(4));
        assert_eq!(ids(&portfolio), vec![StockId(1), StockId(2), StockId(4)]);
    }

    #[test]
    fn test_remove() {
        let mut portfolio = Portfolio::seeded();
        assert!(!portfolio.remove(StockId(42)));
        assert_eq!(portfolio.len(), 3);

        assert!(portfolio.remove(StockId(2)));
        assert_eq!(ids(&portfolio), vec![StockId(1), StockId(3)]);
    }

    #[test]
    fn test_update_target_pe() {
        let mut portfolio = Portfolio::seeded();
        assert_eq!(portfolio.update_target_pe(StockId(1), 20.0), Ok(true));
        assert_eq!(portfolio.update_target_pe(StockId(1), 32.5), Ok(true));
        assert_eq!(portfolio.get(StockId(1)).unwrap().get_target_pe(), 32.5);

        let row = &portfolio.rows()[0];
        assert_eq!(row.valuation.target_price, 6.14 * 32.5);
    }

    #[test]
    fn test_update_target_pe_unknown_id_is_noop() {
        let mut portfolio = Portfolio::seeded();
        let before = portfolio.entries().to_vec();
        let revision = portfolio.revision();

        assert_eq!(portfolio.update_target_pe(StockId(99), 10.0), Ok(false));
        assert_eq!(portfolio.entries(), before.as_slice());
        assert_eq!(portfolio.revision(), revision);
    }

    #[test]
    fn test_update_target_pe_rejects_invalid_values() {
        let mut portfolio = Portfolio::seeded();
        assert!(portfolio.update_target_pe(StockId(1), f64::NAN).is_err());
        assert!(portfolio.update_target_pe(StockId(1), 0.0).is_err());
        assert_eq!(portfolio.get(StockId(1)).unwrap().get_target_pe(), 25.0);
    }

    #[tokio::test]
    async fn test_add_from_quote() {
        let mut portfolio = Portfolio::seeded();
        let provider = StubProvider::new(nvidia);
        let mut form = QuoteForm {
            ticker: "nvda".into(),
            target_pe: "40".into(),
        };

        let id = portfolio.add_from_quote(&provider, &mut form).await.unwrap();
        let entry = portfolio.get(id).unwrap();
        assert_eq!(entry.get_ticker(), "NVDA");
        assert_eq!(entry.get_name(), "NVIDIA Corp");
        assert_eq!(entry.get_current_pe(), Some(50.0));
        assert_eq!(entry.get_target_pe(), 40.0);
        assert!(form.is_blank());
        assert!(!portfolio.is_loading());
        assert_eq!(portfolio.error(), None);
    }

    #[tokio::test]
    async fn test_add_from_quote_failure_leaves_store_untouched() {
        let mut portfolio = Portfolio::seeded();
        let provider = StubProvider::new(missing_price);
        let mut form = QuoteForm {
            ticker: "AAPL".into(),
            target_pe: "25".into(),
        };

        let err = portfolio.add_from_quote(&provider, &mut form).await.unwrap_err();
        assert!(matches!(err, AddStockError::Quote(QuoteError::DataQuality { .. })));
        assert_eq!(portfolio.len(), 3);
        assert!(!portfolio.is_loading());
        assert!(portfolio.error().unwrap().contains("AAPL"));
        assert_eq!(form.ticker, "AAPL");
    }

    #[tokio::test]
    async fn test_add_from_quote_validates_before_fetching() {
        let mut portfolio = Portfolio::seeded();
        let provider = StubProvider::new(nvidia);
        let mut form = QuoteForm {
            ticker: "NVDA".into(),
            target_pe: String::new(),
        };

        let err = portfolio.add_from_quote(&provider, &mut form).await.unwrap_err();
        assert!(matches!(
            err,
            AddStockError::Validation(ValidationError::MissingField("Target P/E"))
        ));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
        assert!(portfolio.error().is_some());
        assert!(!portfolio.is_loading());
    }

    #[test]
    fn test_second_fetch_refused_while_loading() {
        let mut portfolio = Portfolio::new();
        let form = QuoteForm {
            ticker: "AAPL".into(),
            target_pe: "25".into(),
        };
        let pending = portfolio.begin_quote(&form).unwrap();
        assert!(portfolio.is_loading());
        assert_eq!(portfolio.begin_quote(&form), Err(ValidationError::FetchPending));

        portfolio.complete_quote(pending, nvidia("AAPL")).unwrap();
        assert!(!portfolio.is_loading());
        assert_eq!(portfolio.len(), 1);
    }

    #[test]
    fn test_subscribers_see_every_change() {
        let mut portfolio = Portfolio::seeded();
        let mut rx = portfolio.subscribe();
        assert!(!rx.has_changed().unwrap());

        portfolio.update_target_pe(StockId(2), 28.0).unwrap();
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), portfolio.revision());

        portfolio.remove(StockId(404));
        assert!(!rx.has_changed().unwrap());
    }

    #[test]
    fn test_rows_serialize_flat() {
        let portfolio = Portfolio::seeded();
        let json = serde_json::to_value(portfolio.rows()).unwrap();
        assert_eq!(json[0]["ticker"], "AAPL");
        assert_eq!(json[0]["currentPE"], 28.58);
        assert!(json[0]["targetPrice"].is_number());
        assert!(json[0]["priceChange"].is_number());
    }
}
