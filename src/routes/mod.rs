pub(crate) mod contracts;
pub(crate) mod failures;
pub(crate) mod health;
pub(crate) mod tickers;
