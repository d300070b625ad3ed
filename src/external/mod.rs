pub mod option_chain_provider;
pub mod polygon;
pub mod retry;
pub mod ticker_universe;
pub mod yield_classifier;
