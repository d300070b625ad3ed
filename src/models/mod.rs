mod option_contract;
mod ticker_record;

pub use option_contract::{ContractFilter, ContractKind, ContractSnapshot};
pub use ticker_record::{normalize_symbol, DividendInfo, TickerRecord};
