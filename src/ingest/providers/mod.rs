// src/ingest/providers/mod.rs
pub mod acled;
pub mod digest;
pub mod firms;
pub mod gdelt;
pub mod polymarket;
pub mod rss;
pub mod safe_airspace;
pub mod usgs;
pub mod x_social;
pub mod yahoo_finance;

pub use acled::AcledProvider;
pub use digest::DigestProvider;
pub use firms::FirmsProvider;
pub use gdelt::GdeltProvider;
pub use polymarket::PolymarketProvider;
pub use rss::RssProvider;
pub use safe_airspace::SafeAirspaceProvider;
pub use usgs::UsgsProvider;
pub use x_social::XSocialProvider;
pub use yahoo_finance::YahooFinanceProvider;
