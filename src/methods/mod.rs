pub mod eth;
