pub mod build_dataset;
pub mod export_bars;
pub mod find_pair;
pub mod inspect_dataset;
pub mod rank_symbols;
