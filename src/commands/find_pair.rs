use crate::context::AppContext;
use crate::pairing::PairFinder;
use anyhow::Result;
use log::info;
use std::path::Path;

pub async fn run(app: &AppContext, data_file: Option<&Path>, option_symbol: &str) -> Result<()> {
    let source = app.bar_source(data_file).await?;
    let future_symbol = PairFinder::new(&source).matching_future(option_symbol).await?;
    info!("{} pairs with {}", option_symbol, future_symbol);
    println!("{}", future_symbol);
    Ok(())
}
