use crate::context::AppContext;
use crate::memory_store::MemoryBarStore;
use crate::store::TimeRange;
use anyhow::Result;
use log::info;
use std::path::Path;

pub async fn run(app: &AppContext, output_path: &Path, range: Option<&TimeRange>) -> Result<()> {
    match range {
        Some(range) => info!(
            "Exporting bars for {} to {}",
            range,
            output_path.display()
        ),
        None => info!("Exporting all bars to {}", output_path.display()),
    }

    let db = app.database().await?;
    let (future_bars, option_bars) =
        futures::try_join!(db.all_future_bars(range), db.all_option_bars(range))?;
    info!(
        "Loaded {} future bars and {} option bars",
        future_bars.len(),
        option_bars.len()
    );

    let mut snapshot = MemoryBarStore::new();
    snapshot.extend_futures(future_bars);
    snapshot.extend_options(option_bars);
    snapshot.save_to_file(output_path)?;
    info!("Bar snapshot successfully written to {}", output_path.display());

    Ok(())
}
