use crate::dataset::Dataset;
use anyhow::Result;
use std::path::Path;

pub fn run(dataset_path: &Path) -> Result<()> {
    let dataset = Dataset::load_from_file(dataset_path)?;
    let [windows, lookback, width] = dataset.feature_shape();
    let [label_rows, label_cols] = dataset.label_shape();
    let positives = dataset.positive_count();
    let positive_share = if windows == 0 {
        0.0
    } else {
        positives as f64 / windows as f64 * 100.0
    };

    println!("file:     {}", dataset_path.display());
    println!("device:   {}", dataset.device());
    println!("X shape:  ({}, {}, {})", windows, lookback, width);
    println!("Y shape:  ({}, {})", label_rows, label_cols);
    println!(
        "labels:   {} up / {} down ({:.1}% up)",
        positives,
        windows - positives,
        positive_share
    );
    Ok(())
}
