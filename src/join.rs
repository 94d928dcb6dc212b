use crate::models::{AlignedRow, FutureBar, OptionBar};
use std::cmp::Ordering;

/// Inner-joins a future series with an option series on exact timestamp equality.
///
/// Both inputs must be sorted ascending by timestamp with unique timestamps, which is what
/// every [`crate::store::BarStore`] read returns. A bar without a counterpart on the other
/// side is dropped.
#[derive(Debug, Default, Clone, Copy)]
pub struct SeriesJoiner;

impl SeriesJoiner {
    pub fn new() -> Self {
        Self
    }

    pub fn join(&self, futures: Vec<FutureBar>, options: Vec<OptionBar>) -> Vec<AlignedRow> {
        self.join_iter(futures, options).collect()
    }

    /// Lazy form of [`SeriesJoiner::join`]; rows come out in timestamp order.
    pub fn join_iter<F, O>(&self, futures: F, options: O) -> AlignedRows<F::IntoIter, O::IntoIter>
    where
        F: IntoIterator<Item = FutureBar>,
        O: IntoIterator<Item = OptionBar>,
    {
        AlignedRows {
            futures: futures.into_iter(),
            options: options.into_iter(),
            pending_future: None,
            pending_option: None,
        }
    }
}

/// Merge iterator produced by [`SeriesJoiner::join_iter`].
pub struct AlignedRows<F, O> {
    futures: F,
    options: O,
    pending_future: Option<FutureBar>,
    pending_option: Option<OptionBar>,
}

impl<F, O> Iterator for AlignedRows<F, O>
where
    F: Iterator<Item = FutureBar>,
    O: Iterator<Item = OptionBar>,
{
    type Item = AlignedRow;

    fn next(&mut self) -> Option<AlignedRow> {
        loop {
            let future = match self.pending_future.take() {
                Some(bar) => bar,
                None => self.futures.next()?,
            };
            let option = match self.pending_option.take() {
                Some(bar) => bar,
                None => match self.options.next() {
                    Some(bar) => bar,
                    None => return None,
                },
            };

            match future.timestamp.cmp(&option.timestamp) {
                Ordering::Equal => return Some(AlignedRow { future, option }),
                // Advance whichever side is behind; keep the other for the next comparison.
                Ordering::Less => self.pending_option = Some(option),
                Ordering::Greater => self.pending_future = Some(future),
            }
        }
    }
}
