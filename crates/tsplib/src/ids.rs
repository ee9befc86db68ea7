use std::collections::HashSet;

use crate::{TsplibError, TsplibResult};

/// Validates the node ids of one section against `DIMENSION`.
///
/// Every id must lie in `1..=dimension` and appear exactly once. Completion is
/// confirmed twice: by count and by the checksum `dimension * (dimension + 1) / 2`.
/// Memory grows with the ids actually read, never with the declared `DIMENSION`.
pub(crate) struct IdSet {
    section: &'static str,
    dimension: usize,
    seen: HashSet<usize>,
    count: usize,
    sum: u128,
}

impl IdSet {
    pub(crate) fn new(section: &'static str, dimension: usize) -> Self {
        Self {
            section,
            dimension,
            seen: HashSet::new(),
            count: 0,
            sum: 0,
        }
    }

    /// Records a 1-based id and returns it zero-based.
    pub(crate) fn record(&mut self, line: usize, id: i64) -> TsplibResult<usize> {
        if id < 1 || id as u128 > self.dimension as u128 {
            return Err(TsplibError::syntax(
                line,
                format!(
                    "{} id {id} outside 1..={}",
                    self.section, self.dimension
                ),
            ));
        }

        let zero_based = (id - 1) as usize;
        if !self.seen.insert(zero_based) {
            return Err(TsplibError::syntax(
                line,
                format!("{} id {id} appears more than once", self.section),
            ));
        }

        self.count += 1;
        self.sum += id as u128;
        Ok(zero_based)
    }

    pub(crate) fn finish(self) -> TsplibResult<()> {
        if self.count != self.dimension {
            return Err(TsplibError::invalid_data(format!(
                "DIMENSION is {}, but {} has {} entries",
                self.dimension, self.section, self.count
            )));
        }

        let n = self.dimension as u128;
        let expected = n * (n + 1) / 2;
        if self.sum != expected {
            return Err(TsplibError::invalid_data(format!(
                "{} checksum is {}, expected {expected}",
                self.section, self.sum
            )));
        }

        Ok(())
    }
}
