//! Stat aggregation over probe outcomes
//!
//! Probers never thread counters through their probe calls. Each probe
//! returns a [`ProbeOutcome`] and the caller folds it into a
//! [`StatAggregator`]; the finished [`RunStatistics`] is read once at the end
//! of the run.

use crate::models::{ProbeOutcome, RunStatistics};


/// Accumulates the outcomes of one run
#[derive(Debug, Clone, Default)]
pub struct StatAggregator {
    stats: RunStatistics,
}

impl StatAggregator {
    /// Empty aggregate at run start
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one probe outcome into the aggregate
    pub fn record(&mut self, outcome: &ProbeOutcome) {
        self.stats.record(outcome);
    }

    /// Count probes that were never attempted as lost
    pub fn record_unattempted(&mut self, count: u32) {
        if count > 0 {
            self.stats.record_unattempted(count);
        }
    }

    /// Statistics so far
    pub fn statistics(&self) -> &RunStatistics {
        &self.stats
    }

    /// Finish the run
    pub fn finish(self) -> RunStatistics {
        self.stats
    }
}

/// Aggregate a complete sequence of outcomes
pub fn aggregate<'a, I>(outcomes: I) -> RunStatistics
where
    I: IntoIterator<Item = &'a ProbeOutcome>,
{
    let mut aggregator = StatAggregator::new();
    for outcome in outcomes {
        aggregator.record(outcome);
    }
    aggregator.finish()
}
