use std::collections::HashMap;
use std::fmt;

/// Things a search counts.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Counter {
    /// Proof states taken off a successor iterator.
    Expansions,
    /// Proof states pushed for further expansion.
    StatesOpened,
    /// Times a depth limit was raised and the search restarted.
    DepthIncreases,
    TargetsProven,
    TargetsFailed,
    /// Calls to `step`.
    Steps,
}

impl Counter {
    pub const ALL: [Counter; 6] = [
        Counter::Expansions,
        Counter::StatesOpened,
        Counter::DepthIncreases,
        Counter::TargetsProven,
        Counter::TargetsFailed,
        Counter::Steps,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Counter::Expansions => "expansions",
            Counter::StatesOpened => "states_opened",
            Counter::DepthIncreases => "depth_increases",
            Counter::TargetsProven => "targets_proven",
            Counter::TargetsFailed => "targets_failed",
            Counter::Steps => "steps",
        }
    }
}

impl fmt::Display for Counter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Search counters, reported at the end of a run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Statistics {
    counters: HashMap<Counter, u64>,
}

impl Statistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, counter: Counter, value: u64) {
        self.counters.insert(counter, value);
    }

    pub fn increment(&mut self, counter: Counter) -> u64 {
        self.increment_by(counter, 1)
    }

    pub fn increment_by(&mut self, counter: Counter, amount: u64) -> u64 {
        let entry = self.counters.entry(counter).or_insert(0);
        *entry += amount;
        *entry
    }

    /// Zero for counters never touched.
    pub fn get(&self, counter: Counter) -> u64 {
        self.counters.get(&counter).copied().unwrap_or(0)
    }

    pub fn merge(&mut self, other: &Statistics) {
        for (&counter, &value) in &other.counters {
            self.increment_by(counter, value);
        }
    }

    pub fn clear(&mut self) {
        self.counters.clear();
    }

    /// One `name value` line per counter, in a fixed order.
    pub fn report(&self) -> String {
        Counter::ALL
            .iter()
            .map(|&counter| format!("{counter} {}", self.get(counter)))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
