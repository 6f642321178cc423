//! Stopping strategies decide when a stopping iterator has buffered enough
//! successors and should start serving them.

use std::collections::BinaryHeap;

/// Accumulates (benefit, cost) observations for a stream of candidates.
pub trait StoppingStrategy {
    /// Record one extracted candidate.  `cost` must be positive and the
    /// strategy must not already be stopped.
    fn add(&mut self, benefit: f32, cost: f32);

    fn is_stopped(&self) -> bool;

    /// The best buffered candidate was handed out.  Only valid while
    /// stopped.
    fn max_removed(&mut self);
}

pub type StoppingStrategyPtr = Box<dyn StoppingStrategy>;

/// Buffers exactly `size` candidates at a time.
#[derive(Clone, Debug)]
pub struct FixedStoppingStrategy {
    size: usize,
    current: usize,
}

impl FixedStoppingStrategy {
    pub fn new(size: usize) -> Self {
        assert!(size >= 1, "fixed stopping strategy needs a positive size");
        Self { size, current: 0 }
    }
}

impl StoppingStrategy for FixedStoppingStrategy {
    fn add(&mut self, _benefit: f32, _cost: f32) {
        assert!(!self.is_stopped(), "add() on a stopped strategy");
        self.current += 1;
    }

    fn is_stopped(&self) -> bool {
        self.current == self.size
    }

    fn max_removed(&mut self) {
        assert!(self.is_stopped(), "max_removed() on a running strategy");
        self.current -= 1;
    }
}

/// Models benefits `b` and log-costs `lc` of future candidates as
/// independent normals fitted to the observations so far.
///
/// After `initial_fill` observations the strategy stops once
/// `P(λ·b − lc > λ·best + Σ lc) > alpha`, where `best` is the largest
/// benefit still buffered and the sum runs over every observed log-cost.
#[derive(Clone, Debug)]
pub struct BasicStoppingStrategy {
    lambda: f64,
    alpha: f64,
    initial_left: usize,
    benefits: BinaryHeap<OrderedBenefit>,
    n: usize,
    sum_benefit: f64,
    sum_sq_benefit: f64,
    sum_log_cost: f64,
    sum_sq_log_cost: f64,
    stopped: bool,
}

impl BasicStoppingStrategy {
    pub fn new(initial_fill: usize, lambda: f32, alpha: f32) -> Self {
        assert!(initial_fill > 1, "initial fill must exceed one");
        assert!(lambda > 0.0, "lambda must be positive");
        assert!(alpha > 0.0 && alpha < 1.0, "alpha must lie in (0, 1)");
        Self {
            lambda: f64::from(lambda),
            alpha: f64::from(alpha),
            initial_left: initial_fill,
            benefits: BinaryHeap::new(),
            n: 0,
            sum_benefit: 0.0,
            sum_sq_benefit: 0.0,
            sum_log_cost: 0.0,
            sum_sq_log_cost: 0.0,
            stopped: false,
        }
    }

    fn compute_stopped(&mut self) {
        let Some(best) = self.benefits.peek() else {
            self.stopped = false;
            return;
        };
        if self.initial_left > 0 {
            self.stopped = false;
            return;
        }
        let n = self.n as f64;
        let mean_b = self.sum_benefit / n;
        let var_b = (self.sum_sq_benefit / n - mean_b * mean_b).max(0.0);
        let mean_lc = self.sum_log_cost / n;
        let var_lc = (self.sum_sq_log_cost / n - mean_lc * mean_lc).max(0.0);

        let mean = self.lambda * mean_b - mean_lc;
        let sd = (self.lambda * self.lambda * var_b + var_lc).sqrt();
        let threshold = self.lambda * f64::from(best.0) + self.sum_log_cost;
        self.stopped = normal_exceeds(mean, sd, threshold) > self.alpha;
    }
}

impl StoppingStrategy for BasicStoppingStrategy {
    fn add(&mut self, benefit: f32, cost: f32) {
        assert!(!self.stopped, "add() on a stopped strategy");
        assert!(cost > 0.0, "costs must be positive");
        let b = f64::from(benefit);
        let lc = f64::from(cost).ln();
        self.benefits.push(OrderedBenefit(benefit));
        self.sum_benefit += b;
        self.sum_sq_benefit += b * b;
        self.sum_log_cost += lc;
        self.sum_sq_log_cost += lc * lc;
        self.n += 1;
        self.initial_left = self.initial_left.saturating_sub(1);
        self.compute_stopped();
    }

    fn is_stopped(&self) -> bool {
        self.stopped
    }

    fn max_removed(&mut self) {
        assert!(self.stopped, "max_removed() on a running strategy");
        self.benefits.pop();
        self.compute_stopped();
    }
}

/// `P(X > threshold)` for `X ~ N(mean, sd²)`.  A zero `sd` is a point mass.
fn normal_exceeds(mean: f64, sd: f64, threshold: f64) -> f64 {
    if sd <= 0.0 {
        return if mean > threshold { 1.0 } else { 0.0 };
    }
    0.5 * libm::erfc((threshold - mean) / (sd * std::f64::consts::SQRT_2))
}

/// Total order over benefits for the max-heap; NaN sorts lowest.
#[derive(Copy, Clone, Debug)]
pub(crate) struct OrderedBenefit(pub f32);

impl PartialEq for OrderedBenefit {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == std::cmp::Ordering::Equal
    }
}

impl Eq for OrderedBenefit {}

impl PartialOrd for OrderedBenefit {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OrderedBenefit {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        match (self.0.is_nan(), other.0.is_nan()) {
            (true, true) => std::cmp::Ordering::Equal,
            (true, false) => std::cmp::Ordering::Less,
            (false, true) => std::cmp::Ordering::Greater,
            (false, false) => self.0.total_cmp(&other.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{normal_exceeds, BasicStoppingStrategy, FixedStoppingStrategy, StoppingStrategy};

    #[test]
    fn fixed_strategy_counts_buffered_items() {
        let mut strat = FixedStoppingStrategy::new(2);
        assert!(!strat.is_stopped());
        strat.add(1.0, 1.0);
        assert!(!strat.is_stopped());
        strat.add(0.5, 1.0);
        assert!(strat.is_stopped());
        strat.max_removed();
        assert!(!strat.is_stopped());
    }

    #[test]
    fn normal_tail_matches_known_values() {
        assert!((normal_exceeds(0.0, 1.0, 0.0) - 0.5).abs() < 1e-9);
        assert!((normal_exceeds(0.0, 1.0, 1.96) - 0.025).abs() < 1e-3);
        assert_eq!(normal_exceeds(2.0, 0.0, 1.0), 1.0);
        assert_eq!(normal_exceeds(1.0, 0.0, 1.0), 0.0);
    }

    #[test]
    fn basic_strategy_waits_for_initial_fill() {
        let mut strat = BasicStoppingStrategy::new(3, 1.0, 0.5);
        strat.add(1.0, 1.0);
        assert!(!strat.is_stopped());
        strat.add(1.0, 1.0);
        assert!(!strat.is_stopped());
    }

    #[test]
    fn basic_strategy_continues_on_constant_stream() {
        // Equal benefits and unit costs put a point mass exactly on the
        // threshold.
        let mut strat = BasicStoppingStrategy::new(2, 1.0, 0.5);
        strat.add(1.0, 1.0);
        strat.add(1.0, 1.0);
        assert!(!strat.is_stopped());
    }

    #[test]
    fn basic_strategy_stops_on_cheap_extractions() {
        let mut strat = BasicStoppingStrategy::new(2, 1.0, 0.1);
        strat.add(0.0, 0.5);
        strat.add(0.0, 0.5);
        // mean = -ln 0.5, threshold = 2 ln 0.5
        assert!(strat.is_stopped());
        strat.max_removed();
        assert!(strat.is_stopped());
    }
}
