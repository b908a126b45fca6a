//! Player resource gauges and score
//!
//! Beans crushed by the vehicle fill the bean gauge, the mill grinds them
//! into coffee, and a full coffee gauge is converted into a score bonus.

use serde::{Deserialize, Serialize};

use crate::settings::ResourceTuning;

/// Result of adding ground coffee
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoffeeOutcome {
    /// Units that fit in the gauge
    pub added: u32,
    /// The gauge filled, reset to zero and paid out the batch bonus
    pub batch_completed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerResources {
    ground_beans: u32,
    ground_coffee: u32,
    score: u64,
    is_spilling: bool,
    max_ground_beans: u32,
    max_ground_coffee: u32,
    score_per_ground_bean: u64,
    score_per_coffee_batch: u64,
}

impl PlayerResources {
    pub fn new(tuning: &ResourceTuning) -> Self {
        Self {
            ground_beans: 0,
            ground_coffee: 0,
            score: 0,
            is_spilling: false,
            max_ground_beans: tuning.max_ground_beans,
            max_ground_coffee: tuning.max_ground_coffee.max(1),
            score_per_ground_bean: tuning.score_per_ground_bean,
            score_per_coffee_batch: tuning.score_per_coffee_batch,
        }
    }

    pub fn ground_beans(&self) -> u32 {
        self.ground_beans
    }

    pub fn ground_coffee(&self) -> u32 {
        self.ground_coffee
    }

    pub fn score(&self) -> u64 {
        self.score
    }

    pub fn is_spilling(&self) -> bool {
        self.is_spilling
    }

    pub fn set_spilling(&mut self, spilling: bool) {
        self.is_spilling = spilling;
    }

    pub fn max_ground_beans(&self) -> u32 {
        self.max_ground_beans
    }

    pub fn max_ground_coffee(&self) -> u32 {
        self.max_ground_coffee
    }

    /// Add beans up to the gauge capacity, scoring each stored unit
    pub fn add_ground_beans(&mut self, amount: u32) -> u32 {
        let added = self.store_beans(amount);
        self.score += u64::from(added) * self.score_per_ground_bean;
        added
    }

    /// A crushed bean: one ground bean, no score
    pub fn crush_bean(&mut self) -> bool {
        self.store_beans(1) == 1
    }

    pub fn consume_ground_beans(&mut self, amount: u32) -> u32 {
        let consumed = amount.min(self.ground_beans);
        self.ground_beans -= consumed;
        consumed
    }

    /// Add coffee; a full gauge resets to 0 and pays the batch bonus in the same call
    pub fn add_ground_coffee(&mut self, amount: u32) -> CoffeeOutcome {
        let added = amount.min(self.max_ground_coffee - self.ground_coffee);
        self.ground_coffee += added;

        let batch_completed = self.ground_coffee >= self.max_ground_coffee;
        if batch_completed {
            self.score += self.score_per_coffee_batch;
            self.ground_coffee = 0;
        }

        CoffeeOutcome {
            added,
            batch_completed,
        }
    }

    pub fn remove_ground_coffee(&mut self, amount: u32) -> u32 {
        let removed = amount.min(self.ground_coffee);
        self.ground_coffee -= removed;
        removed
    }

    fn store_beans(&mut self, amount: u32) -> u32 {
        let added = amount.min(self.max_ground_beans.saturating_sub(self.ground_beans));
        self.ground_beans += added;
        added
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn resources() -> PlayerResources {
        PlayerResources::new(&ResourceTuning::default())
    }

    #[test]
    fn test_crush_adds_bean_without_score() {
        let mut res = resources();
        assert!(res.crush_bean());
        assert_eq!(res.ground_beans(), 1);
        assert_eq!(res.score(), 0);
    }

    #[test]
    fn test_add_beans_scores_per_unit_and_caps() {
        let mut res = resources();
        assert_eq!(res.add_ground_beans(3), 3);
        assert_eq!(res.score(), 30);

        assert_eq!(res.add_ground_beans(100), 17);
        assert_eq!(res.ground_beans(), 20);
        assert_eq!(res.score(), 200);
        assert!(!res.crush_bean(), "full gauge rejects crushed beans");
    }

    #[test]
    fn test_full_coffee_converts_to_score() {
        let mut res = resources();
        for _ in 0..9 {
            let outcome = res.add_ground_coffee(1);
            assert!(!outcome.batch_completed);
        }
        assert_eq!(res.ground_coffee(), 9);
        assert_eq!(res.score(), 0);

        let outcome = res.add_ground_coffee(1);
        assert!(outcome.batch_completed);
        assert_eq!(res.ground_coffee(), 0);
        assert_eq!(res.score(), 100);
    }

    #[test]
    fn test_remove_and_consume_saturate() {
        let mut res = resources();
        res.add_ground_coffee(2);
        assert_eq!(res.remove_ground_coffee(5), 2);
        assert_eq!(res.ground_coffee(), 0);
        assert_eq!(res.consume_ground_beans(1), 0);
    }

    #[derive(Debug, Clone)]
    enum Op {
        AddBeans(u32),
        Crush,
        Consume(u32),
        AddCoffee(u32),
        RemoveCoffee(u32),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0u32..30).prop_map(Op::AddBeans),
            Just(Op::Crush),
            (0u32..30).prop_map(Op::Consume),
            (0u32..15).prop_map(Op::AddCoffee),
            (0u32..15).prop_map(Op::RemoveCoffee),
        ]
    }

    proptest! {
        #[test]
        fn prop_gauges_stay_in_bounds_and_score_never_drops(ops in prop::collection::vec(op(), 0..200)) {
            let mut res = resources();
            let mut last_score = 0;
            for op in ops {
                match op {
                    Op::AddBeans(n) => { res.add_ground_beans(n); }
                    Op::Crush => { res.crush_bean(); }
                    Op::Consume(n) => { res.consume_ground_beans(n); }
                    Op::AddCoffee(n) => { res.add_ground_coffee(n); }
                    Op::RemoveCoffee(n) => { res.remove_ground_coffee(n); }
                }
                prop_assert!(res.ground_beans() <= res.max_ground_beans());
                prop_assert!(res.ground_coffee() < res.max_ground_coffee());
                prop_assert!(res.score() >= last_score);
                last_score = res.score();
            }
        }
    }
}
