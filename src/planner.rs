//! Balance allocation across grid levels

use serde::Serialize;

use crate::types::{Balance, GridSpec, Side};

/// One planned order at a grid level.
#[derive(Debug, Clone, Serialize)]
pub struct PlanEntry {
    pub side: Side,
    pub price: f64,
    /// Amount committed at this level: quote currency at buys, base at sells.
    pub amount: f64,
    /// Estimated fill: base acquired at a buy, quote received at a sell.
    pub estimated_fill: f64,
}

/// Allocation of balances across a grid.
///
/// Level counts include unfunded levels so a report can show the full grid
/// even when one balance is zero.
#[derive(Debug, Clone, Serialize)]
pub struct GridPlan {
    /// Buys first then sells, each side ascending by price.
    pub entries: Vec<PlanEntry>,
    pub buy_levels: usize,
    pub sell_levels: usize,
}

impl GridPlan {
    pub fn buys(&self) -> impl Iterator<Item = &PlanEntry> {
        self.entries.iter().filter(|e| e.side == Side::Buy)
    }

    pub fn sells(&self) -> impl Iterator<Item = &PlanEntry> {
        self.entries.iter().filter(|e| e.side == Side::Sell)
    }

    pub fn total_quote_committed(&self) -> f64 {
        self.buys().map(|e| e.amount).sum()
    }

    pub fn total_base_committed(&self) -> f64 {
        self.sells().map(|e| e.amount).sum()
    }
}

/// Split balances evenly across the grid's buy and sell levels.
///
/// A side with zero balance or no levels simply gets no entries; never an
/// error.
pub fn plan_allocations(spec: &GridSpec, balance: &Balance) -> GridPlan {
    let buy_prices: Vec<f64> = spec
        .levels
        .iter()
        .filter(|l| l.side == Side::Buy)
        .map(|l| l.price)
        .collect();
    let sell_prices: Vec<f64> = spec
        .levels
        .iter()
        .filter(|l| l.side == Side::Sell)
        .map(|l| l.price)
        .collect();

    let mut entries = Vec::with_capacity(spec.levels.len());

    if !buy_prices.is_empty() && balance.quote > 0.0 {
        let quote_share = balance.quote / buy_prices.len() as f64;
        for &price in &buy_prices {
            entries.push(PlanEntry {
                side: Side::Buy,
                price,
                amount: quote_share,
                estimated_fill: quote_share / price,
            });
        }
    }

    if !sell_prices.is_empty() && balance.base > 0.0 {
        let base_share = balance.base / sell_prices.len() as f64;
        for &price in &sell_prices {
            entries.push(PlanEntry {
                side: Side::Sell,
                price,
                amount: base_share,
                estimated_fill: base_share * price,
            });
        }
    }

    GridPlan {
        entries,
        buy_levels: buy_prices.len(),
        sell_levels: sell_prices.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::build_grid;
    use crate::types::{RangeDiagnostics, RangeEstimate};
    use approx::assert_relative_eq;

    fn spec(min: f64, max: f64, count: usize, reference: f64) -> GridSpec {
        let estimate =
            RangeEstimate::new(min, max, "historical", RangeDiagnostics::default()).unwrap();
        build_grid(&estimate, count, reference).unwrap()
    }

    #[test]
    fn test_even_split_conserves_balances() {
        // Levels 92.5, 95, .., 107.5: three buys below 100, four sells at or above.
        let spec = spec(90.0, 110.0, 7, 100.0);
        let balance = Balance {
            quote: 600.0,
            base: 2.0,
        };

        let plan = plan_allocations(&spec, &balance);

        assert_eq!(plan.buy_levels, 3);
        assert_eq!(plan.sell_levels, 4);
        assert_relative_eq!(plan.total_quote_committed(), 600.0, epsilon = 1e-9);
        assert_relative_eq!(plan.total_base_committed(), 2.0, epsilon = 1e-9);

        // Even shares per level.
        for entry in plan.buys() {
            assert_relative_eq!(entry.amount, 200.0, epsilon = 1e-9);
        }
        for entry in plan.sells() {
            assert_relative_eq!(entry.amount, 0.5, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_fill_estimates() {
        let spec = spec(90.0, 110.0, 3, 100.0);
        let balance = Balance {
            quote: 125.0,
            base: 0.5,
        };

        let plan = plan_allocations(&spec, &balance);

        // One buy at 95: all quote goes there.
        let buy = plan.buys().next().unwrap();
        assert_relative_eq!(buy.price, 95.0, epsilon = 1e-9);
        assert_relative_eq!(buy.estimated_fill, 125.0 / 95.0, epsilon = 1e-9);

        // Sells at 100 and 105 each sell 0.25 base.
        let sells: Vec<_> = plan.sells().collect();
        assert_eq!(sells.len(), 2);
        assert_relative_eq!(sells[0].estimated_fill, 0.25 * 100.0, epsilon = 1e-9);
        assert_relative_eq!(sells[1].estimated_fill, 0.25 * 105.0, epsilon = 1e-9);
    }

    #[test]
    fn test_zero_quote_skips_buy_entries() {
        let spec = spec(90.0, 110.0, 3, 100.0);
        let balance = Balance {
            quote: 0.0,
            base: 1.0,
        };

        let plan = plan_allocations(&spec, &balance);

        assert_eq!(plan.buys().count(), 0);
        assert_eq!(plan.sells().count(), 2);
        // The unfunded side still reports its level count.
        assert_eq!(plan.buy_levels, 1);
    }

    #[test]
    fn test_reference_above_range_means_no_sells() {
        // Reference above every level: all levels are buys.
        let spec = spec(90.0, 110.0, 3, 120.0);
        let balance = Balance {
            quote: 300.0,
            base: 1.0,
        };

        let plan = plan_allocations(&spec, &balance);

        assert_eq!(plan.buy_levels, 3);
        assert_eq!(plan.sell_levels, 0);
        assert_eq!(plan.sells().count(), 0);
        assert_relative_eq!(plan.total_quote_committed(), 300.0, epsilon = 1e-9);
    }

    #[test]
    fn test_entries_ordered_buys_then_sells_ascending() {
        let spec = spec(90.0, 110.0, 7, 100.0);
        let balance = Balance {
            quote: 600.0,
            base: 2.0,
        };

        let plan = plan_allocations(&spec, &balance);

        let buys: Vec<f64> = plan.buys().map(|e| e.price).collect();
        let sells: Vec<f64> = plan.sells().map(|e| e.price).collect();
        assert!(buys.windows(2).all(|p| p[0] < p[1]));
        assert!(sells.windows(2).all(|p| p[0] < p[1]));

        // Buys precede sells in the flat list.
        let first_sell = plan
            .entries
            .iter()
            .position(|e| e.side == Side::Sell)
            .unwrap();
        assert!(plan.entries[..first_sell]
            .iter()
            .all(|e| e.side == Side::Buy));
        assert!(plan.entries[first_sell..]
            .iter()
            .all(|e| e.side == Side::Sell));
    }
}
