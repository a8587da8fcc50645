//! Goods market
//!
//! Nominal demand from households and government is allocated across live
//! firms in inverse proportion to relative price. Firms posting exactly the
//! same price pool their weights and split the pool by posted supply. There
//! is a single allocation round: demand a firm cannot serve from inventory
//! is not redirected, it stays as that firm's excess-demand signal.

use crate::models::ids::FirmId;

/// One seller's posting
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GoodsOffer {
    pub firm: FirmId,
    pub price: f64,
    /// Units available (inventory after production)
    pub supply: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GoodsAllocation {
    pub firm: FirmId,
    /// Units demanded of this firm, shortfall included
    pub demanded_units: f64,
    pub sold_units: f64,
    pub revenue: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GoodsOutcome {
    pub allocations: Vec<GoodsAllocation>,
    /// Nominal demand presented to the market
    pub demand: f64,
    /// Nominal value actually sold
    pub sales: f64,
    pub units_sold: f64,
    /// Fraction of nominal demand that was served (0 when nothing was demanded)
    pub fill_ratio: f64,
}

impl GoodsOutcome {
    /// Sales-weighted average price, if anything sold
    pub fn price_index(&self) -> Option<f64> {
        (self.units_sold > 0.0).then(|| self.sales / self.units_sold)
    }
}

pub struct GoodsMarket;

impl GoodsMarket {
    /// Allocation weights: `mean_price / price`, with equal-price groups
    /// re-split in proportion to supply (equally if all post zero).
    pub fn weights(offers: &[GoodsOffer]) -> Vec<f64> {
        if offers.is_empty() {
            return Vec::new();
        }
        let mean_price = offers.iter().map(|o| o.price).sum::<f64>() / offers.len() as f64;
        let mut weights: Vec<f64> = offers.iter().map(|o| mean_price / o.price).collect();

        let mut order: Vec<usize> = (0..offers.len()).collect();
        order.sort_by(|&a, &b| {
            offers[a]
                .price
                .total_cmp(&offers[b].price)
                .then(offers[a].firm.cmp(&offers[b].firm))
        });

        let mut start = 0;
        while start < order.len() {
            let price = offers[order[start]].price;
            let mut end = start + 1;
            while end < order.len() && offers[order[end]].price == price {
                end += 1;
            }
            if end - start > 1 {
                let group = &order[start..end];
                let pooled: f64 = group.iter().map(|&i| weights[i]).sum();
                let supply: f64 = group.iter().map(|&i| offers[i].supply.max(0.0)).sum();
                for &i in group {
                    weights[i] = if supply > 0.0 {
                        pooled * offers[i].supply.max(0.0) / supply
                    } else {
                        pooled / group.len() as f64
                    };
                }
            }
            start = end;
        }
        weights
    }

    /// Clear nominal `demand` against the offers
    pub fn clear(offers: &[GoodsOffer], demand: f64) -> GoodsOutcome {
        let demand = demand.max(0.0);
        let weights = Self::weights(offers);
        let total_weight: f64 = weights.iter().sum();

        let allocations: Vec<GoodsAllocation> = offers
            .iter()
            .zip(&weights)
            .map(|(offer, &w)| {
                let share = if total_weight > 0.0 {
                    demand * w / total_weight
                } else {
                    0.0
                };
                let demanded_units = share / offer.price;
                let sold_units = demanded_units.min(offer.supply.max(0.0));
                GoodsAllocation {
                    firm: offer.firm,
                    demanded_units,
                    sold_units,
                    revenue: sold_units * offer.price,
                }
            })
            .collect();

        let sales: f64 = allocations.iter().map(|a| a.revenue).sum();
        let units_sold: f64 = allocations.iter().map(|a| a.sold_units).sum();
        let fill_ratio = if demand > 0.0 { sales / demand } else { 0.0 };

        GoodsOutcome {
            allocations,
            demand,
            sales,
            units_sold,
            fill_ratio,
        }
    }
}
