//! Second parallel scan over the column store: per-worker private sketches
//! for the four dashboard dimensions, reduced once into the snapshot. No
//! shared accumulators, no atomics on the hot path.

use crate::chunk::row_ranges;
use crate::snapshot::{CountryStat, DashboardData, MonthlyPoint, TopItem};
use crate::store::ColumnStore;
use ahash::AHashMap;
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::ops::Range;
use std::time::Instant;
use tracing::info;

pub const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

const TOP_PRODUCTS: usize = 20;
const TOP_REGIONS: usize = 30;

/// One worker's partial aggregates: dense arrays keyed by dictionary id
/// for the heavy dimensions, a small map for the date dimension.
struct Sketch {
    prod_units: Vec<i64>,
    prod_stock: Vec<i32>, // -1 until a row for that product is seen
    region_rev: Vec<f64>,
    region_units: Vec<i64>,
    country_rev: Vec<f64>,
    country_tx: Vec<i64>,
    monthly: AHashMap<i32, f64>,
}

impl Sketch {
    fn new(store: &ColumnStore) -> Self {
        Self {
            prod_units: vec![0; store.product_dict.len()],
            prod_stock: vec![-1; store.product_dict.len()],
            region_rev: vec![0.0; store.region_dict.len()],
            region_units: vec![0; store.region_dict.len()],
            country_rev: vec![0.0; store.country_dict.len()],
            country_tx: vec![0; store.country_dict.len()],
            monthly: AHashMap::new(),
        }
    }

    fn scan(&mut self, store: &ColumnStore, range: Range<usize>) {
        // Hoist the columns out of the struct for the hot loop.
        let pids = &store.product_ids;
        let rids = &store.region_ids;
        let cids = &store.country_ids;
        let revs = &store.revenues;
        let qtys = &store.quantities;
        let stks = &store.stocks;
        let dates = &store.dates;

        for i in range {
            let pid = pids[i] as usize;
            let rid = rids[i] as usize;
            let cid = cids[i] as usize;
            let qty = qtys[i] as i64;
            let rev = revs[i];

            self.prod_units[pid] += qty;
            self.prod_stock[pid] = stks[i];

            self.region_rev[rid] += rev;
            self.region_units[rid] += qty;

            self.country_rev[cid] += rev;
            self.country_tx[cid] += 1;

            *self.monthly.entry(dates[i]).or_insert(0.0) += rev;
        }
    }

    fn absorb(&mut self, other: Sketch) {
        for (dst, src) in self.prod_units.iter_mut().zip(&other.prod_units) {
            *dst += src;
        }
        // Last-write-wins: a later worker's observation replaces an
        // earlier one, so absorbing in worker order tracks input order.
        for (dst, &src) in self.prod_stock.iter_mut().zip(&other.prod_stock) {
            if src >= 0 {
                *dst = src;
            }
        }
        for (dst, src) in self.region_rev.iter_mut().zip(&other.region_rev) {
            *dst += src;
        }
        for (dst, src) in self.region_units.iter_mut().zip(&other.region_units) {
            *dst += src;
        }
        for (dst, src) in self.country_rev.iter_mut().zip(&other.country_rev) {
            *dst += src;
        }
        for (dst, src) in self.country_tx.iter_mut().zip(&other.country_tx) {
            *dst += src;
        }
        for (date, rev) in other.monthly {
            *self.monthly.entry(date).or_insert(0.0) += rev;
        }
    }
}

/// Scan the store with one private sketch per worker, reduce the sketches
/// in worker order, then rank and format the dashboard snapshot.
pub fn aggregate(store: &ColumnStore) -> DashboardData {
    let started = Instant::now();
    let workers = rayon::current_num_threads().max(1);

    let sketches: Vec<Sketch> = row_ranges(store.len(), workers)
        .into_par_iter()
        .map(|range| {
            let mut sketch = Sketch::new(store);
            sketch.scan(store, range);
            sketch
        })
        .collect();

    let mut merged = Sketch::new(store);
    for sketch in sketches {
        merged.absorb(sketch);
    }

    let data = finalize(store, merged);
    info!(elapsed = ?started.elapsed(), "aggregation complete");
    data
}

fn finalize(store: &ColumnStore, sketch: Sketch) -> DashboardData {
    let mut top_products: Vec<TopItem> = sketch
        .prod_units
        .iter()
        .enumerate()
        .filter(|&(_, &units)| units > 0)
        .map(|(p, &units)| TopItem {
            name: store.product_dict[p].clone(),
            value: units as f64,
            extra: sketch.prod_stock[p] as i64,
        })
        .collect();
    top_products.sort_by(|a, b| b.value.total_cmp(&a.value));
    top_products.truncate(TOP_PRODUCTS);

    let mut top_regions: Vec<TopItem> = sketch
        .region_rev
        .iter()
        .enumerate()
        .filter(|&(_, &rev)| rev > 0.0)
        .map(|(r, &rev)| TopItem {
            name: store.region_dict[r].clone(),
            value: rev,
            extra: sketch.region_units[r],
        })
        .collect();
    top_regions.sort_by(|a, b| b.value.total_cmp(&a.value));
    top_regions.truncate(TOP_REGIONS);

    let mut country_stats: Vec<CountryStat> = sketch
        .country_rev
        .iter()
        .enumerate()
        .filter(|&(_, &rev)| rev > 0.0)
        .map(|(c, &rev)| CountryStat {
            country: store.country_dict[c].clone(),
            revenue: rev,
            transactions: sketch.country_tx[c],
        })
        .collect();
    country_stats.sort_by(|a, b| b.revenue.total_cmp(&a.revenue));

    let mut by_date: Vec<(i32, f64)> = sketch.monthly.into_iter().collect();
    by_date.sort_unstable_by_key(|&(date, _)| date);

    let mut monthly_sales: BTreeMap<String, Vec<MonthlyPoint>> = BTreeMap::new();
    for (date, volume) in by_date {
        let month = date % 100;
        if !(1..=12).contains(&month) {
            // Out-of-range months (including the zero date of defaulted
            // rows) are excluded here but still counted above.
            continue;
        }
        monthly_sales
            .entry((date / 100).to_string())
            .or_default()
            .push(MonthlyPoint {
                month: MONTH_NAMES[month as usize - 1].to_string(),
                volume,
            });
    }

    DashboardData {
        country_stats,
        top_products,
        top_regions,
        monthly_sales,
    }
}
