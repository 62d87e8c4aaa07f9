//! End-to-end checks: CSV file -> column store -> snapshot -> JSON.

use engine::{aggregate, load_columnar, load_from_bytes, SnapshotHolder};
use std::collections::HashSet;
use std::fs;

const THREE_ROWS: &str = "transaction_id,transaction_date,user_id,country,region,product_id,product_name,category,price,quantity,total_price,stock_quantity,added_date
T1,2021-01-15,U1,Germany,Bavaria,P1,Widget_A,Toys,10.50,2,21.00,100,2021-01-01
T2,2021-01-16,U2,France,Normandy,P2,Widget_B,Toys,20.00,1,20.00,50,2021-01-02
T3,2022-05-20,U3,Germany,Hesse,P1,Widget_A,Toys,10.50,1,10.50,99,2022-05-05
";

#[test]
fn three_row_file_end_to_end() {
    let path = fixlib::write_temp("pipeline_three_rows", THREE_ROWS);
    let store = load_columnar(&path).unwrap();
    fs::remove_file(&path).unwrap();

    assert_eq!(store.len(), 3);
    let data = aggregate(&store);

    assert_eq!(data.country_stats.len(), 2);
    assert_eq!(data.country_stats[0].country, "Germany");
    assert!((data.country_stats[0].revenue - 31.5).abs() < 1e-9);
    assert_eq!(data.country_stats[0].transactions, 2);
    assert_eq!(data.country_stats[1].country, "France");
    assert_eq!(data.country_stats[1].revenue, 20.0);
    assert_eq!(data.country_stats[1].transactions, 1);

    let widget_a = data.top_products.iter().find(|p| p.name == "Widget_A").unwrap();
    assert_eq!(widget_a.value, 3.0);
    assert!([99, 100].contains(&widget_a.extra));
    let widget_b = data.top_products.iter().find(|p| p.name == "Widget_B").unwrap();
    assert_eq!(widget_b.value, 1.0);
    assert_eq!(widget_b.extra, 50);

    assert_eq!(data.monthly_sales.len(), 2);
    assert_eq!(data.monthly_sales["2021"].len(), 1);
    assert_eq!(data.monthly_sales["2021"][0].month, "January");
    assert!((data.monthly_sales["2021"][0].volume - 41.0).abs() < 1e-9);
    assert_eq!(data.monthly_sales["2022"][0].month, "May");
    assert!((data.monthly_sales["2022"][0].volume - 10.5).abs() < 1e-9);

    let regions: Vec<(&str, f64)> = data
        .top_regions
        .iter()
        .map(|r| (r.name.as_str(), r.value))
        .collect();
    assert_eq!(regions[0].0, "Bavaria");
    assert!((regions[0].1 - 21.0).abs() < 1e-9);
    assert_eq!(regions[1].0, "Normandy");
    assert_eq!(regions[2].0, "Hesse");
}

#[test]
fn snapshot_serves_the_published_result() {
    let store = load_from_bytes(THREE_ROWS.as_bytes()).unwrap();
    let holder = SnapshotHolder::new();
    assert!(holder.get().is_none());

    holder.set(aggregate(&store));
    let snapshot = holder.get().unwrap();

    let json = serde_json::to_value(snapshot.as_ref()).unwrap();
    assert_eq!(json["country_stats"][0]["country"], "Germany");
    assert_eq!(json["top_products"][0]["name"], "Widget_A");
    assert_eq!(json["monthly_sales"]["2022"][0]["month"], "May");
    assert_eq!(json["monthly_sales"]["2022"][0]["sales"], 10.5);
}

#[test]
fn totals_are_conserved_across_aggregates() {
    // Small dictionaries keep every product/region inside the top-K
    // cutoffs, so the ranked lists must conserve the column totals.
    let csv = fixlib::synthetic_csv(10_000);
    let store = load_from_bytes(csv.as_bytes()).unwrap();
    let data = aggregate(&store);

    let total_revenue: f64 = store.revenues.iter().sum();
    let total_units: i64 = store.quantities.iter().map(|&q| q as i64).sum();

    let country_revenue: f64 = data.country_stats.iter().map(|c| c.revenue).sum();
    assert!((country_revenue - total_revenue).abs() < 1e-6 * total_revenue.abs());

    let transactions: i64 = data.country_stats.iter().map(|c| c.transactions).sum();
    assert_eq!(transactions, store.len() as i64);

    let region_revenue: f64 = data.top_regions.iter().map(|r| r.value).sum();
    assert!((region_revenue - total_revenue).abs() < 1e-6 * total_revenue.abs());
    let region_units: i64 = data.top_regions.iter().map(|r| r.extra).sum();
    assert_eq!(region_units, total_units);

    let product_units: f64 = data.top_products.iter().map(|p| p.value).sum();
    assert_eq!(product_units, total_units as f64);

    let monthly: f64 = data
        .monthly_sales
        .values()
        .flat_map(|points| points.iter().map(|p| p.volume))
        .sum();
    assert!((monthly - total_revenue).abs() < 1e-6 * total_revenue.abs());
}

#[test]
fn monthly_buckets_are_chronological() {
    let csv = fixlib::synthetic_csv(5_000);
    let store = load_from_bytes(csv.as_bytes()).unwrap();
    let data = aggregate(&store);

    const ORDER: [&str; 12] = [
        "January", "February", "March", "April", "May", "June", "July", "August", "September",
        "October", "November", "December",
    ];
    for points in data.monthly_sales.values() {
        let indices: Vec<usize> = points
            .iter()
            .map(|p| ORDER.iter().position(|&m| m == p.month).unwrap())
            .collect();
        for pair in indices.windows(2) {
            assert!(pair[0] < pair[1]);
        }
    }
}

#[test]
fn reloading_the_same_input_is_idempotent() {
    let csv = fixlib::synthetic_csv(3_000);
    let first = load_from_bytes(csv.as_bytes()).unwrap();
    let second = load_from_bytes(csv.as_bytes()).unwrap();

    // Stores may disagree on dictionary id assignment but never on what a
    // row resolves to.
    assert_eq!(first.len(), second.len());
    let dicts_a: HashSet<&String> = first.country_dict.iter().collect();
    let dicts_b: HashSet<&String> = second.country_dict.iter().collect();
    assert_eq!(dicts_a, dicts_b);
    for i in 0..first.len() {
        assert_eq!(
            first.country_dict[first.country_ids[i] as usize],
            second.country_dict[second.country_ids[i] as usize]
        );
        assert_eq!(
            first.product_dict[first.product_ids[i] as usize],
            second.product_dict[second.product_ids[i] as usize]
        );
        assert_eq!(first.revenues[i], second.revenues[i]);
    }

    // The dashboard itself is fully deterministic.
    assert_eq!(aggregate(&first), aggregate(&second));
}

#[test]
fn zero_quantity_rows_leave_extra_out_of_the_json() {
    let csv = "transaction_id,transaction_date,user_id,country,region,product_id,product_name,category,price,quantity,total_price,stock_quantity,added_date
T1,2021-01-15,U1,Germany,Bavaria,P1,Widget_A,Toys,10.50,0,21.00,100,2021-01-01
";
    let store = load_from_bytes(csv.as_bytes()).unwrap();
    let data = aggregate(&store);

    // Revenue flowed but no units did: the region ranks with extra == 0.
    assert_eq!(data.top_regions.len(), 1);
    assert_eq!(data.top_regions[0].extra, 0);
    let json = serde_json::to_value(&data).unwrap();
    assert!(json["top_regions"][0].get("extra").is_none());
    // And a product that never sold a unit is not ranked at all.
    assert!(data.top_products.is_empty());
}
