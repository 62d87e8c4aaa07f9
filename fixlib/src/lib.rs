//! Shared helpers for the engine tests and benches: temp-file plumbing and
//! a deterministic synthetic transactions CSV.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::{env, fs, process};

pub const CSV_HEADER: &str = "transaction_id,transaction_date,user_id,country,region,product_id,product_name,category,price,quantity,total_price,stock_quantity,added_date\n";

const COUNTRIES: [&str; 6] = ["Germany", "France", "Spain", "Italy", "Poland", "Austria"];
const REGIONS: [&str; 12] = [
    "Bavaria", "Hesse", "Saxony", "Normandy", "Brittany", "Alsace", "Andalusia", "Catalonia",
    "Tuscany", "Lombardy", "Silesia", "Tyrol",
];
const PRODUCTS: [&str; 8] = [
    "Widget_A", "Widget_B", "Gizmo_C", "Gizmo_D", "Doohickey_E", "Doohickey_F", "Gadget_G",
    "Gadget_H",
];

static NEXT_FILE: AtomicUsize = AtomicUsize::new(0);

pub fn read_file<P: AsRef<Path>>(file_name: P) -> String {
    fs::read_to_string(&file_name)
        .unwrap_or_else(|e| panic!("failed to read {}: {e}", file_name.as_ref().display()))
}

/// Write `contents` to a uniquely named file under the system temp dir and
/// return its path. Callers remove the file when they are done with it.
pub fn write_temp(tag: &str, contents: &str) -> PathBuf {
    let n = NEXT_FILE.fetch_add(1, Ordering::Relaxed);
    let path = env::temp_dir().join(format!("{tag}_{}_{n}.csv", process::id()));
    fs::write(&path, contents).unwrap_or_else(|e| panic!("failed to write {}: {e}", path.display()));
    path
}

/// Deterministic transactions CSV with `rows` data rows. Dimension values
/// cycle at co-prime-ish strides so every country/region/product pairing
/// shows up and all dictionaries stay small but multi-valued.
pub fn synthetic_csv(rows: usize) -> String {
    let mut out = String::with_capacity(CSV_HEADER.len() + rows * 96);
    out.push_str(CSV_HEADER);
    for i in 0..rows {
        let country = COUNTRIES[i % COUNTRIES.len()];
        let region = REGIONS[i % REGIONS.len()];
        let product_idx = i % PRODUCTS.len();
        let product = PRODUCTS[product_idx];
        let year = 2021 + (i / 12) % 3;
        let month = i % 12 + 1;
        let quantity = i % 5 + 1;
        let price_cents = 500 + product_idx * 25;
        let total_cents = price_cents * quantity;
        let stock = 40 + i % 60;
        let _ = writeln!(
            out,
            "T{i},{year:04}-{month:02}-15,U{u},{country},{region},P{product_idx},{product},Gadgets,{pw}.{pf:02},{quantity},{tw}.{tf:02},{stock},2020-06-01",
            u = i % 251,
            pw = price_cents / 100,
            pf = price_cents % 100,
            tw = total_cents / 100,
            tf = total_cents % 100,
        );
    }
    out
}
