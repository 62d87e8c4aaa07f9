//! Mmap + parallel columnar CSV loader.
//!
//! One pass over the byte buffer: count rows per newline-aligned range,
//! allocate every column once, parse ranges in parallel with worker-local
//! string dictionaries, then merge the dictionaries and rewrite ids in
//! place. The CSV dialect is the raw one the upstream feed produces: `,`
//! separators, `\n` terminators, no quoting, no escapes.

use crate::chunk::aligned_ranges;
use crate::parse::{parse_float, parse_int, parse_year_month};
use crate::store::ColumnStore;
use ahash::AHashMap;
use anyhow::{bail, Context, Result};
use memchr::{memchr, memchr_iter};
use memmap2::MmapOptions;
use rayon::prelude::*;
use std::fs::File;
use std::path::Path;
use std::time::Instant;
use tracing::info;

const NEWLINE: u8 = b'\n';
const COMMA: u8 = b',';

// Input schema: transaction_id, transaction_date, user_id, country, region,
// product_id, product_name, category, price, quantity, total_price,
// stock_quantity, added_date. Only the columns below are consumed.
const COL_DATE: usize = 1;
const COL_COUNTRY: usize = 3;
const COL_REGION: usize = 4;
const COL_PRODUCT: usize = 6;
const COL_QUANTITY: usize = 9;
const COL_REVENUE: usize = 10;
const COL_STOCK: usize = 11;

/// Worker-private string -> id table. Lookups borrow the raw field bytes;
/// only a first-seen value copies into an owned `String`. The mmap is
/// unmapped when the loader returns, so canonical entries must never alias
/// the input buffer.
#[derive(Default)]
struct LocalDict {
    map: AHashMap<String, i32>,
    list: Vec<String>,
}

impl LocalDict {
    fn intern(&mut self, raw: &[u8]) -> i32 {
        if let Ok(s) = std::str::from_utf8(raw) {
            if let Some(&id) = self.map.get(s) {
                return id;
            }
        }
        let owned = String::from_utf8_lossy(raw).into_owned();
        // Lossy replacement can collide with an entry seen before.
        if let Some(&id) = self.map.get(owned.as_str()) {
            return id;
        }
        let id = self.list.len() as i32;
        self.list.push(owned.clone());
        self.map.insert(owned, id);
        id
    }
}

#[derive(Default)]
struct LocalDicts {
    country: LocalDict,
    region: LocalDict,
    product: LocalDict,
}

/// One worker's disjoint window into every global column.
struct Slots<'a> {
    revenues: &'a mut [f64],
    dates: &'a mut [i32],
    quantities: &'a mut [i32],
    stocks: &'a mut [i32],
    country_ids: &'a mut [i32],
    region_ids: &'a mut [i32],
    product_ids: &'a mut [i32],
}

fn split_slots<'a>(store: &'a mut ColumnStore, rows: &[usize]) -> Vec<Slots<'a>> {
    let mut revenues = store.revenues.as_mut_slice();
    let mut dates = store.dates.as_mut_slice();
    let mut quantities = store.quantities.as_mut_slice();
    let mut stocks = store.stocks.as_mut_slice();
    let mut country_ids = store.country_ids.as_mut_slice();
    let mut region_ids = store.region_ids.as_mut_slice();
    let mut product_ids = store.product_ids.as_mut_slice();

    let mut out = Vec::with_capacity(rows.len());
    for &count in rows {
        let (rev, rest) = revenues.split_at_mut(count);
        revenues = rest;
        let (dat, rest) = dates.split_at_mut(count);
        dates = rest;
        let (qty, rest) = quantities.split_at_mut(count);
        quantities = rest;
        let (stk, rest) = stocks.split_at_mut(count);
        stocks = rest;
        let (cid, rest) = country_ids.split_at_mut(count);
        country_ids = rest;
        let (rid, rest) = region_ids.split_at_mut(count);
        region_ids = rest;
        let (pid, rest) = product_ids.split_at_mut(count);
        product_ids = rest;
        out.push(Slots {
            revenues: rev,
            dates: dat,
            quantities: qty,
            stocks: stk,
            country_ids: cid,
            region_ids: rid,
            product_ids: pid,
        });
    }
    out
}

/// Parse one range of whole lines into this worker's column windows.
/// String columns receive worker-local ids.
///
/// A line with fewer than 12 fields keeps 0 for every numeric column it
/// never reached and the interned empty string for every string column it
/// never reached, so row indices stay aligned across all seven columns.
/// Blank lines take the same path and become all-default rows.
fn parse_chunk(chunk: &[u8], slots: &mut Slots<'_>, dicts: &mut LocalDicts) {
    let mut row = 0usize;
    let mut pos = 0usize;
    while let Some(nl) = memchr(NEWLINE, &chunk[pos..]) {
        let line = &chunk[pos..pos + nl];
        pos += nl + 1;

        let mut date = 0i32;
        let mut quantity = 0i32;
        let mut revenue = 0f64;
        let mut stock = 0i32;
        let mut country: &[u8] = b"";
        let mut region: &[u8] = b"";
        let mut product: &[u8] = b"";

        for (col, field) in line.split(|&b| b == COMMA).enumerate() {
            match col {
                COL_DATE => date = parse_year_month(field),
                COL_COUNTRY => country = field,
                COL_REGION => region = field,
                COL_PRODUCT => product = field,
                COL_QUANTITY => quantity = parse_int(field),
                COL_REVENUE => revenue = parse_float(field),
                COL_STOCK => {
                    stock = parse_int(field);
                    break;
                }
                _ => {}
            }
        }

        slots.dates[row] = date;
        slots.quantities[row] = quantity;
        slots.revenues[row] = revenue;
        slots.stocks[row] = stock;
        slots.country_ids[row] = dicts.country.intern(country);
        slots.region_ids[row] = dicts.region.intern(region);
        slots.product_ids[row] = dicts.product.intern(product);
        row += 1;
    }
    debug_assert_eq!(row, slots.dates.len());
}

fn exclusive_prefix_sum(rows: &[usize]) -> Vec<usize> {
    let mut offsets = Vec::with_capacity(rows.len());
    let mut acc = 0usize;
    for &r in rows {
        offsets.push(acc);
        acc += r;
    }
    offsets
}

/// Fold worker-local dictionaries (in worker order) into one global table,
/// then rewrite this column's ids from local to global, one worker window
/// at a time.
fn merge_dicts(
    locals: Vec<LocalDict>,
    ids: &mut [i32],
    offsets: &[usize],
    rows: &[usize],
) -> Result<Vec<String>> {
    let mut global: Vec<String> = Vec::new();
    let mut index: AHashMap<String, i32> = AHashMap::new();
    let mut remaps: Vec<Vec<i32>> = Vec::with_capacity(locals.len());

    for local in locals {
        let mut remap = Vec::with_capacity(local.list.len());
        for s in local.list {
            let gid = match index.get(s.as_str()) {
                Some(&gid) => gid,
                None => {
                    if global.len() > i32::MAX as usize {
                        bail!("dictionary overflow: more than {} distinct values", i32::MAX);
                    }
                    let gid = global.len() as i32;
                    global.push(s.clone());
                    index.insert(s, gid);
                    gid
                }
            };
            remap.push(gid);
        }
        remaps.push(remap);
    }

    for (w, remap) in remaps.iter().enumerate() {
        for id in &mut ids[offsets[w]..offsets[w] + rows[w]] {
            *id = remap[*id as usize];
        }
    }
    Ok(global)
}

fn split_locals(locals: Vec<LocalDicts>) -> (Vec<LocalDict>, Vec<LocalDict>, Vec<LocalDict>) {
    let mut countries = Vec::with_capacity(locals.len());
    let mut regions = Vec::with_capacity(locals.len());
    let mut products = Vec::with_capacity(locals.len());
    for l in locals {
        countries.push(l.country);
        regions.push(l.region);
        products.push(l.product);
    }
    (countries, regions, products)
}

/// Load the transactions CSV at `path` into a freshly allocated column
/// store. The file is memory-mapped read-only; a missing or unreadable
/// file is a fatal load error.
pub fn load_columnar(path: &Path) -> Result<ColumnStore> {
    let started = Instant::now();
    info!(path = %path.display(), "loading transactions (mmap + parallel)");

    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let mmap = unsafe { MmapOptions::new().map(&file) }
        .with_context(|| format!("mmap {}", path.display()))?;

    let store = load_from_bytes(&mmap)?;
    info!(rows = store.len(), elapsed = ?started.elapsed(), "columnar load complete");
    Ok(store)
}

/// Run the load pipeline over an in-memory buffer. The first line is the
/// mandatory header and is always skipped; a header-only or empty buffer
/// yields an empty store.
pub fn load_from_bytes(data: &[u8]) -> Result<ColumnStore> {
    let body = match memchr(NEWLINE, data) {
        Some(i) => &data[i + 1..],
        None => &data[..0],
    };

    let workers = rayon::current_num_threads().max(1);
    let ranges = aligned_ranges(body, workers);

    // Row count per range; a trailing line without `\n` is not a record.
    let rows: Vec<usize> = ranges
        .par_iter()
        .map(|r| memchr_iter(NEWLINE, &body[r.clone()]).count())
        .collect();
    let total: usize = rows.iter().sum();
    let offsets = exclusive_prefix_sum(&rows);

    let mut store = ColumnStore::with_rows(total);

    let slots = split_slots(&mut store, &rows);
    let locals: Vec<LocalDicts> = ranges
        .par_iter()
        .zip(slots)
        .map(|(range, mut slots)| {
            let mut dicts = LocalDicts::default();
            parse_chunk(&body[range.clone()], &mut slots, &mut dicts);
            dicts
        })
        .collect();

    // The three string columns are independent; merge them concurrently.
    // Local dictionaries are consumed here, before aggregation ever runs.
    let (countries, regions, products) = split_locals(locals);
    let ColumnStore {
        country_ids,
        region_ids,
        product_ids,
        ..
    } = &mut store;
    let (country_dict, (region_dict, product_dict)) = rayon::join(
        || merge_dicts(countries, country_ids, &offsets, &rows),
        || {
            rayon::join(
                || merge_dicts(regions, region_ids, &offsets, &rows),
                || merge_dicts(products, product_ids, &offsets, &rows),
            )
        },
    );
    store.country_dict = country_dict?;
    store.region_dict = region_dict?;
    store.product_dict = product_dict?;

    Ok(store)
}
