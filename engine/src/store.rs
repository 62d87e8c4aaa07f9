//! Struct-of-arrays column store, the output of one load pass.

/// Columnar view of the transactions file. All seven column vectors share
/// the same length and every `*_ids[i]` is a valid index into the matching
/// dictionary. Nothing mutates the store once the loader returns it; the
/// aggregator only ever borrows it.
#[derive(Debug, Default)]
pub struct ColumnStore {
    // Data columns (flat arrays)
    pub revenues: Vec<f64>,
    pub dates: Vec<i32>, // year*100 + month
    pub quantities: Vec<i32>,
    pub stocks: Vec<i32>,

    // Dictionary-encoded ids
    pub country_ids: Vec<i32>,
    pub region_ids: Vec<i32>,
    pub product_ids: Vec<i32>,

    // Dictionaries (id -> string)
    pub country_dict: Vec<String>,
    pub region_dict: Vec<String>,
    pub product_dict: Vec<String>,
}

impl ColumnStore {
    /// Store with all columns allocated (zeroed) for `rows` rows and empty
    /// dictionaries.
    pub(crate) fn with_rows(rows: usize) -> Self {
        Self {
            revenues: vec![0.0; rows],
            dates: vec![0; rows],
            quantities: vec![0; rows],
            stocks: vec![0; rows],
            country_ids: vec![0; rows],
            region_ids: vec![0; rows],
            product_ids: vec![0; rows],
            country_dict: Vec::new(),
            region_dict: Vec::new(),
            product_dict: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }
}
