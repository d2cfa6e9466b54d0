use std::collections::BTreeMap;

use polars::prelude::{Column, DataFrame, IdxSize};
use tracing::{debug, info, warn};

use crate::{common, error::Result, join::JoinedTable};

/// Name of the per-key contributing-value count column.
pub const COUNT: &str = "count";

#[derive(Clone, Debug, PartialEq)]
pub struct AggregateRow {
    pub key: String,
    pub mean: f64,
    pub count: usize,
}

/// Mean of a value column per distinct key, sorted by key.
#[derive(Clone, Debug, PartialEq)]
pub struct Aggregate {
    key: String,
    value: String,
    rows: Vec<AggregateRow>,
    excluded: usize,
}

/// Group joined rows by `key` and average `value`.
pub fn aggregate_mean(joined: &JoinedTable, key: &str, value: &str) -> Result<Aggregate> {
    Aggregate::mean(joined.data(), key, value)
}

impl Aggregate {
    /// Group `data` by `key` and average `value`.
    ///
    /// Null or NaN values, and rows with a null key, count as excluded and
    /// contribute to neither sum nor count. Keys left with no values get no row.
    pub fn mean(data: &DataFrame, key: &str, value: &str) -> Result<Self> {
        let keys = common::column_as_keys(common::require_column(data, key)?)?;
        let values = common::column_as_f64(common::require_column(data, value)?)?;

        let mut groups: BTreeMap<String, (f64, usize)> = BTreeMap::new();
        let mut excluded = 0;
        for (k, v) in keys.into_iter().zip(values) {
            match (k, v) {
                (Some(k), Some(v)) if !v.is_nan() => {
                    let (sum, count) = groups.entry(k).or_insert((0.0, 0));
                    *sum += v;
                    *count += 1;
                }
                _ => excluded += 1,
            }
        }

        if excluded > 0 {
            warn!("[aggregate] excluded {excluded} rows with a null key or a null/NaN {value:?}");
        }

        let rows: Vec<AggregateRow> = groups.into_iter()
            .map(|(key, (sum, count))| AggregateRow { key, mean: sum / count as f64, count })
            .collect();

        debug!("[aggregate] mean of {value:?} by {key:?}: {} groups", rows.len());
        info!("[aggregate] {} groups from {} rows", rows.len(), data.height());

        Ok(Self { key: key.to_string(), value: value.to_string(), rows, excluded })
    }

    /// Column the rows were grouped by.
    #[inline] pub fn key(&self) -> &str { &self.key }

    /// Column that was averaged.
    #[inline] pub fn value(&self) -> &str { &self.value }

    #[inline] pub fn rows(&self) -> &[AggregateRow] { &self.rows }

    #[inline] pub fn len(&self) -> usize { self.rows.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.rows.is_empty() }

    /// Rows left out for a null key or a null/NaN value.
    #[inline] pub fn excluded(&self) -> usize { self.excluded }

    /// Mean for `key`, if that key had any contributing value.
    pub fn get(&self, key: &str) -> Option<f64> {
        self.rows.binary_search_by(|row| row.key.as_str().cmp(key))
            .ok()
            .map(|i| self.rows[i].mean)
    }

    /// Group keys, in row order.
    pub fn locations(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().map(|row| row.key.as_str())
    }

    /// Means, in row order.
    pub fn means(&self) -> impl Iterator<Item = f64> + '_ {
        self.rows.iter().map(|row| row.mean)
    }

    /// `[key, value, count]` frame, one row per group.
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        Ok(DataFrame::new(vec![
            Column::new(self.key.as_str().into(), self.locations().collect::<Vec<_>>()),
            Column::new(self.value.as_str().into(), self.means().collect::<Vec<_>>()),
            Column::new(COUNT.into(), self.rows.iter().map(|row| row.count as IdxSize).collect::<Vec<_>>()),
        ])?)
    }
}
