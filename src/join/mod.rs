mod aggregate;
mod join;

pub use aggregate::{aggregate_mean, Aggregate, AggregateRow, COUNT};
pub use join::{check_crs, spatial_join, JoinOptions, JoinedTable, Predicate, INDEX_RIGHT, RIGHT_SUFFIX};
