/// Data layer: core types, loading, filtering, selection and statistics.
///
/// Architecture:
/// ```text
///  .csv / .json / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → Dataset (schema inferred once)
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  Dataset  │  Vec<Row>, Schema, unique values per column
///   └──────────┘
///        │
///        ├──────────────┐
///        ▼              ▼
///   ┌──────────┐   ┌───────────┐
///   │  filter   │   │ selection │  predicates → working set / highlighted ids
///   └──────────┘   └───────────┘
///        │
///        ▼
///   ┌───────────┐
///   │ aggregate │  counts, means, quartiles, whiskers, outliers per group
///   └───────────┘
/// ```

pub mod aggregate;
pub mod filter;
pub mod loader;
pub mod model;
pub mod selection;
