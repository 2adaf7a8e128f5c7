/// Data layer: core types, loading, filtering and aggregation.
///
/// Architecture:
/// ```text
///  .parquet / .json / .csv
///        │
///        ▼
///   ┌──────────┐      ┌───────┐
///   │  loader   │ ───▶ │ cache │  parse file → Arc<Dataset>, once per path
///   └──────────┘      └───────┘
///        │
///        ▼
///   ┌──────────────┐
///   │ expr / filter │  parse expression → AST → filtered row indices
///   └──────────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  stats    │  summary metrics, per-category sums, scatter points
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  export   │  filtered rows → CSV
///   └──────────┘
/// ```

pub mod cache;
pub mod error;
pub mod export;
pub mod expr;
pub mod filter;
pub mod loader;
pub mod model;
pub mod stats;
