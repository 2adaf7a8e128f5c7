use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{Date32Array, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use arrow::util::pretty::print_batches;
use parquet::arrow::ArrowWriter;

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }

    fn pick<'a>(&mut self, items: &[&'a str]) -> &'a str {
        items[(self.next_u64() % items.len() as u64) as usize]
    }
}

/// Days since the Unix epoch for 2024-01-01.
const START_DAY: i32 = 19_723;

fn main() -> Result<()> {
    let mut rng = SimpleRng::new(42);

    let regions = ["North", "South", "East", "West"];
    let channels = ["Email", "Social", "Search", "Display"];
    // (category, typical order value)
    let categories = [
        ("Electronics", 820.0),
        ("Clothing", 95.0),
        ("Home", 240.0),
        ("Sports", 150.0),
        ("Beauty", 60.0),
    ];

    let n_rows = 500;
    let mut dates = Vec::with_capacity(n_rows);
    let mut region_col = Vec::with_capacity(n_rows);
    let mut category_col = Vec::with_capacity(n_rows);
    let mut channel_col = Vec::with_capacity(n_rows);
    let mut units_col = Vec::with_capacity(n_rows);
    let mut sales_col = Vec::with_capacity(n_rows);
    let mut spend_col = Vec::with_capacity(n_rows);

    for i in 0..n_rows {
        let (category, price) = categories[i % categories.len()];
        let units = rng.gauss(12.0, 5.0).round().max(1.0) as i64;
        let sales = (units as f64 * rng.gauss(price, price * 0.15)).max(0.0);
        let spend = (sales * rng.gauss(0.12, 0.03)).max(0.0);

        dates.push(START_DAY + (i as i32 % 365));
        region_col.push(rng.pick(&regions));
        category_col.push(category);
        channel_col.push(rng.pick(&channels));
        units_col.push(units);
        sales_col.push((sales * 100.0).round() / 100.0);
        spend_col.push((spend * 100.0).round() / 100.0);
    }

    let schema = Arc::new(Schema::new(vec![
        Field::new("Date", DataType::Date32, false),
        Field::new("Region", DataType::Utf8, false),
        Field::new("Category", DataType::Utf8, false),
        Field::new("Channel", DataType::Utf8, false),
        Field::new("Units", DataType::Int64, false),
        Field::new("Sales", DataType::Float64, false),
        Field::new("AdSpend", DataType::Float64, false),
    ]));

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(Date32Array::from(dates)),
            Arc::new(StringArray::from(region_col)),
            Arc::new(StringArray::from(category_col)),
            Arc::new(StringArray::from(channel_col)),
            Arc::new(Int64Array::from(units_col)),
            Arc::new(Float64Array::from(sales_col)),
            Arc::new(Float64Array::from(spend_col)),
        ],
    )
    .context("building record batch")?;

    // Write Parquet
    let parquet_path = "sample_marketing.parquet";
    let file = std::fs::File::create(parquet_path).context("creating parquet output")?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating parquet writer")?;
    writer.write(&batch).context("writing parquet batch")?;
    writer.close().context("closing parquet writer")?;

    // Write CSV
    let csv_path = "sample_marketing.csv";
    let file = std::fs::File::create(csv_path).context("creating CSV output")?;
    let mut writer = arrow::csv::Writer::new(file);
    writer.write(&batch).context("writing CSV")?;

    print_batches(&[batch.slice(0, 5)]).context("printing preview")?;
    println!("Wrote {n_rows} rows to {parquet_path} and {csv_path}");
    Ok(())
}
