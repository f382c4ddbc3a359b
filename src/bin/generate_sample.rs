use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use arrow::array::{Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

const HEADERS: [&str; 8] = [
    "Car",
    "Manufacturer",
    "MPG",
    "Cylinders",
    "Horsepower",
    "Weight",
    "ModelYear",
    "Origin",
];

/// (manufacturer, origin, model names)
const MAKES: &[(&str, &str, &[&str])] = &[
    ("chevrolet", "USA", &["chevelle", "impala", "nova", "vega", "malibu"]),
    ("ford", "USA", &["torino", "galaxie", "pinto", "maverick", "mustang"]),
    ("plymouth", "USA", &["fury", "duster", "valiant", "volare"]),
    ("amc", "USA", &["hornet", "gremlin", "matador", "concord"]),
    ("buick", "USA", &["skylark", "century", "estate"]),
    ("dodge", "USA", &["challenger", "dart", "colt", "aspen"]),
    ("toyota", "Japan", &["corolla", "corona", "celica", "starlet"]),
    ("datsun", "Japan", &["pl510", "b210", "510", "280z"]),
    ("honda", "Japan", &["civic", "accord", "prelude"]),
    ("mazda", "Japan", &["rx2", "glc", "626"]),
    ("volkswagen", "Europe", &["beetle", "rabbit", "dasher", "scirocco"]),
    ("peugeot", "Europe", &["504", "604", "505"]),
    ("fiat", "Europe", &["124", "128", "strada"]),
    ("volvo", "Europe", &["144ea", "245", "264gl"]),
];

/// One generated vehicle.
struct Car {
    name: String,
    manufacturer: &'static str,
    mpg: f64,
    cylinders: i64,
    horsepower: Option<f64>,
    weight: i64,
    model_year: i64,
    origin: &'static str,
}

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

    fn below(&mut self, n: usize) -> usize {
        (self.next_f64() * n as f64) as usize % n.max(1)
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

fn generate_car(rng: &mut SimpleRng, index: usize) -> Car {
    let (manufacturer, origin, models) = MAKES[rng.below(MAKES.len())];
    let model = models[rng.below(models.len())];

    let cylinders: i64 = match origin {
        "USA" => [4, 6, 8, 8][rng.below(4)],
        "Japan" => [3, 4, 4, 4, 6][rng.below(5)],
        _ => [4, 4, 5, 6][rng.below(4)],
    };
    let model_year = 70 + rng.below(13) as i64;

    let hp = (cylinders as f64 * 18.0 + rng.gauss(0.0, 12.0)).max(45.0).round();
    let weight = (1400.0 + hp * 13.0 + rng.gauss(0.0, 180.0)).max(1600.0).round();
    let mpg = (52.0 - weight / 105.0 + (model_year - 70) as f64 * 0.7 + rng.gauss(0.0, 2.5))
        .max(9.0);

    // A handful of records have no horsepower on file.
    let horsepower = (rng.next_f64() >= 0.02).then_some(hp);

    Car {
        name: format!("{manufacturer} {model} #{index}"),
        manufacturer,
        mpg: (mpg * 10.0).round() / 10.0,
        cylinders,
        horsepower,
        weight: weight as i64,
        model_year,
        origin,
    }
}

fn write_csv(path: &Path, cars: &[Car]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;
    writer.write_record(HEADERS)?;
    for car in cars {
        writer.write_record([
            car.name.clone(),
            car.manufacturer.to_string(),
            car.mpg.to_string(),
            car.cylinders.to_string(),
            car.horsepower.map(|hp| hp.to_string()).unwrap_or_default(),
            car.weight.to_string(),
            car.model_year.to_string(),
            car.origin.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn write_parquet(path: &Path, cars: &[Car]) -> Result<()> {
    let schema = Arc::new(Schema::new(vec![
        Field::new("Car", DataType::Utf8, false),
        Field::new("Manufacturer", DataType::Utf8, false),
        Field::new("MPG", DataType::Float64, false),
        Field::new("Cylinders", DataType::Int64, false),
        Field::new("Horsepower", DataType::Float64, true),
        Field::new("Weight", DataType::Int64, false),
        Field::new("ModelYear", DataType::Int64, false),
        Field::new("Origin", DataType::Utf8, false),
    ]));

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(StringArray::from_iter_values(cars.iter().map(|c| c.name.as_str()))),
            Arc::new(StringArray::from_iter_values(cars.iter().map(|c| c.manufacturer))),
            Arc::new(Float64Array::from_iter_values(cars.iter().map(|c| c.mpg))),
            Arc::new(Int64Array::from_iter_values(cars.iter().map(|c| c.cylinders))),
            Arc::new(Float64Array::from_iter(cars.iter().map(|c| c.horsepower))),
            Arc::new(Int64Array::from_iter_values(cars.iter().map(|c| c.weight))),
            Arc::new(Int64Array::from_iter_values(cars.iter().map(|c| c.model_year))),
            Arc::new(StringArray::from_iter_values(cars.iter().map(|c| c.origin))),
        ],
    )
    .context("building record batch")?;

    let file = std::fs::File::create(path)
        .with_context(|| format!("creating {}", path.display()))?;
    let mut writer = ArrowWriter::try_new(file, schema, None)?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(())
}

fn main() -> Result<()> {
    let mut rows = 400usize;
    let mut parquet = false;
    let mut output: Option<PathBuf> = None;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--parquet" => parquet = true,
            "--rows" => {
                let n = args.next().context("--rows needs a value")?;
                rows = n.parse().with_context(|| format!("invalid row count '{n}'"))?;
            }
            "--out" => output = Some(PathBuf::from(args.next().context("--out needs a path")?)),
            other => bail!("unknown argument '{other}' (expected --rows N, --out PATH, --parquet)"),
        }
    }

    let output = output.unwrap_or_else(|| {
        PathBuf::from(if parquet {
            "sample_cars.parquet"
        } else {
            "sample_cars.csv"
        })
    });

    let mut rng = SimpleRng::new(42);
    let cars: Vec<Car> = (0..rows).map(|i| generate_car(&mut rng, i)).collect();

    if parquet {
        write_parquet(&output, &cars)?;
    } else {
        write_csv(&output, &cars)?;
    }

    println!("Wrote {} cars to {}", cars.len(), output.display());
    Ok(())
}
