//! # workbench
//!
//! Command-line driver: load a dataset, explore it, train a recurrent model,
//! forecast and evaluate.

use clap::Parser;
use demand_forecast::{
    AggregationMode, CategoryFilter, DataSource, Dimension, ModelKind, TrainingControl,
    Workbench, WorkbenchConfig,
};
use std::error::Error;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "workbench")]
#[command(about = "Demand forecasting workbench", long_about = None)]
struct Cli {
    /// Input file (CSV or JSON)
    #[arg(short, long, conflicts_with = "demo")]
    input: Option<PathBuf>,

    /// Use the synthetic 365-day demo dataset
    #[arg(long)]
    demo: bool,

    /// JSON configuration file; command-line flags override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Date column (inferred when omitted)
    #[arg(long)]
    date_column: Option<String>,

    /// Target column (inferred when omitted)
    #[arg(long)]
    target_column: Option<String>,

    /// How rows sharing a date are merged (sum, mean, last)
    #[arg(short, long)]
    aggregation: Option<AggregationMode>,

    #[arg(long)]
    store: Option<String>,

    #[arg(long)]
    product: Option<String>,

    #[arg(long)]
    region: Option<String>,

    /// Recurrent cell (gru, lstm)
    #[arg(short, long)]
    model: Option<ModelKind>,

    /// Window length fed to the model
    #[arg(short = 'L', long)]
    sequence_length: Option<usize>,

    #[arg(long)]
    hidden_units: Option<usize>,

    #[arg(long)]
    dropout: Option<f64>,

    #[arg(short, long)]
    epochs: Option<usize>,

    #[arg(short, long)]
    batch_size: Option<usize>,

    /// Seed for weight initialization and dropout
    #[arg(long)]
    seed: Option<u64>,

    /// Number of days to forecast
    #[arg(long)]
    horizon: Option<usize>,

    /// Stop training once validation loss falls below this value
    #[arg(long)]
    target_val_loss: Option<f64>,
}

impl Cli {
    fn build_config(&self) -> Result<WorkbenchConfig, Box<dyn Error>> {
        let mut config = match &self.config {
            Some(path) => WorkbenchConfig::from_json_file(path)?,
            None => WorkbenchConfig::default(),
        };

        let data = &mut config.data;
        if self.date_column.is_some() {
            data.date_column = self.date_column.clone();
        }
        if self.target_column.is_some() {
            data.target_column = self.target_column.clone();
        }
        if let Some(mode) = self.aggregation {
            data.aggregation = mode;
        }
        for (dimension, value) in [
            (Dimension::Store, &self.store),
            (Dimension::Product, &self.product),
            (Dimension::Region, &self.region),
        ] {
            if value.is_some() {
                data.filters.set(dimension, value.clone());
            }
        }

        let model = &mut config.model;
        if let Some(kind) = self.model {
            model.kind = kind;
        }
        if let Some(length) = self.sequence_length {
            model.sequence_length = length;
        }
        if let Some(units) = self.hidden_units {
            model.hidden_units = units;
        }
        if let Some(dropout) = self.dropout {
            model.dropout = dropout;
        }
        if let Some(epochs) = self.epochs {
            model.epochs = epochs;
        }
        if let Some(batch_size) = self.batch_size {
            model.batch_size = batch_size;
        }
        if self.seed.is_some() {
            model.seed = self.seed;
        }
        if let Some(horizon) = self.horizon {
            config.forecast.horizon = horizon;
        }

        config.validate()?;
        Ok(config)
    }

    fn source(&self) -> Result<DataSource, Box<dyn Error>> {
        match (&self.input, self.demo) {
            (Some(path), _) => Ok(DataSource::File(path.clone())),
            (None, true) => Ok(DataSource::Demo),
            (None, false) => Err("Pass --input <FILE> or --demo".into()),
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "demand_forecast=info,workbench=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = cli.build_config()?;
    let mut bench = Workbench::new(config);

    println!("Demand Forecasting Workbench");
    println!("============================");

    let summary = bench.load(cli.source()?)?;
    println!("\n{}", summary);

    if let Some(dataset) = bench.dataset() {
        for dimension in Dimension::ALL {
            let values = dataset.distinct_values(dimension);
            if !values.is_empty() {
                println!("{:>8}: {}", dimension, values.join(", "));
            }
        }
    }
    if !bench.config().data.filters.is_unfiltered() {
        let CategoryFilter {
            store,
            product,
            region,
        } = &bench.config().data.filters;
        println!(
            "Filters: store={} product={} region={}",
            store.as_deref().unwrap_or("all"),
            product.as_deref().unwrap_or("all"),
            region.as_deref().unwrap_or("all")
        );
    }

    let exploration = bench.explore()?;
    println!("\nExploration ({} points)", exploration.values.len());
    println!(
        "  Rolling mean ({}): last {:.2}",
        exploration.rolling_window,
        exploration.rolling_mean.last().copied().unwrap_or(f64::NAN)
    );
    let weekday = exploration
        .day_of_week
        .labels()
        .iter()
        .zip(exploration.day_of_week.averages.iter())
        .map(|(label, avg)| format!("{} {:.1}", label, avg))
        .collect::<Vec<_>>()
        .join("  ");
    println!("  Weekday means: {}", weekday);
    let peak = exploration
        .autocorrelation
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map(|(i, r)| (i + 1, *r));
    if let Some((lag, r)) = peak {
        println!("  Strongest autocorrelation: lag {} (r = {:.3})", lag, r);
    }

    let target = cli.target_val_loss;
    println!("\nTraining");
    let reports = bench.train(|report| {
        println!("  {}", report);
        match (target, report.val_loss) {
            (Some(target), Some(val)) if val < target => TrainingControl::Stop,
            _ => TrainingControl::Continue,
        }
    })?;
    println!("  {} epochs run", reports.len());

    println!("\nForecast");
    for point in bench.forecast()? {
        println!("  {}", point);
    }

    let evaluation = bench.evaluate()?;
    println!("\nTest set ({} windows)", evaluation.points.len());
    println!("{}", evaluation.metrics);

    Ok(())
}
