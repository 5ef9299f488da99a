use demand_forecast::{DataSource, Workbench, WorkbenchConfig};
use std::sync::mpsc;
use std::thread;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut config = WorkbenchConfig::default();
    config.model.epochs = 40;
    config.model.seed = Some(42);

    let mut bench = Workbench::new(config);
    let summary = bench.load(DataSource::Demo)?;
    println!("{}", summary);

    let exploration = bench.explore()?;
    if let Some(weekly) = exploration.autocorrelation.get(6) {
        println!("Weekly seasonality (lag 7 autocorrelation): {:.3}", weekly);
    }

    // Train on a worker thread and stop once validation loss stops improving
    let job = bench.start_training()?;
    let stop = job.stop_handle();
    let (tx, rx) = mpsc::channel();
    let worker = thread::spawn(move || {
        let mut job = job;
        for report in job.by_ref() {
            if tx.send(report).is_err() {
                break;
            }
        }
        job
    });

    let mut best = f64::INFINITY;
    let mut stale = 0;
    for report in rx {
        println!("{}", report);
        let loss = report.val_loss.unwrap_or(report.train_loss);
        if loss < best {
            best = loss;
            stale = 0;
        } else {
            stale += 1;
            if stale == 3 {
                println!("Validation loss plateaued, stopping");
                stop.request_stop();
            }
        }
    }

    let job = worker.join().map_err(|_| "training thread panicked")?;
    bench.complete_training(job)?;

    println!("\nNext {} days:", bench.config().forecast.horizon);
    for point in bench.forecast()? {
        println!("  {}", point);
    }

    println!("\n{}", bench.evaluate()?.metrics);
    Ok(())
}
