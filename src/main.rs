use clap::{Parser, Subcommand};
use color_eyre::{eyre::eyre, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use freightflow::checkout::{format_inr, Checkout};
use freightflow::config::Config;
use freightflow::db::Database;
use freightflow::listing::{filter_and_sort, Availability, FilterConstraints, SortMode, Truck};
use freightflow::net::{Fetcher, HttpFetcher, Request};
use freightflow::worker::{OfflineWorker, PendingStore, WorkerSettings};

#[derive(Parser, Debug)]
#[command(name = "freightflow")]
#[command(about = "Offline cache manager for the FreightFlow booking site")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/freightflow/config.yaml)
  #[arg(short, long, global = true)]
  config: Option<PathBuf>,

  /// Directory for a daily-rolling log file
  #[arg(long, global = true)]
  log_dir: Option<PathBuf>,

  /// Use a throwaway in-memory database
  #[arg(long, global = true)]
  ephemeral: bool,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Cache the manifest as a new generation and activate it
  Install,
  /// Delete partitions left by older generations
  Activate,
  /// Serve a request through the cache manager
  Fetch {
    /// Absolute URL or path relative to the origin
    url: String,
    /// Treat as an image load
    #[arg(long)]
    image: bool,
    /// Treat as a full-page navigation
    #[arg(long)]
    navigate: bool,
  },
  /// Queue a booking (JSON) for the next background sync
  Queue { payload: String },
  /// Replay queued bookings
  Sync {
    /// Sync tag (default: the configured one)
    #[arg(long)]
    tag: Option<String>,
  },
  /// Render a push payload as a notification
  Push { payload: Option<String> },
  /// Post a consumer message, e.g. '{"type":"SKIP_WAITING"}'
  Message { json: String },
  /// Filter and sort the truck listing
  Trucks {
    #[arg(long, default_value_t = 5000)]
    min_price: u32,
    #[arg(long, default_value_t = 25000)]
    max_price: u32,
    /// Minimum rating; repeat to accept any of several
    #[arg(long = "rating")]
    ratings: Vec<f32>,
    /// available or scheduled; repeatable
    #[arg(long = "availability")]
    availability: Vec<Availability>,
    /// price-low, price-high, rating, availability or recommended
    #[arg(long, default_value = "recommended")]
    sort: SortMode,
  },
  /// Show checkout totals
  Checkout {
    #[arg(long, default_value_t = 12500)]
    base: u32,
    #[arg(long)]
    insurance: bool,
  },
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Load configuration
  let config = Config::load(args.config.as_deref())?;
  let log_dir = args.log_dir.clone().or_else(|| config.log_dir.clone());
  let _guard = init_logging(log_dir.as_deref())?;

  match args.command {
    Command::Trucks {
      min_price,
      max_price,
      ratings,
      availability,
      sort,
    } => {
      let constraints = FilterConstraints {
        price: min_price..=max_price,
        min_ratings: ratings,
        availability: availability.into_iter().collect(),
      };
      print_trucks(&constraints, sort);
      Ok(())
    }
    Command::Checkout { base, insurance } => {
      let mut checkout = Checkout::new(base);
      checkout.toggle_insurance(insurance);
      println!("Base:      {}", format_inr(checkout.base_total));
      if checkout.insured {
        println!("Insurance: {}", format_inr(checkout.insurance_cost));
      }
      println!("Total:     {}", format_inr(checkout.total()));
      Ok(())
    }
    Command::Install => {
      let worker = open_worker(&config, args.ephemeral)?;
      let report = worker.handle_install().await?;
      println!("Cached {} assets into {}", report.cached, report.partition);
      if report.skip_waiting {
        let activated = worker.handle_activate().await?;
        println!("Activated; removed {} old partition(s)", activated.deleted.len());
      }
      Ok(())
    }
    Command::Activate => {
      let worker = open_worker(&config, args.ephemeral)?;
      let report = worker.handle_activate().await?;
      for name in &report.deleted {
        println!("Deleted {}", name);
      }
      println!("Activated {}", worker.settings().generation.version());
      Ok(())
    }
    Command::Fetch {
      url,
      image,
      navigate,
    } => {
      let worker = open_worker(&config, args.ephemeral)?;
      let mut request = Request::get(worker.settings().resolve(&url)?);
      if image {
        request = request.image();
      }
      if navigate {
        request = request.navigate();
      }

      match worker.handle_fetch(&request).await? {
        Some(served) => {
          println!(
            "{} {} ({:?})",
            served.response.status, served.response.status_text, served.source
          );
          println!("{}", String::from_utf8_lossy(&served.response.body));
        }
        None => {
          let response = HttpFetcher::new()?.fetch(&request).await?;
          println!("{} {} (passthrough)", response.status, response.status_text);
          println!("{}", String::from_utf8_lossy(&response.body));
        }
      }
      Ok(())
    }
    Command::Queue { payload } => {
      let worker = open_worker(&config, args.ephemeral)?;
      let payload: serde_json::Value =
        serde_json::from_str(&payload).map_err(|e| eyre!("Invalid booking JSON: {}", e))?;
      let write = worker.pending().enqueue(payload)?;
      println!("Queued {}", write.id);
      Ok(())
    }
    Command::Sync { tag } => {
      let worker = open_worker(&config, args.ephemeral)?;
      let tag = tag.unwrap_or_else(|| worker.settings().sync_tag.clone());
      match worker.handle_sync(&tag).await? {
        Some(report) => println!(
          "Delivered {}/{}, {} still queued",
          report.delivered, report.attempted, report.remaining
        ),
        None => println!("No sync registered for tag {}", tag),
      }
      Ok(())
    }
    Command::Push { payload } => {
      let worker = open_worker(&config, args.ephemeral)?;
      let notification = worker
        .handle_push(payload.as_deref().map(str::as_bytes))
        .await?;
      let rendered = serde_json::to_string_pretty(&notification)
        .map_err(|e| eyre!("Failed to render notification: {}", e))?;
      println!("{}", rendered);
      Ok(())
    }
    Command::Message { json } => {
      let worker = open_worker(&config, args.ephemeral)?;
      let data: serde_json::Value =
        serde_json::from_str(&json).map_err(|e| eyre!("Invalid message JSON: {}", e))?;
      worker.handle_message(&data).await?;
      println!("State: {}", worker.lifecycle());
      Ok(())
    }
  }
}

/// Worker over the configured database (or an in-memory one), resuming any active generation.
fn open_worker(config: &Config, ephemeral: bool) -> Result<OfflineWorker<Database, HttpFetcher>> {
  let db = Arc::new(if ephemeral {
    Database::open_in_memory()?
  } else {
    Database::open(&config.database_path()?)?
  });
  let settings = WorkerSettings::from_config(config)?;
  let worker = OfflineWorker::resume(settings, db.clone(), HttpFetcher::new()?)?.with_pending(db);
  Ok(worker)
}

fn print_trucks(constraints: &FilterConstraints, sort: SortMode) {
  let fleet = Truck::fleet();
  let trucks = filter_and_sort(&fleet, constraints, sort);
  println!("{} truck(s)", trucks.len());
  for truck in trucks {
    println!(
      "{:<10} {:<20} {:<10} ★ {:.1}  {:>9}  {:?}",
      truck.id,
      truck.name,
      truck.kind,
      truck.rating,
      format_inr(truck.price),
      truck.status
    );
  }
}

/// Log to stderr, and to a daily-rolling file when `log_dir` is set.
fn init_logging(log_dir: Option<&Path>) -> Result<Option<WorkerGuard>> {
  let filter =
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("freightflow=info"));
  let stderr = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

  match log_dir {
    Some(dir) => {
      let appender = tracing_appender::rolling::daily(dir, "freightflow.log");
      let (writer, guard) = tracing_appender::non_blocking(appender);
      let file = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(writer);

      tracing_subscriber::registry()
        .with(filter)
        .with(stderr)
        .with(file)
        .try_init()
        .map_err(|e| eyre!("Failed to initialise logging: {}", e))?;
      Ok(Some(guard))
    }
    None => {
      tracing_subscriber::registry()
        .with(filter)
        .with(stderr)
        .try_init()
        .map_err(|e| eyre!("Failed to initialise logging: {}", e))?;
      Ok(None)
    }
  }
}
