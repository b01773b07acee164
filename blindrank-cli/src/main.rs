mod config;
mod library;
mod metadata;
mod output;
mod persist;
mod tags;

use std::collections::BTreeMap;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use blindrank_core::{
    apply_strategy, Error, MatchOutcome, RatedImage, StrategySpec, SubsetStore,
};
use clap::Parser;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use crate::persist::{rating_file, SavedRatings, Saver};
use crate::tags::DEFAULT_TAG_PREFIX;

#[derive(Parser)]
#[command(name = "blindrank", version, about = "Rank images by blind pairwise comparison")]
struct Cli {
    /// Root directory whose subdirectories are image subsets
    #[arg(long, global = true)]
    library: Option<PathBuf>,

    /// Where rating state is persisted
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Treat subsets as grouped generated-image collections (PNG
    /// provenance metadata is extracted and group models are ranked)
    #[arg(long, global = true)]
    grouped: bool,

    /// Path to config file (default: ~/.config/blindrank/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Create a default config file at ~/.config/blindrank/config.toml
    Init,
    /// List available subsets
    Subsets,
    /// Interactive comparison session (seeds first if needed)
    Compare { subset: String },
    /// Seed star ratings for unrated images, then exit
    Seed { subset: String },
    /// Show rankings for a subset
    Rankings {
        subset: String,
        /// Rank group models instead of images
        #[arg(long)]
        groups: bool,
        /// Output JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Show comparison coverage for a subset
    Progress { subset: String },
    /// Show aggregate statistics for a subset
    Summary {
        subset: String,
        /// Summarize group models instead of images
        #[arg(long)]
        groups: bool,
    },
    /// Bin rated images and write aesthetic tags to sidecar files
    Tag(TagArgs),
    /// Export rankings as CSV
    Export {
        subset: String,
        /// Export group models instead of images
        #[arg(long)]
        groups: bool,
        /// Write to a file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[derive(Parser)]
struct TagArgs {
    subset: String,

    /// Binning strategy: customQuantile, ponyQuantile, equalQuantile,
    /// stdDev, rangeNormalization, or kmeans
    #[arg(long)]
    strategy: String,

    /// Tag names, lowest bucket first
    #[arg(long, value_delimiter = ',')]
    tags: Vec<String>,

    /// Tag prefix (default: aesthetic_rating_)
    #[arg(long)]
    prefix: Option<String>,

    /// Number of bins for equalQuantile (default: number of tags)
    #[arg(long)]
    bins: Option<usize>,

    /// Number of clusters for kmeans (default: number of tags)
    #[arg(long)]
    clusters: Option<usize>,

    /// Cut thresholds in [0,1] for rangeNormalization
    #[arg(long, value_delimiter = ',')]
    thresholds: Vec<f64>,
}

/// Resolved runtime settings: config file merged with CLI flags, CLI
/// winning.
struct App {
    library: PathBuf,
    data_dir: PathBuf,
    grouped: bool,
    tag_prefix: String,
}

impl App {
    fn resolve(cli: &Cli) -> Result<App> {
        let config_path = cli.config.clone().unwrap_or_else(config::config_path);
        let cfg = config::load_config(&config_path)?;

        let library = cli
            .library
            .clone()
            .or(cfg.library)
            .with_context(|| {
                format!(
                    "no library specified; pass --library or set it in {}",
                    config_path.display()
                )
            })?;

        let data_dir = cli.data_dir.clone().or(cfg.data_dir).unwrap_or_else(|| {
            dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("blindrank")
        });
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("failed to create data dir {}", data_dir.display()))?;

        Ok(App {
            library,
            data_dir,
            grouped: cli.grouped,
            tag_prefix: cfg.tag_prefix.unwrap_or_else(|| DEFAULT_TAG_PREFIX.to_string()),
        })
    }

    fn load_store(&self, subset: &str) -> Result<SubsetStore> {
        let loaded = library::load_subset(&self.library, &self.data_dir, subset, self.grouped);
        if loaded.images.is_empty() {
            bail!("subset \"{subset}\" has no images and no saved ratings");
        }
        let mut store = SubsetStore::new();
        store.insert(subset, loaded);
        Ok(store)
    }

    fn image_path(&self, subset: &str, image: &str) -> PathBuf {
        library::image_path(&self.library, subset, image)
    }

    /// Snapshot the subset and hand it to the background writer.
    fn enqueue_save(&self, subset: &str, store: &SubsetStore, saver: &Saver) -> Result<()> {
        let snapshot = SavedRatings::snapshot(store.subset(subset)?);
        saver.enqueue(rating_file(&self.data_dir, subset, self.grouped), &snapshot);
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if cli.verbose { "debug" } else { "info" }));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    match &cli.command {
        Commands::Init => {
            let path = config::create_default_config()?;
            println!("Created config at {}", path.display());
            println!("Edit it to set your library and data directories.");
            Ok(())
        }
        Commands::Subsets => {
            let app = App::resolve(&cli)?;
            let names = library::discover_subsets(&app.library, &app.data_dir, app.grouped);
            if names.is_empty() {
                println!("No subsets found under {}", app.library.display());
            }
            for name in names {
                println!("{name}");
            }
            Ok(())
        }
        Commands::Compare { subset } => {
            let app = App::resolve(&cli)?;
            run_session(&app, subset, false).await
        }
        Commands::Seed { subset } => {
            let app = App::resolve(&cli)?;
            run_session(&app, subset, true).await
        }
        Commands::Rankings { subset, groups, json } => {
            let app = App::resolve(&cli)?;
            let store = app.load_store(subset)?;
            if *groups {
                let ranked = store.group_rankings(subset)?;
                if *json {
                    output::print_group_json(&ranked)?;
                } else {
                    output::print_group_table(&ranked);
                }
            } else {
                let ranked = store.image_rankings(subset)?;
                if *json {
                    output::print_image_json(&ranked)?;
                } else {
                    output::print_image_table(&ranked);
                }
            }
            Ok(())
        }
        Commands::Progress { subset } => {
            let app = App::resolve(&cli)?;
            let store = app.load_store(subset)?;
            output::print_progress(subset, &store.progress(subset)?);
            Ok(())
        }
        Commands::Summary { subset, groups } => {
            let app = App::resolve(&cli)?;
            let store = app.load_store(subset)?;
            if *groups {
                output::print_summary("Group models", &store.group_summary(subset)?);
            } else {
                output::print_summary("Rated images", &store.image_summary(subset)?);
            }
            Ok(())
        }
        Commands::Tag(args) => {
            let app = App::resolve(&cli)?;
            run_tag(&app, args)
        }
        Commands::Export { subset, groups, output: out } => {
            let app = App::resolve(&cli)?;
            let store = app.load_store(subset)?;
            let csv = if *groups {
                output::group_csv(&store.group_rankings(subset)?)
            } else {
                output::image_csv(&store.image_rankings(subset)?)
            };
            match out {
                Some(path) => {
                    std::fs::write(path, csv)
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    println!("Exported to {}", path.display());
                }
                None => println!("{csv}"),
            }
            Ok(())
        }
    }
}

// --- Interactive sessions ---

async fn run_session(app: &App, subset: &str, seed_only: bool) -> Result<()> {
    let mut store = app.load_store(subset)?;
    let saver = Saver::spawn();
    let stdin = io::stdin();
    let mut input = stdin.lock();

    let result = session_loop(app, subset, seed_only, &mut store, &saver, &mut input);
    saver.finish().await;
    result
}

fn session_loop(
    app: &App,
    subset: &str,
    seed_only: bool,
    store: &mut SubsetStore,
    saver: &Saver,
    input: &mut impl BufRead,
) -> Result<()> {
    loop {
        match store.next_match(subset) {
            Ok(MatchOutcome::Seeding(unrated)) => {
                let quit = run_seeding(app, subset, store, saver, input, &unrated)?;
                let status = store.seeding_status(subset)?;
                if status.needs_seeding {
                    println!(
                        "{} image(s) still unseeded; comparisons start once every image has a star rating.",
                        status.unrated.len()
                    );
                    return Ok(());
                }
                if quit || seed_only {
                    return Ok(());
                }
            }
            Ok(MatchOutcome::Pair(one, two)) => {
                if seed_only {
                    println!("All images are already seeded.");
                    return Ok(());
                }
                if !run_pair(app, subset, store, saver, input, &one, &two)? {
                    return Ok(());
                }
            }
            Err(Error::InsufficientCandidates) => {
                println!("Not enough rated images to compare.");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        }
    }
}

/// Prompt star ratings for unrated images. Returns true when the
/// judge quit mid-session; whatever was collected is still applied
/// and saved.
fn run_seeding(
    app: &App,
    subset: &str,
    store: &mut SubsetStore,
    saver: &Saver,
    input: &mut impl BufRead,
    unrated: &[String],
) -> Result<bool> {
    println!("{} image(s) need an initial star rating.", unrated.len());

    let mut collected: Vec<(String, u8)> = Vec::new();
    let mut quit = false;

    'images: for image in unrated {
        println!("\n{}", app.image_path(subset, image).display());
        loop {
            let Some(line) = prompt_line(input, "  stars 1-10 (s skip, q quit): ")? else {
                quit = true;
                break 'images;
            };
            match line.as_str() {
                "s" => continue 'images,
                "q" => {
                    quit = true;
                    break 'images;
                }
                other => match other.parse::<u8>() {
                    Ok(star @ 1..=10) => {
                        collected.push((image.clone(), star));
                        continue 'images;
                    }
                    _ => println!("  Enter a number from 1 to 10, s, or q."),
                },
            }
        }
    }

    if !collected.is_empty() {
        let seeded = store.seed_ratings(subset, collected)?;
        println!("Seeded {seeded} image(s).");
        app.enqueue_save(subset, store, saver)?;
    }
    Ok(quit)
}

/// Present one pair and apply the verdict. Returns false when the
/// session should end.
fn run_pair(
    app: &App,
    subset: &str,
    store: &mut SubsetStore,
    saver: &Saver,
    input: &mut impl BufRead,
    one: &str,
    two: &str,
) -> Result<bool> {
    println!("\n  [1] {}", app.image_path(subset, one).display());
    println!("  [2] {}", app.image_path(subset, two).display());

    loop {
        let Some(line) = prompt_line(input, "Winner? (1/2, s skip, d1/d2 delete, q quit): ")? else {
            return Ok(false);
        };
        match line.as_str() {
            "s" => return Ok(true),
            "1" => {
                store.record_vote(subset, one, two)?;
                app.enqueue_save(subset, store, saver)?;
                return Ok(true);
            }
            "2" => {
                store.record_vote(subset, two, one)?;
                app.enqueue_save(subset, store, saver)?;
                return Ok(true);
            }
            "d1" | "d2" => {
                let target = if line == "d1" { one } else { two };
                store.delete_image(subset, target)?;
                remove_image_file(app, subset, target);
                app.enqueue_save(subset, store, saver)?;
                println!("Deleted {target}");
                return Ok(true);
            }
            "q" => return Ok(false),
            _ => println!("Enter 1, 2, s, d1, d2, or q."),
        }
    }
}

/// Delete the image file (and nothing else). A file already gone is
/// fine; anything else is logged and the rating state deletion stands.
fn remove_image_file(app: &App, subset: &str, image: &str) {
    let path = app.image_path(subset, image);
    match std::fs::remove_file(&path) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "failed to delete image file"),
    }
}

fn prompt_line(input: &mut impl BufRead, msg: &str) -> Result<Option<String>> {
    print!("{msg}");
    io::stdout().flush()?;
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

// --- Tagging ---

fn run_tag(app: &App, args: &TagArgs) -> Result<()> {
    let store = app.load_store(&args.subset)?;
    let rated: Vec<RatedImage> = store
        .image_rankings(&args.subset)?
        .into_iter()
        .map(|r| RatedImage {
            name: r.name,
            rating: r.rating,
        })
        .collect();

    let spec = parse_strategy(args)?;
    let assignments = apply_strategy(spec, &rated)?;

    let prefix = args.prefix.as_deref().unwrap_or(&app.tag_prefix);
    let mut processed = 0usize;
    let mut errors = 0usize;
    let mut tag_counts: BTreeMap<String, usize> = BTreeMap::new();

    for (image, tag) in &assignments {
        let path = app.image_path(&args.subset, image);
        match tags::merge_tag(&path, prefix, tag) {
            Ok(()) => {
                processed += 1;
                *tag_counts.entry(tag.clone()).or_insert(0) += 1;
            }
            Err(e) => {
                errors += 1;
                warn!(image, error = %e, "failed to write tag file");
            }
        }
    }

    println!(
        "Tagged subset \"{}\" with {}: processed {processed}, errors {errors}.",
        args.subset, args.strategy
    );
    for (tag, count) in &tag_counts {
        println!("  {prefix}{tag}: {count}");
    }
    Ok(())
}

/// Default tag names, lowest bucket first.
fn default_tags(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("t{i}")).collect()
}

fn parse_strategy(args: &TagArgs) -> Result<StrategySpec> {
    let tags = args.tags.clone();
    match args.strategy.as_str() {
        "customQuantile" => Ok(StrategySpec::CustomQuantile {
            tags: if tags.is_empty() { default_tags(5) } else { tags },
        }),
        "ponyQuantile" => Ok(StrategySpec::PonyQuantile),
        "equalQuantile" => {
            if tags.is_empty() {
                bail!("equalQuantile requires --tags");
            }
            let bins = args.bins.unwrap_or(tags.len());
            Ok(StrategySpec::EqualQuantile { tags, bins })
        }
        "stdDev" => Ok(StrategySpec::StdDev {
            tags: if tags.is_empty() { default_tags(5) } else { tags },
        }),
        "rangeNormalization" => {
            let thresholds = if args.thresholds.is_empty() {
                None
            } else {
                Some(args.thresholds.clone())
            };
            let tags = if tags.is_empty() {
                default_tags(args.thresholds.len().max(4) + 1)
            } else {
                tags
            };
            Ok(StrategySpec::RangeNormalization { tags, thresholds })
        }
        "kmeans" => {
            if tags.is_empty() {
                bail!("kmeans requires --tags");
            }
            let clusters = args.clusters.unwrap_or(tags.len());
            Ok(StrategySpec::KMeans { tags, clusters })
        }
        other => bail!(
            "unknown strategy \"{other}\"; use customQuantile, ponyQuantile, equalQuantile, stdDev, rangeNormalization, or kmeans"
        ),
    }
}
