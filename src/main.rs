//! Meeting-Media main entry point
//!
//! Command-line interface over the weekly media operations.

use anyhow::{bail, Context};
use chrono::{Datelike, NaiveDate};
use clap::{Parser, Subcommand};
use meeting_media::config::{load_config_with_hash, validate, Config};
use meeting_media::metadata::MetadataStore;
use meeting_media::model::week_context;
use meeting_media::ops::{MediaService, UploadFile};
use meeting_media::WeekType;
use serde::Serialize;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Meeting-Media: weekly schedule media harvester
///
/// Crawls a week's meeting pages, downloads the referenced images and videos
/// into a per-week directory and keeps the structured metadata next to them.
#[derive(Parser, Debug)]
#[command(name = "meeting-media")]
#[command(version)]
#[command(about = "Weekly schedule media harvester", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (defaults apply when omitted)
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

/// Which week's meeting an operation targets
#[derive(clap::Args, Debug)]
struct WeekArgs {
    /// Any day of the week (YYYY-MM-DD, defaults to today)
    #[arg(short, long)]
    date: Option<NaiveDate>,

    /// Meeting type: midweek or weekend
    #[arg(short = 't', long = "type", default_value = "midweek")]
    week_type: WeekType,
}

impl WeekArgs {
    fn date(&self) -> NaiveDate {
        self.date.unwrap_or_else(today)
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl (or load from cache) the media of a week's meeting
    FetchWeek {
        #[command(flatten)]
        week: WeekArgs,

        /// Crawl again, keeping only manually added entries
        #[arg(short, long)]
        force: bool,
    },

    /// Add local files, or .jwpub/.jwlplaylist packages, to a week's media
    Upload {
        #[command(flatten)]
        week: WeekArgs,

        /// Group the files are listed under
        #[arg(short, long)]
        group: String,

        /// Label for every file (defaults to each file's name)
        #[arg(short, long)]
        label: Option<String>,

        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Remove one item, and its files, from a week's media
    Remove {
        #[command(flatten)]
        week: WeekArgs,

        /// Uid of the item to remove
        uid: String,
    },

    /// Add a songbook video to a week's media
    AddSong {
        #[command(flatten)]
        week: WeekArgs,

        /// Group the song is listed under
        #[arg(short, long)]
        group: String,

        /// Song number
        song: u32,
    },

    /// Print the year text
    YearText {
        /// Defaults to the current year
        year: Option<i32>,
    },

    /// Print the number of songs in the songbook
    SongsCount,

    /// Print the text and audio timeline of Bible verses
    Bible {
        book: u32,
        chapter: u32,

        /// Comma-separated verse numbers
        #[arg(value_delimiter = ',', required = true)]
        verses: Vec<u32>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let config = load(cli.config.as_ref())?;
    let service = MediaService::new(config).context("Failed to create HTTP client")?;

    match cli.command {
        Command::FetchWeek { week, force } => {
            let results = service.fetch_week_media(week.date(), week.week_type, force).await?;
            print_json(&results)?;
        }
        Command::Upload {
            week,
            group,
            label,
            files,
        } => {
            let uploads: Vec<UploadFile> = files
                .into_iter()
                .map(|source| {
                    let label = label.clone().unwrap_or_else(|| {
                        source
                            .file_stem()
                            .map(|stem| stem.to_string_lossy().into_owned())
                            .unwrap_or_default()
                    });
                    UploadFile::new(source, group.as_str(), label)
                })
                .collect();
            let results = service.upload_media(week.date(), week.week_type, &uploads).await?;
            print_json(&results)?;
        }
        Command::Remove { week, uid } => {
            let store = service.store(week_context(week.date(), week.week_type));
            let loaded = MetadataStore::for_store(&store)?.load(false).await.unwrap_or_default();
            let Some(item) = loaded.into_iter().find(|r| r.result.uid.as_deref() == Some(uid.as_str())) else {
                bail!("No item with uid {}", uid);
            };
            let remaining = service.remove_media(&item, week.date(), week.week_type).await?;
            print_json(&remaining)?;
        }
        Command::AddSong { week, group, song } => {
            match service.add_song(week.date(), week.week_type, &group, song).await? {
                Some(results) => print_json(&results)?,
                None => bail!("Song {} could not be added", song),
            }
        }
        Command::YearText { year } => {
            let year = year.unwrap_or_else(|| today().year());
            println!("{}", service.get_year_text(year).await?);
        }
        Command::SongsCount => {
            println!("{}", service.load_songs_count().await);
        }
        Command::Bible {
            book,
            chapter,
            verses,
        } => {
            let results = service.fetch_bible_verses(book, chapter, verses).await?;
            print_json(&results)?;
        }
    }

    Ok(())
}

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// Loads the configuration file, or validated defaults without one
fn load(path: Option<&PathBuf>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        tracing::info!("No configuration file given, using defaults");
        let config = Config::default();
        validate(&config)?;
        return Ok(config);
    };

    tracing::info!("Loading configuration from: {}", path.display());
    let (config, hash) = load_config_with_hash(path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);
    Ok(config)
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("meeting_media=info,warn"),
            1 => EnvFilter::new("meeting_media=debug,info"),
            2 => EnvFilter::new("meeting_media=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
