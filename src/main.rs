//! Command line front end: `pack` a site into one HTML file, or `extract` one again.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Error};
use clap::{Parser, Subcommand};
use log::LevelFilter;
use simple_logger::SimpleLogger;

use offline_html_bundler::{
  BundleConfig, DefaultMimeResolver, Extractor, PackOptions, Packager, RuntimeAssets,
};

#[derive(Parser, Debug)]
#[command(version, about)]
struct Arguments {
  /// Increase log output. Repeat for more detail; `RUST_LOG` takes precedence.
  #[arg(short, long, action = clap::ArgAction::Count, global = true)]
  verbose: u8,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Bundle an HTML entry document and every file next to it into one document.
  Pack {
    /// Entry HTML document. Its directory is packaged recursively.
    input: PathBuf,

    /// Output path. Defaults to the entry name with the configured prefix.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// JavaScript appended to the script injected into every `<head>`.
    #[arg(long, default_value = "")]
    append_pre: String,

    /// JavaScript appended to the script injected into every `<body>`.
    #[arg(long, default_value = "")]
    append_post: String,

    /// Directory with replacement runtime files (`main.js`, `pako.min.js`, ...).
    #[arg(long)]
    runtime_dir: Option<PathBuf>,

    /// Configuration file. Defaults to the one found next to the entry document.
    #[arg(long)]
    config: Option<PathBuf>,
  },
  /// Write the files embedded in a packaged document back to disk.
  Extract {
    /// Packaged HTML document.
    input: PathBuf,

    /// Destination directory.
    #[arg(short, long, default_value = ".")]
    output: PathBuf,

    /// Configuration file. Defaults to the one found next to the document.
    #[arg(long)]
    config: Option<PathBuf>,
  },
}

fn main() -> ExitCode {
  let arguments = Arguments::parse();
  init_logging(arguments.verbose);

  match run(arguments.command) {
    Ok(()) => ExitCode::SUCCESS,
    Err(err) => {
      log::error!("{err:#}");
      eprintln!("error: {err:#}");
      ExitCode::FAILURE
    }
  }
}

fn init_logging(verbose: u8) {
  let level = match verbose {
    0 => LevelFilter::Info,
    1 => LevelFilter::Debug,
    _ => LevelFilter::Trace,
  };
  if let Err(err) = SimpleLogger::new().with_level(level).env().init() {
    eprintln!("logging disabled: {err}");
  }
}

fn run(command: Command) -> Result<(), Error> {
  match command {
    Command::Pack {
      input,
      output,
      append_pre,
      append_post,
      runtime_dir,
      config,
    } => {
      let config = load_config(config.as_deref(), &input)?;
      let runtime = match runtime_dir {
        Some(dir) => RuntimeAssets::from_dir(&dir)
          .with_context(|| format!("loading runtime files from {}", dir.display()))?,
        None => RuntimeAssets::default(),
      };
      let options = PackOptions {
        output,
        append_pre,
        append_post,
      };

      Packager::new(&config, &runtime, &DefaultMimeResolver)
        .pack(&input, &options)
        .with_context(|| format!("packaging {}", input.display()))?;
    }
    Command::Extract {
      input,
      output,
      config,
    } => {
      let config = load_config(config.as_deref(), &input)?;
      Extractor::new(&config)
        .extract(&input, &output)
        .with_context(|| format!("extracting {}", input.display()))?;
    }
  }
  Ok(())
}

fn load_config(explicit: Option<&Path>, input: &Path) -> Result<BundleConfig, Error> {
  match explicit {
    Some(path) => BundleConfig::from_path(path)
      .with_context(|| format!("reading configuration {}", path.display())),
    None => {
      let dir = input
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
      Ok(BundleConfig::discover(dir))
    }
  }
}
