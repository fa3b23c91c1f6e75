// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
mod audio;
mod config;
mod envelope;
mod notes;
mod patch;
mod pipeline;
mod prefix;
mod stats;
#[cfg(test)]
mod testutil;
mod util;
mod zones;

use std::error::Error;
use std::path::PathBuf;
use std::process;

use clap::{crate_authors, crate_version, Parser};
use tracing_subscriber::EnvFilter;

use crate::audio::SymphoniaFrameCounter;
use crate::config::{ConfigError, Overrides, Settings};
use crate::patch::Template;
use crate::pipeline::Pipeline;

#[derive(Parser)]
#[clap(
    author = crate_authors!(),
    version = crate_version!(),
    about = "Builds multisample synth patches from folders of samples."
)]
struct Cli {
    /// The folder under the root holding one subfolder of samples per patch.
    processing_folder: String,
    /// The folder under the device's sample root the samples will be copied to.
    target_folder: String,
    /// A YAML settings file.
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// The root folder. Overrides the settings file.
    #[arg(short, long)]
    root: Option<PathBuf>,
    /// The patch template. Overrides the settings file.
    #[arg(short, long)]
    template: Option<PathBuf>,
    /// Folders must score strictly above this length bucket to get a patch.
    #[arg(long)]
    min_bucket: Option<u64>,
    /// Deletes the source folder of every skipped patch.
    #[arg(long)]
    delete_skipped: bool,
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let settings = Settings::load(
        cli.config.as_deref(),
        &Overrides {
            root: cli.root,
            template: cli.template,
            min_bucket: cli.min_bucket,
            delete_skipped: cli.delete_skipped,
        },
    )?;

    let processing_dir = match settings.processing_dir(&cli.processing_folder) {
        Ok(dir) => dir,
        Err(ConfigError::MissingProcessingFolder {
            name,
            root,
            siblings,
        }) => {
            eprintln!(
                "Processing folder '{}' does not exist in {}.",
                name,
                root.display()
            );
            if siblings.is_empty() {
                eprintln!("No folders found there.");
            } else {
                eprintln!("Valid folders:");
                for sibling in siblings {
                    eprintln!("- {}", sibling);
                }
            }
            process::exit(1);
        }
        Err(e) => return Err(e.into()),
    };

    let template = match settings.template() {
        Some(path) => Template::load(path)?,
        None => Template::builtin()?,
    };

    let pipeline = Pipeline::new(
        &settings,
        &template,
        &SymphoniaFrameCounter,
        &cli.target_folder,
    );
    let stats = pipeline.run(&processing_dir)?;

    println!("{}", stats);
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli() {
        Cli::command().debug_assert();

        let cli = Cli::try_parse_from(["keysplit", "Kit", "Keys", "--min-bucket", "2"]).unwrap();
        assert_eq!(cli.processing_folder, "Kit");
        assert_eq!(cli.target_folder, "Keys");
        assert_eq!(cli.min_bucket, Some(2));
        assert!(!cli.delete_skipped);

        assert!(Cli::try_parse_from(["keysplit", "Kit"]).is_err());
        assert!(Cli::try_parse_from(["keysplit"]).is_err());
    }

    #[test]
    fn test_cli_author_comes_from_the_manifest() {
        let command = Cli::command();
        assert_eq!(command.get_author(), Some("Michael Wilson <mike@mdwn.dev>"));
        assert_eq!(command.get_author(), Some(env!("CARGO_PKG_AUTHORS")));
    }
}
