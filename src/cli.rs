use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::DockConfig;

/// A bottom dock whose icons magnify under the pointer
#[derive(Parser, Debug)]
#[command(name = "magdock", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show the dock on the current Wayland session
    Run {
        #[command(flatten)]
        dock: DockArgs,
    },
    /// Print per-icon sizes as JSON
    Sizes {
        #[command(flatten)]
        dock: DockArgs,
        /// Container width in logical pixels
        #[arg(long)]
        width: f32,
        /// Pointer x-coordinate inside the container; omit for no pointer
        #[arg(long, allow_negative_numbers = true)]
        pointer: Option<f32>,
    },
    /// Render a single frame to a PNG file
    Preview {
        #[command(flatten)]
        dock: DockArgs,
        #[arg(long)]
        width: u32,
        #[arg(long, allow_negative_numbers = true)]
        pointer: Option<f32>,
        #[arg(short, long, value_name = "PNG")]
        output: PathBuf,
    },
}

/// Overrides applied on top of the config file
#[derive(Args, Debug, Default)]
pub struct DockArgs {
    /// Config file (defaults to $XDG_CONFIG_HOME/magdock/config.json)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
    /// Comma-separated icon identifiers
    #[arg(long, value_delimiter = ',')]
    pub icons: Option<Vec<String>>,
    #[arg(long)]
    pub spacing: Option<f32>,
    /// Dock bar height; padding and resting icon size derive from it
    #[arg(long)]
    pub height: Option<f32>,
}

impl DockArgs {
    /// File (or defaults), then flags, then validation of the merged result.
    pub fn load_config(&self) -> Result<DockConfig> {
        let mut config = DockConfig::load(self.config.as_deref())?;
        self.apply(&mut config);
        config.validate().context("invalid dock options")?;
        Ok(config)
    }

    pub fn apply(&self, config: &mut DockConfig) {
        if let Some(icons) = &self.icons {
            config.icons = icons.clone();
        }
        if let Some(spacing) = self.spacing {
            config.spacing = spacing;
        }
        if let Some(height) = self.height {
            config.dock_height = height;
        }
    }
}
