mod cli;
mod config;
mod dock;
mod icon;
mod logging;
mod magnify;
mod pointer;
mod range;
mod render;
mod types;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;

use crate::cli::{Cli, Command};
use crate::dock::run_dock;
use crate::icon::IconCache;
use crate::magnify::DockLayout;
use crate::render::{DockScene, render_to_pixmap};

#[derive(Serialize)]
struct SizeReport<'a> {
    width: f32,
    pointer: Option<f32>,
    max_icon_size: f32,
    ideal: f32,
    icons: Vec<IconSize<'a>>,
}

#[derive(Serialize)]
struct IconSize<'a> {
    name: &'a str,
    center: f32,
    size: f32,
}

fn main() -> Result<()> {
    logging::init();
    let cli = Cli::parse();

    match cli.command {
        Command::Run { dock } => {
            let config = dock.load_config()?;
            run_dock(&config)?;
        }
        Command::Sizes {
            dock,
            width,
            pointer,
        } => {
            let config = dock.load_config()?;
            let layout = DockLayout::from_config(&config);
            let report = SizeReport {
                width,
                pointer,
                max_icon_size: layout.max_icon_size(),
                ideal: layout.ideal_size(width),
                icons: config
                    .icons
                    .iter()
                    .zip(layout.icon_sizes(width, pointer))
                    .enumerate()
                    .map(|(index, (name, size))| IconSize {
                        name,
                        center: layout.icon_center(index, width),
                        size,
                    })
                    .collect(),
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Preview {
            dock,
            width,
            pointer,
            output,
        } => {
            let config = dock.load_config()?;
            let layout = DockLayout::from_config(&config);
            let mut icon_cache = IconCache::new(layout.magnified_max_size().ceil() as u32);
            let icons = icon_cache.dock_icons(&config.icons)?;
            let scene = DockScene {
                layout: &layout,
                icons: &icons,
                corner_radius: config.corner_radius,
            };
            let pixmap = render_to_pixmap(&scene, width, pointer)?;
            pixmap
                .save_png(&output)
                .with_context(|| format!("write {}", output.display()))?;
            tracing::info!("wrote preview to {}", output.display());
        }
    }
    Ok(())
}
