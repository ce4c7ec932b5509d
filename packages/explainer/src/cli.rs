use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;

use crate::explainer::Explainer;
use crate::machine::Cursor;
use crate::overlay::Overlay;
use crate::positioner::Viewport;
use crate::scene_graph::{SceneGraph, SceneGraphAdapter};
use crate::story::Story;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a sequence of scroll offsets and print each frame's state
    Simulate {
        /// Story JSON file (defaults to the built-in story)
        #[arg(long)]
        story: Option<PathBuf>,

        /// Viewport width
        #[arg(long, default_value_t = 1280.0)]
        width: f32,

        /// Viewport height
        #[arg(long, default_value_t = 800.0)]
        height: f32,

        /// Frames per second
        #[arg(long, default_value_t = 60.0)]
        fps: f32,

        /// Scroll offsets in pixels, one per frame
        #[arg(required = true, allow_negative_numbers = true)]
        offsets: Vec<f32>,
    },

    /// Check a story file's registry and scene table
    Validate {
        /// Story JSON file
        story: PathBuf,
    },

    /// Print the built-in story as JSON
    DumpStory,
}

/// One simulated frame, printed as a JSON line.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FrameReport<'a> {
    frame: usize,
    time_ms: f64,
    offset: f32,
    cursor: Cursor,
    camera_position: [f32; 3],
    overlay: &'a Overlay,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Simulate { story, width, height, fps, offsets } => {
            let story = load_story(story.as_deref())?;
            simulate(story, Viewport::new(width, height), fps, &offsets)?;
        }
        Commands::Validate { story } => {
            let story = load_story(Some(story.as_path()))?;
            let unknown = story.unknown_references();
            for id in &unknown {
                log::warn!("Story references undefined object '{}'", id);
            }
            println!(
                "OK: {} objects, {} scenes, {} undefined reference(s)",
                story.objects.len(),
                story.scenes.len(),
                unknown.len()
            );
        }
        Commands::DumpStory => {
            println!("{}", Story::builtin().to_json_pretty()?);
        }
    }
    Ok(())
}

fn load_story(path: Option<&Path>) -> Result<Story> {
    match path {
        Some(path) => Story::from_file(path)
            .with_context(|| format!("Failed to load story {:?}", path)),
        None => Ok(Story::builtin()),
    }
}

fn simulate(story: Story, viewport: Viewport, fps: f32, offsets: &[f32]) -> Result<()> {
    if fps <= 0.0 {
        anyhow::bail!("FPS must be positive");
    }
    let frame_ms = 1000.0 / fps as f64;
    let mut explainer = Explainer::new(story, SceneGraph::new(), viewport);

    for (frame, &offset) in offsets.iter().enumerate() {
        let time_ms = frame as f64 * frame_ms;
        explainer.on_scroll(offset, viewport.height);
        explainer.on_frame(time_ms);

        let report = FrameReport {
            frame,
            time_ms,
            offset,
            cursor: explainer.cursor(),
            camera_position: explainer.adapter().camera().position.to_array(),
            overlay: explainer.overlay(),
        };
        println!("{}", serde_json::to_string(&report)?);
    }

    log::info!(
        "Simulated {} frames, ended at scene {} state {}",
        offsets.len(),
        explainer.cursor().scene,
        explainer.cursor().state
    );
    Ok(())
}
