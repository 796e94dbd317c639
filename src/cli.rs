use crate::backend::interface::{Backend, NewEdgeCase};
use crate::config::{live_stream_url_for, Config};
use crate::overlay_app::core::Event;
use crate::overlay_app::render::answer_lines;
use std::path::Path;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

type Error = Box<dyn std::error::Error + Send + Sync>;

#[derive(Parser, Debug)]
#[command(author, version, about = "Frame-synchronized detection overlay")]
pub struct Cli {
    /// Base URL of the detection service.
    #[arg(long, global = true)]
    pub api: Option<String>,

    /// Live stream endpoint; derived from `--api` when omitted.
    #[arg(long, global = true)]
    pub ws: Option<String>,

    #[arg(long, value_enum, default_value_t = DisplayKind::Console, global = true)]
    pub display: DisplayKind,

    /// Use the in-process backend instead of the HTTP service.
    #[arg(long, global = true)]
    pub fake_backend: bool,

    /// Stream this still image instead of the synthetic camera.
    #[arg(long, global = true)]
    pub camera_image: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DisplayKind {
    Console,
    Gui,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Detect objects in a still image.
    Image { path: PathBuf },
    /// Analyze a video and replay it with its annotations.
    Video { path: PathBuf },
    /// Stream camera frames and draw detections as they arrive.
    Live,
    /// Open the dashboard with no source loaded.
    Watch,
    /// Ask the safety assistant, about an image when one is given.
    Chat {
        #[arg(required = true)]
        question: Vec<String>,
        #[arg(long)]
        image: Option<PathBuf>,
    },
    /// Falcon-Link self-healing service.
    Falcon {
        #[command(subcommand)]
        command: FalconCommand,
    },
}

#[derive(Subcommand, Debug)]
pub enum FalconCommand {
    Status,
    /// List generated synthetic images.
    Images,
    EdgeCases,
    AddEdgeCase {
        #[arg(long)]
        scenario: String,
        #[arg(long)]
        object_class: String,
        #[arg(long, default_value = "")]
        description: String,
    },
    ResolveEdgeCase {
        id: String,
        #[arg(long, default_value_t = 0.0)]
        improvement: f64,
    },
    /// Generate synthetic training images for one class.
    Generate {
        object_class: String,
        #[arg(long, default_value_t = 10)]
        count: u32,
    },
    /// Heal one class right away.
    Heal { object_class: String },
}

impl Cli {
    pub fn apply(&self, config: &mut Config) {
        if let Some(api) = &self.api {
            config.api_base_url = api.trim_end_matches('/').to_string();
            config.live_stream_url = live_stream_url_for(api);
        }
        if let Some(ws) = &self.ws {
            config.live_stream_url = ws.clone();
        }
    }
}

impl Command {
    /// Event that opens the requested source, if any.
    pub fn initial_event(&self) -> Option<Event> {
        match self {
            Command::Image { path } => Some(Event::LoadImage(path.clone())),
            Command::Video { path } => Some(Event::LoadVideo(path.clone())),
            Command::Live => Some(Event::StartLiveStream),
            Command::Watch | Command::Chat { .. } | Command::Falcon { .. } => None,
        }
    }
}

/// Asks one question and returns the answer lines to print.
pub fn run_chat(
    backend: &dyn Backend,
    question: &[String],
    image: Option<&Path>,
) -> Result<Vec<String>, Error> {
    let question = question.join(" ");
    let answer = match image {
        Some(path) => {
            let bytes = std::fs::read(path)?;
            let file_name = path
                .file_name()
                .map(|name| name.to_string_lossy().to_string())
                .unwrap_or_else(|| "upload".to_string());
            backend.chat_query(&file_name, bytes, &question)?
        }
        None => backend.chat_quick(&question)?,
    };
    Ok(answer_lines(&answer))
}

/// Runs a one-shot service command and returns the lines to print.
pub fn run_falcon(backend: &dyn Backend, command: &FalconCommand) -> Result<Vec<String>, Error> {
    let lines = match command {
        FalconCommand::Status => {
            let status = backend.falcon_status()?;
            vec![
                format!("triggers:          {}", status.total_triggers),
                format!("synthetic images:  {}", status.synthetic_images_generated),
                format!("avg improvement:   {:.1}%", status.avg_improvement),
                format!(
                    "edge cases:        {}/{} resolved",
                    status.cases_resolved, status.total_cases
                ),
            ]
        }
        FalconCommand::Images => backend
            .synthetic_images()?
            .iter()
            .map(|image| {
                format!(
                    "{}  {:<18} {:<12} {:.2}",
                    image.id, image.object_class, image.variation, image.quality_score
                )
            })
            .collect(),
        FalconCommand::EdgeCases => backend
            .edge_cases()?
            .iter()
            .map(|case| {
                format!(
                    "{}  [{}] {} / {}: {} (+{:.1}%)",
                    case.id,
                    case.status,
                    case.scenario,
                    case.object_class,
                    case.description,
                    case.improvement
                )
            })
            .collect(),
        FalconCommand::AddEdgeCase {
            scenario,
            object_class,
            description,
        } => {
            let case = backend.add_edge_case(&NewEdgeCase {
                scenario: scenario.clone(),
                object_class: object_class.clone(),
                description: description.clone(),
            })?;
            vec![format!("added edge case {}", case.id)]
        }
        FalconCommand::ResolveEdgeCase { id, improvement } => {
            backend.resolve_edge_case(id, *improvement)?;
            vec![format!("resolved edge case {}", id)]
        }
        FalconCommand::Generate {
            object_class,
            count,
        } => {
            let generated = backend.generate_synthetic(object_class, *count)?;
            vec![format!("generated {} images of {}", generated, object_class)]
        }
        FalconCommand::Heal { object_class } => {
            let result = backend.run_healing(object_class)?;
            vec![format!(
                "{} healed: {} synthetic images, +{:.1}%",
                object_class, result.synthetic_images_generated, result.improvement_percent
            )]
        }
    };
    Ok(lines)
}
