use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use cover_contracts::chat::{chat_help_lines, parse_intent, Intent};
use cover_contracts::events::EventWriter;
use cover_contracts::models::ModelSelector;
use cover_contracts::SessionError;
use cover_engine::{plan_gateway, GatewayPlan, Orchestrator, Session};
use serde_json::json;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "cover-rs", version, about = "Blog cover image generator")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Interactive session: produce a cover, then refine it turn by turn.
    Chat(ChatArgs),
    /// Produce one cover, apply edits in order, export the result.
    Run(RunArgs),
}

#[derive(Debug, Args)]
struct ModelArgs {
    #[arg(long)]
    text_model: Option<String>,
    #[arg(long)]
    image_model: Option<String>,
}

#[derive(Debug, Parser)]
struct ChatArgs {
    #[arg(long)]
    out: PathBuf,
    #[arg(long)]
    events: Option<PathBuf>,
    #[command(flatten)]
    models: ModelArgs,
}

#[derive(Debug, Parser)]
struct RunArgs {
    #[arg(long, default_value = "")]
    title: String,
    #[arg(long, conflicts_with = "body_file")]
    body: Option<String>,
    #[arg(long)]
    body_file: Option<PathBuf>,
    /// Edit command applied to the latest image; repeatable.
    #[arg(long = "edit")]
    edits: Vec<String>,
    #[arg(long)]
    out: PathBuf,
    #[arg(long)]
    events: Option<PathBuf>,
    #[command(flatten)]
    models: ModelArgs,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    init_tracing();
    match run().await {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("cover-rs error: {err:#}");
            std::process::exit(1);
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

async fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Chat(args) => {
            run_chat(args).await?;
            Ok(0)
        }
        Command::Run(args) => run_once(args).await,
    }
}

fn open_events(out: &Path, events: Option<PathBuf>, session: &Session) -> Result<EventWriter> {
    fs::create_dir_all(out).with_context(|| format!("failed to create {}", out.display()))?;
    let path = events.unwrap_or_else(|| out.join("events.jsonl"));
    Ok(EventWriter::new(path, session.session_id()))
}

async fn run_chat(args: ChatArgs) -> Result<()> {
    let session = Session::new();
    let events = open_events(&args.out, args.events, &session)?;
    let mut chat = ChatContext::new(
        session,
        ModelSelector::new(None),
        args.models,
        events,
        args.out,
    )?;
    for line in chat.banner() {
        println!("{line}");
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        for output in chat.handle_line(&line).await {
            println!("{output}");
        }
    }
    Ok(())
}

async fn run_once(args: RunArgs) -> Result<i32> {
    let mut session = Session::new();
    let events = open_events(&args.out, args.events, &session)?;
    let plan = plan_gateway(
        &ModelSelector::new(None),
        args.models.text_model.as_deref(),
        args.models.image_model.as_deref(),
    )?;
    for note in &plan.notes {
        eprintln!("{note}");
    }
    tracing::info!(
        provider = %plan.provider,
        edits = args.edits.len(),
        "starting one-shot run"
    );
    let orchestrator = Orchestrator::new(plan.build()?, events);
    orchestrator.start(&session);

    let body = match (&args.body, &args.body_file) {
        (_, Some(path)) => fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        (Some(body), None) => body.clone(),
        (None, None) => String::new(),
    };
    session.set_title(args.title.as_str());
    session.set_body(body);

    orchestrator.produce(&mut session).await?;
    for edit in &args.edits {
        session.set_pending_command(edit.as_str());
        orchestrator.refine(&mut session, edit).await?;
    }
    let exported = orchestrator.export_current(&session, &args.out)?;

    let summary = json!({
        "image": exported.to_string_lossy(),
        "prompt": session.last_prompt(),
        "artifacts": session.history().len(),
        "text_model": plan.text_model.name,
        "image_model": plan.image_model.name,
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(0)
}

/// One interactive session plus the gateway it talks to.
struct ChatContext {
    session: Session,
    orchestrator: Orchestrator,
    selector: ModelSelector,
    models: ModelArgs,
    plan: GatewayPlan,
    out_dir: PathBuf,
    confirm_reset: bool,
}

impl ChatContext {
    fn new(
        session: Session,
        selector: ModelSelector,
        models: ModelArgs,
        events: EventWriter,
        out_dir: PathBuf,
    ) -> Result<Self> {
        let plan = plan_gateway(
            &selector,
            models.text_model.as_deref(),
            models.image_model.as_deref(),
        )?;
        let orchestrator = Orchestrator::new(plan.build()?, events);
        orchestrator.start(&session);
        Ok(Self {
            session,
            orchestrator,
            selector,
            models,
            plan,
            out_dir,
            confirm_reset: false,
        })
    }

    fn banner(&self) -> Vec<String> {
        let mut lines = vec!["Cover chat started. Type /help for commands.".to_string()];
        lines.extend(self.plan.notes.iter().cloned());
        lines
    }

    async fn handle_line(&mut self, line: &str) -> Vec<String> {
        if self.confirm_reset {
            self.confirm_reset = false;
            let answer = line.trim().to_ascii_lowercase();
            if answer == "y" || answer == "yes" {
                self.orchestrator.reset(&mut self.session);
                return vec!["Session reset.".to_string()];
            }
            return vec!["Reset cancelled.".to_string()];
        }

        match parse_intent(line) {
            Intent::Noop => Vec::new(),
            Intent::Help => chat_help_lines()
                .into_iter()
                .map(str::to_string)
                .collect(),
            Intent::SetTitle(title) => {
                self.session.set_title(title);
                vec![format!("Title set to \"{}\"", self.session.title())]
            }
            Intent::SetBody(body) => {
                self.session.set_body(body);
                vec![format!("Body set ({} chars)", self.session.body().chars().count())]
            }
            Intent::LoadBody { path } => {
                if path.is_empty() {
                    return vec!["/body_file requires a path".to_string()];
                }
                match fs::read_to_string(&path) {
                    Ok(body) => {
                        self.session.set_body(body);
                        vec![format!(
                            "Loaded body from {path} ({} chars)",
                            self.session.body().chars().count()
                        )]
                    }
                    Err(err) => vec![format!("Could not read {path}: {err}")],
                }
            }
            Intent::Produce => self.produce().await,
            Intent::Refine(command) => self.refine(&command).await,
            Intent::Text(text) => {
                if self.session.current().is_some() {
                    self.refine(&text).await
                } else {
                    self.session.set_title(text);
                    vec![format!("Title set to \"{}\"", self.session.title())]
                }
            }
            Intent::Restore { index: None } => vec!["Usage: /restore <index>".to_string()],
            Intent::Restore { index: Some(index) } => {
                match self.orchestrator.restore(&mut self.session, index) {
                    Ok(()) => vec![format!("Restored image #{index}")],
                    Err(err) => vec![err.to_string()],
                }
            }
            Intent::History => self.history_lines(),
            Intent::Status => self.status_lines(),
            Intent::Export { path } => {
                let target = path.map(PathBuf::from).unwrap_or_else(|| self.out_dir.clone());
                match self.orchestrator.export_current(&self.session, &target) {
                    Ok(path) => vec![format!("Exported to {}", path.display())],
                    Err(err) => vec![format!("Export failed: {err:#}")],
                }
            }
            Intent::Reset => {
                if self.session.has_unsaved_input() {
                    self.confirm_reset = true;
                    return vec!["Discard the title, body and image history? [y/N]".to_string()];
                }
                self.orchestrator.reset(&mut self.session);
                vec!["Session reset.".to_string()]
            }
            Intent::SetTextModel(model) => {
                self.switch_models(ModelArgs {
                    text_model: Some(model),
                    image_model: self.models.image_model.clone(),
                })
            }
            Intent::SetImageModel(model) => {
                self.switch_models(ModelArgs {
                    text_model: self.models.text_model.clone(),
                    image_model: Some(model),
                })
            }
            Intent::Unknown { command, .. } => {
                vec![format!("Unknown command /{command}. Type /help for commands.")]
            }
        }
    }

    async fn produce(&mut self) -> Vec<String> {
        match self.orchestrator.produce(&mut self.session).await {
            Ok(index) => {
                let mut lines = Vec::new();
                if let Some(prompt) = self.session.last_prompt() {
                    lines.push(format!("Prompt: {prompt}"));
                }
                lines.push(format!("Generated image #{index}"));
                lines
            }
            Err(err) => vec![failure_line(&err)],
        }
    }

    async fn refine(&mut self, command: &str) -> Vec<String> {
        let base = self.session.history().selected();
        self.session.set_pending_command(command);
        match self.orchestrator.refine(&mut self.session, command).await {
            Ok(index) => match base {
                Some(base) => vec![format!("Edited image #{base} into #{index}")],
                None => vec![format!("Edited image #{index}")],
            },
            Err(err) => vec![failure_line(&err)],
        }
    }

    fn switch_models(&mut self, models: ModelArgs) -> Vec<String> {
        let plan = match plan_gateway(
            &self.selector,
            models.text_model.as_deref(),
            models.image_model.as_deref(),
        ) {
            Ok(plan) => plan,
            Err(err) => return vec![format!("Model change failed: {err:#}")],
        };
        let gateway = match plan.build() {
            Ok(gateway) => gateway,
            Err(err) => return vec![format!("Model change failed: {err:#}")],
        };
        self.orchestrator.set_gateway(gateway);
        self.models = models;
        let mut lines = plan.notes.clone();
        lines.push(format!(
            "Models: text {} / image {} ({})",
            plan.text_model.name, plan.image_model.name, plan.provider
        ));
        self.plan = plan;
        lines
    }

    fn history_lines(&self) -> Vec<String> {
        let history = self.session.history();
        if history.is_empty() {
            return vec!["No images yet.".to_string()];
        }
        history
            .newest_first()
            .map(|(index, artifact)| {
                let marker = if history.selected() == Some(index) { "*" } else { " " };
                format!("{marker} #{index} {}", artifact.label())
            })
            .collect()
    }

    fn status_lines(&self) -> Vec<String> {
        let session = &self.session;
        let mut lines = vec![
            format!("Phase: {}", session.phase()),
            format!(
                "Models: text {} / image {} ({})",
                self.plan.text_model.name, self.plan.image_model.name, self.plan.provider
            ),
            format!("Title: {}", session.title()),
            format!("Body: {} chars", session.body().chars().count()),
        ];
        match session.history().selected() {
            Some(index) => lines.push(format!(
                "Images: {} (showing #{index})",
                session.history().len()
            )),
            None => lines.push("Images: 0".to_string()),
        }
        if let Some(prompt) = session.last_prompt() {
            lines.push(format!("Last prompt: {prompt}"));
        }
        if let Some(error) = session.error_message() {
            lines.push(format!("Error: {error}"));
        }
        lines
    }
}

fn failure_line(err: &SessionError) -> String {
    match err {
        SessionError::Gateway(inner) => format!("Request failed: {inner}"),
        other => other.to_string(),
    }
}
