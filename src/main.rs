use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result, anyhow, bail};
use camino::{Utf8Path, Utf8PathBuf};
use clap::{Parser, Subcommand};
use log::{info, warn};

use esignflow::capture::{CaptureInput, Interaction};
use esignflow::model::BlockType;
use esignflow::navigation::order;
use esignflow::registry::{BlockRegistry, RegistryConfig};
use esignflow::submit::{MockSigningChannel, SvgSignatureRenderer};
use esignflow::template::{
    FsSource, SourceTemplateProvider, TemplateConfig, TemplateConfigProvider, ZipSource,
};
use esignflow::{SessionConfig, SessionData, SessionEvent, SigningSession, completion};

#[derive(Parser, Debug)]
#[command(author, version, about = "Inspect signature templates and run typed signing sessions", long_about = None)]
struct Cli {
    /// Log debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the blocks, navigation order and progress for a template
    Inspect {
        /// Template directory, .zip bundle or single .json file
        #[arg(value_name = "TEMPLATE_SOURCE")]
        source: Utf8PathBuf,
        /// Template to load (defaults to the file stem for .json sources)
        #[arg(long)]
        template_id: Option<String>,
        /// Only list the template ids available in the source
        #[arg(long)]
        list: bool,
    },
    /// Sign every block of a session and submit it to the mock signing endpoint
    Sign {
        /// Session data JSON (token, template/document ids, signer)
        #[arg(value_name = "SESSION_FILE")]
        session: Utf8PathBuf,
        /// Template directory, .zip bundle or single .json file
        #[arg(long)]
        templates: Utf8PathBuf,
        /// Text typed into signature blocks
        #[arg(long)]
        signature: String,
        /// Text typed into initial blocks
        #[arg(long)]
        initials: Option<String>,
        /// Values for other block types, as TYPE=TEXT
        #[arg(long = "value", value_name = "TYPE=TEXT")]
        values: Vec<String>,
        /// Prompt for every block instead of applying a value to all blocks of its type
        #[arg(long)]
        no_apply_all: bool,
        /// Make the mock endpoint reject the request with this message
        #[arg(long)]
        fail: Option<String>,
    },
}

/// Template provider over whichever kind of source was given on the command line.
enum CliTemplates {
    Dir(SourceTemplateProvider<FsSource>),
    Zip(SourceTemplateProvider<ZipSource<BufReader<File>>>),
}

impl CliTemplates {
    /// Open `path`; for a single `.json` file also return its stem as the default id.
    fn open(path: &Utf8Path) -> Result<(Self, Option<String>)> {
        match path.extension() {
            Some("zip") => {
                let file = File::open(path).with_context(|| format!("Open {}", path))?;
                let source = ZipSource::new(BufReader::new(file))?;
                Ok((
                    CliTemplates::Zip(SourceTemplateProvider::new("templates", source)),
                    None,
                ))
            }
            Some("json") => {
                let root = path.parent().unwrap_or(Utf8Path::new("")).to_path_buf();
                let stem = path.file_stem().map(str::to_string);
                Ok((CliTemplates::Dir(SourceTemplateProvider::new(root, FsSource)), stem))
            }
            _ if path.is_dir() => Ok((
                CliTemplates::Dir(SourceTemplateProvider::new(path, FsSource)),
                None,
            )),
            _ => bail!("Unsupported template source {}", path),
        }
    }

    fn template_ids(&mut self) -> Result<Vec<String>> {
        match self {
            CliTemplates::Dir(p) => p.template_ids(),
            CliTemplates::Zip(p) => p.template_ids(),
        }
    }
}

impl TemplateConfigProvider for CliTemplates {
    fn fetch(&mut self, template_id: &str) -> Result<TemplateConfig> {
        match self {
            CliTemplates::Dir(p) => p.fetch(template_id),
            CliTemplates::Zip(p) => p.fetch(template_id),
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match cli.command {
        Command::Inspect {
            source,
            template_id,
            list,
        } => inspect(&source, template_id, list),
        Command::Sign {
            session,
            templates,
            signature,
            initials,
            values,
            no_apply_all,
            fail,
        } => {
            let mut texts = BTreeMap::new();
            texts.insert(BlockType::Signature, signature);
            if let Some(i) = initials {
                texts.insert(BlockType::Initial, i);
            }
            for v in &values {
                let (t, text) = v
                    .split_once('=')
                    .ok_or_else(|| anyhow!("Expected TYPE=TEXT, got {}", v))?;
                texts.insert(BlockType::from(t), text.to_string());
            }
            sign(&session, &templates, &texts, !no_apply_all, fail)
        }
    }
}

fn inspect(source: &Utf8Path, template_id: Option<String>, list: bool) -> Result<()> {
    let (mut templates, default_id) = CliTemplates::open(source)?;
    if list {
        let ids = templates.template_ids()?;
        println!("{}", serde_json::to_string_pretty(&ids)?);
        return Ok(());
    }
    let id = template_id
        .or(default_id)
        .ok_or_else(|| anyhow!("--template-id is required for {}", source))?;
    let registry = BlockRegistry::build(templates.fetch(&id), None, &RegistryConfig::default());
    let ordered: Vec<&str> = order(registry.blocks())
        .into_iter()
        .map(|i| registry.blocks()[i].id())
        .collect();
    let report = serde_json::json!({
        "templateId": id,
        "source": registry.source(),
        "blocks": registry.views(),
        "order": ordered,
        "progress": completion::summary(registry.blocks()),
        "progressByType": completion::progress_by_type(registry.blocks()),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn sign(
    session_path: &Utf8Path,
    templates_path: &Utf8Path,
    texts: &BTreeMap<BlockType, String>,
    apply_all: bool,
    fail: Option<String>,
) -> Result<()> {
    let text = std::fs::read_to_string(session_path)
        .with_context(|| format!("Failed to read {}", session_path))?;
    let data: SessionData = serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse session data {}", session_path))?;
    let (mut templates, _) = CliTemplates::open(templates_path)?;

    let mut session = SigningSession::start(data, &mut templates, &SessionConfig::default())?;
    let events: Arc<Mutex<Vec<SessionEvent>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    session.subscribe(Arc::new(move |e: &SessionEvent| {
        if let Ok(mut v) = sink.lock() {
            v.push(e.clone());
        }
    }));

    let ids = session.navigation().ordered_ids().to_vec();
    for (pos, id) in ids.iter().enumerate() {
        session.go_to(pos);
        match session.interact(id)? {
            Interaction::Prompted(request) => match texts.get(&request.block_type) {
                Some(value) => {
                    let mut input = CaptureInput::new(value.as_str()).with_consent();
                    if apply_all {
                        input = input.apply_to_all();
                    }
                    session.confirm(&input)?;
                }
                None => {
                    warn!("No value given for {} blocks, leaving {} empty", request.block_type, id);
                    session.cancel()?;
                }
            },
            Interaction::AutoApplied { .. } | Interaction::AlreadyCompleted { .. } => {}
        }
    }

    let summary = session.summary();
    info!(
        "{}/{} blocks signed, {} remaining",
        summary.completed, summary.total, summary.remaining
    );

    let renderer = SvgSignatureRenderer::default();
    let mut channel = match fail {
        Some(msg) => MockSigningChannel::failing(msg),
        None => MockSigningChannel::new(),
    };
    let result = session.submit(&mut channel, &renderer);

    let recorded = events.lock().map(|v| v.clone()).unwrap_or_default();
    let report = serde_json::json!({
        "blocks": session.views(),
        "progress": summary,
        "payload": session.payload(&renderer)?,
        "receipt": session.receipt(),
        "events": recorded,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    result.map(|_| ()).map_err(Into::into)
}
