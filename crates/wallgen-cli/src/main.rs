use std::fs;
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use serde_json::{json, Value};
use wallgen_contracts::chat::{parse_intent, CHAT_HELP_COMMANDS};
use wallgen_contracts::events::{event_payload, EventWriter};
use wallgen_contracts::messages::Locale;
use wallgen_contracts::models::GeneratedImage;
use wallgen_contracts::prompt::{exceeds_soft_limit, strip_wallpaper_template, PROMPT_SOFT_MAX_CHARS};
use wallgen_engine::config::GenerationConfig;
use wallgen_engine::export::{export_gallery_html, save_image};
use wallgen_engine::{
    default_provider_registry, CredentialStore, IgnoreReason, StoreCredentialHost, Studio,
    SubmitOutcome, WallpaperGenerator,
};

#[derive(Debug, Parser)]
#[command(name = "wallgen", version, about = "Generate vertical phone wallpapers from a mood")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Interactive session: type a mood, get four wallpapers.
    Chat(ChatArgs),
    /// Generate one batch and write the images to disk.
    Generate(GenerateArgs),
}

#[derive(Debug, Clone, Args)]
struct SessionArgs {
    #[arg(long)]
    events: Option<PathBuf>,
    #[arg(long)]
    provider: Option<String>,
    #[arg(long)]
    model: Option<String>,
    #[arg(long, value_parser = parse_locale, default_value = "en")]
    locale: Locale,
    /// Per-request timeout in seconds (clamped to 15..=300).
    #[arg(long)]
    timeout: Option<f64>,
}

#[derive(Debug, Parser)]
struct ChatArgs {
    #[arg(long)]
    out: Option<PathBuf>,
    #[command(flatten)]
    session: SessionArgs,
}

#[derive(Debug, Parser)]
struct GenerateArgs {
    #[arg(long)]
    prompt: String,
    #[arg(long)]
    out: PathBuf,
    #[command(flatten)]
    session: SessionArgs,
}

fn parse_locale(raw: &str) -> Result<Locale, String> {
    Locale::parse(raw).ok_or_else(|| format!("unsupported locale '{raw}' (expected en or ko)"))
}

fn main() {
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("wallgen error: {err:#}");
            std::process::exit(1);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Chat(args) => {
            run_chat(args)?;
            Ok(0)
        }
        Command::Generate(args) => run_generate(args),
    }
}

fn build_studio(
    session: &SessionArgs,
    out_dir: Option<&Path>,
    key_prompt: fn() -> Result<Option<String>>,
) -> Result<Studio> {
    let mut config = GenerationConfig::from_env();
    if let Some(provider) = session.provider.as_deref() {
        config.provider = provider.trim().to_string();
    }
    if let Some(model) = session.model.as_deref() {
        config.model = model.trim().to_string();
    }
    if let Some(timeout) = session.timeout {
        config = config.with_timeout_secs(timeout);
    }

    let session_id = format!("session-{}", timestamp_millis());
    let events = match (session.events.as_ref(), out_dir) {
        (Some(path), _) => EventWriter::new(path, session_id),
        (None, Some(dir)) => EventWriter::new(dir.join("events.jsonl"), session_id),
        (None, None) => EventWriter::discard(session_id),
    };

    let registry = default_provider_registry(&config);
    let Some(provider) = registry.get(&config.provider) else {
        bail!(
            "unknown provider '{}' (available: {})",
            config.provider,
            registry.names().join(", ")
        );
    };

    let credentials = CredentialStore::from_env();
    if provider.name() == "dryrun" && !credentials.is_present() {
        credentials.connect("dryrun");
    }
    let host = StoreCredentialHost::new(credentials.clone(), key_prompt);
    let generator = WallpaperGenerator::new(provider, credentials, config, events.clone());
    Ok(Studio::new(generator, host, session.locale, events))
}

fn read_key_from_stdin() -> Result<Option<String>> {
    print!("Paste your Gemini API key: ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin()
        .read_line(&mut line)
        .context("failed to read API key")?;
    let key = line.trim();
    Ok((!key.is_empty()).then(|| key.to_string()))
}

fn run_chat(args: ChatArgs) -> Result<()> {
    let studio = build_studio(&args.session, args.out.as_deref(), read_key_from_stdin)?;
    let locale = studio.locale();
    let stdin = io::stdin();
    let mut line = String::new();
    let mut remix_pending = false;

    println!("wallgen started. Describe a mood, or /help for commands.");
    if !studio.credential_connected() {
        println!("{}", locale.credential_required());
    }

    loop {
        let draft = studio.draft();
        if remix_pending && !draft.is_empty() {
            println!("[draft] {draft}  (Enter to generate)");
        }
        print!("> ");
        io::stdout().flush()?;

        line.clear();
        let read = match stdin.read_line(&mut line) {
            Ok(read) => read,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(err.into()),
        };
        if read == 0 {
            break;
        }

        let input = line.trim_end_matches(['\n', '\r']);
        let intent = parse_intent(input);

        match intent.action.as_str() {
            "noop" => {
                if remix_pending {
                    remix_pending = false;
                    submit_and_report(&studio, &draft);
                }
            }
            "generate" => {
                remix_pending = false;
                let prompt = intent.prompt.unwrap_or_default();
                submit_and_report(&studio, &prompt);
            }
            "select_image" => match intent.index().and_then(|idx| studio.select_index(idx)) {
                Some(image) => print_viewer(&image),
                None => println!("/view requires a gallery number (see /gallery)"),
            },
            "close_viewer" => studio.select_image(None),
            "remix" => match pick_image(&studio, intent.index()) {
                Some(image) => {
                    studio.remix_image(&image);
                    remix_pending = true;
                }
                None => println!("/remix requires a gallery number or an open image"),
            },
            "save_image" => match pick_image(&studio, intent.index()) {
                Some(image) => {
                    let saved = save_target(intent.path(), args.out.as_deref())
                        .and_then(|target| save_image(&image, &target));
                    match saved {
                        Ok(path) => {
                            studio_event(&studio, "image_saved", json!({ "id": image.id, "path": path.to_string_lossy() }));
                            println!("Saved {}", path.display());
                        }
                        Err(err) => eprintln!("Save failed: {err:#}"),
                    }
                }
                None => println!("/save requires a gallery number or an open image"),
            },
            "show_gallery" => print_gallery(&studio.images()),
            "show_status" => print_status(&studio),
            "connect_credential" => match studio.connect_credential() {
                Ok(()) => println!("Credential connected."),
                Err(err) => eprintln!("Connect failed: {err:#}"),
            },
            "export_gallery" => {
                let out_path = intent
                    .path()
                    .map(PathBuf::from)
                    .unwrap_or_else(|| default_export_path(args.out.as_deref()));
                let images = studio.images();
                match export_gallery_html(&images, &out_path) {
                    Ok(()) => {
                        studio_event(&studio, "gallery_exported", json!({ "path": out_path.to_string_lossy(), "images": images.len() }));
                        println!("Exported {} wallpapers to {}", images.len(), out_path.display());
                    }
                    Err(err) => eprintln!("Export failed: {err:#}"),
                }
            }
            "help" => println!("Commands: {}", CHAT_HELP_COMMANDS.join(" ")),
            "quit" => break,
            "unknown" => {
                let command = intent
                    .command_args
                    .get("command")
                    .and_then(Value::as_str)
                    .unwrap_or_default();
                println!("Unknown command /{command}. Type /help.");
            }
            other => println!("Unhandled action {other}"),
        }
    }

    Ok(())
}

fn run_generate(args: GenerateArgs) -> Result<i32> {
    let studio = build_studio(&args.session, Some(args.out.as_path()), || Ok(None))?;
    let locale = studio.locale();
    if !studio.credential_connected() {
        eprintln!("{}", locale.credential_required());
        return Ok(2);
    }
    if exceeds_soft_limit(&args.prompt) {
        eprintln!("warning: prompt is longer than {PROMPT_SOFT_MAX_CHARS} characters");
    }

    match studio.submit(&args.prompt) {
        SubmitOutcome::Added(_) => {
            fs::create_dir_all(&args.out)
                .with_context(|| format!("failed to create {}", args.out.display()))?;
            for image in studio.images() {
                let path = save_image(&image, &args.out)?;
                println!("{}", path.display());
            }
            Ok(0)
        }
        SubmitOutcome::Empty | SubmitOutcome::Failed => {
            eprintln!("{}", studio.state().error.unwrap_or_default());
            Ok(1)
        }
        SubmitOutcome::CredentialRequired => {
            eprintln!("{}", locale.credential_required());
            Ok(2)
        }
        SubmitOutcome::Ignored(IgnoreReason::EmptyPrompt) => bail!("--prompt must not be blank"),
        SubmitOutcome::Ignored(reason) => bail!("generation did not start: {reason:?}"),
    }
}

fn submit_and_report(studio: &Studio, prompt: &str) {
    let locale = studio.locale();
    if !studio.credential_connected() {
        println!("{}", locale.credential_required());
        return;
    }
    if exceeds_soft_limit(prompt) {
        println!(
            "({}/{PROMPT_SOFT_MAX_CHARS} characters; long prompts may be cut short)",
            prompt.chars().count()
        );
    }
    println!("{}", locale.generating());
    match studio.submit(prompt) {
        SubmitOutcome::Added(count) => {
            let images = studio.images();
            println!("Added {count} wallpapers. Gallery now has {}.", images.len());
            print_gallery(&images[..count.min(images.len())]);
        }
        SubmitOutcome::Empty | SubmitOutcome::Failed => {
            println!("{}", studio.state().error.unwrap_or_default());
        }
        SubmitOutcome::CredentialRequired
        | SubmitOutcome::Ignored(IgnoreReason::CredentialRequired) => {
            println!("{}", locale.credential_required());
        }
        SubmitOutcome::Ignored(IgnoreReason::Busy) => {
            println!("A batch is already running.");
        }
        SubmitOutcome::Ignored(IgnoreReason::EmptyPrompt) => {}
    }
}

fn pick_image(studio: &Studio, index: Option<usize>) -> Option<GeneratedImage> {
    match index {
        Some(idx) => studio.image(idx),
        None => studio.selected(),
    }
}

fn print_gallery(images: &[GeneratedImage]) {
    if images.is_empty() {
        println!("Gallery is empty.");
        return;
    }
    for (idx, image) in images.iter().enumerate() {
        let short_id: String = image.id.chars().take(8).collect();
        println!(
            "  {:>2}. [{short_id}] {}",
            idx + 1,
            strip_wallpaper_template(&image.prompt)
        );
    }
}

fn print_viewer(image: &GeneratedImage) {
    let (mime, payload_chars) = image
        .url
        .strip_prefix("data:")
        .and_then(|rest| rest.split_once(','))
        .map(|(header, payload)| (header.trim_end_matches(";base64"), payload.len()))
        .unwrap_or(("unknown", 0));
    println!("Image {}", image.id);
    println!("  prompt:  {}", strip_wallpaper_template(&image.prompt));
    println!("  created: {}", image.created_at);
    println!("  format:  {mime} ({payload_chars} base64 chars)");
    println!("  /remix to edit this prompt, /save to download, /close to close");
}

fn print_status(studio: &Studio) {
    let snapshot = studio.snapshot();
    println!("images:     {}", snapshot.images.len());
    println!("loading:    {}", snapshot.state.is_loading);
    println!(
        "error:      {}",
        snapshot.state.error.as_deref().unwrap_or("-")
    );
    println!("credential: {}", snapshot.credential_connected);
    println!(
        "selected:   {}",
        snapshot
            .selected
            .as_ref()
            .map(|image| image.id.as_str())
            .unwrap_or("-")
    );
    println!(
        "draft:      {}",
        if snapshot.draft.is_empty() {
            "-"
        } else {
            snapshot.draft.as_str()
        }
    );
}

/// Explicit paths are used as given; otherwise the session's output
/// directory (created on demand) or the working directory.
fn save_target(explicit: Option<&str>, out_dir: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(PathBuf::from(path));
    }
    let Some(dir) = out_dir else {
        return Ok(PathBuf::from("."));
    };
    fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;
    Ok(dir.to_path_buf())
}

fn default_export_path(out_dir: Option<&Path>) -> PathBuf {
    out_dir
        .map(|dir| dir.join("gallery.html"))
        .unwrap_or_else(|| PathBuf::from("gallery.html"))
}

fn studio_event(studio: &Studio, event_type: &str, payload: Value) {
    studio.events().record(event_type, event_payload(payload));
}

fn timestamp_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_millis())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use clap::Parser;
    use serde_json::Value;
    use wallgen_contracts::messages::Locale;
    use wallgen_engine::SubmitOutcome;

    use super::{
        build_studio, default_export_path, run_generate, save_target, Cli, Command, GenerateArgs,
        SessionArgs,
    };

    fn dryrun_session(events: Option<std::path::PathBuf>) -> SessionArgs {
        SessionArgs {
            events,
            provider: Some("dryrun".to_string()),
            model: None,
            locale: Locale::En,
            timeout: None,
        }
    }

    #[test]
    fn parses_generate_command() {
        let cli = Cli::try_parse_from([
            "wallgen",
            "generate",
            "--prompt",
            "misty forest",
            "--out",
            "/tmp/walls",
            "--provider",
            "dryrun",
            "--locale",
            "ko",
        ]);
        let Ok(Cli {
            command: Command::Generate(args),
        }) = cli
        else {
            panic!("generate command did not parse");
        };
        assert_eq!(args.prompt, "misty forest");
        assert_eq!(args.session.locale, Locale::Ko);
        assert_eq!(args.session.provider.as_deref(), Some("dryrun"));
    }

    #[test]
    fn rejects_unknown_locale() {
        assert!(Cli::try_parse_from(["wallgen", "chat", "--locale", "fr"]).is_err());
    }

    #[test]
    fn unknown_provider_is_an_error() {
        let mut session = dryrun_session(None);
        session.provider = Some("nope".to_string());
        assert!(build_studio(&session, None, || Ok(None)).is_err());
    }

    #[test]
    fn dryrun_studio_generates_a_full_batch() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let studio = build_studio(&dryrun_session(None), Some(temp.path()), || Ok(None))?;
        assert!(studio.credential_connected());
        assert_eq!(studio.submit("misty forest"), SubmitOutcome::Added(4));

        let raw = fs::read_to_string(temp.path().join("events.jsonl"))?;
        let types: Vec<String> = raw
            .lines()
            .filter_map(|line| serde_json::from_str::<Value>(line).ok())
            .filter_map(|row| row.get("type").and_then(Value::as_str).map(str::to_string))
            .collect();
        assert_eq!(
            types,
            vec!["session_started", "batch_started", "batch_settled"]
        );
        Ok(())
    }

    #[test]
    fn generate_writes_four_files() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let out = temp.path().join("walls");
        let code = run_generate(GenerateArgs {
            prompt: "neon rain".to_string(),
            out: out.clone(),
            session: dryrun_session(Some(temp.path().join("events.jsonl"))),
        })?;
        assert_eq!(code, 0);
        let pngs = fs::read_dir(&out)?
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().extension().and_then(|ext| ext.to_str()) == Some("png"))
            .count();
        assert_eq!(pngs, 4);
        Ok(())
    }

    #[test]
    fn generate_rejects_blank_prompt() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let result = run_generate(GenerateArgs {
            prompt: "   ".to_string(),
            out: temp.path().to_path_buf(),
            session: dryrun_session(None),
        });
        assert!(result.is_err());
        Ok(())
    }

    #[test]
    fn save_target_creates_out_dir() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let out = temp.path().join("later");
        assert_eq!(save_target(None, Some(out.as_path()))?, out);
        assert!(out.is_dir());
        assert_eq!(
            save_target(Some("x.png"), Some(out.as_path()))?,
            std::path::PathBuf::from("x.png")
        );
        Ok(())
    }

    #[test]
    fn export_defaults_to_out_dir() {
        assert_eq!(
            default_export_path(Some(std::path::Path::new("/tmp/walls"))),
            std::path::PathBuf::from("/tmp/walls/gallery.html")
        );
        assert_eq!(
            default_export_path(None),
            std::path::PathBuf::from("gallery.html")
        );
    }
}
