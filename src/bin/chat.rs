//! Terminal chat with a Sidrex robot.
//! Run with: cargo run --bin sidrex-chat -- --robot zzen

use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};

use sidrex_widget::api::models::Credentials;
use sidrex_widget::chat::format::strip_emphasis;
use sidrex_widget::chat::{ChatMessage, ChatSession, MessageId, SubmitOutcome};
use sidrex_widget::widget::persona::presets;
use sidrex_widget::{ApiClient, ApiConfig, RobotPersona, RobotSlug, telemetry};

const CLEAR_COMMAND: &str = "/temizle";
const QUIT_COMMAND: &str = "/cikis";

#[derive(Debug, Parser)]
#[command(name = "sidrex-chat", version, about = "Chat with a Sidrex robot from the terminal")]
struct Args {
    /// Robot slug.
    #[arg(long, default_value = "ana-robot")]
    robot: String,
    /// API base URL, e.g. `http://localhost:8000/api`.
    #[arg(long, env = "SIDREX_API_BASE_URL")]
    base_url: Option<String>,
    /// Log in before chatting.
    #[arg(long, env = "SIDREX_USERNAME")]
    username: Option<String>,
    /// Password for `--username`.
    #[arg(long, env = "SIDREX_PASSWORD", hide_env_values = true)]
    password: Option<String>,
}

fn main() -> ExitCode {
    telemetry::init_tracing();
    let args = Args::parse();

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("Failed to create runtime: {e}");
            return ExitCode::from(1);
        }
    };

    match rt.block_on(run(args)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let mut config = ApiConfig::from_env();
    if let Some(base_url) = args.base_url {
        config = config.with_base_url(base_url);
    }
    let max_chars = config.max_message_chars;
    let client = Arc::new(ApiClient::new(config).context("invalid API configuration")?);

    if let (Some(username), Some(password)) = (args.username, args.password) {
        client
            .login(&Credentials::new(username, password))
            .await
            .context("login failed")?;
    }

    let persona = resolve_persona(&client, &args.robot).await?;
    let session = ChatSession::new(persona, client, max_chars);

    for message in session.messages() {
        say(&format!("{}: {}", session.persona().name, strip_emphasis(&message.text)))?;
    }
    say(&format!("({CLEAR_COMMAND} sohbeti temizler, {QUIT_COMMAND} çıkar)"))?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
        match line.trim() {
            QUIT_COMMAND => break,
            CLEAR_COMMAND => {
                session.clear();
                say("Sohbet temizlendi.")?;
            }
            _ => match session.submit(&line).await {
                SubmitOutcome::Replied { id } | SubmitOutcome::Failed { id, .. } => {
                    if let Some(message) = find(&session.messages(), id) {
                        print_reply(&session.persona().name, message)?;
                    }
                }
                SubmitOutcome::Rejected(reason) => say(&reason.user_message())?,
                SubmitOutcome::Superseded | SubmitOutcome::Cancelled => {}
            },
        }
    }
    Ok(())
}

/// Built-in persona, or one built from the robot the backend reports.
async fn resolve_persona(client: &ApiClient, slug: &str) -> anyhow::Result<RobotPersona> {
    if let Some(persona) = presets::by_slug(slug) {
        return Ok(persona);
    }
    let robot = client
        .robot_info(slug)
        .await
        .with_context(|| format!("unknown robot `{slug}`"))?;
    let intro = format!("Merhaba, ben **{}**.", robot.name);
    Ok(RobotPersona::new(RobotSlug::new(slug)?, robot.name, intro))
}

fn find(messages: &[ChatMessage], id: MessageId) -> Option<&ChatMessage> {
    messages.iter().find(|message| message.id == id)
}

fn print_reply(name: &str, message: &ChatMessage) -> anyhow::Result<()> {
    say(&format!("{name}: {}", strip_emphasis(&message.text)))?;
    for citation in &message.citations {
        say(&format!("  [kaynak] {} ({:.2})", citation.source, citation.similarity))?;
    }
    Ok(())
}

fn say(text: &str) -> anyhow::Result<()> {
    let mut out = std::io::stdout().lock();
    writeln!(out, "{text}")?;
    out.flush()?;
    Ok(())
}
