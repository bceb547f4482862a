//! DTMF relay command line tool

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use colored::*;
use tracing::{info, warn};

use dtmf_relay::{
    config::RelayConfig,
    core::{CallSession, CallStatus, Outcome, OutcomeKind, SendOptions, SessionEvent},
    protocols::dtmf::{RelayPayload, ToneInput, MAX_DURATION, MIN_DURATION},
    protocols::sip::{Dialog, InfoRequest, OutgoingRequest, SipResponse},
    utils::setup_logging,
    Error, Result,
};

#[derive(Parser)]
#[command(name = "dtmf-relay")]
#[command(about = "DTMF tone relay over SIP INFO")]
#[command(version = dtmf_relay::VERSION)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); overrides the configuration
    #[arg(short, long)]
    log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the INFO body for a tone
    Encode {
        /// Tone symbol (0-9, A-D, #, *)
        tone: String,
        /// Tone duration in milliseconds
        #[arg(short, long)]
        duration: Option<u32>,
    },
    /// Parse an INFO body; `\r\n` may be written literally
    Decode {
        body: String,
        /// Print the parsed tone as JSON
        #[arg(long)]
        json: bool,
    },
    /// Send tones over an in-memory dialog answering with a fixed status
    Simulate {
        /// Tones to send, one symbol each
        tones: String,
        /// Final response status the far end answers with
        #[arg(short, long, default_value = "200")]
        status: u16,
        /// Tone duration in milliseconds
        #[arg(short, long)]
        duration: Option<u32>,
    },
    /// Validate configuration
    ValidateConfig,
    /// Generate default configuration
    GenerateConfig {
        /// Output file path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = load_configuration(&cli)?;
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }
    config.validate()?;

    let _log_guard = setup_logging(&config.logging)?;
    info!("Starting {} v{}", dtmf_relay::NAME, dtmf_relay::VERSION);

    match &cli.command {
        Commands::Encode { tone, duration } => encode(&config, tone, *duration),
        Commands::Decode { body, json } => decode(body, *json),
        Commands::Simulate {
            tones,
            status,
            duration,
        } => simulate(&config, tones, *status, *duration).await,
        Commands::ValidateConfig => validate_configuration(&config),
        Commands::GenerateConfig { output } => generate_default_config(output.clone()),
    }
}

fn load_configuration(cli: &Cli) -> Result<RelayConfig> {
    match &cli.config {
        Some(path) => RelayConfig::load_from_file(path),
        None => match RelayConfig::load_from_env() {
            Ok(config) => Ok(config),
            Err(e) => {
                eprintln!("Ignoring environment configuration ({}), using defaults", e);
                Ok(RelayConfig::default_config())
            }
        },
    }
}

fn encode(config: &RelayConfig, tone: &str, duration: Option<u32>) -> Result<()> {
    let tone = ToneInput::from(tone).normalize()?;
    let duration = duration.unwrap_or(config.dtmf.default_duration);
    if !(MIN_DURATION..=MAX_DURATION).contains(&duration) {
        return Err(Error::validation(format!(
            "Duration {} outside {}-{} ms",
            duration, MIN_DURATION, MAX_DURATION
        )));
    }

    println!("Content-Type: {}", dtmf_relay::protocols::dtmf::CONTENT_TYPE);
    println!();
    println!("{}", RelayPayload::new(tone, duration).encode().replace("\r\n", "\\r\\n\n"));
    Ok(())
}

fn decode(body: &str, json: bool) -> Result<()> {
    let body = body.replace("\\r\\n", "\r\n");

    match RelayPayload::decode(&body) {
        Some(payload) if json => println!("{}", serde_json::to_string_pretty(&payload)?),
        Some(payload) => println!(
            "{}: {}  {}: {} ms",
            "Tone".bold(),
            payload.tone.to_string().green(),
            "Duration".bold(),
            payload.duration
        ),
        None => println!("{}", "Not a DTMF relay body".yellow()),
    }
    Ok(())
}

/// Dialog whose far end is another session on the same process
struct LoopbackDialog {
    far_end: CallSession,
    far_end_replies: ReplyRecorder,
}

#[derive(Default)]
struct ReplyRecorder {
    statuses: Vec<u16>,
}

impl Dialog for ReplyRecorder {
    fn send_request(&mut self, request: OutgoingRequest) {
        warn!("Far end does not originate requests, dropping {}", request.method);
    }

    fn reply(&mut self, _request: &InfoRequest, status_code: u16) {
        self.statuses.push(status_code);
    }
}

impl Dialog for LoopbackDialog {
    fn send_request(&mut self, request: OutgoingRequest) {
        let cseq = self.far_end_replies.statuses.len() as u32 + 1;
        let info = InfoRequest::new(self.far_end.call_id().to_string(), cseq, Some(request.body));
        self.far_end.receive_info(&mut self.far_end_replies, info);
    }

    fn reply(&mut self, _request: &InfoRequest, _status_code: u16) {}
}

async fn simulate(
    config: &RelayConfig,
    tones: &str,
    status: u16,
    duration: Option<u32>,
) -> Result<()> {
    let call_id = format!("{}@dtmf-relay.local", uuid::Uuid::new_v4());

    let mut session = CallSession::new(call_id.clone(), config.dtmf.clone());
    let mut far_end = CallSession::new(call_id, config.dtmf.clone());
    let mut far_end_events = far_end
        .take_event_receiver()
        .ok_or_else(|| Error::internal("Failed to get far end event receiver"))?;
    session.set_status(CallStatus::Confirmed);
    far_end.set_status(CallStatus::Confirmed);

    let mut dialog = LoopbackDialog {
        far_end,
        far_end_replies: ReplyRecorder::default(),
    };
    let gap = session.inter_tone_gap();
    let response = SipResponse::new(status, reason_phrase(status));

    for (index, symbol) in tones.chars().enumerate() {
        if index > 0 {
            tokio::time::sleep(gap).await;
        }

        let mut options = SendOptions::new()
            .on(OutcomeKind::Succeeded, print_outcome)
            .on(OutcomeKind::Failed, print_outcome);
        if let Some(duration) = duration {
            options = options.with_duration(duration);
        }

        let mut event = match session.send_dtmf(&mut dialog, symbol, options) {
            Ok(event) => event,
            Err(e) => {
                println!("{} {}: {}", "✗".red(), symbol, e);
                continue;
            }
        };

        while let Ok(SessionEvent::NewDtmf { tone, duration, .. }) = far_end_events.try_recv() {
            println!("  far end received {} ({} ms)", tone.to_string().bold(), duration);
        }

        event.receive_response(response.clone());
    }

    Ok(())
}

fn print_outcome(outcome: &Outcome) {
    match outcome {
        Outcome::Succeeded { response, .. } => {
            println!("{} delivered ({})", "✓".green(), response);
        }
        Outcome::Failed {
            response, cause, ..
        } => {
            let status = response
                .as_ref()
                .map(|r| r.to_string())
                .unwrap_or_else(|| "no response".to_string());
            println!("{} failed: {} ({})", "✗".red(), cause, status);
        }
    }
}

fn reason_phrase(status: u16) -> &'static str {
    match status {
        100 => "Trying",
        180 => "Ringing",
        200 => "OK",
        403 => "Forbidden",
        404 => "Not Found",
        408 => "Request Timeout",
        481 => "Call/Transaction Does Not Exist",
        486 => "Busy Here",
        487 => "Request Terminated",
        500 => "Server Internal Error",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}

fn validate_configuration(config: &RelayConfig) -> Result<()> {
    config.validate()?;

    println!("✓ Configuration is valid");
    println!("  Default Duration: {} ms", config.dtmf.default_duration);
    println!("  Inter-tone Gap: {} ms", config.dtmf.inter_tone_gap);
    println!("  Log Level: {}", config.logging.level);

    Ok(())
}

fn generate_default_config(output_path: Option<PathBuf>) -> Result<()> {
    let config = RelayConfig::default_config();
    let toml_content = toml::to_string_pretty(&config)
        .map_err(|e| Error::internal(format!("Failed to serialize config: {}", e)))?;

    match output_path {
        Some(path) => {
            std::fs::write(&path, toml_content)?;
            println!("✓ Default configuration written to: {}", path.display());
        }
        None => {
            println!("{}", toml_content);
        }
    }

    Ok(())
}
