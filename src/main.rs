use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use buzz_quiz::protocol::{DEFAULT_PORT, DEFAULT_THINK_MS};
use buzz_quiz::session::{
    mailbox, Mailbox, Matchmaker, SessionBus, SessionController, SessionHandle,
};
use buzz_quiz::transport::{pair, WsEndpoint, WsTransport};
use buzz_quiz::{app, load_questions_from_json, PlayerId, QuizError, SessionConfig};
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Stable player id (random when omitted)
    #[arg(long)]
    player_id: Option<String>,

    /// Name announced to the opponent
    #[arg(short, long)]
    name: Option<String>,

    /// Wait for the opponent on this port
    #[arg(long, conflicts_with_all = ["connect", "loopback"])]
    listen: Option<u16>,

    /// Dial the opponent at host:port
    #[arg(long, conflicts_with = "loopback")]
    connect: Option<String>,

    /// Practise against a local bot instead of a remote player
    #[arg(long)]
    loopback: bool,

    /// JSON file to load the questions from
    #[arg(short, long)]
    questions: Option<PathBuf>,

    /// Think time announced with each round, in milliseconds
    #[arg(long, default_value_t = DEFAULT_THINK_MS)]
    think_ms: u64,

    /// Give up matchmaking after this many seconds
    #[arg(long, default_value_t = 20)]
    match_timeout_secs: u64,

    /// Where to write the session log
    #[arg(long, default_value = "buzz-quiz.log")]
    log_file: PathBuf,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    if let Err(e) = run(args).await {
        eprintln!("Error running quiz: {}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), QuizError> {
    init_logging(&args.log_file)?;
    let config = build_config(&args)?;
    let (handle, mailbox) = mailbox(config.player_id.clone());

    let (bus, matchmaker): (Arc<dyn SessionBus>, Arc<dyn Matchmaker>) = if args.loopback {
        let bot = practice_opponent(&config);
        let (ours, theirs) = pair(
            (config.player_id.clone(), handle.events()),
            (bot.config.player_id.clone(), bot.handle.events()),
        );
        tokio::spawn(
            SessionController::new(bot.config, bot.mailbox, Arc::new(theirs.clone()), Arc::new(theirs)).run(),
        );
        bot.handle.request_matchmaking();
        let bus: Arc<dyn SessionBus> = Arc::new(ours.clone());
        let matchmaker: Arc<dyn Matchmaker> = Arc::new(ours);
        (bus, matchmaker)
    } else {
        let endpoint = match &args.connect {
            Some(addr) => WsEndpoint::Dial(format!("ws://{addr}")),
            None => WsEndpoint::Listen(args.listen.unwrap_or(DEFAULT_PORT)),
        };
        let transport = WsTransport::new(endpoint, config.player_id.clone(), handle.events());
        let bus: Arc<dyn SessionBus> = Arc::new(transport.clone());
        let matchmaker: Arc<dyn Matchmaker> = Arc::new(transport);
        (bus, matchmaker)
    };

    let session = tokio::spawn(SessionController::new(config, mailbox, bus, matchmaker).run());
    handle.request_matchmaking();

    let result = app::run(handle.clone()).await;

    handle.shutdown();
    let _ = session.await;
    result
}

fn init_logging(path: &Path) -> Result<(), QuizError> {
    let file = std::fs::File::create(path)?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn build_config(args: &Args) -> Result<SessionConfig, QuizError> {
    let player_id = match &args.player_id {
        Some(id) if id.trim().is_empty() => {
            return Err(QuizError::Usage("--player-id must not be empty".to_string()));
        }
        Some(id) => PlayerId::from(id.trim()),
        None => PlayerId::random(),
    };
    let name = args.name.clone().unwrap_or_else(|| player_id.to_string());

    let mut config = SessionConfig::new(player_id, name);
    config.think_ms = args.think_ms;
    config.matchmaking_timeout = Duration::from_secs(args.match_timeout_secs);
    if let Some(path) = &args.questions {
        config.questions = load_questions_from_json(path)?;
    }
    Ok(config)
}

struct PracticeOpponent {
    config: SessionConfig,
    handle: SessionHandle,
    mailbox: Mailbox,
}

/// A bot that buzzes once per round after the think time and answers badly.
fn practice_opponent(player: &SessionConfig) -> PracticeOpponent {
    let mut config = SessionConfig::new(PlayerId::from("practice-bot"), "Practice Bot");
    config.questions = player.questions.clone();
    config.think_ms = player.think_ms;
    let (handle, mailbox) = mailbox(config.player_id.clone());

    let bot = handle.clone();
    tokio::spawn(async move {
        let mut updates = bot.subscribe();
        let mut buzzed_round = 0;
        let mut answered_round = 0;

        while updates.changed().await.is_ok() {
            let snap = updates.borrow_and_update().clone();
            if snap.ended {
                break;
            }
            if snap.holds_lock() && answered_round < snap.round_index {
                answered_round = snap.round_index;
                bot.submit_answer("no idea");
            } else if snap.round_index > buzzed_round && snap.lock_holder.is_none() {
                buzzed_round = snap.round_index;
                let delay = Duration::from_millis(snap.think_ms.max(500));
                let buzzer = bot.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    buzzer.buzz();
                });
            }
        }
    });

    PracticeOpponent {
        config,
        handle,
        mailbox,
    }
}
