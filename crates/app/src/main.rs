mod reconnect;

use std::{
    cell::Cell,
    path::PathBuf,
    rc::Rc,
    str::FromStr,
    time::{Duration, Instant},
};

use adaptive_music_core::{AppConfig, MemoryTransport, MusicDirector, Preset, WebSocketTransport};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::reconnect::Reconnector;

fn main() -> adaptive_music_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };
    config.apply_env();

    match cli.command {
        Commands::Play { url, events, hold } => {
            if let Some(url) = url {
                config.server.url = url;
            }
            run_play(&config, &events, hold)
        }
        Commands::Preview {
            preset,
            event,
            seconds,
            dt,
        } => run_preview(&config, preset, event, seconds, dt),
        Commands::Frame { preset } => {
            println!("{}", preset.context().to_wire());
            Ok(())
        }
    }
}

fn run_play(config: &AppConfig, events: &[EventSpec], hold: f32) -> adaptive_music_core::Result<()> {
    tracing::info!(url = config.server.url.as_str(), events = events.len(), "starting playback");

    let transport = WebSocketTransport::new()?;
    let mut director = MusicDirector::create(transport, config);
    let mut reconnector = Reconnector::new(&config.reconnect);

    let link_lost = Rc::new(Cell::new(false));
    let link_up = Rc::new(Cell::new(false));
    {
        let lost = Rc::clone(&link_lost);
        director.hooks_mut().on_error(move |_| lost.set(true));
        let lost = Rc::clone(&link_lost);
        director
            .hooks_mut()
            .on_closed(move |_code, _reason, _clean| lost.set(true));
        let up = Rc::clone(&link_up);
        director.hooks_mut().on_connected(move || up.set(true));
        director
            .hooks_mut()
            .on_binary(|payload| tracing::trace!(bytes = payload.len(), "audio payload"));
    }

    if let Err(err) = director.connect_default() {
        tracing::warn!(error = %err, "initial connection failed");
        link_lost.set(true);
    }

    let hold = Duration::from_secs_f32(hold.max(0.0));
    let tick = Duration::from_secs_f32(config.tick.delta_seconds());

    let mut run_for = |director: &mut MusicDirector<WebSocketTransport>, span: Duration| {
        let started = Instant::now();
        let mut last = started;
        while started.elapsed() < span {
            std::thread::sleep(tick);
            let now = Instant::now();
            director.advance((now - last).as_secs_f32());
            last = now;

            if link_up.replace(false) {
                reconnector.link_restored();
            }
            if link_lost.replace(false) {
                reconnector.link_lost(now);
            }
            if reconnector.should_retry(now) {
                tracing::info!(attempt = reconnector.attempts(), "reconnecting");
                if let Err(err) = director.connect_default() {
                    tracing::warn!(error = %err, "reconnect failed");
                    reconnector.link_lost(now);
                }
            }
        }
    };

    for event in events {
        tracing::info!(event = event.name.as_str(), intensity = event.intensity, "pushing event");
        let outcome = director.push_music_event(&event.name, event.intensity);
        tracing::debug!(?outcome, "event resolved");
        run_for(&mut director, hold);
    }
    if events.is_empty() {
        run_for(&mut director, hold);
    }

    let stats = serde_json::to_string(director.channel_stats())?;
    tracing::info!(stats = stats.as_str(), "playback finished");
    director.shutdown();
    Ok(())
}

fn run_preview(
    config: &AppConfig,
    preset: Option<Preset>,
    event: Option<EventSpec>,
    seconds: f32,
    dt: f32,
) -> adaptive_music_core::Result<()> {
    let (transport, peer) = MemoryTransport::loopback();
    let mut director = MusicDirector::create(transport, config);
    director.connect_default()?;
    director.pump();
    println!("t=0.000 {}", peer.take_sent_frames().join(" "));

    match (preset, event) {
        (Some(preset), _) => director.apply_preset(preset),
        (None, Some(event)) => {
            director.push_music_event(&event.name, event.intensity);
        }
        (None, None) => director.set_combat(),
    }

    let dt = dt.max(0.001);
    let mut elapsed = 0.0;
    while elapsed < seconds {
        director.advance(dt);
        elapsed += dt;
        for frame in peer.take_sent_frames() {
            println!("t={elapsed:.3} {frame}");
        }
    }

    director.shutdown();
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

/// `NAME` or `NAME:INTENSITY` on the command line.
#[derive(Debug, Clone, PartialEq)]
struct EventSpec {
    name: String,
    intensity: f32,
}

impl FromStr for EventSpec {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let (name, intensity) = match value.split_once(':') {
            Some((name, intensity)) => {
                let intensity = intensity
                    .parse::<f32>()
                    .map_err(|err| format!("bad intensity in `{value}`: {err}"))?;
                (name, intensity)
            }
            None => (value, 1.0),
        };
        if name.is_empty() {
            return Err(format!("missing event name in `{value}`"));
        }
        Ok(Self {
            name: name.to_string(),
            intensity,
        })
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Adaptive music controller", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Connect to a renderer and play a sequence of gameplay events.
    Play {
        /// Renderer endpoint, overriding the configuration.
        #[arg(short, long)]
        url: Option<String>,
        /// Event to push, as NAME or NAME:INTENSITY. Repeatable.
        #[arg(short, long = "event")]
        events: Vec<EventSpec>,
        /// Seconds to keep ticking after each event.
        #[arg(long, default_value_t = 3.0)]
        hold: f32,
    },
    /// Simulate a transition offline and print every frame that would be sent.
    Preview {
        /// Preset to transition to.
        #[arg(short, long, conflicts_with = "event")]
        preset: Option<Preset>,
        /// Event to push instead of a preset, as NAME or NAME:INTENSITY.
        #[arg(short, long)]
        event: Option<EventSpec>,
        /// Simulated duration in seconds.
        #[arg(long, default_value_t = 1.5)]
        seconds: f32,
        /// Simulated tick length in seconds.
        #[arg(long, default_value_t = 1.0 / 60.0)]
        dt: f32,
    },
    /// Print the wire frame of a preset.
    Frame {
        preset: Preset,
    },
}
