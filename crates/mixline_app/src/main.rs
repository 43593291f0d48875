// SPDX-License-Identifier: MIT OR Apache-2.0
//! Mixline - audio patch editor driver
//!
//! Replays a RON event script against an in-memory patch and reports what
//! happened. Without a script a built-in demo chain is replayed.
//!
//! ```text
//! mixline [--settings <path>] [script.ron]
//! ```

mod session;

use clap::Parser;
use mixline_graph::settings::SETTINGS_FILE_NAME;
use mixline_graph::EditorSettings;
use session::{Script, Session};
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser, Debug)]
#[command(name = "mixline")]
#[command(about = "Replay an input event script against an audio patch", long_about = None)]
struct Args {
    /// Editor settings file (RON)
    #[arg(long, default_value = SETTINGS_FILE_NAME)]
    settings: PathBuf,

    /// Event script to replay; the built-in demo runs if omitted
    script: Option<PathBuf>,
}

fn main() {
    let args = Args::parse();

    let mut env_filter = tracing_subscriber::EnvFilter::from_default_env();
    for directive in ["mixline_app=debug", "mixline_graph=debug"] {
        match directive.parse() {
            Ok(directive) => env_filter = env_filter.add_directive(directive),
            Err(e) => eprintln!("Bad log directive {directive}: {e}"),
        }
    }

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Mixline v{}", env!("CARGO_PKG_VERSION"));

    let settings = match EditorSettings::load_or_default(&args.settings) {
        Ok(settings) => settings,
        Err(e) => {
            tracing::error!("Failed to load settings from {:?}: {e}", args.settings);
            std::process::exit(1);
        }
    };

    let script = match &args.script {
        Some(path) => match Script::load(path) {
            Ok(script) => script,
            Err(e) => {
                tracing::error!("Failed to load script {path:?}: {e}");
                std::process::exit(1);
            }
        },
        None => Script::demo(),
    };

    let mut session = Session::new(&settings);
    let summary = session.replay(&script);

    let view = session.patch().view();
    for node in view.nodes() {
        tracing::info!("{} at ({}, {})", node.title(), node.position[0], node.position[1]);
    }
    for connection in view.connections() {
        tracing::info!("{} -> {}", connection.source(), connection.dest());
    }
    tracing::info!(
        "Replayed {} event(s): {} connected, {} rejected, {} ignored; {} node(s), {} connection(s)",
        summary.events,
        summary.connected,
        summary.rejected,
        summary.ignored,
        view.node_count(),
        view.connection_count(),
    );
}
