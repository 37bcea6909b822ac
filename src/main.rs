mod config;
mod db;
mod lease;
mod notify;
mod presence;
mod web;

use std::sync::Arc;

use clap::Parser;
use tokio::task;

use config::{Args, Config};
use db::Database;
use lease::cache::LeaseCache;
use lease::poller::{CycleHook, LeasePoller};
use notify::Notifier;
use presence::PresenceEngine;

#[tokio::main]
async fn main() {
    let args = Args::parse();
    let config = match Config::from_args(args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            std::process::exit(2);
        }
    };

    let db = match Database::open(&config.database_path) {
        Ok(db) => db,
        Err(e) => {
            eprintln!("Failed to open database at '{}': {}", config.database_path, e);
            std::process::exit(1);
        }
    };

    let cache = Arc::new(LeaseCache::new());
    let engine = Arc::new(PresenceEngine::new(db, cache.clone()));

    let notifier = match &config.notify_url {
        Some(url) => match Notifier::new(url.clone(), config.notify_api_key.clone()) {
            Ok(notifier) => Some(Arc::new(notifier)),
            Err(e) => {
                eprintln!("Failed to build notifier, continuing without it: {}", e);
                None
            }
        },
        None => None,
    };

    if config.enable_poller {
        let poller = match LeasePoller::new(
            cache.clone(),
            config.lease_endpoint.clone(),
            config.poll_interval,
            config.fetch_timeout,
            config.connect_timeout,
        ) {
            Ok(poller) => poller,
            Err(e) => {
                eprintln!("Failed to build lease poller: {}", e);
                std::process::exit(1);
            }
        };
        poller.with_hook(presence_hook(engine.clone(), notifier)).spawn();
    } else {
        println!("Lease poller disabled");
    }

    web::start(engine, &config);

    let (tx, rx) = std::sync::mpsc::channel();
    ctrlc::set_handler(move || {
        let _ = tx.send(());
    })
    .expect("Failed to set Ctrl-C handler");
    let _ = task::spawn_blocking(move || rx.recv()).await;
    println!("Shutting down");
}

/// After every poll cycle: recompute the presence view against the snapshot
/// that was just installed and push it out. Notifier failures are logged and
/// dropped here; only a failed recompute counts as a hook failure.
fn presence_hook(engine: Arc<PresenceEngine>, notifier: Option<Arc<Notifier>>) -> CycleHook {
    Arc::new(move || {
        let engine = engine.clone();
        let notifier = notifier.clone();
        Box::pin(async move {
            let names = task::spawn_blocking(move || engine.present_names())
                .await
                .map_err(|e| format!("presence recompute task failed: {}", e))?
                .map_err(|e| format!("presence recompute failed: {}", e))?;
            println!("{} tracked entities present", names.len());
            if let Some(notifier) = &notifier {
                if let Err(e) = notifier.publish(&names).await {
                    eprintln!("Failed to push present names: {}", e);
                }
            }
            Ok(())
        })
    })
}
