use std::io::BufRead;
use std::sync::mpsc;
use std::thread;

use nexback_engine::TrialEngine;
use nexback_trainer::config::TrainerConfig;
use nexback_trainer::logging;
use nexback_trainer::presentation::AudioBank;
use nexback_trainer::runner::{parse_commands, SessionRunner};
use nexback_trainer::storage::SessionStore;

fn main() {
    let _ = dotenvy::dotenv();
    let config = TrainerConfig::from_env();
    let _log_guard = logging::init_tracing(&config.log_level);

    if let Err(err) = config.validate() {
        tracing::error!(error = %err, "invalid settings");
        std::process::exit(2);
    }

    tracing::info!(
        n_level = config.engine.n_level,
        total_trials = config.engine.total_trials,
        clinical = config.engine.is_clinical_mode,
        seed = ?config.engine.random_seed,
        "starting session"
    );

    println!("nexback: dual n-back training");
    println!(
        "  n-level {} | {} trials | {}",
        config.engine.n_level,
        config.engine.total_trials,
        if config.engine.is_clinical_mode { "clinical mode" } else { "standard mode" }
    );
    println!("  keys: a = position match, l = audio match, q = stop; press Enter to submit");

    let (sender, receiver) = mpsc::channel();
    thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let line = match line {
                Ok(line) => line,
                Err(_) => break,
            };
            for command in parse_commands(&line) {
                if sender.send(command).is_err() {
                    return;
                }
            }
        }
    });

    let store = match SessionStore::new(&config.data_dir) {
        Ok(store) => store,
        Err(err) => {
            tracing::error!(error = %err, "failed to open data directory");
            std::process::exit(1);
        }
    };
    let audio = AudioBank::new(&config.audio_dir);
    let engine = TrialEngine::new(config.engine.clone());

    let mut session = SessionRunner::new(engine, store, audio, receiver);
    match session.run() {
        Ok(Some(result)) => {
            tracing::info!(
                final_score = result.final_score,
                n_level = result.n_level,
                "session recorded"
            );
        }
        Ok(None) => {
            tracing::info!("session stopped before completion");
        }
        Err(err) => {
            tracing::error!(error = %err, "failed to persist session");
            std::process::exit(1);
        }
    }
}
