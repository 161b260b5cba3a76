use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};

use soundboard::config::Config;
use soundboard::hotkeys::Key;
use soundboard::playback::cpal_output::CpalBackend;
use soundboard::soundboard::{Soundboard, SoundboardError};

/// Terminal front-end: a stand-in key listener driving the board. Each line
/// is either a command or a key event; single characters act as hotkeys.
#[tokio::main(flavor = "current_thread")]
async fn main() {
    let log_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".to_string());
    tracing_subscriber::fmt().with_env_filter(log_filter).init();

    let config = Config::load();
    let backend = match CpalBackend::new() {
        Ok(backend) => Box::new(backend),
        Err(e) => {
            error!("Failed to initialize audio output: {}", e);
            std::process::exit(1);
        }
    };

    let mut board = Soundboard::open(&config, backend).await;
    info!("Soundboard ready; data dir: {}", config.data_dir.display());

    print_help();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        let _ = std::io::stdout().flush();
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                error!("Failed to read input: {}", e);
                break;
            }
        };

        if let Err(e) = run_command(&mut board, line.trim()).await {
            match e {
                CommandOutcome::Quit => break,
                CommandOutcome::Failed(e) => println!("error: {}", e),
            }
        }
    }

    board.stop_all();
}

enum CommandOutcome {
    Quit,
    Failed(SoundboardError),
}

async fn run_command(board: &mut Soundboard, line: &str) -> Result<(), CommandOutcome> {
    let fail = |e: SoundboardError| CommandOutcome::Failed(e);
    let (command, arg) = match line.split_once(' ') {
        Some((command, arg)) => (command, arg.trim()),
        None => (line, ""),
    };

    match (command, arg) {
        ("quit", _) | ("exit", _) => return Err(CommandOutcome::Quit),
        ("help", _) => print_help(),
        ("banks", _) => {
            for (i, bank) in board.catalog().banks().iter().enumerate() {
                let marker = if i == board.catalog().current_bank_index() {
                    "*"
                } else {
                    " "
                };
                println!("{} [{}] {} ({} sounds)", marker, i, bank.name, bank.sounds.len());
            }
        }
        ("sounds", _) => {
            for sound in &board.catalog().current_bank().sounds {
                let looping = if sound.looping { " loop" } else { "" };
                println!(
                    "  [{}] {} ({}) vol {}{}",
                    sound.hotkey, sound.name, sound.category, sound.volume, looping
                );
            }
        }
        ("bank", arg) => match arg.parse() {
            Ok(index) => board.select_bank(index).await.map_err(fail)?,
            Err(_) => println!("usage: bank <index>"),
        },
        ("vol", arg) => match arg.parse() {
            Ok(volume) => board.set_global_volume(volume),
            Err(_) => println!("usage: vol <0-100>"),
        },
        ("backup", path) if !path.is_empty() => {
            let json = board.backup().await.map_err(fail)?;
            if let Err(e) = tokio::fs::write(path, json).await {
                println!("error: could not write {}: {}", path, e);
            } else {
                println!("backup written to {}", path);
            }
        }
        ("restore", path) if !path.is_empty() => match tokio::fs::read_to_string(path).await {
            Ok(text) => {
                board.restore(&text).await.map_err(fail)?;
                println!("backup restored");
            }
            Err(e) => println!("error: could not read {}: {}", path, e),
        },
        _ => match Key::from_line(line) {
            Some(key) => board.handle_key(key, false).await.map_err(fail)?,
            None => warn!("Unrecognized input: {}", line),
        },
    }
    Ok(())
}

fn print_help() {
    println!("Commands: <hotkey char>, esc, banks, sounds, bank <n>, vol <0-100>,");
    println!("          backup <path>, restore <path>, help, quit");
}
