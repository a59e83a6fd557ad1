use std::{
    future::Future,
    io::{self, BufRead},
    thread,
};

use anyhow::{Context, Result};
use log::{debug, info, warn};
use tokio::sync::mpsc;

use crate::view::PERSISTENCE_NOTE;

use super::Workbench;

const HELP: &str = "Enter or 's': start/stop   'c': clear   'd <n>': delete row n   'q': quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiveInput {
    Toggle,
    Clear,
    Delete(usize),
    Help,
    Quit,
    Unknown(String),
}

pub fn parse_input(line: &str) -> LiveInput {
    let mut parts = line.split_whitespace();
    let Some(word) = parts.next() else {
        return LiveInput::Toggle;
    };

    match word.to_ascii_lowercase().as_str() {
        "s" | "start" | "stop" | "toggle" => LiveInput::Toggle,
        "c" | "clear" => LiveInput::Clear,
        "d" | "del" | "delete" => match parts.next().map(str::parse::<usize>) {
            Some(Ok(index)) => LiveInput::Delete(index),
            _ => LiveInput::Unknown(line.trim().to_string()),
        },
        "h" | "help" | "?" => LiveInput::Help,
        "q" | "quit" | "exit" => LiveInput::Quit,
        _ => LiveInput::Unknown(line.trim().to_string()),
    }
}

/// Printed before the workbench draws its first frame.
pub fn print_banner() {
    println!("{PERSISTENCE_NOTE}");
    println!("{HELP}");
}

/// Feeds stdin lines into a channel from a plain thread. The thread may stay
/// parked in a blocking read after the loop quits; nothing waits for it.
pub fn spawn_stdin_reader() -> Result<mpsc::Receiver<String>> {
    let (line_tx, line_rx) = mpsc::channel(16);
    thread::Builder::new()
        .name("worktimer-stdin".into())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                let line = match line {
                    Ok(line) => line,
                    Err(err) => {
                        warn!("Failed to read from stdin: {err}");
                        break;
                    }
                };
                if line_tx.blocking_send(line).is_err() {
                    break;
                }
            }
            debug!("Stdin reader finished");
        })
        .context("failed to spawn stdin reader")?;
    Ok(line_rx)
}

/// Resolves on Ctrl-C. If the handler cannot be installed it never resolves.
pub async fn ctrl_c() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("Cannot listen for Ctrl-C: {err}");
        std::future::pending::<()>().await;
    }
}

/// Applies input lines until quit, end of input or `shutdown` resolves. The
/// open record, if any, stays open when this returns.
pub async fn run_interactive<F>(
    workbench: &Workbench,
    mut input: mpsc::Receiver<String>,
    shutdown: F,
) -> Result<()>
where
    F: Future<Output = ()>,
{
    workbench.timer().resume();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            line = input.recv() => {
                let Some(line) = line else {
                    break;
                };
                match parse_input(&line) {
                    LiveInput::Quit => break,
                    input => {
                        if let Err(err) = apply(workbench, input) {
                            debug!("Live command failed: {err:#}");
                            println!("\n{err:#}");
                            workbench.render();
                        }
                    }
                }
            }
            _ = &mut shutdown => {
                info!("Interrupted");
                break;
            }
        }
    }

    workbench.timer().release();
    println!();
    Ok(())
}

fn apply(workbench: &Workbench, input: LiveInput) -> Result<()> {
    match input {
        LiveInput::Toggle => {
            workbench.toggle()?;
        }
        LiveInput::Clear => workbench.clear()?,
        LiveInput::Delete(index) => workbench.delete(index)?,
        LiveInput::Help => {
            println!("\n{HELP}");
            workbench.render();
        }
        LiveInput::Unknown(text) => {
            println!("\nUnknown command '{text}'. {HELP}");
            workbench.render();
        }
        LiveInput::Quit => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::{future, sync::Arc, time::Duration};

    use super::*;
    use crate::{
        clock::ManualClock, models::IntervalRecord, settings::Settings, storage::MemoryBackend,
        view::MemoryScreen,
    };

    fn workbench() -> Workbench {
        Workbench::new(
            Box::new(MemoryBackend::new()),
            Arc::new(ManualClock::new(1000)),
            Arc::new(MemoryScreen::new()),
            &Settings::default(),
        )
    }

    #[tokio::test]
    async fn closed_input_ends_the_loop_and_keeps_the_record_open() {
        let bench = workbench();
        let (tx, rx) = mpsc::channel(4);
        tx.send("s".to_string()).await.unwrap();
        drop(tx);

        run_interactive(&bench, rx, future::pending()).await.unwrap();

        assert_eq!(bench.records(), vec![IntervalRecord::started_at(1000)]);
        assert!(bench.timer().status().is_running());
        assert!(!bench.timer().is_ticking());
    }

    #[tokio::test]
    async fn shutdown_ends_the_loop_while_input_is_still_open() {
        let bench = workbench();
        let (tx, rx) = mpsc::channel::<String>(4);

        tokio::time::timeout(
            Duration::from_secs(5),
            run_interactive(&bench, rx, future::ready(())),
        )
        .await
        .expect("loop should return on shutdown")
        .unwrap();

        assert!(bench.records().is_empty());
        drop(tx);
    }

    #[tokio::test]
    async fn quit_ends_the_loop_before_later_lines() {
        let bench = workbench();
        let (tx, rx) = mpsc::channel(4);
        tx.send("q".to_string()).await.unwrap();
        tx.send("s".to_string()).await.unwrap();

        run_interactive(&bench, rx, future::pending()).await.unwrap();

        assert!(bench.records().is_empty());
        drop(tx);
    }

    #[test]
    fn empty_line_toggles() {
        assert_eq!(parse_input(""), LiveInput::Toggle);
        assert_eq!(parse_input("   "), LiveInput::Toggle);
        assert_eq!(parse_input("S"), LiveInput::Toggle);
    }

    #[test]
    fn delete_needs_a_number() {
        assert_eq!(parse_input("d 2"), LiveInput::Delete(2));
        assert_eq!(parse_input("delete 10"), LiveInput::Delete(10));
        assert_eq!(parse_input("d"), LiveInput::Unknown("d".into()));
        assert_eq!(parse_input("d x"), LiveInput::Unknown("d x".into()));
    }

    #[test]
    fn other_commands() {
        assert_eq!(parse_input("c"), LiveInput::Clear);
        assert_eq!(parse_input("q"), LiveInput::Quit);
        assert_eq!(parse_input("?"), LiveInput::Help);
        assert_eq!(parse_input("dance"), LiveInput::Unknown("dance".into()));
    }
}
