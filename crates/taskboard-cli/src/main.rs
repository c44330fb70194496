//! taskboard: an interactive two-column board over the in-memory task service.
//!
//! 行コマンドを stdin（または --script のファイル）から読み、
//! コマンドごとに盤面を表示する。障害注入コマンドで rollback の様子を確認できる。

mod command;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use taskboard_core::domain::{MutationError, NewTask, Task, ValidationError};
use taskboard_core::impls::InMemoryTaskGateway;
use taskboard_core::ports::SystemClock;
use taskboard_core::{BoardBuilder, BoardConfig, MutationCoordinator};

use crate::command::{Command, HELP, parse};

type Board = MutationCoordinator<InMemoryTaskGateway>;

#[derive(Parser, Debug)]
#[command(name = "taskboard", version, about = "Two-column task board with optimistic updates")]
struct Args {
    /// Start with a few demo tasks.
    #[arg(long)]
    seed: bool,

    /// Delay every answer of the in-memory service (overrides TASKBOARD_LATENCY_MS).
    #[arg(long)]
    latency_ms: Option<u64>,

    /// Read commands from this file instead of stdin.
    #[arg(long)]
    script: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let args = Args::parse();

    let mut config = BoardConfig::from_env().context("loading TASKBOARD_* configuration")?;
    if let Some(ms) = args.latency_ms {
        config.latency = Duration::from_millis(ms);
    }
    tracing::debug!(?config, "configuration loaded");

    let clock = Arc::new(SystemClock);
    let seed = if args.seed { demo_tasks(&config) } else { Vec::new() };
    let gateway = InMemoryTaskGateway::with_tasks(clock.clone(), seed);
    gateway.set_latency(config.latency).await;

    let board = BoardBuilder::new(gateway).clock(clock).config(&config).build();
    if let Err(err) = board.refresh().await {
        eprintln!("initial load failed: {}", err.user_message());
    }
    print_board(&board);

    match &args.script {
        Some(path) => {
            let script = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("reading script {}", path.display()))?;
            for line in script.lines() {
                println!("> {line}");
                if !run_line(&board, line).await {
                    break;
                }
            }
        }
        None => {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            while let Some(line) = lines.next_line().await.context("reading stdin")? {
                if !run_line(&board, &line).await {
                    break;
                }
            }
        }
    }
    Ok(())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,taskboard_core=info"));

    // 盤面は stdout、ログは stderr
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .init();
}

fn demo_tasks(config: &BoardConfig) -> Vec<NewTask> {
    let category = |i: usize| config.categories.get(i % config.categories.len().max(1)).cloned();
    let mut tasks = vec![
        NewTask::new("Write quarterly report").with_priority(8),
        NewTask::new("Buy groceries").with_priority(3),
        NewTask::new("Fix the leaking tap").with_priority(5),
        NewTask::new("Read chapter 4").with_priority(2),
        NewTask {
            completed: true,
            ..NewTask::new("Book dentist appointment")
        },
    ];
    for (i, task) in tasks.iter_mut().enumerate() {
        task.category = category(i);
    }
    tasks
}

/// Run one line. Returns `false` when the shell should stop.
async fn run_line(board: &Board, line: &str) -> bool {
    let command = match parse(line) {
        Ok(Some(command)) => command,
        Ok(None) => return true,
        Err(message) => {
            eprintln!("error: {message}");
            return true;
        }
    };

    let outcome: Result<(), MutationError> = match command {
        Command::Quit => return false,
        Command::Help => {
            println!("{HELP}");
            return true;
        }
        Command::List => Ok(()),
        Command::Add(payload) => board.create(payload).await.map(|_| ()),
        Command::Toggle(id) => match lookup(board, id) {
            Ok(task) => board.toggle_completion(&task).await.map(|_| ()),
            Err(err) => Err(err),
        },
        Command::Edit(id, patch) => board.update(id, patch).await.map(|_| ()),
        Command::Remove(id) => match lookup(board, id) {
            Ok(task) => board.delete(&task).await,
            Err(err) => Err(err),
        },
        Command::Drag(intent) => board.apply_drop(intent).await.map(|_| ()),
        Command::Offline(offline) => {
            board.gateway().set_offline(offline).await;
            println!("server {}", if offline { "offline" } else { "online" });
            Ok(())
        }
        Command::Fail(op, error) => {
            println!("next {op} will fail: {error}");
            board.gateway().fail_next(op, error).await;
            Ok(())
        }
        Command::Filter(filter) => board.set_filter(filter).await,
        Command::Refresh => board.refresh().await,
    };

    if let Err(err) = outcome {
        eprintln!("error: {}", err.user_message());
    }
    print_board(board);
    true
}

fn lookup(board: &Board, id: taskboard_core::TaskId) -> Result<Task, MutationError> {
    board
        .snapshot()
        .get(id)
        .cloned()
        .ok_or_else(|| ValidationError::UnknownTask(id).into())
}

fn print_board(board: &Board) {
    let snapshot = board.snapshot();
    let parts = snapshot.partitions();

    if snapshot.filter.is_narrowing() {
        println!("(filtered: drags reorder the shown tasks only)");
    }
    println!("── To do ({}) ──", parts.incomplete.len());
    for task in &parts.incomplete {
        println!("  [ ] {}", describe(task, snapshot.is_in_flight(task.id)));
    }
    println!("── Done ({}) ──", parts.completed.len());
    for task in &parts.completed {
        println!("  [x] {}", describe(task, snapshot.is_in_flight(task.id)));
    }
    println!("{}/{} done", parts.done(), parts.total());
}

fn describe(task: &Task, pending: bool) -> String {
    let mut line = format!("{:<10} {}", task.id.to_string(), task.title);
    let mut tags = vec![format!("p{}", task.priority)];
    if let Some(category) = &task.category {
        tags.push(category.clone());
    }
    if let Some(due) = task.due_date {
        tags.push(format!("due {}", due.format("%Y-%m-%d")));
    }
    line.push_str(&format!("  ({})", tags.join(", ")));
    if pending {
        line.push_str("  …saving");
    }
    line
}
