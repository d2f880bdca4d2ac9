//! Workspace chores for `CivicDesk`: `cargo xtask <task>`.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::process::{Command, ExitCode};

use anyhow::{bail, Context, Result};

mod features;

/// A named cargo invocation.
struct Task {
    name: &'static str,
    about: &'static str,
    args: &'static [&'static str],
    hint: &'static str,
}

const TASKS: &[Task] = &[
    Task {
        name: "fmt",
        about: "Check formatting",
        args: &["fmt", "--all", "--", "--check"],
        hint: "run `cargo fmt --all`",
    },
    Task {
        name: "clippy",
        about: "Lint every target with warnings denied",
        args: &["clippy", "--workspace", "--all-targets", "--all-features", "--", "-D", "warnings"],
        hint: "see the lints above",
    },
    Task {
        name: "test",
        about: "Run unit and wiremock integration tests",
        args: &["test", "--workspace", "--all-features"],
        hint: "see the failing tests above",
    },
];

fn main() -> ExitCode {
    let outcome = match std::env::args().nth(1).as_deref() {
        Some("ci") => ci(),
        Some("test-features") => features::check_matrix(),
        Some(name) if find(name).is_some() => find(name).map_or(Ok(()), run),
        Some("help") | None => {
            usage();
            Ok(())
        }
        Some(other) => {
            usage();
            Err(anyhow::anyhow!("unknown task `{other}`"))
        }
    };

    if let Err(err) = outcome {
        eprintln!("xtask: {err:#}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

fn find(name: &str) -> Option<&'static Task> {
    TASKS.iter().find(|task| task.name == name)
}

fn usage() {
    println!("cargo xtask <task>\n");
    for task in TASKS {
        println!("  {:<14}{}", task.name, task.about);
    }
    println!("  {:<14}Check each crate feature set on its own", "test-features");
    println!("  {:<14}fmt, clippy, test-features, test", "ci");
}

/// Formatting and lints first, then the feature matrix, then tests.
fn ci() -> Result<()> {
    let [fmt, clippy, test] = [find("fmt"), find("clippy"), find("test")];
    for task in [fmt, clippy].into_iter().flatten() {
        run(task)?;
    }
    features::check_matrix()?;
    test.map_or(Ok(()), run)?;
    println!("ci passed");
    Ok(())
}

fn run(task: &Task) -> Result<()> {
    println!("==> {}", task.name);
    cargo(task.args).with_context(|| format!("{} failed: {}", task.name, task.hint))
}

pub(crate) fn cargo(args: &[&str]) -> Result<()> {
    let status = Command::new("cargo")
        .args(args)
        .status()
        .with_context(|| format!("could not start `cargo {}`", args.join(" ")))?;
    if !status.success() {
        bail!("`cargo {}` exited with {status}", args.join(" "));
    }
    Ok(())
}
