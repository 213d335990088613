//! Launch - Script Preview Host Entry Point
//!
//! Thin binary over `launch_core`: parses flags, builds the plugin
//! registry and lifecycle manager, and runs the launch path once. The
//! bundled consumer only logs the handoff; real hosts supply their own
//! window/runner implementation.

use std::path::PathBuf;

use anyhow::Result;
use launch_core::{
    exit_with, init, launch, LaunchOptions, LifecycleManager, PluginRegistry, ResolvedScript,
    ScriptConsumer,
};
use tracing::{error, info};

fn print_help() {
    println!("launch - script preview host v{}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("USAGE:");
    println!("  launch [OPTIONS] <SCRIPT_PATH> [KEY=VALUE]...");
    println!();
    println!("OPTIONS:");
    println!("  -h, --help            Print this help message");
    println!("  -v, --version         Print version information");
    println!("  -c, --preserve-cwd    Do not chdir to the script's parent directory");
    println!("  -f, --frame <N>       Frame to load initially (defaults to 0)");
    println!("      --no-exit         Return the exit code instead of terminating");
    println!("      --no-reload       Disable hot reload for directly-run scripts");
    println!("      --plugin-dir <P>  Additional resolver plugin search path");
}

struct Cli {
    script_path: Option<PathBuf>,
    plugin_dirs: Vec<PathBuf>,
    no_reload: bool,
    options: LaunchOptions,
}

fn parse_cli(args: &[String]) -> Result<Cli> {
    let mut cli = Cli {
        script_path: None,
        plugin_dirs: Vec::new(),
        no_reload: false,
        options: LaunchOptions::default(),
    };

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            "-v" | "--version" => {
                println!("launch {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "-c" | "--preserve-cwd" => cli.options.preserve_cwd = true,
            "--no-exit" => cli.options.no_exit = true,
            "--no-reload" => cli.no_reload = true,
            "-f" | "--frame" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--frame requires a value"))?;
                cli.options.initial_frame = Some(value.parse()?);
            }
            "--plugin-dir" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--plugin-dir requires a value"))?;
                cli.plugin_dirs.push(PathBuf::from(value));
            }
            other if other.contains('=') => cli.options.extra_args.push(other.to_string()),
            other if cli.script_path.is_none() => cli.script_path = Some(PathBuf::from(other)),
            other => anyhow::bail!("unrecognized argument '{other}'"),
        }
    }

    Ok(cli)
}

/// Consumer that only logs the handoff.
struct LogRunner;

impl ScriptConsumer for LogRunner {
    fn run(
        &mut self,
        script: &ResolvedScript,
        environment_id: u64,
        options: &LaunchOptions,
    ) -> i32 {
        info!(
            script = %script.display_name,
            path = %script.path.display(),
            environment = environment_id,
            reload = script.reload_enabled,
            frame = options.initial_frame.unwrap_or(0),
            "script loaded"
        );
        for (key, value) in &script.arguments {
            info!(key = %key, value = ?value, "script argument");
        }
        0
    }
}

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let cli = match parse_cli(&args) {
        Ok(cli) => cli,
        Err(e) => {
            eprintln!("error: {e}");
            eprintln!("Run 'launch --help' for usage information.");
            std::process::exit(1);
        }
    };

    init()?;

    let Some(script_path) = cli.script_path else {
        error!("script path required");
        print_help();
        std::process::exit(1);
    };

    let mut registry = PluginRegistry::new();
    registry.set_default_reload(!cli.no_reload);
    for dir in cli.plugin_dirs {
        registry.add_search_path(dir);
    }
    registry.discover()?;

    let manager = LifecycleManager::new("launch");
    let mut consumer = LogRunner;

    let script_path = std::fs::canonicalize(&script_path).unwrap_or(script_path);
    let code = match launch(&manager, &registry, &mut consumer, &script_path, &cli.options) {
        Ok(code) => code,
        Err(e) => {
            error!(error = %e, "launch failed");
            1
        }
    };

    let code = exit_with(code, cli.options.no_exit);
    info!(code, "reentrant run complete, host process stays alive");
    std::process::exit(code)
}
