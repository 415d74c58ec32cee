use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use bridgekit::bridge::{ChannelCallback, Outcome};
use clap::{Parser, Subcommand};
use owo_colors::OwoColorize;
use serde_json::Value;

mod sim;

use sim::{Host, Settings};

#[derive(Parser)]
#[command(name = "bridgekit")]
#[command(about = "Drive bridgekit plugins against a simulated host", long_about = None)]
struct Cli {
    /// Refuse every permission prompt
    #[arg(long, global = true)]
    deny: bool,

    /// Text the simulated QR scanner reads
    #[arg(long, global = true, default_value = "https://example.com/qr")]
    scan: String,

    /// Back out of the QR scanner instead of reading anything
    #[arg(long, global = true)]
    cancel_scan: bool,

    /// Directory downloads are saved into
    #[arg(long, global = true)]
    files_dir: Option<PathBuf>,

    /// Seconds to wait for each reply
    #[arg(long, global = true, default_value_t = 30)]
    timeout: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the registered plugins
    Plugins,
    /// Run one bridge call
    Call {
        /// Plugin name, e.g. QXBasePlugin
        plugin: String,
        /// Method name, e.g. getDeviceInfo
        method: String,
        /// JSON params
        #[arg(default_value = "{}")]
        params: String,
    },
    /// Run bridge calls from a file (`-` for stdin), one per line:
    /// `<plugin> <method> [params]`, or `wait <ms>` to let events arrive
    Script {
        /// Script path
        path: PathBuf,
    },
}

/// One line of a script.
#[derive(Debug, PartialEq, Eq)]
enum Step {
    Call {
        plugin: String,
        method: String,
        params: String,
    },
    Wait(Duration),
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let settings = Settings {
        deny: cli.deny,
        scan_text: (!cli.cancel_scan).then(|| cli.scan.clone()),
        files_dir: cli.files_dir.clone(),
    };
    let host = sim::host(&settings)?;
    let timeout = Duration::from_secs(cli.timeout);

    match cli.command {
        Commands::Plugins => {
            for name in host.bridge.plugin_names() {
                println!("{}", name.bold());
            }
            Ok(())
        }
        Commands::Call {
            plugin,
            method,
            params,
        } => {
            if call(&host, &plugin, &method, &params, timeout).await? {
                Ok(())
            } else {
                bail!("{plugin}.{method} failed")
            }
        }
        Commands::Script { path } => run_script(&host, &path, timeout).await,
    }
}

async fn run_script(host: &Host, path: &Path, timeout: Duration) -> Result<()> {
    let source = if path.as_os_str() == "-" {
        let mut source = String::new();
        std::io::stdin()
            .read_to_string(&mut source)
            .context("Failed to read script from stdin")?;
        source
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read script {}", path.display()))?
    };

    let mut failures = 0_usize;
    for (number, line) in source.lines().enumerate() {
        let step = parse_step(line).with_context(|| format!("line {}", number + 1))?;
        match step {
            None => {}
            Some(Step::Wait(duration)) => pump(host, duration).await,
            Some(Step::Call {
                plugin,
                method,
                params,
            }) => {
                if !call(host, &plugin, &method, &params, timeout).await? {
                    failures += 1;
                }
            }
        }
    }
    // Flush events still queued behind the last reply.
    host.main_loop.run_pending();

    if failures > 0 {
        bail!("{failures} call(s) failed");
    }
    println!("{}", "✅ script finished".green().bold());
    Ok(())
}

fn parse_step(line: &str) -> Result<Option<Step>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let (first, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let rest = rest.trim_start();
    let (second, params) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
    if first == "wait" {
        let millis: u64 = second
            .parse()
            .with_context(|| format!("invalid wait {second:?}"))?;
        return Ok(Some(Step::Wait(Duration::from_millis(millis))));
    }
    if second.is_empty() {
        bail!("expected `<plugin> <method> [params]`, got {line:?}");
    }
    let params = params.trim();
    Ok(Some(Step::Call {
        plugin: first.to_owned(),
        method: second.to_owned(),
        params: if params.is_empty() { "{}" } else { params }.to_owned(),
    }))
}

/// Runs one call and prints its outcome. Returns whether it succeeded.
async fn call(host: &Host, plugin: &str, method: &str, params: &str, timeout: Duration) -> Result<bool> {
    println!("{} {plugin}.{method} {params}", "→".blue().bold());
    let (callback, results) = ChannelCallback::pair();
    if !host.bridge.dispatch(plugin, method, params, callback) {
        bail!("no plugin {plugin} handling {method}");
    }

    let outcome = tokio::time::timeout(timeout, async {
        loop {
            if let Ok(outcome) = results.try_recv() {
                return Some(outcome);
            }
            if !host.main_loop.tick().await {
                return None;
            }
        }
    })
    .await
    .with_context(|| format!("{plugin}.{method} did not answer within {timeout:?}"))?;

    match outcome {
        Some(Outcome::Success(value)) => {
            println!("{} {}", "✔".green().bold(), pretty(&value));
            Ok(true)
        }
        Some(Outcome::Error(message)) => {
            let shown = serde_json::from_str::<Value>(&message)
                .map_or_else(|_| message.clone(), |value| pretty(&value));
            println!("{} {}", "✘".red().bold(), shown.red());
            Ok(false)
        }
        None => bail!("main loop closed before {plugin}.{method} answered"),
    }
}

/// Runs main-thread jobs for `duration` so pushed events get printed.
async fn pump(host: &Host, duration: Duration) {
    let _ = tokio::time::timeout(duration, async {
        while host.main_loop.tick().await {}
    })
    .await;
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}
