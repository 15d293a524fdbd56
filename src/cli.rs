//! endpointer - CLI for the Endpointer route index
//!
//! Scans a workspace for `ENDPOINTER` tag comments and shows how frontend
//! calls line up with backend routes.
//!
//! # Usage
//!
//! ```bash
//! # Show the route tree
//! endpointer routes --workspace /path/to/repo
//!
//! # List frontend calls that hit no known route
//! endpointer calls --unresolved
//!
//! # Links for one file, as an editor would render them
//! endpointer links web/src/api.ts --json
//!
//! # Fail CI when handlers or fetch calls are untagged
//! endpointer check --route-suffix .handler.ts
//! ```
//!
//! - `--json` flag outputs machine-readable JSON
//! - Errors go to stderr, results to stdout
//! - Exit codes: 0 = success, 1 = error or failed check

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use endpointer::config::{config_path, load_config, save_config, try_load_config};
use endpointer::lint::{CoverageChecker, CoverageReport, DEFAULT_LOOKBACK};
use endpointer::scanner::resolve_folder;
use endpointer::tags::{TagKind, template};
use endpointer::tree::OutlineItem;
use endpointer::watch::{DEFAULT_DEBOUNCE, RescanWatcher, WatchEvent};
use endpointer::{EndpointerConfig, EndpointerState, LinkSpan, LocatorCodec, SourceLocator};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Parser)]
#[command(name = "endpointer")]
#[command(version)]
#[command(about = "Endpointer - link frontend API calls to backend routes via tagged comments")]
#[command(long_about = r#"
endpointer indexes ENDPOINTER tag comments:

  // ENDPOINTER <backend> method: "GET", endpoint: "/users"
  // ENDPOINTER <frontend> method: "GET", endpoint: "/users"

It provides:
  - A route tree grouped by URL path segment
  - Frontend call listing with backend resolution
  - Per-file link spans for editor integrations
  - Coverage checks for untagged handlers and fetch calls

Configuration lives in .endpointer/config.json in the first workspace folder.
"#)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Workspace folder(s) to scan
    #[arg(short, long = "workspace", global = true, default_value = ".")]
    workspaces: Vec<PathBuf>,

    /// Output JSON instead of human-readable text
    #[arg(long, global = true)]
    json: bool,

    /// URL scheme used for encoded locators
    #[arg(long, global = true, default_value = endpointer::locator::DEFAULT_SCHEME)]
    scheme: String,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan the workspace and report counts
    Scan,

    /// Show backend routes as a path-segment tree
    Routes,

    /// List frontend calls and the route each resolves to
    Calls {
        /// Only show calls with no matching backend route
        #[arg(long)]
        unresolved: bool,

        /// Apply the config's frontend include rules
        #[arg(long)]
        filtered: bool,
    },

    /// Show link spans for the frontend tags in one file
    Links {
        /// File to project
        file: PathBuf,
    },

    /// Decode a locator string and re-encode it
    Locate {
        /// Locator, e.g. vscode://file/src/api.ts:12 or src/api.ts:12
        locator: String,
    },

    /// Check tag coverage and cross-reference health
    Check {
        /// File-name suffix of route handler files that must carry a backend tag
        #[arg(long)]
        route_suffix: Option<String>,

        /// Substring marking an API call line (repeatable)
        #[arg(long = "marker", default_value = "fetch(")]
        markers: Vec<String>,

        /// Skip the untagged call check
        #[arg(long)]
        no_call_check: bool,

        /// Workspace-relative directory to skip (repeatable)
        #[arg(long = "exclude-dir")]
        exclude_dirs: Vec<String>,

        /// Lines above a call where its frontend tag may sit
        #[arg(long, default_value_t = DEFAULT_LOOKBACK)]
        lookback: usize,
    },

    /// Print a tag comment to paste into source
    Template {
        /// backend or frontend
        kind: TagKind,

        #[arg(long, default_value = "GET")]
        method: String,

        #[arg(long, default_value = "/api/endpoint")]
        endpoint: String,
    },

    /// Create the workspace config file if missing
    Init,

    /// Rescan whenever files change
    Watch {
        /// Debounce window in milliseconds
        #[arg(long, default_value_t = DEFAULT_DEBOUNCE.as_millis() as u64)]
        debounce_ms: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging (only to stderr to keep stdout clean)
    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    let workspaces: Vec<PathBuf> = cli.workspaces.iter().map(|w| resolve_folder(w)).collect();

    match run_command(&cli, &workspaces).await {
        Ok(output) => {
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&output)?);
            } else {
                print_human_readable(&output);
            }
            if let Output::Check { report } = &output {
                if !report.is_clean() {
                    std::process::exit(1);
                }
            }
            Ok(())
        }
        Err(e) => {
            if cli.json {
                let err = serde_json::json!({
                    "error": format!("{:#}", e)
                });
                eprintln!("{}", serde_json::to_string_pretty(&err)?);
            } else {
                eprintln!("Error: {:#}", e);
            }
            std::process::exit(1);
        }
    }
}

async fn run_command(cli: &Cli, workspaces: &[PathBuf]) -> Result<Output> {
    let codec = LocatorCodec::new(cli.scheme.clone());
    let state = EndpointerState::new(codec.clone());
    let root = workspaces
        .first()
        .cloned()
        .context("No workspace folder given")?;

    match &cli.command {
        Commands::Scan => {
            let config = load_config(&root);
            state.rescan(workspaces, &config).await?;
            let stats = state.stats();
            Ok(Output::Scan {
                workspaces: workspaces.iter().map(|w| w.display().to_string()).collect(),
                files: stats.files_scanned,
                skipped: stats.files_skipped,
                endpoints: stats.endpoints,
                routes: stats.distinct_routes,
                frontend_calls: stats.frontend_calls,
                unresolved_calls: stats.unresolved_calls,
            })
        }

        Commands::Routes => {
            let config = load_config(&root);
            state.rescan(workspaces, &config).await?;
            Ok(Output::Routes {
                routes: state.route_tree().outline(),
            })
        }

        Commands::Calls {
            unresolved,
            filtered,
        } => {
            let config = load_config(&root);
            let snapshot = state.rescan(workspaces, &config).await?;
            let filter = filtered.then_some(&config.frontend);
            let results = state
                .frontend_calls(filter)?
                .into_iter()
                .filter_map(|call| {
                    let target = snapshot
                        .index
                        .resolve_call(&call)
                        .declaration()
                        .map(|decl| codec.encode(&decl.locator));
                    if *unresolved && target.is_some() {
                        return None;
                    }
                    Some(CallResult {
                        method: call.method.clone(),
                        endpoint: call.endpoint.clone(),
                        file: call.file.display().to_string(),
                        line: call.locator.line.map(|l| l as usize + 1).unwrap_or(0),
                        target,
                    })
                })
                .collect();
            Ok(Output::Calls { results })
        }

        Commands::Links { file } => {
            let config = load_config(&root);
            state.rescan(workspaces, &config).await?;
            let text = tokio::fs::read_to_string(file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;
            Ok(Output::Links {
                file: file.display().to_string(),
                spans: state.project_decorations(&text),
            })
        }

        Commands::Locate { locator } => {
            let decoded = state.decode_locator(locator)?;
            Ok(Output::Locate {
                encoded: state.encode_locator(&decoded),
                locator: decoded,
            })
        }

        Commands::Check {
            route_suffix,
            markers,
            no_call_check,
            exclude_dirs,
            lookback,
        } => {
            let config = load_config(&root);
            let snapshot = state.rescan(workspaces, &config).await?;

            let mut checker = CoverageChecker::new().with_lookback(*lookback);
            if let Some(suffix) = route_suffix {
                checker = checker.with_route_suffix(suffix);
            }
            checker = checker.with_call_markers(if *no_call_check {
                Vec::new()
            } else {
                markers.clone()
            });
            for dir in exclude_dirs {
                checker = checker.with_exclude_dir(dir);
            }

            let report = checker.check(&root, &config, &snapshot).await?;
            Ok(Output::Check { report })
        }

        Commands::Template {
            kind,
            method,
            endpoint,
        } => Ok(Output::Template {
            text: template(*kind, method, endpoint),
        }),

        Commands::Init => {
            let path = config_path(&root);
            let created = match try_load_config(&root) {
                Ok(Some(_)) => false,
                Ok(None) => {
                    save_config(&root, &EndpointerConfig::default())?;
                    true
                }
                Err(e) => return Err(e.into()),
            };
            Ok(Output::Init {
                path: path.display().to_string(),
                created,
            })
        }

        Commands::Watch { debounce_ms } => {
            run_watch(cli, &state, workspaces, &root, Duration::from_millis(*debounce_ms)).await
        }
    }
}

async fn run_watch(
    cli: &Cli,
    state: &EndpointerState,
    workspaces: &[PathBuf],
    root: &Path,
    debounce: Duration,
) -> Result<Output> {
    let mut config = load_config(root);
    let mut watcher = RescanWatcher::new(workspaces, debounce)?;

    state.rescan(workspaces, &config).await?;
    report_generation(cli, state);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = watcher.next_event() => {
                match event {
                    Some(WatchEvent::ConfigChanged) => {
                        config = load_config(root);
                        tracing::info!("Config reloaded");
                    }
                    Some(WatchEvent::FilesChanged(paths)) => {
                        tracing::debug!("{} paths changed", paths.len());
                    }
                    None => break,
                }
                state.rescan(workspaces, &config).await?;
                report_generation(cli, state);
            }
        }
    }

    Ok(Output::Watch {
        generations: state.stats().generation,
    })
}

fn report_generation(cli: &Cli, state: &EndpointerState) {
    let stats = state.stats();
    if cli.json {
        let line = serde_json::json!({
            "generation": stats.generation,
            "endpoints": stats.endpoints,
            "frontend_calls": stats.frontend_calls,
            "unresolved_calls": stats.unresolved_calls,
        });
        println!("{}", line);
    } else {
        println!(
            "[{}] {} endpoints, {} frontend calls ({} unresolved)",
            stats.generation, stats.endpoints, stats.frontend_calls, stats.unresolved_calls
        );
    }
}

#[derive(serde::Serialize)]
#[serde(tag = "type")]
enum Output {
    Scan {
        workspaces: Vec<String>,
        files: usize,
        skipped: usize,
        endpoints: usize,
        routes: usize,
        frontend_calls: usize,
        unresolved_calls: usize,
    },
    Routes {
        routes: Vec<OutlineItem>,
    },
    Calls {
        results: Vec<CallResult>,
    },
    Links {
        file: String,
        spans: Vec<LinkSpan>,
    },
    Locate {
        locator: SourceLocator,
        encoded: String,
    },
    Check {
        report: CoverageReport,
    },
    Template {
        text: String,
    },
    Init {
        path: String,
        created: bool,
    },
    Watch {
        generations: u64,
    },
}

#[derive(serde::Serialize)]
struct CallResult {
    method: String,
    endpoint: String,
    file: String,
    line: usize,
    target: Option<String>,
}

fn print_human_readable(output: &Output) {
    match output {
        Output::Scan {
            workspaces,
            files,
            skipped,
            endpoints,
            routes,
            frontend_calls,
            unresolved_calls,
        } => {
            println!(
                "Indexed {} files ({} skipped): {} endpoints ({} routes), {} frontend calls",
                files, skipped, endpoints, routes, frontend_calls
            );
            println!("Unresolved frontend calls: {}", unresolved_calls);
            for ws in workspaces {
                println!("Workspace: {}", ws);
            }
        }
        Output::Routes { routes } => {
            if routes.is_empty() {
                println!("No routes found");
            }
            for item in routes {
                print_outline(item, 0);
            }
        }
        Output::Calls { results } => {
            println!("Found {} frontend calls:", results.len());
            for c in results {
                println!(
                    "  {} {} at {}:{} -> {}",
                    c.method,
                    c.endpoint,
                    c.file,
                    c.line,
                    c.target.as_deref().unwrap_or(endpointer::UNRESOLVED_TARGET)
                );
            }
        }
        Output::Links { file, spans } => {
            println!("{}: {} links", file, spans.len());
            for s in spans {
                println!(
                    "  line {} [{}..{}] {} {} -> {}",
                    s.line + 1,
                    s.start,
                    s.end,
                    s.method,
                    s.endpoint,
                    s.target.as_str()
                );
            }
        }
        Output::Locate { locator, encoded } => {
            println!("Path: {}", locator.path.display());
            match locator.line {
                Some(line) => println!("Line: {} (0-based)", line),
                None => println!("Line: none"),
            }
            println!("Encoded: {}", encoded);
        }
        Output::Check { report } => print_report(report),
        Output::Template { text } => println!("{}", text),
        Output::Init { path, created } => {
            if *created {
                println!("Created {}", path);
            } else {
                println!("Config already exists: {}", path);
            }
        }
        Output::Watch { generations } => {
            println!("Stopped after {} scans", generations);
        }
    }
}

fn print_outline(item: &OutlineItem, depth: usize) {
    let indent = "  ".repeat(depth);
    println!("{}{}  {}", indent, item.label, item.description);
    for child in &item.children {
        print_outline(child, depth + 1);
    }
}

fn print_report(report: &CoverageReport) {
    if !report.missing_backend_tags.is_empty() {
        println!("Route files without a backend tag:");
        for file in &report.missing_backend_tags {
            println!("  {}", file);
        }
    }
    if !report.untagged_calls.is_empty() {
        println!("API calls without a frontend tag:");
        for call in &report.untagged_calls {
            println!("  {}:{} - ext: {}", call.file, call.line, call.extension);
        }
    }
    if !report.unresolved_calls.is_empty() {
        println!("Frontend calls with no backend route:");
        for call in &report.unresolved_calls {
            println!(
                "  {} at {}:{}",
                call.label(),
                call.file.display(),
                call.locator.line.map(|l| l + 1).unwrap_or(0)
            );
        }
    }
    if !report.duplicate_declarations.is_empty() {
        println!("Duplicate backend declarations (first one wins):");
        for decl in &report.duplicate_declarations {
            println!(
                "  {} {} at {}:{}",
                decl.method,
                decl.endpoint,
                decl.file.display(),
                decl.locator.line.map(|l| l + 1).unwrap_or(0)
            );
        }
    }
    if report.is_clean() {
        println!("All checks passed");
    } else {
        println!("Total violations: {}", report.violation_count());
    }
}
