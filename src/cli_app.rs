//! Top-level CLI definition and dispatch.

use std::io::{self, IsTerminal};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::{Shell as CompletionShell, generate};
use colored::{Colorize, control};
use serde_json::json;
use thiserror::Error;

use employee_parity::client::TestHttpClient;
use employee_parity::core::config::Config;
use employee_parity::core::errors::EpyError;
use employee_parity::harness::{
    Action, CampaignConfig, CampaignOutcome, JsonlReporter, SequenceRunner, SubjectPair,
    TrialSubjects, fresh_seed, run_campaign,
};
use employee_parity::service::{ServeOptions, ServiceHandle, ServiceQuirks};

/// Differential model-based test harness for the employee registry contract.
#[derive(Debug, Parser)]
#[command(
    name = "epy",
    author,
    version,
    about = "employee-parity - differential MBT harness",
    long_about = None,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Override config file path.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Force JSON output mode.
    #[arg(long, global = true)]
    json: bool,
    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,
    /// Increase verbosity.
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,
    /// Quiet mode (errors only).
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Run a differential trial campaign against a subject pair.
    Run(RunArgs),
    /// Run one reference employee service in the foreground.
    Serve(ServeArgs),
    /// Replay the fixed smoke scenario against an embedded pair.
    Scenario,
    /// Generate shell completions.
    Completions(CompletionsArgs),
    /// Show version.
    Version,
}

#[derive(Debug, Clone, Args, Default)]
struct RunArgs {
    /// Base URL of the model (reference) subject.
    #[arg(long, value_name = "URL", conflicts_with = "embedded")]
    model_url: Option<String>,
    /// Base URL of the tested (candidate) subject.
    #[arg(long, value_name = "URL", conflicts_with = "embedded")]
    tested_url: Option<String>,
    /// Spawn an embedded reference pair instead of targeting URLs.
    /// Gives each trial (and each shrink replay) a fresh subject pair.
    #[arg(long)]
    embedded: bool,
    /// Number of generated sequences to replay.
    #[arg(long, value_name = "N")]
    trials: Option<u32>,
    /// Upper bound on actions per sequence.
    #[arg(long, value_name = "N")]
    max_actions: Option<usize>,
    /// Deterministic campaign seed.
    #[arg(long, value_name = "SEED")]
    seed: Option<u64>,
    /// Append one JSONL record per executed sequence to this path.
    #[arg(long, value_name = "PATH")]
    report: Option<PathBuf>,
    /// Embedded only: tested subject matches departments case-sensitively.
    #[arg(long, requires = "embedded")]
    quirk_case_sensitive_department: bool,
    /// Embedded only: tested subject acknowledges updates without persisting.
    #[arg(long, requires = "embedded")]
    quirk_drop_update_writes: bool,
    /// Embedded only: tested subject lowercases the duplicate-create message.
    #[arg(long, requires = "embedded")]
    quirk_lowercase_conflict_message: bool,
}

impl RunArgs {
    fn tested_quirks(&self) -> ServiceQuirks {
        ServiceQuirks {
            case_sensitive_department: self.quirk_case_sensitive_department,
            drop_update_writes: self.quirk_drop_update_writes,
            lowercase_conflict_message: self.quirk_lowercase_conflict_message,
        }
    }
}

#[derive(Debug, Clone, Args)]
struct ServeArgs {
    /// Port to listen on.
    #[arg(long, default_value_t = 8080, value_name = "PORT")]
    port: u16,
    /// Address to bind.
    #[arg(long, default_value_t = IpAddr::V4(Ipv4Addr::LOCALHOST), value_name = "ADDR")]
    bind: IpAddr,
    /// File-backed store path (in-memory when omitted).
    #[arg(long, value_name = "PATH")]
    db: Option<PathBuf>,
    /// Match departments case-sensitively (contract deviation).
    #[arg(long)]
    case_sensitive_department: bool,
    /// Acknowledge updates without persisting them (contract deviation).
    #[arg(long)]
    drop_update_writes: bool,
    /// Lowercase the duplicate-create message (contract deviation).
    #[arg(long)]
    lowercase_conflict_message: bool,
}

impl ServeArgs {
    fn quirks(&self) -> ServiceQuirks {
        ServiceQuirks {
            case_sensitive_department: self.case_sensitive_department,
            drop_update_writes: self.drop_update_writes,
            lowercase_conflict_message: self.lowercase_conflict_message,
        }
    }
}

#[derive(Debug, Clone, Args)]
struct CompletionsArgs {
    /// Target shell.
    #[arg(value_enum)]
    shell: CompletionShell,
}

/// CLI-level errors; a found divergence is an unsuccessful exit, not a
/// harness failure.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Harness(#[from] EpyError),
    #[error("divergence detected between model and tested subjects")]
    DivergenceFound,
}

/// Entry point called from `main`.
pub fn run(cli: &Cli) -> Result<(), CliError> {
    if cli.no_color || !io::stdout().is_terminal() {
        control::set_override(false);
    }
    match &cli.command {
        Command::Run(args) => run_trials(cli, args),
        Command::Serve(args) => serve(cli, args),
        Command::Scenario => scenario(cli),
        Command::Completions(args) => {
            generate(args.shell, &mut Cli::command(), "epy", &mut io::stdout());
            Ok(())
        }
        Command::Version => {
            if cli.json {
                println!(
                    "{}",
                    json!({ "name": "epy", "version": env!("CARGO_PKG_VERSION") })
                );
            } else {
                println!("epy {}", env!("CARGO_PKG_VERSION"));
            }
            Ok(())
        }
    }
}

fn effective_config(cli: &Cli, args: &RunArgs) -> Result<Config, EpyError> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(url) = &args.model_url {
        config.subjects.model_url.clone_from(url);
    }
    if let Some(url) = &args.tested_url {
        config.subjects.tested_url.clone_from(url);
    }
    if let Some(trials) = args.trials {
        config.trials.trials = trials;
    }
    if let Some(max_actions) = args.max_actions {
        config.trials.max_actions = max_actions;
    }
    if let Some(seed) = args.seed {
        config.trials.seed = Some(seed);
    }
    if let Some(report) = &args.report {
        config.report.jsonl_path = Some(report.clone());
    }
    if cli.quiet {
        config.http.log_calls = false;
    }
    config.validate()?;
    Ok(config)
}

fn run_trials(cli: &Cli, args: &RunArgs) -> Result<(), CliError> {
    let config = effective_config(cli, args)?;
    let seed = config.trials.seed.unwrap_or_else(fresh_seed);
    let campaign = CampaignConfig {
        trials: config.trials.trials,
        max_actions: config.trials.max_actions,
        seed,
    };
    let reporter = config.report.jsonl_path.clone().map(JsonlReporter::new);

    if cli.verbose {
        let hash = config.stable_hash()?;
        eprintln!(
            "campaign: {} trials, up to {} actions, seed {seed}, config {hash}",
            campaign.trials, campaign.max_actions
        );
    }

    let outcome = if args.embedded {
        let http = config.http.clone();
        let tested_quirks = args.tested_quirks();
        run_campaign(
            &campaign,
            move || {
                let model = ServiceHandle::spawn(ServiceQuirks::none())?;
                let tested = ServiceHandle::spawn(tested_quirks)?;
                let pair = SubjectPair {
                    model: TestHttpClient::new("model", &model.base_url(), &http)?,
                    tested: TestHttpClient::new("tested", &tested.base_url(), &http)?,
                };
                Ok(TrialSubjects::new(pair)
                    .with_guard(Box::new(model))
                    .with_guard(Box::new(tested)))
            },
            reporter.as_ref(),
        )?
    } else {
        let subjects = config.subjects.clone();
        let http = config.http.clone();
        run_campaign(
            &campaign,
            move || {
                Ok(TrialSubjects::new(SubjectPair {
                    model: TestHttpClient::new(
                        subjects.model_name.clone(),
                        &subjects.model_url,
                        &http,
                    )?,
                    tested: TestHttpClient::new(
                        subjects.tested_name.clone(),
                        &subjects.tested_url,
                        &http,
                    )?,
                }))
            },
            reporter.as_ref(),
        )?
    };

    render_outcome(cli, &outcome, seed)
}

fn render_outcome(cli: &Cli, outcome: &CampaignOutcome, seed: u64) -> Result<(), CliError> {
    match outcome {
        CampaignOutcome::Clean { trials } => {
            if cli.json {
                let rendered = serde_json::to_string_pretty(&json!({
                    "outcome": "clean",
                    "trials": trials,
                    "seed": seed,
                }))
                .map_err(EpyError::from)?;
                println!("{rendered}");
            } else if !cli.quiet {
                println!(
                    "{} {trials} trials, no divergence (seed {seed})",
                    "PASS".green().bold()
                );
            }
            Ok(())
        }
        CampaignOutcome::Divergent {
            minimal_sequence,
            divergence,
            reason,
        } => {
            if cli.json {
                let rendered = serde_json::to_string_pretty(&json!({
                    "outcome": "divergent",
                    "seed": seed,
                    "minimal_sequence": minimal_sequence,
                    "divergence": divergence,
                    "reason": reason,
                }))
                .map_err(EpyError::from)?;
                println!("{rendered}");
            } else {
                println!(
                    "{} divergence, shrunk to {} action(s) (seed {seed})",
                    "FAIL".red().bold(),
                    minimal_sequence.len()
                );
                for (index, action) in minimal_sequence.iter().enumerate() {
                    println!("  {:>2}. {action}", index + 1);
                }
                match divergence {
                    Some(divergence) => println!("  -> {divergence}"),
                    None => println!("  -> {reason}"),
                }
            }
            Err(CliError::DivergenceFound)
        }
    }
}

fn serve(cli: &Cli, args: &ServeArgs) -> Result<(), CliError> {
    let quirks = args.quirks();
    let handle = ServiceHandle::spawn_with(ServeOptions {
        bind_addr: SocketAddr::new(args.bind, args.port),
        db_path: args.db.clone(),
        quirks,
        shutdown_on_ctrl_c: true,
    })?;
    if !cli.quiet {
        println!("employee service listening on {}", handle.base_url());
        if !quirks.is_faithful() {
            println!(
                "{}",
                "warning: quirks enabled, this instance deviates from the contract".yellow()
            );
        }
    }
    handle.wait();
    Ok(())
}

fn scenario(cli: &Cli) -> Result<(), CliError> {
    let config = Config::load(cli.config.as_deref())?;
    let mut http = config.http;
    if cli.quiet {
        http.log_calls = false;
    }

    let model = ServiceHandle::spawn(ServiceQuirks::none())?;
    let tested = ServiceHandle::spawn(ServiceQuirks::none())?;
    let pair = SubjectPair {
        model: TestHttpClient::new("model", &model.base_url(), &http)?,
        tested: TestHttpClient::new("tested", &tested.base_url(), &http)?,
    };

    let actions = scenario_actions();
    let mut runner = SequenceRunner::new(pair);
    let report = runner.run_sequence(&actions)?;

    match &report.divergence {
        None => {
            if !cli.quiet {
                println!(
                    "{} scenario completed, {} action(s)",
                    "PASS".green().bold(),
                    report.executed_actions
                );
            }
            Ok(())
        }
        Some(divergence) => {
            println!("{} {divergence}", "FAIL".red().bold());
            Err(CliError::DivergenceFound)
        }
    }
}

/// The fixed create/read/update/duplicate smoke sequence.
fn scenario_actions() -> Vec<Action> {
    vec![
        Action::Create {
            employee_no: "HR-7".to_string(),
            name: "Ann".to_string(),
        },
        Action::GetOne {
            employee_no: "HR-7".to_string(),
        },
        Action::Update {
            employee_no: "HR-7".to_string(),
            new_name: "Anna".to_string(),
        },
        Action::GetOne {
            employee_no: "HR-7".to_string(),
        },
        Action::Create {
            employee_no: "HR-7".to_string(),
            name: "Bob".to_string(),
        },
    ]
}
