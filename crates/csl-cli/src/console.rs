//! Line-oriented console

use crate::render;
use anyhow::{bail, Context, Result};
use csl_core::analysis::{AnalysisKind, AnalysisParams};
use csl_core::lineage::{
    MissingMethod, OutlierMethod, Preprocess, TargetType, DEFAULT_OUTLIER_THRESHOLD,
};
use csl_core::{Consilium, ConsiliumError};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

const HELP: &str = "\
commands:
  ask <question>                         ask the agent panel
  upload <path>                          upload a CSV/Excel file
  missing <method> [cols] [value]        drop|mean|median|mode|constant
  outliers <method> [cols] [threshold]   drop|clip|median_replace|zscore
  dedup [cols]                           remove duplicate rows
  convert <type> <cols>                  numeric|datetime|string|category
  analyze <kind> [key=value ...]         e.g. analyze ab-test group_column=variant ...
  codegen <instruction>                  generate preprocessing code
  exec <instruction>                     generate and run preprocessing code
  lineage                                versions of the working dataset
  timeline                               last turn's agent timeline
  reset                                  clear the conversation
  sessions                               conversations stored by the service
  resume <session-id>                    continue a stored conversation
  forget <session-id>                    delete a stored conversation
  agents                                 agent roster and status
  help | quit
(cols are comma-separated)";

/// One parsed console line
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Command {
    Ask(String),
    Upload(String),
    Preprocess(Preprocess),
    Analyze(AnalysisParams),
    Codegen(String),
    Exec(String),
    Lineage,
    Timeline,
    Reset,
    Sessions,
    Resume(String),
    Forget(String),
    Agents,
    Help,
    Quit,
    Empty,
}

fn option<T: serde::de::DeserializeOwned>(what: &str, raw: &str) -> Result<T> {
    serde_json::from_value(Value::String(raw.trim().to_ascii_lowercase()))
        .with_context(|| format!("unknown {what} `{raw}`"))
}

fn columns(raw: Option<&str>) -> Vec<String> {
    raw.map(|s| {
        s.split(',')
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

fn rest(words: &[&str]) -> Result<String> {
    let text = words.join(" ");
    if text.trim().is_empty() {
        bail!("missing argument");
    }
    Ok(text)
}

/// Parse one console line
pub(crate) fn parse(line: &str) -> Result<Command> {
    let words: Vec<&str> = line.split_whitespace().collect();
    let Some((&head, args)) = words.split_first() else {
        return Ok(Command::Empty);
    };

    let command = match head.to_ascii_lowercase().as_str() {
        "ask" => Command::Ask(rest(args)?),
        "upload" => Command::Upload(rest(args)?),
        "missing" => {
            let method: MissingMethod = option("missing method", args.first().context("missing method")?)?;
            let constant_value = args
                .get(2)
                .map(|v| v.parse::<f64>().context("constant must be a number"))
                .transpose()?;
            Command::Preprocess(Preprocess::Missing {
                columns: columns(args.get(1).copied()),
                method,
                constant_value,
            })
        }
        "outliers" => {
            let method: OutlierMethod = option("outlier method", args.first().context("missing method")?)?;
            let threshold = args
                .get(2)
                .map(|v| v.parse::<f64>().context("threshold must be a number"))
                .transpose()?
                .unwrap_or(DEFAULT_OUTLIER_THRESHOLD);
            Command::Preprocess(Preprocess::Outliers {
                columns: columns(args.get(1).copied()),
                method,
                threshold,
            })
        }
        "dedup" => Command::Preprocess(Preprocess::Dedup {
            subset: columns(args.first().copied()),
        }),
        "convert" => {
            let target: TargetType = option("target type", args.first().context("missing target type")?)?;
            Command::Preprocess(Preprocess::ConvertType {
                columns: columns(args.get(1).copied()),
                target,
            })
        }
        "analyze" => {
            let kind: AnalysisKind = args.first().context("missing analysis kind")?.parse()?;
            let pairs = args[1..]
                .iter()
                .map(|kv| {
                    kv.split_once('=')
                        .with_context(|| format!("expected key=value, got `{kv}`"))
                })
                .collect::<Result<Vec<_>>>()?;
            Command::Analyze(AnalysisParams::from_pairs(kind, &pairs)?)
        }
        "codegen" => Command::Codegen(rest(args)?),
        "exec" => Command::Exec(rest(args)?),
        "lineage" => Command::Lineage,
        "timeline" => Command::Timeline,
        "reset" => Command::Reset,
        "sessions" => Command::Sessions,
        "resume" => Command::Resume(rest(args)?),
        "forget" => Command::Forget(rest(args)?),
        "agents" => Command::Agents,
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => bail!("unknown command `{other}` (try `help`)"),
    };
    Ok(command)
}

/// Run one command; `Ok(false)` means quit
async fn execute(app: &Consilium, command: Command) -> Result<bool, ConsiliumError> {
    match command {
        Command::Empty => {}
        Command::Quit => return Ok(false),
        Command::Help => println!("{HELP}"),
        Command::Ask(query) => {
            let submission = app.ask(&query).await;
            render::turn(&app.conversation(), &submission);
        }
        Command::Upload(path) => match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let filename = std::path::Path::new(&path)
                    .file_name()
                    .map_or_else(|| path.clone(), |n| n.to_string_lossy().into_owned());
                let version = app.upload(&filename, bytes).await?;
                render::version(&version);
            }
            Err(e) => println!("cannot read {path}: {e}"),
        },
        Command::Preprocess(step) => {
            let outcome = app.preprocess(&step).await?;
            render::version(&outcome.version);
            render::json("changes", &Value::Object(outcome.changes));
        }
        Command::Analyze(params) => {
            let outcome = app.analyze(&params, None).await?;
            println!("{} [{:?}]", outcome.key, outcome.source);
            render::json("result", &outcome.result().to_value());
        }
        Command::Codegen(instruction) => {
            let generated = app.generate_code(&instruction, None).await?;
            println!("{}\n\n{}", generated.code, generated.explanation);
            for warning in &generated.warnings {
                println!("warning: {warning}");
            }
        }
        Command::Exec(instruction) => {
            let outcome = app.execute_code(&instruction).await?;
            if let Some(code) = &outcome.code {
                println!("{code}");
            }
            render::version(&outcome.version);
        }
        Command::Lineage => render::lineage(&app.lineage()?),
        Command::Timeline => render::timeline(&app.conversation()),
        Command::Reset => {
            app.reset_conversation();
            println!("conversation cleared");
        }
        Command::Sessions => render::sessions(&app.sessions().await?),
        Command::Resume(session_id) => {
            let outcome = app.restore_session(&session_id).await;
            render::restore(&app.conversation(), &outcome);
        }
        Command::Forget(session_id) => {
            app.delete_session(&session_id).await?;
            println!("session {session_id} deleted");
        }
        Command::Agents => {
            let roster = app.agents().await?;
            render::agents(&app.conversation(), &roster);
        }
    }
    Ok(true)
}

/// Read commands from stdin until `quit` or end of input
pub(crate) async fn run(app: &Consilium) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    println!("consilium {} - type `help` for commands", csl_core::VERSION);

    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let command = match parse(&line) {
            Ok(command) => command,
            Err(e) => {
                println!("error: {e:#}");
                continue;
            }
        };
        match execute(app, command).await {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) => render::error(&e),
        }
    }
    Ok(())
}
