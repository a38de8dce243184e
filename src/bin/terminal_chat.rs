//! Interactive terminal front end over the same chat engine the API serves.
//!
//! Usage: `terminal-chat [generic|with_history|rag]`

use std::str::FromStr;

use ai_llm_service::telemetry;
use anyhow::{Context, bail};
use colored::Colorize;
use contextor::{
    ChatEngine, ChatSession, ChatVariant, ConfigPatch, ContextorError, IndicatifProgress,
    TurnDebug, TurnRole,
};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const HELP: &str = "\
/help                 this text
/clear                start the conversation over
/debug                toggle intermediate values
/history              toggle chat history
/window <n>           history window (1-50)
/chunks <n>           retrieved chunks (1-200)
/service <name>       select a search service
/model <role> <name>  role is generic, service, aggregation or summary
/config               show current controls
/log                  print the conversation
/quit                 leave";

#[derive(Debug, PartialEq)]
enum Command {
    Ask(String),
    Help,
    Clear,
    Patch(ConfigPatch),
    ToggleDebug,
    ToggleHistory,
    ShowConfig,
    ShowLog,
    Quit,
}

impl FromStr for Command {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let Some(rest) = line.strip_prefix('/') else {
            return Ok(Command::Ask(line.to_string()));
        };

        let mut parts = rest.split_whitespace();
        let name = parts.next().unwrap_or_default();
        let args: Vec<&str> = parts.collect();
        let number = |what: &str| -> Result<String, String> {
            match args.as_slice() {
                [n] => Ok(n.to_string()),
                _ => Err(format!("usage: /{what} <n>")),
            }
        };

        let cmd = match name {
            "help" | "?" => Command::Help,
            "clear" => Command::Clear,
            "debug" => Command::ToggleDebug,
            "history" => Command::ToggleHistory,
            "config" => Command::ShowConfig,
            "log" => Command::ShowLog,
            "quit" | "exit" | "q" => Command::Quit,
            "window" => {
                let n = number("window")?;
                Command::Patch(ConfigPatch {
                    num_chat_messages: Some(n.parse().map_err(|_| format!("not a number: {n}"))?),
                    ..ConfigPatch::default()
                })
            }
            "chunks" => {
                let n = number("chunks")?;
                Command::Patch(ConfigPatch {
                    num_retrieved_chunks: Some(
                        n.parse().map_err(|_| format!("not a number: {n}"))?,
                    ),
                    ..ConfigPatch::default()
                })
            }
            "service" => match args.as_slice() {
                [s] => Command::Patch(ConfigPatch {
                    selected_service: Some(s.to_string()),
                    ..ConfigPatch::default()
                }),
                _ => return Err("usage: /service <name>".into()),
            },
            "model" => {
                let [role, model] = args.as_slice() else {
                    return Err("usage: /model <role> <name>".into());
                };
                let model = Some(model.to_string());
                let mut patch = ConfigPatch::default();
                match *role {
                    "generic" => patch.model_generic = model,
                    "service" => patch.model_service = model,
                    "aggregation" => patch.model_aggregation = model,
                    "summary" => patch.model_summary = model,
                    other => return Err(format!("unknown model role: {other}")),
                }
                Command::Patch(patch)
            }
            other => return Err(format!("unknown command /{other}, try /help")),
        };
        Ok(cmd)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(telemetry::env_filter_with_level("warn", Level::WARN))
        .with(telemetry::layer())
        .init();

    let variant = match std::env::args().nth(1) {
        Some(arg) => Some(arg.parse::<ChatVariant>()?),
        None => None,
    };

    let engine = ChatEngine::from_env().context("failed to configure chat engine")?;
    let mut session = engine.new_session(variant).await?;
    print_banner(&session);
    if !session.chat_enabled() {
        bail!("no search services found; RAG chat is disabled");
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    loop {
        stdout.write_all("you> ".green().bold().to_string().as_bytes()).await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        if line.trim().is_empty() {
            continue;
        }

        let cmd = match line.parse::<Command>() {
            Ok(cmd) => cmd,
            Err(msg) => {
                println!("{}", msg.yellow());
                continue;
            }
        };

        match cmd {
            Command::Quit => break,
            Command::Help => println!("{}", HELP.bright_black()),
            Command::Clear => {
                session.clear_conversation();
                println!("{}", "conversation cleared".bright_black());
            }
            Command::ShowConfig => print_config(&session),
            Command::ShowLog => print_log(&session),
            Command::ToggleDebug => {
                let on = !session.config().debug;
                apply(&engine, &mut session, ConfigPatch {
                    debug: Some(on),
                    ..ConfigPatch::default()
                });
            }
            Command::ToggleHistory => {
                let on = !session.config().use_chat_history;
                apply(&engine, &mut session, ConfigPatch {
                    use_chat_history: Some(on),
                    ..ConfigPatch::default()
                });
            }
            Command::Patch(patch) => apply(&engine, &mut session, patch),
            Command::Ask(question) => {
                let progress = IndicatifProgress::spinner();
                match engine.ask(&mut session, &question, &progress).await {
                    Ok(outcome) => {
                        if let Some(debug) = &outcome.debug {
                            print_debug(debug);
                        }
                        println!("{} {}", "assistant>".cyan().bold(), outcome.answer);
                    }
                    Err(e) => print_error(&e),
                }
            }
        }
    }

    Ok(())
}

fn apply(engine: &ChatEngine, session: &mut ChatSession, patch: ConfigPatch) {
    match session.apply_patch(patch, engine.catalog()) {
        Ok(_) => print_config(session),
        Err(e) => print_error(&e),
    }
}

fn print_banner(session: &ChatSession) {
    println!(
        "{} {} chat, session {}",
        "cortex-chat".bold(),
        session.variant(),
        session.id()
    );
    if session.variant().supports_retrieval() {
        let names: Vec<&str> = session.services().iter().map(|s| s.name.as_str()).collect();
        println!("services: {}", names.join(", "));
    }
    println!("{}", "type /help for commands".bright_black());
}

fn print_config(session: &ChatSession) {
    let c = session.config();
    let v = session.variant();
    println!("{}", format!("debug={} models: generic={}", c.debug, c.model_generic).bright_black());
    if v.supports_history() {
        println!(
            "{}",
            format!("history={} window={}", c.use_chat_history, c.num_chat_messages).bright_black()
        );
    }
    if v.supports_retrieval() {
        println!(
            "{}",
            format!(
                "service={} chunks={} models: service={} aggregation={} summary={}",
                c.selected_service.as_deref().unwrap_or("-"),
                c.num_retrieved_chunks,
                c.model_service,
                c.model_aggregation,
                c.model_summary
            )
            .bright_black()
        );
    }
}

fn print_log(session: &ChatSession) {
    for turn in session.log().turns() {
        let label = match turn.role {
            TurnRole::User => "you>".green().bold(),
            TurnRole::Assistant => "assistant>".cyan().bold(),
        };
        println!("{label} {}", turn.content);
    }
}

fn print_debug(d: &TurnDebug) {
    let dim = |k: &str, v: &str| println!("{} {}", format!("[{k}]").magenta(), v.bright_black());
    dim("history", &d.history_len.to_string());
    if let Some(s) = &d.history_summary {
        dim("summary", s);
    }
    if let Some(q) = &d.retrieval_query {
        dim("query", q);
    }
    if let Some(c) = &d.context {
        dim("context", c);
    }
    if let Some(a) = &d.generic_answer {
        dim("generic", a);
    }
    if let Some(a) = &d.service_answer {
        dim("service", a);
    }
}

fn print_error(e: &ContextorError) {
    if e.is_upstream() {
        println!("{} {e}", "upstream error:".red().bold());
    } else {
        println!("{}", e.to_string().yellow());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_a_question() {
        assert_eq!(
            " who is Ferris? ".parse::<Command>().unwrap(),
            Command::Ask("who is Ferris?".into())
        );
    }

    #[test]
    fn numeric_controls_become_patches() {
        let Command::Patch(p) = "/window 5".parse::<Command>().unwrap() else {
            panic!("expected a patch");
        };
        assert_eq!(p.num_chat_messages, Some(5));
        assert!("/chunks x".parse::<Command>().is_err());
        assert!("/chunks".parse::<Command>().is_err());
    }

    #[test]
    fn model_command_targets_one_role() {
        let Command::Patch(p) = "/model aggregation llama3.1-8b".parse::<Command>().unwrap() else {
            panic!("expected a patch");
        };
        assert_eq!(p.model_aggregation.as_deref(), Some("llama3.1-8b"));
        assert!(p.model_generic.is_none());
        assert!("/model boss llama3.1-8b".parse::<Command>().is_err());
    }

    #[test]
    fn unknown_command_is_reported() {
        assert!("/frobnicate".parse::<Command>().is_err());
        assert_eq!("/q".parse::<Command>().unwrap(), Command::Quit);
    }
}
