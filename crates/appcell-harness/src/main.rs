//! `appcell-sim`: replay app cell sessions and inspect the state table

use anyhow::Context;
use appcell_core::{app_states, init_tracing, LogFormat};
use appcell_fsm::StateKey;
use appcell_harness::{run_script, Script, DEMO_SCRIPT};
use clap::{Arg, ArgAction, ArgMatches, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Command::new("appcell-sim")
        .version(env!("CARGO_PKG_VERSION"))
        .about("App cell state machine simulator")
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON lines"),
        )
        .subcommand(
            Command::new("replay")
                .about("Replay a recorded cell session")
                .arg(
                    Arg::new("script")
                        .long("script")
                        .required(true)
                        .help("Path to a JSON session script"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Output the report as JSON"),
                ),
        )
        .subcommand(
            Command::new("demo")
                .about("Replay the built-in happy-path session")
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Output the report as JSON"),
                ),
        )
        .subcommand(Command::new("states").about("Print the app cell state table"));

    let matches = cli.get_matches();
    let format = if matches.get_flag("log-json") {
        LogFormat::Json
    } else {
        LogFormat::Pretty
    };
    init_tracing("warn", format);

    match matches.subcommand() {
        Some(("replay", args)) => {
            let path = args
                .get_one::<String>("script")
                .context("--script is required")?;
            replay(Script::from_path(path)?, args).await
        }
        Some(("demo", args)) => {
            replay(Script::from_json(DEMO_SCRIPT).context("parsing demo script")?, args).await
        }
        Some(("states", _)) => {
            print_states();
            Ok(())
        }
        _ => {
            println!("Nothing to do; see --help");
            Ok(())
        }
    }
}

async fn replay(script: Script, args: &ArgMatches) -> anyhow::Result<()> {
    let report = run_script(script).await?;

    if args.get_flag("json") {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", report.generate_text());
    }

    if !report.passed() {
        std::process::exit(1);
    }
    Ok(())
}

fn print_states() {
    for definition in app_states() {
        println!("{}", definition.state.tag());
        let next: Vec<String> = definition.next.iter().map(|s| s.tag().to_string()).collect();
        println!("  next:   {}", next.join(", "));
        for message in &definition.on.enter {
            println!("  enter:  {}", message.kind);
        }
        for message in &definition.on.resume {
            println!("  resume: {}", message.kind);
        }
    }
}
