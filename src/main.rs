use std::process::ExitCode;

use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};

use ntsh::cli::Cli;
use ntsh::console::{ConsoleOptions, TerminalConsole, DEFAULT_PROMPT};
use ntsh::protocol::ProtocolRegistry;
use ntsh::render::{spawn_render_task, Printer, Theme};
use ntsh::{telemetry, Session};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let protocol = match ProtocolRegistry::builtin().resolve(&cli.protocol) {
        Ok(protocol) => protocol,
        Err(e) => Cli::command().error(ErrorKind::InvalidValue, e).exit(),
    };

    if let Err(e) = telemetry::initialise(&cli.log_config()) {
        eprintln!("ntsh: {}", e);
        return ExitCode::FAILURE;
    }

    let mut session = match Session::builder()
        .protocol(protocol.clone())
        .read_limit(cli.read_limit)
        .connect(&cli.remote)
        .await
    {
        Ok(session) => session,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let theme = if cli.no_color {
        Theme::monochrome()
    } else {
        Theme::default()
    };
    let options = ConsoleOptions {
        prompt: DEFAULT_PROMPT.to_string(),
        theme: theme.clone(),
        tokenizer: protocol.tokenizer(),
        history: cli.history(),
    };
    let (mut input, surface) = match TerminalConsole::start(options) {
        Ok(console) => console,
        Err(e) => {
            eprintln!("ntsh: cannot set up the terminal: {}", e);
            session.close().await;
            return ExitCode::FAILURE;
        }
    };

    let (render, render_task) = spawn_render_task(
        Printer::new(theme),
        surface,
        session.config().render_config(),
    );
    let outcome = session.run(&mut input, render).await;
    drop(input);

    let rendered = match render_task.await {
        Ok(result) => result,
        Err(e) => {
            eprintln!("ntsh: render task failed: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match outcome.and(rendered) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("ntsh: {}", e);
            ExitCode::FAILURE
        }
    }
}
