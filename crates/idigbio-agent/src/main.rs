//! `idigbio-agent` - CLI and server for the iDigBio search agent
//!
//! This binary serves the agent over HTTP and runs single requests from the
//! terminal.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use anyhow::Context as _;
use clap::Parser;
use serde_json::Value;

use idigbio_agent::cli::{Cli, Command, ConfigCommand, RunCommand, ServeCommand, TranslateCommand};
use idigbio_agent::entrypoints::Entrypoint;
use idigbio_agent::response::{AgentMessage, ResponseContext};
use idigbio_agent::{init_logging, server, Config, IDigBioAgent};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Missing .env is fine.
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    init_logging(cli.verbosity());

    let config = Config::load_from(cli.config.clone()).context("loading configuration")?;

    match cli.command {
        Command::Serve(serve_cmd) => handle_serve(config, serve_cmd).await,
        Command::Card => handle_card(&config),
        Command::Run(run_cmd) => handle_run(&config, run_cmd).await,
        Command::Translate(translate_cmd) => handle_translate(&config, translate_cmd).await,
        Command::Config(config_cmd) => handle_config(&config, config_cmd),
    }
}

async fn handle_serve(mut config: Config, cmd: ServeCommand) -> anyhow::Result<()> {
    if let Some(host) = cmd.host {
        config.server.host = host;
    }
    if let Some(port) = cmd.port {
        config.server.port = port;
    }
    config.validate()?;

    let agent = IDigBioAgent::from_config(&config)?;
    server::serve(&config, agent).await?;
    Ok(())
}

fn handle_card(config: &Config) -> anyhow::Result<()> {
    let agent = IDigBioAgent::from_config(config)?;
    println!("{}", serde_json::to_string_pretty(&agent.card())?);
    Ok(())
}

async fn handle_run(config: &Config, cmd: RunCommand) -> anyhow::Result<()> {
    let agent = IDigBioAgent::from_config(config)?;
    let entrypoint = Entrypoint::from(cmd.entrypoint);
    let (context, mut rx) = ResponseContext::channel(config.server.response_buffer);

    let RunCommand { request, json, .. } = cmd;
    let runner = async move { agent.run(&context, &request, entrypoint.id(), None).await };
    let printer = async {
        while let Some(message) = rx.recv().await {
            print_message(&message, json)?;
        }
        anyhow::Ok(())
    };

    let (result, printed) = tokio::join!(runner, printer);
    result?;
    printed
}

fn print_message(message: &AgentMessage, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string(message)?);
        return Ok(());
    }

    match message {
        AgentMessage::ProcessStart { summary } => println!("== {summary}"),
        AgentMessage::ProcessLog { text, data } => {
            println!("  {text}");
            if let Some(data) = data {
                for line in serde_json::to_string_pretty(data)?.lines() {
                    println!("    {line}");
                }
            }
        }
        AgentMessage::Reply { text } => println!("{text}"),
        AgentMessage::Artifact {
            mimetype,
            description,
            uris,
            metadata,
        } => {
            println!(
                "  [artifact {mimetype}] {}",
                description.as_deref().unwrap_or("(no description)")
            );
            for uri in uris {
                println!("    {uri}");
            }
            if *metadata != Value::Null {
                println!("    {metadata}");
            }
        }
    }
    Ok(())
}

async fn handle_translate(config: &Config, cmd: TranslateCommand) -> anyhow::Result<()> {
    let translator = IDigBioAgent::translator_from_config(config)?;
    let plan = match Entrypoint::from(cmd.entrypoint) {
        Entrypoint::FindOccurrenceRecords => {
            serde_json::to_value(translator.records(&cmd.request).await?)?
        }
        Entrypoint::FindMediaRecords => serde_json::to_value(translator.media(&cmd.request).await?)?,
        Entrypoint::CountOccurrenceRecords => {
            serde_json::to_value(translator.summary(&cmd.request).await?)?
        }
    };
    println!("{}", serde_json::to_string_pretty(&plan)?);
    Ok(())
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            let config = config.redacted();
            if json {
                println!("{}", serde_json::to_string_pretty(&config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Server]");
                println!("  Bind address:       {}", config.bind_address());
                println!("  Response buffer:    {}", config.server.response_buffer);
                println!();
                println!("[Translator]");
                println!("  Backend:            {:?}", config.translator.backend);
                println!();
                println!("[LLM]");
                println!("  Base URL:           {}", config.llm.base_url);
                println!("  Model:              {}", config.llm.model);
                println!(
                    "  API key:            {}",
                    config.llm.api_key.as_deref().unwrap_or("(not set)")
                );
                println!("  Temperature:        {}", config.llm.temperature);
                println!("  Max attempts:       {}", config.llm.max_attempts);
                println!("  Timeout (secs):     {}", config.llm.timeout_secs);
                println!();
                println!("[iDigBio]");
                println!("  Search API:         {}", config.idigbio.search_url);
                println!("  Portal:             {}", config.idigbio.portal_url);
                println!("  Timeout (secs):     {}", config.idigbio.timeout_secs);
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => println!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}
