use anyhow::{Context, Result};
use geminichat::ai::ProviderClient;
use geminichat::config::Config;
use geminichat::render::turn_plain_text;
use geminichat::transcript::default_save_file_name;
use geminichat::{ChatController, ThemeMode};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

const HELP: &str = "\
Commands:
  /system <text>         apply a new system instruction (resets the chat)
  /reset                 reset the conversation
  /attach <path> [text]  send a file with an optional message
  /save [path]           save the conversation as JSON
  /load <path>           load a saved conversation
  /export <path>         write the sanitized HTML transcript
  /markdown              print the Markdown transcript
  /theme light|dark      switch the HTML theme
  /help                  show this help
  /quit                  exit
Anything else is sent to the model.";

fn load_dotenv() {
    // A missing .env is fine; the environment may already be configured
    if let Err(err) = dotenvy::dotenv()
        && !err.not_found()
    {
        eprintln!("failed to read .env: {err}");
    }
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("geminichat=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

enum Command<'a> {
    System(&'a str),
    Reset,
    Attach { path: &'a str, text: &'a str },
    Save(Option<&'a str>),
    Load(&'a str),
    Export(&'a str),
    Markdown,
    Theme(&'a str),
    Help,
    Quit,
    Message(&'a str),
}

impl<'a> Command<'a> {
    fn parse(line: &'a str) -> Command<'a> {
        let trimmed = line.trim();
        let Some(rest) = trimmed.strip_prefix('/') else {
            return Command::Message(trimmed);
        };
        let (name, args) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
        let args = args.trim();
        match name {
            "system" => Command::System(args),
            "reset" => Command::Reset,
            "attach" => {
                let (path, text) = args.split_once(char::is_whitespace).unwrap_or((args, ""));
                Command::Attach {
                    path,
                    text: text.trim(),
                }
            }
            "save" => Command::Save((!args.is_empty()).then_some(args)),
            "load" => Command::Load(args),
            "export" => Command::Export(args),
            "markdown" => Command::Markdown,
            "theme" => Command::Theme(args),
            "help" => Command::Help,
            "quit" | "exit" => Command::Quit,
            _ => Command::Message(trimmed),
        }
    }
}

/// Prints the turns appended since the last call.
struct TurnPrinter {
    printed: usize,
}

impl TurnPrinter {
    fn flush(&mut self, controller: &ChatController) {
        for turn in controller.store().turns().iter().skip(self.printed) {
            println!("{}", turn_plain_text(turn));
        }
        self.printed = controller.store().turns().len();
    }

    /// The transcript was rebuilt; print it from the top.
    fn rewind(&mut self) {
        self.printed = 0;
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    load_dotenv();
    init_tracing();

    let config = Config::from_env();
    let backend = ProviderClient::from_env().context("failed to configure an AI provider")?;
    tracing::info!(save_dir = %config.save_dir.display(), "starting chat");
    let mut controller = ChatController::new(config, Arc::new(backend));
    let mut printer = TurnPrinter { printed: 0 };

    println!("{HELP}");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match Command::parse(&line) {
            Command::Message(text) => {
                controller.send_text(text).await;
            }
            Command::Attach { path, text } => {
                controller.send_attachment(&PathBuf::from(path), text).await;
            }
            Command::System(instruction) => {
                controller.apply_system_instruction(instruction);
                printer.rewind();
            }
            Command::Reset => {
                controller.reset();
                printer.rewind();
            }
            Command::Save(path) => {
                let path = path
                    .map(PathBuf::from)
                    .unwrap_or_else(|| controller.config().save_dir.join(default_save_file_name()));
                match controller.save(&path) {
                    Ok(()) => println!("Saved conversation to {}", path.display()),
                    Err(err) => println!("Save failed: {err}"),
                }
            }
            Command::Load(path) => match controller.load(&PathBuf::from(path)) {
                Ok(()) => printer.rewind(),
                Err(err) => println!("Load failed: {err}"),
            },
            Command::Export(path) => match controller.export_html(&PathBuf::from(path)) {
                Ok(()) => println!("Exported HTML to {path}"),
                Err(err) => println!("Export failed: {err}"),
            },
            Command::Markdown => println!("{}", controller.renderer().markdown_source()),
            Command::Theme(name) => match ThemeMode::parse(name) {
                Some(theme) => controller.set_theme(theme),
                None => println!("Unknown theme {name:?}; use light or dark"),
            },
            Command::Help => println!("{HELP}"),
            Command::Quit => break,
        }
        printer.flush(&controller);
    }

    Ok(())
}
