use std::sync::{Arc, Mutex, PoisonError};

use duel::prelude::*;
use duel::transport::WebSocketConnection;
use tokio::io::{AsyncBufReadExt, BufReader};

// ---------------------------------------------------------------------------
// Terminal frontend
// ---------------------------------------------------------------------------

/// Prints prompts and cues; answers come from stdin.
#[derive(Clone, Default)]
struct Console {
    pending: Arc<Mutex<Option<PromptResponder>>>,
}

impl Console {
    fn ask(&self, responder: PromptResponder) {
        *self.pending.lock().unwrap_or_else(PoisonError::into_inner) = Some(responder);
    }

    fn take(&self) -> Option<PromptResponder> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner).take()
    }
}

impl Frontend for Console {
    fn play_sound(&self, sound: &SoundId) {
        println!("  ♪ {sound}");
    }

    fn show_mulligan(&self) {
        println!("== mulligan ==");
    }

    fn show_effect_dialog(&self, dialog: EffectDialog, responder: PromptResponder) {
        println!("== {} ==\n{}\n(type `ok`)", dialog.title, dialog.message);
        self.ask(responder);
    }

    fn show_options(&self, panel: OptionPanel, responder: PromptResponder) {
        println!("== {} ({}s) ==", panel.title, panel.time_limit.as_secs());
        for option in &panel.options {
            println!("  [{}] {}", option.id, option.label);
        }
        if panel.is_mine {
            println!("(type `pick <id>`)");
            self.ask(responder);
        } else {
            println!("(waiting for {})", panel.player);
        }
    }

    fn clear_options(&self) {
        self.take();
    }

    fn open_card_selector(&self, selector: CardSelector, responder: PromptResponder) {
        println!(
            "== {} (pick {}, {}s) ==",
            selector.title,
            selector.count,
            selector.time_limit.as_secs()
        );
        for card in &selector.items {
            println!("  [{}]", card.id);
        }
        self.ask(responder);
    }

    fn offer_intercepts(&self, offer: InterceptOffer, responder: PromptResponder) {
        println!("== {} ==", offer.title.as_deref().unwrap_or("Intercept?"));
        for card in &offer.items {
            println!("  [{}]", card.id);
        }
        println!("(type `pick <id>` or `cancel`)");
        self.ask(responder);
    }

    fn select_unit(&self, selection: UnitSelection, responder: PromptResponder) {
        let verb = match selection.mode {
            SelectionMode::Target => "target",
            SelectionMode::Block => "block with",
        };
        println!("== choose a unit to {verb} ==");
        for unit in &selection.items {
            println!("  [{}]", unit.id);
        }
        if selection.is_cancelable {
            println!("(or `cancel`)");
        }
        self.ask(responder);
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Pick(Vec<String>),
    Ok,
    Cancel,
    End,
    Draw,
    Make(String),
    Drive(String),
    Quit,
}

fn parse(line: &str) -> Option<Command> {
    let mut words = line.split_whitespace();
    let command = match words.next()? {
        "pick" => Command::Pick(words.map(str::to_string).collect()),
        "ok" => Command::Ok,
        "cancel" => Command::Cancel,
        "end" => Command::End,
        "draw" => Command::Draw,
        "make" => Command::Make(words.next()?.to_string()),
        "drive" => Command::Drive(words.next()?.to_string()),
        "quit" | "exit" => Command::Quit,
        _ => return None,
    };
    Some(command)
}

async fn read_commands(console: Console, handle: ClientHandle<WebSocketConnection>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        let Some(command) = parse(&line) else {
            println!("commands: pick <id..> | ok | cancel | end | draw | make <id> | drive <id> | quit");
            continue;
        };
        match command {
            Command::Pick(ids) => match console.take() {
                Some(responder) => {
                    responder.select(ids);
                }
                None => println!("nothing to pick"),
            },
            Command::Ok => {
                if let Some(responder) = console.take() {
                    responder.select(Vec::new());
                }
            }
            Command::Cancel => {
                if let Some(responder) = console.take() {
                    responder.cancel();
                }
            }
            Command::End => {
                if !handle.end_turn().await {
                    println!("you can't act right now");
                }
            }
            Command::Draw => handle.debug_draw().await,
            Command::Make(id) => handle.debug_make(id).await,
            Command::Drive(id) => handle.debug_drive(id).await,
            Command::Quit => {
                handle.close().await;
                break;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Bootstrap
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    duel::logging::init();
    let config = ClientConfig::from_env()?;
    tracing::info!(url = %config.url(), player = %config.player_id, "starting console duel");

    let console = Console::default();
    let client = DuelClient::builder(config)
        .frontend(console.clone())
        .on_error(|notice| eprintln!("error: {}", notice.message))
        .on_warning(|notice| {
            eprintln!("{}: {}", notice.title.as_deref().unwrap_or("warning"), notice.message);
            notice.confirm();
        })
        .on_disconnect(|waiting| {
            if waiting {
                eprintln!("opponent disconnected, waiting for them to return...");
            } else {
                eprintln!("opponent is back");
            }
        })
        .navigator(|route: &str| eprintln!("leaving to {route}"))
        .connect()
        .await?;

    tokio::spawn(read_commands(console, client.handle()));
    client.run().await?;
    Ok(())
}
