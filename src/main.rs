use std::io::Write;

use anyhow::{bail, Result};
use clap::Parser;
use macshift::{
    check_privileges, BackupStore, ChangeIntent, Cli, InterfaceInventory, Inventory,
    LinkController, MacAddress, MacChangeOrchestrator, MacShiftError, Outcome,
    OrchestratorConfig, Prompt, SystemLinkController,
};

fn main() {
    let cli = Cli::parse();
    let default_filter = if cli.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    if let Err(err) = run(cli) {
        eprintln!("Error: {err}");
        for cause in err.chain().skip(1) {
            eprintln!("  -> {cause}");
        }
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let inventory = InterfaceInventory::probe()?;
    let store = BackupStore::new(BackupStore::default_dir());
    let config = OrchestratorConfig {
        privileged: check_privileges(),
        assume_yes: cli.yes,
    };

    let (intent, interface) = resolve_request(&cli, &inventory, config.privileged)?;

    let mutating = matches!(
        intent,
        ChangeIntent::SetExplicit(_) | ChangeIntent::SetRandom | ChangeIntent::Restore
    );
    let link: Box<dyn LinkController> = match SystemLinkController::probe() {
        Ok(controller) => Box::new(controller),
        Err(e) if mutating => return Err(e.into()),
        Err(_) => Box::new(LinkUnavailable),
    };

    let restoring = matches!(intent, ChangeIntent::Restore);
    let mut prompt = TerminalPrompt;
    let mut orchestrator =
        MacChangeOrchestrator::new(&inventory, link.as_ref(), &store, &mut prompt, config);
    let outcome = orchestrator.run(intent, interface.as_deref())?;
    render(&outcome, restoring);
    Ok(())
}

/// Turn flags into one intent and a selected interface, prompting where the
/// surface allows it. `--list` needs no interface; everything else resolves
/// one up front so the orchestrator can fail fast on bad names.
fn resolve_request(
    cli: &Cli,
    inventory: &InterfaceInventory,
    privileged: bool,
) -> Result<(ChangeIntent, Option<String>)> {
    if cli.list {
        return Ok((ChangeIntent::List, None));
    }

    // Mutating flags are refused up front; the interactive path is gated
    // again inside the orchestrator once the intent is known.
    if (cli.set.is_some() || cli.random || cli.restore) && !privileged {
        return Err(MacShiftError::InsufficientPrivilege {
            operation: "Changing a MAC address".to_string(),
        }
        .into());
    }

    let interface = choose_interface(inventory, cli.interface.as_deref())?;

    let intent = if cli.show {
        ChangeIntent::Show
    } else if let Some(text) = &cli.set {
        ChangeIntent::SetExplicit(text.parse::<MacAddress>()?)
    } else if cli.random {
        ChangeIntent::SetRandom
    } else if cli.restore {
        ChangeIntent::Restore
    } else {
        interactive_intent(inventory, &interface)?
    };

    Ok((intent, Some(interface)))
}

/// Use the named interface if it exists; otherwise pick the only candidate,
/// or ask the user to choose from a numbered list.
fn choose_interface(inventory: &InterfaceInventory, requested: Option<&str>) -> Result<String> {
    if let Some(name) = requested {
        inventory.current_mac(name)?;
        return Ok(name.to_string());
    }

    let interfaces = inventory.list_interfaces()?;
    if interfaces.is_empty() {
        bail!("no network interfaces found");
    }
    if interfaces.len() == 1 {
        return Ok(interfaces[0].name.clone());
    }

    println!("Available interfaces:");
    for (idx, info) in interfaces.iter().enumerate() {
        println!("  {}. {}  (MAC: {})", idx + 1, info.name, info.mac);
    }
    loop {
        let answer = read_line("Select interface by number: ")?;
        if let Ok(idx) = answer.trim().parse::<usize>() {
            if (1..=interfaces.len()).contains(&idx) {
                return Ok(interfaces[idx - 1].name.clone());
            }
        }
        println!("Invalid selection. Try again.");
    }
}

/// Interactive fallback when no verb was given: a MAC literal, `random`, or
/// `restore`. Anything else, flag-like input included, is an invalid MAC.
fn interactive_intent(inventory: &InterfaceInventory, interface: &str) -> Result<ChangeIntent> {
    let current = inventory.current_mac(interface)?;
    println!("Selected interface: {interface} (current MAC: {current})");
    let answer = read_line("Enter new MAC (or 'random' to generate, 'restore' to restore original): ")?;
    let intent = match answer.trim().to_lowercase().as_str() {
        "random" => ChangeIntent::SetRandom,
        "restore" => ChangeIntent::Restore,
        text => ChangeIntent::SetExplicit(text.parse::<MacAddress>()?),
    };
    Ok(intent)
}

fn render(outcome: &Outcome, restoring: bool) {
    match outcome {
        Outcome::Listed(interfaces) => {
            if interfaces.is_empty() {
                println!("No non-loopback interfaces found.");
                return;
            }
            println!("Interfaces and MACs:");
            for info in interfaces {
                println!("  {}: {}", info.name, info.mac);
            }
        }
        Outcome::Shown { interface, mac } => {
            println!("{interface} current MAC: {mac}");
        }
        Outcome::Applied {
            interface,
            mac,
            backup_written,
        } => {
            if restoring {
                println!("Restored original MAC for {interface}. Current: {mac}");
            } else {
                println!("MAC successfully changed for {interface}. New MAC: {mac}");
            }
            if *backup_written {
                println!("Original MAC backed up; run --restore to revert.");
            }
        }
        Outcome::Declined => {
            println!("Aborted.");
        }
    }
}

struct TerminalPrompt;

impl Prompt for TerminalPrompt {
    fn confirm(&mut self, interface: &str, target: &MacAddress) -> macshift::Result<bool> {
        let answer = read_line(&format!(
            "Apply MAC {target} to interface {interface}? [y/N]: "
        ))
        .map_err(|e| MacShiftError::Io {
            operation: "reading confirmation".to_string(),
            source: std::io::Error::other(e.to_string()),
        })?;
        Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
    }
}

/// Placeholder for read-only invocations on hosts without a link tool; any
/// attempt to use it reports the missing tool.
struct LinkUnavailable;

impl LinkController for LinkUnavailable {
    fn set_mac(&self, _interface: &str, _mac: &MacAddress) -> macshift::Result<()> {
        Err(MacShiftError::LinkToolMissing)
    }
}

fn read_line(prompt_text: &str) -> Result<String> {
    print!("{prompt_text}");
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(line)
}
