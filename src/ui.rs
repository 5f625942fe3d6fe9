// UI layer: terminal presentation for the simulator.
//
// Prompts go through `dialoguer`, colors and screen clearing through
// `crossterm`, and an `indicatif` spinner runs while a request is in
// flight. The runners in `runner` stay terminal-agnostic; this module
// provides the `Operator` and `ScriptObserver` they talk to.

use crate::api::{ApiClient, Transport, UssdResponse};
use crate::config::{Scenario, SimConfig};
use crate::error::SessionError;
use crate::runner::{
    InteractiveRunner, Operator, ScenarioReport, ScriptObserver, ScriptedRunner,
};
use crate::session::Session;
use anyhow::{Context, Result};
use crossterm::cursor::{MoveTo, Show};
use crossterm::execute;
use crossterm::style::Stylize;
use crossterm::terminal::{Clear, ClearType};
use dialoguer::{Confirm, Input};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::thread;
use std::time::Duration;

const RULE_WIDTH: usize = 60;
const MIN_PHONE_WIDTH: usize = 40;
const SESSION_ID_PREVIEW: usize = 20;

/// Selection made in the top-level menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuChoice {
    Interactive,
    /// Zero-based index into the scenario list.
    Scenario(usize),
    Quit,
}

/// `0` is the custom session, `1..=count` a scenario, `q` quits.
/// Anything else is `None` and the menu asks again.
pub fn parse_menu_choice(raw: &str, count: usize) -> Option<MenuChoice> {
    let choice = raw.trim();
    if choice.eq_ignore_ascii_case("q") {
        return Some(MenuChoice::Quit);
    }
    match choice.parse::<usize>() {
        Ok(0) => Some(MenuChoice::Interactive),
        Ok(n) if n <= count => Some(MenuChoice::Scenario(n - 1)),
        _ => None,
    }
}

/// Layout of the phone-like message box.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhoneFrame {
    /// Total width including the border characters.
    pub width: usize,
    pub lines: Vec<String>,
}

impl PhoneFrame {
    pub fn new(message: &str) -> Self {
        let lines: Vec<String> = message
            .split('\n')
            .map(|l| l.trim_end_matches('\r').to_string())
            .collect();
        let longest = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0);
        PhoneFrame {
            width: (longest + 4).max(MIN_PHONE_WIDTH),
            lines,
        }
    }

    fn padding(&self, line: &str) -> usize {
        self.width - 4 - line.chars().count()
    }

    fn border(&self, left: char, right: char) -> String {
        format!("{left}{}{right}", "─".repeat(self.width - 2))
    }

    /// Uncolored rendering, one string per terminal row.
    pub fn render_plain(&self) -> Vec<String> {
        let mut rows = vec![self.border('┌', '┐')];
        for line in &self.lines {
            rows.push(format!("│ {line}{} │", " ".repeat(self.padding(line))));
        }
        rows.push(self.border('└', '┘'));
        rows
    }
}

/// Wraps a transport with a spinner shown while the request blocks.
pub struct SpinnerTransport<'a, T: Transport + ?Sized> {
    inner: &'a T,
}

impl<'a, T: Transport + ?Sized> SpinnerTransport<'a, T> {
    pub fn new(inner: &'a T) -> Self {
        SpinnerTransport { inner }
    }
}

impl<T: Transport + ?Sized> Transport for SpinnerTransport<'_, T> {
    fn submit(&self, text: &str, session_id: &str, phone_number: &str) -> UssdResponse {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
            spinner.set_style(style);
        }
        spinner.set_message("Sending...");
        spinner.enable_steady_tick(Duration::from_millis(80));
        let resp = self.inner.submit(text, session_id, phone_number);
        spinner.finish_and_clear();
        resp
    }
}

/// True when the error chain carries an interrupted read, which is how
/// the prompt library reports Ctrl-C.
pub fn is_interrupt(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause
            .downcast_ref::<io::Error>()
            .is_some_and(|e| e.kind() == io::ErrorKind::Interrupted)
    })
}

/// Ctrl-C outside a prompt arrives as SIGINT. Treat it like quitting:
/// goodbye banner, exit 0. Prompts still report it as `Interrupted`.
pub fn install_interrupt_handler() -> Result<()> {
    ctrlc::set_handler(|| {
        let _ = execute!(io::stdout(), Show);
        print_interrupted();
        std::process::exit(0);
    })
    .context("Failed to install Ctrl-C handler")
}

pub fn clear_screen() -> Result<()> {
    execute!(io::stdout(), Clear(ClearType::All), MoveTo(0, 0)).context("Failed to clear screen")
}

pub fn print_header() -> Result<()> {
    clear_screen()?;
    let rule = "=".repeat(RULE_WIDTH);
    println!("{}", rule.as_str().bold().cyan());
    println!(
        "{}",
        "  USSD INSURANCE SERVICE - INTERACTIVE SIMULATOR".bold().cyan()
    );
    println!("{}\n", rule.as_str().bold().cyan());
    Ok(())
}

pub fn print_phone_display(resp: &UssdResponse) {
    let frame = PhoneFrame::new(&resp.message);
    println!();
    println!("{}", frame.border('┌', '┐').bold());
    for line in &frame.lines {
        println!(
            "{} {}{} {}",
            "│".bold(),
            line.as_str().green(),
            " ".repeat(frame.padding(line)),
            "│".bold()
        );
    }
    println!("{}\n", frame.border('└', '┘').bold());

    if resp.is_terminal() {
        println!("{}\n", "[Session Ended]".yellow());
    } else {
        println!("{}\n", "[Waiting for input...]".cyan());
    }
}

pub fn print_checking() {
    println!("{}", "Checking API status...".cyan());
}

pub fn print_api_ready() {
    println!("{}\n", "✓ API server is running".green());
}

/// Distinct, non-phone banner for a failed health check.
pub fn print_startup_failure(config: &SimConfig) {
    println!(
        "\n{} {}\n",
        "ERROR:".red().bold(),
        "API server is not running!".red()
    );
    println!("No healthy response from {}", config.health_url.as_str().cyan());
    println!("Please start the API server first, then run this simulator again.\n");
}

pub fn print_goodbye() {
    println!("\n{}\n", "Thank you for using the USSD Simulator!".yellow());
}

pub fn print_interrupted() {
    println!("\n\n{}\n", "Simulator interrupted. Goodbye!".yellow());
}

fn press_enter(prompt: &str) -> Result<()> {
    Input::<String>::new()
        .with_prompt(prompt)
        .allow_empty(true)
        .interact_text()?;
    Ok(())
}

fn short_id(session: &Session) -> String {
    session.id().as_str().chars().take(SESSION_ID_PREVIEW).collect()
}

/// Operator backed by the terminal.
pub struct TerminalOperator;

impl Operator for TerminalOperator {
    fn dialing(&mut self, session: &Session) -> Result<()> {
        print_header()?;
        println!("{} {}", "Phone Number:".bold(), session.phone_number().green());
        println!("{} {}\n", "Session ID:".bold(), session.id().as_str().yellow());
        println!("{}\n", format!("Dialing {}...", session.service_code()).cyan());
        thread::sleep(Duration::from_secs(1));
        Ok(())
    }

    fn show(&mut self, session: &Session) -> Result<()> {
        print_header()?;
        println!(
            "{} {}  {} {}...\n",
            "Phone:".bold(),
            session.phone_number(),
            "Session:".bold(),
            short_id(session)
        );
        if !session.history().is_empty() {
            println!(
                "{} {}\n",
                "Previous inputs:".bold(),
                session.history().join(" > ").yellow()
            );
        }
        if let Some(resp) = session.last_response() {
            print_phone_display(resp);
        }
        Ok(())
    }

    fn next_input(&mut self, _session: &Session) -> Result<String> {
        let line = Input::<String>::new()
            .with_prompt("Enter your choice (or 'q' to quit)")
            .allow_empty(true)
            .interact_text()?;
        Ok(line)
    }

    fn rejected(&mut self, error: &SessionError) -> Result<()> {
        println!("{}", error.to_string().red());
        thread::sleep(Duration::from_secs(1));
        Ok(())
    }

    fn offer_restart(&mut self, _session: &Session) -> Result<bool> {
        let rule = "─".repeat(RULE_WIDTH);
        println!("\n{}", rule.as_str().green());
        println!("{}", "Session completed!".bold());
        println!("{}\n", rule.as_str().green());
        let again = Confirm::new()
            .with_prompt("Start a new session?")
            .default(false)
            .interact()?;
        Ok(again)
    }

    fn aborted(&mut self, _session: &Session) -> Result<()> {
        println!("\n{}\n", "Exiting simulator...".yellow());
        Ok(())
    }
}

/// Observer that narrates a scripted run on the terminal.
pub struct TerminalObserver;

impl ScriptObserver for TerminalObserver {
    fn started(&mut self, scenario: &Scenario, session: &Session) -> Result<()> {
        print_header()?;
        println!("{}", format!("Running: {}", scenario.name).bold().green());
        println!("{}\n", scenario.description);
        println!("{} {}", "Phone:".bold(), session.phone_number());
        println!("{} {}\n", "Session:".bold(), session.id());
        press_enter("Press Enter to start")
    }

    fn step(&mut self, scenario: &Scenario, current: &UssdResponse, step: &str) -> Result<()> {
        print_header()?;
        println!("{}\n", format!("Running: {}", scenario.name).bold().green());
        print_phone_display(current);
        println!("{}\n", format!("→ Auto-entering: {step}").yellow());
        Ok(())
    }

    fn finished(&mut self, scenario: &Scenario, report: &ScenarioReport) -> Result<()> {
        print_header()?;
        println!(
            "{}\n",
            format!("Scenario Complete: {}", scenario.name).bold().green()
        );
        if !report.completed {
            println!(
                "{}\n",
                format!(
                    "Session ended after {} of {} steps",
                    report.submitted.len(),
                    scenario.steps.len()
                )
                .yellow()
            );
        }
        print_phone_display(&report.final_response);
        press_enter("Press Enter to continue")
    }
}

/// Show the scenario list until a valid choice is entered.
pub fn prompt_menu(scenarios: &[Scenario]) -> Result<MenuChoice> {
    loop {
        print_header()?;
        println!("{}\n", "QUICK TEST SCENARIOS".bold());
        for (i, scenario) in scenarios.iter().enumerate() {
            println!(
                "{} {}",
                format!("{}.", i + 1).green(),
                scenario.name.as_str().bold()
            );
            println!("   {}\n", scenario.description);
        }
        println!("{} {}", "0.".green(), "Custom Interactive Session".bold());
        println!("   Manually enter inputs step by step\n");

        let raw: String = Input::new()
            .with_prompt(format!(
                "Select scenario (0-{}) or 'q' to quit",
                scenarios.len()
            ))
            .allow_empty(true)
            .interact_text()?;

        match parse_menu_choice(&raw, scenarios.len()) {
            Some(choice) => return Ok(choice),
            None => {
                println!("{}", "Invalid choice. Please try again.".red());
                thread::sleep(Duration::from_secs(1));
            }
        }
    }
}

/// Top-level loop: pick a scenario or a custom session until quit.
pub fn main_menu(api: &ApiClient, config: &SimConfig) -> Result<()> {
    let transport = SpinnerTransport::new(api);
    loop {
        match prompt_menu(&config.scenarios)? {
            MenuChoice::Quit => {
                print_goodbye();
                break;
            }
            MenuChoice::Interactive => {
                InteractiveRunner::new(&transport, config).run(&mut TerminalOperator)?;
            }
            MenuChoice::Scenario(idx) => {
                let scenario = &config.scenarios[idx];
                ScriptedRunner::new(&transport, config).run(scenario, &mut TerminalObserver)?;
            }
        }
    }
    Ok(())
}
