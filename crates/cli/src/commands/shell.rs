//! Interactive festival shell.
//!
//! One [`SessionContext`] for the lifetime of the shell, mutated one command
//! at a time. The session snapshot is kept in `VARNOTHSAVA_STATE_FILE`, so a
//! restarted shell comes back signed in (changes made before the next
//! `login` stay on this device).
//!
//! ```text
//! vn> login asha@sode-edu.in "my password"
//! vn> register --name Asha --usn 4SO21CS001 --college SMVITM --age 19 --phone 9999999999
//! vn:K7Q2ZD> cart add tech-hackathon
//! vn:K7Q2ZD> checkout
//! vn:K7Q2ZD> join game-valorant --team "Spike Rushers" --member X7Q2ZD --member T99801
//! ```

#![allow(clippy::print_stdout)]

use std::io::Write;

use clap::{Args, Parser, Subcommand};
use secrecy::SecretString;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};

use varnothsava_client::catalog::{CatalogLoadError, load_catalog};
use varnothsava_client::config::ConfigError;
use varnothsava_client::{
    ClientConfig, FileStore, FirebaseIdentity, GatewayError, HttpProfileGateway, LoginOutcome,
    SessionContext, SessionError, StorageError,
};
use varnothsava_core::{
    CartItem, Catalog, Email, EventFilter, EventId, NewProfile, ProfileCode, ProfileSummary,
};

use super::events::print_groups;
use crate::FilterArgs;

#[derive(Debug, Error)]
pub enum ShellError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Catalog(#[from] CatalogLoadError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("Failed to read input: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Parser, Debug)]
#[command(name = "vn", no_binary_name = true, disable_version_flag = true)]
struct Line {
    #[command(subcommand)]
    command: ShellCommand,
}

#[derive(Subcommand, Debug)]
enum ShellCommand {
    /// Sign in with e-mail and password
    Login { email: String, password: String },
    /// Sign out (the cart is kept)
    Logout,
    /// Create your festival profile
    Register(RegisterArgs),
    /// Show your profile
    Whoami,
    /// Reload your profile from the server
    Refresh,
    /// List events
    Events(FilterArgs),
    /// Show or change the cart
    Cart {
        #[command(subcommand)]
        action: Option<CartAction>,
    },
    /// Pay for everything in the cart
    Checkout,
    /// Register for a single event
    Join {
        event: String,
        /// Team name; solo when omitted
        #[arg(long)]
        team: Option<String>,
        /// A teammate's profile code (repeatable)
        #[arg(long = "member", value_name = "CODE")]
        members: Vec<String>,
    },
    /// Change your avatar
    Avatar { url: String },
    /// Leave the shell
    #[command(alias = "exit")]
    Quit,
}

#[derive(Subcommand, Debug)]
enum CartAction {
    /// Add an event by id
    Add { event: String },
    /// Remove an event by id
    Remove { event: String },
    /// List the cart
    Show,
    /// Empty the cart
    Clear,
}

#[derive(Args, Debug)]
struct RegisterArgs {
    #[arg(long)]
    name: String,
    /// Defaults to the signed-in e-mail, which it must match
    #[arg(long)]
    email: Option<String>,
    /// University seat number
    #[arg(long)]
    usn: String,
    #[arg(long)]
    college: String,
    #[arg(long)]
    age: String,
    #[arg(long)]
    phone: String,
    /// Link to an uploaded ID card
    #[arg(long)]
    id_card: Option<String>,
    /// Creates the account when not signed in
    #[arg(long)]
    password: Option<String>,
}

enum Flow {
    Continue,
    Quit,
}

type Session = SessionContext<FirebaseIdentity, HttpProfileGateway, FileStore>;

struct Shell {
    session: Session,
    catalog: Catalog,
}

/// Run the shell until `quit` or end of input.
///
/// # Errors
///
/// Returns an error if the client cannot be configured or stdin fails.
/// Command failures are printed and the shell keeps going.
pub async fn run() -> Result<(), ShellError> {
    let config = ClientConfig::from_env()?;
    tracing::debug!(?config, "starting shell");

    let store = FileStore::open(&config.state_file)?;
    let identity = FirebaseIdentity::new(
        config.firebase_auth_url.clone(),
        config.firebase_api_key.clone(),
    );
    let gateway = HttpProfileGateway::new(&config.api_url)?;
    let session = SessionContext::init(identity, gateway, store, config.institution_domain)?;
    let catalog = load_catalog(config.catalog_path.as_deref())?;

    let mut shell = Shell { session, catalog };
    println!("Varnothsava shell. Type `help` for commands.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        shell.prompt()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };

        let tokens = match tokenize(&line) {
            Ok(tokens) if tokens.is_empty() => continue,
            Ok(tokens) => tokens,
            Err(e) => {
                println!("{e}");
                continue;
            }
        };
        let command = match Line::try_parse_from(tokens) {
            Ok(line) => line.command,
            Err(e) => {
                print!("{e}");
                continue;
            }
        };

        match shell.execute(command).await {
            Ok(Flow::Continue) => {}
            Ok(Flow::Quit) => break,
            Err(e) => {
                tracing::debug!(error = %e, "command failed");
                println!("{}", e.alert_message());
            }
        }
    }
    Ok(())
}

impl Shell {
    fn prompt(&self) -> std::io::Result<()> {
        match self.session.profile() {
            Some(profile) => print!("vn:{}> ", profile.profile_code),
            None => print!("vn> "),
        }
        std::io::stdout().flush()
    }

    async fn execute(&mut self, command: ShellCommand) -> Result<Flow, SessionError> {
        match command {
            ShellCommand::Login { email, password } => {
                let password = SecretString::from(password);
                match self.session.login(&email, &password).await? {
                    LoginOutcome::SignedIn => self.whoami(),
                    LoginOutcome::NeedsOnboarding => println!(
                        "Signed in. No festival profile yet: run `register` to finish onboarding."
                    ),
                }
            }
            ShellCommand::Logout => {
                self.session.logout().await?;
                println!("Signed out.");
            }
            ShellCommand::Register(args) => self.register(args).await?,
            ShellCommand::Whoami => self.whoami(),
            ShellCommand::Refresh => {
                self.session.refresh_profile().await?;
                self.whoami();
            }
            ShellCommand::Events(filter) => {
                print_groups(&self.catalog, &EventFilter::from(filter));
            }
            ShellCommand::Cart { action } => self.cart(action.unwrap_or(CartAction::Show)),
            ShellCommand::Checkout => {
                let receipt = self.session.checkout().await?;
                println!(
                    "Paid {} for {} event(s). See you at the festival!",
                    receipt.amount,
                    receipt.events.len()
                );
            }
            ShellCommand::Join {
                event,
                team,
                members,
            } => {
                let id = EventId::new(event);
                if self.catalog.get(&id).is_none() {
                    println!("Unknown event: {id}");
                } else if self.resolve_members(&members).await?.is_none() {
                    println!("Registration cancelled.");
                } else if self
                    .session
                    .register_for_event(id.clone(), team.as_deref())
                    .await?
                {
                    println!("Registered for {id}.");
                } else {
                    println!("Already registered for {id}.");
                }
            }
            ShellCommand::Avatar { url } => {
                self.session.update_avatar(url).await?;
                println!("Avatar updated.");
            }
            ShellCommand::Quit => return Ok(Flow::Quit),
        }
        Ok(Flow::Continue)
    }

    async fn register(&mut self, args: RegisterArgs) -> Result<(), SessionError> {
        let raw_email = match (args.email, self.session.identity_session()) {
            (Some(email), _) => email,
            (None, Some(auth)) => auth.email.clone(),
            (None, None) => return Err(SessionError::NotSignedIn),
        };

        let form = NewProfile {
            name: args.name,
            email: Email::parse(&raw_email)?,
            usn: args.usn,
            college_name: args.college,
            age: args.age,
            phone: args.phone,
            id_card_url: args.id_card,
        };
        let password = args.password.map(SecretString::from);

        let profile = self.session.register_user(form, password.as_ref()).await?;
        println!(
            "Registered as {} ({}). Your profile code is {}.",
            profile.name, profile.student_type, profile.profile_code
        );
        Ok(())
    }

    /// Resolve teammates' codes, printing each name.
    ///
    /// `None` when a code is malformed or unknown.
    async fn resolve_members(
        &self,
        codes: &[String],
    ) -> Result<Option<Vec<ProfileSummary>>, SessionError> {
        let mut members = Vec::with_capacity(codes.len());
        for raw in codes {
            let code = match ProfileCode::parse(raw) {
                Ok(code) => code,
                Err(e) => {
                    println!("{raw}: {e}");
                    return Ok(None);
                }
            };
            match self.session.find_member(&code).await? {
                Some(member) => {
                    println!("  {} {}", member.profile_code, member.name);
                    members.push(member);
                }
                None => {
                    println!("No participant with code {code}.");
                    return Ok(None);
                }
            }
        }
        Ok(Some(members))
    }

    fn whoami(&self) {
        let Some(profile) = self.session.profile() else {
            if self.session.needs_onboarding() {
                println!("Signed in; registration pending.");
            } else {
                println!("Not signed in.");
            }
            return;
        };

        println!("{} <{}>", profile.name, profile.email);
        println!("  code:     {}", profile.profile_code);
        println!("  college:  {} ({})", profile.college_name, profile.usn);
        println!("  student:  {}", profile.student_type);
        println!("  paid:     {}", if profile.has_paid { "yes" } else { "no" });
        println!("  avatar:   {}", profile.avatar);
        if profile.registered_events.is_empty() {
            println!("  events:   none");
        } else {
            println!("  events:");
            for event in &profile.registered_events {
                println!("    {} ({})", event.id, event.team_name);
            }
        }
    }

    fn cart(&mut self, action: CartAction) {
        match action {
            CartAction::Add { event } => {
                let id = EventId::new(event);
                match self.catalog.get(&id) {
                    None => println!("Unknown event: {id}"),
                    Some(event) => {
                        if self.session.add_to_cart(CartItem::from(event)) {
                            println!("Added {}.", event.title);
                        } else {
                            println!("{} is already in the cart.", event.title);
                        }
                    }
                }
            }
            CartAction::Remove { event } => {
                if !self.session.remove_from_cart(&EventId::new(event)) {
                    println!("Not in the cart.");
                }
            }
            CartAction::Clear => self.session.clear_cart(),
            CartAction::Show => {
                if self.session.cart().is_empty() {
                    println!("Cart is empty.");
                    return;
                }
                for item in self.session.cart() {
                    println!("  {:<26} {:<28} {:>9}", item.id.as_str(), item.title, item.fee.to_string());
                }
                println!("  total: {}", self.session.total_amount());
            }
        }
    }
}

/// Split a line into words, honouring single and double quotes.
fn tokenize(line: &str) -> Result<Vec<String>, String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut quote = None;

    for c in line.chars() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => current.push(c),
            None if c == '"' || c == '\'' => {
                quote = Some(c);
                in_token = true;
            }
            None if c.is_whitespace() => {
                if in_token {
                    tokens.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            None => {
                current.push(c);
                in_token = true;
            }
        }
    }

    if quote.is_some() {
        return Err("Unterminated quote.".to_string());
    }
    if in_token {
        tokens.push(current);
    }
    Ok(tokens)
}
