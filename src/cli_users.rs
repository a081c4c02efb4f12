use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use jukebox_server::persistence::JsonUserStore;
use jukebox_server::user::{
    AttemptTracker, AuthManager, HashingParams, PasswordScheme, UserManager,
    DEFAULT_MIN_PASSWORD_LEN,
};

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    if path_buf.is_absolute() {
        return Ok(path_buf);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(path_buf))
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to the JSON user store.
    #[clap(value_parser = parse_path)]
    pub path: PathBuf,
}

#[derive(Parser)]
struct InnerCli {
    #[command(subcommand)]
    command: InnerCommand,
}

#[derive(Subcommand)]
enum InnerCommand {
    /// Lists every user with account type and playlist count.
    List,
    /// Registers a new user.
    Add {
        username: String,
        password: String,
        account_type: String,
    },
    /// Shows one user's account and playlists.
    Show { username: String },
    /// Reads the store and reports on its health.
    CheckStore,
    Exit,
}

struct Tools {
    store: Arc<JsonUserStore>,
    auth_manager: AuthManager,
    user_manager: UserManager,
}

impl Tools {
    fn list(&self) -> Result<()> {
        let users = self.store.load_all()?;
        for user in users.iter() {
            println!(
                "{} ({}) playlists={} following={}",
                user.username,
                user.account_type,
                user.playlists.len(),
                user.followed_users.len()
            );
        }
        println!("{} user(s)", users.len());
        Ok(())
    }

    fn add(&self, username: &str, password: &str, account_type: &str) -> Result<()> {
        let user = self.auth_manager.register(username, password, account_type)?;
        println!("Created {} account {}", user.account_type, user.username);
        Ok(())
    }

    fn show(&self, username: &str) -> Result<()> {
        let info = self.user_manager.account_info(username)?;
        println!("{}", info.to_wire_line());
        let user = self
            .user_manager
            .get_user(username)?
            .with_context(|| format!("User {} not found", username))?;
        for playlist in user.playlists.iter() {
            println!("  {}", playlist.to_wire_line(&user.username));
            for song in playlist.songs.iter() {
                println!("    {}", song.to_wire_line());
            }
        }
        if !user.followed_users.is_empty() {
            let followed: Vec<&str> = user.followed_users.iter().map(String::as_str).collect();
            println!("  following: {}", followed.join(", "));
        }
        Ok(())
    }

    fn check_store(&self) -> Result<()> {
        let users = self.store.load_all()?;
        let mut legacy = vec![];
        let mut unknown = vec![];
        for user in users.iter() {
            match PasswordScheme::detect(&user.password_hash) {
                Some(scheme) if scheme.is_current() => {}
                Some(_) => legacy.push(user.username.as_str()),
                None => unknown.push(user.username.as_str()),
            }
        }
        println!("Store: {:?}", self.store.path());
        println!(
            "Backup: {}",
            if self.store.backup_path().exists() { "present" } else { "missing" }
        );
        println!("Users: {}", users.len());
        if !legacy.is_empty() {
            println!("Legacy hashes, migrated on next login: {}", legacy.join(", "));
        }
        if !unknown.is_empty() {
            println!("Unrecognised hashes, these users cannot log in: {}", unknown.join(", "));
        }
        Ok(())
    }
}

fn main() -> Result<()> {
    let cli_args = CliArgs::parse();
    let store = Arc::new(
        JsonUserStore::open(&cli_args.path)
            .with_context(|| format!("Could not open user store {:?}", cli_args.path))?,
    );
    let tools = Tools {
        auth_manager: AuthManager::new(
            store.clone(),
            AttemptTracker::default(),
            HashingParams::default(),
            DEFAULT_MIN_PASSWORD_LEN,
        ),
        user_manager: UserManager::new(store.clone()),
        store,
    };

    let stdin = io::stdin();
    let mut reader = stdin.lock();
    loop {
        print!("> ");
        io::stdout().flush().context("Failed to flush stdout")?;

        let mut line = String::new();
        if reader.read_line(&mut line).context("Failed to read line")? == 0 {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let args = shlex::split(line)
            .unwrap_or_else(|| line.split_whitespace().map(String::from).collect());
        let cli =
            InnerCli::try_parse_from(std::iter::once(" ").chain(args.iter().map(String::as_str)));

        let result = match cli {
            Ok(cli) => match cli.command {
                InnerCommand::List => tools.list(),
                InnerCommand::Add {
                    username,
                    password,
                    account_type,
                } => tools.add(&username, &password, &account_type),
                InnerCommand::Show { username } => tools.show(&username),
                InnerCommand::CheckStore => tools.check_store(),
                InnerCommand::Exit => break,
            },
            Err(e) => {
                eprintln!("{}", e);
                continue;
            }
        };
        if let Err(err) = result {
            eprintln!("Something went wrong: {}", err);
        }
    }
    Ok(())
}
