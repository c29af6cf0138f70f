//! Command-line argument parsing and dispatch.

mod notes;

use clap::{Parser, Subcommand};

use gitnotes_core::app::GitNotes;
use gitnotes_core::auth::{RepoSelection, Session};
use gitnotes_core::config::Config;

#[derive(Parser)]
#[command(name = "gitnotes", version, about = "Offline-first markdown notes synced to a GitHub repository")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Store an access token for the remote repository
    Login {
        /// Personal access token (or OAuth token) with repo scope
        token: String,
    },
    /// Select the notes repository (owner/name)
    Repo {
        /// Repository slug, e.g. alice/notes
        slug: String,
        /// Branch the notes live on
        #[arg(long, default_value = "main")]
        branch: String,
    },
    /// Fetch the remote state and list all notes
    List,
    /// Print a single note
    Show {
        /// Note id
        id: String,
    },
    /// Create a note
    New {
        /// Note title
        title: String,
        /// Note body
        #[arg(short, long, default_value = "")]
        message: String,
        /// Folder to create the note in
        #[arg(long)]
        folder: Option<String>,
    },
    /// Replace a note's content (and optionally move it)
    Edit {
        /// Note id
        id: String,
        /// New note body
        #[arg(short, long)]
        message: String,
        /// Target folder (omit to move to the repository root)
        #[arg(long)]
        folder: Option<String>,
    },
    /// Delete a note
    Rm {
        /// Note id
        id: String,
    },
    /// Create a folder
    Mkdir {
        /// Folder name
        name: String,
    },
    /// Delete a folder and all notes in it
    Rmdir {
        /// Folder name
        name: String,
    },
    /// Push all pending local changes
    Sync,
    /// Settle a conflicted note
    Resolve {
        /// Note id
        id: String,
        /// "local" to keep your version, "remote" to take theirs
        choice: String,
    },
    /// Show sync status and pending work
    Status,
}

/// Entry point: parse arguments and dispatch.
pub async fn run() {
    env_logger::init();
    let cli = Cli::parse();

    let mut config = match Config::load() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Warning: could not read config: {}", err);
            Config::default()
        }
    };

    match cli.command {
        Command::Login { token } => {
            config.access_token = Some(token);
            match config.save() {
                Ok(()) => println!("Token saved."),
                Err(err) => eprintln!("Could not save config: {}", err),
            }
        }
        Command::Repo { slug, branch } => match RepoSelection::parse(&slug) {
            Some(repo) => {
                let repo = repo.with_branch(branch);
                config.set_repo(&repo);
                match config.save() {
                    Ok(()) => println!("Selected {}.", repo),
                    Err(err) => eprintln!("Could not save config: {}", err),
                }
            }
            None => eprintln!("Expected a repository slug like owner/name, got '{}'", slug),
        },
        command => {
            let Some(mut app) = open_app(&config) else {
                return;
            };
            match command {
                Command::List => notes::list(&mut app).await,
                Command::Show { id } => notes::show(&app, &id),
                Command::New {
                    title,
                    message,
                    folder,
                } => notes::create(&mut app, &title, &message, folder.as_deref()).await,
                Command::Edit {
                    id,
                    message,
                    folder,
                } => notes::edit(&mut app, &id, &message, folder.as_deref()).await,
                Command::Rm { id } => notes::remove(&mut app, &id).await,
                Command::Mkdir { name } => notes::mkdir(&mut app, &name).await,
                Command::Rmdir { name } => notes::rmdir(&mut app, &name).await,
                Command::Sync => notes::sync(&mut app).await,
                Command::Resolve { id, choice } => notes::resolve(&mut app, &id, &choice).await,
                Command::Status => notes::status(&app),
                Command::Login { .. } | Command::Repo { .. } => unreachable!(),
            }
        }
    }
}

/// Build the application from config, or explain what is missing.
fn open_app(config: &Config) -> Option<GitNotes> {
    let token = config
        .access_token
        .clone()
        .or_else(|| std::env::var("GITHUB_TOKEN").ok());
    let Some(token) = token else {
        eprintln!("No access token configured.");
        eprintln!();
        eprintln!("Run 'gitnotes login <TOKEN>' or set GITHUB_TOKEN.");
        return None;
    };
    let Some(repo) = config.repo() else {
        eprintln!("No repository selected.");
        eprintln!();
        eprintln!("Run 'gitnotes repo <owner/name>' first.");
        return None;
    };

    let mut app = GitNotes::new(Session::new(token));
    app.select_repository(repo);
    Some(app)
}
