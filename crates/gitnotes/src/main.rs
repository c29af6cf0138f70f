//! Command-line interface for GitNotes.

/// CLI module - command-line interface for gitnotes
mod cli;

#[tokio::main]
async fn main() {
    cli::run().await;
}
