//! Note command handlers.

use std::str::FromStr;

use gitnotes_core::app::GitNotes;
use gitnotes_core::sync::{ConflictResolution, SyncStatus};

fn short_id(id: &str) -> &str {
    &id[..id.len().min(12)]
}

fn status_label(status: SyncStatus) -> &'static str {
    match status {
        SyncStatus::Synced => "synced",
        SyncStatus::Pending => "pending",
        SyncStatus::Conflicted => "conflicted",
        SyncStatus::Offline => "offline",
    }
}

/// Fetch the remote state, then list every note grouped by folder.
pub async fn list(app: &mut GitNotes) {
    app.fetch_notes().await;
    if let Some(err) = app.last_error() {
        eprintln!("Warning: {}", err);
    }

    let notes = app.notes();
    if notes.is_empty() {
        println!("No notes yet. Create one with 'gitnotes new <title>'.");
        return;
    }
    for note in notes {
        let marker = if note.synced { " " } else { "*" };
        let location = note.folder.as_deref().unwrap_or("/");
        println!(
            "{} {:12}  {:20}  {}  ({})",
            marker,
            short_id(&note.id),
            location,
            note.title,
            note.last_modified.format("%Y-%m-%d %H:%M")
        );
    }
    println!();
    println!("Status: {}", status_label(app.sync_status()));
}

/// Print a single note as markdown.
pub fn show(app: &GitNotes, id: &str) {
    match app.note(id) {
        Some(note) => {
            println!("# {}", note.title);
            println!("{}", note.content);
        }
        None => eprintln!("No note with id '{}'", id),
    }
}

/// Create a note.
pub async fn create(app: &mut GitNotes, title: &str, body: &str, folder: Option<&str>) {
    match app.create_note(title, body, folder).await {
        Some(note) => {
            println!("Created {} ({})", note.path, short_id(&note.id));
            if !note.synced {
                println!("Not pushed yet; run 'gitnotes sync' when back online.");
            }
        }
        None => eprintln!("Could not create the note."),
    }
}

/// Replace a note's content and optionally move it to another folder.
pub async fn edit(app: &mut GitNotes, id: &str, body: &str, folder: Option<&str>) {
    match app.update_note(id, body, folder).await {
        Some(note) => {
            println!("Updated {}", note.path);
            if app.sync_status() == SyncStatus::Conflicted {
                eprintln!("The note conflicts with a remote edit.");
                eprintln!("Run 'gitnotes resolve {} local|remote' to settle it.", short_id(&note.id));
            }
        }
        None => eprintln!("No note with id '{}'", id),
    }
}

/// Delete a note.
pub async fn remove(app: &mut GitNotes, id: &str) {
    if app.note(id).is_none() {
        eprintln!("No note with id '{}'", id);
        return;
    }
    app.delete_note(id).await;
    println!("Deleted.");
}

/// Create a folder.
pub async fn mkdir(app: &mut GitNotes, name: &str) {
    match app.create_folder(name).await {
        Some(folder) => println!("Created folder '{}'", folder.name),
        None => eprintln!("'{}' is not a valid folder name", name),
    }
}

/// Delete a folder and all of its notes.
pub async fn rmdir(app: &mut GitNotes, name: &str) {
    if !app.folders().iter().any(|f| f.id == name) {
        eprintln!("No folder named '{}'", name);
        return;
    }
    app.delete_folder(name).await;
    println!("Deleted folder '{}'", name);
}

/// Push everything pending.
pub async fn sync(app: &mut GitNotes) {
    app.sync_notes().await;
    match app.sync_status() {
        SyncStatus::Synced => println!("Everything is in sync."),
        SyncStatus::Pending => println!("Some changes are still pending; try again later."),
        SyncStatus::Conflicted => {
            println!("Conflicts need resolution:");
            print_conflicts(app);
        }
        SyncStatus::Offline => println!("Offline; local changes are queued."),
    }
    if let Some(err) = app.last_error() {
        eprintln!("Warning: {}", err);
    }
}

/// Settle a conflicted note.
pub async fn resolve(app: &mut GitNotes, id: &str, choice: &str) {
    let Ok(resolution) = ConflictResolution::from_str(choice) else {
        eprintln!("Expected 'local' or 'remote', got '{}'", choice);
        return;
    };
    match app.resolve_conflict(id, resolution).await {
        Some(note) if note.synced => println!("Resolved; '{}' is in sync again.", note.title),
        Some(note) => println!("'{}' is still conflicted; the remote moved again.", note.title),
        None => println!("Resolved; the note was deleted remotely and is gone."),
    }
}

/// Show the derived status and everything that still needs pushing.
pub fn status(app: &GitNotes) {
    if let Some(repo) = app.repo() {
        println!("Repository: {}", repo);
    }
    println!("Status: {}", status_label(app.sync_status()));

    let pending: Vec<_> = app.notes().into_iter().filter(|n| !n.synced).collect();
    println!(
        "{} note(s), {} folder(s), {} pending",
        app.notes().len(),
        app.folders().len(),
        pending.len()
    );
    for note in pending {
        println!("  * {} ({})", note.title, note.path);
    }
    print_conflicts(app);
    if let Some(err) = app.last_error() {
        println!("Last error: {}", err);
    }
}

fn print_conflicts(app: &GitNotes) {
    for conflict in app.conflicts() {
        println!(
            "  ! {} - local '{}' vs remote {}",
            conflict.path,
            conflict.local.title,
            short_id(&conflict.remote.sha)
        );
    }
}
