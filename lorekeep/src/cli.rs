use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Lorekeep: keep documents and notes in a local knowledge base and search them.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Root directory of the knowledge base. Defaults to the current directory.
    #[arg(long, global = true, env = "LOREKEEP_BASE_PATH")]
    pub base_path: Option<PathBuf>,

    /// Fail when a metadata index is unreadable instead of treating it as empty.
    #[arg(long, global = true, env = "LOREKEEP_STRICT_INDEX")]
    pub strict_index: bool,

    /// Increase verbosity (use multiple times for more).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage imported documents.
    Doc(DocArgs),
    /// Manage free-text notes.
    Note(NoteArgs),
}

#[derive(Args, Debug)]
pub struct DocArgs {
    #[command(subcommand)]
    pub command: DocCommands,
}

#[derive(Subcommand, Debug)]
pub enum DocCommands {
    /// Copy a file into the knowledge base.
    Add {
        /// Path of the file to import.
        path: PathBuf,
    },
    /// List all documents in the order they were added.
    List {},
    /// Find documents whose text contains a keyword (case-insensitive).
    Search {
        keyword: String,
    },
    /// Show a document's metadata.
    Show {
        /// Document ID (its original file name).
        id: String,
        /// Also print the document's content.
        #[arg(long, short)]
        content: bool,
    },
    /// Print where the stored copy of a document lives.
    Path {
        /// Document ID (its original file name).
        id: String,
    },
    /// Remove a document and its stored copy.
    Remove {
        /// Document ID (its original file name).
        id: String,
        /// Skip the confirmation prompt.
        #[arg(long, short)]
        yes: bool,
    },
}

#[derive(Args, Debug)]
pub struct NoteArgs {
    #[command(subcommand)]
    pub command: NoteCommands,
}

#[derive(Subcommand, Debug)]
pub enum NoteCommands {
    /// Create a note. Without --content or --file the body is read from stdin,
    /// up to EOF or a line containing only `--ENDNOTE--`.
    Add {
        #[arg(long, short)]
        title: String,
        /// Note body given inline.
        #[arg(long, short, conflicts_with = "file")]
        content: Option<String>,
        /// Read the note body from a file.
        #[arg(long, short)]
        file: Option<PathBuf>,
    },
    /// List all notes, newest first.
    List {},
    /// Find notes whose title or content contains a keyword (case-insensitive).
    Search {
        keyword: String,
    },
    /// Print a note.
    Show {
        id: String,
    },
    /// Delete a note.
    Delete {
        id: String,
        /// Skip the confirmation prompt.
        #[arg(long, short)]
        yes: bool,
    },
}
