// Import argument structs from the cli module
use crate::{
    cli::{DocArgs, DocCommands, NoteArgs, NoteCommands},
    AppContext,
};
use anyhow::{Context, Result};
use console::style;
use dialoguer::Confirm;
use lorekeep_core::storage::{DocumentRecord, NoteRecord};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{debug, info};

/// Line that ends a note body typed on stdin.
pub const END_OF_NOTE_MARKER: &str = "--ENDNOTE--";

// --- Handler Functions ---

pub async fn handle_doc(args: DocArgs, cx: &AppContext) -> Result<()> {
    let docs = cx.knowledge_base.documents();
    match args.command {
        DocCommands::Add { path } => {
            let path = std::path::absolute(&path).unwrap_or(path);
            let record = docs.add(&path).await?;
            println!("Document '{}' added successfully to the knowledge base.", record.original_filename);
        }
        DocCommands::List {} => {
            let records = docs.list().await?;
            if records.is_empty() {
                println!("No documents in knowledge base.");
            } else {
                println!("{}", style("Available Documents:").bold());
                print_documents(&records);
            }
        }
        DocCommands::Search { keyword } => {
            let found = docs.search(&keyword).await?;
            if found.is_empty() {
                println!("No documents found with keyword '{}'.", keyword);
            } else {
                println!("{}", style(format!("Documents containing '{}':", keyword)).bold());
                print_documents(&found);
            }
        }
        DocCommands::Show { id, content } => {
            let record = docs.get(&id).await?;
            println!("{}", style("Document Details:").bold());
            println!("  Original filename: {}", record.original_filename);
            println!("  Stored at: {}", record.stored_path.display());
            println!("  Imported: {}", record.imported_at);
            println!("  Size (bytes): {}", record.size_bytes);
            println!("  File type: {}", display_or_none(&record.file_type));
            if let Some(media_type) = record.media_type() {
                println!("  Media type: {}", media_type);
            }
            if content {
                let bytes = docs.get_content(&id).await?;
                println!();
                match String::from_utf8(bytes) {
                    Ok(text) => println!("{}", text),
                    Err(e) => println!("(binary content, {} bytes)", e.as_bytes().len()),
                }
            }
        }
        DocCommands::Path { id } => {
            println!("{}", docs.path(&id).await?.display());
        }
        DocCommands::Remove { id, yes } => {
            if !yes && !confirm(&format!("Sure you want to remove '{}'?", id))? {
                println!("Removal cancelled.");
                return Ok(());
            }
            docs.remove(&id).await?;
            println!("Document '{}' removed successfully.", id);
        }
    }
    Ok(())
}

pub async fn handle_note(args: NoteArgs, cx: &AppContext) -> Result<()> {
    let notes = cx.knowledge_base.notes();
    match args.command {
        NoteCommands::Add { title, content, file } => {
            let body = match (content, file) {
                (Some(content), _) => content,
                (None, Some(file)) => tokio::fs::read_to_string(&file)
                    .await
                    .with_context(|| format!("Cannot read note body from {}", file.display()))?,
                (None, None) => {
                    println!("Note content (type '{}' on a new line to finish):", END_OF_NOTE_MARKER);
                    read_note_body(BufReader::new(tokio::io::stdin())).await?
                }
            };
            let record = notes.add(&title, &body).await?;
            println!("Note '{}' (ID: {}) added.", record.title, record.id);
        }
        NoteCommands::List {} => {
            let records = notes.list().await?;
            if records.is_empty() {
                println!("No notes found.");
            } else {
                println!("{}", style("Available Notes:").bold());
                print_notes(&records);
            }
        }
        NoteCommands::Search { keyword } => {
            let found = notes.search(&keyword).await?;
            if found.is_empty() {
                println!("No notes found with keyword '{}'.", keyword);
            } else {
                println!("{}", style(format!("Notes containing '{}':", keyword)).bold());
                print_notes(&found);
            }
        }
        NoteCommands::Show { id } => {
            let record = notes.get(&id).await?;
            println!("{}", style(format!("--- Note: {} (ID: {}) ---", record.title, record.id)).bold());
            match notes.get_content(&id).await {
                Ok(content) => println!("{}", content),
                Err(e) => println!("Error: {}", e),
            }
            println!("{}", style("--- End of Note ---").bold());
        }
        NoteCommands::Delete { id, yes } => {
            if !yes && !confirm(&format!("Sure you want to delete note '{}'?", id))? {
                println!("Deletion cancelled.");
                return Ok(());
            }
            let record = notes.remove(&id).await?;
            println!("Note ID '{}' (Title: {}) deleted.", record.id, record.title);
        }
    }
    Ok(())
}

fn confirm(prompt: &str) -> Result<bool> {
    let answer = Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()
        .context("Confirmation prompt failed (use --yes when not running in a terminal)")?;
    debug!("Confirmation for '{}': {}", prompt, answer);
    Ok(answer)
}

/// Reads lines until EOF or [`END_OF_NOTE_MARKER`] and joins them with `\n`.
pub async fn read_note_body<R: AsyncBufRead + Unpin>(reader: R) -> Result<String> {
    let mut lines = reader.lines();
    let mut body = Vec::new();
    while let Some(line) = lines.next_line().await? {
        if line == END_OF_NOTE_MARKER {
            break;
        }
        body.push(line);
    }
    info!("Read {} line(s) of note content", body.len());
    Ok(body.join("\n"))
}

fn print_documents(records: &[DocumentRecord]) {
    for (i, record) in records.iter().enumerate() {
        println!(
            "  {}. ID: {}, Type: {}, Imported: {}",
            i + 1,
            record.original_filename,
            display_or_none(&record.file_type),
            record.imported_at
        );
    }
}

fn print_notes(records: &[NoteRecord]) {
    for (i, record) in records.iter().enumerate() {
        let created = record
            .created_at
            .map(|t| t.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        println!("  {}. ID: {}, Title: {}, Created: {}", i + 1, record.id, record.title, created);
    }
}

fn display_or_none(value: &str) -> &str {
    if value.is_empty() { "(none)" } else { value }
}
