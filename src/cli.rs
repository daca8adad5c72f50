use anyhow::Result;
use clap::{Args, Parser, Subcommand};

use crate::commands::{self, CommandReport};
use crate::zib::index::FragmentEdit;

#[derive(Debug, Parser)]
#[command(name = "zibaldone")]
#[command(version, about = "Manage book manuscripts and render them to HTML", long_about = None)]
struct Cli {
    /// Print the command report as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Show resolved paths, effective config and store health
    Status,
    /// Create a book with its directory layout
    BookCreate {
        title: String,
    },
    BookList,
    /// Show a book and whether its index matches the manuscript
    BookShow {
        book_id: u64,
    },
    /// Change a book's title and move its directory to match
    BookRename {
        book_id: u64,
        title: String,
    },
    /// Delete a book, its index, references and directory
    BookDelete {
        book_id: u64,
    },
    /// Reconcile the fragment index with the manuscript directory
    Sync {
        book_id: u64,
    },
    /// Render the book to a single HTML document
    Render {
        book_id: u64,
        /// Reconcile the index first, under the same lock
        #[arg(long)]
        sync: bool,
    },
    /// Show path and time of the last render
    RenderInfo {
        book_id: u64,
    },
    FragmentList {
        book_id: u64,
    },
    /// Edit menu label, position, nesting or reference link of one fragment
    FragmentEdit(FragmentEditArgs),
    /// Record an external HTML source for a book
    ReferenceAdd {
        book_id: u64,
        html_url: String,
    },
    ReferenceList {
        book_id: u64,
    },
}

#[derive(Debug, Args)]
struct FragmentEditArgs {
    book_id: u64,
    /// File name inside the manuscript directory
    file: String,
    #[arg(long)]
    label: Option<String>,
    #[arg(long)]
    position: Option<i64>,
    /// Nest the fragment under the previous one in the menu
    #[arg(long, conflicts_with = "top_level")]
    child: bool,
    #[arg(long)]
    top_level: bool,
    #[arg(long, conflicts_with = "clear_reference")]
    reference: Option<u64>,
    #[arg(long)]
    clear_reference: bool,
}

impl FragmentEditArgs {
    fn to_edit(&self) -> FragmentEdit {
        let child = match (self.child, self.top_level) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        };
        let reference_id = match (self.reference, self.clear_reference) {
            (Some(id), _) => Some(Some(id)),
            (None, true) => Some(None),
            (None, false) => None,
        };
        FragmentEdit {
            menu_label: self.label.clone(),
            position: self.position,
            child,
            reference_id,
        }
    }
}

fn print_report(report: &CommandReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    let status = if report.ok { "ok" } else { "issues" };
    println!("{}: {status}", report.command);
    for detail in &report.details {
        println!("  {detail}");
    }
    for issue in &report.issues {
        println!("  ! {issue}");
    }
    Ok(())
}

/// Parses arguments, runs the command and returns the process exit code.
pub fn run() -> Result<i32> {
    let cli = Cli::parse();

    let report = match &cli.command {
        Command::Status => commands::status::run()?,
        Command::BookCreate { title } => commands::book_create::run(title)?,
        Command::BookList => commands::book_list::run()?,
        Command::BookShow { book_id } => commands::book_show::run(*book_id)?,
        Command::BookRename { book_id, title } => commands::book_rename::run(*book_id, title)?,
        Command::BookDelete { book_id } => commands::book_delete::run(*book_id)?,
        Command::Sync { book_id } => commands::sync::run(*book_id)?,
        Command::Render { book_id, sync } => commands::render::run(*book_id, *sync)?,
        Command::RenderInfo { book_id } => commands::render_info::run(*book_id)?,
        Command::FragmentList { book_id } => commands::fragment::list(*book_id)?,
        Command::FragmentEdit(args) => {
            commands::fragment::edit(args.book_id, &args.file, &args.to_edit())?
        }
        Command::ReferenceAdd { book_id, html_url } => {
            commands::reference::add(*book_id, html_url)?
        }
        Command::ReferenceList { book_id } => commands::reference::list(*book_id)?,
    };

    print_report(&report, cli.json)?;
    Ok(if report.ok { 0 } else { 2 })
}
