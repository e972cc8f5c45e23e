//! papergraph: command-line front end over the relationship graph store.
//!
//! Every command prints JSON on stdout. Errors go to stderr with their
//! stable error kind and a non-zero exit code.

use clap::{Parser, Subcommand, ValueEnum};
use log::info;
use papergraph_core::{
    default_log_level, init_logging, search_entities, AssociationKind, AssociationMutator,
    CoreError, EntityKind, EntityService, EntityUpdate, GraphService, NewNote, NewPaper,
    RelatednessResolver, Store, TagService,
};
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "papergraph")]
#[command(author, version, about = "Papers, notes and tags as a relationship graph")]
#[command(propagate_version = true)]
struct Cli {
    /// SQLite database file
    #[arg(long, env = "PAPERGRAPH_DB", default_value = "papergraph.db")]
    db: PathBuf,

    /// Log level (trace|debug|info|warn|error)
    #[arg(long, env = "PAPERGRAPH_LOG_LEVEL")]
    log_level: Option<String>,

    /// Absolute directory for rolling log files; logging is off when unset
    #[arg(long, env = "PAPERGRAPH_LOG_DIR")]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum KindArg {
    Paper,
    Note,
}

impl From<KindArg> for EntityKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Paper => EntityKind::Paper,
            KindArg::Note => EntityKind::Note,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum LinkArg {
    Tags,
    Peers,
}

impl From<LinkArg> for AssociationKind {
    fn from(kind: LinkArg) -> Self {
        match kind {
            LinkArg::Tags => AssociationKind::Tags,
            LinkArg::Peers => AssociationKind::Peers,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create a paper
    AddPaper {
        name: String,
        #[arg(long)]
        url: String,
        #[arg(long)]
        annotations: Option<String>,
        #[arg(long = "tag", num_args = 1..)]
        tags: Vec<Uuid>,
        #[arg(long = "note", num_args = 1..)]
        notes: Vec<Uuid>,
    },

    /// Create a note
    AddNote {
        name: String,
        #[arg(long)]
        content: Option<String>,
        #[arg(long = "tag", num_args = 1..)]
        tags: Vec<Uuid>,
        #[arg(long = "paper", num_args = 1..)]
        papers: Vec<Uuid>,
    },

    /// Show a paper or note with its tags and peers
    Show { id: Uuid },

    /// Update fields and associations of a paper or note
    Update {
        id: Uuid,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        content: Option<String>,
        #[arg(long)]
        url: Option<String>,
        #[arg(long = "add-tag", num_args = 1..)]
        add_tags: Vec<Uuid>,
        #[arg(long = "remove-tag", num_args = 1..)]
        remove_tags: Vec<Uuid>,
        #[arg(long = "add-peer", num_args = 1..)]
        add_peers: Vec<Uuid>,
        #[arg(long = "remove-peer", num_args = 1..)]
        remove_peers: Vec<Uuid>,
    },

    /// Delete a paper or note and its associations
    Delete { id: Uuid },

    /// List papers or notes, newest first
    List {
        #[arg(value_enum)]
        kind: KindArg,
    },

    /// Most recently updated papers and notes
    Recent {
        #[arg(long)]
        limit: Option<u32>,
    },

    /// Replace one association set of an entity
    SetLinks {
        id: Uuid,
        #[arg(value_enum)]
        kind: LinkArg,
        targets: Vec<Uuid>,
    },

    /// Create a tag, optionally attaching it to an entity
    AddTag {
        name: String,
        #[arg(long = "for")]
        entity: Option<Uuid>,
    },

    /// Rename a tag
    RenameTag { id: Uuid, name: String },

    /// Delete a tag and detach it everywhere
    DeleteTag { id: Uuid },

    /// List tags by name, or those matching a keyword
    Tags {
        #[arg(long)]
        search: Option<String>,
    },

    /// Usage counts for a tag
    TagStats { id: Uuid },

    /// Papers and notes carrying a tag
    TagDocs { id: Uuid },

    /// Keyword search over papers or notes
    Search {
        #[arg(value_enum)]
        kind: KindArg,
        keyword: String,
    },

    /// Entities sharing at least one tag with an entity
    Related {
        id: Uuid,
        #[arg(long)]
        limit: Option<u32>,
    },

    /// Full node/edge graph
    Graph,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Some(log_dir) = cli.log_dir.as_deref() {
        let level = cli.log_level.as_deref().unwrap_or(default_log_level());
        if let Err(err) = init_logging(level, log_dir) {
            eprintln!("Error: {err}");
            return ExitCode::FAILURE;
        }
    }

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(CliError::Core(err)) => {
            eprintln!("Error ({}): {err}", err.kind().as_str());
            ExitCode::FAILURE
        }
        Err(err) => {
            eprintln!("Error: {err}");
            ExitCode::FAILURE
        }
    }
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Core(#[from] CoreError),
    #[error("failed to open database: {0}")]
    Open(#[from] papergraph_core::db::DbError),
    #[error("failed to encode output: {0}")]
    Output(#[from] serde_json::Error),
}

fn print_json(value: &impl Serialize) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn run(cli: Cli) -> Result<(), CliError> {
    let store = Store::open(&cli.db)?;
    info!("event=cli_start module=cli status=ok db={}", cli.db.display());
    let entities = EntityService::new(&store);
    let tags = TagService::new(&store);

    match cli.command {
        Commands::AddPaper {
            name,
            url,
            annotations,
            tags: tag_ids,
            notes,
        } => {
            let paper = entities.create_paper(NewPaper {
                annotations,
                tag_ids,
                note_ids: notes,
                ..NewPaper::new(name, url)
            })?;
            print_json(&paper)?;
        }
        Commands::AddNote {
            name,
            content,
            tags: tag_ids,
            papers,
        } => {
            let note = entities.create_note(NewNote {
                content,
                tag_ids,
                paper_ids: papers,
                ..NewNote::new(name)
            })?;
            print_json(&note)?;
        }
        Commands::Show { id } => print_json(&entities.get_entity(id)?)?,
        Commands::Update {
            id,
            name,
            content,
            url,
            add_tags,
            remove_tags,
            add_peers,
            remove_peers,
        } => {
            let mut update = EntityUpdate::new()
                .add_tags(add_tags)
                .remove_tags(remove_tags)
                .add_peers(add_peers)
                .remove_peers(remove_peers);
            if let Some(name) = name {
                update = update.rename(name);
            }
            if let Some(content) = content {
                update = update.content(content);
            }
            if let Some(url) = url {
                update = update.source_url(url);
            }
            print_json(&entities.update_entity(id, update)?)?;
        }
        Commands::Delete { id } => {
            entities.delete_entity(id)?;
            print_json(&serde_json::json!({ "deleted": id }))?;
        }
        Commands::List { kind } => match EntityKind::from(kind) {
            EntityKind::Paper => print_json(&entities.list_papers()?)?,
            EntityKind::Note => print_json(&entities.list_notes()?)?,
        },
        Commands::Recent { limit } => print_json(&entities.recent_entities(limit)?)?,
        Commands::SetLinks { id, kind, targets } => {
            let change =
                AssociationMutator::new(&store).set_desired_associations(id, kind.into(), targets)?;
            print_json(&change)?;
        }
        Commands::AddTag { name, entity } => {
            let tag = match entity {
                Some(entity_id) => tags.create_tag_for(&name, entity_id)?,
                None => tags.create_tag(&name)?,
            };
            print_json(&tag)?;
        }
        Commands::RenameTag { id, name } => print_json(&tags.rename_tag(id, &name)?)?,
        Commands::DeleteTag { id } => {
            tags.delete_tag(id)?;
            print_json(&serde_json::json!({ "deleted": id }))?;
        }
        Commands::Tags { search } => match search {
            Some(keyword) => print_json(&tags.search_tags(&keyword)?)?,
            None => print_json(&tags.list_tags()?)?,
        },
        Commands::TagStats { id } => print_json(&tags.tag_stats(id)?)?,
        Commands::TagDocs { id } => print_json(&tags.tag_documents(id)?)?,
        Commands::Search { kind, keyword } => {
            print_json(&search_entities(&store, kind.into(), &keyword)?)?
        }
        Commands::Related { id, limit } => {
            print_json(&RelatednessResolver::new(&store).related_to(id, limit)?)?
        }
        Commands::Graph => print_json(&GraphService::new(&store).build_graph()?)?,
    }

    Ok(())
}
