//! Command-line surface and dispatch.

use clap::{Args, Parser, Subcommand};
use serde_json::Value;
use std::path::PathBuf;

use crate::api::Transport;
use crate::assignments::Assignments;
use crate::datafiles::Datafiles;
use crate::datasets::Datasets;
use crate::docs::{collect_doc_files, DocAction, DocPipeline};
use crate::errors::CapError;
use crate::search::SearchIndex;
use crate::validations::{validate_dir, validate_file};

const COLLECTIONS: [&str; 5] = ["documentation", "blog", "resource", "challenge", "image"];

/// Client for interfacing with www.captest.io.
#[derive(Parser)]
#[clap(
    name = "cap-client",
    version,
    about = "client for interfacing with www.captest.io"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,

    /// username
    #[clap(long, global = true)]
    pub username: Option<String>,

    /// authorization token
    #[clap(long, global = true)]
    pub token: Option<String>,

    /// file with usernames and tokens
    #[clap(long, global = true, default_value = "secrets.yaml")]
    pub secrets: PathBuf,

    /// url to the api server
    #[clap(
        long,
        global = true,
        env = "CAP_API_URL",
        default_value = "https://api.captest.io/"
    )]
    pub api: String,

    /// save secrets into a local disk file
    #[clap(long = "save_secrets", global = true)]
    pub save_secrets: bool,

    /// output INFO logging messages
    #[clap(long, global = true)]
    pub verbose: bool,
}

/// A document file or a directory of document files, with the
/// collection they must belong to.
#[derive(Args)]
pub struct DocTarget {
    /// type of document to process
    #[clap(long, value_parser = COLLECTIONS)]
    pub collection: String,

    /// path to document file
    #[clap(long)]
    pub file: Option<PathBuf>,

    /// path to directory with document files
    #[clap(long)]
    pub dir: Option<PathBuf>,
}

/// A document addressed either by uuid or by name and version.
#[derive(Args)]
pub struct Identifier {
    /// object identifier
    #[clap(long)]
    pub uuid: Option<String>,

    /// document name
    #[clap(long)]
    pub name: Option<String>,

    /// document version
    #[clap(long)]
    pub version: Option<String>,
}

impl Identifier {
    pub fn resolve(&self) -> Result<String, CapError> {
        if let Some(uuid) = &self.uuid {
            return Ok(uuid.clone());
        }
        match (&self.name, &self.version) {
            (Some(name), Some(version)) => Ok(format!("{name}/{version}")),
            _ => Err(CapError::validation(
                "either --uuid or --name and --version are required",
            )),
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// create a new document
    Create {
        #[clap(flatten)]
        target: DocTarget,
    },
    /// publish/update a document
    Publish {
        #[clap(flatten)]
        target: DocTarget,
    },
    /// mark a document as obsolete
    Obsolete {
        #[clap(flatten)]
        target: DocTarget,
    },
    /// upload primary data files
    #[clap(name = "upload_primary")]
    UploadPrimary {
        #[clap(flatten)]
        target: DocTarget,
    },
    /// upload support data files
    #[clap(name = "upload_support")]
    UploadSupport {
        #[clap(flatten)]
        target: DocTarget,
    },
    /// upload primary and support data files
    Upload {
        #[clap(flatten)]
        target: DocTarget,
    },
    /// delete a document
    Delete {
        #[clap(flatten)]
        target: DocTarget,
    },
    /// list assignments or datafiles
    List {
        /// type of items to list
        #[clap(long, value_parser = ["assignment", "datafile"], default_value = "assignment")]
        collection: String,

        /// uuid of the parent object (required for datafiles)
        #[clap(long = "parent_uuid")]
        parent_uuid: Option<String>,
    },
    /// start an assignment for a challenge
    Start {
        /// challenge identifier
        #[clap(long)]
        uuid: String,
    },
    /// download example datasets for a challenge
    Download {
        #[clap(flatten)]
        identifier: Identifier,

        /// directory for downloaded files
        #[clap(long, default_value = ".")]
        dir: PathBuf,
    },
    /// submit an assignment for scoring
    Submit {
        /// assignment identifier
        #[clap(long)]
        uuid: String,
    },
    /// view a document
    View {
        /// type of document
        #[clap(long, value_parser = COLLECTIONS)]
        collection: String,

        #[clap(flatten)]
        identifier: Identifier,
    },
    /// build the search index
    #[clap(name = "build_search")]
    BuildSearch,
    /// summary of the search index
    Summary,
}

/// Argument checks that must fail before any network call or prompt.
pub fn validate_cli(cli: &Cli) -> Result<(), CapError> {
    match &cli.command {
        Commands::Create { target }
        | Commands::Publish { target }
        | Commands::Obsolete { target }
        | Commands::UploadPrimary { target }
        | Commands::UploadSupport { target }
        | Commands::Upload { target }
        | Commands::Delete { target } => {
            if let Some(file) = &target.file {
                validate_file(file)?;
            }
            if let Some(dir) = &target.dir {
                validate_dir(dir)?;
            }
            if target.file.is_none() && target.dir.is_none() {
                return Err(CapError::validation("either --file or --dir is required"));
            }
        }
        Commands::List {
            collection,
            parent_uuid,
        } => {
            if collection == "datafile" && parent_uuid.is_none() {
                return Err(CapError::validation("parent_uuid is required"));
            }
        }
        Commands::Download { identifier, dir } => {
            identifier.resolve()?;
            validate_dir(dir)?;
        }
        Commands::View { identifier, .. } => {
            identifier.resolve()?;
        }
        _ => {}
    }
    Ok(())
}

/// Dispatch a parsed command against the transport, returning the
/// JSON to print. Per-file document failures are recorded as data in
/// the result; errors returned here abort the invocation.
pub async fn run(cli: &Cli, transport: &dyn Transport, username: &str) -> Result<Value, CapError> {
    match &cli.command {
        Commands::Create { target } => run_docs(DocAction::Create, target, cli, transport, username).await,
        Commands::Publish { target } => run_docs(DocAction::Publish, target, cli, transport, username).await,
        Commands::Obsolete { target } => run_docs(DocAction::Obsolete, target, cli, transport, username).await,
        Commands::UploadPrimary { target } => {
            run_docs(DocAction::UploadPrimary, target, cli, transport, username).await
        }
        Commands::UploadSupport { target } => {
            run_docs(DocAction::UploadSupport, target, cli, transport, username).await
        }
        Commands::Upload { target } => run_docs(DocAction::Upload, target, cli, transport, username).await,
        Commands::Delete { target } => run_docs(DocAction::Delete, target, cli, transport, username).await,
        Commands::List {
            collection,
            parent_uuid,
        } => match collection.as_str() {
            "datafile" => {
                let parent = parent_uuid
                    .as_deref()
                    .ok_or_else(|| CapError::validation("parent_uuid is required"))?;
                Datafiles::new(transport).list(parent).await
            }
            _ => Assignments::new(transport).list(username).await,
        },
        Commands::Start { uuid } => Assignments::new(transport).start(uuid).await,
        Commands::Submit { uuid } => Assignments::new(transport).submit(uuid).await,
        Commands::Download { identifier, dir } => {
            Datasets::new(transport)
                .download(&identifier.resolve()?, dir)
                .await
        }
        Commands::View {
            collection,
            identifier,
        } => {
            DocPipeline::new(transport, &cli.api, username)
                .view(collection, &identifier.resolve()?)
                .await
        }
        Commands::BuildSearch => SearchIndex::new(transport).build().await,
        Commands::Summary => SearchIndex::new(transport).summary().await,
    }
}

async fn run_docs(
    action: DocAction,
    target: &DocTarget,
    cli: &Cli,
    transport: &dyn Transport,
    username: &str,
) -> Result<Value, CapError> {
    let files = collect_doc_files(target.file.as_deref(), target.dir.as_deref())?;
    let pipeline = DocPipeline::new(transport, &cli.api, username);
    let results = pipeline.run_batch(action, &files, &target.collection).await;
    Ok(Value::Array(results))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn secrets_default_is_local_file() {
        let cli = Cli::try_parse_from(["cap-client", "summary"]).unwrap();
        assert_eq!(cli.secrets, PathBuf::from("secrets.yaml"));
        assert_eq!(cli.api, "https://api.captest.io/");
    }

    #[test]
    fn unknown_action_is_rejected() {
        assert!(Cli::try_parse_from(["cap-client", "frobnicate"]).is_err());
    }

    #[test]
    fn create_requires_collection() {
        assert!(Cli::try_parse_from(["cap-client", "create", "--file", "doc.md"]).is_err());
    }

    #[test]
    fn create_rejects_unknown_collection() {
        assert!(Cli::try_parse_from([
            "cap-client",
            "create",
            "--collection",
            "wiki",
            "--file",
            "doc.md"
        ])
        .is_err());
    }

    #[test]
    fn doc_actions_need_file_or_dir() {
        let cli = Cli::try_parse_from(["cap-client", "create", "--collection", "blog"]).unwrap();
        let err = validate_cli(&cli).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn datafile_listing_needs_parent_uuid() {
        let cli =
            Cli::try_parse_from(["cap-client", "list", "--collection", "datafile"]).unwrap();
        let err = validate_cli(&cli).unwrap_err();
        assert!(err.message().contains("parent_uuid"));
    }

    #[test]
    fn identifier_resolves_uuid_or_name_version() {
        let id = Identifier {
            uuid: Some("u-1".into()),
            name: None,
            version: None,
        };
        assert_eq!(id.resolve().unwrap(), "u-1");
        let id = Identifier {
            uuid: None,
            name: Some("doc".into()),
            version: Some("0.1".into()),
        };
        assert_eq!(id.resolve().unwrap(), "doc/0.1");
        let id = Identifier {
            uuid: None,
            name: Some("doc".into()),
            version: None,
        };
        assert!(id.resolve().is_err());
    }
}
