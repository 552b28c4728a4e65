use clap::{Parser, Subcommand};
use common::types::SymbolKind;
use std::path::PathBuf;
use warden::facade::QueryFacade;

#[derive(Parser)]
#[command(name = "warden-cli")]
#[command(about = "Local operator entry point for the C++ structural index", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Full index sweep of a project directory.
    Index {
        path: PathBuf,
        /// Re-index even if a matching global cache is on disk.
        #[arg(long)]
        force: bool,
        /// Where the cache root is derived from. Defaults to `path`.
        #[arg(long)]
        installation: Option<PathBuf>,
    },
    /// Re-enumerate the project and reparse changed/new/removed files.
    Refresh {
        path: PathBuf,
        #[arg(long)]
        installation: Option<PathBuf>,
    },
    /// Indexed-file/symbol/call-graph counters for the project.
    Status {
        path: PathBuf,
        #[arg(long)]
        installation: Option<PathBuf>,
    },
    /// Run one named query operation against the index.
    Query {
        path: PathBuf,
        #[arg(long)]
        installation: Option<PathBuf>,
        #[command(subcommand)]
        op: QueryOp,
    },
}

#[derive(Subcommand)]
enum QueryOp {
    SearchClasses {
        pattern: String,
        #[arg(long)]
        include_dependencies: bool,
    },
    SearchFunctions {
        pattern: String,
        #[arg(long)]
        class_name: Option<String>,
        #[arg(long)]
        include_dependencies: bool,
    },
    SearchSymbols {
        pattern: String,
        #[arg(long)]
        include_dependencies: bool,
        /// Comma-separated subset of class,struct,function,method.
        #[arg(long)]
        kinds: Option<String>,
    },
    GetClassInfo {
        class_name: String,
    },
    GetFunctionSignature {
        function_name: String,
        #[arg(long)]
        class_name: Option<String>,
    },
    FindInFile {
        file_path: String,
        pattern: String,
    },
    GetDerivedClasses {
        class_name: String,
        #[arg(long)]
        include_dependencies: bool,
    },
    GetClassHierarchy {
        class_name: String,
    },
    FindCallers {
        function_name: String,
        #[arg(long)]
        class_name: Option<String>,
    },
    FindCallees {
        function_name: String,
        #[arg(long)]
        class_name: Option<String>,
    },
    GetCallPath {
        from_function: String,
        to_function: String,
        #[arg(long, default_value_t = 10)]
        max_depth: usize,
    },
}

fn parse_kinds(raw: &str) -> anyhow::Result<Vec<SymbolKind>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| match s {
            "class" => Ok(SymbolKind::Class),
            "struct" => Ok(SymbolKind::Struct),
            "function" => Ok(SymbolKind::Function),
            "method" => Ok(SymbolKind::Method),
            other => anyhow::bail!("unknown symbol kind: {other}"),
        })
        .collect()
}

fn installation_root(path: &PathBuf, installation: Option<PathBuf>) -> PathBuf {
    installation.unwrap_or_else(|| path.clone())
}

fn load_facade(path: &PathBuf, installation: Option<PathBuf>) -> anyhow::Result<QueryFacade> {
    let facade = QueryFacade::new(installation_root(path, installation));
    facade
        .set_project_directory(&path.display().to_string())
        .map_err(|e| anyhow::anyhow!("{}: {}", e.code(), e))?;
    Ok(facade)
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = dotenvy::dotenv() {
        tracing::debug!(error = %e, "no .env file loaded");
    }
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Index { path, force, installation } => {
            let facade = QueryFacade::new(installation_root(&path, installation));
            let indexed = facade
                .set_project_directory(&path.display().to_string())
                .map_err(|e| anyhow::anyhow!("{}: {}", e.code(), e))?;
            let _ = force; // full sweep already happened inside set_project_directory
            print_json(&serde_json::json!({ "indexed_file_count": indexed }))?;
        }
        Commands::Refresh { path, installation } => {
            let facade = load_facade(&path, installation)?;
            let changed = facade
                .refresh_project()
                .map_err(|e| anyhow::anyhow!("{}: {}", e.code(), e))?;
            print_json(&serde_json::json!({ "changed_count": changed }))?;
        }
        Commands::Status { path, installation } => {
            let facade = load_facade(&path, installation)?;
            let status = facade
                .get_server_status()
                .map_err(|e| anyhow::anyhow!("{}: {}", e.code(), e))?;
            print_json(&status)?;
        }
        Commands::Query { path, installation, op } => {
            let facade = load_facade(&path, installation)?;
            run_query(&facade, op)?;
        }
    }

    Ok(())
}

fn run_query(facade: &QueryFacade, op: QueryOp) -> anyhow::Result<()> {
    match op {
        QueryOp::SearchClasses { pattern, include_dependencies } => {
            let result = facade
                .search_classes(&pattern, !include_dependencies)
                .map_err(|e| anyhow::anyhow!("{}: {}", e.code(), e))?;
            print_json(&result)
        }
        QueryOp::SearchFunctions { pattern, class_name, include_dependencies } => {
            let result = facade
                .search_functions(&pattern, !include_dependencies, class_name.as_deref())
                .map_err(|e| anyhow::anyhow!("{}: {}", e.code(), e))?;
            print_json(&result)
        }
        QueryOp::SearchSymbols { pattern, include_dependencies, kinds } => {
            let kinds = kinds.as_deref().map(parse_kinds).transpose()?;
            let result = facade
                .search_symbols(&pattern, !include_dependencies, kinds.as_deref())
                .map_err(|e| anyhow::anyhow!("{}: {}", e.code(), e))?;
            print_json(&result)
        }
        QueryOp::GetClassInfo { class_name } => {
            let result = facade
                .get_class_info(&class_name)
                .map_err(|e| anyhow::anyhow!("{}: {}", e.code(), e))?;
            print_json(&result)
        }
        QueryOp::GetFunctionSignature { function_name, class_name } => {
            let result = facade
                .get_function_signature(&function_name, class_name.as_deref())
                .map_err(|e| anyhow::anyhow!("{}: {}", e.code(), e))?;
            print_json(&result)
        }
        QueryOp::FindInFile { file_path, pattern } => {
            let result = facade
                .find_in_file(&file_path, &pattern)
                .map_err(|e| anyhow::anyhow!("{}: {}", e.code(), e))?;
            print_json(&result)
        }
        QueryOp::GetDerivedClasses { class_name, include_dependencies } => {
            let result = facade
                .get_derived_classes(&class_name, !include_dependencies)
                .map_err(|e| anyhow::anyhow!("{}: {}", e.code(), e))?;
            print_json(&result)
        }
        QueryOp::GetClassHierarchy { class_name } => {
            let result = facade
                .get_class_hierarchy(&class_name)
                .map_err(|e| anyhow::anyhow!("{}: {}", e.code(), e))?;
            print_json(&result)
        }
        QueryOp::FindCallers { function_name, class_name } => {
            let result = facade
                .find_callers(&function_name, class_name.as_deref())
                .map_err(|e| anyhow::anyhow!("{}: {}", e.code(), e))?;
            print_json(&result)
        }
        QueryOp::FindCallees { function_name, class_name } => {
            let result = facade
                .find_callees(&function_name, class_name.as_deref())
                .map_err(|e| anyhow::anyhow!("{}: {}", e.code(), e))?;
            print_json(&result)
        }
        QueryOp::GetCallPath { from_function, to_function, max_depth } => {
            let result = facade
                .get_call_path(&from_function, &to_function, max_depth)
                .map_err(|e| anyhow::anyhow!("{}: {}", e.code(), e))?;
            print_json(&result)
        }
    }
}
