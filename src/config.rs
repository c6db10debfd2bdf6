use clap::Parser;
use std::path::PathBuf;

/// Batch files in the stock data set that are not record collections.
const DEFAULT_IGNORED_FILES: [&str; 4] = [
    "damage-deck-core-tfa.js",
    "damage-deck-core.js",
    "damage-deck-rebel-transport.js",
    "reference-cards.js",
];

/// Import JSON record batches into a property graph using a field-mapping schema.
///
/// Every flag can also be set through the environment or a `.env` file.
#[derive(Debug, Parser)]
#[command(name = "graph-ingest", version)]
pub struct Config {
    /// Directory containing the batch files (`*.js` / `*.json`)
    #[arg(long, env = "DATA_DIR")]
    pub data_dir: PathBuf,

    /// Field-mapping schema document (JSON)
    #[arg(long = "schema", env = "SCHEMA_PATH")]
    pub schema_path: PathBuf,

    #[arg(long, env = "NEO4J_URI", default_value = "bolt://localhost:7687")]
    pub neo4j_uri: String,

    #[arg(long, env = "NEO4J_USER", default_value = "neo4j")]
    pub neo4j_user: String,

    #[arg(long, env = "NEO4J_PASSWORD", default_value = "", hide_env_values = true)]
    pub neo4j_password: String,

    /// Batch file name to skip (repeatable; replaces the default list)
    #[arg(long = "ignore", value_name = "FILE", default_values = DEFAULT_IGNORED_FILES)]
    pub ignored_files: Vec<String>,

    /// Write the run summary as JSON to this path
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Build the graph in memory instead of writing to Neo4j
    #[arg(long)]
    pub dry_run: bool,

    /// Neo4j connection attempts before giving up
    #[arg(long, default_value_t = 4)]
    pub connect_retries: u32,
}

impl Config {
    /// Load `.env` (if present), then parse flags and environment.
    pub fn load() -> Self {
        dotenv::dotenv().ok();
        Config::parse()
    }
}
