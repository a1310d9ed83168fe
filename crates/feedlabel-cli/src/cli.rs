use std::path::PathBuf;

use clap::{Parser, Subcommand};
use feedlabel_core::{DEFAULT_MAX_LENGTH, DevicePreference};

#[derive(Parser)]
#[command(name = "feedlabel", version, about = "Classify and label student feedback")]
pub struct Cli {
    /// DuckDB database file holding the feedback table
    #[arg(long, env = "FEEDLABEL_DB", global = true)]
    pub db: Option<PathBuf>,

    /// Directory with model.onnx, tokenizer.json and optionally config.json
    #[arg(long, env = "FEEDLABEL_MODEL_DIR", global = true)]
    pub model_dir: Option<PathBuf>,

    /// Token budget per comment, markers included
    #[arg(long, env = "FEEDLABEL_MAX_LENGTH", global = true, default_value_t = DEFAULT_MAX_LENGTH)]
    pub max_length: usize,

    /// Inference device: auto, cpu or cuda
    #[arg(long, env = "FEEDLABEL_DEVICE", global = true, default_value = "auto")]
    pub device: DevicePreference,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Classify a piece of text without touching the database
    Classify {
        text: String,
    },
    /// Validate, classify and store a new record read as JSON
    Create {
        /// JSON file with the record fields, or '-' for stdin
        #[arg(long)]
        json: String,
    },
    /// Label the records created on a day (YYYY-MM-DD)
    ByDate {
        date: String,
    },
    /// Label one record by id
    ById {
        id: i64,
    },
    /// Label the records of today and the previous N-1 days
    Recent {
        #[arg(allow_negative_numbers = true)]
        days: i64,
    },
    /// Label the records of the last N days and store the labels
    LabelRecent {
        #[arg(allow_negative_numbers = true)]
        days: i64,
    },
    /// Create the feedback table if it does not exist
    InitDb,
}
