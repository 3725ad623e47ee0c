use anyhow::Result;
use clap::{Parser, Subcommand};
use insight_engine::engine::InsightEngine;
use insight_engine::llm::LlmClient;
use insight_engine::schema::sanitize_table_name;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "insight")]
#[command(about = "Ask natural-language questions over a local CSV dataset")]
struct Args {
    /// Base URL of the local OpenAI-compatible completion server
    #[arg(long, env = "INSIGHT_LLM_URL", default_value = "http://localhost:8080/v1")]
    llm_url: String,

    /// Model name passed to the completion server
    #[arg(long, env = "INSIGHT_LLM_MODEL", default_value = "llama-3.2-1b-instruct")]
    model: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Load a CSV file and answer one question against it
    Ask {
        /// Path to the CSV file
        csv: PathBuf,

        /// The question in natural language
        question: String,

        /// Table name (default: derived from the file name)
        #[arg(short, long)]
        table: Option<String>,
    },

    /// Run the canned question suite over every CSV in a directory
    Simulate {
        /// Directory containing the test CSV files
        #[arg(default_value = "test_data")]
        data_dir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();
    let provider = Arc::new(LlmClient::new(args.llm_url, args.model));

    match args.command {
        Command::Ask { csv, question, table } => {
            let mut engine = InsightEngine::with_provider(provider);
            let table_name = table.unwrap_or_else(|| table_name_from_path(&csv));
            let content = std::fs::read_to_string(&csv)?;
            let summary = engine.load_csv(&content, &table_name)?;
            info!(
                "Loaded {} rows into \"{}\"",
                summary.row_count, summary.schema.name
            );

            let response = engine.answer(&question).await?;
            println!("{}", response.thought);
            if let Some(sql) = &response.sql {
                println!("\nSQL: {}", sql);
            }
            println!("\nHint: {:?}", response.visual_hint);
            println!("Rows: {}", serde_json::to_string_pretty(&response.rows)?);
        }
        Command::Simulate { data_dir } => {
            let report = run_simulation(provider, &data_dir).await?;
            println!("{}", report);
        }
    }

    Ok(())
}

fn table_name_from_path(path: &Path) -> String {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("table");
    sanitize_table_name(stem)
}

/// Load each canned CSV, ask its fixed question, and collect a markdown
/// report. Failures are reported per file; the suite always runs through.
async fn run_simulation(provider: Arc<LlmClient>, data_dir: &Path) -> Result<String> {
    const CASES: [(&str, &str); 5] = [
        ("ecommerce_orders.csv", "What is the total Amount for Electronics?"),
        ("student_grades.csv", "Who has the highest Math score?"),
        ("inventory.csv", "List items with Stock_Level below 20"),
        ("weather.csv", "What was the temperature in London on 2023-06-01?"),
        ("employee_shifts.csv", "How many sales did Jane Smith make?"),
    ];

    let mut report = Vec::new();
    let mut engine = InsightEngine::with_provider(provider);

    for (file, question) in CASES {
        let path = data_dir.join(file);
        report.push(format!("**Processing**: `{}`", file));

        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                report.push(format!("File not readable: {}", e));
                report.push("---".to_string());
                continue;
            }
        };

        let table_name = table_name_from_path(&path);
        if let Err(e) = engine.load_csv(&content, &table_name) {
            report.push(format!("CSV load failed: {}", e));
            report.push("---".to_string());
            continue;
        }

        report.push(format!("**Question**: \"{}\"", question));
        match engine.answer(question).await {
            Ok(response) => {
                report.push(format!(
                    "**Generated SQL**:\n```sql\n{}\n```",
                    response.sql.as_deref().unwrap_or("NONE")
                ));
                if response.rows.is_empty() {
                    report.push("**Result**: 0 rows found.".to_string());
                } else {
                    report.push(format!("**Result**: Found {} rows.", response.rows.len()));
                    report.push(format!(
                        "*Sample*: {}",
                        serde_json::to_string(&response.rows[0])?
                    ));
                }
            }
            Err(e) => report.push(format!("**Engine error**: {}", e)),
        }
        report.push("---".to_string());
    }

    Ok(report.join("\n"))
}
