//! Prospectus QA Benchmark CLI
//!
//! A benchmark harness for retrieval-augmented QA over Chinese prospectus
//! PDFs: corpus building, BM25 indexing, batch QA, evaluation and human
//! review.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use prospectus_bench::{
    config::Config,
    corpus::{build_corpus, load_corpus, save_corpus},
    eval::{DEFAULT_SIMILARITY_THRESHOLD, Evaluator},
    index::BmIndex,
    llm::LlmClient,
    qa::{QaRunner, load_answers, save_answers},
    questions::QuestionSet,
    review::{ReviewStore, serve},
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

/// Prospectus QA Benchmark - RAG evaluation over Chinese prospectus PDFs
#[derive(Parser)]
#[command(name = "prospectus-bench")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract per-page text from PDFs into a corpus file
    Process {
        /// Directory containing the prospectus PDF files
        doc_dir: PathBuf,

        /// Output path for the corpus file
        #[arg(short, long, default_value = "data/corpus.json")]
        output: PathBuf,
    },

    /// Build a BM25 index from a corpus file
    Index {
        /// Path to the corpus file
        #[arg(short, long, default_value = "data/corpus.json")]
        corpus: PathBuf,

        /// Output directory for the index
        #[arg(short, long, default_value = "data/index")]
        output: PathBuf,
    },

    /// Answer benchmark questions with retrieval plus an LLM
    Qa {
        /// Question file (YAML, JSON or JSONL)
        input: PathBuf,

        /// Output path for the answer file
        #[arg(short, long, default_value = "data/answers.json")]
        output: PathBuf,

        /// Index directory
        #[arg(short, long, default_value = "data/index")]
        index: PathBuf,

        /// Number of passages to retrieve per question
        #[arg(short = 'k', long, default_value_t = 3)]
        top_k: usize,

        /// Number of questions answered concurrently
        #[arg(short, long, default_value_t = 3)]
        batch_size: usize,

        /// Only answer the question with this id
        #[arg(long)]
        sample: Option<String>,
    },

    /// Evaluate answers: retrieval metrics plus LLM-judged quality
    Eval {
        /// Question file (YAML, JSON or JSONL)
        input: PathBuf,

        /// Answer file produced by the qa command
        #[arg(short, long, default_value = "data/answers.json")]
        answers: PathBuf,

        /// Output path for the evaluation report
        #[arg(short, long, default_value = "data/evaluation.json")]
        output: PathBuf,

        /// Skip LLM judging and compute retrieval metrics only
        #[arg(long)]
        only_retrieval: bool,

        /// Number of answers judged concurrently
        #[arg(short, long, default_value_t = 3)]
        batch_size: usize,

        /// Rank cutoffs for Recall@K and MRR@K
        #[arg(long, value_delimiter = ',', default_values_t = [1, 3, 5, 10])]
        k_values: Vec<usize>,

        /// Content similarity threshold in [0, 1]
        #[arg(long, default_value_t = DEFAULT_SIMILARITY_THRESHOLD)]
        similarity_threshold: f64,
    },

    /// Review judged answers in a web UI
    Review {
        /// Evaluation report produced by the eval command
        input: PathBuf,

        /// Output path for the reviewed report
        #[arg(short, long, default_value = "data/evaluation_reviewed.json")]
        output: PathBuf,

        /// Host to bind
        #[arg(long, default_value = "0.0.0.0")]
        host: String,

        /// Port to bind
        #[arg(short, long, default_value_t = 7860)]
        port: u16,
    },

    /// Test LLM connection
    Test,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "prospectus_bench=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Process { doc_dir, output } => cmd_process(doc_dir, output),
        Commands::Index { corpus, output } => cmd_index(corpus, output),
        Commands::Qa {
            input,
            output,
            index,
            top_k,
            batch_size,
            sample,
        } => cmd_qa(input, output, index, top_k, batch_size, sample).await,
        Commands::Eval {
            input,
            answers,
            output,
            only_retrieval,
            batch_size,
            k_values,
            similarity_threshold,
        } => {
            cmd_eval(
                input,
                answers,
                output,
                only_retrieval,
                batch_size,
                k_values,
                similarity_threshold,
            )
            .await
        }
        Commands::Review {
            input,
            output,
            host,
            port,
        } => cmd_review(input, output, host, port).await,
        Commands::Test => cmd_test().await,
    }
}

fn cmd_process(doc_dir: PathBuf, output: PathBuf) -> Result<()> {
    println!("Processing PDFs in: {}", doc_dir.display());
    let start = Instant::now();

    let corpus = build_corpus(&doc_dir).context("Failed to build corpus")?;
    save_corpus(&corpus, &output).context("Failed to save corpus")?;

    println!("Corpus built: {} pages in {:.2?}", corpus.len(), start.elapsed());
    println!("Saved to: {}", output.display());
    Ok(())
}

fn cmd_index(corpus_path: PathBuf, output: PathBuf) -> Result<()> {
    println!("Loading corpus: {}", corpus_path.display());
    let corpus = load_corpus(&corpus_path).context("Failed to load corpus")?;

    println!("Indexing {} pages...", corpus.len());
    let start = Instant::now();
    BmIndex::build(&corpus, &output).context("Failed to build index")?;

    println!("Index built in {:.2?}", start.elapsed());
    println!("Saved to: {}", output.display());
    Ok(())
}

async fn cmd_qa(
    input: PathBuf,
    output: PathBuf,
    index_dir: PathBuf,
    top_k: usize,
    batch_size: usize,
    sample: Option<String>,
) -> Result<()> {
    println!("Loading configuration...");
    let config = Config::load().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    let mut questions = QuestionSet::load(&input).context("Failed to load questions")?;
    if let Some(id) = &sample {
        questions.retain_id(id);
        if questions.is_empty() {
            anyhow::bail!("No question with id '{}' in '{}'", id, input.display());
        }
    }

    let index = BmIndex::open(&index_dir).context("Failed to open index")?;
    let client = LlmClient::new(config.llm.clone());

    println!("Answering {} questions...", questions.len());
    println!("Using model: {}", config.llm.answer_model);
    let start = Instant::now();

    let runner = QaRunner::new(Arc::new(index), client, top_k, batch_size);
    let records = runner.run(&questions).await;

    save_answers(&records, &output).context("Failed to save answers")?;

    println!(
        "Answered {} questions in {:.2?}",
        records.len(),
        start.elapsed()
    );
    println!("Saved to: {}", output.display());
    Ok(())
}

async fn cmd_eval(
    input: PathBuf,
    answers_path: PathBuf,
    output: PathBuf,
    only_retrieval: bool,
    batch_size: usize,
    k_values: Vec<usize>,
    similarity_threshold: f64,
) -> Result<()> {
    let questions = QuestionSet::load(&input).context("Failed to load questions")?;
    let answers = load_answers(&answers_path).context("Failed to load answers")?;

    let evaluator = Evaluator::new(k_values, similarity_threshold, batch_size);
    let samples = evaluator.create_samples(&questions, &answers);
    if samples.is_empty() {
        anyhow::bail!("No questions matched the answer file");
    }

    println!("Evaluating {} samples...", samples.len());
    let start = Instant::now();

    let report = if only_retrieval {
        evaluator.evaluate_retrieval(&samples)
    } else {
        let config = Config::load().context("Failed to load configuration")?;
        config.validate().context("Invalid configuration")?;
        println!("Using judge model: {}", config.llm.judge_model());

        let client = LlmClient::new(config.llm);
        evaluator.evaluate(&samples, &client).await
    };

    report.save(&output).context("Failed to save report")?;
    report.print_summary();

    println!("\nEvaluated in {:.2?}", start.elapsed());
    println!("Saved to: {}", output.display());
    Ok(())
}

async fn cmd_review(input: PathBuf, output: PathBuf, host: String, port: u16) -> Result<()> {
    let store = ReviewStore::open(&input, &output).context("Failed to open review session")?;
    println!(
        "Reviewing {} samples (resuming at {})",
        store.len(),
        store.cursor() + 1
    );

    serve(store, &host, port).await.context("Review server failed")?;
    Ok(())
}

async fn cmd_test() -> Result<()> {
    println!("Loading configuration...");
    let config = Config::load().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    println!("Testing connection to: {}", config.llm.api_base);
    println!("Using model: {}", config.llm.answer_model);

    let client = LlmClient::new(config.llm);
    client
        .test_connection()
        .await
        .context("Connection test failed")?;

    println!("Connection OK");
    Ok(())
}
