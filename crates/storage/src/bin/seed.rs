use clap::Parser;
use exam_core::model::SubjectId;
use storage::{SeededQuestionGenerator, Storage, subject_start_id};

/// Fill a SQLite question bank with deterministic demo questions.
#[derive(Debug, Parser)]
#[command(name = "seed", about = "Seed the question bank")]
struct Args {
    /// SQLite URL
    #[arg(long, env = "EXAM_DB_URL", default_value = "sqlite:dev.sqlite3?mode=rwc")]
    db: String,

    /// Subject to fill
    #[arg(long, default_value_t = 1)]
    subject_id: u64,

    /// Topic name used in generated stems
    #[arg(long, default_value = "Mathematical Reasoning")]
    topic: String,

    /// Number of questions to upsert
    #[arg(long, default_value_t = 45)]
    count: u32,

    /// First question id; defaults to the start of the subject's id block
    #[arg(long)]
    start_id: Option<u64>,

    /// Generator seed; the same seed always yields the same bank
    #[arg(long, env = "EXAM_SEED", default_value_t = 42)]
    seed: u64,
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    if args.db.trim().is_empty() {
        return Err("--db cannot be empty".into());
    }

    let storage = Storage::sqlite(&args.db).await?;
    let subject_id = SubjectId::new(args.subject_id);
    let start_id = match args.start_id {
        Some(id) => id,
        None => subject_start_id(subject_id, 0, u64::from(args.count))
            .ok_or_else(|| format!("subject id {subject_id} is too large for generated ids"))?,
    };
    let questions = SeededQuestionGenerator::new(args.seed)
        .starting_at(start_id)
        .generate(subject_id, &args.topic, args.count)?;

    for question in &questions {
        storage.questions.upsert_question(question).await?;
    }
    let total = storage.questions.count_questions(subject_id).await?;

    println!(
        "Seeded {} questions for subject {} ({} total) into {}",
        questions.len(),
        subject_id,
        total,
        args.db
    );

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
