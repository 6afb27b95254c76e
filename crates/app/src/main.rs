use std::sync::Arc;

use clap::{Parser, Subcommand};
use exam_core::model::{SessionConfig, SubjectId, UserId};
use services::catalog;
use services::{Clock, ExamService, PracticeService};
use storage::repository::{QuestionRepository, Storage};
use storage::{SeededQuestionGenerator, subject_start_id};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod commands;

/// Terminal front end for timed quizzes, mock exams and practice.
#[derive(Debug, Parser)]
#[command(name = "exam", version, about = "Timed assessment sessions in the terminal")]
struct Cli {
    /// SQLite URL; omit to run against a generated in-memory bank
    #[arg(long, env = "EXAM_DB_URL")]
    db: Option<String>,

    /// Learner id (UUID); results are only reported when set
    #[arg(long, env = "EXAM_USER_ID")]
    user: Option<UserId>,

    /// Seed for generated demo questions
    #[arg(long, env = "EXAM_SEED", default_value_t = 42)]
    seed: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// 15 questions in 15 minutes, answered in order
    Quiz {
        #[arg(long, default_value_t = 1)]
        subject: u64,
    },
    /// Full-length mock exam from the catalog
    Mock {
        /// Catalog id, see `exams`
        #[arg(long, default_value_t = 5)]
        exam: u32,
    },
    /// Untimed adaptive practice with instant feedback
    Practice {
        #[arg(long, default_value_t = 1)]
        subject: u64,
    },
    /// List the mock exam catalog
    Exams {
        #[arg(long)]
        json: bool,
    },
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if let Command::Exams { json } = cli.command {
        return commands::exams::list(json);
    }

    let storage = match cli.db.as_deref() {
        Some(url) => {
            let url = normalize_sqlite_url(url)?;
            info!(db = %url, "opening question bank");
            Storage::sqlite(&url).await?
        }
        None => Storage::in_memory(),
    };
    let clock = Clock::system();

    match cli.command {
        Command::Quiz { subject } => {
            let subject_id = SubjectId::new(subject);
            let config = SessionConfig::timed_quiz();
            let needed = config.question_count();
            ensure_questions(storage.questions.as_ref(), subject_id, needed, cli.seed).await?;
            let exams = exam_service(&storage, clock, cli.user);
            commands::timed::run(&exams, subject_id, config).await
        }
        Command::Mock { exam } => {
            let preset =
                catalog::find_exam(exam).ok_or_else(|| format!("unknown exam id: {exam}"))?;
            let config = preset.session_config()?;
            ensure_questions(
                storage.questions.as_ref(),
                preset.subject_id,
                config.question_count(),
                cli.seed,
            )
            .await?;
            println!(
                "{} ({} questions, {} minutes)",
                preset.title, preset.question_count, preset.time_limit_minutes
            );
            let exams = exam_service(&storage, clock, cli.user);
            commands::timed::run(&exams, preset.subject_id, config).await
        }
        Command::Practice { subject } => {
            let subject_id = SubjectId::new(subject);
            ensure_questions(storage.questions.as_ref(), subject_id, 1, cli.seed).await?;
            let practice = PracticeService::new(clock, Arc::clone(&storage.adaptive))
                .with_reporter(Arc::clone(&storage.reporter))
                .with_user(cli.user);
            commands::practice::run(practice.session(subject_id)).await
        }
        Command::Exams { .. } => Ok(()),
    }
}

fn exam_service(storage: &Storage, clock: Clock, user: Option<UserId>) -> ExamService {
    ExamService::new(clock, Arc::clone(&storage.source))
        .with_reporter(Arc::clone(&storage.reporter))
        .with_user(user)
}

/// Top up a subject's bank with generated questions so a session can start.
async fn ensure_questions(
    questions: &dyn QuestionRepository,
    subject_id: SubjectId,
    needed: u32,
    seed: u64,
) -> Result<(), Box<dyn std::error::Error>> {
    let existing = questions.count_questions(subject_id).await?;
    if existing >= needed {
        return Ok(());
    }

    let topic = catalog::mock_exams()
        .iter()
        .find(|exam| exam.subject_id == subject_id)
        .map_or_else(|| format!("Subject {subject_id}"), |exam| exam.title.to_string());
    let missing = needed - existing;
    let first_id = subject_start_id(subject_id, u64::from(existing), u64::from(missing))
        .ok_or_else(|| format!("subject id {subject_id} is too large for generated ids"))?;
    let generated = SeededQuestionGenerator::new(seed ^ subject_id.value())
        .starting_at(first_id)
        .generate(subject_id, &topic, missing)?;
    for question in &generated {
        questions.upsert_question(question).await?;
    }
    info!(subject_id = %subject_id, added = generated.len(), "generated demo questions");
    Ok(())
}

/// Accept bare paths as well as `sqlite:` URLs, creating the file on first use.
fn normalize_sqlite_url(raw: &str) -> Result<String, Box<dyn std::error::Error>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err("--db cannot be empty".into());
    }
    if trimmed.starts_with("sqlite::memory:") {
        return Ok(trimmed.to_string());
    }
    let path = trimmed
        .strip_prefix("sqlite://")
        .or_else(|| trimmed.strip_prefix("sqlite:"))
        .unwrap_or(trimmed);
    let path = path.split('?').next().unwrap_or(path);
    Ok(format!("sqlite://{path}?mode=rwc"))
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}
