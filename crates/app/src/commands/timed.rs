use tokio::io::{AsyncBufReadExt, BufReader};

use exam_core::model::{ExamResult, SessionConfig, SubjectId};
use services::time_fmt::format_countdown;
use services::{Advance, ExamService, ExamSession, ReportStatus, SessionEvent};

use super::{parse_choice, print_question};

const HELP: &str = "commands: <label> answer, n next, p previous, f flag, g <num> jump, \
                    l list, s submit, q quit";

/// Drive a timed session from stdin until it completes or the learner quits.
pub async fn run(
    exams: &ExamService,
    subject_id: SubjectId,
    config: SessionConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let free_navigation = config.allow_free_navigation();
    let (session, mut events) = exams.start(subject_id, config).await?;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("{HELP}");
    show_current(&session);

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(SessionEvent::Tick { remaining_secs }) => {
                    if remaining_secs > 0 && remaining_secs % 60 == 0 {
                        println!("[{} left]", format_countdown(remaining_secs));
                    }
                }
                Some(SessionEvent::TimeWarning { remaining_secs }) => {
                    println!("*** {} remaining ***", format_countdown(remaining_secs));
                }
                Some(SessionEvent::Completed { completion, report }) => {
                    if completion.forced {
                        println!("Time is up.");
                    }
                    print_result(&completion.result);
                    print_report(&report.status().await);
                    return Ok(());
                }
                None => return Ok(()),
            },
            line = lines.next_line() => {
                let Some(line) = line? else {
                    session.exit();
                    return Ok(());
                };
                if !handle_command(&session, line.trim(), free_navigation) {
                    session.exit();
                    println!("Session abandoned; nothing was recorded.");
                    return Ok(());
                }
            }
        }
    }
}

/// Apply one learner command. Returns `false` when the learner quits.
fn handle_command(session: &ExamSession, input: &str, free_navigation: bool) -> bool {
    let mut parts = input.split_whitespace();
    match parts.next() {
        None => {}
        Some("q") => return false,
        Some("?" | "h") => println!("{HELP}"),
        Some("n") => {
            let moved = if free_navigation {
                session.next()
            } else {
                matches!(session.advance(), Ok(Advance::Moved { .. }))
            };
            if moved {
                show_current(session);
            }
        }
        Some("p") => {
            if session.previous() {
                show_current(session);
            }
        }
        Some("f") => {
            if session.toggle_flag() {
                let index = session.current_index();
                let flagged = session.flags().get(index).copied().unwrap_or(false);
                println!("{}", if flagged { "flagged" } else { "unflagged" });
            } else {
                println!("flagging is not available");
            }
        }
        Some("g") => {
            let target = parts.next().and_then(|raw| raw.parse::<usize>().ok());
            match target.map(|n| session.jump_to(n.saturating_sub(1))) {
                Some(Ok(())) => show_current(session),
                Some(Err(err)) => println!("{err}"),
                None => println!("usage: g <question number>"),
            }
        }
        Some("l") => list_questions(session),
        Some("s") => {
            let _ = session.finish();
        }
        Some(other) => {
            let choice = session
                .current_question()
                .and_then(|question| parse_choice(&question, other));
            match choice.map(|index| session.select_answer(index)) {
                Some(Ok(())) if free_navigation => show_current(session),
                Some(Ok(())) => {}
                Some(Err(err)) => println!("{err}"),
                None => println!("unknown command; {HELP}"),
            }
        }
    }
    true
}

fn show_current(session: &ExamSession) {
    let progress = session.progress();
    let Some(question) = session.current_question() else {
        return;
    };
    println!(
        "\nQuestion {}/{}  [{}]  answered {}/{}",
        progress.current_index + 1,
        progress.total,
        format_countdown(progress.remaining_secs),
        progress.answered,
        progress.total
    );
    print_question(&question, session.current_answer());
}

fn list_questions(session: &ExamSession) {
    let line: Vec<String> = session
        .question_statuses()
        .iter()
        .map(|status| {
            let mark = match (status.answered, status.flagged) {
                (_, true) => '!',
                (true, false) => '*',
                (false, false) => '.',
            };
            if status.current {
                format!("[{}{mark}]", status.index + 1)
            } else {
                format!("{}{mark}", status.index + 1)
            }
        })
        .collect();
    println!("{}", line.join(" "));
}

fn print_result(result: &ExamResult) {
    println!();
    println!(
        "Score: {}%  ({})",
        result.score_percent(),
        if result.passed() { "passed" } else { "not passed" }
    );
    println!("Passing score: {}%", result.passing_score_percent());
    println!(
        "Correct {}  Incorrect {}  Skipped {}  of {}",
        result.correct_count(),
        result.incorrect_count(),
        result.skipped_count(),
        result.total_questions()
    );
    println!("Time used: {}", format_countdown(result.elapsed_secs()));
}

fn print_report(status: &ReportStatus) {
    match status {
        ReportStatus::Submitted { records } => println!("Saved {records} answers."),
        ReportStatus::Skipped => println!("Sign in (--user) to save your results."),
        ReportStatus::Failed { reason } => println!("Results could not be saved: {reason}"),
    }
}
