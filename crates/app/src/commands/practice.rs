use tokio::io::{AsyncBufReadExt, BufReader};

use services::{PracticeSession, ReportStatus};

use super::{parse_choice, print_question};

/// Untimed loop: answer, see feedback, move on. `q` prints the tally.
pub async fn run(mut practice: PracticeSession) -> Result<(), Box<dyn std::error::Error>> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    println!("commands: <label> answer, n next question, q quit");

    print_question(practice.next_question().await?, None);

    while let Some(line) = lines.next_line().await? {
        let input = line.trim();
        match input {
            "" => {}
            "q" => break,
            "n" => print_question(practice.next_question().await?, None),
            other => {
                let Some(choice) = practice
                    .current_question()
                    .and_then(|question| parse_choice(question, other))
                else {
                    println!("unknown choice: {other}");
                    continue;
                };
                if let Err(err) = practice.select(choice) {
                    println!("{err}");
                    continue;
                }
                let submission = practice.submit()?;
                let feedback = &submission.feedback;
                if feedback.is_correct {
                    println!("Correct.");
                } else {
                    let label = practice
                        .current_question()
                        .and_then(|q| q.choices().get(feedback.correct_choice))
                        .map_or("?", |choice| choice.label.as_str());
                    println!("Incorrect. The answer is {label}.");
                }
                if let ReportStatus::Failed { reason } = submission.report.status().await {
                    println!("(answer not saved: {reason})");
                }
                println!("type n for the next question");
            }
        }
    }

    let stats = practice.stats();
    println!(
        "Answered {}  Correct {}  Accuracy {}%",
        stats.answered,
        stats.correct,
        stats.accuracy_percent()
    );
    Ok(())
}
