use services::catalog;

/// Print the mock exam catalog as a table or JSON.
pub fn list(json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let exams = catalog::mock_exams();
    if json {
        println!("{}", serde_json::to_string_pretty(exams)?);
        return Ok(());
    }
    for exam in exams {
        println!(
            "{:>2}  {:<34} {:>3} questions  {:>3} min",
            exam.id, exam.title, exam.question_count, exam.time_limit_minutes
        );
        println!("    {}", exam.description);
    }
    Ok(())
}
