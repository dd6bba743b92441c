use crate::game::GameStatus;
use colored::*;
use std::io::Write;

pub fn print_header(text: &str) {
    println!("\n{}", text.bright_cyan().bold());
    println!("{}", "=".repeat(text.len()).bright_cyan());
}

pub fn print_success(text: &str) {
    println!("{}", text.green());
}

pub fn print_error(text: &str) {
    eprintln!("{}", text.red().bold());
}

pub fn print_info(text: &str) {
    println!("{}", text.blue());
}

pub fn print_prompt(text: &str) {
    print!("{}", text.yellow().bold());
    let _ = std::io::stdout().flush();
}

/// Answer colored by vocabulary value.
pub fn print_answer(answer: &str) {
    let colored = match answer {
        "Yes" => answer.green().bold(),
        "No" => answer.red().bold(),
        _ => answer.yellow(),
    };
    println!("{} {}", "AI:".bright_white(), colored);
}

pub fn print_question(number: u32, question: &str) {
    println!("{} {}", format!("Q{}:", number).bright_magenta().bold(), question);
}

pub fn print_remaining(questions_remaining: u32) {
    println!("{}", format!("({} questions left)", questions_remaining).dimmed());
}

pub fn print_outcome(status: GameStatus, message: &str) {
    match status {
        GameStatus::Won => println!("\n{}", message.bright_green().bold()),
        GameStatus::Lost => println!("\n{}", message.bright_red().bold()),
        GameStatus::Active => print_info(message),
    }
}
