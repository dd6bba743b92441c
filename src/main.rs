use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tokio::io::{self, AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing_subscriber::EnvFilter;
use twentyq::cli::{Cli, Commands};
use twentyq::game::{
    AnswerType, AskQuestionRequest, GameMode, GameStatus, SessionRequest, StartGameRequest,
    SubmitAnswerRequest,
};
use twentyq::storage::GameStore;
use twentyq::{api, build_orchestrator, utils, Settings, TurnOrchestrator};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let mut settings = Settings::new()?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    if let Commands::Serve { bind: Some(bind) } = &cli.command {
        settings.server.bind_addr = bind.clone();
    }

    let orchestrator = Arc::new(build_orchestrator(settings)?);

    match cli.command {
        Commands::Serve { .. } => api::run(orchestrator).await,
        Commands::Play { category, mode } => {
            let mode = GameMode::from(mode);
            if let Err(e) = play(orchestrator, category, mode).await {
                utils::print_error(&format!("Error: {}", e));
            }
            Ok(())
        }
    }
}

async fn read_line(lines: &mut Lines<BufReader<Stdin>>) -> Result<Option<String>> {
    Ok(lines.next_line().await?.map(|l| l.trim().to_string()))
}

async fn play(orchestrator: Arc<TurnOrchestrator>, category: Option<String>, mode: GameMode) -> Result<()> {
    let started = orchestrator
        .start_game(StartGameRequest {
            category,
            mode: Some(mode),
        })
        .await?;

    utils::print_header(&format!("20 Questions: {}", started.category));
    utils::print_info(&started.message);

    let mut lines = BufReader::new(io::stdin()).lines();
    let outcome = match mode {
        GameMode::Guess => play_guess(&orchestrator, &started.session_id, &mut lines).await,
        GameMode::AiGuessing => {
            if let Some(q) = &started.first_question {
                utils::print_question(1, q);
            }
            play_ai_guessing(&orchestrator, &started.session_id, &mut lines).await
        }
    };

    // Terminal games have no client to resume them.
    if let Err(e) = orchestrator.store().delete_session(&started.session_id).await {
        tracing::warn!("[Play] Could not remove session {}: {}", started.session_id, e);
    }
    outcome
}

async fn play_guess(
    orchestrator: &TurnOrchestrator,
    session_id: &str,
    lines: &mut Lines<BufReader<Stdin>>,
) -> Result<()> {
    utils::print_info("Type a yes/no question, 'hint' for a hint or 'quit' to give up.\n");

    loop {
        utils::print_prompt("You: ");
        let Some(input) = read_line(lines).await? else {
            return Ok(());
        };
        if input.is_empty() {
            continue;
        }

        let session = SessionRequest {
            session_id: session_id.to_string(),
        };
        match input.to_lowercase().as_str() {
            "quit" | "exit" => {
                let quit = orchestrator.quit(session).await?;
                utils::print_outcome(GameStatus::Lost, &quit.message);
                return Ok(());
            }
            "hint" => match orchestrator.get_hint(session).await {
                Ok(hint) => {
                    utils::print_success(&format!("Hint: {}", hint.hint));
                    utils::print_remaining(hint.questions_remaining);
                    if let Some(message) = &hint.message {
                        utils::print_outcome(hint.status, message);
                        return Ok(());
                    }
                }
                Err(e) => utils::print_error(&e.to_string()),
            },
            _ => {
                let reply = orchestrator
                    .ask_question(AskQuestionRequest {
                        session_id: session_id.to_string(),
                        question: input,
                    })
                    .await;
                match reply {
                    Ok(reply) => {
                        if !reply.answer.is_empty() {
                            utils::print_answer(&reply.answer);
                        }
                        if let Some(message) = &reply.message {
                            utils::print_outcome(reply.status, message);
                        }
                        if reply.status != GameStatus::Active {
                            return Ok(());
                        }
                        utils::print_remaining(reply.questions_remaining);
                    }
                    Err(e) if e.is_turn_failure() => {
                        utils::print_error(&format!("{} (try again)", e));
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        }
    }
}

async fn play_ai_guessing(
    orchestrator: &TurnOrchestrator,
    session_id: &str,
    lines: &mut Lines<BufReader<Stdin>>,
) -> Result<()> {
    utils::print_info("Answer with y / n / s (sometimes) / ? (not sure), free text, or 'quit'.\n");

    loop {
        utils::print_prompt("You: ");
        let Some(input) = read_line(lines).await? else {
            return Ok(());
        };
        let (answer, answer_type) = match input.to_lowercase().as_str() {
            "" => continue,
            "quit" | "exit" => {
                let quit = orchestrator
                    .quit(SessionRequest {
                        session_id: session_id.to_string(),
                    })
                    .await?;
                utils::print_info(&quit.message);
                return Ok(());
            }
            "y" => ("Yes".to_string(), AnswerType::Chip),
            "n" => ("No".to_string(), AnswerType::Chip),
            "s" => ("Sometimes".to_string(), AnswerType::Chip),
            "?" => ("Not sure".to_string(), AnswerType::Chip),
            _ => (input, AnswerType::Text),
        };

        let reply = orchestrator
            .submit_answer(SubmitAnswerRequest {
                session_id: session_id.to_string(),
                answer,
                answer_type,
            })
            .await;
        match reply {
            Ok(reply) => {
                if let Some(message) = &reply.message {
                    utils::print_outcome(reply.status, message);
                }
                if reply.status != GameStatus::Active {
                    return Ok(());
                }
                if let Some(next) = &reply.next_question {
                    utils::print_question(reply.questions_asked, next);
                    utils::print_remaining(reply.questions_remaining);
                }
            }
            Err(e) if e.is_turn_failure() => utils::print_error(&format!("{} (try again)", e)),
            Err(e) => return Err(e.into()),
        }
    }
}
