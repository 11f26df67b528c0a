use agentic_rag::{config::RagConfig, RagLoop};
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const QUESTIONS: &[&str] = &[
    "What are best practices for caching?",
    "How should I set up CI/CD pipelines?",
    "What are performance tuning tips?",
    "How do I version my APIs?",
    "What should I consider for error handling?",
];

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let rag = match RagConfig::from_env().and_then(|config| {
        let (knowledge_base, model) = config.build_collaborators()?;
        Ok(RagLoop::new(knowledge_base, model, config.loop_config))
    }) {
        Ok(rag) => rag,
        Err(e) => {
            eprintln!("Startup failed: {}", e);
            return ExitCode::FAILURE;
        }
    };

    info!(questions = QUESTIONS.len(), "Batch run starting");

    let mut failures = 0;

    for question in QUESTIONS {
        match rag.run(question).await {
            Ok(outcome) => {
                println!("\nQ: {}", question);
                println!("Final Answer: {}", outcome.final_answer);
                println!("Review: {}", outcome.review_text);
            }
            Err(e) => {
                failures += 1;
                error!(question = %question, "Run failed: {}", e);
                println!("\nQ: {}", question);
                println!("Failed: {}", e);
            }
        }
    }

    info!(failures, "Batch run finished");

    if failures > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
