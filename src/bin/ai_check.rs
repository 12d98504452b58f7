//! Gemini connectivity smoke test. Exits non-zero when the model cannot be reached.

use std::process::ExitCode;
use storefront::config::GeminiSettings;
use storefront::{init_tracing, GeminiClient};

const PING_PROMPT: &str = "Reply with the single word: pong";

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    init_tracing();

    let Some(settings) = GeminiSettings::from_env() else {
        eprintln!("GEMINI_API_KEY is not set; nothing to check");
        return ExitCode::FAILURE;
    };
    let client = match GeminiClient::new(settings) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("cannot build client: {}", e);
            return ExitCode::FAILURE;
        }
    };
    println!("checking model {} ...", client.model());
    match client.generate(PING_PROMPT).await {
        Ok(reply) => {
            println!("ok: {}", reply.trim());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("failed: {}", e);
            ExitCode::FAILURE
        }
    }
}
