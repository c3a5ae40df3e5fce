//! Language-model command implementations

use anyhow::{Context, Result};
use chitieu_core::ai::AIBackend;
use chitieu_core::interpret::resolve;
use chitieu_core::{Config, InterpretContext, Interpreter};

/// Check the configured backend and show how it reads one message
pub async fn cmd_llm_test(config: &Config, text: &str) -> Result<()> {
    println!("🔍 Testing language model backend...\n");
    println!("  Backend: {}", config.llm.backend.as_str());
    println!("  Host:    {}", config.llm.host);
    println!("  Model:   {}", config.llm.model);
    println!("  Timeout: {}s\n", config.llm.timeout.as_secs());

    let interpreter = Interpreter::from_config(&config.llm);
    match interpreter.llm() {
        Some(client) => {
            print!("Checking {} availability... ", client.backend_name());
            if client.health_check().await {
                println!("✅ Connected");
            } else {
                println!("❌ Failed");
                println!("\n⚠️  Could not reach {} at {}", client.backend_name(), client.host());
                println!("   Messages will be handled by the rule-based parser.");
            }
        }
        None => {
            println!("💡 No backend configured; only the rule-based parser is used.");
            println!("   Set AI_BACKEND=ollama (or [llm] backend in the config) to enable one.");
        }
    }

    let ctx = InterpretContext::current(&config.user.name);
    println!("\n📋 \"{}\"\n", text);

    let outcome = interpreter.ask_model(text, &ctx).await;
    match &outcome {
        Ok(result) => println!(
            "  Model:  {}",
            serde_json::to_string_pretty(result).context("Failed to format result")?
        ),
        Err(issue) => println!("  Model:  unusable ({})", issue),
    }

    let interpretation = resolve(outcome, text, &ctx);
    println!(
        "  Final ({}): {}",
        interpretation.source,
        serde_json::to_string_pretty(&interpretation.result).context("Failed to format result")?
    );

    Ok(())
}
