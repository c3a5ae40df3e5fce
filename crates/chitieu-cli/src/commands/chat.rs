//! Interactive chat session

use std::io::{BufRead, Write};

use anyhow::Result;
use chitieu_core::ExpenseTracker;
use tracing::warn;

use super::entries::render_processed;

const EXIT_WORDS: &[&str] = &["exit", "quit", "thoát", "thoat"];

/// Chat on stdin/stdout until an exit word or EOF
pub async fn cmd_chat(tracker: &ExpenseTracker) -> Result<()> {
    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    run_chat(tracker, stdin.lock(), stdout.lock()).await?;
    Ok(())
}

/// Process one message per input line; returns the number of messages handled
pub async fn run_chat<R: BufRead, W: Write>(
    tracker: &ExpenseTracker,
    input: R,
    mut output: W,
) -> Result<usize> {
    writeln!(
        output,
        "💬 Chào {}! Nhập chi tiêu, ví dụ 'trưa ăn phở 35k'. Gõ 'thoát' để kết thúc.",
        tracker.user()
    )?;

    let mut handled = 0;
    for line in input.lines() {
        let line = line?;
        let message = line.trim();
        if message.is_empty() {
            continue;
        }
        if EXIT_WORDS.contains(&message.to_lowercase().as_str()) {
            break;
        }

        match tracker.process(message).await {
            Ok(processed) => writeln!(output, "{}", render_processed(&processed))?,
            Err(e) => {
                warn!("Failed to process '{}': {}", message, e);
                writeln!(output, "⚠️ Lỗi: {}", e)?;
            }
        }
        handled += 1;
        output.flush()?;
    }

    writeln!(output, "👋 Tạm biệt!")?;
    Ok(handled)
}
