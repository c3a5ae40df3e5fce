//! Prompt commands: which templates the model stage uses and where to override them

use anyhow::{Context, Result};
use chitieu_core::prompts::{default_prompts_dir, PromptId, PromptLibrary};

const DIM: &str = "\x1b[2m";
const RESET: &str = "\x1b[0m";

/// One line per prompt, marking the ones replaced by a local file
pub fn cmd_prompts_list() -> Result<()> {
    let mut library = PromptLibrary::new();

    println!("📝 Prompt cho bước phân tích bằng mô hình:");
    for info in library.list() {
        let origin = match &info.override_path {
            Some(path) if info.has_override => format!("tùy chỉnh ({})", path.display()),
            _ => "mặc định".to_string(),
        };
        println!(
            "   {} v{} [{}]: {}",
            info.id, info.version, info.task_type, origin
        );
    }
    println!(
        "   {}(xem nội dung: chitieu prompts show <id>){}",
        DIM, RESET
    );

    Ok(())
}

/// Print one prompt, system and user parts apart
pub fn cmd_prompts_show(prompt_id: &str) -> Result<()> {
    let Ok(id) = prompt_id.parse::<PromptId>() else {
        let known: Vec<&str> = PromptId::all().iter().map(PromptId::as_str).collect();
        eprintln!("❓ Không có prompt '{}'. Có: {}", prompt_id, known.join(", "));
        return Ok(());
    };

    let mut library = PromptLibrary::new();
    let prompt = library
        .get(id)
        .with_context(|| format!("Failed to load prompt {}", id.as_str()))?;

    let origin = match &prompt.override_path {
        Some(path) if prompt.is_override => format!("tùy chỉnh, {}", path.display()),
        _ => "mặc định".to_string(),
    };
    println!(
        "📝 {} v{} [{}] ({})",
        prompt.metadata.id, prompt.metadata.version, prompt.metadata.task_type, origin
    );

    match (prompt.system_section(), prompt.user_section()) {
        (system, Some(user)) => {
            if let Some(system) = system {
                println!("\n{}# system{}\n{}", DIM, RESET, system.trim());
            }
            println!("\n{}# user{}\n{}", DIM, RESET, user.trim());
        }
        _ => println!("\n{}", prompt.content.trim()),
    }

    Ok(())
}

/// Override directory, plus the file each prompt would be read from
pub fn cmd_prompts_path() -> Result<()> {
    let Some(dir) = default_prompts_dir() else {
        eprintln!("⚠️  Không xác định được thư mục dữ liệu, chỉ dùng prompt mặc định.");
        return Ok(());
    };

    println!("{}", dir.display());
    if !dir.exists() {
        eprintln!(
            "   {}(chưa có thư mục này; tạo nó rồi đặt file prompt vào để ghi đè){}",
            DIM, RESET
        );
    }

    let library = PromptLibrary::with_override_dir(dir);
    for &id in PromptId::all() {
        if let Some(path) = library.override_path(id) {
            let mark = if path.exists() { "✓" } else { "·" };
            println!("   {} {}", mark, path.display());
        }
    }

    Ok(())
}
