//! `llmpu memory` — inspect saved memory files.

use std::path::Path;

use llmpu_memory::MemoryStore;

pub async fn show(file: &Path) -> Result<(), Box<dyn std::error::Error>> {
    if !file.exists() {
        return Err(format!("No memory file at {}", file.display()).into());
    }

    let store = MemoryStore::load_from(file)?;
    print!("{}", render(&store)?);
    Ok(())
}

/// Render every leaf as a header line followed by its turns.
fn render(store: &MemoryStore) -> Result<String, Box<dyn std::error::Error>> {
    let leaves = store.leaf_paths();
    if leaves.is_empty() {
        return Ok("(memory is empty)\n".into());
    }

    let mut out = String::new();
    for (path, count) in leaves {
        out.push_str(&format!("{path} ({count} turns)\n"));
        for turn in store.leaf(&path)? {
            for (i, line) in turn.content.lines().enumerate() {
                if i == 0 {
                    out.push_str(&format!("  {:>9}: {line}\n", turn.role));
                } else {
                    out.push_str(&format!("  {:>9}  {line}\n", ""));
                }
            }
        }
    }
    Ok(out)
}
