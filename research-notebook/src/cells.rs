use std::sync::LazyLock;

use regex::Regex;

// Constant pattern; compiling it cannot fail.
#[allow(clippy::expect_used)]
static CELL_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(# %%|# In\[\d*\]:|# CELL:|# ---)").expect("cell marker pattern")
});

const DEFINITION_PREFIXES: &[&str] = &["def ", "class ", "async def "];
const IMPORT_PREFIXES: &[&str] = &["import ", "from ", "#"];

fn is_marker(line: &str) -> bool {
    CELL_MARKER.is_match(line)
}

/// Split source into notebook cells.
///
/// Marker lines (`# %%`, `# In[N]:`, `# CELL:`, `# ---`) start a new cell and
/// are themselves dropped. Without markers the leading import block and each
/// top-level `def`/`class` get their own cell. Never returns an empty list.
pub fn split_code_into_cells(code: &str) -> Vec<String> {
    let cells = if code.lines().any(is_marker) {
        split_on_markers(code)
    } else {
        split_on_sections(code)
    };
    if cells.is_empty() {
        vec![code.to_string()]
    } else {
        cells
    }
}

fn split_on_markers(code: &str) -> Vec<String> {
    let mut cells = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    for line in code.lines() {
        if is_marker(line) {
            push_trimmed(&mut cells, &current);
            current.clear();
        } else {
            current.push(line);
        }
    }
    push_trimmed(&mut cells, &current);
    cells
}

fn push_trimmed(cells: &mut Vec<String>, lines: &[&str]) {
    let joined = lines.join("\n");
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        cells.push(trimmed.to_string());
    }
}

fn split_on_sections(code: &str) -> Vec<String> {
    let mut cells = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut in_imports = true;

    for line in code.lines() {
        let stripped = line.trim();
        let leaves_imports = in_imports
            && !stripped.is_empty()
            && !IMPORT_PREFIXES.iter().any(|p| stripped.starts_with(p));
        let starts_definition = DEFINITION_PREFIXES.iter().any(|p| stripped.starts_with(p));

        if leaves_imports {
            in_imports = false;
        }
        if (leaves_imports || starts_definition) && !current.is_empty() {
            cells.push(current.join("\n"));
            current.clear();
        }
        current.push(line);
    }
    if !current.is_empty() {
        cells.push(current.join("\n"));
    }
    cells
}
