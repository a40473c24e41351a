//! Developer documentation generated from the function tables

use std::fmt::Write;

use serde::Serialize;

use super::registry::{FunctionKind, FunctionRegistry, Library, ParamDoc};

/// One documented function, as exported to JSON
#[derive(Debug, Serialize)]
pub struct DocEntry {
    pub name: &'static str,
    pub library: Library,
    pub kind: FunctionKind,
    pub description: &'static str,
    pub example: &'static str,
    pub params: &'static [ParamDoc],
    pub returns: &'static str,
}

/// Documentation entries of a registry in listing order
pub fn entries(registry: &FunctionRegistry) -> Vec<DocEntry> {
    registry
        .entries()
        .into_iter()
        .map(|f| DocEntry {
            name: f.name,
            library: registry.library(),
            kind: f.kind,
            description: f.doc.description,
            example: f.doc.example,
            params: f.doc.params,
            returns: f.doc.returns,
        })
        .collect()
}

/// Markdown table cells cannot hold raw pipes or line breaks
fn cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}

/// Render one library as a Markdown section
pub fn render_markdown(registry: &FunctionRegistry) -> String {
    let mut out = String::new();
    let title = match registry.library() {
        Library::General => "General functions",
        Library::Publishing => "Publishing functions",
    };
    let _ = writeln!(out, "# {}\n", title);

    let mut current_kind = None;
    for entry in entries(registry) {
        if current_kind != Some(entry.kind) {
            current_kind = Some(entry.kind);
            let heading = match entry.kind {
                FunctionKind::Function => "Functions",
                FunctionKind::Selector => "Selectors",
            };
            let _ = writeln!(out, "## {}\n", heading);
        }

        let _ = writeln!(out, "### {}\n", entry.name);
        let _ = writeln!(out, "{}\n", entry.description);
        let _ = writeln!(out, "Example: `{}`\n", entry.example);

        if !entry.params.is_empty() {
            let _ = writeln!(out, "| Parameter | Type | Description |");
            let _ = writeln!(out, "|---|---|---|");
            for param in entry.params {
                let _ = writeln!(
                    out,
                    "| {} | {} | {} |",
                    param.name,
                    param.param_type,
                    cell(param.description)
                );
            }
            out.push('\n');
        }

        let _ = writeln!(out, "Returns: {}\n", entry.returns);
    }

    out
}

/// Render several libraries as a JSON array
pub fn render_json(registries: &[&FunctionRegistry]) -> serde_json::Result<String> {
    let all: Vec<DocEntry> = registries.iter().flat_map(|r| entries(r)).collect();
    serde_json::to_string_pretty(&all)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_markdown_lists_functions_before_selectors() {
        let markdown = render_markdown(FunctionRegistry::general());
        assert!(markdown.starts_with("# General functions"));
        let functions = markdown.find("## Functions").unwrap();
        let selectors = markdown.find("## Selectors").unwrap();
        assert!(functions < selectors);
        assert!(markdown.find("### HtmlEncode").unwrap() < selectors);
        assert!(markdown.find("### TextSelector").unwrap() > selectors);
        assert!(markdown.contains("| prefixIfEmpty | bool |"));
    }

    #[test]
    fn test_publishing_markdown_has_no_selectors() {
        let markdown = render_markdown(FunctionRegistry::publishing());
        assert!(markdown.contains("### ToTaxonomyTerms"));
        assert!(markdown.contains("### StaticString"));
        assert!(!markdown.contains("## Selectors"));
    }

    #[test]
    fn test_json_export() {
        let json = render_json(&[FunctionRegistry::general(), FunctionRegistry::publishing()]).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let entries = value.as_array().unwrap();
        assert_eq!(
            entries.len(),
            FunctionRegistry::general().len() + FunctionRegistry::publishing().len()
        );
        let prefix = entries.iter().find(|e| e["name"] == "Prefix").unwrap();
        assert_eq!(prefix["library"], "general");
        assert_eq!(prefix["kind"], "function");
        assert_eq!(prefix["params"][2]["type"], "bool");
    }

    #[test]
    fn test_cell_escapes_pipes() {
        assert_eq!(cell("a|b\nc"), "a\\|b c");
    }
}
