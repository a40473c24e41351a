//! `modernize parse`

use anyhow::{Context, Result};
use colored::*;

use crate::cli::ParseArgs;
use modernize::functions::{FunctionDefinition, FunctionRegistry, ParseScope, parse_function, split_chain};
use modernize::mapping::{ContentUnit, WebPartKind};

/// Parse against an empty, loosely typed unit so any placeholder is accepted
pub fn handle_parse_command(args: ParseArgs) -> Result<()> {
    let unit = ContentUnit::new("Expression", WebPartKind::ClientSide);
    let scope = ParseScope {
        property: args.property.as_deref(),
        declared: &[],
        unit: &unit,
    };

    let expressions = split_chain(&args.expression);
    if expressions.is_empty() {
        anyhow::bail!("No function expression given");
    }

    for (i, expression) in expressions.iter().enumerate() {
        if i > 0 {
            println!();
        }
        let definition = parse_function(expression, &scope)
            .with_context(|| format!("Failed to parse '{}'", expression.trim()))?;
        print_definition(&definition);
    }

    Ok(())
}

fn print_definition(definition: &FunctionDefinition) {
    println!("{} {}", "Function:".bold(), definition.qualified_name().cyan());

    let known: Vec<String> = [FunctionRegistry::general(), FunctionRegistry::publishing()]
        .iter()
        .filter(|r| r.get(&definition.name).is_some())
        .map(|r| r.library().to_string())
        .collect();
    if !definition.add_on.is_empty() {
        println!("  {}", "add-on functions are not dispatched".yellow());
    } else if known.is_empty() {
        println!("  {}", "not a built-in function".yellow());
    } else {
        println!("  {} {}", "library:".dimmed(), known.join(", "));
    }

    println!("  {} {}", "output:".dimmed(), definition.output.name);
    for (i, param) in definition.input.iter().enumerate() {
        let origin = if param.is_static {
            format!("'{}'", param.value).green()
        } else {
            format!("{{{}}}", param.name).blue()
        };
        println!(
            "  {} {} {} ({})",
            format!("input {}:", i).dimmed(),
            param.name,
            origin,
            param.param_type
        );
    }
}
