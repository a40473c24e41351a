//! `modernize run`

use std::fs;
use std::sync::Arc;

use anyhow::{Context, Result};
use colored::*;
use serde_json::json;

use crate::cli::RunArgs;
use modernize::functions::FunctionProcessor;
use modernize::mapping::{ContentUnit, MappingFile, PropertyBag};
use modernize::source::{FolderAssetPersistence, InMemorySource, UserMappingTable, WebInfo};
use modernize::{Config, TransformationContext};

pub fn handle_run_command(args: RunArgs, config: &Config) -> Result<()> {
    let mapping = MappingFile::load(&args.mapping)
        .with_context(|| format!("Failed to load mapping file: {}", args.mapping.display()))?;
    let mut definition = mapping
        .find(&args.web_part)
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("No mapping for web part type '{}'", args.web_part))?;

    let raw = fs::read_to_string(&args.properties)
        .with_context(|| format!("Failed to read properties file: {}", args.properties.display()))?;
    let properties: PropertyBag = serde_json::from_str(&raw)
        .with_context(|| format!("Properties file is not a JSON object of strings: {}", args.properties.display()))?;

    let source = InMemorySource::load(&args.source)
        .with_context(|| format!("Failed to load source snapshot: {}", args.source.display()))?;

    let mut context = TransformationContext::new(Arc::new(source), config.transform.clone());
    if let Some(url) = &args.target_web {
        let target = WebInfo::new(url.as_str());
        if let Some(dir) = &args.assets {
            let prefix = format!(
                "{}/{}",
                target.server_relative_url,
                config.transform.asset_folder.trim_matches('/')
            );
            context = context.with_assets(Arc::new(FolderAssetPersistence::new(dir, prefix)));
        }
        context = context.with_target(target);
    } else if args.assets.is_some() {
        log::warn!("--assets has no effect without --target-web");
    }
    if let Some(path) = &args.users {
        let table = UserMappingTable::load(path)
            .with_context(|| format!("Failed to load user mapping: {}", path.display()))?;
        log::info!("Loaded {} user mappings", table.len());
        context = context.with_user_mapper(Arc::new(table));
    }

    let mut unit = ContentUnit::new(args.web_part.as_str(), args.kind.into());
    unit.properties = properties;

    let processor = FunctionProcessor::new(&context);
    let outcome = processor
        .process(&mut definition, &mut unit)
        .with_context(|| format!("Web part '{}' cannot be transformed", args.web_part))?;

    let variant = definition.select_mapping(outcome.selector.as_deref()).cloned();
    let mut skipped = outcome.skipped;
    if let Some(functions) = variant.as_ref().and_then(|v| v.functions.as_deref()) {
        let extra = processor
            .process_functions(functions, &mut definition, &mut unit)
            .with_context(|| format!("Mapping functions of web part '{}' failed", args.web_part))?;
        skipped.extend(extra.skipped);
    }

    if args.json {
        let properties: serde_json::Map<String, serde_json::Value> = unit
            .properties
            .iter_sorted()
            .into_iter()
            .map(|(k, v)| (k.to_string(), json!(v)))
            .collect();
        let skipped: Vec<_> = skipped
            .iter()
            .map(|s| json!({ "property": s.property, "expression": s.expression, "error": s.error.to_string() }))
            .collect();
        let output = json!({
            "selector": outcome.selector,
            "mapping": variant.as_ref().map(|v| v.name.clone()),
            "properties": properties,
            "skipped": skipped,
        });
        println!("{}", serde_json::to_string_pretty(&output).context("Failed to format JSON output")?);
        return Ok(());
    }

    if let Some(selector) = &outcome.selector {
        println!("{} {}", "Selector:".bold(), selector.cyan());
    }
    match &variant {
        Some(v) => println!("{} {}", "Mapping:".bold(), v.name.bright_green()),
        None => println!("{} {}", "Mapping:".bold(), "none".dimmed()),
    }

    println!("{}", "Properties:".bold());
    for (name, value) in unit.properties.iter_sorted() {
        println!("  {} = {}", name.cyan(), value);
    }

    if !skipped.is_empty() {
        println!("{}", "Skipped:".bold().yellow());
        for s in &skipped {
            println!("  {} {}", s.expression.yellow(), s.error.to_string().dimmed());
        }
    }

    Ok(())
}
