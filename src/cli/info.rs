//! Info command - show what the engine reports about the index

use clap::Args;

use super::TargetArgs;

#[derive(Args)]
pub struct InfoArgs {
    /// Output format (text, json)
    #[arg(long, default_value = "text", value_parser = ["text", "json"])]
    pub format: String,
}

pub async fn run(args: InfoArgs, target: &TargetArgs) -> anyhow::Result<()> {
    let adapter = target.adapter(Some(1), false).await?;
    let name = adapter.index().name().to_string();
    let desc = adapter.describe().await?;

    if args.format == "json" {
        let json = serde_json::json!({
            "index": name,
            "exists": desc.exists,
            "index_total": desc.index_total,
            "doc_count": desc.doc_count,
            "mapping": desc.mapping,
        });
        println!("{}", serde_json::to_string_pretty(&json)?);
        return Ok(());
    }

    if !desc.exists {
        println!("Index '{}' does not exist", name);
        return Ok(());
    }

    println!("Index '{}'", name);
    println!("{}", "=".repeat(50));
    if let Some(count) = desc.doc_count {
        println!("   Documents:      {}", count);
    }
    if let Some(total) = desc.index_total {
        println!("   Index total:    {}", total);
    }

    let properties = desc
        .mapping
        .as_ref()
        .and_then(|m| m.get(&name))
        .and_then(|m| m["mappings"]["properties"].as_object());
    if let Some(properties) = properties {
        println!("   Fields:");
        for (field, mapping) in properties {
            let kind = mapping["type"].as_str().unwrap_or("?");
            match mapping.get("dimension") {
                Some(dim) => println!("     {} ({}, {} dims, {})", field, kind, dim, mapping["method"]),
                None => println!("     {} ({})", field, kind),
            }
        }
    }
    Ok(())
}
