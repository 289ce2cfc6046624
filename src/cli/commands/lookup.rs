//! Catalog lookup, search, and tag inspection commands.

use std::path::Path;
use tokio::runtime::Runtime;

use crate::catalog::AudibleClient;
use crate::config::Config;
use crate::library::Pipeline;
use crate::matcher;
use crate::organizer;
use crate::tags;

/// Fetch metadata for explicit ASINs and create book folders (sidecars and
/// cover, no audio file).
pub fn cmd_lookup(
    rt: &Runtime,
    config: &Config,
    asins: &[String],
    output: Option<&Path>,
    dry_run: bool,
) -> anyhow::Result<()> {
    let output_dir = output
        .unwrap_or(&config.organizer.default_output_dir)
        .to_path_buf();

    rt.block_on(async {
        let client = AudibleClient::new(&config.audible);
        let pipeline = Pipeline::new(&client, config);

        for asin in asins {
            let asin = asin.trim();
            if asin.is_empty() {
                continue;
            }
            println!("--- Processing ASIN: {asin} ---");

            let record = match client.fetch_by_asin(asin).await {
                Ok(record) => record,
                Err(e) => {
                    eprintln!("Failed to fetch metadata for ASIN {asin}: {e}. Skipping.");
                    continue;
                }
            };

            let record = match matcher::finalize(record) {
                Ok(record) => record,
                Err(e) => {
                    eprintln!("Catalog entry {asin} is unusable: {e}. Skipping.");
                    continue;
                }
            };

            if dry_run {
                match organizer::plan_paths(&record, None, &output_dir, config) {
                    Ok(plan) => {
                        println!("[DRY RUN] Would create folder: {}", plan.folder.display())
                    }
                    Err(e) => eprintln!("Failed to plan folder for {asin}: {e}"),
                }
                continue;
            }

            match pipeline.commit(None, &record, None, &output_dir, false).await {
                Ok(plan) => println!("Created {}", plan.folder.display()),
                Err(e) => eprintln!("Failed to create folder for {asin}: {e}"),
            }
        }

        println!("--- Folder creation complete ---");
        Ok(())
    })
}

/// Search the catalog and print ranked candidates.
pub fn cmd_search(
    rt: &Runtime,
    config: &Config,
    keywords: &str,
    num_results: usize,
) -> anyhow::Result<()> {
    rt.block_on(async {
        let client = AudibleClient::new(&config.audible);

        let hits = client.search(keywords, num_results).await?;
        if hits.is_empty() {
            println!("No results for: {keywords}");
            return Ok(());
        }

        println!("Results for: {keywords}\n");
        for (i, hit) in hits.iter().enumerate() {
            println!(
                "  [{}] {} - {} ({}) [{}]",
                i + 1,
                hit.title,
                hit.authors.join(" & "),
                hit.year
                    .map(|y| y.to_string())
                    .unwrap_or_else(|| "?".to_string()),
                hit.asin.as_deref().unwrap_or("no ASIN"),
            );
        }
        Ok(())
    })
}

/// Show the embedded tags of an audio file.
pub fn cmd_tags(path: &Path) -> anyhow::Result<()> {
    let info = tags::read(path)?;

    println!("Tags for {}:", path.display());
    println!("  Title:  {}", info.title.as_deref().unwrap_or("(none)"));
    println!("  Author: {}", info.author.as_deref().unwrap_or("(none)"));
    println!("  ASIN:   {}", info.asin.as_deref().unwrap_or("(none)"));
    match &info.cover {
        Some(cover) => println!(
            "  Cover:  {} ({} bytes)",
            cover.mime_type,
            cover.data.len()
        ),
        None => println!("  Cover:  (none)"),
    }

    if info.asin.is_none() {
        if let Some(asin) = tags::asin_from_filename(path) {
            println!("  ASIN found in filename: {asin}");
        }
    }

    Ok(())
}
