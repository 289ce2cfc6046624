//! Batch organization command.
//!
//! Drives the pipeline over every new file in the input directory. Each
//! identified file is shown with its local/catalog diff for review unless
//! `--yes` runs the batch headless. Network failures surface a
//! retry/manual/skip choice instead of an automatic retry loop.

use std::collections::HashMap;
use std::io::{self, Write};
use std::path::Path;
use tokio::runtime::Runtime;

use crate::catalog::{AudibleClient, CatalogApi};
use crate::config::Config;
use crate::library::{self, AsinSource, Identified, Pipeline, Prepared};
use crate::matcher::{self, FieldDiff};
use crate::model::BookRecord;
use crate::organizer;
use crate::scanner;
use crate::skiplog::{ProcessedEntry, ProcessedLog};
use crate::tags;

enum FileOutcome {
    Processed,
    Failed,
    Skipped,
}

enum Decision {
    Accept(Box<Identified>),
    Skip,
}

/// Organize audiobook files based on embedded tags and catalog metadata.
#[allow(clippy::too_many_arguments)]
pub fn cmd_organize(
    rt: &Runtime,
    config: &Config,
    input: &Path,
    output: Option<&Path>,
    move_flag: bool,
    asin_map_path: Option<&Path>,
    dry_run: bool,
    yes: bool,
) -> anyhow::Result<()> {
    let output_dir = output
        .unwrap_or(&config.organizer.default_output_dir)
        .to_path_buf();
    let move_files = move_flag || config.organizer.move_files;

    if !input.exists() {
        anyhow::bail!("input path does not exist: {}", input.display());
    }

    rt.block_on(async {
        let client = AudibleClient::new(&config.audible);
        let pipeline = Pipeline::new(&client, config);

        let log_path = ProcessedLog::location(
            &output_dir,
            config.organizer.processed_log_path.as_deref(),
        );
        let mut processed_log = ProcessedLog::load(log_path);
        if !processed_log.is_empty() {
            println!("Skip-log has {} entries", processed_log.len());
        }
        let asin_map = library::load_asin_map(asin_map_path);

        let files = scanner::find_new_files(
            input,
            &processed_log,
            config.organizer.min_file_size_mb,
        );
        if files.is_empty() {
            println!(
                "No new audio files (>= {}MB) found in {}",
                config.organizer.min_file_size_mb,
                input.display()
            );
            return Ok(());
        }

        println!("Organizing {} files...", files.len());
        println!("Destination: {}", output_dir.display());
        if dry_run {
            println!("\n[DRY RUN MODE - No files will be moved or written]\n");
        }

        let mut processed_count = 0;
        let mut failed_count = 0;
        let mut skipped_count = 0;

        for path in &files {
            println!("\n--- Processing: {} ---", path.display());
            let outcome = process_file(
                &pipeline,
                path,
                input,
                &output_dir,
                &asin_map,
                config,
                &mut processed_log,
                move_files,
                dry_run,
                yes,
            )
            .await;

            match outcome {
                FileOutcome::Processed => processed_count += 1,
                FileOutcome::Failed => failed_count += 1,
                FileOutcome::Skipped => skipped_count += 1,
            }
        }

        println!("\n--- Processing Complete ---");
        println!("Successfully processed: {processed_count}");
        println!("Failed to process:      {failed_count}");
        println!("Skipped:                {skipped_count}");
        Ok(())
    })
}

#[allow(clippy::too_many_arguments)]
async fn process_file<C: CatalogApi>(
    pipeline: &Pipeline<'_, C>,
    path: &Path,
    input: &Path,
    output_dir: &Path,
    asin_map: &HashMap<String, String>,
    config: &Config,
    processed_log: &mut ProcessedLog,
    move_files: bool,
    dry_run: bool,
    yes: bool,
) -> FileOutcome {
    // Identification + fetch, with a manual escape hatch on network trouble
    let prepared = loop {
        match pipeline.prepare(path, asin_map, input).await {
            Ok(prepared) => break prepared,
            Err(e) if e.is_catalog() && !yes => {
                eprintln!("Catalog error: {e}");
                match prompt("[r]etry  [a]sin <ASIN>  [s]kip > ").as_str() {
                    "r" => continue,
                    line if line.starts_with("a ") || line.starts_with("asin ") => {
                        let asin = line.split_whitespace().nth(1).unwrap_or("").to_string();
                        match manual_identify(pipeline, path, &asin).await {
                            Ok(ident) => break Prepared::Identified(Box::new(ident)),
                            Err(e) => {
                                eprintln!("Manual lookup failed: {e}");
                                continue;
                            }
                        }
                    }
                    _ => {
                        println!("Skipping {}", path.display());
                        return FileOutcome::Skipped;
                    }
                }
            }
            Err(e) if e.is_catalog() => {
                // Headless: treat like an unidentifiable file
                eprintln!("ERROR fetching metadata for {}: {e}", path.display());
                return park_failed(path, output_dir, move_files, dry_run);
            }
            Err(e) => {
                // Bad local file: skip it and continue the batch
                eprintln!("ERROR reading {}: {e}", path.display());
                return FileOutcome::Skipped;
            }
        }
    };

    let identified = match prepared {
        Prepared::Identified(identified) => identified,
        Prepared::NoMatch(_) => {
            println!("All identification strategies failed for {}", path.display());
            return park_failed(path, output_dir, move_files, dry_run);
        }
    };

    let identified = match review(pipeline, identified, yes).await {
        Decision::Accept(identified) => identified,
        Decision::Skip => {
            println!("Skipping {}", path.display());
            return FileOutcome::Skipped;
        }
    };

    let record = match matcher::finalize(identified.merge.record.clone()) {
        Ok(record) => record,
        Err(e) => {
            eprintln!("Cannot commit {}: {e}", path.display());
            return park_failed(path, output_dir, move_files, dry_run);
        }
    };

    if dry_run {
        return match organizer::plan_paths(&record, Some(path), output_dir, config) {
            Ok(plan) => {
                let dest = plan.audio_file.unwrap_or_else(|| plan.folder.clone());
                let action = if move_files { "move" } else { "copy" };
                println!("[DRY RUN] Would {action}: {} -> {}", path.display(), dest.display());
                println!(
                    "[DRY RUN] Would write sidecars and cover to {}",
                    plan.folder.display()
                );
                FileOutcome::Processed
            }
            Err(e) => {
                eprintln!("ERROR planning {}: {e}", path.display());
                FileOutcome::Failed
            }
        };
    }

    match pipeline
        .commit(
            Some(path),
            &record,
            identified.local.cover.as_ref(),
            output_dir,
            move_files,
        )
        .await
    {
        Ok(plan) => {
            let dest = plan.audio_file.as_deref().unwrap_or(&plan.folder);
            let action = if move_files { "MOVED" } else { "COPIED" };
            println!("{action}: {} -> {}", path.display(), dest.display());

            if let Err(e) = processed_log.record(path, ProcessedEntry::new(dest, &record)) {
                eprintln!("WARNING: could not update processed log: {e}");
            }
            FileOutcome::Processed
        }
        Err(e) => {
            // Commit errors leave the source in place; nothing to clean up
            eprintln!("ERROR organizing {}: {e}", path.display());
            FileOutcome::Failed
        }
    }
}

/// Present the merge for review and collect the user's decision.
async fn review<C: CatalogApi>(
    pipeline: &Pipeline<'_, C>,
    mut identified: Box<Identified>,
    yes: bool,
) -> Decision {
    print_record(&identified.merge.record, identified.asin_source);
    print_diff(&identified.merge.diff);

    if yes {
        return Decision::Accept(identified);
    }

    if identified.candidates.len() > 1 {
        println!("\nOther candidates from the catalog:");
        print_candidates(&identified.candidates);
    }

    loop {
        let line =
            prompt("\n[Enter] accept  [s]kip  [e]dit <field> <value>  [c]andidate <n>  [a]sin <ASIN> > ");
        let mut parts = line.splitn(3, ' ');
        let command = parts.next().unwrap_or("");

        match command {
            "" => return Decision::Accept(identified),
            "s" | "skip" => return Decision::Skip,
            "e" | "edit" => {
                let (field, value) = (parts.next().unwrap_or(""), parts.next().unwrap_or(""));
                match matcher::apply_override(&mut identified.merge.record, field, value) {
                    Ok(()) => print_record(&identified.merge.record, AsinSource::Manual),
                    Err(e) => {
                        eprintln!("{e}");
                        println!("Editable fields: {}", matcher::EDITABLE_FIELDS.join(", "));
                    }
                }
            }
            "c" | "candidate" => {
                let index: usize = match parts.next().unwrap_or("").parse() {
                    Ok(n) => n,
                    Err(_) => {
                        print_candidates(&identified.candidates);
                        continue;
                    }
                };
                let Some(asin) = identified
                    .candidates
                    .get(index.wrapping_sub(1))
                    .and_then(|c| c.asin.clone())
                else {
                    eprintln!("No candidate #{index}");
                    continue;
                };
                match pipeline.remerge(&identified.local, &asin).await {
                    Ok(merge) => {
                        identified.merge = merge;
                        print_record(&identified.merge.record, AsinSource::Manual);
                        print_diff(&identified.merge.diff);
                    }
                    Err(e) => eprintln!("Candidate lookup failed: {e}"),
                }
            }
            "a" | "asin" => {
                let asin = parts.next().unwrap_or("").to_ascii_uppercase();
                if asin.is_empty() {
                    eprintln!("Usage: a <ASIN>");
                    continue;
                }
                match pipeline.remerge(&identified.local, &asin).await {
                    Ok(merge) => {
                        identified.merge = merge;
                        identified.asin_source = AsinSource::Manual;
                        print_record(&identified.merge.record, AsinSource::Manual);
                        print_diff(&identified.merge.diff);
                    }
                    Err(e) => eprintln!("Lookup failed: {e}"),
                }
            }
            _ => println!("Unrecognized input: {line}"),
        }
    }
}

/// Fetch + merge for an ASIN the user typed in.
async fn manual_identify<C: CatalogApi>(
    pipeline: &Pipeline<'_, C>,
    path: &Path,
    asin: &str,
) -> crate::error::Result<Identified> {
    let local = tags::read(path)?;
    let merge = pipeline.remerge(&local, asin).await?;
    Ok(Identified {
        local,
        asin_source: AsinSource::Manual,
        merge,
        candidates: Vec::new(),
    })
}

fn park_failed(path: &Path, output_dir: &Path, move_files: bool, dry_run: bool) -> FileOutcome {
    if dry_run {
        println!(
            "[DRY RUN] Would park failed file in {}",
            output_dir.join(organizer::FAILED_DIR).display()
        );
        return FileOutcome::Failed;
    }
    match organizer::move_to_failed(path, output_dir, move_files) {
        Ok(dest) => println!("Parked failed file at {}", dest.display()),
        Err(e) => eprintln!("Could not park {}: {e}", path.display()),
    }
    FileOutcome::Failed
}

fn print_record(record: &BookRecord, source: AsinSource) {
    println!();
    println!("  Title:     {}", record.title);
    if let Some(subtitle) = &record.subtitle {
        println!("  Subtitle:  {subtitle}");
    }
    if !record.authors.is_empty() {
        println!("  Authors:   {}", record.authors.join(" & "));
    }
    if !record.narrators.is_empty() {
        println!("  Narrators: {}", record.narrators.join(" & "));
    }
    if let Some(series) = &record.series {
        match &record.series_part {
            Some(part) => println!("  Series:    {series} #{part}"),
            None => println!("  Series:    {series}"),
        }
    }
    if let Some(year) = record.year {
        println!("  Year:      {year}");
    }
    if let Some(rating) = record.rating {
        println!("  Rating:    {rating:.2}");
    }
    if let Some(asin) = &record.asin {
        println!("  ASIN:      {asin} (via {source})");
    }
    if let Some(url) = &record.product_url {
        println!("  Page:      {url}");
    }
}

fn print_diff(diff: &[FieldDiff]) {
    if diff.is_empty() {
        return;
    }
    println!("\n  Conflicting fields:");
    for change in diff {
        println!(
            "    {}: local '{}' | catalog '{}' -> using '{}'",
            change.field, change.local_value, change.remote_value, change.resolved_value
        );
    }
}

fn print_candidates(candidates: &[BookRecord]) {
    for (i, candidate) in candidates.iter().enumerate() {
        println!(
            "  [{}] {} - {} ({}) [{}]",
            i + 1,
            candidate.title,
            candidate.authors.join(" & "),
            candidate
                .year
                .map(|y| y.to_string())
                .unwrap_or_else(|| "?".to_string()),
            candidate.asin.as_deref().unwrap_or("no ASIN"),
        );
    }
}

fn prompt(message: &str) -> String {
    print!("{message}");
    let _ = io::stdout().flush();
    let mut line = String::new();
    if io::stdin().read_line(&mut line).is_err() {
        return String::new();
    }
    line.trim().to_string()
}
