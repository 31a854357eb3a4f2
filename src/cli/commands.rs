use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use c_docgen::config::Config;
use c_docgen::error::{DocError, Result};
use c_docgen::extract::{Extraction, Extractor};
use c_docgen::model::Module;
use c_docgen::render::{render_index, render_module, IndexEntry};

fn report_diagnostics(file: &Path, extraction: &Extraction) {
    for diagnostic in &extraction.diagnostics {
        warn!("{}", diagnostic);
    }
    if extraction.has_problems() {
        warn!(
            "{} problem(s) reported while parsing {}; the output may be incomplete",
            extraction.diagnostics.len(),
            file.display()
        );
    }
}

fn extract_file(file: &Path, args: &[String], config: &Config) -> Result<Extraction> {
    let args = config.compiler_args(args);
    debug!("Compiler arguments: {:?}", args);

    let extraction = Extractor::new().extract(file, &args)?;
    report_diagnostics(file, &extraction);
    Ok(extraction)
}

fn page_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "module".to_string())
}

/// Page name for a model found under `input_dir`: its relative path without
/// the extension, directories joined with `-`.
fn page_name(input_dir: &Path, path: &Path) -> String {
    let relative = path
        .strip_prefix(input_dir)
        .unwrap_or(path)
        .with_extension("");
    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    if parts.is_empty() {
        "module".to_string()
    } else {
        parts.join("-")
    }
}

fn write_page(output_dir: &Path, stem: &str, module: &Module, project: &str) -> Result<PathBuf> {
    let path = output_dir.join(format!("{}.html", stem));
    fs::write(&path, render_module(module, project))?;
    Ok(path)
}

fn write_index(output_dir: &Path, project: &str, entries: &[IndexEntry]) -> Result<()> {
    fs::write(output_dir.join("index.html"), render_index(project, entries))?;
    Ok(())
}

pub fn parse(file: &Path, output: Option<&Path>, args: &[String], config: &Config) -> Result<()> {
    let extraction = extract_file(file, args, config)?;

    match output {
        Some(path) => {
            extraction.module.save(path)?;
            println!("Wrote {}", path.display());
        }
        None => println!("{}", extraction.module.to_json()?),
    }
    Ok(())
}

pub fn html(
    input_dir: &Path,
    output_dir: &Path,
    project_name: Option<&str>,
    config: &Config,
) -> Result<()> {
    if !input_dir.is_dir() {
        return Err(DocError::FileNotFound(input_dir.display().to_string()));
    }
    let project = config.project_name(project_name);
    fs::create_dir_all(output_dir)?;

    let mut inputs: Vec<PathBuf> = WalkDir::new(input_dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
        .collect();
    inputs.sort();
    info!("Found {} models in {}", inputs.len(), input_dir.display());

    let mut seen: HashMap<String, &Path> = HashMap::new();
    let mut pages = Vec::new();
    for input in &inputs {
        let stem = page_name(input_dir, input);
        if let Some(first) = seen.insert(stem.clone(), input) {
            return Err(DocError::DuplicatePage {
                page: format!("{}.html", stem),
                first: first.display().to_string(),
                second: input.display().to_string(),
            });
        }
        pages.push((input, stem));
    }

    let mut entries = Vec::new();
    for (input, stem) in pages {
        let module = Module::load(input)?;
        let page = write_page(output_dir, &stem, &module, &project)?;
        debug!("Rendered {} -> {}", input.display(), page.display());

        entries.push(IndexEntry {
            href: format!("{}.html", stem),
            name: stem,
            title: module.name,
        });
    }
    write_index(output_dir, &project, &entries)?;

    println!(
        "Rendered {} pages into {}",
        entries.len(),
        output_dir.display()
    );
    Ok(())
}

pub fn doc(
    file: &Path,
    output_dir: &Path,
    project_name: Option<&str>,
    args: &[String],
    config: &Config,
) -> Result<()> {
    let extraction = extract_file(file, args, config)?;
    let project = config.project_name(project_name);
    fs::create_dir_all(output_dir)?;

    let stem = page_stem(file);
    let page = write_page(output_dir, &stem, &extraction.module, &project)?;
    write_index(
        output_dir,
        &project,
        &[IndexEntry {
            href: format!("{}.html", stem),
            name: stem,
            title: extraction.module.name.clone(),
        }],
    )?;

    println!("Wrote {}", page.display());
    Ok(())
}
