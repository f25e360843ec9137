use crate::crawler::Page;
use crate::output::{OutputError, OutputFormat, OutputResult};
use arrow::array::{ArrayRef, StringArray, UInt16Array, UInt32Array, UInt64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

/// Writes pages to `path` in the given format, replacing any existing file
pub fn write_pages(pages: &[Page], path: &Path, format: OutputFormat) -> OutputResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    match format {
        OutputFormat::Json => write_json(pages, path)?,
        OutputFormat::Jsonl => write_jsonl(pages, path)?,
        OutputFormat::Parquet => write_parquet(pages, path)?,
        OutputFormat::Text => write_text(pages, path)?,
    }

    tracing::info!(
        "Wrote {} pages to {} ({})",
        pages.len(),
        path.display(),
        format
    );
    Ok(())
}

fn create(path: &Path) -> OutputResult<BufWriter<File>> {
    Ok(BufWriter::new(File::create(path)?))
}

fn write_json(pages: &[Page], path: &Path) -> OutputResult<()> {
    let mut out = create(path)?;
    serde_json::to_writer_pretty(&mut out, pages)?;
    out.write_all(b"\n")?;
    out.flush()?;
    Ok(())
}

fn write_jsonl(pages: &[Page], path: &Path) -> OutputResult<()> {
    let mut out = create(path)?;
    for page in pages {
        serde_json::to_writer(&mut out, page)?;
        out.write_all(b"\n")?;
    }
    out.flush()?;
    Ok(())
}

/// Flat columnar layout: links are reduced to a count and metadata is
/// stored as a JSON object string.
fn parquet_schema() -> Schema {
    Schema::new(vec![
        Field::new("url", DataType::Utf8, false),
        Field::new("title", DataType::Utf8, true),
        Field::new("text", DataType::Utf8, true),
        Field::new("crawled_at", DataType::Utf8, false),
        Field::new("status_code", DataType::UInt16, false),
        Field::new("depth", DataType::UInt32, false),
        Field::new("num_links", DataType::UInt64, false),
        Field::new("metadata", DataType::Utf8, false),
    ])
}

fn write_parquet(pages: &[Page], path: &Path) -> OutputResult<()> {
    let schema = Arc::new(parquet_schema());

    let metadata = pages
        .iter()
        .map(|p| serde_json::to_string(&p.metadata))
        .collect::<Result<Vec<_>, _>>()?;

    let columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from_iter_values(pages.iter().map(|p| p.url.as_str()))),
        Arc::new(pages.iter().map(|p| p.title.as_deref()).collect::<StringArray>()),
        Arc::new(pages.iter().map(|p| p.text.as_deref()).collect::<StringArray>()),
        Arc::new(StringArray::from_iter_values(
            pages.iter().map(|p| p.crawled_at.to_rfc3339()),
        )),
        Arc::new(UInt16Array::from_iter_values(pages.iter().map(|p| p.status_code))),
        Arc::new(UInt32Array::from_iter_values(pages.iter().map(|p| p.depth))),
        Arc::new(UInt64Array::from_iter_values(
            pages.iter().map(|p| p.links.len() as u64),
        )),
        Arc::new(StringArray::from(metadata)),
    ];
    let batch = RecordBatch::try_new(schema.clone(), columns)?;

    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();
    let mut writer = ArrowWriter::try_new(File::create(path)?, schema, Some(props))?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(())
}

fn write_text(pages: &[Page], path: &Path) -> OutputResult<()> {
    let mut out = create(path)?;
    let rule = "-".repeat(80);
    let double_rule = "=".repeat(80);

    for page in pages {
        writeln!(out, "URL: {}", page.url)?;
        writeln!(out, "Title: {}", page.title.as_deref().unwrap_or("N/A"))?;
        writeln!(out, "{}", rule)?;
        if let Some(text) = &page.text {
            writeln!(out, "{}\n", text)?;
        }
        writeln!(out, "{}\n", double_rule)?;
    }
    out.flush()?;
    Ok(())
}

/// Reads a `.json` or `.jsonl` page file
pub fn read_pages(path: &Path) -> OutputResult<Vec<Page>> {
    match OutputFormat::from_path(path)? {
        OutputFormat::Json => read_json(path),
        _ => read_jsonl(path),
    }
}

fn read_json(path: &Path) -> OutputResult<Vec<Page>> {
    let file = File::open(path)?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}

fn read_jsonl(path: &Path) -> OutputResult<Vec<Page>> {
    let file = File::open(path)?;
    let mut pages = Vec::new();

    for (index, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let page = serde_json::from_str(&line).map_err(|e| OutputError::MalformedLine {
            line: index + 1,
            message: e.to_string(),
        })?;
        pages.push(page);
    }

    Ok(pages)
}
