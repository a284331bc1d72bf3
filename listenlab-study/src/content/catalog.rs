//! Content catalog: the two stimulus pools
//!
//! Loads sentence and word stimuli from metadata CSVs plus a per-folder
//! content index. Pools are built once per process and shared read-only; the
//! assignment builder always works on its own copies.

use listenlab_common::config::StudyConfig;
use listenlab_common::{Error, Result};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use tracing::info;

use super::{BlobRef, ContentStore};

/// Stimulus type of one item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Sentence,
    Word,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Sentence => "sentence",
            ItemKind::Word => "word",
        }
    }
}

/// One audio stimulus. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Item {
    /// Stable identifier: the normalized relative content path
    pub id: String,
    /// Category label from the metadata `_group` column
    pub group: String,
    pub kind: ItemKind,
    /// Opaque blob reference within the content store
    pub blob_ref: BlobRef,
}

/// All candidate items of one kind, grouped by category label.
///
/// Read-only after construction; group lists keep metadata order.
#[derive(Debug, Clone, Default)]
pub struct Pool {
    groups: BTreeMap<String, Vec<Item>>,
}

impl Pool {
    /// Build a pool directly from items (catalog loading and test fixtures)
    pub fn from_items(items: impl IntoIterator<Item = Item>) -> Self {
        let mut pool = Self::default();
        for item in items {
            pool.push(item);
        }
        pool
    }

    fn push(&mut self, item: Item) {
        self.groups.entry(item.group.clone()).or_default().push(item);
    }

    /// Items in one group, empty slice when the group is absent
    pub fn group(&self, label: &str) -> &[Item] {
        self.groups.get(label).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn group_labels(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    pub fn total(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }
}

/// Both stimulus pools, loaded once at startup
#[derive(Debug, Clone)]
pub struct ContentCatalog {
    pub sentences: Pool,
    pub words: Pool,
}

impl ContentCatalog {
    /// Load both pools from the content store per the study configuration.
    ///
    /// Any inconsistency between metadata and the folder listing is a fatal
    /// configuration error: a silently shrunken pool would later fail quota
    /// checks for every participant.
    pub async fn load(store: &dyn ContentStore, config: &StudyConfig) -> Result<Self> {
        let sentences = load_pool(
            store,
            ItemKind::Sentence,
            &config.sentence_folder,
            &config.sentence_metadata,
        )
        .await?;
        let words = load_pool(
            store,
            ItemKind::Word,
            &config.word_folder,
            &config.word_metadata,
        )
        .await?;

        info!(
            "Loaded content catalog: {} sentence items, {} word items",
            sentences.total(),
            words.total()
        );

        Ok(Self { sentences, words })
    }

    /// Look up one item by id across both pools
    pub fn find(&self, item_id: &str) -> Option<&Item> {
        self.sentences
            .groups
            .values()
            .chain(self.words.groups.values())
            .flatten()
            .find(|item| item.id == item_id)
    }
}

async fn load_pool(
    store: &dyn ContentStore,
    kind: ItemKind,
    folder_key: &str,
    metadata_ref: &str,
) -> Result<Pool> {
    let csv_bytes = store.download_metadata_csv(metadata_ref).await?;
    let rows = parse_metadata_csv(&csv_bytes)
        .map_err(|e| Error::Config(format!("metadata {}: {}", metadata_ref, e)))?;

    let listing: HashMap<String, BlobRef> =
        store.list_audio_files(folder_key).await?.into_iter().collect();

    let mut pool = Pool::default();
    for row in rows {
        let (row_folder, filename, id) = split_content_path(&row.current_path)
            .ok_or_else(|| {
                Error::Config(format!(
                    "metadata {}: malformed current_path {:?}",
                    metadata_ref, row.current_path
                ))
            })?;

        if row_folder != folder_key {
            return Err(Error::Config(format!(
                "metadata {}: path {:?} is outside folder {:?}",
                metadata_ref, row.current_path, folder_key
            )));
        }

        let blob_ref = listing.get(&filename).cloned().ok_or_else(|| {
            Error::Config(format!(
                "metadata {}: no blob in folder {:?} for {:?}",
                metadata_ref, folder_key, filename
            ))
        })?;

        pool.push(Item {
            id,
            group: row.group,
            kind,
            blob_ref,
        });
    }

    Ok(pool)
}

/// One parsed metadata row
#[derive(Debug, PartialEq)]
struct MetadataRow {
    current_path: String,
    group: String,
}

/// Parse a metadata CSV down to (current_path, _group) pairs.
///
/// Header matching is case-, whitespace-, and BOM-insensitive since the CSVs
/// come from spreadsheet exports with inconsistent headers.
fn parse_metadata_csv(bytes: &[u8]) -> std::result::Result<Vec<MetadataRow>, String> {
    let text = String::from_utf8_lossy(bytes);
    let mut lines = text.lines();

    let header_line = lines.next().ok_or("empty metadata file")?;
    let headers: Vec<String> = split_csv_line(header_line)
        .into_iter()
        .map(|h| normalize_header(&h))
        .collect();

    let path_col = headers
        .iter()
        .position(|h| h == "current_path")
        .ok_or("missing current_path column")?;
    let group_col = headers
        .iter()
        .position(|h| h == "_group")
        .ok_or("missing _group column")?;

    let mut rows = Vec::new();
    for (line_no, line) in lines.enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let cells = split_csv_line(line);
        let current_path = cells
            .get(path_col)
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .ok_or_else(|| format!("line {}: missing current_path", line_no + 2))?;
        let group = cells
            .get(group_col)
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .ok_or_else(|| format!("line {}: missing _group", line_no + 2))?;
        rows.push(MetadataRow {
            current_path,
            group,
        });
    }

    Ok(rows)
}

fn normalize_header(raw: &str) -> String {
    raw.trim_start_matches('\u{feff}').trim().to_lowercase()
}

/// Minimal CSV field splitter with double-quote handling.
///
/// Handles quoted cells containing commas and doubled quotes; the metadata
/// exports never use embedded newlines.
fn split_csv_line(line: &str) -> Vec<String> {
    let mut cells = Vec::new();
    let mut cell = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    cell.push('"');
                } else {
                    in_quotes = false;
                }
            }
            '"' => in_quotes = true,
            ',' if !in_quotes => {
                cells.push(std::mem::take(&mut cell));
            }
            _ => cell.push(c),
        }
    }
    cells.push(cell);
    cells
}

/// Split a relative content path into (folder key, filename, normalized id).
///
/// Separators may be '/' or '\'; the first segment is the folder key and the
/// last is the filename. The id is the full path normalized to '/'.
fn split_content_path(raw: &str) -> Option<(String, String, String)> {
    let segments: Vec<&str> = raw
        .split(['/', '\\'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    if segments.len() < 2 {
        return None;
    }
    let folder = segments[0].to_string();
    let filename = segments[segments.len() - 1].to_string();
    let id = segments.join("/");
    Some((folder, filename, id))
}
