//! Shared fixtures for integration tests
#![allow(dead_code)]

use listenlab_study::content::{ContentCatalog, Item, ItemKind, Pool};

pub const SENTENCE_GROUPS: [&str; 4] = ["G0", "G1", "G2", "G3"];
pub const WORD_GROUPS: [&str; 2] = ["WER0", "WER>0"];

/// Minimum counts the quota tables require
pub const SENTENCE_MINIMUMS: [usize; 4] = [15, 10, 10, 15];
pub const WORD_MINIMUMS: [usize; 2] = [30, 20];

fn make_item(kind: ItemKind, folder: &str, group: &str, n: usize) -> Item {
    let slug = group.replace('>', "pos");
    Item {
        id: format!("{}/{}/{}_{:03}.wav", folder, slug, slug, n),
        group: group.to_string(),
        kind,
        blob_ref: format!("{}/{}/{}_{:03}.wav", folder, slug, slug, n),
    }
}

/// Sentence pool with the given per-group counts (G0..G3 order)
pub fn sentence_pool(counts: [usize; 4]) -> Pool {
    Pool::from_items(SENTENCE_GROUPS.into_iter().zip(counts).flat_map(
        |(group, count)| {
            (0..count).map(move |n| make_item(ItemKind::Sentence, "sentences", group, n))
        },
    ))
}

/// Word pool with the given per-group counts (WER0, WER>0 order)
pub fn word_pool(counts: [usize; 2]) -> Pool {
    Pool::from_items(WORD_GROUPS.into_iter().zip(counts).flat_map(
        |(group, count)| (0..count).map(move |n| make_item(ItemKind::Word, "words", group, n)),
    ))
}

/// Catalog holding exactly the minimum counts the quotas require
pub fn minimal_catalog() -> ContentCatalog {
    ContentCatalog {
        sentences: sentence_pool(SENTENCE_MINIMUMS),
        words: word_pool(WORD_MINIMUMS),
    }
}

/// Catalog with comfortable headroom in every group
pub fn roomy_catalog() -> ContentCatalog {
    ContentCatalog {
        sentences: sentence_pool([30, 20, 20, 30]),
        words: word_pool([60, 40]),
    }
}
