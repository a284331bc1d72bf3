//! Stratified block assignment
//!
//! Turns the two stimulus pools into a deterministic per-participant ordered
//! playlist. The sequence is a pure function of the participant id and the
//! pool contents: it is never persisted, only rederived. The resume resolver
//! depends on that.

use listenlab_common::{Error, Result};
use rand::seq::SliceRandom;
use rand::RngCore;
use sha2::{Digest, Sha256};
use std::collections::HashMap;

use crate::content::{Item, ItemKind, Pool};

/// Blocks per assignment
pub const BLOCK_COUNT: usize = 10;

/// Sentence items drawn per block
pub const SENTENCES_PER_BLOCK: usize = 5;

/// Word items drawn per block
pub const WORDS_PER_BLOCK: usize = 5;

/// Total items per assignment
pub const ASSIGNMENT_LEN: usize = BLOCK_COUNT * (SENTENCES_PER_BLOCK + WORDS_PER_BLOCK);

/// Sentence group quota for even-indexed blocks
const EVEN_SENTENCE_QUOTA: [(&str, usize); 4] = [("G0", 2), ("G1", 1), ("G2", 1), ("G3", 1)];

/// Sentence group quota for odd-indexed blocks
const ODD_SENTENCE_QUOTA: [(&str, usize); 4] = [("G0", 1), ("G1", 1), ("G2", 1), ("G3", 2)];

/// Word group quota, identical for every block
const WORD_QUOTA: [(&str, usize); 2] = [("WER0", 3), ("WER>0", 2)];

/// Deterministic generator for one participant's assignment.
///
/// splitmix64 stream: stable across platforms and `rand` releases, unlike
/// `StdRng`, so the same participant id reproduces the same assignment
/// forever. Seeded solely from the id.
struct ParticipantRng {
    state: u64,
}

impl ParticipantRng {
    fn for_participant(participant_id: &str) -> Self {
        let digest = Sha256::digest(participant_id.as_bytes());
        let mut seed_bytes = [0u8; 8];
        seed_bytes.copy_from_slice(&digest[..8]);
        Self {
            state: u64::from_le_bytes(seed_bytes),
        }
    }

    fn next_u64_internal(&mut self) -> u64 {
        let mut z = self.state.wrapping_add(0x9E3779B97F4A7C15);
        self.state = z;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
        z ^ (z >> 31)
    }
}

impl RngCore for ParticipantRng {
    fn next_u32(&mut self) -> u32 {
        self.next_u64_internal() as u32
    }

    fn next_u64(&mut self) -> u64 {
        self.next_u64_internal()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        let mut offset = 0;
        while offset < dest.len() {
            let bytes = self.next_u64_internal().to_le_bytes();
            let copy_len = (dest.len() - offset).min(bytes.len());
            dest[offset..offset + copy_len].copy_from_slice(&bytes[..copy_len]);
            offset += copy_len;
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> std::result::Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

/// Minimum pool size per sentence group, summed over all blocks
pub fn sentence_minimums() -> Vec<(&'static str, usize)> {
    minimums(&EVEN_SENTENCE_QUOTA, &ODD_SENTENCE_QUOTA)
}

/// Minimum pool size per word group, summed over all blocks
pub fn word_minimums() -> Vec<(&'static str, usize)> {
    minimums(&WORD_QUOTA, &WORD_QUOTA)
}

fn minimums(
    even: &[(&'static str, usize)],
    odd: &[(&'static str, usize)],
) -> Vec<(&'static str, usize)> {
    even.iter()
        .zip(odd.iter())
        .map(|(&(label, even_n), &(_, odd_n))| {
            (label, (BLOCK_COUNT / 2) * even_n + (BLOCK_COUNT / 2) * odd_n)
        })
        .collect()
}

/// Build one participant's ordered assignment.
///
/// Deterministic and side-effect-free: identical participant id and pool
/// contents always produce the identical sequence. Pools that cannot satisfy
/// the quota tables fail with `Error::Config` before anything is drawn.
pub fn build(participant_id: &str, sentences: &Pool, words: &Pool) -> Result<Vec<Item>> {
    verify_minimums(ItemKind::Sentence, sentences, &sentence_minimums())?;
    verify_minimums(ItemKind::Word, words, &word_minimums())?;

    let mut rng = ParticipantRng::for_participant(participant_id);

    // Private, shuffled copies of each group list; shuffle order is fixed by
    // the quota label order so the stream stays reproducible.
    let mut sentence_lists = shuffled_groups(sentences, &EVEN_SENTENCE_QUOTA, &mut rng);
    let mut word_lists = shuffled_groups(words, &WORD_QUOTA, &mut rng);

    let mut assignment = Vec::with_capacity(ASSIGNMENT_LEN);
    for block in 0..BLOCK_COUNT {
        let sentence_quota: &[(&str, usize)] = if block % 2 == 0 {
            &EVEN_SENTENCE_QUOTA
        } else {
            &ODD_SENTENCE_QUOTA
        };

        // Expand quotas into draw slots, one per item, then shuffle the draw
        // order itself before taking items.
        let mut slots: Vec<(ItemKind, &str)> = Vec::with_capacity(10);
        for &(label, count) in sentence_quota {
            slots.extend(std::iter::repeat((ItemKind::Sentence, label)).take(count));
        }
        for &(label, count) in &WORD_QUOTA {
            slots.extend(std::iter::repeat((ItemKind::Word, label)).take(count));
        }
        slots.shuffle(&mut rng);

        let mut block_items = Vec::with_capacity(slots.len());
        for (kind, label) in slots {
            let lists = match kind {
                ItemKind::Sentence => &mut sentence_lists,
                ItemKind::Word => &mut word_lists,
            };
            let item = lists
                .get_mut(label)
                .and_then(Vec::pop)
                .ok_or_else(|| {
                    Error::Internal(format!("group {} exhausted in block {}", label, block))
                })?;
            block_items.push(item);
        }

        // Interleave sentence and word items within the block
        block_items.shuffle(&mut rng);
        assignment.extend(block_items);
    }

    Ok(assignment)
}

fn verify_minimums(kind: ItemKind, pool: &Pool, minimums: &[(&str, usize)]) -> Result<()> {
    for &(label, required) in minimums {
        let available = pool.group(label).len();
        if available < required {
            return Err(Error::Config(format!(
                "{} group {:?} has {} items, quota tables require at least {}",
                kind.as_str(),
                label,
                available,
                required
            )));
        }
    }
    Ok(())
}

fn shuffled_groups<'a>(
    pool: &Pool,
    quota: &[(&'a str, usize)],
    rng: &mut ParticipantRng,
) -> HashMap<&'a str, Vec<Item>> {
    let mut lists = HashMap::with_capacity(quota.len());
    for &(label, _) in quota {
        let mut items = pool.group(label).to_vec();
        items.shuffle(rng);
        lists.insert(label, items);
    }
    lists
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_depends_only_on_participant_id() {
        let mut a = ParticipantRng::for_participant("p1");
        let mut b = ParticipantRng::for_participant("p1");
        let mut c = ParticipantRng::for_participant("p2");
        let first: Vec<u64> = (0..8).map(|_| a.next_u64()).collect();
        let second: Vec<u64> = (0..8).map(|_| b.next_u64()).collect();
        let other: Vec<u64> = (0..8).map(|_| c.next_u64()).collect();
        assert_eq!(first, second);
        assert_ne!(first, other);
    }

    #[test]
    fn minimums_match_quota_totals() {
        assert_eq!(
            sentence_minimums(),
            vec![("G0", 15), ("G1", 10), ("G2", 10), ("G3", 15)]
        );
        assert_eq!(word_minimums(), vec![("WER0", 30), ("WER>0", 20)]);
    }
}
