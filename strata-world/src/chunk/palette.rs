use std::hash::Hash;

use indexmap::IndexSet;
use strata_util::packing::{self, Packing, PackingError};
use thiserror::Error;

use crate::{biome::Biome, block::BlockState};

/// Block indices never use fewer than 4 bits on disk.
pub const BLOCK_DISK_MIN_BITS: u8 = 4;
/// Biome indices use as few bits as the palette allows.
pub const BIOME_DISK_MIN_BITS: u8 = 0;

#[derive(Error, Debug)]
pub enum PaletteError {
    #[error("Palette index {index} does not fit a palette of {len} entries")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("Malformed packed indices: {0}")]
    Packing(#[from] PackingError),
}

pub type BlockPalette = PalettedContainer<BlockState, 16>;
pub type BiomePalette = PalettedContainer<Biome, 4>;

/// A cube of values stored as indices into a deduplicated palette. Indices are ordered
/// y, z, x with y being the most significant.
///
/// Every index is smaller than the palette length. Values that are no longer referenced
/// stay in the palette until it grows to twice the volume or the container is written.
/// Equality compares the values at every position, not the palette layout.
#[derive(Debug, Clone)]
pub struct PalettedContainer<V: Hash + Eq + Clone + Default, const DIM: usize> {
    palette: IndexSet<V>,
    indices: Box<[u16]>,
}

impl<V: Hash + Eq + Clone + Default, const DIM: usize> PalettedContainer<V, DIM> {
    pub const SIZE: usize = DIM;
    pub const VOLUME: usize = DIM * DIM * DIM;

    /// A container filled with the default value.
    pub fn new() -> Self {
        Self::filled(V::default())
    }

    pub fn filled(value: V) -> Self {
        let mut palette = IndexSet::with_capacity(1);
        palette.insert(value);
        Self {
            palette,
            indices: vec![0; Self::VOLUME].into_boxed_slice(),
        }
    }

    #[inline]
    fn index(x: usize, y: usize, z: usize) -> usize {
        debug_assert!(x < DIM);
        debug_assert!(y < DIM);
        debug_assert!(z < DIM);
        (y * DIM + z) * DIM + x
    }

    pub fn get(&self, x: usize, y: usize, z: usize) -> &V {
        self.get_at(Self::index(x, y, z))
    }

    pub fn set(&mut self, x: usize, y: usize, z: usize, value: V) {
        self.set_at(Self::index(x, y, z), value);
    }

    /// Access by flat y, z, x index.
    pub fn get_at(&self, index: usize) -> &V {
        &self.palette[self.indices[index] as usize]
    }

    pub fn set_at(&mut self, index: usize, value: V) {
        if self.palette.len() >= 2 * Self::VOLUME && !self.palette.contains(&value) {
            // At most VOLUME entries are referenced, so this frees at least as many
            self.compact();
        }
        let palette_index = self.add(value);
        if let Err(err) = self.set_index_at(index, palette_index) {
            log::warn!("Leaving position {index} unchanged: {err}");
        }
    }

    /// Sets a flat position to an existing palette entry.
    pub fn set_index_at(&mut self, index: usize, palette_index: usize) -> Result<(), PaletteError> {
        let len = self.palette.len();
        let stored = u16::try_from(palette_index)
            .ok()
            .filter(|_| palette_index < len)
            .ok_or(PaletteError::IndexOutOfRange {
                index: palette_index,
                len,
            })?;
        self.indices[index] = stored;
        Ok(())
    }

    /// Drops palette entries no position refers to, keeping the order of the others.
    pub fn compact(&mut self) {
        if self.used_entries().iter().all(|used| *used) {
            return;
        }
        let cells: Vec<usize> = self.indices.iter().map(|index| *index as usize).collect();
        *self = Self::retain_used(std::mem::take(&mut self.palette), &cells);
    }

    /// Builds a container from one palette index per position. Only referenced entries are
    /// kept, so the result has at most one entry per position.
    fn retain_used(palette: IndexSet<V>, cells: &[usize]) -> Self {
        let mut used = vec![false; palette.len()];
        for cell in cells {
            used[*cell] = true;
        }
        let mut remap = vec![0u16; palette.len()];
        let mut next = 0u16;
        let mut kept = IndexSet::with_capacity(palette.len().min(Self::VOLUME));
        for ((value, used), new_index) in palette.into_iter().zip(used).zip(remap.iter_mut()) {
            if used {
                *new_index = next;
                next += 1;
                kept.insert(value);
            }
        }
        Self {
            palette: kept,
            indices: cells.iter().map(|cell| remap[*cell]).collect(),
        }
    }

    /// Adds a value to the palette, returning the index of an equal entry if there already is one.
    pub fn add(&mut self, value: V) -> usize {
        self.palette.insert_full(value).0
    }

    pub fn palette(&self) -> &IndexSet<V> {
        &self.palette
    }

    pub fn indices(&self) -> &[u16] {
        &self.indices
    }

    /// True if every position holds the same value.
    pub fn is_homogeneous(&self) -> bool {
        self.indices
            .first()
            .map_or(true, |first| self.indices.iter().all(|index| index == first))
    }

    pub fn all(&self, predicate: impl Fn(&V) -> bool) -> bool {
        self.used_entries()
            .iter()
            .zip(&self.palette)
            .all(|(used, value)| !used || predicate(value))
    }

    fn used_entries(&self) -> Vec<bool> {
        let mut used = vec![false; self.palette.len()];
        for &index in self.indices.iter() {
            used[index as usize] = true;
        }
        used
    }

    /// Returns the palette with unused entries dropped and the packed indices. A single entry
    /// palette needs no indices at all.
    pub fn to_disk(
        &self,
        minimum_bits_per_entry: u8,
        packing: Packing,
    ) -> Result<(Vec<V>, Option<Box<[i64]>>), PackingError> {
        let used = self.used_entries();
        let mut remap = vec![0u64; self.palette.len()];
        let mut palette = Vec::with_capacity(self.palette.len());
        for ((value, used), new_index) in self.palette.iter().zip(used).zip(remap.iter_mut()) {
            if used {
                *new_index = palette.len() as u64;
                palette.push(value.clone());
            }
        }

        if palette.len() == 1 {
            return Ok((palette, None));
        }

        let bits = packing::encompassing_bits(palette.len()).max(minimum_bits_per_entry);
        let values: Vec<u64> = self
            .indices
            .iter()
            .map(|index| remap[*index as usize])
            .collect();
        let packed = packing::pack(&values, bits, packing)?
            .iter()
            .map(|word| *word as i64)
            .collect();

        Ok((palette, Some(packed)))
    }

    /// Rebuilds a container from a disk palette and its packed indices. Damaged input is
    /// repaired with default values and a warning.
    pub fn from_disk(
        palette: Vec<V>,
        packed_data: Option<&[i64]>,
        minimum_bits_per_entry: u8,
        packing: Packing,
    ) -> Result<Self, PaletteError> {
        if palette.is_empty() {
            log::warn!("No palette data! Defaulting...");
            return Ok(Self::new());
        }

        let disk_len = palette.len();
        let mut entries = IndexSet::with_capacity(disk_len);
        // Duplicate disk entries collapse into one
        let remap: Vec<usize> = palette
            .into_iter()
            .map(|value| entries.insert_full(value).0)
            .collect();

        let Some(packed_data) = packed_data.filter(|_| disk_len > 1) else {
            if disk_len > 1 {
                log::warn!("Palette has {disk_len} entries but no packed indices. Defaulting...");
            }
            return Ok(Self::retain_used(entries, &vec![0; Self::VOLUME]));
        };

        let bits = packing::encompassing_bits(disk_len).max(minimum_bits_per_entry);
        let expected = packing::packed_len(Self::VOLUME, bits, packing);
        let mut words: Vec<u64> = packed_data.iter().map(|word| *word as u64).collect();
        if words.len() < expected {
            log::warn!(
                "Ran out of packed indices, but did not fill the section ({} vs {} for {}). Defaulting...",
                words.len(),
                expected,
                disk_len,
            );
            words.resize(expected, 0);
        } else if words.len() > expected {
            log::warn!("Filled the section but there is still more data! Ignoring...");
        }

        let values = packing::unpack(&words, bits, Self::VOLUME, packing)?;
        let mut out_of_bounds = 0usize;
        let cells: Vec<usize> = values
            .iter()
            .map(|value| {
                remap.get(*value as usize).copied().unwrap_or_else(|| {
                    out_of_bounds += 1;
                    0
                })
            })
            .collect();
        if out_of_bounds > 0 {
            log::warn!("{out_of_bounds} lookup indices out of bounds! Defaulting...");
        }

        Ok(Self::retain_used(entries, &cells))
    }
}

impl<V: Hash + Eq + Clone + Default, const DIM: usize> PartialEq for PalettedContainer<V, DIM> {
    fn eq(&self, other: &Self) -> bool {
        self.indices
            .iter()
            .zip(other.indices.iter())
            .all(|(a, b)| self.palette[*a as usize] == other.palette[*b as usize])
    }
}

impl<V: Hash + Eq + Clone + Default, const DIM: usize> Default for PalettedContainer<V, DIM> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stone() -> BlockState {
        BlockState::new("minecraft:stone")
    }

    #[test]
    fn fresh_container_is_air() {
        let container = BlockPalette::new();
        assert_eq!(container.palette().len(), 1);
        assert!(container.get(15, 15, 15).is_air());
        assert!(container.is_homogeneous());
    }

    #[test]
    fn duplicates_share_an_index() {
        let mut container = BlockPalette::new();
        assert_eq!(container.add(stone()), 1);
        assert_eq!(container.add(stone()), 1);
        assert_eq!(container.add(BlockState::air()), 0);
        container.set(1, 2, 3, stone());
        assert_eq!(container.palette().len(), 2);
        assert_eq!(container.get(1, 2, 3), &stone());
        assert_eq!(container.indices()[(2 * 16 + 3) * 16 + 1], 1);
    }

    #[test]
    fn single_entry_writes_no_indices() {
        let container = BlockPalette::filled(stone());
        let (palette, data) = container
            .to_disk(BLOCK_DISK_MIN_BITS, Packing::Aligned)
            .unwrap();
        assert_eq!(palette, [stone()]);
        assert!(data.is_none());

        let read =
            BlockPalette::from_disk(palette, None, BLOCK_DISK_MIN_BITS, Packing::Aligned).unwrap();
        assert_eq!(read.indices().len(), 4096);
        assert!(read.indices().iter().all(|index| *index == 0));
        assert_eq!(read.get(7, 7, 7), &stone());
    }

    #[test]
    fn unused_entries_are_dropped_on_write() {
        let mut container = BlockPalette::new();
        container.set(0, 0, 0, stone());
        container.set(0, 0, 0, BlockState::new("minecraft:dirt"));
        container.set(5, 0, 0, BlockState::new("minecraft:dirt"));
        let (palette, data) = container
            .to_disk(BLOCK_DISK_MIN_BITS, Packing::Aligned)
            .unwrap();
        assert_eq!(
            palette,
            [BlockState::air(), BlockState::new("minecraft:dirt")]
        );
        // 4 bits minimum, 16 per long
        assert_eq!(data.as_ref().map(|data| data.len()), Some(256));
    }

    #[test]
    fn round_trip_both_layouts() {
        let mut container = BlockPalette::new();
        for i in 0..20 {
            container.set(i % 16, i / 16, 3, BlockState::new(format!("minecraft:block_{i}")));
        }
        for layout in [Packing::Tight, Packing::Aligned] {
            let (palette, data) = container.to_disk(BLOCK_DISK_MIN_BITS, layout).unwrap();
            assert_eq!(palette.len(), 21);
            // 21 entries need 5 bits
            assert_eq!(
                data.as_ref().map(|data| data.len()),
                Some(packing::packed_len(4096, 5, layout))
            );
            let read = BlockPalette::from_disk(
                palette,
                data.as_deref(),
                BLOCK_DISK_MIN_BITS,
                layout,
            )
            .unwrap();
            for i in 0..20 {
                assert_eq!(read.get(i % 16, i / 16, 3), container.get(i % 16, i / 16, 3));
            }
            assert!(read.get(0, 0, 0).is_air());
            assert_eq!(read, container);
        }
    }

    #[test]
    fn damaged_input_is_repaired() {
        let palette = vec![BlockState::air(), stone()];
        // Index 3 is outside the palette, and the array is far too short
        let data = [0x3i64 | (1 << 4)];
        let read =
            BlockPalette::from_disk(palette, Some(&data), BLOCK_DISK_MIN_BITS, Packing::Aligned)
                .unwrap();
        assert!(read.get(0, 0, 0).is_air());
        assert_eq!(read.get(1, 0, 0), &stone());
        assert!(read.get(2, 0, 0).is_air());

        let empty = BlockPalette::from_disk(Vec::new(), None, 4, Packing::Aligned).unwrap();
        assert_eq!(empty, BlockPalette::new());
    }

    #[test]
    fn rewriting_one_cell_keeps_the_palette_bounded() {
        let mut container = BlockPalette::new();
        for i in 0..70_000 {
            container.set(0, 0, 0, BlockState::new(format!("minecraft:b{i}")));
        }
        assert_eq!(container.get(0, 0, 0).name, "minecraft:b69999");
        assert!(container.get(1, 0, 0).is_air());
        assert!(container.palette().len() <= 2 * BlockPalette::VOLUME);

        container.compact();
        assert_eq!(container.palette().len(), 2);
        assert_eq!(container.get(0, 0, 0).name, "minecraft:b69999");
    }

    #[test]
    fn every_cell_distinct() {
        let mut container = BlockPalette::new();
        for round in 0..2 {
            for index in 0..BlockPalette::VOLUME {
                container.set_at(index, BlockState::new(format!("minecraft:r{round}_{index}")));
            }
        }
        assert_eq!(container.get_at(4095).name, "minecraft:r1_4095");
        assert_eq!(container.get_at(0).name, "minecraft:r1_0");
        assert!(container.palette().len() <= 2 * BlockPalette::VOLUME);
    }

    #[test]
    fn foreign_indices_are_rejected() {
        let mut container = BlockPalette::new();
        assert!(matches!(
            container.set_index_at(0, 5),
            Err(PaletteError::IndexOutOfRange { index: 5, len: 1 })
        ));
        assert!(container.get(0, 0, 0).is_air());
        let stone_index = container.add(stone());
        container.set_index_at(0, stone_index).unwrap();
        assert_eq!(container.get(0, 0, 0), &stone());
    }

    #[test]
    fn oversized_disk_palettes_keep_referenced_entries() {
        // More entries than a u16 index can address, only the last ones are used
        let palette: Vec<BlockState> = (0..70_000)
            .map(|i| BlockState::new(format!("minecraft:b{i}")))
            .collect();
        let values: Vec<u64> = (0..4096).map(|i| 65_904 + i % 2).collect();
        let data: Vec<i64> = packing::pack(&values, 17, Packing::Aligned)
            .unwrap()
            .iter()
            .map(|word| *word as i64)
            .collect();
        let read =
            BlockPalette::from_disk(palette, Some(&data), BLOCK_DISK_MIN_BITS, Packing::Aligned)
                .unwrap();
        assert_eq!(read.palette().len(), 2);
        assert_eq!(read.get_at(0).name, "minecraft:b65904");
        assert_eq!(read.get_at(1).name, "minecraft:b65905");
    }

    #[test]
    fn biome_palettes_use_minimal_width() {
        let mut biomes = BiomePalette::new();
        biomes.set(3, 3, 3, Biome::new("minecraft:desert"));
        let (palette, data) = biomes
            .to_disk(BIOME_DISK_MIN_BITS, Packing::Tight)
            .unwrap();
        assert_eq!(palette.len(), 2);
        // 64 one bit values
        assert_eq!(data.as_ref().map(|data| data.len()), Some(1));
        let read =
            BiomePalette::from_disk(palette, data.as_deref(), BIOME_DISK_MIN_BITS, Packing::Tight)
                .unwrap();
        assert_eq!(read.get(3, 3, 3).name, "minecraft:desert");
        assert_eq!(read.get(0, 0, 0), &Biome::default());
    }
}
