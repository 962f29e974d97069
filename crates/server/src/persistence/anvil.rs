//! Chunk storage in Minecraft's Anvil region format (`region/r.X.Z.mca`).
//!
//! Files stay readable by vanilla tools: sections carry a block-state palette
//! named through azalea-block and MC's packed index array.

use std::collections::HashMap;
use std::fs;
use std::io::{Cursor, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::{LazyLock, RwLock};
use std::time::Instant;

use anyhow::{Context, Result};
use azalea_block::{BlockState, BlockTrait};
use serde::{Deserialize, Serialize};

use trident_engine::world::block::BlockId;
use trident_engine::world::chunk::{Chunk, ChunkSection, SECTION_VOLUME};
use trident_engine::world::error::BoxError;
use trident_engine::world::position::ChunkPos;
use trident_engine::world::source::ChunkSource;

/// DataVersion tag written into every saved chunk. MC 1.21.11 = 4189.
const DATA_VERSION: i32 = 4189;

// ── Palette names ───────────────────────────────────────────────────────────

/// `("stone", [])` or `("oak_stairs", [("facing", "north"), ...])`.
type BlockLookupKey = (String, Vec<(String, String)>);

/// `(name, sorted_properties) → state_id`, built on first use.
static BLOCK_LOOKUP: LazyLock<HashMap<BlockLookupKey, u16>> = LazyLock::new(|| {
    let mut map = HashMap::new();
    for id in 0..=BlockState::MAX_STATE {
        let Ok(state) = BlockState::try_from(id as u32) else {
            continue;
        };
        let block: Box<dyn BlockTrait> = Box::<dyn BlockTrait>::from(state);
        let mut props: Vec<(String, String)> = block
            .property_map()
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        props.sort();
        map.insert((block.id().to_string(), props), id);
    }
    map
});

fn palette_entry_to_block_id(entry: &PaletteEntry) -> BlockId {
    let name = entry.name.strip_prefix("minecraft:").unwrap_or(&entry.name);
    let mut props: Vec<(String, String)> = entry
        .properties
        .as_ref()
        .map(|m| m.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
        .unwrap_or_default();
    props.sort();

    match BLOCK_LOOKUP.get(&(name.to_string(), props)) {
        Some(&id) => BlockId(id),
        None => {
            tracing::warn!("Unknown block in region file: {}, reading as air", entry.name);
            BlockId::AIR
        }
    }
}

/// Whether `id` names a block state the region format can store.
pub fn is_storable(id: BlockId) -> bool {
    id.is_air() || BlockState::try_from(id.0 as u32).is_ok()
}

fn block_id_to_palette_entry(id: BlockId) -> Result<PaletteEntry> {
    if id.is_air() {
        return Ok(PaletteEntry {
            name: "minecraft:air".into(),
            properties: None,
        });
    }
    let state = BlockState::try_from(id.0 as u32)
        .map_err(|_| anyhow::anyhow!("block state {} has no name", id.0))?;
    let block: Box<dyn BlockTrait> = Box::<dyn BlockTrait>::from(state);
    let prop_map = block.property_map();
    let properties = (!prop_map.is_empty()).then(|| {
        prop_map
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    });
    Ok(PaletteEntry {
        name: format!("minecraft:{}", block.id()),
        properties,
    })
}

// ── Chunk NBT ───────────────────────────────────────────────────────────────

#[derive(Serialize, Deserialize, Debug)]
struct ChunkNbt {
    #[serde(rename = "DataVersion")]
    data_version: i32,
    #[serde(rename = "xPos")]
    x_pos: i32,
    #[serde(rename = "zPos")]
    z_pos: i32,
    #[serde(rename = "yPos")]
    y_pos: i32,
    sections: Vec<SectionNbt>,
    #[serde(rename = "Status")]
    status: String,
}

#[derive(Serialize, Deserialize, Debug)]
struct SectionNbt {
    #[serde(rename = "Y")]
    y: i8,
    block_states: BlockStatesNbt,
}

#[derive(Serialize, Deserialize, Debug)]
struct BlockStatesNbt {
    palette: Vec<PaletteEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Vec<i64>>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
struct PaletteEntry {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Properties")]
    #[serde(skip_serializing_if = "Option::is_none")]
    properties: Option<HashMap<String, String>>,
}

// ── Bit packing ─────────────────────────────────────────────────────────────

/// Pack palette indices into longs. No entry spans two longs.
/// A single-entry palette needs no data array.
fn pack_indices(indices: &[u16; SECTION_VOLUME], palette_len: usize) -> Option<Vec<i64>> {
    if palette_len <= 1 {
        return None;
    }

    let bits = bits_per_entry(palette_len);
    let entries_per_long = 64 / bits;
    let mask = (1u64 << bits) - 1;

    let mut longs = vec![0i64; SECTION_VOLUME.div_ceil(entries_per_long)];
    for (i, &idx) in indices.iter().enumerate() {
        let bit_offset = (i % entries_per_long) * bits;
        longs[i / entries_per_long] |= ((idx as u64 & mask) << bit_offset) as i64;
    }
    Some(longs)
}

fn unpack_indices(data: &[i64], palette_len: usize) -> [u16; SECTION_VOLUME] {
    let bits = bits_per_entry(palette_len);
    let entries_per_long = 64 / bits;
    let mask = (1u64 << bits) - 1;

    let mut indices = [0u16; SECTION_VOLUME];
    for (i, idx) in indices.iter_mut().enumerate() {
        let bit_offset = (i % entries_per_long) * bits;
        if let Some(&long) = data.get(i / entries_per_long) {
            *idx = ((long as u64 >> bit_offset) & mask) as u16;
        }
    }
    indices
}

/// Minimum 4, as in vanilla.
fn bits_per_entry(palette_len: usize) -> usize {
    let raw = if palette_len <= 1 {
        0
    } else {
        (usize::BITS - (palette_len - 1).leading_zeros()) as usize
    };
    raw.max(4)
}

// ── Chunk <-> NBT ───────────────────────────────────────────────────────────

/// Lowest block y a region file can hold: section `Y` is a signed byte.
pub const MIN_Y: i64 = i8::MIN as i64 * 16;
/// Highest block y a region file can hold.
pub const MAX_Y: i64 = i8::MAX as i64 * 16 + 15;

fn chunk_to_nbt(pos: ChunkPos, chunk: &Chunk) -> Result<ChunkNbt> {
    let mut sections = Vec::with_capacity(chunk.section_count());
    for (&idx, section) in chunk.sections() {
        let y = i8::try_from(idx)
            .map_err(|_| anyhow::anyhow!("chunk {pos}: section {idx} is outside the Anvil range"))?;
        sections.push(section_to_nbt(y, section).with_context(|| format!("chunk {pos}, section {idx}"))?);
    }
    sections.sort_by_key(|s| s.y);

    Ok(ChunkNbt {
        data_version: DATA_VERSION,
        x_pos: pos.x,
        z_pos: pos.z,
        y_pos: sections.first().map(|s| s.y as i32).unwrap_or(0),
        sections,
        status: "minecraft:full".into(),
    })
}

/// Engine sections are YZX (x fastest), the same order Anvil uses.
fn section_to_nbt(y: i8, section: &ChunkSection) -> Result<SectionNbt> {
    let mut palette_map: HashMap<BlockId, u16> = HashMap::new();
    let mut palette: Vec<PaletteEntry> = Vec::new();
    let mut indices = [0u16; SECTION_VOLUME];

    for (slot, &block) in indices.iter_mut().zip(section.blocks().iter()) {
        *slot = match palette_map.get(&block) {
            Some(&idx) => idx,
            None => {
                palette.push(block_id_to_palette_entry(block)?);
                let idx = (palette.len() - 1) as u16;
                palette_map.insert(block, idx);
                idx
            }
        };
    }

    let data = pack_indices(&indices, palette.len());
    Ok(SectionNbt {
        y,
        block_states: BlockStatesNbt { palette, data },
    })
}

fn nbt_to_chunk(nbt: &ChunkNbt) -> Chunk {
    let mut chunk = Chunk::new();

    for section in &nbt.sections {
        let palette = &section.block_states.palette;
        let Some(first) = palette.first() else {
            continue;
        };

        let blocks = match &section.block_states.data {
            Some(data) if palette.len() > 1 => {
                let resolved: Vec<BlockId> = palette.iter().map(palette_entry_to_block_id).collect();
                let indices = unpack_indices(data, palette.len());
                let mut blocks = Box::new([BlockId::AIR; SECTION_VOLUME]);
                for (block, idx) in blocks.iter_mut().zip(indices) {
                    *block = resolved.get(idx as usize).copied().unwrap_or(BlockId::AIR);
                }
                blocks
            }
            _ => Box::new([palette_entry_to_block_id(first); SECTION_VOLUME]),
        };

        chunk.insert_section(section.y as i32, ChunkSection::from_blocks(blocks));
    }

    chunk
}

// ── Region files ────────────────────────────────────────────────────────────

/// Byte size of the location table at the head of every region file.
const LOCATION_TABLE_LEN: u64 = 4096;

/// Anvil-backed [`ChunkSource`] rooted at a world's `region/` directory.
///
/// Each chunk lookup opens the region file; nothing is cached here since the
/// chunk table in front of it already is. Writers take the lock exclusively,
/// so a reader never opens a region file in the middle of its replacement.
pub struct AnvilStore {
    region_dir: PathBuf,
    lock: RwLock<()>,
}

impl AnvilStore {
    /// Store for the world rooted at `world_dir`. The region directory is
    /// created on first write.
    pub fn new(world_dir: &Path) -> Self {
        Self {
            region_dir: world_dir.join("region"),
            lock: RwLock::new(()),
        }
    }

    fn region_path(&self, (rx, rz): (i32, i32)) -> PathBuf {
        self.region_dir.join(format!("r.{rx}.{rz}.mca"))
    }

    fn read(&self, pos: ChunkPos) -> Result<Option<Chunk>> {
        let _guard = self.lock.read().expect("region lock poisoned");
        let path = self.region_path(pos.region());
        if !path.exists() {
            return Ok(None);
        }

        let file = fs::File::open(&path).with_context(|| format!("opening {}", path.display()))?;
        let mut region = fastanvil::Region::from_stream(file)
            .with_context(|| format!("parsing {}", path.display()))?;
        let (x, z) = pos.region_local();
        let Some(bytes) = region
            .read_chunk(x, z)
            .with_context(|| format!("reading chunk {pos}"))?
        else {
            return Ok(None);
        };

        let nbt: ChunkNbt =
            fastnbt::from_bytes(&bytes).with_context(|| format!("deserializing chunk {pos}"))?;
        if (nbt.x_pos, nbt.z_pos) != (pos.x, pos.z) {
            anyhow::bail!(
                "chunk {pos} is stored with position ({}, {})",
                nbt.x_pos,
                nbt.z_pos
            );
        }
        Ok(Some(nbt_to_chunk(&nbt)))
    }

    /// Looks only at the location table; the chunk payload is not read.
    fn present(&self, pos: ChunkPos) -> Result<bool> {
        let _guard = self.lock.read().expect("region lock poisoned");
        let path = self.region_path(pos.region());
        let mut file = match fs::File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(e).with_context(|| format!("opening {}", path.display())),
        };
        if file.metadata()?.len() < LOCATION_TABLE_LEN {
            return Ok(false);
        }

        let (x, z) = pos.region_local();
        let mut entry = [0u8; 4];
        file.seek(SeekFrom::Start(4 * (x + z * 32) as u64))?;
        file.read_exact(&mut entry)?;
        Ok(u32::from_be_bytes(entry) != 0)
    }

    fn write(&self, batch: &[(ChunkPos, Chunk)]) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        let start = Instant::now();

        let mut by_region: HashMap<(i32, i32), Vec<(ChunkPos, Vec<u8>)>> = HashMap::new();
        for (pos, chunk) in batch {
            let bytes = fastnbt::to_bytes(&chunk_to_nbt(*pos, chunk)?)
                .with_context(|| format!("serializing chunk {pos}"))?;
            by_region.entry(pos.region()).or_default().push((*pos, bytes));
        }

        let _guard = self.lock.write().expect("region lock poisoned");
        fs::create_dir_all(&self.region_dir)
            .with_context(|| format!("creating {}", self.region_dir.display()))?;

        for (region_pos, chunks) in &by_region {
            let path = self.region_path(*region_pos);
            let mut region = if path.exists() {
                let bytes = fs::read(&path).with_context(|| format!("reading {}", path.display()))?;
                fastanvil::Region::from_stream(Cursor::new(bytes))
                    .with_context(|| format!("parsing {}", path.display()))?
            } else {
                fastanvil::Region::new(Cursor::new(Vec::new()))
                    .with_context(|| format!("creating {}", path.display()))?
            };

            for (pos, bytes) in chunks {
                let (x, z) = pos.region_local();
                region
                    .write_chunk(x, z, bytes)
                    .with_context(|| format!("writing chunk {pos}"))?;
            }

            // The cursor is left at the end of the last chunk.
            let mut cursor = region.into_inner()?;
            let len = cursor.stream_position()? as usize;
            let data = cursor.into_inner();

            let tmp = path.with_extension("mca.tmp");
            fs::write(&tmp, &data[..len]).with_context(|| format!("writing {}", tmp.display()))?;
            fs::rename(&tmp, &path).with_context(|| format!("replacing {}", path.display()))?;
        }

        tracing::debug!(
            "Wrote {} chunks across {} region files ({:.2?})",
            batch.len(),
            by_region.len(),
            start.elapsed()
        );
        Ok(())
    }

    /// Every chunk position persisted under this store.
    pub fn stored_chunks(&self) -> Result<Vec<ChunkPos>> {
        let _guard = self.lock.read().expect("region lock poisoned");
        if !self.region_dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut out = Vec::new();
        for entry in fs::read_dir(&self.region_dir)? {
            let path = entry?.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let Some((rx, rz)) = parse_region_name(name) else {
                if !name.ends_with(".tmp") {
                    tracing::warn!("Skipping unexpected file in region dir: {}", name);
                }
                continue;
            };

            let file = fs::File::open(&path).with_context(|| format!("opening {}", path.display()))?;
            let mut region = fastanvil::Region::from_stream(file)
                .with_context(|| format!("parsing {}", path.display()))?;
            for x in 0..32usize {
                for z in 0..32usize {
                    if region.read_chunk(x, z)?.is_some() {
                        out.push(ChunkPos::new(rx * 32 + x as i32, rz * 32 + z as i32));
                    }
                }
            }
        }
        out.sort();
        Ok(out)
    }
}

/// `r.X.Z.mca` → `(X, Z)`.
fn parse_region_name(name: &str) -> Option<(i32, i32)> {
    let mut parts = name.strip_suffix(".mca")?.split('.');
    if parts.next()? != "r" {
        return None;
    }
    let rx = parts.next()?.parse().ok()?;
    let rz = parts.next()?.parse().ok()?;
    parts.next().is_none().then_some((rx, rz))
}

impl ChunkSource for AnvilStore {
    fn load(&self, pos: ChunkPos) -> Result<Option<Chunk>, BoxError> {
        Ok(self.read(pos)?)
    }

    fn contains(&self, pos: ChunkPos) -> Result<bool, BoxError> {
        Ok(self.present(pos)?)
    }

    fn store(&self, batch: &[(ChunkPos, Chunk)]) -> Result<(), BoxError> {
        Ok(self.write(batch)?)
    }
}
