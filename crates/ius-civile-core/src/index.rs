//! Flat inner-product vector index with co-located chunk metadata.
//!
//! Every vector is stored next to its [`ChunkMeta`] in a single arena of
//! [`IndexEntry`] records, so index and metadata can never drift apart in
//! memory. Vectors are L2-normalized on insertion and queries are normalized
//! before scoring, which makes the inner product equal to cosine similarity.
//!
//! On disk the index is still split into a binary vector file and a JSON
//! metadata sidecar. [`IndexFile`] is the binary half:
//!
//! ```text
//! magic "IUSV" | version u32 | dims u32 | count u64 | sidecar sha256 [u8; 32]
//! count × dims little-endian f32
//! ```

use anyhow::{bail, Result};

use crate::embedding::{blob_to_vec, dot, l2_normalize, vec_to_blob};
use crate::models::ChunkMeta;

const MAGIC: &[u8; 4] = b"IUSV";
const FORMAT_VERSION: u32 = 1;
const HEADER_LEN: usize = 4 + 4 + 4 + 8 + 32;

/// One indexed chunk: its normalized vector and its provenance.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexEntry {
    pub vector: Vec<f32>,
    pub meta: ChunkMeta,
}

/// A raw search hit: similarity score and arena position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchHit {
    pub score: f32,
    pub position: usize,
}

/// A search hit joined with its chunk metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalHit {
    pub score: f32,
    pub meta: ChunkMeta,
}

/// In-memory flat index.
#[derive(Debug, Clone, Default)]
pub struct VectorIndex {
    dims: usize,
    entries: Vec<IndexEntry>,
}

impl VectorIndex {
    /// Create an empty index for vectors of width `dims`.
    pub fn new(dims: usize) -> Self {
        Self {
            dims,
            entries: Vec::new(),
        }
    }

    pub fn dims(&self) -> usize {
        self.dims
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    pub fn get(&self, position: usize) -> Option<&IndexEntry> {
        self.entries.get(position)
    }

    /// Append a batch of vectors with their metadata.
    ///
    /// The batch is validated as a whole before anything is inserted, so a
    /// rejected batch leaves the index unchanged.
    pub fn add(&mut self, vectors: Vec<Vec<f32>>, metas: Vec<ChunkMeta>) -> Result<()> {
        if vectors.len() != metas.len() {
            bail!(
                "vector/metadata count mismatch: {} vectors, {} metadata records",
                vectors.len(),
                metas.len()
            );
        }
        if let Some(bad) = vectors.iter().position(|v| v.len() != self.dims) {
            bail!(
                "vector {} has {} dimensions, index expects {}",
                bad,
                vectors[bad].len(),
                self.dims
            );
        }

        self.entries.reserve(vectors.len());
        for (mut vector, meta) in vectors.into_iter().zip(metas) {
            l2_normalize(&mut vector);
            self.entries.push(IndexEntry { vector, meta });
        }
        Ok(())
    }

    /// Return at most `k` hits ordered by descending cosine similarity.
    ///
    /// Equal scores keep insertion order. An empty index yields no hits.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        if self.entries.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        if query.len() != self.dims {
            bail!(
                "query has {} dimensions, index expects {}",
                query.len(),
                self.dims
            );
        }

        let mut q = query.to_vec();
        l2_normalize(&mut q);

        let mut hits: Vec<SearchHit> = self
            .entries
            .iter()
            .enumerate()
            .map(|(position, entry)| SearchHit {
                score: dot(&q, &entry.vector),
                position,
            })
            .collect();

        // sort_by is stable, so ties stay in insertion order
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(k);
        Ok(hits)
    }

    /// Search and join each hit with its metadata, dropping invalid positions.
    pub fn search_with_meta(&self, query: &[f32], k: usize) -> Result<Vec<LocalHit>> {
        Ok(self
            .search(query, k)?
            .into_iter()
            .filter_map(|hit| {
                self.get(hit.position).map(|entry| LocalHit {
                    score: hit.score,
                    meta: entry.meta.clone(),
                })
            })
            .collect())
    }

    /// Metadata records in position order, as written to the sidecar.
    pub fn metadata(&self) -> Vec<&ChunkMeta> {
        self.entries.iter().map(|e| &e.meta).collect()
    }

    /// Binary half of the persisted pair, bound to the sidecar by its digest.
    pub fn to_index_file(&self, sidecar_digest: [u8; 32]) -> IndexFile {
        IndexFile {
            dims: self.dims,
            sidecar_digest,
            vectors: self.entries.iter().map(|e| e.vector.clone()).collect(),
        }
    }

    /// Rebuild an index from its persisted halves.
    ///
    /// Fails when the two halves disagree in length; such a pair is unusable.
    pub fn from_parts(file: IndexFile, metas: Vec<ChunkMeta>) -> Result<Self> {
        if file.vectors.len() != metas.len() {
            bail!(
                "index has {} vectors but metadata has {} records",
                file.vectors.len(),
                metas.len()
            );
        }
        let entries = file
            .vectors
            .into_iter()
            .zip(metas)
            .map(|(vector, meta)| IndexEntry { vector, meta })
            .collect();
        Ok(Self {
            dims: file.dims,
            entries,
        })
    }
}

/// Decoded binary index file.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexFile {
    pub dims: usize,
    /// SHA-256 of the metadata sidecar written alongside this file.
    pub sidecar_digest: [u8; 32],
    pub vectors: Vec<Vec<f32>>,
}

impl IndexFile {
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_LEN + self.vectors.len() * self.dims * 4);
        out.extend_from_slice(MAGIC);
        out.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        out.extend_from_slice(&(self.dims as u32).to_le_bytes());
        out.extend_from_slice(&(self.vectors.len() as u64).to_le_bytes());
        out.extend_from_slice(&self.sidecar_digest);
        for v in &self.vectors {
            out.extend_from_slice(&vec_to_blob(v));
        }
        out
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_LEN {
            bail!("index file truncated: {} bytes", bytes.len());
        }
        if &bytes[0..4] != MAGIC {
            bail!("not an index file (bad magic)");
        }
        let version = u32::from_le_bytes(le_array(&bytes[4..8]));
        if version != FORMAT_VERSION {
            bail!("unsupported index format version {}", version);
        }
        let dims = u32::from_le_bytes(le_array(&bytes[8..12])) as usize;
        let count = u64::from_le_bytes(le_array(&bytes[12..20])) as usize;
        let mut sidecar_digest = [0u8; 32];
        sidecar_digest.copy_from_slice(&bytes[20..HEADER_LEN]);
        if dims == 0 && count > 0 {
            bail!("index header promises {} vectors of zero dimensions", count);
        }

        let body = &bytes[HEADER_LEN..];
        let expected = count
            .checked_mul(dims)
            .and_then(|n| n.checked_mul(4))
            .ok_or_else(|| anyhow::anyhow!("index header overflows: {} × {}", count, dims))?;
        if body.len() != expected {
            bail!(
                "index body has {} bytes, header promises {} ({} vectors × {} dims)",
                body.len(),
                expected,
                count,
                dims
            );
        }

        let vectors = if dims == 0 {
            Vec::new()
        } else {
            body.chunks_exact(dims * 4).map(blob_to_vec).collect()
        };

        Ok(Self {
            dims,
            sidecar_digest,
            vectors,
        })
    }
}

fn le_array<const N: usize>(bytes: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(bytes);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(n: usize) -> ChunkMeta {
        ChunkMeta {
            source: "doc.pdf".to_string(),
            chunk: format!("chunk text {}", n),
            citation: format!("doc.pdf — chunk {}", n),
        }
    }

    #[test]
    fn test_search_orders_identical_orthogonal_opposite() {
        let query = vec![1.0, 2.0, 0.0];
        let a = query.clone();
        let b = vec![-2.0, 1.0, 0.0];
        let c = vec![-1.0, -2.0, 0.0];

        let mut index = VectorIndex::new(3);
        // insert out of order to prove ranking is by score
        index
            .add(vec![c, a, b], vec![meta(1), meta(2), meta(3)])
            .unwrap();

        let hits = index.search(&query, 3).unwrap();
        let positions: Vec<usize> = hits.iter().map(|h| h.position).collect();
        assert_eq!(positions, vec![1, 2, 0]);
        assert!((hits[0].score - 1.0).abs() < 1e-5);
        assert!(hits[1].score.abs() < 1e-5);
        assert!((hits[2].score + 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_search_respects_k_and_ties_keep_insertion_order() {
        let mut index = VectorIndex::new(2);
        index
            .add(
                vec![vec![1.0, 0.0], vec![2.0, 0.0], vec![0.5, 0.0], vec![0.0, 1.0]],
                vec![meta(1), meta(2), meta(3), meta(4)],
            )
            .unwrap();
        let hits = index.search(&[3.0, 0.0], 2).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].position, 0);
        assert_eq!(hits[1].position, 1);
    }

    #[test]
    fn test_search_empty_index() {
        let index = VectorIndex::new(4);
        assert!(index.search(&[1.0, 0.0, 0.0, 0.0], 8).unwrap().is_empty());
        assert!(index.search_with_meta(&[1.0], 8).unwrap().is_empty());
    }

    #[test]
    fn test_search_k_larger_than_index() {
        let mut index = VectorIndex::new(2);
        index.add(vec![vec![1.0, 1.0]], vec![meta(1)]).unwrap();
        let hits = index.search_with_meta(&[1.0, 1.0], 8).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].meta.citation, "doc.pdf — chunk 1");
    }

    #[test]
    fn test_add_rejects_mismatched_batches() {
        let mut index = VectorIndex::new(2);
        assert!(index.add(vec![vec![1.0, 0.0]], vec![]).is_err());
        assert!(index
            .add(vec![vec![1.0, 0.0], vec![1.0]], vec![meta(1), meta(2)])
            .is_err());
        assert!(index.is_empty());
    }

    #[test]
    fn test_query_dimension_mismatch_fails() {
        let mut index = VectorIndex::new(2);
        index.add(vec![vec![1.0, 0.0]], vec![meta(1)]).unwrap();
        assert!(index.search(&[1.0, 0.0, 0.0], 1).is_err());
    }

    #[test]
    fn test_vectors_are_normalized_on_insert() {
        let mut index = VectorIndex::new(2);
        index.add(vec![vec![3.0, 4.0]], vec![meta(1)]).unwrap();
        let v = &index.get(0).unwrap().vector;
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_index_file_encode_decode() {
        let mut index = VectorIndex::new(3);
        index
            .add(
                vec![vec![1.0, 0.0, 0.0], vec![0.0, 0.0, 2.0]],
                vec![meta(1), meta(2)],
            )
            .unwrap();
        let file = index.to_index_file([7u8; 32]);
        let bytes = file.encode();
        assert_eq!(bytes.len(), HEADER_LEN + 2 * 3 * 4);

        let decoded = IndexFile::decode(&bytes).unwrap();
        assert_eq!(decoded, file);

        let metas = index.metadata().into_iter().cloned().collect();
        let rebuilt = VectorIndex::from_parts(decoded, metas).unwrap();
        assert_eq!(rebuilt.len(), 2);
        assert_eq!(rebuilt.dims(), 3);
        assert_eq!(rebuilt.entries(), index.entries());
    }

    #[test]
    fn test_decode_rejects_truncated_body() {
        let file = IndexFile {
            dims: 2,
            sidecar_digest: [0u8; 32],
            vectors: vec![vec![1.0, 2.0]],
        };
        let mut bytes = file.encode();
        bytes.pop();
        assert!(IndexFile::decode(&bytes).is_err());
        assert!(IndexFile::decode(b"nope").is_err());
    }

    #[test]
    fn test_decode_rejects_zero_dims_with_vectors() {
        let mut bytes = Vec::with_capacity(HEADER_LEN);
        bytes.extend_from_slice(MAGIC);
        bytes.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes());
        bytes.extend_from_slice(&(u64::MAX / 8).to_le_bytes());
        bytes.extend_from_slice(&[0u8; 32]);

        let err = IndexFile::decode(&bytes).unwrap_err();
        assert!(err.to_string().contains("zero dimensions"), "got: {err}");
    }

    #[test]
    fn test_decode_accepts_empty_zero_dims() {
        let file = IndexFile {
            dims: 0,
            sidecar_digest: [0u8; 32],
            vectors: Vec::new(),
        };
        let decoded = IndexFile::decode(&file.encode()).unwrap();
        assert_eq!(decoded.dims, 0);
        assert!(decoded.vectors.is_empty());
    }

    #[test]
    fn test_from_parts_rejects_length_mismatch() {
        let file = IndexFile {
            dims: 2,
            sidecar_digest: [0u8; 32],
            vectors: vec![vec![1.0, 0.0], vec![0.0, 1.0]],
        };
        assert!(VectorIndex::from_parts(file, vec![meta(1)]).is_err());
    }
}
