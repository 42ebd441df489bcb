//! Dense, persistent indexed revocation tree, backed by `sqlx`/Postgres
//! rather than an in-memory map, so revocation state survives a restart
//! and is shareable across verifier instances. Applies the same
//! incremental single-path recompute and version-gated cache invalidation
//! discipline as the sparse tree in this crate, layered over transactional
//! reads and writes.

use std::collections::{BTreeSet, HashMap};

use chrono::Utc;
use parking_lot::RwLock;
use sqlx::{PgPool, Row};

use zkid_crypto::{bytes_to_fr, field_to_fr, fr_to_bytes, fr_to_field, poseidon_hash2_bytes};
use zkid_types::{FieldElement, RevocationRootInfo, RevocationWitness, ZkIdError, ZkIdResult, MAX_INDEXED_DEPTH};

use super::{compute_zero_hashes, is_valid_sql_identifier};

struct Cache {
    version: i64,
    /// `layers[l]`: node index (within level `l`) -> node value. `layers[0]`
    /// holds leaf values; `layers[depth]` holds the single root at key `0`.
    layers: Vec<HashMap<u64, [u8; 32]>>,
    /// Active commitment (decimal string) -> its leaf index.
    occupants: HashMap<String, u64>,
    /// Indices freed by a `remove`, reused smallest-first on the next `add`.
    free: BTreeSet<u64>,
    next_idx: u64,
}

pub struct IndexedTree {
    pool: PgPool,
    leaves_table: String,
    meta_table: String,
    depth: usize,
    zero_hashes: Vec<[u8; 32]>,
    cache: RwLock<Cache>,
}

impl IndexedTree {
    /// Open (creating if absent) the two-table schema under `table_prefix`.
    /// `CONFIG_MISMATCH` if a prior run stored a different `depth`.
    pub async fn open(pool: PgPool, table_prefix: &str, depth: usize) -> ZkIdResult<Self> {
        if !is_valid_sql_identifier(table_prefix) {
            return Err(ZkIdError::Config(format!("invalid table prefix '{table_prefix}'")));
        }
        if depth < 1 || depth > MAX_INDEXED_DEPTH {
            return Err(ZkIdError::Config(format!(
                "indexed tree depth {depth} out of range [1, {MAX_INDEXED_DEPTH}]"
            )));
        }

        let leaves_table = format!("{table_prefix}_leaves");
        let meta_table = format!("{table_prefix}_meta");

        sqlx::query(&format!(
            "CREATE TABLE IF NOT EXISTS {leaves_table} (
                idx BIGINT PRIMARY KEY,
                commitment TEXT UNIQUE NOT NULL,
                active BOOLEAN NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL
            )"
        ))
        .execute(&pool)
        .await
        .map_err(|e| ZkIdError::Config(format!("failed to create leaves table: {e}")))?;

        sqlx::query(&format!(
            "CREATE TABLE IF NOT EXISTS {meta_table} (
                version BIGINT NOT NULL,
                depth INT NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL
            )"
        ))
        .execute(&pool)
        .await
        .map_err(|e| ZkIdError::Config(format!("failed to create meta table: {e}")))?;

        let existing = sqlx::query(&format!("SELECT version, depth FROM {meta_table} LIMIT 1"))
            .fetch_optional(&pool)
            .await
            .map_err(|e| ZkIdError::Config(format!("failed to read meta row: {e}")))?;

        match existing {
            Some(row) => {
                let stored_depth: i32 = row.try_get("depth").unwrap_or_default();
                if stored_depth as usize != depth {
                    return Err(ZkIdError::Config(format!(
                        "CONFIG_MISMATCH: stored depth {stored_depth} != requested depth {depth}"
                    )));
                }
            }
            None => {
                sqlx::query(&format!(
                    "INSERT INTO {meta_table} (version, depth, updated_at) VALUES (0, $1, $2)"
                ))
                .bind(depth as i32)
                .bind(Utc::now())
                .execute(&pool)
                .await
                .map_err(|e| ZkIdError::Config(format!("failed to seed meta row: {e}")))?;
            }
        }

        let zero_hashes = compute_zero_hashes(depth);
        let mut tree = Self {
            pool,
            leaves_table,
            meta_table,
            depth,
            zero_hashes,
            cache: RwLock::new(Cache {
                version: -1,
                layers: vec![HashMap::new(); depth + 1],
                occupants: HashMap::new(),
                free: BTreeSet::new(),
                next_idx: 0,
            }),
        };
        tree.refresh_cache_if_stale().await?;
        Ok(tree)
    }

    fn capacity(&self) -> u64 {
        1u64 << self.depth
    }

    async fn stored_version(&self) -> ZkIdResult<i64> {
        let row = sqlx::query(&format!("SELECT version FROM {} LIMIT 1", self.meta_table))
            .fetch_one(&self.pool)
            .await
            .map_err(|e| ZkIdError::Config(format!("failed to read meta version: {e}")))?;
        Ok(row.try_get("version").unwrap_or_default())
    }

    /// Full rebuild from the leaves table: one pass over active rows plus
    /// `depth` hashing levels.
    async fn rebuild_cache(&self) -> ZkIdResult<Cache> {
        let version = self.stored_version().await?;

        let rows = sqlx::query(&format!(
            "SELECT idx, commitment, active FROM {}",
            self.leaves_table
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| ZkIdError::Config(format!("failed to scan leaves: {e}")))?;

        let mut layer0: HashMap<u64, [u8; 32]> = HashMap::new();
        let mut occupants = HashMap::new();
        let mut used_indices = BTreeSet::new();
        let mut max_idx: i64 = -1;

        for row in &rows {
            let idx: i64 = row.try_get("idx").unwrap_or_default();
            let commitment: String = row.try_get("commitment").unwrap_or_default();
            let active: bool = row.try_get("active").unwrap_or_default();
            max_idx = max_idx.max(idx);
            used_indices.insert(idx as u64);

            if active {
                let field = FieldElement::from_decimal(commitment.clone())?;
                let fr = field_to_fr(&field)?;
                layer0.insert(idx as u64, fr_to_bytes(&fr));
                occupants.insert(commitment, idx as u64);
            }
        }

        let next_idx = (max_idx + 1).max(0) as u64;
        let free: BTreeSet<u64> = (0..next_idx).filter(|i| !used_indices.contains(i)).collect();

        let mut layers = vec![HashMap::new(); self.depth + 1];
        layers[0] = layer0;
        for level in 0..self.depth {
            let mut next_level = HashMap::new();
            let indices: BTreeSet<u64> = layers[level].keys().map(|i| i / 2).collect();
            for parent_idx in indices {
                let left_idx = parent_idx * 2;
                let right_idx = parent_idx * 2 + 1;
                let left = layers[level].get(&left_idx).copied().unwrap_or(self.zero_hashes[level]);
                let right = layers[level].get(&right_idx).copied().unwrap_or(self.zero_hashes[level]);
                next_level.insert(parent_idx, poseidon_hash2_bytes(&left, &right));
            }
            layers[level + 1] = next_level;
        }

        Ok(Cache {
            version,
            layers,
            occupants,
            free,
            next_idx,
        })
    }

    async fn refresh_cache_if_stale(&self) -> ZkIdResult<()> {
        let current_version = self.stored_version().await?;
        let stale = self.cache.read().version != current_version;
        if stale {
            let rebuilt = self.rebuild_cache().await?;
            *self.cache.write() = rebuilt;
        }
        Ok(())
    }

    /// Recompute the single path from `idx` to the root in-place, bumping
    /// the affected layer entries and returning the new root bytes.
    fn recompute_path_in_cache(cache: &mut Cache, depth: usize, zero_hashes: &[[u8; 32]], idx: u64) -> [u8; 32] {
        let mut current_idx = idx;
        for level in 0..depth {
            let left_idx = current_idx & !1u64;
            let right_idx = left_idx + 1;
            let left = cache.layers[level].get(&left_idx).copied().unwrap_or(zero_hashes[level]);
            let right = cache.layers[level].get(&right_idx).copied().unwrap_or(zero_hashes[level]);
            let parent = poseidon_hash2_bytes(&left, &right);
            current_idx /= 2;
            if parent == zero_hashes[level + 1] {
                cache.layers[level + 1].remove(&current_idx);
            } else {
                cache.layers[level + 1].insert(current_idx, parent);
            }
        }
        cache.layers[depth].get(&0).copied().unwrap_or(zero_hashes[depth])
    }

    /// Idempotent add. `FULL` if at capacity; transactional claim of the
    /// smallest free index, write, and version bump.
    pub async fn add(&self, commitment: &FieldElement) -> ZkIdResult<()> {
        let decimal = commitment.as_decimal().to_string();
        self.refresh_cache_if_stale().await?;

        {
            let cache = self.cache.read();
            if cache.occupants.contains_key(&decimal) {
                return Ok(());
            }
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| ZkIdError::Config(format!("failed to begin transaction: {e}")))?;

        let active_count: i64 = sqlx::query(&format!(
            "SELECT COUNT(*) AS n FROM {} WHERE active",
            self.leaves_table
        ))
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| ZkIdError::Config(format!("failed to count active leaves: {e}")))?
        .try_get("n")
        .unwrap_or_default();

        if active_count as u64 >= self.capacity() {
            tx.rollback().await.ok();
            return Err(ZkIdError::Config("FULL: indexed tree at capacity".to_string()));
        }

        let idx = {
            let cache = self.cache.read();
            cache.free.iter().next().copied().unwrap_or(cache.next_idx)
        };

        sqlx::query(&format!(
            "INSERT INTO {} (idx, commitment, active, updated_at) VALUES ($1, $2, true, $3)
             ON CONFLICT (idx) DO UPDATE SET commitment = EXCLUDED.commitment, active = true, updated_at = EXCLUDED.updated_at",
            self.leaves_table
        ))
        .bind(idx as i64)
        .bind(&decimal)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await
        .map_err(|e| ZkIdError::Config(format!("failed to insert leaf: {e}")))?;

        sqlx::query(&format!("UPDATE {} SET version = version + 1, updated_at = $1", self.meta_table))
            .bind(Utc::now())
            .execute(&mut *tx)
            .await
            .map_err(|e| ZkIdError::Config(format!("failed to bump version: {e}")))?;

        tx.commit()
            .await
            .map_err(|e| ZkIdError::Config(format!("failed to commit add: {e}")))?;

        let fr = field_to_fr(commitment)?;
        let mut cache = self.cache.write();
        cache.version += 1;
        cache.free.remove(&idx);
        cache.next_idx = cache.next_idx.max(idx + 1);
        cache.layers[0].insert(idx, fr_to_bytes(&fr));
        cache.occupants.insert(decimal, idx);
        Self::recompute_path_in_cache(&mut cache, self.depth, &self.zero_hashes, idx);
        Ok(())
    }

    /// Idempotent remove: mark inactive, free the index for reuse. The
    /// `commitment` column is `UNIQUE`, so the removed row is rewritten to a
    /// per-index tombstone value rather than left holding the real
    /// commitment — otherwise a later `add` reusing a *different* freed
    /// index for the same commitment would collide with this still-present
    /// stale value.
    pub async fn remove(&self, commitment: &FieldElement) -> ZkIdResult<()> {
        let decimal = commitment.as_decimal().to_string();
        self.refresh_cache_if_stale().await?;

        let idx = {
            let cache = self.cache.read();
            match cache.occupants.get(&decimal) {
                Some(idx) => *idx,
                None => return Ok(()),
            }
        };

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| ZkIdError::Config(format!("failed to begin transaction: {e}")))?;

        let tombstone = format!("__tombstone_{idx}");
        sqlx::query(&format!(
            "UPDATE {} SET commitment = $1, active = false, updated_at = $2 WHERE idx = $3",
            self.leaves_table
        ))
        .bind(&tombstone)
        .bind(Utc::now())
        .bind(idx as i64)
        .execute(&mut *tx)
        .await
        .map_err(|e| ZkIdError::Config(format!("failed to deactivate leaf: {e}")))?;

        sqlx::query(&format!("UPDATE {} SET version = version + 1, updated_at = $1", self.meta_table))
            .bind(Utc::now())
            .execute(&mut *tx)
            .await
            .map_err(|e| ZkIdError::Config(format!("failed to bump version: {e}")))?;

        tx.commit()
            .await
            .map_err(|e| ZkIdError::Config(format!("failed to commit remove: {e}")))?;

        let mut cache = self.cache.write();
        cache.version += 1;
        cache.layers[0].remove(&idx);
        cache.occupants.remove(&decimal);
        cache.free.insert(idx);
        Self::recompute_path_in_cache(&mut cache, self.depth, &self.zero_hashes, idx);
        Ok(())
    }

    pub async fn contains(&self, commitment: &FieldElement) -> ZkIdResult<bool> {
        self.refresh_cache_if_stale().await?;
        Ok(self.cache.read().occupants.contains_key(commitment.as_decimal()))
    }

    pub async fn get_root(&self) -> ZkIdResult<FieldElement> {
        self.refresh_cache_if_stale().await?;
        let cache = self.cache.read();
        let root_bytes = cache.layers[self.depth].get(&0).copied().unwrap_or(self.zero_hashes[self.depth]);
        Ok(fr_to_field(&bytes_to_fr(&root_bytes)))
    }

    pub async fn get_root_info(&self) -> ZkIdResult<RevocationRootInfo> {
        self.refresh_cache_if_stale().await?;
        let root = self.get_root().await?;
        let version = self.cache.read().version.max(0) as u64;
        Ok(RevocationRootInfo {
            root,
            version,
            updated_at: Utc::now(),
        })
    }

    pub async fn get_witness(&self, commitment: &FieldElement) -> ZkIdResult<Option<RevocationWitness>> {
        self.refresh_cache_if_stale().await?;
        let cache = self.cache.read();
        let idx = match cache.occupants.get(commitment.as_decimal()) {
            Some(idx) => *idx,
            None => return Ok(None),
        };

        let root_bytes = cache.layers[self.depth].get(&0).copied().unwrap_or(self.zero_hashes[self.depth]);
        let mut siblings = Vec::with_capacity(self.depth);
        let mut path_indices = Vec::with_capacity(self.depth);
        let mut current_idx = idx;
        for level in 0..self.depth {
            let sibling_idx = current_idx ^ 1;
            let sibling = cache.layers[level].get(&sibling_idx).copied().unwrap_or(self.zero_hashes[level]);
            siblings.push(fr_to_field(&bytes_to_fr(&sibling)));
            path_indices.push(current_idx % 2 == 1);
            current_idx /= 2;
        }

        Ok(Some(RevocationWitness {
            root: fr_to_field(&bytes_to_fr(&root_bytes)),
            path_indices,
            siblings,
        }))
    }
}
