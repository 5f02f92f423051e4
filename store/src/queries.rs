//! Raw SQL grouped by the table it touches, kept as plain `const` strings so
//! the query text is visible at the call site instead of hidden behind a
//! query builder.

pub mod memory_queries {
    pub const INSERT: &str = r#"
        INSERT INTO memories (
            id, user_id, session_id, content, primary_sector,
            salience, strength, access_count, decay_rate, created_at, last_accessed
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $10)
        ON CONFLICT (id) DO UPDATE SET
            content = EXCLUDED.content,
            primary_sector = EXCLUDED.primary_sector,
            salience = EXCLUDED.salience,
            strength = EXCLUDED.strength,
            decay_rate = EXCLUDED.decay_rate
    "#;

    pub const SELECT_BY_ID: &str = r#"
        SELECT id, user_id, session_id, content, primary_sector, salience, strength,
               access_count, decay_rate, created_at, last_accessed, deleted_at
        FROM memories
        WHERE id = $1 AND deleted_at IS NULL
    "#;

    pub const TOUCH_ACCESS: &str = r#"
        UPDATE memories
        SET access_count = access_count + 1, last_accessed = $2
        WHERE id = $1
    "#;

    pub const SOFT_DELETE: &str = r#"
        UPDATE memories SET deleted_at = $2 WHERE id = $1 AND deleted_at IS NULL
    "#;

    pub const HARD_DELETE: &str = r#"
        DELETE FROM memories WHERE id = $1
    "#;
}

pub mod embedding_queries {
    pub const UPSERT: &str = r#"
        INSERT INTO memory_embeddings (memory_id, sector, embedding, dimension, model_name, created_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (memory_id, sector) DO UPDATE SET
            embedding = EXCLUDED.embedding,
            dimension = EXCLUDED.dimension,
            model_name = EXCLUDED.model_name,
            created_at = EXCLUDED.created_at
    "#;

    pub const SELECT_ALL_SECTORS: &str = r#"
        SELECT memory_id, sector, embedding, dimension, model_name, created_at
        FROM memory_embeddings
        WHERE memory_id = $1
    "#;

    pub const DELETE_ALL_SECTORS: &str = r#"
        DELETE FROM memory_embeddings WHERE memory_id = $1
    "#;

    /// Cosine similarity against a single sector, expressed via pgvector's
    /// `<=>` (cosine distance) operator so `1 - distance = similarity`.
    pub const SIMILARITY_SEARCH_SECTOR: &str = r#"
        SELECT e.memory_id, 1 - (e.embedding <=> $1) AS score
        FROM memory_embeddings e
        JOIN memories m ON m.id = e.memory_id
        WHERE e.sector = $2
          AND m.user_id = $3
          AND m.deleted_at IS NULL
        ORDER BY e.embedding <=> $1
        LIMIT $4
    "#;

    /// Per-sector candidate scores for a multi-sector weighted search; the
    /// weighted combination itself happens in Rust since the weight vector
    /// is caller-supplied and varies per call.
    pub const CANDIDATE_SCORES_FOR_SECTOR: &str = r#"
        SELECT e.memory_id, 1 - (e.embedding <=> $1) AS score
        FROM memory_embeddings e
        JOIN memories m ON m.id = e.memory_id
        WHERE e.sector = $2
          AND m.user_id = $3
          AND m.deleted_at IS NULL
    "#;
}

pub mod link_queries {
    pub const UPSERT: &str = r#"
        INSERT INTO memory_links (source_id, target_id, link_type, weight, created_at, traversal_count)
        VALUES ($1, $2, $3, $4, $5, 0)
        ON CONFLICT (source_id, target_id, link_type) DO UPDATE SET
            weight = EXCLUDED.weight
    "#;

    pub const SELECT_OUTGOING: &str = r#"
        SELECT source_id, target_id, link_type, weight, created_at, traversal_count
        FROM memory_links
        WHERE source_id = $1
    "#;

    pub const INCREMENT_TRAVERSAL: &str = r#"
        UPDATE memory_links
        SET traversal_count = traversal_count + 1
        WHERE source_id = $1 AND target_id = $2 AND link_type = $3
    "#;

    pub const DELETE_FOR_MEMORY: &str = r#"
        DELETE FROM memory_links WHERE source_id = $1 OR target_id = $1
    "#;
}
