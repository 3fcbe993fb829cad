//! Session bootstrap against on-disk index fixtures.

use policy_nexus::agent::{AgentConfig, bootstrap};
use policy_nexus::error::ConfigError;
use policy_nexus::index::{Embedder, HashEmbedder, INDEX_FILE, SCHEMA, VectorIndex, encode_embedding};
use rusqlite::{Connection, params};
use tempfile::TempDir;

const DIMS: usize = 32;

/// Writes an index the way the ingestion step lays it out.
fn write_policy_index(dir: &TempDir, passages: &[(&str, &str)]) {
    let embedder = HashEmbedder::new(DIMS);
    let conn = Connection::open(dir.path().join(INDEX_FILE)).unwrap_or_else(|_| unreachable!());
    conn.execute_batch(SCHEMA).unwrap_or_else(|_| unreachable!());
    conn.execute(
        "INSERT INTO meta (key, value) VALUES ('embedding_model', ?1), ('dimensions', ?2)",
        params![HashEmbedder::MODEL_NAME, DIMS.to_string()],
    )
    .unwrap_or_else(|_| unreachable!());

    for (source, content) in passages {
        let vector = embedder.embed(content).unwrap_or_else(|_| unreachable!());
        conn.execute(
            "INSERT INTO chunks (collection, source, content, embedding) VALUES ('policy_docs', ?1, ?2, ?3)",
            params![source, content, encode_embedding(&vector)],
        )
        .unwrap_or_else(|_| unreachable!());
    }
}

fn config(dir: &TempDir) -> AgentConfig {
    AgentConfig::builder()
        .api_key("gsk_test")
        .search_api_key("tvly_test")
        .index_path(dir.path())
        .embedding_model(HashEmbedder::MODEL_NAME)
        .resolve()
}

#[test]
fn missing_search_key_fails_session() {
    let dir = TempDir::new().unwrap_or_else(|_| unreachable!());
    let mut cfg = config(&dir);
    cfg.search_api_key = String::new();

    let session = bootstrap(&cfg);

    assert!(!session.is_ready());
    assert_eq!(
        session.failure(),
        Some(&ConfigError::MissingCredential {
            name: "TAVILY_API_KEY"
        })
    );
}

#[test]
fn absent_index_gives_ready_session_without_retrieval() {
    let dir = TempDir::new().unwrap_or_else(|_| unreachable!());
    let session = bootstrap(&config(&dir));

    assert!(session.is_ready());
    assert!(!session.has_retrieval());
}

#[test]
fn present_index_enables_retrieval() {
    let dir = TempDir::new().unwrap_or_else(|_| unreachable!());
    write_policy_index(
        &dir,
        &[
            ("telework.pdf", "Teleworkers report their hours weekly."),
            ("leave.pdf", "Annual leave accrues at 1.5 days per month."),
        ],
    );

    let session = bootstrap(&config(&dir));

    assert!(session.has_retrieval());
}

#[test]
fn index_ranks_matching_passage_first() {
    let dir = TempDir::new().unwrap_or_else(|_| unreachable!());
    write_policy_index(
        &dir,
        &[
            ("leave.pdf", "Annual leave accrues at 1.5 days per month."),
            ("telework.pdf", "Telework reporting requirements: report hours weekly."),
            ("parking.pdf", "Parking permits are issued by facilities."),
        ],
    );

    let index = VectorIndex::open(&dir.path().join(INDEX_FILE), "policy_docs")
        .unwrap_or_else(|_| unreachable!());
    let query = HashEmbedder::new(DIMS)
        .embed("telework reporting requirements")
        .unwrap_or_else(|_| unreachable!());
    let hits = index.similarity_query(&query, 3).unwrap_or_else(|_| unreachable!());

    assert_eq!(hits.len(), 3);
    assert_eq!(hits[0].source.as_deref(), Some("telework.pdf"));
    assert!(hits.windows(2).all(|w| w[0].score >= w[1].score));
}
