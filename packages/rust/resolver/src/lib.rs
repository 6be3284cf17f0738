//! Batched concept resolution with bad-ID isolation.
//!
//! Identifiers are looked up in fixed-size chunks. When the server rejects a
//! chunk as a bad request (at least one ID in it is invalid), the chunk is
//! bisected and each half retried until every bad ID is isolated on its own.
//! A chunk of `n` IDs holding one bad ID costs at most `2 * ceil(log2 n)`
//! extra requests.

mod client;

use std::future::Future;
use std::time::Duration;

use serde_json::Value;
use termgraph_shared::{LookupConfig, Result, TermGraphError};
use tracing::{debug, info, instrument, warn};

pub use client::SnowstormClient;

// ---------------------------------------------------------------------------
// Lookup seam
// ---------------------------------------------------------------------------

/// Failure of a single batched lookup.
#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    /// The server rejected the batch because it contains an invalid ID.
    #[error("bad request (HTTP {status}): {body}")]
    BadRequest { status: u16, body: String },

    /// Anything else: transport failure, server fault, undecodable response.
    #[error(transparent)]
    Fatal(#[from] TermGraphError),
}

/// A service that resolves a batch of concept IDs in one request.
pub trait ConceptLookup {
    /// Resolve `ids`, returning the concept objects the service reports.
    fn lookup(
        &self,
        ids: &[String],
    ) -> impl Future<Output = std::result::Result<Vec<Value>, LookupError>> + Send;
}

// ---------------------------------------------------------------------------
// Options and result
// ---------------------------------------------------------------------------

/// Chunking behaviour of [`BatchResolver`].
#[derive(Debug, Clone)]
pub struct ResolveOptions {
    /// Maximum IDs per top-level request.
    pub chunk_size: usize,
    /// Pause between top-level chunks.
    pub delay: Duration,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            chunk_size: 50,
            delay: Duration::from_millis(50),
        }
    }
}

impl From<&LookupConfig> for ResolveOptions {
    fn from(config: &LookupConfig) -> Self {
        Self {
            chunk_size: config.chunk_size,
            delay: Duration::from_millis(config.delay_ms),
        }
    }
}

/// Outcome of a completed resolve call.
#[derive(Debug, Default)]
pub struct Resolution {
    /// Concept objects returned by the service, in chunk order.
    pub resolved: Vec<Value>,
    /// IDs the service rejected on their own.
    pub unresolvable: Vec<String>,
    /// Lookup requests issued, bisection retries included.
    pub requests: usize,
}

// ---------------------------------------------------------------------------
// BatchResolver
// ---------------------------------------------------------------------------

/// Resolves ID lists through a [`ConceptLookup`], isolating bad IDs by bisection.
pub struct BatchResolver<L> {
    lookup: L,
    options: ResolveOptions,
}

impl<L: ConceptLookup> BatchResolver<L> {
    pub fn new(lookup: L, options: ResolveOptions) -> Self {
        Self { lookup, options }
    }

    /// Resolve every ID. See [`BatchResolver::resolve_with_progress`].
    pub async fn resolve(&self, ids: &[String]) -> Result<Resolution> {
        self.resolve_with_progress(ids, |_, _| {}).await
    }

    /// Resolve every ID, calling `on_chunk(done, total)` after each top-level chunk.
    ///
    /// Either every ID ends up resolved or unresolvable, or the first fatal
    /// lookup error is returned and nothing else is.
    #[instrument(skip_all, fields(ids = ids.len(), chunk_size = self.options.chunk_size))]
    pub async fn resolve_with_progress<F>(&self, ids: &[String], mut on_chunk: F) -> Result<Resolution>
    where
        F: FnMut(usize, usize),
    {
        if self.options.chunk_size == 0 {
            return Err(TermGraphError::validation("chunk_size must be at least 1"));
        }

        let total = ids.len().div_ceil(self.options.chunk_size);
        let mut resolution = Resolution::default();

        for (idx, chunk) in ids.chunks(self.options.chunk_size).enumerate() {
            if idx > 0 && !self.options.delay.is_zero() {
                tokio::time::sleep(self.options.delay).await;
            }
            self.fetch_chunk(chunk, &mut resolution).await?;
            on_chunk(idx + 1, total);
        }

        info!(
            resolved = resolution.resolved.len(),
            unresolvable = resolution.unresolvable.len(),
            requests = resolution.requests,
            "resolution finished"
        );
        Ok(resolution)
    }

    /// Resolve one chunk, bisecting on bad requests.
    ///
    /// Pending slices live on a stack with the left half pushed last, so
    /// results come out in the same order as a depth-first recursion.
    async fn fetch_chunk(&self, chunk: &[String], out: &mut Resolution) -> Result<()> {
        let mut pending: Vec<&[String]> = vec![chunk];

        while let Some(slice) = pending.pop() {
            if slice.is_empty() {
                continue;
            }

            out.requests += 1;
            match self.lookup.lookup(slice).await {
                Ok(items) => {
                    if items.len() != slice.len() {
                        debug!(
                            requested = slice.len(),
                            returned = items.len(),
                            "service returned a different number of concepts"
                        );
                    }
                    out.resolved.extend(items);
                }
                Err(LookupError::BadRequest { status, body }) => {
                    if let [id] = slice {
                        warn!(id = %id, status, "unresolvable concept id");
                        out.unresolvable.push(id.clone());
                    } else {
                        let (left, right) = slice.split_at(slice.len() / 2);
                        debug!(
                            size = slice.len(),
                            status,
                            body = %body,
                            "bad request, splitting batch"
                        );
                        pending.push(right);
                        pending.push(left);
                    }
                }
                Err(LookupError::Fatal(err)) => return Err(err),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Mutex;

    /// In-memory service: rejects any batch containing an ID in `invalid`,
    /// otherwise fails hard on any batch containing an ID in `broken`.
    #[derive(Default)]
    struct FakeLookup {
        invalid: HashSet<String>,
        broken: HashSet<String>,
        calls: Mutex<Vec<Vec<String>>>,
    }

    impl FakeLookup {
        fn with_invalid(invalid: &[&str]) -> Self {
            Self {
                invalid: invalid.iter().map(|s| s.to_string()).collect(),
                ..Default::default()
            }
        }

        fn calls(&self) -> Vec<Vec<String>> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl ConceptLookup for FakeLookup {
        async fn lookup(&self, ids: &[String]) -> std::result::Result<Vec<Value>, LookupError> {
            self.calls.lock().unwrap().push(ids.to_vec());
            if ids.iter().any(|id| self.invalid.contains(id)) {
                return Err(LookupError::BadRequest {
                    status: 400,
                    body: "invalid conceptId".into(),
                });
            }
            if ids.iter().any(|id| self.broken.contains(id)) {
                return Err(TermGraphError::Network("connection reset".into()).into());
            }
            Ok(ids
                .iter()
                .map(|id| serde_json::json!({ "conceptId": id }))
                .collect())
        }
    }

    fn opts(chunk_size: usize) -> ResolveOptions {
        ResolveOptions {
            chunk_size,
            delay: Duration::ZERO,
        }
    }

    fn ids(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    fn resolved_ids(resolution: &Resolution) -> Vec<String> {
        resolution
            .resolved
            .iter()
            .map(|c| c["conceptId"].as_str().unwrap().to_string())
            .collect()
    }

    #[tokio::test]
    async fn isolates_single_bad_id() {
        let resolver = BatchResolver::new(FakeLookup::with_invalid(&["bad"]), opts(50));
        let result = resolver.resolve(&ids(&["1", "2", "bad", "4"])).await.unwrap();

        assert_eq!(resolved_ids(&result), vec!["1", "2", "4"]);
        assert_eq!(result.unresolvable, vec!["bad"]);

        // [1,2,bad,4] → [1,2] ok, [bad,4] → [bad] rejected, [4] ok
        assert_eq!(
            resolver.lookup.calls(),
            vec![
                ids(&["1", "2", "bad", "4"]),
                ids(&["1", "2"]),
                ids(&["bad", "4"]),
                ids(&["bad"]),
                ids(&["4"]),
            ]
        );
        assert_eq!(result.requests, 5);
    }

    #[tokio::test]
    async fn clean_chunk_needs_one_request() {
        let resolver = BatchResolver::new(FakeLookup::default(), opts(50));
        let input: Vec<String> = (0..37).map(|i| i.to_string()).collect();
        let result = resolver.resolve(&input).await.unwrap();

        assert_eq!(result.requests, 1);
        assert_eq!(resolved_ids(&result), input);
        assert!(result.unresolvable.is_empty());
    }

    #[tokio::test]
    async fn one_bad_id_costs_logarithmic_requests() {
        for n in [1usize, 2, 7, 31, 49] {
            for bad_pos in [0, n / 2, n] {
                let mut input: Vec<String> = (0..n).map(|i| format!("ok{i}")).collect();
                input.insert(bad_pos, "bad".into());
                let size = input.len();

                let resolver = BatchResolver::new(FakeLookup::with_invalid(&["bad"]), opts(64));
                let result = resolver.resolve(&input).await.unwrap();

                let depth = size.next_power_of_two().trailing_zeros() as usize;
                assert!(
                    result.requests <= 1 + 2 * depth,
                    "size {size}: {} requests exceeds bound",
                    result.requests
                );
                assert_eq!(result.unresolvable, vec!["bad"]);
                assert_eq!(result.resolved.len(), n);
            }
        }
    }

    #[tokio::test]
    async fn every_id_is_accounted_for() {
        let invalid = ["x1", "x2", "x3", "x4"];
        for chunk_size in [1usize, 2, 3, 5, 8, 50] {
            let input: Vec<String> = (0..23)
                .map(|i| {
                    if i % 6 == 2 {
                        format!("x{}", i / 6 + 1)
                    } else {
                        format!("{i}")
                    }
                })
                .collect();

            let resolver = BatchResolver::new(FakeLookup::with_invalid(&invalid), opts(chunk_size));
            let result = resolver.resolve(&input).await.unwrap();

            assert_eq!(
                result.resolved.len() + result.unresolvable.len(),
                input.len(),
                "chunk_size {chunk_size}"
            );

            let resolved: HashSet<String> = resolved_ids(&result).into_iter().collect();
            let unresolvable: HashSet<String> = result.unresolvable.iter().cloned().collect();
            assert!(resolved.is_disjoint(&unresolvable));
            assert_eq!(
                unresolvable,
                invalid.iter().map(|s| s.to_string()).collect::<HashSet<String>>()
            );
        }
    }

    #[tokio::test]
    async fn resolved_order_follows_input() {
        let resolver = BatchResolver::new(FakeLookup::with_invalid(&["b1", "b2"]), opts(4));
        let input = ids(&["1", "b1", "2", "3", "4", "5", "b2", "6", "7"]);
        let result = resolver.resolve(&input).await.unwrap();
        assert_eq!(resolved_ids(&result), vec!["1", "2", "3", "4", "5", "6", "7"]);
    }

    #[tokio::test]
    async fn chunks_are_fixed_size() {
        let resolver = BatchResolver::new(FakeLookup::default(), opts(50));
        let input: Vec<String> = (0..120).map(|i| i.to_string()).collect();
        let result = resolver.resolve(&input).await.unwrap();

        let sizes: Vec<usize> = resolver.lookup.calls().iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![50, 50, 20]);
        assert_eq!(result.resolved.len(), 120);
    }

    #[tokio::test]
    async fn progress_reported_per_chunk() {
        let resolver = BatchResolver::new(FakeLookup::with_invalid(&["7"]), opts(4));
        let input: Vec<String> = (0..10).map(|i| i.to_string()).collect();

        let mut seen = Vec::new();
        resolver
            .resolve_with_progress(&input, |done, total| seen.push((done, total)))
            .await
            .unwrap();
        assert_eq!(seen, vec![(1, 3), (2, 3), (3, 3)]);
    }

    #[tokio::test]
    async fn fatal_error_aborts_everything() {
        let lookup = FakeLookup {
            invalid: HashSet::from(["bad".to_string()]),
            broken: HashSet::from(["boom".to_string()]),
            ..Default::default()
        };
        let resolver = BatchResolver::new(lookup, opts(2));
        let err = resolver
            .resolve(&ids(&["1", "bad", "boom", "4", "5"]))
            .await
            .unwrap_err();
        assert!(matches!(err, TermGraphError::Network(_)));

        // Third chunk is never attempted.
        let calls = resolver.lookup.calls();
        assert!(calls.iter().all(|c| !c.contains(&"5".to_string())));
    }

    #[tokio::test]
    async fn fatal_error_inside_bisection_propagates() {
        let lookup = FakeLookup {
            invalid: HashSet::from(["bad".to_string()]),
            broken: HashSet::from(["boom".to_string()]),
            ..Default::default()
        };
        let resolver = BatchResolver::new(lookup, opts(4));
        let err = resolver
            .resolve(&ids(&["1", "bad", "boom", "3"]))
            .await
            .unwrap_err();
        assert!(matches!(err, TermGraphError::Network(_)));

        // [1,bad,boom,3] → [1,bad] → [1], [bad] → [boom,3] fails hard
        assert_eq!(resolver.lookup.calls().len(), 5);
        assert_eq!(resolver.lookup.calls().last(), Some(&ids(&["boom", "3"])));
    }

    #[tokio::test]
    async fn empty_input_makes_no_requests() {
        let resolver = BatchResolver::new(FakeLookup::default(), opts(50));
        let result = resolver.resolve(&[]).await.unwrap();
        assert_eq!(result.requests, 0);
        assert!(result.resolved.is_empty());
        assert!(resolver.lookup.calls().is_empty());
    }

    #[tokio::test]
    async fn zero_chunk_size_is_rejected() {
        let resolver = BatchResolver::new(FakeLookup::default(), opts(0));
        let err = resolver.resolve(&ids(&["1"])).await.unwrap_err();
        assert!(matches!(err, TermGraphError::Validation { .. }));
    }

    #[tokio::test]
    async fn delay_applies_between_chunks() {
        let resolver = BatchResolver::new(
            FakeLookup::default(),
            ResolveOptions {
                chunk_size: 1,
                delay: Duration::from_millis(15),
            },
        );
        let start = std::time::Instant::now();
        resolver.resolve(&ids(&["1", "2", "3"])).await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[tokio::test]
    async fn bisects_against_mock_server() {
        use wiremock::{Mock, MockServer, Request, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/MAIN/concepts"))
            .respond_with(|req: &Request| {
                let requested: Vec<String> = req
                    .url
                    .query_pairs()
                    .filter(|(k, _)| k == "conceptIds")
                    .map(|(_, v)| v.into_owned())
                    .collect();
                if requested.iter().any(|id| id == "bad") {
                    return ResponseTemplate::new(400)
                        .set_body_string(r#"{"error":"BAD_REQUEST","message":"Invalid conceptId"}"#);
                }
                let items: Vec<Value> = requested
                    .iter()
                    .map(|id| serde_json::json!({ "conceptId": id, "active": true }))
                    .collect();
                let total = items.len();
                ResponseTemplate::new(200).set_body_json(serde_json::json!({
                    "items": items,
                    "total": total,
                }))
            })
            .mount(&server)
            .await;

        let mut config = LookupConfig::from(&termgraph_shared::AppConfig::default());
        config.base_url = server.uri();
        config.delay_ms = 0;

        let client = SnowstormClient::new(&config).unwrap();
        let resolver = BatchResolver::new(client, ResolveOptions::from(&config));
        let result = resolver.resolve(&ids(&["1", "2", "bad", "4"])).await.unwrap();

        assert_eq!(resolved_ids(&result), vec!["1", "2", "4"]);
        assert_eq!(result.unresolvable, vec!["bad"]);
        assert_eq!(server.received_requests().await.unwrap().len(), 5);
    }
}
