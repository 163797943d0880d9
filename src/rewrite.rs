use crate::error::ColmigError;
use crate::model::{Artifact, ArtifactKind, AttributeIdentity};
use crate::store::StoreClient;
use tracing::info;

/// Whole-token test for a schema name inside an artifact payload. Prevents
/// `old_field` from matching inside `old_field_archive`.
pub fn payload_references(payload: &str, schema_name: &str) -> bool {
    find_token(payload, schema_name, 0).is_some()
}

fn is_token_char(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'_'
}

fn find_token(payload: &str, token: &str, start: usize) -> Option<usize> {
    if token.is_empty() {
        return None;
    }
    let bytes = payload.as_bytes();
    let mut from = start;
    while let Some(offset) = payload[from..].find(token) {
        let at = from + offset;
        let before_ok = at == 0 || !is_token_char(bytes[at - 1]);
        let end = at + token.len();
        let after_ok = end == bytes.len() || !is_token_char(bytes[end]);
        if before_ok && after_ok {
            return Some(at);
        }
        from = at + 1;
    }
    None
}

/// Replaces every whole-token occurrence. Returns None when nothing matched.
fn replace_token(payload: &str, from: &str, to: &str) -> Option<String> {
    let mut out = String::with_capacity(payload.len());
    let mut cursor = 0;
    let mut changed = false;
    while let Some(at) = find_token(payload, from, cursor) {
        out.push_str(&payload[cursor..at]);
        out.push_str(to);
        cursor = at + from.len();
        changed = true;
    }
    if !changed {
        return None;
    }
    out.push_str(&payload[cursor..]);
    Some(out)
}

/// Per-artifact-kind reference rewriter. The orchestrator sequences the
/// calls and persists the results; it never inspects payloads itself.
pub trait ReferenceRewriter {
    fn kind(&self) -> ArtifactKind;

    /// Rewrites references to `from` so they point at `to`. `to = None`
    /// clears the reference (delete path). Returns None when the artifact
    /// needs no change.
    fn rewrite(
        &self,
        artifact: &Artifact,
        from: &AttributeIdentity,
        to: Option<&AttributeIdentity>,
    ) -> Result<Option<Artifact>, ColmigError>;
}

/// Shipped rewriter: whole-token schema-name replacement in the payload.
/// Real deployments substitute format-aware implementations per kind; the
/// orchestrator contract is identical.
pub struct SchemaNameRewriter {
    kind: ArtifactKind,
}

impl SchemaNameRewriter {
    pub fn new(kind: ArtifactKind) -> Self {
        Self { kind }
    }

    /// One rewriter per artifact kind, covering the full reference surface.
    pub fn full_set() -> Vec<Box<dyn ReferenceRewriter>> {
        ArtifactKind::ALL
            .into_iter()
            .map(|kind| Box::new(SchemaNameRewriter::new(kind)) as Box<dyn ReferenceRewriter>)
            .collect()
    }
}

impl ReferenceRewriter for SchemaNameRewriter {
    fn kind(&self) -> ArtifactKind {
        self.kind
    }

    fn rewrite(
        &self,
        artifact: &Artifact,
        from: &AttributeIdentity,
        to: Option<&AttributeIdentity>,
    ) -> Result<Option<Artifact>, ColmigError> {
        let replacement = to.map(|t| t.schema_name.as_str()).unwrap_or("");
        Ok(
            replace_token(&artifact.payload, &from.schema_name, replacement).map(|payload| {
                Artifact {
                    payload,
                    ..artifact.clone()
                }
            }),
        )
    }
}

/// Runs every rewriter over its referencing artifacts and persists the
/// changed ones. Any rewriter error aborts the enclosing step unretried.
pub fn rewrite_all(
    store: &dyn StoreClient,
    rewriters: &[Box<dyn ReferenceRewriter>],
    from: &AttributeIdentity,
    to: Option<&AttributeIdentity>,
) -> Result<u64, ColmigError> {
    let mut rewritten = 0u64;
    for rewriter in rewriters {
        let kind = rewriter.kind();
        let artifacts = store.artifacts_referencing(kind, from)?;
        for artifact in &artifacts {
            if let Some(updated) = rewriter.rewrite(artifact, from, to)? {
                store.save_artifact(&updated)?;
                rewritten += 1;
            }
        }
        if !artifacts.is_empty() {
            info!(
                kind = %kind,
                candidates = artifacts.len(),
                from = %from.schema_name,
                "rewrote references"
            );
        }
    }
    Ok(rewritten)
}
