//! Checkpoint session ingestion.
//!
//! Sessions arrive from two places and merge into one list:
//!
//! 1. **Branch source** — the well-known checkpoint branch
//!    (`entire/checkpoints/v1`) laid out as
//!    `<2-hex>/<10-hex>/{metadata.json, <n>/{full.jsonl, prompt.txt,
//!    metadata.json}}`. Only checkpoints absent from the store are read.
//! 2. **Local source** — live session directories under
//!    `.entire/metadata/<session>/`, read incrementally from the byte
//!    offset recorded in the config, so a growing `full.jsonl` is only
//!    parsed once per byte.
//!
//! Transcript entries come in two shapes (`content` as plain text or as a
//! part list); both normalize to a flat string.

use std::collections::{HashMap, HashSet};
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use yepmem_core::model::{transcript_id, TranscriptChunk};

use crate::error::Result;
use crate::git::GitClient;

/// The well-known checkpoint branch.
pub const CHECKPOINT_BRANCH: &str = "entire/checkpoints/v1";

/// Local session metadata root under the workdir.
pub const LOCAL_METADATA_DIR: &str = ".entire/metadata";

/// Embedding text cap for transcript chunks.
const MAX_EMBEDDING_TEXT: usize = 2048;

/// `<2-hex>/<10-hex>/...` prefix identifying a checkpoint blob path.
static CHECKPOINT_PATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([0-9a-f]{2})/([0-9a-f]{10})/").expect("checkpoint path regex"));

// ============================================================================
// Transcript entries
// ============================================================================

/// Entry content: plain text or a list of typed parts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntryContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentPart {
    #[serde(rename = "type", default)]
    pub part_type: String,
    #[serde(default)]
    pub text: String,
}

impl EntryContent {
    /// Project both shapes to a flat string; non-text parts are dropped.
    pub fn normalize(&self) -> String {
        match self {
            EntryContent::Text(text) => text.clone(),
            EntryContent::Parts(parts) => parts
                .iter()
                .filter(|p| p.part_type == "text" || p.part_type.is_empty())
                .map(|p| p.text.as_str())
                .collect::<Vec<_>>()
                .join(""),
        }
    }
}

/// One `full.jsonl` line with a role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub role: String,
    #[serde(default = "empty_content")]
    pub content: EntryContent,
}

fn empty_content() -> EntryContent {
    EntryContent::Text(String::new())
}

impl TranscriptEntry {
    pub fn is_known_role(&self) -> bool {
        matches!(self.role.as_str(), "user" | "assistant" | "system" | "tool")
    }
}

/// Parse JSONL transcript text, keeping lines that carry a known role.
pub fn parse_transcript(jsonl: &str) -> Vec<TranscriptEntry> {
    jsonl
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| match serde_json::from_str::<Value>(line) {
            Ok(value) if value.get("role").is_some() => {
                serde_json::from_value::<TranscriptEntry>(value).ok()
            }
            Ok(_) => None,
            Err(e) => {
                debug!("Skipping malformed transcript line: {}", e);
                None
            }
        })
        .filter(TranscriptEntry::is_known_role)
        .collect()
}

// ============================================================================
// Parsed checkpoints
// ============================================================================

/// One session inside a checkpoint.
#[derive(Debug, Clone, Default)]
pub struct ParsedSession {
    pub index: usize,
    pub entries: Vec<TranscriptEntry>,
    pub prompt: String,
    /// Session `metadata.json`, opaque
    pub metadata: Value,
}

/// One checkpoint with its sessions.
#[derive(Debug, Clone, Default)]
pub struct ParsedCheckpoint {
    /// `<2-hex>/<10-hex>` for branch checkpoints, `local/<session>` for
    /// local ones
    pub id: String,
    /// Checkpoint `metadata.json`, opaque
    pub metadata: Value,
    pub sessions: Vec<ParsedSession>,
}

/// Merged checkpoint reader over both sources.
pub struct CheckpointIngester<'a> {
    git: &'a GitClient,
}

impl<'a> CheckpointIngester<'a> {
    pub fn new(git: &'a GitClient) -> Self {
        Self { git }
    }

    /// Read new checkpoints from the branch plus incremental local
    /// sessions. `offsets` is consulted and updated for the local source.
    pub async fn collect(
        &self,
        known_ids: &HashSet<String>,
        offsets: &mut HashMap<String, u64>,
    ) -> Result<Vec<ParsedCheckpoint>> {
        let mut checkpoints = self.branch_checkpoints(known_ids).await?;
        checkpoints.extend(local_checkpoints(self.git.repo_path(), offsets)?);
        Ok(checkpoints)
    }

    /// Enumerate and read new checkpoints on the well-known branch.
    async fn branch_checkpoints(
        &self,
        known_ids: &HashSet<String>,
    ) -> Result<Vec<ParsedCheckpoint>> {
        if !self.git.branch_exists(CHECKPOINT_BRANCH).await {
            debug!("Checkpoint branch {} not present", CHECKPOINT_BRANCH);
            return Ok(Vec::new());
        }

        let paths = self.git.ls_tree(CHECKPOINT_BRANCH).await?;

        // checkpoint id -> session indices present
        let mut sessions_by_id: HashMap<String, HashSet<usize>> = HashMap::new();
        for path in &paths {
            let Some(caps) = CHECKPOINT_PATH.captures(path) else {
                continue;
            };
            let id = format!("{}/{}", &caps[1], &caps[2]);
            let entry = sessions_by_id.entry(id).or_default();
            let rest = &path[caps[0].len()..];
            if let Some((first, _)) = rest.split_once('/') {
                if let Ok(index) = first.parse::<usize>() {
                    entry.insert(index);
                }
            }
        }

        let mut checkpoints = Vec::new();
        for (id, session_indices) in sessions_by_id {
            if known_ids.contains(&id) {
                continue;
            }

            let metadata = self
                .read_branch_json(&format!("{}/metadata.json", id))
                .await;

            let mut indices: Vec<usize> = session_indices.into_iter().collect();
            indices.sort_unstable();

            let mut sessions = Vec::new();
            for index in indices {
                let base = format!("{}/{}", id, index);
                let jsonl = self
                    .git
                    .show(CHECKPOINT_BRANCH, &format!("{}/full.jsonl", base))
                    .await
                    .unwrap_or_default();
                let prompt = self
                    .git
                    .show(CHECKPOINT_BRANCH, &format!("{}/prompt.txt", base))
                    .await
                    .unwrap_or_default();
                let session_metadata = self.read_branch_json(&format!("{}/metadata.json", base)).await;

                sessions.push(ParsedSession {
                    index,
                    entries: parse_transcript(&jsonl),
                    prompt: prompt.trim().to_string(),
                    metadata: session_metadata,
                });
            }

            checkpoints.push(ParsedCheckpoint {
                id,
                metadata,
                sessions,
            });
        }

        checkpoints.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(checkpoints)
    }

    async fn read_branch_json(&self, path: &str) -> Value {
        match self.git.show(CHECKPOINT_BRANCH, path).await {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                warn!("Invalid JSON at {}:{}: {}", CHECKPOINT_BRANCH, path, e);
                Value::Null
            }),
            Err(_) => Value::Null,
        }
    }
}

/// Incremental read of `.entire/metadata/<session>/full.jsonl` files.
///
/// Offsets advance to the file size after a successful read; sessions whose
/// offset already equals the size are skipped.
pub fn local_checkpoints(
    workdir: &Path,
    offsets: &mut HashMap<String, u64>,
) -> Result<Vec<ParsedCheckpoint>> {
    let root = workdir.join(LOCAL_METADATA_DIR);
    if !root.is_dir() {
        return Ok(Vec::new());
    }

    let mut checkpoints = Vec::new();
    let mut dirs: Vec<_> = std::fs::read_dir(&root)?
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_dir())
        .collect();
    dirs.sort_by_key(|e| e.file_name());

    for entry in dirs {
        let session_name = entry.file_name().to_string_lossy().into_owned();
        let transcript_path = entry.path().join("full.jsonl");
        let Ok(mut file) = std::fs::File::open(&transcript_path) else {
            continue;
        };

        let size = file.metadata()?.len();
        let offset = offsets.get(&session_name).copied().unwrap_or(0).min(size);
        if offset == size {
            debug!("Session {} already consumed ({} bytes)", session_name, size);
            continue;
        }

        file.seek(SeekFrom::Start(offset))?;
        let mut new_bytes = String::new();
        file.read_to_string(&mut new_bytes)?;

        let entries = parse_transcript(&new_bytes);
        let prompt = std::fs::read_to_string(entry.path().join("prompt.txt"))
            .map(|p| p.trim().to_string())
            .unwrap_or_default();
        let metadata = std::fs::read_to_string(entry.path().join("metadata.json"))
            .ok()
            .and_then(|m| serde_json::from_str(&m).ok())
            .unwrap_or(Value::Null);

        offsets.insert(session_name.clone(), size);

        if entries.is_empty() {
            continue;
        }
        checkpoints.push(ParsedCheckpoint {
            id: format!("local/{}", session_name),
            metadata: metadata.clone(),
            sessions: vec![ParsedSession {
                index: 0,
                entries,
                prompt,
                metadata,
            }],
        });
    }

    Ok(checkpoints)
}

// ============================================================================
// Chunk construction
// ============================================================================

/// Convert a parsed checkpoint into persistable transcript chunks.
pub fn to_transcript_chunks(checkpoint: &ParsedCheckpoint) -> Vec<TranscriptChunk> {
    checkpoint
        .sessions
        .iter()
        .map(|session| {
            let meta = |key: &str| -> Option<&Value> {
                session
                    .metadata
                    .get(key)
                    .or_else(|| checkpoint.metadata.get(key))
            };
            let meta_str = |key: &str| -> String {
                meta(key)
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string()
            };

            let prompt = if session.prompt.is_empty() {
                session
                    .entries
                    .iter()
                    .find(|e| e.role == "user")
                    .map(|e| e.content.normalize())
                    .unwrap_or_default()
            } else {
                session.prompt.clone()
            };

            let response = session
                .entries
                .iter()
                .filter(|e| e.role == "assistant")
                .map(|e| e.content.normalize())
                .collect::<Vec<_>>()
                .join("\n");

            let files_changed: Vec<String> = meta("filesChanged")
                .and_then(Value::as_array)
                .map(|a| {
                    a.iter()
                        .filter_map(Value::as_str)
                        .map(|s| s.to_string())
                        .collect()
                })
                .unwrap_or_default();

            let symbols: Vec<String> = meta("symbols")
                .and_then(Value::as_array)
                .map(|a| {
                    a.iter()
                        .filter_map(Value::as_str)
                        .map(|s| s.to_string())
                        .collect()
                })
                .unwrap_or_default();

            let diff_summary = meta_str("diffSummary");
            let agent = {
                let a = meta_str("agent");
                if a.is_empty() {
                    "unknown".to_string()
                } else {
                    a
                }
            };

            let mut embedding_text = format!(
                "{}\n{}\n{}",
                prompt,
                diff_summary,
                response
            );
            if embedding_text.chars().count() > MAX_EMBEDDING_TEXT {
                embedding_text = embedding_text.chars().take(MAX_EMBEDDING_TEXT).collect();
            }

            TranscriptChunk {
                id: transcript_id(&checkpoint.id, session.index),
                checkpoint_id: checkpoint.id.clone(),
                session_index: session.index,
                agent,
                timestamp: meta_str("timestamp"),
                prompt,
                response,
                diff_summary,
                files_changed,
                symbols,
                summary: None,
                tokens_used: meta("tokensUsed").and_then(Value::as_u64).unwrap_or(0),
                embedding_text,
                embedding: Vec::new(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn normalizes_both_content_shapes() {
        let text = EntryContent::Text("plain".to_string());
        assert_eq!(text.normalize(), "plain");

        let parts = EntryContent::Parts(vec![
            ContentPart {
                part_type: "text".to_string(),
                text: "first ".to_string(),
            },
            ContentPart {
                part_type: "tool_use".to_string(),
                text: "ignored".to_string(),
            },
            ContentPart {
                part_type: "text".to_string(),
                text: "second".to_string(),
            },
        ]);
        assert_eq!(parts.normalize(), "first second");
    }

    #[test]
    fn parse_transcript_keeps_role_lines() {
        let jsonl = r#"
{"role": "user", "content": "do the thing"}
{"note": "no role here"}
{"role": "assistant", "content": [{"type": "text", "text": "done"}]}
not json at all
{"role": "narrator", "content": "unknown role"}
"#;
        let entries = parse_transcript(jsonl);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].role, "user");
        assert_eq!(entries[1].content.normalize(), "done");
    }

    #[test]
    fn checkpoint_path_regex() {
        assert!(CHECKPOINT_PATH.is_match("ab/0123456789/metadata.json"));
        assert!(CHECKPOINT_PATH.is_match("ff/abcdef0123/0/full.jsonl"));
        assert!(!CHECKPOINT_PATH.is_match("abc/0123456789/metadata.json"));
        assert!(!CHECKPOINT_PATH.is_match("ab/012345678/metadata.json"));
        assert!(!CHECKPOINT_PATH.is_match("AB/0123456789/metadata.json"));
    }

    #[test]
    fn local_source_reads_incrementally() {
        let dir = tempfile::tempdir().unwrap();
        let session_dir = dir.path().join(LOCAL_METADATA_DIR).join("session-1");
        std::fs::create_dir_all(&session_dir).unwrap();

        let line1 = "{\"role\": \"user\", \"content\": \"first\"}\n";
        std::fs::write(session_dir.join("full.jsonl"), line1).unwrap();

        let mut offsets = HashMap::new();
        let first = local_checkpoints(dir.path(), &mut offsets).unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].id, "local/session-1");
        assert_eq!(first[0].sessions[0].entries.len(), 1);
        assert_eq!(offsets["session-1"], line1.len() as u64);

        // no growth: skipped entirely
        let second = local_checkpoints(dir.path(), &mut offsets).unwrap();
        assert!(second.is_empty());

        // appended line: only the new tail is parsed
        let line2 = "{\"role\": \"assistant\", \"content\": \"second\"}\n";
        let mut combined = String::from(line1);
        combined.push_str(line2);
        std::fs::write(session_dir.join("full.jsonl"), &combined).unwrap();

        let third = local_checkpoints(dir.path(), &mut offsets).unwrap();
        assert_eq!(third.len(), 1);
        assert_eq!(third[0].sessions[0].entries.len(), 1);
        assert_eq!(third[0].sessions[0].entries[0].role, "assistant");
        assert_eq!(offsets["session-1"], combined.len() as u64);
    }

    #[test]
    fn missing_local_root_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let mut offsets = HashMap::new();
        assert!(local_checkpoints(dir.path(), &mut offsets)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn transcript_chunks_from_checkpoint() {
        let checkpoint = ParsedCheckpoint {
            id: "ab/0123456789".to_string(),
            metadata: serde_json::json!({
                "agent": "claude-code",
                "timestamp": "2026-07-10T09:00:00Z",
            }),
            sessions: vec![ParsedSession {
                index: 0,
                entries: vec![
                    TranscriptEntry {
                        role: "user".to_string(),
                        content: EntryContent::Text("fix the bug".to_string()),
                    },
                    TranscriptEntry {
                        role: "assistant".to_string(),
                        content: EntryContent::Text("patched it".to_string()),
                    },
                ],
                prompt: String::new(),
                metadata: serde_json::json!({
                    "filesChanged": ["src/auth.ts"],
                    "tokensUsed": 345,
                }),
            }],
        };

        let chunks = to_transcript_chunks(&checkpoint);
        assert_eq!(chunks.len(), 1);
        let chunk = &chunks[0];
        assert_eq!(chunk.id, transcript_id("ab/0123456789", 0));
        assert_eq!(chunk.prompt, "fix the bug");
        assert_eq!(chunk.response, "patched it");
        assert_eq!(chunk.agent, "claude-code");
        assert_eq!(chunk.timestamp, "2026-07-10T09:00:00Z");
        assert_eq!(chunk.files_changed, vec!["src/auth.ts"]);
        assert_eq!(chunk.tokens_used, 345);
        assert!(chunk.embedding_text.contains("fix the bug"));
    }
}
